//! Component ids and the per-entity membership bitmask

use serde::{Deserialize, Serialize};

/// Number of distinct component kinds a mask can represent
pub const MAX_COMPONENT_KINDS: usize = 64;

/// Small integer assigned to a component kind by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(u8);

impl ComponentId {
    /// Wrap a raw id. Panics if it doesn't fit in a mask.
    pub fn new(index: usize) -> Self {
        assert!(
            index < MAX_COMPONENT_KINDS,
            "component id {index} exceeds mask capacity ({MAX_COMPONENT_KINDS} kinds)"
        );
        Self(index as u8)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The single bit this id occupies
    #[inline]
    pub fn bit(self) -> u64 {
        1u64 << self.0
    }
}

/// Bitmask of component kinds: bit `i` set iff component id `i` is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn from_ids(ids: &[ComponentId]) -> Self {
        ids.iter().fold(Self::EMPTY, |mask, id| mask.with(*id))
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn with(self, id: ComponentId) -> Self {
        Self(self.0 | id.bit())
    }

    #[inline]
    pub fn without(self, id: ComponentId) -> Self {
        Self(self.0 & !id.bit())
    }

    #[inline]
    pub fn contains(self, id: ComponentId) -> bool {
        self.0 & id.bit() != 0
    }

    /// True if `other` carries at least every component in `self`
    ///
    /// This is the system-side acceptance test: `(self & other) == self`.
    #[inline]
    pub fn is_satisfied_by(self, other: ComponentMask) -> bool {
        self.0 & other.0 == self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}
