//! Component kind registry
//!
//! Hands out a stable small id per component kind the first time the kind is
//! seen. Kinds are identified by the explicit key each component declares.

use std::collections::HashMap;

use super::mask::{ComponentId, MAX_COMPONENT_KINDS};

/// Kind key → id table, ids allocated from 0 upward
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ids: HashMap<&'static str, ComponentId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for `kind`, assigning the next unused one on first sight
    ///
    /// Panics once more than [`MAX_COMPONENT_KINDS`] kinds are registered;
    /// that is a programming error, the mask simply has no room.
    pub fn id_of(&mut self, kind: &'static str) -> ComponentId {
        if let Some(id) = self.ids.get(kind) {
            return *id;
        }

        let next = self.ids.len();
        assert!(
            next < MAX_COMPONENT_KINDS,
            "component kind '{kind}' would exceed the {MAX_COMPONENT_KINDS}-kind mask capacity"
        );
        let id = ComponentId::new(next);
        self.ids.insert(kind, id);
        log::debug!("Registered component kind '{}' as id {}", kind, id.index());
        id
    }

    /// Id for `kind` if it was already registered
    pub fn lookup(&self, kind: &str) -> Option<ComponentId> {
        self.ids.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
