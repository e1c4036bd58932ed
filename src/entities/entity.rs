//! Entity handles, component bundles and per-entity records

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::mask::{ComponentId, ComponentMask};
use super::store::StoreId;

/// Application data attachable to an entity
///
/// `KIND` is the explicit key the registry assigns an id to. It must be
/// unique per component type.
pub trait Component: Any {
    const KIND: &'static str;
}

/// Opaque entity handle
///
/// Ids are allocated monotonically by the owning store and never reused, so
/// ordering by handle is creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity(u32);

impl Entity {
    pub(crate) fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// A batch of components to attach in one operation
///
/// One batch produces at most one notification, however many components it
/// carries.
#[derive(Default)]
pub struct Components {
    items: Vec<(&'static str, Box<dyn Any>)>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Component>(mut self, component: T) -> Self {
        let component: Box<dyn Any> = Box::new(component);
        self.items.push((T::KIND, component));
        self
    }

    /// Attach `component` only if present
    pub fn maybe<T: Component>(self, component: Option<T>) -> Self {
        match component {
            Some(component) => self.with(component),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_items(self) -> Vec<(&'static str, Box<dyn Any>)> {
        self.items
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items.iter().map(|(kind, _)| kind))
            .finish()
    }
}

/// Component storage for one entity
///
/// The mask is derived from the map and only changes together with it.
#[derive(Default)]
pub struct EntityRecord {
    components: HashMap<ComponentId, Box<dyn Any>>,
    mask: ComponentMask,
}

impl EntityRecord {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store `component` under `id`, replacing any previous instance
    pub(crate) fn insert(&mut self, id: ComponentId, component: Box<dyn Any>) {
        self.components.insert(id, component);
        self.mask = self.mask.with(id);
    }

    /// Drop the component under `id`. Returns whether one was present.
    pub(crate) fn remove(&mut self, id: ComponentId) -> bool {
        self.mask = self.mask.without(id);
        self.components.remove(&id).is_some()
    }

    pub fn mask(&self) -> ComponentMask {
        self.mask
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.mask.contains(id)
    }

    pub fn get_by_id(&self, id: ComponentId) -> Option<&dyn Any> {
        self.components.get(&id).map(|c| &**c)
    }

    pub fn get_mut_by_id(&mut self, id: ComponentId) -> Option<&mut dyn Any> {
        self.components.get_mut(&id).map(|c| &mut **c)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<usize> = self.components.keys().map(|id| id.index()).collect();
        ids.sort_unstable();
        f.debug_struct("EntityRecord")
            .field("mask", &format_args!("{:#b}", self.mask.bits()))
            .field("ids", &ids)
            .finish()
    }
}

/// An entity taken out of a store, components intact
///
/// Handing it back via `EntityStore::add_entity` restores it under the same
/// handle. Only the store it came from accepts it.
#[derive(Debug)]
pub struct DetachedEntity {
    pub(crate) store: StoreId,
    pub(crate) entity: Entity,
    pub(crate) record: EntityRecord,
}

impl DetachedEntity {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Store this entity was removed from
    pub fn store(&self) -> StoreId {
        self.store
    }

    pub fn record(&self) -> &EntityRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn expected_mask(present: &[bool; 8]) -> u64 {
        present
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .fold(0, |m, (i, _)| m | 1 << i)
    }

    #[test]
    fn test_insert_and_remove_keep_mask_in_sync() {
        let mut record = EntityRecord::new();
        let a = ComponentId::new(0);
        let b = ComponentId::new(3);

        record.insert(a, Box::new(1u32));
        record.insert(b, Box::new("fin"));
        assert_eq!(record.mask().bits(), 0b1001);
        assert_eq!(record.len(), 2);

        assert!(record.remove(a));
        assert_eq!(record.mask().bits(), 0b1000);
        assert!(record.get_by_id(a).is_none());

        // Removing again is a no-op
        assert!(!record.remove(a));
        assert_eq!(record.mask().bits(), 0b1000);
    }

    #[test]
    fn test_replacing_component_keeps_single_instance() {
        let mut record = EntityRecord::new();
        let id = ComponentId::new(1);

        record.insert(id, Box::new(1.0f32));
        record.insert(id, Box::new(2.0f32));

        assert_eq!(record.len(), 1);
        let value = record.get_by_id(id).and_then(|c| c.downcast_ref::<f32>());
        assert_eq!(value, Some(&2.0));
    }

    #[test]
    fn test_components_maybe_skips_none() {
        struct Fin;
        impl Component for Fin {
            const KIND: &'static str = "fin";
        }

        let batch = Components::new().maybe(Some(Fin)).maybe(None::<Fin>);
        assert_eq!(batch.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_mask_is_or_of_present_ids(ops in prop::collection::vec((0usize..8, any::<bool>()), 0..64)) {
            let mut record = EntityRecord::new();
            let mut present = [false; 8];

            for (index, add) in ops {
                let id = ComponentId::new(index);
                if add {
                    record.insert(id, Box::new(index));
                } else {
                    record.remove(id);
                }
                present[index] = add;

                prop_assert_eq!(record.mask().bits(), expected_mask(&present));
                prop_assert_eq!(record.len() as u32, record.mask().count());
            }
        }
    }
}
