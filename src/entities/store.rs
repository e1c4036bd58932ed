//! Entity store - owns live entities and fans out lifecycle events
//!
//! Every structural operation produces exactly one event per listener,
//! delivered synchronously in listener registration order.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::entity::{Component, Components, DetachedEntity, Entity, EntityRecord};
use super::mask::{ComponentId, ComponentMask};
use super::registry::ComponentRegistry;

/// Kind of lifecycle change being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
    /// Entity became live (created, re-added, or replayed to a late listener)
    Added,
    /// Entity left the store
    Removed,
    /// Entity's component set changed
    Changed,
}

/// Subscriber to store events
///
/// Listeners see the handle and the mask as of the event, never the store
/// itself, so they cannot mutate the store while it is delivering.
pub trait EntityListener {
    fn on_entity_event(&mut self, event: EntityEvent, entity: Entity, mask: ComponentMask);
}

/// Listener handle shared between the store and its owner
pub type SharedListener = Rc<RefCell<dyn EntityListener>>;

/// Process-wide identity of one store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u32);

static NEXT_STORE: AtomicU32 = AtomicU32::new(0);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registration token returned by [`EntityStore::add_listener`]
///
/// Only meaningful to the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    store: StoreId,
    seq: u32,
}

pub struct EntityStore {
    id: StoreId,
    registry: ComponentRegistry,
    /// Live entities, ordered by handle (creation order)
    entities: BTreeMap<Entity, EntityRecord>,
    /// Subscribers in registration order
    listeners: Vec<(ListenerId, SharedListener)>,
    next_entity: u32,
    next_listener: u32,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            id: StoreId::next(),
            registry: ComponentRegistry::new(),
            entities: BTreeMap::new(),
            listeners: Vec::new(),
            next_entity: 0,
            next_listener: 0,
        }
    }

    // === Component kinds ===

    /// Id for component type `T`, assigning one on first use
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        self.registry.id_of(T::KIND)
    }

    /// Id for a component kind key, assigning one on first use
    pub fn id_of(&mut self, kind: &'static str) -> ComponentId {
        self.registry.id_of(kind)
    }

    /// Mask requiring every listed kind
    pub fn mask_of(&mut self, kinds: &[&'static str]) -> ComponentMask {
        kinds
            .iter()
            .fold(ComponentMask::EMPTY, |mask, kind| mask.with(self.registry.id_of(*kind)))
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    // === Entity lifecycle ===

    /// Create a live entity carrying `components`
    ///
    /// Listeners get a single `Added`, however many components it starts with.
    pub fn create_entity(&mut self, components: Components) -> Entity {
        let entity = Entity::from_raw(self.next_entity);
        self.next_entity += 1;

        let mut record = EntityRecord::new();
        for (kind, component) in components.into_items() {
            let id = self.registry.id_of(kind);
            record.insert(id, component);
        }

        let mask = record.mask();
        self.entities.insert(entity, record);
        self.notify(EntityEvent::Added, entity, mask);
        entity
    }

    /// Put a previously removed entity back under its original handle
    ///
    /// Handles are only unique within one store, so an entity detached from
    /// another store is handed back untouched and produces no event.
    pub fn add_entity(&mut self, detached: DetachedEntity) -> Result<Entity, DetachedEntity> {
        if detached.store != self.id {
            log::warn!("add_entity: {} belongs to another store", detached.entity);
            return Err(detached);
        }

        let DetachedEntity { entity, record, .. } = detached;
        let mask = record.mask();
        // Handles are never reissued and a detached entity is consumed here
        debug_assert!(!self.entities.contains_key(&entity));
        self.entities.insert(entity, record);
        self.notify(EntityEvent::Added, entity, mask);
        Ok(entity)
    }

    /// Deregister `entity`, handing its components back
    ///
    /// Unknown handles are ignored and produce no event.
    pub fn remove_entity(&mut self, entity: Entity) -> Option<DetachedEntity> {
        let Some(record) = self.entities.remove(&entity) else {
            log::debug!("remove_entity: {} is not live", entity);
            return None;
        };
        self.notify(EntityEvent::Removed, entity, record.mask());
        Some(DetachedEntity {
            store: self.id,
            entity,
            record,
        })
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    // === Components ===

    /// Attach a batch of components. Emits one `Changed` if anything was stored.
    pub fn add_components(&mut self, entity: Entity, components: Components) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            log::debug!("add_components: {} is not live", entity);
            return false;
        };

        let mut added = false;
        for (kind, component) in components.into_items() {
            let id = self.registry.id_of(kind);
            record.insert(id, component);
            added = true;
        }

        if added {
            let mask = record.mask();
            self.notify(EntityEvent::Changed, entity, mask);
        }
        added
    }

    /// Detach the listed component ids. Emits one `Changed` if any were present.
    pub fn remove_components(&mut self, entity: Entity, ids: &[ComponentId]) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            log::debug!("remove_components: {} is not live", entity);
            return false;
        };

        let mut removed = false;
        for id in ids {
            removed |= record.remove(*id);
        }

        if removed {
            let mask = record.mask();
            self.notify(EntityEvent::Changed, entity, mask);
        }
        removed
    }

    /// Detach component type `T` if present
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        match self.registry.lookup(T::KIND) {
            Some(id) => self.remove_components(entity, &[id]),
            None => false,
        }
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.registry.lookup(T::KIND)?;
        self.component_by_id(entity, id)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.lookup(T::KIND)?;
        self.entities
            .get_mut(&entity)?
            .get_mut_by_id(id)?
            .downcast_mut::<T>()
    }

    /// Untyped lookup; `None` when the entity lacks that component
    pub fn component_by_id(&self, entity: Entity, id: ComponentId) -> Option<&dyn Any> {
        debug_assert!(
            id.index() < self.registry.len(),
            "component id {} was never assigned",
            id.index()
        );
        self.entities.get(&entity)?.get_by_id(id)
    }

    pub fn mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.entities.get(&entity).map(EntityRecord::mask)
    }

    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.entities.get(&entity)
    }

    // === Listeners ===

    /// Subscribe `listener`, replaying `Added` for every live entity
    pub fn add_listener(&mut self, listener: SharedListener) -> ListenerId {
        let id = ListenerId {
            store: self.id,
            seq: self.next_listener,
        };
        self.next_listener += 1;

        {
            let mut subscriber = listener.borrow_mut();
            for (entity, record) in &self.entities {
                subscriber.on_entity_event(EntityEvent::Added, *entity, record.mask());
            }
        }

        log::debug!(
            "Listener {} subscribed, replayed {} entities",
            id.seq,
            self.entities.len()
        );
        self.listeners.push((id, listener));
        id
    }

    /// Unsubscribe. No `Removed` events are sent for entities it had seen.
    ///
    /// Ids issued by another store are ignored.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        if !self.issued(id) {
            log::debug!("remove_listener: listener {} belongs to another store", id.seq);
            return false;
        }
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Whether `id` came from this store's `add_listener`
    pub fn issued(&self, id: ListenerId) -> bool {
        id.store == self.id
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, event: EntityEvent, entity: Entity, mask: ComponentMask) {
        for (_, listener) in &self.listeners {
            listener.borrow_mut().on_entity_event(event, entity, mask);
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("id", &self.id.0)
            .field("entities", &self.entities.len())
            .field("listeners", &self.listeners.len())
            .field("component_kinds", &self.registry.len())
            .finish()
    }
}
