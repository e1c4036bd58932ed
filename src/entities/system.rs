//! Iterating systems
//!
//! A system subscribes to the store with a required component mask and keeps
//! a working set of matching entities. Store events only queue changes; the
//! queues are committed at the start of each processing pass, and the pass
//! then walks a frozen snapshot. Anything a hook does to the store during the
//! pass shows up on the next one.
//!
//! Per-entity lifecycle inside one system:
//! not tracked → pending add → tracked → pending remove → not tracked

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use super::entity::Entity;
use super::mask::ComponentMask;
use super::store::{EntityEvent, EntityListener, EntityStore, ListenerId, SharedListener};

/// Working set plus the two pending buffers
///
/// This is the half of a system the store talks to.
#[derive(Debug)]
pub struct Membership {
    mask: ComponentMask,
    tracked: BTreeSet<Entity>,
    pending_add: BTreeSet<Entity>,
    pending_remove: BTreeSet<Entity>,
}

impl Membership {
    pub fn new(mask: ComponentMask) -> Self {
        Self {
            mask,
            tracked: BTreeSet::new(),
            pending_add: BTreeSet::new(),
            pending_remove: BTreeSet::new(),
        }
    }

    /// Entity must carry at least every required component
    #[inline]
    pub fn accepts(&self, mask: ComponentMask) -> bool {
        self.mask.is_satisfied_by(mask)
    }

    // Queueing one kind cancels a pending entry of the other kind, so the
    // latest event for an entity decides its membership after the commit.
    fn enqueue_add(&mut self, entity: Entity) {
        self.pending_remove.remove(&entity);
        self.pending_add.insert(entity);
    }

    fn enqueue_remove(&mut self, entity: Entity) {
        self.pending_add.remove(&entity);
        self.pending_remove.insert(entity);
    }

    /// Apply queued removals, then queued additions, then clear both queues
    pub fn commit(&mut self) {
        for entity in std::mem::take(&mut self.pending_remove) {
            self.tracked.remove(&entity);
        }
        for entity in std::mem::take(&mut self.pending_add) {
            self.tracked.insert(entity);
        }
    }
}

impl EntityListener for Membership {
    fn on_entity_event(&mut self, event: EntityEvent, entity: Entity, mask: ComponentMask) {
        match event {
            EntityEvent::Added => {
                if self.accepts(mask) {
                    self.enqueue_add(entity);
                }
            }
            EntityEvent::Changed => {
                if self.accepts(mask) {
                    self.enqueue_add(entity);
                } else {
                    self.enqueue_remove(entity);
                }
            }
            EntityEvent::Removed => self.enqueue_remove(entity),
        }
    }
}

/// Shared base of every iterating system
pub struct IteratingSystem {
    name: &'static str,
    membership: Rc<RefCell<Membership>>,
    listener: Option<ListenerId>,
    /// Reused buffer holding the frozen working set during a pass
    snapshot: Vec<Entity>,
}

impl IteratingSystem {
    /// Create a system that is not yet subscribed to any store
    pub fn new(name: &'static str, mask: ComponentMask) -> Self {
        log::debug!(
            "Initialized entity system \"{}\", mask: {:#b}",
            name,
            mask.bits()
        );
        Self {
            name,
            membership: Rc::new(RefCell::new(Membership::new(mask))),
            listener: None,
            snapshot: Vec::new(),
        }
    }

    /// Create a system and subscribe it to `store` right away
    pub fn subscribe(name: &'static str, store: &mut EntityStore, mask: ComponentMask) -> Self {
        let mut system = Self::new(name, mask);
        system.attach(store);
        system
    }

    /// Subscribe to `store`; existing entities are replayed as additions
    ///
    /// Re-attaching to the same store replaces the old subscription. A system
    /// subscribed to a different store stays there and this returns `false`.
    pub fn attach(&mut self, store: &mut EntityStore) -> bool {
        if let Some(previous) = self.listener {
            if !store.issued(previous) {
                log::warn!(
                    "System \"{}\" is subscribed to another store; detach it first",
                    self.name
                );
                return false;
            }
            log::warn!("System \"{}\" attached twice; dropping old subscription", self.name);
            store.remove_listener(previous);
        }
        self.listener = Some(store.add_listener(self.listener_handle()));
        true
    }

    /// Unsubscribe from `store`. The working set is left as it was.
    ///
    /// Returns `false`, keeping the subscription, if `store` isn't the one
    /// this system is attached to.
    pub fn detach(&mut self, store: &mut EntityStore) -> bool {
        match self.listener {
            Some(id) if store.issued(id) => {
                self.listener = None;
                store.remove_listener(id)
            }
            Some(_) => {
                log::warn!("System \"{}\" detached from a store it never joined", self.name);
                false
            }
            None => false,
        }
    }

    /// Listener half, for registering with a store by hand
    pub fn listener_handle(&self) -> SharedListener {
        self.membership.clone()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mask(&self) -> ComponentMask {
        self.membership.borrow().mask
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// Fold pending changes into the working set
    pub fn commit_pending(&mut self) {
        self.membership.borrow_mut().commit();
    }

    /// Committed working set, in entity order
    pub fn entities(&self) -> Vec<Entity> {
        self.membership.borrow().tracked.iter().copied().collect()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.membership.borrow().tracked.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.membership.borrow().tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queued (additions, removals) awaiting the next commit
    pub fn pending(&self) -> (usize, usize) {
        let membership = self.membership.borrow();
        (membership.pending_add.len(), membership.pending_remove.len())
    }

    /// Commit, then freeze the working set for one pass
    ///
    /// No borrow of the membership is held once this returns, so hooks are
    /// free to mutate the store.
    fn begin_pass(&mut self) -> Vec<Entity> {
        let mut snapshot = std::mem::take(&mut self.snapshot);
        snapshot.clear();

        let mut membership = self.membership.borrow_mut();
        membership.commit();
        snapshot.extend(membership.tracked.iter().copied());
        snapshot
    }

    fn end_pass(&mut self, snapshot: Vec<Entity>) {
        self.snapshot = snapshot;
    }
}

impl std::fmt::Debug for IteratingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IteratingSystem")
            .field("name", &self.name)
            .field("membership", &self.membership.borrow())
            .field("attached", &self.listener.is_some())
            .finish()
    }
}

/// System processed once per rendered frame, without a time step
pub trait InstantSystem {
    fn iteration(&mut self) -> &mut IteratingSystem;

    fn begin(&mut self, _store: &mut EntityStore) {}

    fn process_entity(&mut self, store: &mut EntityStore, entity: Entity);

    fn end(&mut self, _store: &mut EntityStore) {}

    /// Commit pending changes, then run `begin`, every entity, `end`
    fn process(&mut self, store: &mut EntityStore) {
        let entities = self.iteration().begin_pass();
        self.begin(store);
        for &entity in &entities {
            self.process_entity(store, entity);
        }
        self.end(store);
        self.iteration().end_pass(entities);
    }
}

/// System processed once per fixed simulation step
pub trait TimedSystem {
    fn iteration(&mut self) -> &mut IteratingSystem;

    fn begin(&mut self, _store: &mut EntityStore, _delta: f32) {}

    fn process_entity(&mut self, store: &mut EntityStore, entity: Entity, delta: f32);

    fn end(&mut self, _store: &mut EntityStore, _delta: f32) {}

    /// Commit pending changes, then run `begin`, every entity, `end`
    fn process(&mut self, store: &mut EntityStore, delta: f32) {
        let entities = self.iteration().begin_pass();
        self.begin(store, delta);
        for &entity in &entities {
            self.process_entity(store, entity, delta);
        }
        self.end(store, delta);
        self.iteration().end_pass(entities);
    }
}
