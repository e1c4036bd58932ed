//! Component-bitmask entity store
//!
//! Entities carry a sparse set of components and a derived bitmask of which
//! kinds are present. The store reports every structural change to its
//! listeners; iterating systems use those reports to keep a working set of
//! entities matching a required mask without rescanning the store.
//!
//! Everything here is single-threaded. Listener state is shared through
//! `Rc<RefCell<_>>` and only borrowed for the length of one callback.

pub mod entity;
pub mod mask;
pub mod registry;
pub mod store;
pub mod system;

pub use entity::{Component, Components, DetachedEntity, Entity, EntityRecord};
pub use mask::{ComponentId, ComponentMask, MAX_COMPONENT_KINDS};
pub use registry::ComponentRegistry;
pub use store::{EntityEvent, EntityListener, EntityStore, ListenerId, SharedListener, StoreId};
pub use system::{InstantSystem, IteratingSystem, Membership, TimedSystem};
