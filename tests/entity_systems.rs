//! Entity store and iterating systems through the public API

use std::cell::RefCell;
use std::rc::Rc;

use plunge::entities::{
    Component, ComponentMask, Components, Entity, EntityEvent, EntityListener, EntityStore, InstantSystem,
    IteratingSystem,
};

struct Position(f32);
impl Component for Position {
    const KIND: &'static str = "position";
}

struct Velocity(f32);
impl Component for Velocity {
    const KIND: &'static str = "velocity";
}

struct Frozen;
impl Component for Frozen {
    const KIND: &'static str = "frozen";
}

/// Moves every entity with a position and velocity, freezing the ones past 10
struct Mover {
    system: IteratingSystem,
    moved: Vec<Entity>,
}

impl InstantSystem for Mover {
    fn iteration(&mut self) -> &mut IteratingSystem {
        &mut self.system
    }

    fn begin(&mut self, _store: &mut EntityStore) {
        self.moved.clear();
    }

    fn process_entity(&mut self, store: &mut EntityStore, entity: Entity) {
        let Some(v) = store.get::<Velocity>(entity).map(|v| v.0) else {
            return;
        };
        let Some(p) = store.get_mut::<Position>(entity) else {
            return;
        };
        p.0 += v;
        let past = p.0 > 10.0;
        self.moved.push(entity);

        if past {
            let velocity = store.component_id::<Velocity>();
            store.remove_components(entity, &[velocity]);
            store.add_components(entity, Components::new().with(Frozen));
        }
    }
}

#[derive(Default)]
struct EventLog(Vec<(EntityEvent, Entity)>);

impl EntityListener for EventLog {
    fn on_entity_event(&mut self, event: EntityEvent, entity: Entity, _mask: ComponentMask) {
        self.0.push((event, entity));
    }
}

#[test]
fn test_systems_with_overlapping_masks() {
    let mut store = EntityStore::new();
    let positioned = store.mask_of(&[Position::KIND]);
    let moving = store.mask_of(&[Position::KIND, Velocity::KIND]);
    let mut all = IteratingSystem::subscribe("positioned", &mut store, positioned);
    let mut mover = Mover {
        system: IteratingSystem::subscribe("mover", &mut store, moving),
        moved: Vec::new(),
    };

    let still = store.create_entity(Components::new().with(Position(0.0)));
    let fast = store.create_entity(Components::new().with(Position(0.0)).with(Velocity(6.0)));

    mover.process(&mut store);
    all.commit_pending();
    assert_eq!(mover.moved, vec![fast]);
    assert_eq!(all.entities(), vec![still, fast]);

    // Second pass pushes `fast` past 10 and freezes it; it's still visited
    mover.process(&mut store);
    assert_eq!(mover.moved, vec![fast]);
    assert!(store.get::<Frozen>(fast).is_some());

    // Third pass no longer sees it
    mover.process(&mut store);
    assert!(mover.moved.is_empty());
    assert_eq!(store.get::<Position>(fast).map(|p| p.0), Some(12.0));

    all.commit_pending();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_listener_sees_every_lifecycle_event() {
    let mut store = EntityStore::new();
    let early = store.create_entity(Components::new().with(Position(1.0)));

    let log = Rc::new(RefCell::new(EventLog::default()));
    let id = store.add_listener(log.clone());

    let e = store.create_entity(Components::new().maybe(None::<Velocity>));
    store.add_components(e, Components::new().with(Position(2.0)).with(Velocity(1.0)));
    // Nothing attached: no event
    store.add_components(e, Components::new().maybe(None::<Frozen>));
    let detached = store.remove_entity(e).unwrap();
    store.add_entity(detached).unwrap();

    assert!(store.remove_listener(id));
    store.remove_entity(early);

    assert_eq!(
        log.borrow().0,
        vec![
            (EntityEvent::Added, early),
            (EntityEvent::Added, e),
            (EntityEvent::Changed, e),
            (EntityEvent::Removed, e),
            (EntityEvent::Added, e),
        ]
    );
    assert_eq!(store.get::<Velocity>(e).map(|v| v.0), Some(1.0));
}
