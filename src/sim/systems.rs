//! Game systems driven by the scene

use std::collections::BTreeMap;

use glam::Vec2;

use super::components::{FillKind, PhysicsBody, Pose, Renderable, Rgba};
use crate::entities::{Component, Entity, EntityStore, InstantSystem, IteratingSystem, TimedSystem};
use crate::physics::{BodyHandle, Shape, Transform, World};

/// Copies body poses from the physics world into `Pose` components
///
/// Runs once per fixed step, after buoyancy. Poses are staged from the world
/// before the pass since hooks only see the entity store.
#[derive(Debug)]
pub struct PoseSyncSystem {
    system: IteratingSystem,
    staged: BTreeMap<BodyHandle, Pose>,
    synced: usize,
}

impl PoseSyncSystem {
    pub fn new(store: &mut EntityStore) -> Self {
        let mask = store.mask_of(&[PhysicsBody::KIND, Pose::KIND]);
        Self {
            system: IteratingSystem::subscribe("pose_sync", store, mask),
            staged: BTreeMap::new(),
            synced: 0,
        }
    }

    /// Capture every body's pose for the next pass
    pub fn stage(&mut self, world: &World) {
        self.staged.clear();
        self.staged.extend(world.bodies().map(|(handle, body)| {
            (
                handle,
                Pose {
                    position: body.position(),
                    angle: body.angle(),
                    velocity: body.linear_velocity(),
                },
            )
        }));
    }

    /// Entities updated by the last pass
    pub fn synced(&self) -> usize {
        self.synced
    }

    pub fn system(&self) -> &IteratingSystem {
        &self.system
    }
}

impl TimedSystem for PoseSyncSystem {
    fn iteration(&mut self) -> &mut IteratingSystem {
        &mut self.system
    }

    fn begin(&mut self, _store: &mut EntityStore, _delta: f32) {
        self.synced = 0;
    }

    fn process_entity(&mut self, store: &mut EntityStore, entity: Entity, _delta: f32) {
        let Some(body) = store.get::<PhysicsBody>(entity).map(|p| p.body) else {
            return;
        };
        let Some(staged) = self.staged.get(&body) else {
            log::trace!("{} has no staged pose for {}", entity, body);
            return;
        };
        if let Some(pose) = store.get_mut::<Pose>(entity) {
            *pose = *staged;
            self.synced += 1;
        }
    }
}

/// World-space geometry to draw
#[derive(Debug, Clone, PartialEq)]
pub enum DrawShape {
    Circle { center: Vec2, radius: f32 },
    Polygon { points: Vec<Vec2> },
    Line { from: Vec2, to: Vec2 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub fill: FillKind,
    pub color: Rgba,
    pub shape: DrawShape,
}

/// Builds the frame's draw list from every renderable body
///
/// Processed once per rendered frame; the list is rebuilt from scratch each
/// pass and left for the caller to consume.
#[derive(Debug)]
pub struct ShapeListSystem {
    system: IteratingSystem,
    commands: Vec<DrawCommand>,
}

impl ShapeListSystem {
    pub fn new(store: &mut EntityStore) -> Self {
        let mask = store.mask_of(&[PhysicsBody::KIND, Pose::KIND, Renderable::KIND]);
        Self {
            system: IteratingSystem::subscribe("shape_list", store, mask),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn system(&self) -> &IteratingSystem {
        &self.system
    }
}

impl InstantSystem for ShapeListSystem {
    fn iteration(&mut self) -> &mut IteratingSystem {
        &mut self.system
    }

    fn begin(&mut self, _store: &mut EntityStore) {
        self.commands.clear();
    }

    fn process_entity(&mut self, store: &mut EntityStore, entity: Entity) {
        let (Some(body), Some(pose), Some(look)) = (
            store.get::<PhysicsBody>(entity),
            store.get::<Pose>(entity),
            store.get::<Renderable>(entity),
        ) else {
            return;
        };

        let xf = Transform::new(pose.position, pose.angle);
        for shape in &body.shapes {
            push_shape(&mut self.commands, shape, &xf, look);
        }
    }
}

fn push_shape(commands: &mut Vec<DrawCommand>, shape: &Shape, xf: &Transform, look: &Renderable) {
    let mut push = |shape| {
        commands.push(DrawCommand {
            fill: look.fill,
            color: look.color,
            shape,
        })
    };

    match *shape {
        Shape::Circle { center, radius } => {
            let center = xf.apply(center);
            push(DrawShape::Circle { center, radius });
            if look.fill == FillKind::Directed {
                push(DrawShape::Line {
                    from: center,
                    to: center + xf.rotate(Vec2::new(radius, 0.0)),
                });
            }
        }
        Shape::Rect { .. } => {
            if let Some(corners) = shape.corners(xf) {
                push(DrawShape::Polygon {
                    points: corners.to_vec(),
                });
            }
        }
    }
}
