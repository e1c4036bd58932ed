//! Buoyancy and fluid drag
//!
//! The controller holds the bodies currently overlapping the fluid. Contact
//! handling decides membership; [`BuoyancyController::step`] only reads it.
//! Each submerged fixture gets its own buoyant force, linear drag and
//! angular drag, applied at the centroid of its submerged area.

pub mod submersion;

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::{BodyHandle, BodyState, Fixture, Physics};

pub use submersion::{Submersion, circle_submersion};
use submersion::negligible_area;

/// Fluid parameters, fixed for the controller's lifetime unless retuned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fluid {
    /// Unit normal pointing out of the fluid
    pub surface_normal: Vec2,
    /// Surface offset along the normal
    pub surface_height: f32,
    pub velocity: Vec2,
    pub gravity: Vec2,
    pub density: f32,
    pub linear_drag: f32,
    pub angular_drag: f32,
}

impl Default for Fluid {
    fn default() -> Self {
        Self {
            surface_normal: Vec2::Y,
            surface_height: 0.0,
            velocity: Vec2::ZERO,
            gravity: Vec2::new(0.0, -9.81),
            density: 1.0,
            linear_drag: 0.0,
            angular_drag: 0.0,
        }
    }
}

/// Forces one fixture receives for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidForce {
    pub area: f32,
    /// Application point for both linear forces
    pub centroid: Vec2,
    pub buoyancy: Vec2,
    pub drag: Vec2,
    pub angular_drag: f32,
}

impl Fluid {
    /// Forces on `fixture` of a body in state `state`, if any of it is wet
    ///
    /// Sensors, massless fixtures and shapes without a submersion formula
    /// get nothing.
    pub fn fixture_force(&self, fixture: &Fixture, state: &BodyState) -> Option<FluidForce> {
        if fixture.sensor || fixture.density == 0.0 {
            return None;
        }

        let Submersion { area, centroid } =
            fixture
                .shape
                .submerged(&state.transform, self.surface_normal, self.surface_height)?;
        if negligible_area(area) {
            return None;
        }

        // Opposes gravity
        let buoyancy = -self.gravity * self.density * area;
        let drag = -(state.velocity_at(centroid) - self.velocity) * self.linear_drag * area;
        // Mass floor of 1 keeps featherweight bodies from spinning up
        let angular_drag =
            -state.origin_inertia() / state.mass.max(1.0) * area * state.angular_velocity * self.angular_drag;

        Some(FluidForce {
            area,
            centroid,
            buoyancy,
            drag,
            angular_drag,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuoyancyController {
    fluid: Fluid,
    bodies: BTreeSet<BodyHandle>,
}

impl BuoyancyController {
    pub fn new(fluid: Fluid) -> Self {
        log::debug!(
            "Buoyancy controller: density {}, linear drag {}, angular drag {}",
            fluid.density,
            fluid.linear_drag,
            fluid.angular_drag
        );
        Self {
            fluid,
            bodies: BTreeSet::new(),
        }
    }

    pub fn fluid(&self) -> &Fluid {
        &self.fluid
    }

    pub fn set_fluid(&mut self, fluid: Fluid) {
        self.fluid = fluid;
    }

    /// Start applying fluid forces to `body`. Returns false if already tracked.
    pub fn track(&mut self, body: BodyHandle) -> bool {
        self.bodies.insert(body)
    }

    /// Stop applying fluid forces to `body`. Returns false if it wasn't tracked.
    pub fn untrack(&mut self, body: BodyHandle) -> bool {
        self.bodies.remove(&body)
    }

    pub fn is_tracked(&self, body: BodyHandle) -> bool {
        self.bodies.contains(&body)
    }

    pub fn bodies(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Apply one step of fluid forces to every tracked body
    ///
    /// Returns how many fixtures received forces. Bodies the engine no longer
    /// knows are skipped for this step but stay tracked.
    pub fn step<P: Physics + ?Sized>(&self, physics: &mut P) -> usize {
        let mut applied = 0;
        let mut forces: Vec<FluidForce> = Vec::new();

        for &body in &self.bodies {
            let (Some(state), Some(fixtures)) = (physics.body_state(body), physics.fixtures(body)) else {
                log::trace!("Buoyancy: {} missing from physics, skipped", body);
                continue;
            };

            forces.clear();
            forces.extend(
                fixtures
                    .iter()
                    .filter_map(|fixture| self.fluid.fixture_force(fixture, &state)),
            );

            for force in &forces {
                physics.apply_force(body, force.buoyancy, force.centroid);
                physics.apply_force(body, force.drag, force.centroid);
                physics.apply_torque(body, force.angular_drag);
            }
            applied += forces.len();
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyDef, Shape, World};
    use std::f32::consts::PI;

    const GRAVITY: f32 = 15.0;

    fn pond() -> Fluid {
        Fluid {
            gravity: Vec2::new(0.0, -GRAVITY),
            density: 2.0,
            linear_drag: 1.5,
            angular_drag: 0.5,
            ..Default::default()
        }
    }

    fn circle_body(world: &mut World, position: Vec2, radius: f32) -> BodyHandle {
        let body = world.create_body(BodyDef::dynamic(position));
        world
            .add_fixture(body, Fixture::new(Shape::circle(radius), 1.0))
            .unwrap();
        body
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut world = World::new(Vec2::ZERO);
        let body = circle_body(&mut world, Vec2::ZERO, 1.0);
        let mut controller = BuoyancyController::new(pond());

        assert!(controller.track(body));
        assert!(!controller.track(body));
        assert_eq!(controller.len(), 1);

        assert!(controller.untrack(body));
        assert!(!controller.untrack(body));
        assert!(controller.is_empty());
    }

    #[test]
    fn test_dry_body_gets_nothing() {
        let mut world = World::new(Vec2::new(0.0, -GRAVITY));
        let body = circle_body(&mut world, Vec2::new(0.0, 2.0), 1.0);
        let mut controller = BuoyancyController::new(pond());
        controller.track(body);

        assert_eq!(controller.step(&mut world), 0);
        let b = world.body(body).unwrap();
        assert_eq!(b.pending_force(), Vec2::ZERO);
        assert_eq!(b.pending_torque(), 0.0);
    }

    #[test]
    fn test_submerged_body_gets_archimedes_force() {
        let mut world = World::new(Vec2::new(0.0, -GRAVITY));
        let body = circle_body(&mut world, Vec2::new(0.0, -2.0), 1.0);
        let mut controller = BuoyancyController::new(pond());
        controller.track(body);

        assert_eq!(controller.step(&mut world), 1);
        let force = world.body(body).unwrap().pending_force();
        let expected = GRAVITY * 2.0 * PI;
        assert!(force.x.abs() < 1e-4);
        assert!((force.y - expected).abs() < 1e-3);
    }

    #[test]
    fn test_fixture_force_components() {
        let fluid = pond();
        let fixture = Fixture::new(Shape::circle(1.0), 1.0);
        let state = BodyState {
            transform: crate::physics::Transform::new(Vec2::new(0.0, -3.0), 0.0),
            world_center: Vec2::new(0.0, -3.0),
            linear_velocity: Vec2::new(2.0, 0.0),
            angular_velocity: 1.0,
            mass: 0.25,
            inertia: 0.5,
        };

        let force = fluid.fixture_force(&fixture, &state).unwrap();
        assert!((force.area - PI).abs() < 1e-5);
        assert_eq!(force.centroid, Vec2::new(0.0, -3.0));
        // Drag opposes the relative velocity
        assert!((force.drag - Vec2::new(-2.0 * 1.5 * PI, 0.0)).length() < 1e-4);
        // Mass below 1 is floored: -0.5 / 1 * π * 1 * 0.5
        assert!((force.angular_drag + 0.25 * PI).abs() < 1e-5);
    }

    #[test]
    fn test_angular_drag_uses_inertia_about_origin() {
        let fluid = Fluid {
            angular_drag: 1.0,
            ..pond()
        };
        // Fixture sits one unit right of the body origin
        let fixture = Fixture::new(
            Shape::Circle {
                center: Vec2::new(1.0, 0.0),
                radius: 1.0,
            },
            1.0,
        );
        let state = BodyState {
            transform: crate::physics::Transform::new(Vec2::new(0.0, -3.0), 0.0),
            world_center: Vec2::new(1.0, -3.0),
            linear_velocity: Vec2::ZERO,
            angular_velocity: 1.0,
            mass: 2.0,
            inertia: 0.5,
        };

        let force = fluid.fixture_force(&fixture, &state).unwrap();
        // -(0.5 + 2 * 1²) / 2 * π * 1 * 1
        assert!((force.angular_drag + 1.25 * PI).abs() < 1e-4);
    }

    #[test]
    fn test_drag_follows_fluid_velocity() {
        let fluid = Fluid {
            velocity: Vec2::new(1.0, 0.0),
            ..pond()
        };
        let fixture = Fixture::new(Shape::circle(1.0), 1.0);
        let state = BodyState {
            transform: crate::physics::Transform::new(Vec2::new(0.0, -3.0), 0.0),
            world_center: Vec2::new(0.0, -3.0),
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            inertia: 0.5,
        };

        // Body at rest in a current gets pushed along with it
        let force = fluid.fixture_force(&fixture, &state).unwrap();
        assert!(force.drag.x > 0.0);
        assert_eq!(force.angular_drag, 0.0);
    }

    #[test]
    fn test_sensor_and_massless_fixtures_skipped() {
        let fluid = pond();
        let state = BodyState {
            transform: crate::physics::Transform::new(Vec2::new(0.0, -3.0), 0.0),
            world_center: Vec2::new(0.0, -3.0),
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            inertia: 1.0,
        };

        let sensor = Fixture::new(Shape::circle(1.0), 1.0).sensor(true);
        let massless = Fixture::new(Shape::circle(1.0), 0.0);
        assert!(fluid.fixture_force(&sensor, &state).is_none());
        assert!(fluid.fixture_force(&massless, &state).is_none());
    }

    #[test]
    fn test_unsupported_shape_does_not_block_others() {
        let mut world = World::new(Vec2::ZERO);
        let body = world.create_body(BodyDef::dynamic(Vec2::new(0.0, -5.0)));
        world
            .add_fixture(body, Fixture::new(Shape::rect(Vec2::splat(1.0)), 1.0))
            .unwrap();
        world
            .add_fixture(body, Fixture::new(Shape::circle(0.5), 1.0))
            .unwrap();

        let mut controller = BuoyancyController::new(pond());
        controller.track(body);
        assert_eq!(controller.step(&mut world), 1);
        assert!(world.body(body).unwrap().pending_force().y > 0.0);
    }

    #[test]
    fn test_each_fixture_contributes_at_its_own_centroid() {
        let mut world = World::new(Vec2::ZERO);
        let body = world.create_body(BodyDef::dynamic(Vec2::new(0.0, -5.0)));
        for x in [-1.0, 1.0] {
            world
                .add_fixture(
                    body,
                    Fixture::new(
                        Shape::Circle {
                            center: Vec2::new(x, 0.0),
                            radius: 0.5,
                        },
                        1.0,
                    ),
                )
                .unwrap();
        }

        let mut controller = BuoyancyController::new(pond());
        controller.track(body);
        assert_eq!(controller.step(&mut world), 2);

        // Symmetric pair: forces add up, torques cancel
        let b = world.body(body).unwrap();
        assert!((b.pending_force().y - 2.0 * GRAVITY * 2.0 * PI * 0.25).abs() < 1e-3);
        assert!(b.pending_torque().abs() < 1e-3);
    }

    #[test]
    fn test_destroyed_body_stays_tracked() {
        let mut world = World::new(Vec2::ZERO);
        let body = circle_body(&mut world, Vec2::new(0.0, -2.0), 1.0);
        let mut controller = BuoyancyController::new(pond());
        controller.track(body);

        world.destroy_body(body).unwrap();
        assert_eq!(controller.step(&mut world), 0);
        assert!(controller.is_tracked(body));
    }
}
