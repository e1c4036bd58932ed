//! Rigid body physics
//!
//! The [`Physics`] trait is everything the fluid model needs from a physics
//! engine: fixture enumeration, body kinematics and force application.
//! [`World`] is the small in-house engine that implements it for the game.

pub mod shape;
pub mod world;

use std::fmt;

use glam::Vec2;
use thiserror::Error;

pub use shape::{MassData, Shape, Transform, shapes_overlap};
pub use world::{Body, BodyDef, BodyKind, ContactEvent, Filter, Fixture, World};

/// Opaque body handle issued by a [`World`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub(crate) u32);

impl BodyHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Kinematic snapshot of one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub transform: Transform,
    pub world_center: Vec2,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub mass: f32,
    /// About the center of mass
    pub inertia: f32,
}

impl BodyState {
    /// Velocity of the material point currently at `point`
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + cross_sv(self.angular_velocity, point - self.world_center)
    }

    /// Rotational inertia about the body origin rather than the center of mass
    pub fn origin_inertia(&self) -> f32 {
        self.inertia + self.mass * (self.world_center - self.transform.position).length_squared()
    }
}

/// Physics engine operations consumed by the buoyancy controller
pub trait Physics {
    /// Fixtures of `body`, or `None` if the body no longer exists
    fn fixtures(&self, body: BodyHandle) -> Option<&[Fixture]>;

    fn body_state(&self, body: BodyHandle) -> Option<BodyState>;

    /// Accumulate a force at a world point (adds torque about the center)
    fn apply_force(&mut self, body: BodyHandle, force: Vec2, point: Vec2);

    fn apply_torque(&mut self, body: BodyHandle, torque: f32);
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("unknown body {0}")]
    UnknownBody(BodyHandle),

    #[error("invalid shape {0:?}")]
    InvalidShape(Shape),

    #[error("fixture density must be finite and non-negative, got {0}")]
    InvalidDensity(f32),
}

/// 2D cross product of two vectors (z component)
#[inline]
pub fn cross_vv(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (z axis) with a vector
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}
