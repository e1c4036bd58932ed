//! Game simulation
//!
//! Glue between the physics world, the entity store and the buoyancy
//! controller. Everything advances in fixed steps:
//! - Fixed timestep only
//! - Stable iteration order (by handle)
//! - No rendering or platform dependencies; drawing is a list of shapes

pub mod components;
pub mod scene;
pub mod systems;

pub use components::{FillKind, PhysicsBody, Pose, Renderable, Rgba, colors};
pub use scene::{Flap, Scene};
pub use systems::{DrawCommand, DrawShape, PoseSyncSystem, ShapeListSystem};
