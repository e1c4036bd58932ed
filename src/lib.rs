//! Plunge - a diving bird over a pool of water
//!
//! Core modules:
//! - `entities`: Component-bitmask entity store and iterating systems
//! - `physics`: Minimal rigid body world and the interface buoyancy needs
//! - `buoyancy`: Submerged area, buoyant force and fluid drag
//! - `settings`: Data-driven world and fluid tuning
//! - `sim`: Fixed-step scene tying the above together

pub mod buoyancy;
pub mod entities;
pub mod physics;
pub mod settings;
pub mod sim;

pub use buoyancy::{BuoyancyController, Fluid};
pub use entities::{EntityStore, IteratingSystem};
pub use physics::{Physics, World};
pub use settings::{Settings, SettingsError};
pub use sim::Scene;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;
    /// Longest frame fed to the accumulator (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Side flaps are tilted this far from straight up (radians)
    pub const FLAP_TILT: f32 = std::f32::consts::PI / 6.0;

    /// Collision categories
    pub const COLLISION_BIRD: u16 = 1 << 1;
    pub const COLLISION_WATER: u16 = 1 << 3;
    /// Anything else dropped into the water
    pub const COLLISION_FLOATER: u16 = 1 << 4;
}
