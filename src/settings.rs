//! World and fluid tuning
//!
//! Stored as JSON. Missing fields fall back to the defaults, so a settings
//! file only needs the values it changes.

use std::fs;
use std::io;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buoyancy::Fluid;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Scene tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === World ===
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Width of the playfield, and of the water
    pub field_width: f32,

    // === Water ===
    /// Half height of the water body; its top is the fluid surface at y = 0
    pub water_depth: f32,
    pub water_density: f32,
    pub water_drag: f32,
    pub water_angular_drag: f32,
    /// Current applied to everything in the water
    pub water_velocity: Vec2,

    // === Bird ===
    pub bird_radius: f32,
    pub bird_density: f32,
    pub bird_start: Vec2,
    /// Full flap impulse, recharged over `flap_regen_time` seconds
    pub max_flap_impulse: f32,
    pub flap_regen_time: f32,
    /// Downward force while diving
    pub dive_force: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: 15.0,
            field_width: 40.0,

            water_depth: 8.0,
            water_density: 2.0,
            water_drag: 1.5,
            water_angular_drag: 0.0,
            water_velocity: Vec2::ZERO,

            bird_radius: 1.0,
            bird_density: 1.0,
            bird_start: Vec2::new(0.0, 6.0),
            max_flap_impulse: 40.0,
            flap_regen_time: 0.7,
            dive_force: 50.0,
        }
    }
}

impl Settings {
    pub fn gravity_vector(&self) -> Vec2 {
        Vec2::new(0.0, -self.gravity)
    }

    /// Fluid parameters for the water body (surface at y = 0, normal up)
    pub fn fluid(&self) -> Fluid {
        Fluid {
            surface_normal: Vec2::Y,
            surface_height: 0.0,
            velocity: self.water_velocity,
            gravity: self.gravity_vector(),
            density: self.water_density,
            linear_drag: self.water_drag,
            angular_drag: self.water_angular_drag,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
