//! Components attached to scene entities

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entities::Component;
use crate::physics::{BodyHandle, Shape};

/// Links an entity to its rigid body
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub body: BodyHandle,
    /// Fixture shapes in body space, copied at spawn
    pub shapes: Vec<Shape>,
}

impl Component for PhysicsBody {
    const KIND: &'static str = "physics_body";
}

/// Body pose as of the last simulation step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
}

impl Component for Pose {
    const KIND: &'static str = "pose";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillKind {
    Filled,
    #[default]
    Line,
    /// Outline plus a heading line from the center
    Directed,
}

pub type Rgba = [f32; 4];

pub mod colors {
    use super::Rgba;

    pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
    pub const CYAN: Rgba = [0.0, 1.0, 1.0, 1.0];
    pub const BLUE: Rgba = [0.0, 0.0, 1.0, 1.0];
}

/// How an entity's body is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub fill: FillKind,
    pub color: Rgba,
}

impl Renderable {
    pub fn new(fill: FillKind, color: Rgba) -> Self {
        Self { fill, color }
    }
}

impl Component for Renderable {
    const KIND: &'static str = "renderable";
}
