//! Fixture shapes, rigid transforms and overlap tests

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Rigid 2D transform: rotation (as a unit vector) then translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    /// (cos θ, sin θ)
    pub rotation: Vec2,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: Vec2::X,
    };

    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            rotation: Vec2::from_angle(angle),
        }
    }

    pub fn angle(&self) -> f32 {
        self.rotation.to_angle()
    }

    /// Local point to world space
    #[inline]
    pub fn apply(&self, local: Vec2) -> Vec2 {
        self.position + self.rotation.rotate(local)
    }

    /// World point to local space
    #[inline]
    pub fn apply_inverse(&self, world: Vec2) -> Vec2 {
        self.inverse_rotation().rotate(world - self.position)
    }

    /// Local direction to world space (no translation)
    #[inline]
    pub fn rotate(&self, local: Vec2) -> Vec2 {
        self.rotation.rotate(local)
    }

    #[inline]
    fn inverse_rotation(&self) -> Vec2 {
        Vec2::new(self.rotation.x, -self.rotation.y)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Mass properties of one shape at a given density
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    pub mass: f32,
    /// Center of mass in body space
    pub center: Vec2,
    /// Rotational inertia about the body origin
    pub inertia: f32,
}

/// Fixture geometry in body space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    /// Box aligned with the body frame
    Rect { center: Vec2, half_extents: Vec2 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle {
            center: Vec2::ZERO,
            radius,
        }
    }

    pub fn rect(half_extents: Vec2) -> Self {
        Shape::Rect {
            center: Vec2::ZERO,
            half_extents,
        }
    }

    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius, .. } => std::f32::consts::PI * radius * radius,
            Shape::Rect { half_extents, .. } => 4.0 * half_extents.x * half_extents.y,
        }
    }

    /// Geometry is usable: finite and strictly positive extents
    pub fn is_valid(&self) -> bool {
        match *self {
            Shape::Circle { center, radius } => center.is_finite() && radius.is_finite() && radius > 0.0,
            Shape::Rect {
                center,
                half_extents,
            } => center.is_finite() && half_extents.is_finite() && half_extents.min_element() > 0.0,
        }
    }

    /// World-space corners of a box, counter-clockwise; `None` for circles
    pub fn corners(&self, xf: &Transform) -> Option<[Vec2; 4]> {
        let Shape::Rect {
            center,
            half_extents: h,
        } = *self
        else {
            return None;
        };
        Some([
            xf.apply(center + Vec2::new(-h.x, -h.y)),
            xf.apply(center + Vec2::new(h.x, -h.y)),
            xf.apply(center + Vec2::new(h.x, h.y)),
            xf.apply(center + Vec2::new(-h.x, h.y)),
        ])
    }

    pub fn mass_data(&self, density: f32) -> MassData {
        let mass = density * self.area();
        match *self {
            Shape::Circle { center, radius } => MassData {
                mass,
                center,
                inertia: mass * (0.5 * radius * radius + center.length_squared()),
            },
            Shape::Rect {
                center,
                half_extents,
            } => MassData {
                mass,
                center,
                inertia: mass * (half_extents.length_squared() / 3.0 + center.length_squared()),
            },
        }
    }
}

/// Do two shapes, each placed by its body's transform, overlap?
pub fn shapes_overlap(a: &Shape, xa: &Transform, b: &Shape, xb: &Transform) -> bool {
    match (*a, *b) {
        (
            Shape::Circle {
                center: ca,
                radius: ra,
            },
            Shape::Circle {
                center: cb,
                radius: rb,
            },
        ) => {
            let d = xa.apply(ca) - xb.apply(cb);
            d.length_squared() <= (ra + rb) * (ra + rb)
        }
        (Shape::Circle { center, radius }, Shape::Rect { .. }) => {
            circle_rect_overlap(xa.apply(center), radius, b, xb)
        }
        (Shape::Rect { .. }, Shape::Circle { center, radius }) => {
            circle_rect_overlap(xb.apply(center), radius, a, xa)
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => rect_rect_overlap(a, xa, b, xb),
    }
}

fn circle_rect_overlap(circle_center: Vec2, radius: f32, rect: &Shape, xf: &Transform) -> bool {
    let Shape::Rect {
        center,
        half_extents,
    } = *rect
    else {
        return false;
    };

    // Work in the box frame
    let local = xf.apply_inverse(circle_center) - center;
    let closest = local.clamp(-half_extents, half_extents);
    (local - closest).length_squared() <= radius * radius
}

/// Separating axis test over both boxes' edge normals
fn rect_rect_overlap(a: &Shape, xa: &Transform, b: &Shape, xb: &Transform) -> bool {
    let (Some(ca), Some(cb)) = (a.corners(xa), b.corners(xb)) else {
        return false;
    };

    let axes = [xa.rotation, xa.rotation.perp(), xb.rotation, xb.rotation.perp()];
    axes.iter().all(|axis| {
        let (min_a, max_a) = project(&ca, *axis);
        let (min_b, max_b) = project(&cb, *axis);
        max_a >= min_b && max_b >= min_a
    })
}

fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    corners
        .iter()
        .map(|c| c.dot(axis))
        .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
}
