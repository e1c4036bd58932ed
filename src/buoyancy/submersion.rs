//! Submerged area and centroid of fixture shapes below a fluid surface
//!
//! The fluid occupies the half-plane `dot(normal, p) <= height`.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;

use crate::physics::{Shape, Transform};

/// Smallest positive subnormal; only zero or negative areas fall below it
const MIN_AREA: f32 = f32::from_bits(1);

/// Whether a submerged area is too small to carry a force or a centroid
pub(crate) fn negligible_area(area: f32) -> bool {
    area < MIN_AREA
}

/// Portion of a shape under the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submersion {
    pub area: f32,
    /// World-space centroid of the submerged part
    pub centroid: Vec2,
}

impl Shape {
    /// Submerged area and centroid of this shape placed by `xf`
    ///
    /// `None` when nothing measurable is under the surface, or when the shape
    /// kind has no submersion formula (boxes are treated as dry).
    pub fn submerged(&self, xf: &Transform, normal: Vec2, height: f32) -> Option<Submersion> {
        match *self {
            Shape::Circle { center, radius } => circle_submersion(xf.apply(center), radius, normal, height),
            Shape::Rect { .. } => None,
        }
    }
}

/// Circle of `radius` centered at world point `p`
pub fn circle_submersion(p: Vec2, radius: f32, normal: Vec2, height: f32) -> Option<Submersion> {
    let r = radius;
    // Signed depth of the center below the surface
    let l = height - normal.dot(p);

    if l < -r {
        return None;
    }

    if l > r {
        return Some(Submersion {
            area: PI * r * r,
            centroid: p,
        });
    }

    let r2 = r * r;
    let l2 = l * l;
    let area = r2 * ((l / r).asin() + FRAC_PI_2) + l * (r2 - l2).sqrt();
    if negligible_area(area) {
        return None;
    }

    let offset = -2.0 / 3.0 * (r2 - l2).powf(1.5) / area;
    Some(Submersion {
        area,
        centroid: p + normal * offset,
    })
}
