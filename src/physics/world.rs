//! Minimal rigid body world
//!
//! Bodies carry fixtures, accumulate forces between steps and integrate with
//! semi-implicit Euler under gravity. Overlapping fixtures produce begin/end
//! contact events; there is no collision response.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{MassData, Shape, Transform, shapes_overlap};
use super::{BodyHandle, BodyState, Physics, PhysicsError, cross_vv};

/// Collision category bits, Box2D style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub category: u16,
    pub mask: u16,
}

impl Filter {
    pub fn new(category: u16, mask: u16) -> Self {
        Self { category, mask }
    }

    /// Both sides must accept the other's category
    pub fn should_collide(&self, other: &Filter) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: 0xFFFF,
        }
    }
}

/// A shape attached to a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixture {
    pub shape: Shape,
    pub density: f32,
    /// Sensors report contacts but never receive fluid forces
    pub sensor: bool,
    pub filter: Filter,
}

impl Fixture {
    pub fn new(shape: Shape, density: f32) -> Self {
        Self {
            shape,
            density,
            sensor: false,
            filter: Filter::default(),
        }
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Never moves, infinite mass
    #[default]
    Static,
    Dynamic,
}

/// Body creation parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub fixed_rotation: bool,
}

impl BodyDef {
    pub fn dynamic(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            ..Default::default()
        }
    }

    pub fn fixed(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    kind: BodyKind,
    /// Body origin
    transform: Transform,
    angle: f32,
    local_center: Vec2,
    world_center: Vec2,
    linear_velocity: Vec2,
    angular_velocity: f32,
    mass: f32,
    inv_mass: f32,
    /// About the center of mass
    inertia: f32,
    inv_inertia: f32,
    force: Vec2,
    torque: f32,
    fixed_rotation: bool,
    fixtures: Vec<Fixture>,
}

impl Body {
    fn new(def: &BodyDef) -> Self {
        let transform = Transform::new(def.position, def.angle);
        Self {
            kind: def.kind,
            transform,
            angle: def.angle,
            local_center: Vec2::ZERO,
            world_center: def.position,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            fixed_rotation: def.fixed_rotation,
            fixtures: Vec::new(),
        }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn world_center(&self) -> Vec2 {
        self.world_center
    }

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Force accumulated since the last step
    pub fn pending_force(&self) -> Vec2 {
        self.force
    }

    pub fn pending_torque(&self) -> f32 {
        self.torque
    }

    fn state(&self) -> BodyState {
        BodyState {
            transform: self.transform,
            world_center: self.world_center,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            mass: self.mass,
            inertia: self.inertia,
        }
    }

    /// Recompute mass, center and inertia from the fixtures
    fn reset_mass_data(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.local_center = Vec2::ZERO;

        if self.kind == BodyKind::Static {
            self.world_center = self.transform.position;
            return;
        }

        let mut total = MassData::default();
        let mut weighted_center = Vec2::ZERO;
        for fixture in &self.fixtures {
            let md = fixture.shape.mass_data(fixture.density);
            total.mass += md.mass;
            total.inertia += md.inertia;
            weighted_center += md.center * md.mass;
        }

        if total.mass > 0.0 {
            self.mass = total.mass;
            self.inv_mass = 1.0 / total.mass;
            self.local_center = weighted_center * self.inv_mass;
        } else {
            // Dynamic bodies always get some mass
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if total.inertia > 0.0 && !self.fixed_rotation {
            // Shift from the body origin to the center of mass
            self.inertia = total.inertia - self.mass * self.local_center.length_squared();
            self.inv_inertia = if self.inertia > 0.0 { 1.0 / self.inertia } else { 0.0 };
        }

        self.world_center = self.transform.apply(self.local_center);
    }

    fn integrate(&mut self, gravity: Vec2, dt: f32) {
        if self.kind == BodyKind::Dynamic {
            self.linear_velocity += (gravity + self.force * self.inv_mass) * dt;
            self.angular_velocity += self.torque * self.inv_inertia * dt;

            self.world_center += self.linear_velocity * dt;
            self.angle += self.angular_velocity * dt;
            self.transform.rotation = Vec2::from_angle(self.angle);
            self.transform.position = self.world_center - self.transform.rotate(self.local_center);
        }

        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

/// Fixture overlap started or stopped between two bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Begin(BodyHandle, BodyHandle),
    End(BodyHandle, BodyHandle),
}

impl ContactEvent {
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match *self {
            ContactEvent::Begin(a, b) | ContactEvent::End(a, b) => (a, b),
        }
    }

    /// If `body` is one side of the contact, the other side
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        let (a, b) = self.bodies();
        if a == body {
            Some(b)
        } else if b == body {
            Some(a)
        } else {
            None
        }
    }
}

/// Owns every body and the set of currently touching body pairs
#[derive(Debug, Clone)]
pub struct World {
    gravity: Vec2,
    bodies: BTreeMap<BodyHandle, Body>,
    /// Touching pairs, lower handle first
    contacts: BTreeSet<(BodyHandle, BodyHandle)>,
    next_id: u32,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            contacts: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn create_body(&mut self, def: BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let mut body = Body::new(&def);
        body.reset_mass_data();
        self.bodies.insert(handle, body);
        handle
    }

    /// Attach a fixture and refresh the body's mass properties
    pub fn add_fixture(&mut self, handle: BodyHandle, fixture: Fixture) -> Result<(), PhysicsError> {
        if !fixture.shape.is_valid() {
            return Err(PhysicsError::InvalidShape(fixture.shape));
        }
        if !fixture.density.is_finite() || fixture.density < 0.0 {
            return Err(PhysicsError::InvalidDensity(fixture.density));
        }

        let body = self
            .bodies
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        body.fixtures.push(fixture);
        body.reset_mass_data();
        Ok(())
    }

    /// Remove a body; contacts it was part of end immediately
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<Vec<ContactEvent>, PhysicsError> {
        if self.bodies.remove(&handle).is_none() {
            return Err(PhysicsError::UnknownBody(handle));
        }

        let ended: Vec<(BodyHandle, BodyHandle)> = self
            .contacts
            .iter()
            .filter(|(a, b)| *a == handle || *b == handle)
            .copied()
            .collect();
        for pair in &ended {
            self.contacts.remove(pair);
        }
        Ok(ended
            .into_iter()
            .map(|(a, b)| ContactEvent::End(a, b))
            .collect())
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(&handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Every live body, in creation order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.bodies.iter().map(|(handle, body)| (*handle, body))
    }

    pub fn is_touching(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.contacts.contains(&ordered(a, b))
    }

    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> Result<(), PhysicsError> {
        let body = self
            .bodies
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        if body.kind == BodyKind::Dynamic {
            body.linear_velocity = velocity;
        }
        Ok(())
    }

    /// Instant velocity change from an impulse at a world point
    pub fn apply_linear_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: Vec2,
        point: Vec2,
    ) -> Result<(), PhysicsError> {
        let body = self
            .bodies
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        if body.kind == BodyKind::Dynamic {
            body.linear_velocity += impulse * body.inv_mass;
            body.angular_velocity += cross_vv(point - body.world_center, impulse) * body.inv_inertia;
        }
        Ok(())
    }

    /// Advance every body by `dt` and report contact changes
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        for body in self.bodies.values_mut() {
            body.integrate(self.gravity, dt);
        }
        self.update_contacts()
    }

    fn update_contacts(&mut self) -> Vec<ContactEvent> {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        let mut touching = BTreeSet::new();

        for (i, a) in handles.iter().enumerate() {
            for b in &handles[i + 1..] {
                if self.bodies_overlap(*a, *b) {
                    touching.insert((*a, *b));
                }
            }
        }

        let mut events: Vec<ContactEvent> = self
            .contacts
            .difference(&touching)
            .map(|(a, b)| ContactEvent::End(*a, *b))
            .collect();
        events.extend(
            touching
                .difference(&self.contacts)
                .map(|(a, b)| ContactEvent::Begin(*a, *b)),
        );

        self.contacts = touching;
        events
    }

    fn bodies_overlap(&self, a: BodyHandle, b: BodyHandle) -> bool {
        let (Some(body_a), Some(body_b)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return false;
        };
        // Static pairs never touch
        if body_a.kind == BodyKind::Static && body_b.kind == BodyKind::Static {
            return false;
        }

        body_a.fixtures.iter().any(|fa| {
            body_b.fixtures.iter().any(|fb| {
                fa.filter.should_collide(&fb.filter)
                    && shapes_overlap(&fa.shape, &body_a.transform, &fb.shape, &body_b.transform)
            })
        })
    }
}

impl Physics for World {
    fn fixtures(&self, body: BodyHandle) -> Option<&[Fixture]> {
        self.bodies.get(&body).map(Body::fixtures)
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&body).map(Body::state)
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2, point: Vec2) {
        if let Some(body) = self.bodies.get_mut(&body) {
            if body.kind == BodyKind::Dynamic {
                body.force += force;
                body.torque += cross_vv(point - body.world_center, force);
            }
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) {
        if let Some(body) = self.bodies.get_mut(&body) {
            if body.kind == BodyKind::Dynamic {
                body.torque += torque;
            }
        }
    }
}

fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b { (a, b) } else { (b, a) }
}
