//! Fixed timestep scene
//!
//! Owns the physics world, the entity store, the buoyancy controller and the
//! game systems, and advances them in a fixed order each step:
//! world step, contact routing and timers, buoyancy, timed systems.

use glam::Vec2;

use super::components::{FillKind, PhysicsBody, Pose, Renderable, colors};
use super::systems::{DrawCommand, PoseSyncSystem, ShapeListSystem};
use crate::buoyancy::BuoyancyController;
use crate::consts::*;
use crate::entities::{Components, Entity, EntityStore, InstantSystem, TimedSystem};
use crate::physics::{BodyDef, BodyHandle, ContactEvent, Filter, Fixture, Physics, PhysicsError, Shape, World};
use crate::settings::Settings;

/// Direction of a flap impulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flap {
    Up,
    /// Up and tilted 30° to the left
    Left,
    Right,
}

impl Flap {
    fn direction(self) -> Vec2 {
        let tilt = match self {
            Flap::Up => 0.0,
            Flap::Left => FLAP_TILT,
            Flap::Right => -FLAP_TILT,
        };
        Vec2::from_angle(tilt).rotate(Vec2::Y)
    }
}

pub struct Scene {
    settings: Settings,
    world: World,
    store: EntityStore,
    buoyancy: BuoyancyController,
    pose_sync: PoseSyncSystem,
    shape_list: ShapeListSystem,

    water: BodyHandle,
    bird: BodyHandle,
    bird_entity: Entity,
    /// Flap impulse available right now
    flap_charge: f32,
    diving: bool,

    accumulator: f32,
    ticks: u64,
}

impl Scene {
    /// Build the water and the bird described by `settings`
    pub fn new(settings: Settings) -> Result<Self, PhysicsError> {
        let mut world = World::new(settings.gravity_vector());
        let mut store = EntityStore::new();
        let pose_sync = PoseSyncSystem::new(&mut store);
        let shape_list = ShapeListSystem::new(&mut store);
        let buoyancy = BuoyancyController::new(settings.fluid());

        // Box whose top edge is the fluid surface
        let water_shape = Shape::rect(Vec2::new(settings.field_width / 2.0, settings.water_depth));
        let (water, _) = spawn_into(
            &mut world,
            &mut store,
            BodyDef::fixed(Vec2::new(0.0, -settings.water_depth)),
            &[Fixture::new(water_shape, 0.0)
                .sensor(true)
                .filter(Filter::new(COLLISION_WATER, COLLISION_BIRD | COLLISION_FLOATER))],
            Renderable::new(FillKind::Line, colors::CYAN),
        )?;

        let (bird, bird_entity) = spawn_into(
            &mut world,
            &mut store,
            BodyDef {
                fixed_rotation: true,
                ..BodyDef::dynamic(settings.bird_start)
            },
            &[Fixture::new(Shape::circle(settings.bird_radius), settings.bird_density)
                .filter(Filter::new(COLLISION_BIRD, COLLISION_WATER | COLLISION_FLOATER))],
            Renderable::new(FillKind::Line, colors::WHITE),
        )?;

        log::info!(
            "Scene ready: water {} depth {}, bird {} at {:?}",
            water,
            settings.water_depth,
            bird,
            settings.bird_start
        );

        Ok(Self {
            flap_charge: settings.max_flap_impulse,
            settings,
            world,
            store,
            buoyancy,
            pose_sync,
            shape_list,
            water,
            bird,
            bird_entity,
            diving: false,
            accumulator: 0.0,
            ticks: 0,
        })
    }

    /// Add a body and a drawable entity for it
    pub fn spawn(
        &mut self,
        def: BodyDef,
        fixtures: &[Fixture],
        look: Renderable,
    ) -> Result<(BodyHandle, Entity), PhysicsError> {
        spawn_into(&mut self.world, &mut self.store, def, fixtures, look)
    }

    /// Remove an entity and destroy its body. Contacts it had end right away.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), PhysicsError> {
        let body = self.store.get::<PhysicsBody>(entity).map(|p| p.body);
        self.store.remove_entity(entity);

        if let Some(body) = body {
            let ended = self.world.destroy_body(body)?;
            self.route_contacts(&ended);
            self.buoyancy.untrack(body);
        }
        Ok(())
    }

    /// Run as many fixed steps as the accumulated frame time allows
    ///
    /// Returns the number of steps taken. Time that doesn't fill a whole step
    /// carries over to the next call.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Advance the simulation by exactly `dt`
    pub fn step(&mut self, dt: f32) {
        if self.diving {
            let center = self.bird_center();
            self.world
                .apply_force(self.bird, Vec2::new(0.0, -self.settings.dive_force), center);
        }

        let contacts = self.world.step(dt);
        self.route_contacts(&contacts);
        self.recharge_flap(dt);

        self.buoyancy.step(&mut self.world);

        self.pose_sync.stage(&self.world);
        self.pose_sync.process(&mut self.store, dt);
        self.ticks += 1;
    }

    /// Rebuild and return the draw list for the current state
    pub fn draw_list(&mut self) -> &[DrawCommand] {
        self.shape_list.process(&mut self.store);
        self.shape_list.commands()
    }

    // === Bird controls ===

    /// Spend the current flap charge as an impulse. Cancels a dive.
    pub fn flap(&mut self, flap: Flap) {
        self.diving = false;
        let impulse = flap.direction() * self.flap_charge;
        let center = self.bird_center();
        if let Err(err) = self.world.apply_linear_impulse(self.bird, impulse, center) {
            log::warn!("Flap ignored: {}", err);
            return;
        }
        log::debug!("Flap {:?} with impulse {:.1}", flap, self.flap_charge);
        self.flap_charge = 0.0;
    }

    /// Start or stop pushing the bird down. Starting a dive drains the flap charge.
    pub fn set_diving(&mut self, diving: bool) {
        if diving && !self.diving {
            self.flap_charge = 0.0;
        }
        self.diving = diving;
    }

    pub fn is_diving(&self) -> bool {
        self.diving
    }

    pub fn flap_charge(&self) -> f32 {
        self.flap_charge
    }

    // === Accessors ===

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn buoyancy(&self) -> &BuoyancyController {
        &self.buoyancy
    }

    pub fn water(&self) -> BodyHandle {
        self.water
    }

    pub fn bird(&self) -> BodyHandle {
        self.bird
    }

    pub fn bird_entity(&self) -> Entity {
        self.bird_entity
    }

    /// Bird pose as of the last step
    pub fn bird_pose(&self) -> Option<Pose> {
        self.store.get::<Pose>(self.bird_entity).copied()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time in seconds
    pub fn time(&self) -> f32 {
        self.ticks as f32 * SIM_DT
    }

    fn bird_center(&self) -> Vec2 {
        self.world
            .body(self.bird)
            .map(|body| body.world_center())
            .unwrap_or_default()
    }

    /// Bodies start feeling the fluid when they touch the water and stop when they leave it
    fn route_contacts(&mut self, contacts: &[ContactEvent]) {
        for contact in contacts {
            let Some(other) = contact.other(self.water) else {
                continue;
            };
            match contact {
                ContactEvent::Begin(..) => {
                    if self.buoyancy.track(other) {
                        log::debug!("{} entered the water", other);
                    }
                }
                ContactEvent::End(..) => {
                    if self.buoyancy.untrack(other) {
                        log::debug!("{} left the water", other);
                    }
                }
            }
        }
    }

    fn recharge_flap(&mut self, dt: f32) {
        let max = self.settings.max_flap_impulse;
        if self.flap_charge < max {
            let rate = if self.settings.flap_regen_time > 0.0 {
                max / self.settings.flap_regen_time
            } else {
                f32::INFINITY
            };
            self.flap_charge = (self.flap_charge + rate * dt).min(max);
        }
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("ticks", &self.ticks)
            .field("bodies", &self.world.body_count())
            .field("entities", &self.store.len())
            .field("in_water", &self.buoyancy.len())
            .finish()
    }
}

fn spawn_into(
    world: &mut World,
    store: &mut EntityStore,
    def: BodyDef,
    fixtures: &[Fixture],
    look: Renderable,
) -> Result<(BodyHandle, Entity), PhysicsError> {
    let body = world.create_body(def);
    for fixture in fixtures {
        if let Err(err) = world.add_fixture(body, *fixture) {
            // Don't leave a half-built body behind
            let _ = world.destroy_body(body);
            return Err(err);
        }
    }

    let entity = store.create_entity(
        Components::new()
            .with(PhysicsBody {
                body,
                shapes: fixtures.iter().map(|f| f.shape).collect(),
            })
            .with(Pose {
                position: def.position,
                angle: def.angle,
                velocity: def.linear_velocity,
            })
            .with(look),
    );
    Ok((body, entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floater(scene: &mut Scene, position: Vec2, density: f32) -> (BodyHandle, Entity) {
        scene
            .spawn(
                BodyDef::dynamic(position),
                &[Fixture::new(Shape::circle(1.0), density)
                    .filter(Filter::new(COLLISION_FLOATER, COLLISION_WATER))],
                Renderable::new(FillKind::Directed, colors::BLUE),
            )
            .unwrap()
    }

    #[test]
    fn test_new_scene_layout() {
        let scene = Scene::new(Settings::default()).unwrap();
        assert_eq!(scene.world().body_count(), 2);
        assert_eq!(scene.store().len(), 2);
        assert!(scene.buoyancy().is_empty());
        assert_eq!(scene.flap_charge(), 40.0);

        let water = scene.world().body(scene.water()).unwrap();
        assert_eq!(water.position(), Vec2::new(0.0, -8.0));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            bird_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(Scene::new(settings), Err(PhysicsError::InvalidShape(_))));
    }

    #[test]
    fn test_advance_accumulates_time() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        assert_eq!(scene.advance(0.01), 0);
        assert_eq!(scene.advance(0.01), 1);
        assert_eq!(scene.advance(0.04), 2);
        assert_eq!(scene.ticks(), 3);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        // Long frames are clamped, and the step count is capped on top of that
        assert_eq!(scene.advance(5.0), MAX_SUBSTEPS);
        assert!(scene.advance(-1.0) <= 1);
    }

    #[test]
    fn test_water_contact_tracks_and_untracks() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        let (body, _) = floater(&mut scene, Vec2::new(5.0, -4.0), 1.0);

        scene.step(SIM_DT);
        assert!(scene.buoyancy().is_tracked(body));

        // Lift it clear of the water
        scene.world_mut().set_linear_velocity(body, Vec2::new(0.0, 600.0)).unwrap();
        scene.step(SIM_DT);
        assert!(!scene.buoyancy().is_tracked(body));
    }

    #[test]
    fn test_despawn_untracks_body() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        let (body, entity) = floater(&mut scene, Vec2::new(5.0, -4.0), 1.0);
        scene.step(SIM_DT);
        assert!(scene.buoyancy().is_tracked(body));

        scene.despawn(entity).unwrap();
        assert!(!scene.buoyancy().is_tracked(body));
        assert!(!scene.world().contains(body));
        assert!(!scene.store().contains(entity));

        // The next step doesn't trip over the stale handle
        scene.step(SIM_DT);
        assert_eq!(scene.pose_sync.system().len(), 2);
    }

    #[test]
    fn test_buoyancy_runs_after_contacts() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        let (body, _) = floater(&mut scene, Vec2::new(5.0, -4.0), 1.0);

        // Same step that reports the contact already pushes the body up
        scene.step(SIM_DT);
        let force = scene.world().body(body).unwrap().pending_force();
        assert!(force.y > 0.0);
        assert!(scene.world().body_state(body).is_some());
    }

    #[test]
    fn test_flap_spends_charge_and_recharges() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        scene.flap(Flap::Up);
        assert_eq!(scene.flap_charge(), 0.0);

        let bird = scene.world().body(scene.bird()).unwrap();
        let expected = 40.0 / bird.mass();
        assert!((bird.linear_velocity().y - expected).abs() < 1e-3);

        // Full recharge takes 0.7 s
        for _ in 0..21 {
            scene.step(SIM_DT);
        }
        assert!(scene.flap_charge() > 0.0 && scene.flap_charge() < 40.0);
        for _ in 0..30 {
            scene.step(SIM_DT);
        }
        assert_eq!(scene.flap_charge(), 40.0);
    }

    #[test]
    fn test_side_flaps_tilt() {
        assert!(Flap::Left.direction().x < 0.0);
        assert!(Flap::Right.direction().x > 0.0);
        assert!((Flap::Left.direction().y - FLAP_TILT.cos()).abs() < 1e-6);
        assert_eq!(Flap::Up.direction(), Vec2::Y);
    }

    #[test]
    fn test_dive_pushes_down_and_drains_flap() {
        let mut scene = Scene::new(Settings {
            gravity: 0.0,
            ..Default::default()
        })
        .unwrap();

        scene.set_diving(true);
        assert_eq!(scene.flap_charge(), 0.0);
        scene.step(SIM_DT);
        assert!(scene.world().body(scene.bird()).unwrap().linear_velocity().y < 0.0);

        scene.flap(Flap::Up);
        assert!(!scene.is_diving());
    }

    #[test]
    fn test_pose_follows_body() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        let start = scene.bird_pose().unwrap();
        assert_eq!(start.position, Vec2::new(0.0, 6.0));

        scene.advance(0.1);
        let pose = scene.bird_pose().unwrap();
        assert!(pose.position.y < 6.0);
        assert_eq!(pose.position, scene.world().body(scene.bird()).unwrap().position());
    }

    #[test]
    fn test_draw_list_covers_water_and_bird() {
        let mut scene = Scene::new(Settings::default()).unwrap();
        let commands = scene.draw_list();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].color, colors::CYAN);
        assert_eq!(commands[1].color, colors::WHITE);
    }
}
