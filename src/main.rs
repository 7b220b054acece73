//! Celestial Precision demo
//!
//! A three-body system and a fast ship heading out of it. The ship is the
//! tracked entity, so the universe is recentered around it every time it
//! drifts past the precision threshold. Press F3 to toggle the overlay.

use std::sync::Arc;

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use celestial_precision::body::{CelestialBody, MassBody};
use celestial_precision::config::CelestialConfig;
use celestial_precision::gravity::SimulationMode;
use celestial_precision::plugin::{CelestialCore, CelestialPlugin, CelestialSet, ScaleViewer};
use celestial_precision::types::{km_to_units, units_to_km};
use celestial_precision::ui::StatsOverlayPlugin;

/// Kilometers per screen pixel.
const KM_PER_PIXEL: f64 = 2000.0;

/// Ship speed at launch (km/s).
const LAUNCH_SPEED_KM_S: f64 = 60.0;

#[derive(Resource)]
struct Ship {
    body: Arc<CelestialBody>,
    velocity: DVec3,
}

#[derive(Resource)]
struct Scene(Vec<Arc<CelestialBody>>);

fn main() {
    let mut config = CelestialConfig::default();
    config.gravity.mode = SimulationMode::NBody;

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins((CelestialPlugin::new(config), StatsOverlayPlugin))
        .insert_resource(ScaleViewer {
            position: DVec3::ZERO,
            smooth: true,
        })
        .add_systems(Startup, setup)
        .add_systems(Update, fly_ship.before(CelestialSet::Origin))
        .add_systems(Update, draw_bodies.after(CelestialSet::Scale))
        .run();
}

fn setup(mut commands: Commands, core: Res<CelestialCore>) {
    commands.spawn(Camera2d);

    let earth = CelestialBody::shared("Earth", 5.97e24, 6371.0, DVec3::ZERO);
    let moon = CelestialBody::shared("Moon", 7.34e22, 1737.0, DVec3::new(km_to_units(384_400.0), 0.0, 0.0));
    let companion = CelestialBody::shared(
        "Companion",
        1.0e24,
        3000.0,
        DVec3::new(km_to_units(-150_000.0), km_to_units(260_000.0), 0.0),
    );
    let ship = CelestialBody::shared("Ship", 5.0e4, 0.05, DVec3::new(km_to_units(7000.0), 0.0, 0.0));

    let scene = vec![earth, moon, companion, ship.clone()];
    for body in &scene {
        core.registry.register(body);
    }
    core.origin.set_local_position(ship.position());
    core.origin.recenter();

    commands.insert_resource(Ship {
        body: ship,
        velocity: DVec3::new(0.0, km_to_units(LAUNCH_SPEED_KM_S), 0.0),
    });
    commands.insert_resource(Scene(scene));
}

/// Integrate the ship under gravity and report the move to the origin tracker.
fn fly_ship(
    time: Res<Time>,
    core: Res<CelestialCore>,
    mut ship: ResMut<Ship>,
    mut viewer: ResMut<ScaleViewer>,
) {
    let dt = time.delta_secs_f64();
    if dt <= 0.0 {
        return;
    }

    let position = ship.body.position();
    let force = core
        .gravity
        .total_force(Some(ship.body.as_ref() as &dyn MassBody), position);
    let acceleration = force / ship.body.mass();
    ship.velocity += acceleration * dt;

    let delta = ship.velocity * dt;
    ship.body.apply_position_offset(delta);
    core.origin.move_by(delta);
    viewer.position = ship.body.position();
}

fn draw_bodies(mut gizmos: Gizmos, scene: Res<Scene>) {
    for body in &scene.0 {
        let pos = body.position();
        let screen = Vec2::new(
            (units_to_km(pos.x) / KM_PER_PIXEL) as f32,
            (units_to_km(pos.y) / KM_PER_PIXEL) as f32,
        );
        let radius = ((body.radius() * body.scale() / KM_PER_PIXEL) as f32).max(2.0);
        let color = if body.identifier() == "Ship" {
            Color::srgb(0.4, 0.9, 1.0)
        } else {
            Color::srgb(0.9, 0.85, 0.6)
        };
        gizmos.circle_2d(screen, radius, color);
    }
}
