//! Plunge headless demo
//!
//! Drops the bird into the water and logs how it settles.
//! Usage: `plunge [settings.json]`

use std::process::ExitCode;

use plunge::consts::SIM_DT;
use plunge::sim::{Flap, Scene};
use plunge::{Settings, SettingsError};

/// Simulated run length (seconds)
const RUN_TIME: f32 = 6.0;
/// Report interval (seconds)
const REPORT_EVERY: f32 = 0.5;

fn load_settings() -> Result<Settings, SettingsError> {
    match std::env::args().nth(1) {
        Some(path) => Settings::load(path),
        None => {
            log::info!("Using default settings");
            Ok(Settings::default())
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings()?;
    let mut scene = Scene::new(settings)?;

    let total_steps = (RUN_TIME / SIM_DT).round() as u32;
    let report_steps = (REPORT_EVERY / SIM_DT).round() as u32;

    for step in 1..=total_steps {
        // Dive for the first half second, then flap back up at three seconds
        if step == 1 {
            scene.set_diving(true);
        } else if step == report_steps {
            scene.set_diving(false);
        } else if step == total_steps / 2 {
            scene.flap(Flap::Up);
        }

        scene.advance(SIM_DT);

        if step % report_steps == 0 {
            let in_water = scene.buoyancy().len();
            let pose = scene.bird_pose().unwrap_or_default();
            let draw_count = scene.draw_list().len();
            log::info!(
                "t={:.1}s bird y={:.2} vy={:.2} in_water={} flap={:.1} shapes={}",
                scene.time(),
                pose.position.y,
                pose.velocity.y,
                in_water,
                scene.flap_charge(),
                draw_count
            );
        }
    }

    log::info!("Done after {} steps: {:?}", scene.ticks(), scene);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Plunge (headless) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
