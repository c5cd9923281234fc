//! A sphere moved by a repeating timer
//!
//! Every 500 ms the sphere is translated by count/100 along X and Y. After
//! 200 ticks the timer is destroyed and the window stays open.

use anyhow::Result;
use deformview_algorithms::sphere_source;
use deformview_core::Point3f;
use deformview_visualization::{Actor, Camera, Scene, TimerAction, Viewer, ViewerConfig};
use std::time::Duration;

const STEPS: u32 = 200;
const INTERVAL: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = ViewerConfig {
        title: "Animation".to_string(),
        width: 640,
        height: 480,
        // misty rose
        background: [1.0, 0.894, 0.882],
        ..ViewerConfig::default()
    };
    config.render.lighting.specular_strength = 0.6;
    config.render.lighting.shininess = 30.0;

    let sphere = sphere_source(Point3f::origin(), 2.0, 30, 30);
    // peacock
    let actor = Actor::new(sphere).with_color([0.2, 0.63, 0.79]);
    let mut camera = Camera {
        aspect_ratio: config.width as f32 / config.height as f32,
        ..Camera::default()
    };
    if let Some(bounds) = actor.bounds() {
        camera.reset(&bounds);
    }
    let mut scene = Scene::new(actor, camera);
    scene.background = config.background;

    let mut count = 0u32;
    let tick = move |scene: &mut Scene| {
        tracing::info!("{}", count);
        let offset = count as f32 / 100.0;
        scene.surface.position.x = offset;
        scene.surface.position.y = offset;
        scene.reset_clipping_range();
        count += 1;
        if count >= STEPS {
            TimerAction::Stop
        } else {
            TimerAction::Continue
        }
    };

    Viewer::new(scene, config).with_timer(INTERVAL, tick).run()?;
    Ok(())
}
