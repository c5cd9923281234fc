//! Visualization for deforming meshes
//!
//! This crate turns meshes into an interactive session:
//! - Scene building (surface, secondary, glyph actors and 2D annotations)
//! - Keyboard interaction: field cycling, glyph toggling, warp and opacity
//!   stepping, GIF capture
//! - Trackball camera controls
//! - A winit window rendering through wgpu with an egui overlay

pub mod animation;
pub mod camera;
pub mod colormap;
pub mod config;
pub mod interaction;
pub mod overlay;
pub mod scene;
pub mod viewer;

pub use animation::*;
pub use camera::*;
pub use colormap::*;
pub use config::*;
pub use interaction::*;
pub use scene::*;
pub use viewer::*;

use deformview_core::{Error, Result};
use std::path::Path;

/// Show `primary` (and `secondary`, for comparison) in an interactive window
/// with the default key bindings. Blocks until the window is closed.
pub fn plot(primary: MeshInput, secondary: Option<MeshInput>, config: ViewerConfig) -> Result<()> {
    let mut scene = build_scene(primary, secondary, &config)?;
    let controller = InteractionController::attach(&mut scene, &config);
    Viewer::new(scene, config).with_key_handler(controller).run()
}

/// Read mesh files: one path gives a single mesh, several are appended
pub fn load_input<P: AsRef<Path>>(paths: &[P]) -> Result<MeshInput> {
    let mut meshes = deformview_io::read_meshes(paths)?;
    match meshes.len() {
        0 => Err(Error::InvalidData("no mesh files given".to_string())),
        1 => Ok(MeshInput::Single(meshes.remove(0))),
        _ => Ok(MeshInput::List(meshes)),
    }
}
