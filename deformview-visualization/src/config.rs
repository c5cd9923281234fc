//! Viewer configuration

use deformview_gpu::MeshRenderConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for an interactive viewing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Background colour, RGB in [0, 1]
    pub background: [f32; 3],
    /// Camera zoom applied once after the first frame
    pub initial_zoom: f32,
    /// Opacity of the surface and secondary actors
    pub opacity: f32,
    /// Opacity the glyph toggle switches back to
    pub glyph_opacity: f32,
    /// Warp step in percent per key press
    pub warp_step: i32,
    /// Opacity step in percent per key press
    pub opacity_step: i32,
    /// Number of warp steps captured by the animate key
    pub animation_frames: usize,
    /// Delay between GIF frames
    pub frame_delay_ms: u32,
    /// Directory receiving `deformation_<timestamp>.gif`
    pub animation_dir: PathBuf,
    pub render: MeshRenderConfig,
}

impl ViewerConfig {
    /// Background with an opaque alpha, as the renderer expects it
    pub fn clear_color(&self) -> [f64; 4] {
        let [r, g, b] = self.background;
        [r as f64, g as f64, b as f64, 1.0]
    }

    /// Renderer configuration with this session's background applied
    pub fn render_config(&self) -> MeshRenderConfig {
        MeshRenderConfig {
            background_color: self.clear_color(),
            ..self.render.clone()
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "deformview".to_string(),
            width: 800,
            height: 800,
            background: [1.0, 1.0, 1.0],
            initial_zoom: 0.8,
            opacity: 0.5,
            glyph_opacity: 0.1,
            warp_step: 5,
            opacity_step: 10,
            animation_frames: 40,
            frame_delay_ms: 100,
            animation_dir: PathBuf::from("animations"),
            render: MeshRenderConfig::default(),
        }
    }
}
