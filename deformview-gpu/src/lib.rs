//! # deformview GPU
//!
//! wgpu rendering for deformview: a mesh renderer that draws translucent
//! surfaces and glyphs to a window or an offscreen frame, and readback of
//! rendered frames for animation capture.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use deformview_gpu::{DrawItem, GpuMesh, MeshRenderConfig, MeshRenderer};
//! use deformview_core::{PolyData, Point3f};
//!
//! async fn example() -> deformview_core::Result<()> {
//!     let mut renderer = MeshRenderer::headless(320, 240, MeshRenderConfig::default()).await?;
//!     let mesh = PolyData::from_points_and_polys(
//!         vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
//!         vec![[0, 1, 2]],
//!     );
//!     let gpu_mesh = GpuMesh::from_polydata(&mesh, None, [0.8, 0.8, 0.8, 1.0]);
//!     let item = DrawItem { mesh: &gpu_mesh, opacity: 0.5, offset: [0.0; 3] };
//!     let rgba = renderer.render_to_pixels(&[item], None)?;
//!     assert_eq!(rgba.len(), 320 * 240 * 4);
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod device;
pub mod mesh;

pub use capture::read_texture_rgba;
pub use device::GpuContext;
pub use mesh::{
    CameraUniform, DrawItem, GpuMesh, LightingParams, MeshRenderConfig, MeshRenderer, MeshVertex,
    OverlayPainter,
};
