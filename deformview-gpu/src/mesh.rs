//! Translucent mesh rendering
//!
//! Every draw item carries its own opacity and translation. Opaque items are
//! drawn first with depth writes, translucent ones afterwards without, so
//! a half-transparent surface never hides the glyphs inside it.

use crate::capture::read_texture_rgba;
use crate::GpuContext;
use bytemuck::{Pod, Zeroable};
use deformview_core::{Error, PolyData, Result};
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex data for mesh rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Camera uniform data
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view_pos: [f32; 3],
    pub _padding: f32,
}

/// Lighting parameters. A zero `light_direction` means a headlight.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct LightingParams {
    pub light_direction: [f32; 3],
    pub ambient_strength: f32,
    pub light_color: [f32; 3],
    pub specular_strength: f32,
    pub shininess: f32,
    pub _padding: [f32; 3],
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            light_direction: [0.0, 0.0, 0.0],
            ambient_strength: 0.25,
            light_color: [1.0, 1.0, 1.0],
            specular_strength: 0.2,
            shininess: 32.0,
            _padding: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ObjectUniform {
    offset: [f32; 3],
    opacity: f32,
}

/// Mesh rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRenderConfig {
    pub lighting: LightingParams,
    pub background_color: [f64; 4],
    pub enable_depth_test: bool,
    pub enable_backface_culling: bool,
    pub enable_multisampling: bool,
}

impl Default for MeshRenderConfig {
    fn default() -> Self {
        Self {
            lighting: LightingParams::default(),
            background_color: [1.0, 1.0, 1.0, 1.0],
            enable_depth_test: true,
            enable_backface_culling: false,
            enable_multisampling: true,
        }
    }
}

/// Triangle data ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl GpuMesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Build from a mesh and one RGBA colour per point
    ///
    /// Normals come from the mesh's normals array when it has one, otherwise
    /// they are computed from the faces. Missing colours fall back to
    /// `default_color`.
    pub fn from_polydata(mesh: &PolyData, colors: Option<&[[f32; 4]]>, default_color: [f32; 4]) -> Self {
        let normals: Vec<Vector3<f32>> = match mesh.point_data.normals() {
            Some(n) if n.len() == mesh.points.len() => n.iter_vectors().collect(),
            _ => mesh.vertex_normals(),
        };
        let vertices = mesh
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let n = normals.get(i).copied().unwrap_or_else(Vector3::z);
                let color = colors.and_then(|c| c.get(i)).copied().unwrap_or(default_color);
                MeshVertex::new([p.x, p.y, p.z], [n.x, n.y, n.z], color)
            })
            .collect();
        let indices = mesh
            .polys
            .iter()
            .flat_map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])
            .collect();
        Self::new(vertices, indices)
    }
}

/// One mesh to draw in a frame
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub mesh: &'a GpuMesh,
    pub opacity: f32,
    pub offset: [f32; 3],
}

impl DrawItem<'_> {
    fn is_opaque(&self) -> bool {
        self.opacity >= 1.0
    }
}

/// Hook for drawing 2D overlays on top of the resolved frame
pub trait OverlayPainter {
    fn paint(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: [u32; 2],
    );
}

/// Mesh renderer drawing to a window surface or to an offscreen frame
pub struct MeshRenderer {
    pub gpu_context: GpuContext,
    surface: Option<wgpu::Surface<'static>>,
    pub surface_config: wgpu::SurfaceConfiguration,
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_bind_group_layout: wgpu::BindGroupLayout,
    pub config: MeshRenderConfig,
}

impl MeshRenderer {
    /// Create a renderer presenting to `window`
    pub async fn new(window: Arc<Window>, config: MeshRenderConfig) -> Result<Self> {
        let size = window.inner_size();
        let (gpu_context, surface) = GpuContext::for_window(window).await?;

        let surface_caps = surface.get_capabilities(&gpu_context.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface reports no formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu_context.device, &surface_config);

        Ok(Self::build(gpu_context, Some(surface), surface_config, config))
    }

    /// Create a renderer without a window, for offscreen frames only
    pub async fn headless(width: u32, height: u32, config: MeshRenderConfig) -> Result<Self> {
        let gpu_context = GpuContext::new().await?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self::build(gpu_context, None, surface_config, config))
    }

    fn build(
        gpu_context: GpuContext,
        surface: Option<wgpu::Surface<'static>>,
        surface_config: wgpu::SurfaceConfiguration,
        config: MeshRenderConfig,
    ) -> Self {
        let device = &gpu_context.device;

        let camera_uniform = CameraUniform {
            view_proj: Matrix4::identity().into(),
            view_pos: [0.0, 0.0, 0.0],
            _padding: 0.0,
        };
        let camera_buffer = gpu_context.create_buffer_init(
            "Camera Buffer",
            &[camera_uniform],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let lighting_buffer = gpu_context.create_buffer_init(
            "Lighting Buffer",
            &[config.lighting],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0), uniform_entry(1)],
            label: Some("frame_bind_group_layout"),
        });
        let object_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0)],
            label: Some("object_bind_group_layout"),
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let shader = gpu_context.create_shader_module("Mesh Shader", include_str!("shaders/mesh.wgsl"));
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Render Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &object_bind_group_layout],
            push_constant_ranges: &[],
        });
        let sample_count = Self::sample_count_for(&config);
        let opaque_pipeline = Self::create_render_pipeline(
            device,
            &layout,
            &shader,
            surface_config.format,
            sample_count,
            &config,
            true,
        );
        let translucent_pipeline = Self::create_render_pipeline(
            device,
            &layout,
            &shader,
            surface_config.format,
            sample_count,
            &config,
            false,
        );
        debug!(
            "Mesh renderer ready: {:?}, {}x{}, {} samples",
            surface_config.format, surface_config.width, surface_config.height, sample_count
        );

        Self {
            gpu_context,
            surface,
            surface_config,
            opaque_pipeline,
            translucent_pipeline,
            camera_uniform,
            camera_buffer,
            lighting_buffer,
            frame_bind_group,
            object_bind_group_layout,
            config,
        }
    }

    fn sample_count_for(config: &MeshRenderConfig) -> u32 {
        if config.enable_multisampling {
            4
        } else {
            1
        }
    }

    /// Create a render pipeline; translucent pipelines test depth but do not write it
    fn create_render_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        sample_count: u32,
        config: &MeshRenderConfig,
        opaque: bool,
    ) -> wgpu::RenderPipeline {
        let label = if opaque { "Opaque" } else { "Translucent" };
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Mesh Render Pipeline", label)),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: if config.enable_backface_culling {
                    Some(wgpu::Face::Back)
                } else {
                    None
                },
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: if config.enable_depth_test {
                Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: opaque,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                })
            } else {
                None
            },
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }

    /// Current frame size in pixels
    pub fn size(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Update camera matrices and position
    pub fn update_camera(&mut self, view_matrix: Matrix4<f32>, proj_matrix: Matrix4<f32>, camera_pos: Vector3<f32>) {
        self.camera_uniform.view_proj = (proj_matrix * view_matrix).into();
        self.camera_uniform.view_pos = camera_pos.into();
        self.gpu_context
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&self.camera_uniform));
    }

    /// Update lighting parameters
    pub fn update_lighting(&mut self, params: LightingParams) {
        self.config.lighting = params;
        self.gpu_context
            .queue
            .write_buffer(&self.lighting_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Resize the frame; zero-sized requests are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.gpu_context.device, &self.surface_config);
        }
    }

    /// Drop the window surface. Later surface renders fail; offscreen still works.
    pub fn release_surface(&mut self) {
        if self.surface.take().is_some() {
            debug!("Render surface released");
        }
    }

    /// Render a frame to the window surface and present it
    pub fn render(&mut self, items: &[DrawItem<'_>], overlay: Option<&mut dyn OverlayPainter>) -> Result<()> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| Error::Gpu("Renderer has no surface".to_string()))?;
        let output = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(&self.gpu_context.device, &self.surface_config);
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {}", e))),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu_context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Mesh Render Encoder"),
            });
        self.encode_scene(&mut encoder, &view, items);
        if let Some(overlay) = overlay {
            overlay.paint(&self.gpu_context, &mut encoder, &view, self.size());
        }
        self.gpu_context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Render a frame offscreen and return it as tightly packed RGBA8 rows
    pub fn render_to_pixels(
        &mut self,
        items: &[DrawItem<'_>],
        overlay: Option<&mut dyn OverlayPainter>,
    ) -> Result<Vec<u8>> {
        let [width, height] = self.size();
        let texture = self.gpu_context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu_context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Offscreen Render Encoder"),
            });
        self.encode_scene(&mut encoder, &view, items);
        if let Some(overlay) = overlay {
            overlay.paint(&self.gpu_context, &mut encoder, &view, [width, height]);
        }
        self.gpu_context.queue.submit(std::iter::once(encoder.finish()));

        read_texture_rgba(&self.gpu_context.device, &self.gpu_context.queue, &texture, width, height)
    }

    fn create_attachment(&self, label: &str, format: wgpu::TextureFormat, sample_count: u32) -> wgpu::TextureView {
        let texture = self.gpu_context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: self.surface_config.width,
                height: self.surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Record the mesh pass into `encoder`, resolving into `target`
    fn encode_scene(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, items: &[DrawItem<'_>]) {
        let device = &self.gpu_context.device;
        let sample_count = Self::sample_count_for(&self.config);
        let msaa_view = (sample_count > 1)
            .then(|| self.create_attachment("MSAA Texture", self.surface_config.format, sample_count));
        let depth_view = self
            .config
            .enable_depth_test
            .then(|| self.create_attachment("Depth Texture", DEPTH_FORMAT, sample_count));

        // Opaque first, translucent after; invisible and empty items are skipped
        let mut ordered: Vec<&DrawItem<'_>> = items
            .iter()
            .filter(|item| item.opacity > 0.0 && !item.mesh.is_empty())
            .collect();
        ordered.sort_by_key(|item| !item.is_opaque());

        let uploads: Vec<(wgpu::Buffer, wgpu::Buffer, wgpu::BindGroup, u32, bool)> = ordered
            .iter()
            .map(|item| {
                let vertex_buffer = self.gpu_context.create_buffer_init(
                    "Mesh Vertex Buffer",
                    &item.mesh.vertices,
                    wgpu::BufferUsages::VERTEX,
                );
                let index_buffer = self.gpu_context.create_buffer_init(
                    "Mesh Index Buffer",
                    &item.mesh.indices,
                    wgpu::BufferUsages::INDEX,
                );
                let object = ObjectUniform {
                    offset: item.offset,
                    opacity: item.opacity.min(1.0),
                };
                let object_buffer =
                    self.gpu_context
                        .create_buffer_init("Object Buffer", &[object], wgpu::BufferUsages::UNIFORM);
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &self.object_bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: object_buffer.as_entire_binding(),
                    }],
                    label: Some("object_bind_group"),
                });
                (
                    vertex_buffer,
                    index_buffer,
                    bind_group,
                    item.mesh.indices.len() as u32,
                    item.is_opaque(),
                )
            })
            .collect();

        let [r, g, b, a] = self.config.background_color;
        let (view, resolve_target) = match &msaa_view {
            Some(msaa) => (msaa, Some(target)),
            None => (target, None),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|depth_view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (vertex_buffer, index_buffer, bind_group, index_count, opaque) in &uploads {
            let pipeline = if *opaque {
                &self.opaque_pipeline
            } else {
                &self.translucent_pipeline
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(1, bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..*index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deformview_core::{DataArray, Point3f, Vector3f};

    fn triangle() -> PolyData {
        PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 40);
        assert_eq!(std::mem::size_of::<LightingParams>(), 48);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(MeshVertex::desc().attributes.len(), 3);
    }

    #[test]
    fn test_from_polydata_uses_colors_and_normals() {
        let mesh = triangle();
        let colors = [[1.0, 0.0, 0.0, 1.0]; 3];
        let gpu = GpuMesh::from_polydata(&mesh, Some(&colors), [0.5; 4]);
        assert_eq!(gpu.indices, vec![0, 1, 2]);
        assert_eq!(gpu.vertices[1].color, [1.0, 0.0, 0.0, 1.0]);
        // counter-clockwise in the XY plane faces +Z
        assert_eq!(gpu.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_polydata_prefers_normals_array() {
        let mut mesh = triangle();
        mesh.add_point_array(DataArray::vectors("Normals", &[-Vector3f::z(); 3])).unwrap();
        mesh.point_data.set_active_normals("Normals");
        let gpu = GpuMesh::from_polydata(&mesh, None, [0.5; 4]);
        assert_eq!(gpu.vertices[2].normal, [0.0, 0.0, -1.0]);
        assert_eq!(gpu.vertices[2].color, [0.5; 4]);
    }

    #[test]
    fn test_empty_mesh_is_skipped() {
        assert!(GpuMesh::default().is_empty());
        let points_only = PolyData::from_points_and_polys(vec![Point3f::origin()], vec![]);
        assert!(GpuMesh::from_polydata(&points_only, None, [1.0; 4]).is_empty());
    }

    #[test]
    fn test_headless_frame_shows_mesh_over_background() {
        pollster::block_on(async {
            let Ok(mut renderer) = MeshRenderer::headless(32, 32, MeshRenderConfig::default()).await else {
                // no adapter on this machine
                return;
            };
            // clip space is world space with identity matrices
            let mesh = PolyData::from_points_and_polys(
                vec![
                    Point3f::new(-1.0, -1.0, 0.5),
                    Point3f::new(1.0, -1.0, 0.5),
                    Point3f::new(0.0, 1.0, 0.5),
                ],
                vec![[0, 1, 2]],
            );
            let gpu_mesh = GpuMesh::from_polydata(&mesh, None, [1.0, 0.0, 0.0, 1.0]);
            renderer.update_camera(Matrix4::identity(), Matrix4::identity(), Vector3::new(0.0, 0.0, 2.0));

            let item = DrawItem {
                mesh: &gpu_mesh,
                opacity: 1.0,
                offset: [0.0; 3],
            };
            let pixels = renderer.render_to_pixels(&[item], None).unwrap();
            assert_eq!(pixels.len(), 32 * 32 * 4);

            // top-left corner lies outside the triangle
            assert_eq!(&pixels[0..4], &[255, 255, 255, 255]);
            let center = (16 * 32 + 16) * 4;
            assert!(pixels[center] > pixels[center + 1]);
            assert_relative_eq!(pixels[center + 3] as f32, 255.0);
        });
    }
}
