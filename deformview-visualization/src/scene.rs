//! Scene description: actors, 2D annotations and the camera
//!
//! A [`Scene`] is plain data. The interaction controller mutates it in place
//! and the viewer turns it into draw items and overlay shapes every frame.

use crate::camera::Camera;
use crate::colormap::LookupTable;
use crate::config::ViewerConfig;
use deformview_algorithms::{append_polydata, glyph_arrows, ArrowShape};
use deformview_core::{Bounds, Error, PolyData, Result, Vector3f};
use deformview_gpu::{DrawItem, GpuMesh};
use nalgebra::Vector4;
use tracing::{debug, info};

/// Appearance of an actor
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub opacity: f32,
    /// Colour used when no scalars are mapped
    pub color: [f32; 3],
}

impl Default for Property {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Maps a point array of the actor's geometry to colours
#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    pub scalar_visibility: bool,
    /// Name of the array used for colouring
    pub color_array: Option<String>,
    pub scalar_range: (f32, f32),
    pub lookup_table: LookupTable,
}

impl Mapper {
    /// Colour by the mesh's active scalars over their full range
    pub fn for_mesh(mesh: &PolyData) -> Self {
        Self {
            scalar_visibility: true,
            color_array: mesh.point_data.scalars().map(|a| a.name.clone()),
            scalar_range: mesh.scalar_range().unwrap_or((0.0, 1.0)),
            lookup_table: LookupTable::default(),
        }
    }

    /// Per-point colours, `None` when the mesh should use the solid colour
    pub fn point_colors(&self, mesh: &PolyData) -> Option<Vec<[f32; 4]>> {
        if !self.scalar_visibility {
            return None;
        }
        let array = mesh.point_data.get(self.color_array.as_deref()?)?;
        if array.len() != mesh.point_count() {
            return None;
        }
        Some(self.lookup_table.map_array(array, self.scalar_range))
    }
}

/// A renderable mesh with its colour mapping and appearance
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub geometry: PolyData,
    pub mapper: Mapper,
    pub property: Property,
    /// Translation applied when drawing
    pub position: Vector3f,
    pub visible: bool,
}

impl Actor {
    pub fn new(geometry: PolyData) -> Self {
        let mapper = Mapper::for_mesh(&geometry);
        Self {
            geometry,
            mapper,
            property: Property::default(),
            position: Vector3f::zeros(),
            visible: true,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.property.opacity = opacity;
        self
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.property.color = color;
        self
    }

    /// Replace the geometry, keeping the mapper and property
    pub fn set_geometry(&mut self, geometry: PolyData) {
        self.geometry = geometry;
    }

    /// Whether the actor contributes anything to a frame
    pub fn is_drawn(&self) -> bool {
        self.visible && self.property.opacity > 0.0 && !self.geometry.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let b = self.geometry.bounds()?;
        Some(Bounds {
            min: b.min + self.position,
            max: b.max + self.position,
        })
    }

    pub fn gpu_mesh(&self) -> GpuMesh {
        let colors = self.mapper.point_colors(&self.geometry);
        let [r, g, b] = self.property.color;
        GpuMesh::from_polydata(&self.geometry, colors.as_deref(), [r, g, b, 1.0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Colour legend for the surface actor's lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarBar {
    pub title: String,
    pub label_count: usize,
    pub orientation: Orientation,
    /// Lower-left anchor in normalised viewport coordinates (origin bottom-left)
    pub position: [f32; 2],
    pub text_color: [f32; 3],
}

impl ScalarBar {
    /// Evenly spaced label values over `range`, ends included
    pub fn labels(&self, range: (f32, f32)) -> Vec<f32> {
        match self.label_count {
            0 => Vec::new(),
            1 => vec![range.0],
            n => (0..n)
                .map(|i| range.0 + (range.1 - range.0) * i as f32 / (n - 1) as f32)
                .collect(),
        }
    }
}

impl Default for ScalarBar {
    fn default() -> Self {
        Self {
            title: String::new(),
            label_count: 4,
            orientation: Orientation::Horizontal,
            position: [0.0, 0.5],
            text_color: [0.0, 0.0, 0.0],
        }
    }
}

/// Orientation marker showing the world axes in a corner viewport
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationAxes {
    pub labels: [String; 3],
    /// Per-axis scale; a negative entry flips that axis
    pub scale: [f32; 3],
    /// `[xmin, ymin, xmax, ymax]` in normalised viewport coordinates
    pub viewport: [f32; 4],
    pub interactive: bool,
}

impl OrientationAxes {
    /// Screen-space direction of each scaled axis (x right, y up), relative
    /// to the largest scale
    pub fn project(&self, camera: &Camera) -> [[f32; 2]; 3] {
        let view = camera.view_matrix();
        let max_scale = self
            .scale
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()))
            .max(f32::EPSILON);
        let mut projected = [[0.0; 2]; 3];
        for (axis, out) in projected.iter_mut().enumerate() {
            let mut direction = Vector4::zeros();
            direction[axis] = self.scale[axis] / max_scale;
            let v = view * direction;
            *out = [v.x, v.y];
        }
        projected
    }
}

impl Default for OrientationAxes {
    fn default() -> Self {
        Self {
            labels: ["X".to_string(), "Y".to_string(), "Z".to_string()],
            scale: [1.5, -1.5, 1.5],
            viewport: [0.0, 0.0, 0.2, 0.2],
            interactive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    LowerLeft,
    LowerRight,
    UpperLeft,
    UpperRight,
}

/// Text pinned to a corner of the window
#[derive(Debug, Clone, PartialEq)]
pub struct CornerAnnotation {
    pub corner: Corner,
    pub text: String,
    pub color: [f32; 3],
    pub max_font_size: f32,
}

impl CornerAnnotation {
    /// Key help for the interaction controller
    pub fn instructions(config: &ViewerConfig) -> Self {
        let text = [
            "Press key:".to_string(),
            "T to toggle scalars".to_string(),
            "G to toggle glyphs".to_string(),
            format!("D to deform ({}%)", config.warp_step),
            format!("O for opacity ({}%)", config.opacity_step),
            "A to animate".to_string(),
            "Q to quit".to_string(),
        ]
        .join("\n");
        Self {
            corner: Corner::LowerRight,
            text,
            color: [0.0, 0.0, 0.0],
            max_font_size: 20.0,
        }
    }
}

/// Everything drawn in the viewer window
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub surface: Actor,
    pub secondary: Option<Actor>,
    pub glyphs: Option<Actor>,
    pub scalar_bar: Option<ScalarBar>,
    pub axes: Option<OrientationAxes>,
    pub annotation: Option<CornerAnnotation>,
    /// One-line state summary shown in the upper-left corner
    pub status: String,
    pub camera: Camera,
    pub background: [f32; 3],
}

impl Scene {
    /// A scene holding a single actor and nothing else
    pub fn new(surface: Actor, camera: Camera) -> Self {
        Self {
            surface,
            secondary: None,
            glyphs: None,
            scalar_bar: None,
            axes: None,
            annotation: None,
            status: String::new(),
            camera,
            background: [1.0, 1.0, 1.0],
        }
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        std::iter::once(&self.surface)
            .chain(self.secondary.as_ref())
            .chain(self.glyphs.as_ref())
    }

    /// Bounds of every actor with geometry
    pub fn bounds(&self) -> Option<Bounds> {
        let corners: Vec<_> = self
            .actors()
            .filter_map(Actor::bounds)
            .flat_map(|b| [b.min, b.max])
            .collect();
        Bounds::from_points(&corners)
    }

    /// Refit the camera's clipping planes to the current actors
    pub fn reset_clipping_range(&mut self) {
        if let Some(bounds) = self.bounds() {
            self.camera.reset_clipping_range(&bounds);
        }
    }

    /// Convert the drawable actors for upload
    pub fn prepare(&self) -> PreparedFrame {
        let meshes = self
            .actors()
            .filter(|actor| actor.is_drawn())
            .map(|actor| PreparedMesh {
                mesh: actor.gpu_mesh(),
                opacity: actor.property.opacity,
                offset: actor.position.into(),
            })
            .collect();
        PreparedFrame { meshes }
    }
}

/// An actor converted to GPU vertex data
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    pub mesh: GpuMesh,
    pub opacity: f32,
    pub offset: [f32; 3],
}

/// The GPU-ready meshes of one frame
#[derive(Debug, Clone, Default)]
pub struct PreparedFrame {
    pub meshes: Vec<PreparedMesh>,
}

impl PreparedFrame {
    pub fn draw_items(&self) -> Vec<DrawItem<'_>> {
        self.meshes
            .iter()
            .map(|m| DrawItem {
                mesh: &m.mesh,
                opacity: m.opacity,
                offset: m.offset,
            })
            .collect()
    }
}

/// One mesh, or several to be appended into one
#[derive(Debug, Clone, PartialEq)]
pub enum MeshInput {
    Single(PolyData),
    List(Vec<PolyData>),
}

impl MeshInput {
    /// Resolve to a single mesh, labelling list members by their index
    pub fn into_polydata(self) -> Result<PolyData> {
        match self {
            MeshInput::Single(mesh) => Ok(mesh),
            MeshInput::List(meshes) => append_polydata(&meshes),
        }
    }
}

impl From<PolyData> for MeshInput {
    fn from(mesh: PolyData) -> Self {
        MeshInput::Single(mesh)
    }
}

impl From<Vec<PolyData>> for MeshInput {
    fn from(meshes: Vec<PolyData>) -> Self {
        MeshInput::List(meshes)
    }
}

/// Assemble the comparison scene for a primary mesh and an optional secondary
///
/// The surface and secondary actors share `config.opacity`. A glyph actor is
/// added when the primary carries vectors. The camera looks at the primary's
/// center of mass from its lower-left side with +Z up.
pub fn build_scene(primary: MeshInput, secondary: Option<MeshInput>, config: &ViewerConfig) -> Result<Scene> {
    let primary = primary.into_polydata()?;
    primary.validate()?;
    let bounds = primary
        .bounds()
        .ok_or_else(|| Error::InvalidData("primary mesh has no points".to_string()))?;

    let mut camera = Camera::for_mesh(&bounds, primary.center_of_mass());
    camera.aspect_ratio = config.width as f32 / config.height.max(1) as f32;

    let glyphs = if primary.has_vectors() {
        let arrows = glyph_arrows(&primary, &ArrowShape::default(), 1.0)?;
        debug!("Built {} glyph triangles", arrows.poly_count());
        Some(Actor::new(arrows).with_opacity(config.glyph_opacity))
    } else {
        None
    };

    let secondary = match secondary {
        Some(input) => {
            let mesh = input.into_polydata()?;
            mesh.validate()?;
            Some(Actor::new(mesh).with_opacity(config.opacity))
        }
        None => None,
    };

    let surface = Actor::new(primary).with_opacity(config.opacity);
    let scalar_bar = ScalarBar {
        title: surface.mapper.color_array.clone().unwrap_or_default(),
        ..ScalarBar::default()
    };

    info!(
        "Scene: {} points, {} triangles, secondary: {}, glyphs: {}",
        surface.geometry.point_count(),
        surface.geometry.poly_count(),
        secondary.is_some(),
        glyphs.is_some()
    );

    let mut scene = Scene {
        surface,
        secondary,
        glyphs,
        scalar_bar: Some(scalar_bar),
        axes: Some(OrientationAxes::default()),
        annotation: Some(CornerAnnotation::instructions(config)),
        status: String::new(),
        camera,
        background: config.background,
    };
    scene.reset_clipping_range();
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deformview_core::{DataArray, Point3f};
    use nalgebra::{Point3, Vector3};

    fn quad() -> PolyData {
        let mut mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(2.0, 2.0, 0.0),
                Point3f::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        mesh.add_point_array(DataArray::scalars("temperature", vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        mesh.point_data.set_active_scalars("temperature");
        mesh
    }

    fn with_vectors(mut mesh: PolyData) -> PolyData {
        let v = vec![Vector3f::new(0.0, 0.0, 1.0); mesh.point_count()];
        mesh.add_point_array(DataArray::vectors("displacement", &v)).unwrap();
        mesh
    }

    #[test]
    fn test_build_scene_without_vectors() {
        let config = ViewerConfig::default();
        let scene = build_scene(quad().into(), None, &config).unwrap();
        assert!(scene.glyphs.is_none());
        assert!(scene.secondary.is_none());
        assert_relative_eq!(scene.surface.property.opacity, 0.5);
        assert_eq!(scene.surface.mapper.color_array.as_deref(), Some("temperature"));
        assert_eq!(scene.surface.mapper.scalar_range, (1.0, 4.0));
        assert_eq!(scene.scalar_bar.as_ref().unwrap().title, "temperature");
        assert_eq!(scene.background, [1.0, 1.0, 1.0]);
        assert_eq!(scene.actors().count(), 1);
    }

    #[test]
    fn test_build_scene_camera_placement() {
        let config = ViewerConfig::default();
        let scene = build_scene(quad().into(), None, &config).unwrap();
        assert_relative_eq!(scene.camera.position, Point3::new(-5.0, -3.0, 0.0));
        assert_relative_eq!(scene.camera.focal_point, Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(scene.camera.view_up, Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_build_scene_adds_glyphs_and_secondary() {
        let config = ViewerConfig::default();
        let scene = build_scene(
            with_vectors(quad()).into(),
            Some(quad().into()),
            &config,
        )
        .unwrap();
        let glyphs = scene.glyphs.as_ref().unwrap();
        assert_relative_eq!(glyphs.property.opacity, 0.1);
        assert!(glyphs.geometry.point_count() > 0);
        assert_relative_eq!(scene.secondary.as_ref().unwrap().property.opacity, 0.5);
        assert_eq!(scene.actors().count(), 3);
        assert_eq!(scene.prepare().meshes.len(), 3);
    }

    #[test]
    fn test_build_scene_appends_lists() {
        let config = ViewerConfig::default();
        let mut second = quad();
        second.points.iter_mut().for_each(|p| p.x += 5.0);
        let scene = build_scene(vec![quad(), second].into(), None, &config).unwrap();
        assert_eq!(scene.surface.geometry.point_count(), 8);
        assert!(scene.surface.geometry.point_data.get("label_color").is_some());
    }

    #[test]
    fn test_build_scene_rejects_empty_mesh() {
        let config = ViewerConfig::default();
        assert!(build_scene(PolyData::new().into(), None, &config).is_err());
    }

    #[test]
    fn test_mapper_colors_follow_visibility() {
        let mesh = quad();
        let mut mapper = Mapper::for_mesh(&mesh);
        let colors = mapper.point_colors(&mesh).unwrap();
        assert_eq!(colors[0], mapper.lookup_table.entry(0));
        assert_eq!(colors[3], mapper.lookup_table.entry(255));
        mapper.scalar_visibility = false;
        assert!(mapper.point_colors(&mesh).is_none());
        mapper.scalar_visibility = true;
        mapper.color_array = Some("missing".to_string());
        assert!(mapper.point_colors(&mesh).is_none());
    }

    #[test]
    fn test_prepare_skips_invisible_actors() {
        let config = ViewerConfig::default();
        let mut scene = build_scene(with_vectors(quad()).into(), None, &config).unwrap();
        scene.glyphs.as_mut().unwrap().property.opacity = 0.0;
        let frame = scene.prepare();
        assert_eq!(frame.meshes.len(), 1);
        assert_eq!(frame.draw_items().len(), 1);
    }

    #[test]
    fn test_scalar_bar_labels() {
        let bar = ScalarBar::default();
        assert_eq!(bar.labels((0.0, 3.0)), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_axes_projection_flips_y() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 10.0), Point3::origin(), Vector3::y());
        let axes = OrientationAxes::default();
        let [x, y, z] = axes.project(&camera);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(y[1], -1.0, epsilon = 1e-5);
        assert_relative_eq!(z[0], 0.0, epsilon = 1e-5);
        assert_relative_eq!(z[1], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_instructions_list_keys() {
        let note = CornerAnnotation::instructions(&ViewerConfig::default());
        assert_eq!(note.corner, Corner::LowerRight);
        assert!(note.text.starts_with("Press key:\nT to toggle scalars"));
        assert!(note.text.contains("D to deform (5%)"));
        assert!(note.text.contains("O for opacity (10%)"));
        assert!(note.text.ends_with("Q to quit"));
    }
}
