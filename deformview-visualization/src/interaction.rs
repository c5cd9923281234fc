//! Keyboard interaction
//!
//! One handler owns the per-session state and maps key symbols to
//! independent toggles and steppers:
//!
//! | key | effect |
//! |-----|--------|
//! | `t` | cycle the colouring field, with a "none" slot after the last one |
//! | `g` | toggle glyph opacity between 0 and its configured value |
//! | `d` | step the warp factor by 5% along a triangle wave and re-warp |
//! | `o` | step the surface opacity by 10% along a triangle wave |
//! | `a` | capture a full warp cycle as a GIF |
//! | `q` | end the session |
//!
//! Missing data (no fields, no vectors) turns a key into a logged no-op.

use crate::animation::{animation_path, write_gif};
use crate::config::ViewerConfig;
use crate::scene::Scene;
use deformview_algorithms::warp_vector;
use deformview_core::{PolyData, Result};
use image::RgbaImage;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub const FACTOR_MIN: i32 = 0;
pub const FACTOR_MAX: i32 = 100;

/// A percentage moving back and forth between 0 and 100 in fixed steps
///
/// A step that would cross a bound lands on it and reverses direction. A
/// stepper created on the upper bound starts moving down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oscillator {
    value: i32,
    sign: i32,
    step: i32,
}

impl Oscillator {
    pub fn new(value: i32, step: i32) -> Self {
        let value = value.clamp(FACTOR_MIN, FACTOR_MAX);
        let sign = if value >= FACTOR_MAX { -1 } else { 1 };
        Self {
            value,
            sign,
            step: step.abs().max(1),
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn sign(&self) -> i32 {
        self.sign
    }

    /// The value as a fraction in [0, 1]
    pub fn fraction(&self) -> f32 {
        self.value as f32 / 100.0
    }

    /// Advance one step and return the new value
    pub fn advance(&mut self) -> i32 {
        let next = self.value + self.sign * self.step;
        if next >= FACTOR_MAX {
            self.value = FACTOR_MAX;
            self.sign = -1;
        } else if next <= FACTOR_MIN {
            self.value = FACTOR_MIN;
            self.sign = 1;
        } else {
            self.value = next;
        }
        self.value
    }
}

/// Mutable state of one interactive session
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    /// Position in the field list; `field_count` is the "no colouring" slot
    pub scalar_index: usize,
    pub field_count: usize,
    pub warp: Oscillator,
    pub opacity: Oscillator,
    pub glyph_visible: bool,
    pub terminated: bool,
}

impl InteractionState {
    pub fn warp_factor(&self) -> i32 {
        self.warp.value()
    }

    pub fn warp_sign(&self) -> i32 {
        self.warp.sign()
    }

    pub fn opacity_factor(&self) -> i32 {
        self.opacity.value()
    }

    pub fn opacity_sign(&self) -> i32 {
        self.opacity.sign()
    }

    pub fn is_sentinel(&self) -> bool {
        self.scalar_index == self.field_count
    }
}

/// Commands bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    CycleScalar,
    ToggleGlyph,
    StepWarp,
    StepOpacity,
    Animate,
}

impl KeyCommand {
    /// Look up a key symbol; upper and lower case map to the same command
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "q" => Some(KeyCommand::Quit),
            "t" => Some(KeyCommand::CycleScalar),
            "g" => Some(KeyCommand::ToggleGlyph),
            "d" => Some(KeyCommand::StepWarp),
            "o" => Some(KeyCommand::StepOpacity),
            "a" => Some(KeyCommand::Animate),
            _ => None,
        }
    }
}

/// What the event loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing changed
    Ignored,
    Redraw,
    /// Release the surface and leave the loop
    Quit,
}

/// Renders the current scene and hands back the pixels
pub trait FrameGrabber {
    fn grab(&mut self, scene: &Scene) -> Result<RgbaImage>;
}

/// The single key callback registered with the viewer
pub trait KeyHandler {
    fn on_key(&mut self, key: &str, scene: &mut Scene, grabber: &mut dyn FrameGrabber) -> KeyOutcome;
}

/// Key handler driving field cycling, glyphs, warp, opacity and capture
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    /// Undeformed copy of the surface geometry
    base: PolyData,
    field_names: Vec<String>,
    glyph_opacity: f32,
    animation_frames: usize,
    frame_delay_ms: u32,
    animation_dir: PathBuf,
}

impl InteractionController {
    /// Take the initial state from `scene` and write the first status line
    ///
    /// The field list is every point array of the surface geometry. The field
    /// index starts on the array the surface is already coloured by, or on
    /// the "none" slot when it is uncoloured, so the first cycle always moves
    /// to the next field in the list.
    pub fn attach(scene: &mut Scene, config: &ViewerConfig) -> Self {
        let base = scene.surface.geometry.clone();
        let field_names = base.point_data.array_names();
        let mapper = &scene.surface.mapper;
        let scalar_index = mapper
            .color_array
            .as_deref()
            .filter(|_| mapper.scalar_visibility)
            .and_then(|name| field_names.iter().position(|f| f == name))
            .unwrap_or(field_names.len());
        let glyph_opacity = scene
            .glyphs
            .as_ref()
            .map(|g| g.property.opacity)
            .unwrap_or(0.0);
        let opacity = (scene.surface.property.opacity * 100.0).round() as i32;
        let state = InteractionState {
            scalar_index,
            field_count: field_names.len(),
            warp: Oscillator::new(FACTOR_MIN, config.warp_step),
            opacity: Oscillator::new(opacity, config.opacity_step),
            glyph_visible: glyph_opacity > 0.0,
            terminated: false,
        };
        let controller = Self {
            state,
            base,
            field_names,
            glyph_opacity,
            animation_frames: config.animation_frames,
            frame_delay_ms: config.frame_delay_ms,
            animation_dir: config.animation_dir.clone(),
        };
        controller.refresh_status(scene);
        controller
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Apply one command; terminated sessions ignore everything
    pub fn handle(
        &mut self,
        command: KeyCommand,
        scene: &mut Scene,
        grabber: &mut dyn FrameGrabber,
    ) -> KeyOutcome {
        if self.state.terminated {
            return KeyOutcome::Ignored;
        }
        let outcome = match command {
            KeyCommand::Quit => self.quit(),
            KeyCommand::CycleScalar => self.cycle_scalar(scene),
            KeyCommand::ToggleGlyph => self.toggle_glyph(scene),
            KeyCommand::StepWarp => self.step_warp(scene),
            KeyCommand::StepOpacity => self.step_opacity(scene),
            KeyCommand::Animate => self.animate(scene, grabber),
        };
        if outcome == KeyOutcome::Redraw {
            self.refresh_status(scene);
        }
        outcome
    }

    fn quit(&mut self) -> KeyOutcome {
        info!("closing deformview window");
        self.state.terminated = true;
        KeyOutcome::Quit
    }

    fn cycle_scalar(&mut self, scene: &mut Scene) -> KeyOutcome {
        if self.field_names.is_empty() {
            warn!("no scalars found");
            return KeyOutcome::Ignored;
        }
        self.state.scalar_index = (self.state.scalar_index + 1) % (self.state.field_count + 1);

        let mapper = &mut scene.surface.mapper;
        match self.field_names.get(self.state.scalar_index) {
            Some(name) => {
                info!("changing scalar to {}", name);
                let range = self
                    .base
                    .point_data
                    .get(name)
                    .and_then(|a| a.range())
                    .unwrap_or((0.0, 1.0));
                mapper.scalar_visibility = true;
                mapper.color_array = Some(name.clone());
                mapper.scalar_range = range;
                self.base.point_data.set_active_scalars(name);
                scene.surface.geometry.point_data.set_active_scalars(name);
                if let Some(bar) = scene.scalar_bar.as_mut() {
                    bar.title = name.clone();
                }
            }
            None => {
                info!("changing scalar to None");
                mapper.scalar_visibility = false;
                if let Some(bar) = scene.scalar_bar.as_mut() {
                    bar.title.clear();
                }
            }
        }
        KeyOutcome::Redraw
    }

    fn toggle_glyph(&mut self, scene: &mut Scene) -> KeyOutcome {
        let Some(glyphs) = scene.glyphs.as_mut() else {
            warn!("no vectors found");
            return KeyOutcome::Ignored;
        };
        let opacity = (glyphs.property.opacity - self.glyph_opacity).abs();
        glyphs.property.opacity = opacity;
        self.state.glyph_visible = opacity > 0.0;
        info!("glyphs {}", if self.state.glyph_visible { "shown" } else { "hidden" });
        KeyOutcome::Redraw
    }

    fn step_warp(&mut self, scene: &mut Scene) -> KeyOutcome {
        if !self.base.has_vectors() {
            warn!("no vectors found");
            return KeyOutcome::Ignored;
        }
        self.advance_warp(scene);
        KeyOutcome::Redraw
    }

    fn advance_warp(&mut self, scene: &mut Scene) {
        let factor = self.state.warp.advance();
        info!("warp scale factor {}%", factor);
        match warp_vector(&self.base, self.state.warp.fraction()) {
            Ok(warped) => scene.surface.set_geometry(warped),
            Err(e) => warn!("warp failed: {}", e),
        }
    }

    fn step_opacity(&mut self, scene: &mut Scene) -> KeyOutcome {
        let factor = self.state.opacity.advance();
        info!("opacity to {}%", factor);
        scene.surface.property.opacity = self.state.opacity.fraction();
        KeyOutcome::Redraw
    }

    fn animate(&mut self, scene: &mut Scene, grabber: &mut dyn FrameGrabber) -> KeyOutcome {
        if !self.base.has_vectors() {
            warn!("no vectors found");
            return KeyOutcome::Ignored;
        }
        let mut frames = Vec::with_capacity(self.animation_frames);
        for _ in 0..self.animation_frames {
            self.advance_warp(scene);
            self.refresh_status(scene);
            match grabber.grab(scene) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    error!("frame capture failed: {}", e);
                    break;
                }
            }
        }

        if !frames.is_empty() {
            let path = animation_path(&self.animation_dir, &chrono::Local::now());
            match write_gif(&frames, &path, self.frame_delay_ms) {
                Ok(()) => info!("wrote {} frames to {}", frames.len(), path.display()),
                Err(e) => error!("failed to write animation: {:#}", e),
            }
        }
        KeyOutcome::Redraw
    }

    /// Rewrite the status line from the current state
    pub fn refresh_status(&self, scene: &mut Scene) {
        let mapper = &scene.surface.mapper;
        let field = match (&mapper.color_array, mapper.scalar_visibility) {
            (Some(name), true) => name.as_str(),
            _ => "none",
        };
        scene.status = format!(
            "scalar: {}  warp: {}%  opacity: {}%",
            field,
            self.state.warp_factor(),
            self.state.opacity_factor()
        );
    }
}

impl KeyHandler for InteractionController {
    fn on_key(&mut self, key: &str, scene: &mut Scene, grabber: &mut dyn FrameGrabber) -> KeyOutcome {
        match KeyCommand::from_key(key) {
            Some(command) => self.handle(command, scene, grabber),
            None => KeyOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::build_scene;
    use approx::assert_relative_eq;
    use deformview_core::{DataArray, Error, Point3f, Vector3f};
    use image::Rgba;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Collects the messages of WARN events
    struct WarningLayer(Arc<Mutex<Vec<String>>>);

    #[derive(Default)]
    struct MessageVisitor(String);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarningLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    /// Run `f` and return the warnings it logged
    fn warnings_during(f: impl FnOnce()) -> Vec<String> {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(WarningLayer(captured.clone()));
        tracing::subscriber::with_default(subscriber, f);
        let messages = captured.lock().unwrap().clone();
        messages
    }

    /// Records the surface height at each grab
    #[derive(Default)]
    struct MockGrabber {
        heights: Vec<f32>,
        fail_after: Option<usize>,
    }

    impl FrameGrabber for MockGrabber {
        fn grab(&mut self, scene: &Scene) -> Result<RgbaImage> {
            if self.fail_after == Some(self.heights.len()) {
                return Err(Error::Gpu("device lost".to_string()));
            }
            self.heights.push(scene.surface.geometry.points[0].z);
            Ok(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])))
        }
    }

    fn triangle(with_vectors: bool) -> PolyData {
        let mut mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.add_point_array(DataArray::scalars("temperature", vec![-2.0, 5.0, 7.5]))
            .unwrap();
        if with_vectors {
            let v = vec![Vector3f::new(0.0, 0.0, 2.0); 3];
            mesh.add_point_array(DataArray::vectors("displacement", &v)).unwrap();
        }
        mesh
    }

    fn session(with_vectors: bool, config: &ViewerConfig) -> (Scene, InteractionController) {
        let mut scene = build_scene(triangle(with_vectors).into(), None, config).unwrap();
        let controller = InteractionController::attach(&mut scene, config);
        (scene, controller)
    }

    fn press(controller: &mut InteractionController, scene: &mut Scene, key: &str) -> KeyOutcome {
        controller.on_key(key, scene, &mut MockGrabber::default())
    }

    #[test]
    fn test_oscillator_triangle_wave() {
        let mut osc = Oscillator::new(0, 5);
        let trace: Vec<i32> = (0..40).map(|_| osc.advance()).collect();
        assert_eq!(trace[19], 100);
        assert_eq!(trace[39], 0);
        assert_eq!(trace[20], 95);
        assert!(trace.iter().all(|v| (0..=100).contains(v)));
        // period of 40 presses
        let next: Vec<i32> = (0..40).map(|_| osc.advance()).collect();
        assert_eq!(trace, next);
    }

    #[test]
    fn test_oscillator_clamps_uneven_steps() {
        let mut osc = Oscillator::new(50, 30);
        assert_eq!(osc.advance(), 80);
        assert_eq!(osc.advance(), 100);
        assert_eq!(osc.sign(), -1);
        assert_eq!(osc.advance(), 70);
        assert_eq!(osc.advance(), 40);
        assert_eq!(osc.advance(), 10);
        assert_eq!(osc.advance(), 0);
        assert_eq!(osc.sign(), 1);
    }

    #[test]
    fn test_oscillator_starting_on_upper_bound_moves_down() {
        let mut osc = Oscillator::new(100, 10);
        assert_eq!(osc.sign(), -1);
        assert_eq!(osc.advance(), 90);
        let mut clamped = Oscillator::new(140, 10);
        assert_eq!(clamped.value(), 100);
        assert_eq!(clamped.advance(), 90);
    }

    #[test]
    fn test_key_lookup_is_case_insensitive() {
        assert_eq!(KeyCommand::from_key("q"), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key("T"), Some(KeyCommand::CycleScalar));
        assert_eq!(KeyCommand::from_key("G"), Some(KeyCommand::ToggleGlyph));
        assert_eq!(KeyCommand::from_key("d"), Some(KeyCommand::StepWarp));
        assert_eq!(KeyCommand::from_key("O"), Some(KeyCommand::StepOpacity));
        assert_eq!(KeyCommand::from_key("a"), Some(KeyCommand::Animate));
        assert_eq!(KeyCommand::from_key("x"), None);
        assert_eq!(KeyCommand::from_key("tt"), None);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        let before = scene.clone();
        assert_eq!(press(&mut controller, &mut scene, "z"), KeyOutcome::Ignored);
        assert_eq!(scene, before);
    }

    #[test]
    fn test_initial_state() {
        let config = ViewerConfig::default();
        let (scene, controller) = session(true, &config);
        let state = controller.state();
        assert_eq!(state.field_count, 2);
        assert!(state.is_sentinel());
        assert_eq!(state.warp_factor(), 0);
        assert_eq!(state.warp_sign(), 1);
        assert_eq!(state.opacity_factor(), 50);
        assert_eq!(state.opacity_sign(), 1);
        assert!(state.glyph_visible);
        assert!(!state.terminated);
        assert_eq!(scene.status, "scalar: none  warp: 0%  opacity: 50%");
    }

    #[test]
    fn test_cycle_scalar_activates_then_clears() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(false, &config);
        assert_eq!(controller.field_names(), ["temperature".to_string()]);

        assert_eq!(press(&mut controller, &mut scene, "t"), KeyOutcome::Redraw);
        let mapper = &scene.surface.mapper;
        assert!(mapper.scalar_visibility);
        assert_eq!(mapper.color_array.as_deref(), Some("temperature"));
        assert_eq!(mapper.scalar_range, (-2.0, 7.5));
        assert_eq!(scene.scalar_bar.as_ref().unwrap().title, "temperature");
        assert!(scene.status.starts_with("scalar: temperature"));

        assert_eq!(press(&mut controller, &mut scene, "t"), KeyOutcome::Redraw);
        assert!(!scene.surface.mapper.scalar_visibility);
        assert!(controller.state().is_sentinel());
        assert!(scene.status.starts_with("scalar: none"));
    }

    #[test]
    fn test_attach_starts_on_field_already_shown() {
        let config = ViewerConfig::default();
        let mut mesh = triangle(true);
        mesh.point_data.set_active_scalars("temperature");
        let mut scene = build_scene(mesh.into(), None, &config).unwrap();
        let mut controller = InteractionController::attach(&mut scene, &config);
        assert_eq!(controller.state().scalar_index, 0);
        assert!(scene.status.starts_with("scalar: temperature"));

        // the next field is shown, not the one already on screen
        press(&mut controller, &mut scene, "t");
        assert_eq!(scene.surface.mapper.color_array.as_deref(), Some("displacement"));
        press(&mut controller, &mut scene, "t");
        assert!(controller.state().is_sentinel());
        assert!(!scene.surface.mapper.scalar_visibility);
        assert!(scene.status.starts_with("scalar: none"));
    }

    #[test]
    fn test_cycle_scalar_full_cycle_returns_to_start() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        let start = controller.state().scalar_index;
        let n = controller.field_names().len();
        for _ in 0..=n {
            press(&mut controller, &mut scene, "t");
        }
        assert_eq!(controller.state().scalar_index, start);
    }

    #[test]
    fn test_cycle_scalar_range_comes_from_undeformed_mesh() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        for _ in 0..3 {
            press(&mut controller, &mut scene, "d");
        }
        press(&mut controller, &mut scene, "t");
        press(&mut controller, &mut scene, "t");
        // second field is the vector array, ranged by magnitude
        assert_eq!(scene.surface.mapper.color_array.as_deref(), Some("displacement"));
        assert_eq!(scene.surface.mapper.scalar_range, (2.0, 2.0));
    }

    #[test]
    fn test_cycle_scalar_without_fields_is_noop() {
        let config = ViewerConfig::default();
        let mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let mut scene = build_scene(mesh.into(), None, &config).unwrap();
        let mut controller = InteractionController::attach(&mut scene, &config);
        let before = controller.state().clone();
        let warnings = warnings_during(|| {
            assert_eq!(press(&mut controller, &mut scene, "t"), KeyOutcome::Ignored);
        });
        assert_eq!(controller.state(), &before);
        assert_eq!(warnings, vec!["no scalars found".to_string()]);
    }

    #[test]
    fn test_vector_keys_are_noops_without_vectors() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(false, &config);
        let state = controller.state().clone();
        let geometry = scene.surface.geometry.clone();
        let mut grabber = MockGrabber::default();
        let warnings = warnings_during(|| {
            for key in ["g", "d", "a"] {
                assert_eq!(controller.on_key(key, &mut scene, &mut grabber), KeyOutcome::Ignored);
            }
        });
        assert_eq!(warnings, vec!["no vectors found".to_string(); 3]);
        assert_eq!(controller.state(), &state);
        assert_eq!(scene.surface.geometry, geometry);
        assert!(grabber.heights.is_empty());
    }

    #[test]
    fn test_toggle_glyph_flips_opacity() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        assert_eq!(press(&mut controller, &mut scene, "g"), KeyOutcome::Redraw);
        assert_relative_eq!(scene.glyphs.as_ref().unwrap().property.opacity, 0.0);
        assert!(!controller.state().glyph_visible);
        press(&mut controller, &mut scene, "G");
        assert_relative_eq!(scene.glyphs.as_ref().unwrap().property.opacity, 0.1);
        assert!(controller.state().glyph_visible);
    }

    #[test]
    fn test_step_warp_displaces_surface() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        for _ in 0..4 {
            assert_eq!(press(&mut controller, &mut scene, "d"), KeyOutcome::Redraw);
        }
        assert_eq!(controller.state().warp_factor(), 20);
        // vectors are (0, 0, 2), warped by 20%
        assert_relative_eq!(scene.surface.geometry.points[0].z, 0.4, epsilon = 1e-6);
        assert!(scene.status.contains("warp: 20%"));
    }

    #[test]
    fn test_warp_stays_in_range_with_period_40() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        let mut trace = Vec::new();
        for _ in 0..80 {
            press(&mut controller, &mut scene, "d");
            trace.push(controller.state().warp_factor());
        }
        assert!(trace.iter().all(|v| (0..=100).contains(v)));
        assert_eq!(trace[..40], trace[40..]);
        assert_eq!(trace[19], 100);
        assert_eq!(trace[39], 0);
    }

    #[test]
    fn test_opacity_period_20() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(false, &config);
        let mut trace = Vec::new();
        for _ in 0..40 {
            assert_eq!(press(&mut controller, &mut scene, "o"), KeyOutcome::Redraw);
            trace.push(controller.state().opacity_factor());
        }
        assert_eq!(&trace[..6], &[60, 70, 80, 90, 100, 90]);
        assert!(trace.iter().all(|v| (0..=100).contains(v)));
        assert_eq!(trace[..20], trace[20..]);
        assert_relative_eq!(
            scene.surface.property.opacity,
            *trace.last().unwrap() as f32 / 100.0
        );
    }

    #[test]
    fn test_quit_is_terminal_and_idempotent() {
        let config = ViewerConfig::default();
        let (mut scene, mut controller) = session(true, &config);
        press(&mut controller, &mut scene, "d");
        assert_eq!(press(&mut controller, &mut scene, "Q"), KeyOutcome::Quit);
        assert!(controller.state().terminated);

        let state = controller.state().clone();
        let snapshot = scene.clone();
        for key in ["q", "t", "g", "d", "o", "a"] {
            assert_eq!(press(&mut controller, &mut scene, key), KeyOutcome::Ignored);
        }
        assert_eq!(controller.state(), &state);
        assert_eq!(scene, snapshot);
    }

    #[test]
    fn test_animate_captures_warp_cycle() {
        let dir = std::env::temp_dir().join(format!("deformview_anim_{}", std::process::id()));
        let config = ViewerConfig {
            animation_dir: dir.clone(),
            ..ViewerConfig::default()
        };
        let (mut scene, mut controller) = session(true, &config);
        let mut grabber = MockGrabber::default();

        assert_eq!(controller.on_key("a", &mut scene, &mut grabber), KeyOutcome::Redraw);
        assert_eq!(grabber.heights.len(), 40);
        assert_relative_eq!(grabber.heights[0], 0.1, epsilon = 1e-6);
        assert_relative_eq!(grabber.heights[19], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grabber.heights[39], 0.0, epsilon = 1e-6);
        assert_eq!(controller.state().warp_factor(), 0);

        let written: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("deformation_"));
        assert!(written[0].ends_with(".gif"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_animate_stops_on_capture_failure() {
        let dir = std::env::temp_dir().join(format!("deformview_fail_{}", std::process::id()));
        let config = ViewerConfig {
            animation_dir: dir.clone(),
            ..ViewerConfig::default()
        };
        let (mut scene, mut controller) = session(true, &config);
        let mut grabber = MockGrabber {
            fail_after: Some(0),
            ..MockGrabber::default()
        };
        assert_eq!(controller.on_key("a", &mut scene, &mut grabber), KeyOutcome::Redraw);
        assert!(grabber.heights.is_empty());
        assert!(!dir.exists());
        assert!(!controller.state().terminated);
    }
}
