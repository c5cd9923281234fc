//! Interactive window
//!
//! A winit event loop owning the window, the renderer, the scene and the
//! registered handlers. Key and timer callbacks run to completion on the loop
//! thread before the next event is dispatched.

use crate::config::ViewerConfig;
use crate::interaction::{FrameGrabber, KeyHandler, KeyOutcome};
use crate::overlay::EguiOverlay;
use crate::scene::Scene;
use deformview_core::{Error, Result};
use deformview_gpu::MeshRenderer;
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::Key,
    window::{Window, WindowBuilder},
};

/// Degrees of rotation for a drag across the whole window
const ORBIT_DEGREES_PER_WINDOW: f32 = 200.0;
/// Dolly exponent base, per unit of motion
const DOLLY_BASE: f32 = 1.1;
const MOTION_FACTOR: f32 = 10.0;

/// Whether a repeating timer keeps firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Continue,
    /// Destroy the timer after this tick
    Stop,
}

/// Callback fired by a repeating timer on the event loop thread
pub trait TimerHandler {
    fn on_timer(&mut self, scene: &mut Scene) -> TimerAction;
}

impl<F> TimerHandler for F
where
    F: FnMut(&mut Scene) -> TimerAction,
{
    fn on_timer(&mut self, scene: &mut Scene) -> TimerAction {
        self(scene)
    }
}

/// Which camera motion a mouse button drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Orbit,
    Dolly,
    Pan,
}

impl CameraMode {
    pub fn for_button(button: MouseButton) -> Option<Self> {
        match button {
            MouseButton::Left => Some(CameraMode::Orbit),
            MouseButton::Right => Some(CameraMode::Dolly),
            MouseButton::Middle => Some(CameraMode::Pan),
            _ => None,
        }
    }
}

/// Azimuth and elevation in degrees for a cursor motion in pixels
pub fn orbit_angles(dx: f32, dy: f32, size: [u32; 2]) -> (f32, f32) {
    let w = size[0].max(1) as f32;
    let h = size[1].max(1) as f32;
    (-ORBIT_DEGREES_PER_WINDOW * dx / w, ORBIT_DEGREES_PER_WINDOW * dy / h)
}

/// Dolly factor for a vertical drag; dragging up moves closer
pub fn drag_dolly_factor(dy: f32, height: u32) -> f32 {
    let half = (height.max(2) / 2) as f32;
    DOLLY_BASE.powf(MOTION_FACTOR * -dy / half)
}

/// Dolly factor for a wheel motion in lines; scrolling forward moves closer
pub fn wheel_dolly_factor(lines: f32) -> f32 {
    DOLLY_BASE.powf(0.2 * MOTION_FACTOR * lines)
}

/// The renderer and overlay, usable both for window frames and captures
pub struct RenderTarget {
    renderer: MeshRenderer,
    overlay: EguiOverlay,
}

impl RenderTarget {
    pub fn new(renderer: MeshRenderer) -> Self {
        let overlay = EguiOverlay::new(&renderer.gpu_context.device, renderer.format());
        Self { renderer, overlay }
    }

    pub fn renderer(&self) -> &MeshRenderer {
        &self.renderer
    }

    pub fn overlay_mut(&mut self) -> &mut EguiOverlay {
        &mut self.overlay
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn release_surface(&mut self) {
        self.renderer.release_surface();
    }

    fn sync_camera(&mut self, scene: &Scene) {
        let [w, h] = self.renderer.size();
        let mut camera = scene.camera.clone();
        camera.aspect_ratio = w as f32 / h.max(1) as f32;
        self.renderer.update_camera(
            camera.view_matrix(),
            camera.projection_matrix(),
            camera.position.coords,
        );
    }

    /// Draw `scene` to the window
    pub fn draw(&mut self, scene: &Scene) -> Result<()> {
        self.sync_camera(scene);
        let frame = scene.prepare();
        let items = frame.draw_items();
        let mut painter = self.overlay.for_scene(scene);
        self.renderer.render(&items, Some(&mut painter))
    }

    /// Draw `scene` offscreen and return the pixels
    pub fn capture(&mut self, scene: &Scene) -> Result<RgbaImage> {
        self.sync_camera(scene);
        let frame = scene.prepare();
        let items = frame.draw_items();
        let [w, h] = self.renderer.size();
        let mut painter = self.overlay.for_scene(scene);
        let pixels = self.renderer.render_to_pixels(&items, Some(&mut painter))?;
        RgbaImage::from_raw(w, h, pixels)
            .ok_or_else(|| Error::Visualization("captured frame has the wrong size".to_string()))
    }
}

impl FrameGrabber for RenderTarget {
    /// Shows the frame in the window when there is one, then captures it
    fn grab(&mut self, scene: &Scene) -> Result<RgbaImage> {
        if self.renderer.has_surface() {
            self.draw(scene)?;
        }
        self.capture(scene)
    }
}

struct Timer {
    interval: Duration,
    next_tick: Instant,
    handler: Box<dyn TimerHandler>,
}

/// Interactive viewer for a [`Scene`]
pub struct Viewer {
    scene: Scene,
    config: ViewerConfig,
    key_handler: Option<Box<dyn KeyHandler>>,
    timer: Option<(Duration, Box<dyn TimerHandler>)>,
}

impl Viewer {
    pub fn new(scene: Scene, config: ViewerConfig) -> Self {
        Self {
            scene,
            config,
            key_handler: None,
            timer: None,
        }
    }

    /// Register the key callback; a later call replaces it
    pub fn with_key_handler(mut self, handler: impl KeyHandler + 'static) -> Self {
        self.key_handler = Some(Box::new(handler));
        self
    }

    /// Register a repeating timer
    pub fn with_timer(mut self, interval: Duration, handler: impl TimerHandler + 'static) -> Self {
        self.timer = Some((interval, Box::new(handler)));
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Open the window and block until it is closed
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.config.title.as_str())
                .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
                .build(&event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let renderer = pollster::block_on(MeshRenderer::new(window.clone(), self.config.render_config()))?;
        let mut target = RenderTarget::new(renderer);
        let ppp = egui_winit::pixels_per_point(target.overlay_mut().context(), &window);
        target.overlay_mut().set_pixels_per_point(ppp);
        info!("Viewer window '{}' opened", self.config.title);

        let mut session = Session {
            window,
            scene: self.scene,
            target,
            key_handler: self.key_handler,
            timer: self.timer.map(|(interval, handler)| Timer {
                interval,
                next_tick: Instant::now() + interval,
                handler,
            }),
            initial_zoom: Some(self.config.initial_zoom),
            drag: None,
            cursor: None,
        };

        session.window.request_redraw();
        event_loop
            .run(move |event, elwt| session.handle_event(event, elwt))
            .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))
    }
}

/// State moved into the event loop
struct Session {
    window: Arc<Window>,
    scene: Scene,
    target: RenderTarget,
    key_handler: Option<Box<dyn KeyHandler>>,
    timer: Option<Timer>,
    /// Zoom still to apply after the first frame
    initial_zoom: Option<f32>,
    drag: Option<CameraMode>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Session {
    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { event, .. } => self.handle_window_event(event, elwt),
            Event::AboutToWait => self.poll_timer(elwt),
            _ => {}
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => self.close(elwt),
            WindowEvent::Resized(size) => {
                self.target.resize(size.width, size.height);
                self.window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.target.overlay_mut().set_pixels_per_point(scale_factor as f32);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Key::Character(text) = &event.logical_key {
                    self.on_key(text.as_str(), elwt);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match state {
                    ElementState::Pressed => CameraMode::for_button(button).or(self.drag),
                    ElementState::Released if CameraMode::for_button(button) == self.drag => None,
                    ElementState::Released => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(mode), Some(last)) = (self.drag, self.cursor) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    self.drag_camera(mode, dx, dy);
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.scene.camera.dolly(wheel_dolly_factor(lines));
                self.scene.reset_clipping_range();
                self.window.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn on_key(&mut self, key: &str, elwt: &EventLoopWindowTarget<()>) {
        let Some(handler) = self.key_handler.as_mut() else {
            return;
        };
        match handler.on_key(key, &mut self.scene, &mut self.target) {
            KeyOutcome::Ignored => {}
            KeyOutcome::Redraw => self.window.request_redraw(),
            KeyOutcome::Quit => self.close(elwt),
        }
    }

    fn drag_camera(&mut self, mode: CameraMode, dx: f32, dy: f32) {
        let size = self.target.renderer().size();
        let camera = &mut self.scene.camera;
        match mode {
            CameraMode::Orbit => {
                let (azimuth, elevation) = orbit_angles(dx, dy, size);
                camera.azimuth(azimuth);
                camera.elevation(elevation);
                camera.orthogonalize_view_up();
            }
            CameraMode::Dolly => camera.dolly(drag_dolly_factor(dy, size[1])),
            CameraMode::Pan => {
                let height = (camera.view_angle.to_radians() / 2.0).tan() * camera.distance() * 2.0;
                let scale = height / size[1].max(1) as f32;
                camera.pan(-dx * scale, dy * scale);
            }
        }
        self.scene.reset_clipping_range();
        self.window.request_redraw();
    }

    fn redraw(&mut self) {
        if let Err(e) = self.target.draw(&self.scene) {
            error!("Render error: {}", e);
            return;
        }
        if let Some(zoom) = self.initial_zoom.take() {
            debug!("Applying initial zoom {}", zoom);
            self.scene.camera.zoom(zoom);
            self.window.request_redraw();
        }
    }

    fn poll_timer(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let Some(timer) = self.timer.as_mut() else {
            elwt.set_control_flow(ControlFlow::Wait);
            return;
        };
        let now = Instant::now();
        if now >= timer.next_tick {
            let action = timer.handler.on_timer(&mut self.scene);
            timer.next_tick = now + timer.interval;
            self.window.request_redraw();
            if action == TimerAction::Stop {
                info!("Timer destroyed");
                self.timer = None;
                elwt.set_control_flow(ControlFlow::Wait);
                return;
            }
        }
        elwt.set_control_flow(ControlFlow::WaitUntil(timer.next_tick));
    }

    fn close(&mut self, elwt: &EventLoopWindowTarget<()>) {
        info!("Closing viewer window");
        self.timer = None;
        self.target.release_surface();
        elwt.exit();
    }
}
