//! 2D overlays drawn with egui on top of the mesh pass
//!
//! The overlay is not interactive: it only paints the scene's status line,
//! corner annotation, scalar bar and orientation axes.

use crate::scene::{Corner, CornerAnnotation, OrientationAxes, Orientation, ScalarBar, Scene};
use deformview_gpu::{GpuContext, OverlayPainter};
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

/// Number of colour steps drawn in the scalar bar
const BAR_SEGMENTS: usize = 64;
/// Extent of the scalar bar along and across its orientation, normalised
const BAR_LENGTH: f32 = 0.5;
const BAR_THICKNESS: f32 = 0.05;
const MARGIN: f32 = 8.0;

/// egui context and wgpu renderer for the overlay pass
pub struct EguiOverlay {
    ctx: egui::Context,
    renderer: egui_wgpu::Renderer,
    pixels_per_point: f32,
}

impl EguiOverlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            ctx: egui::Context::default(),
            renderer: egui_wgpu::Renderer::new(device, format, None, 1),
            pixels_per_point: 1.0,
        }
    }

    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }

    pub fn set_pixels_per_point(&mut self, pixels_per_point: f32) {
        self.pixels_per_point = pixels_per_point.max(0.1);
    }

    /// Bind the overlay to a scene for one frame
    pub fn for_scene<'a>(&'a mut self, scene: &'a Scene) -> ScenePainter<'a> {
        ScenePainter { overlay: self, scene }
    }

    fn paint_scene(
        &mut self,
        scene: &Scene,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: [u32; 2],
    ) {
        let ppp = self.pixels_per_point;
        let screen = Rect::from_min_size(
            Pos2::ZERO,
            egui::vec2(size[0] as f32 / ppp, size[1] as f32 / ppp),
        );
        let mut raw_input = egui::RawInput {
            screen_rect: Some(screen),
            ..Default::default()
        };
        raw_input
            .viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(ppp);

        let full_output = self.ctx.run(raw_input, |ctx| {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("deformview_overlay"),
            ));
            paint_overlay(&painter, screen, scene);
        });

        let jobs = self.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: full_output.pixels_per_point,
        };
        for (id, delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(&gpu.device, &gpu.queue, *id, delta);
        }
        let callbacks =
            self.renderer
                .update_buffers(&gpu.device, &gpu.queue, encoder, &jobs, &screen_descriptor);
        if !callbacks.is_empty() {
            gpu.queue.submit(callbacks);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer.render(&mut render_pass, &jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

/// An [`EguiOverlay`] paired with the scene it draws
pub struct ScenePainter<'a> {
    overlay: &'a mut EguiOverlay,
    scene: &'a Scene,
}

impl OverlayPainter for ScenePainter<'_> {
    fn paint(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: [u32; 2],
    ) {
        self.overlay.paint_scene(self.scene, gpu, encoder, target, size);
    }
}

/// Draw every 2D element of `scene` into `screen` (in points)
pub fn paint_overlay(painter: &Painter, screen: Rect, scene: &Scene) {
    if !scene.status.is_empty() {
        painter.text(
            screen.left_top() + Vec2::splat(MARGIN),
            Align2::LEFT_TOP,
            &scene.status,
            FontId::proportional(14.0),
            Color32::BLACK,
        );
    }
    if let Some(annotation) = &scene.annotation {
        paint_annotation(painter, screen, annotation);
    }
    if let Some(bar) = &scene.scalar_bar {
        paint_scalar_bar(painter, screen, bar, scene);
    }
    if let Some(axes) = &scene.axes {
        paint_axes(painter, screen, axes, scene);
    }
}

fn paint_annotation(painter: &Painter, screen: Rect, annotation: &CornerAnnotation) {
    let (pos, align) = corner_anchor(screen, annotation.corner);
    painter.text(
        pos,
        align,
        &annotation.text,
        FontId::proportional(annotation_font_size(screen, annotation.max_font_size)),
        color32(annotation.color),
    );
}

fn paint_scalar_bar(painter: &Painter, screen: Rect, bar: &ScalarBar, scene: &Scene) {
    let mapper = &scene.surface.mapper;
    let range = mapper.scalar_range;
    let rect = scalar_bar_rect(screen, bar);
    let text_color = color32(bar.text_color);
    let font = FontId::proportional(12.0);

    for i in 0..BAR_SEGMENTS {
        let t0 = i as f32 / BAR_SEGMENTS as f32;
        let t1 = (i + 1) as f32 / BAR_SEGMENTS as f32;
        let value = range.0 + (range.1 - range.0) * (t0 + t1) / 2.0;
        let segment = match bar.orientation {
            Orientation::Horizontal => Rect::from_x_y_ranges(
                rect.left() + rect.width() * t0..=rect.left() + rect.width() * t1,
                rect.y_range(),
            ),
            Orientation::Vertical => Rect::from_x_y_ranges(
                rect.x_range(),
                rect.bottom() - rect.height() * t1..=rect.bottom() - rect.height() * t0,
            ),
        };
        painter.rect_filled(segment, 0.0, rgba32(mapper.lookup_table.map_value(value, range)));
    }
    painter.rect_stroke(rect, 0.0, Stroke::new(1.0, text_color));

    let labels = bar.labels(range);
    let count = labels.len().max(2) - 1;
    for (i, value) in labels.iter().enumerate() {
        let t = i as f32 / count as f32;
        let (pos, align) = match bar.orientation {
            Orientation::Horizontal => (
                Pos2::new(rect.left() + rect.width() * t, rect.bottom() + 2.0),
                Align2::CENTER_TOP,
            ),
            Orientation::Vertical => (
                Pos2::new(rect.right() + 4.0, rect.bottom() - rect.height() * t),
                Align2::LEFT_CENTER,
            ),
        };
        painter.text(pos, align, format_label(*value), font.clone(), text_color);
    }

    if !bar.title.is_empty() {
        painter.text(
            Pos2::new(rect.center().x, rect.top() - 2.0),
            Align2::CENTER_BOTTOM,
            &bar.title,
            FontId::proportional(14.0),
            text_color,
        );
    }
}

fn paint_axes(painter: &Painter, screen: Rect, axes: &OrientationAxes, scene: &Scene) {
    let viewport = viewport_rect(screen, axes.viewport);
    let center = viewport.center();
    let radius = 0.35 * viewport.width().min(viewport.height());
    let colors = [
        Color32::from_rgb(255, 0, 0),
        Color32::from_rgb(255, 255, 0),
        Color32::from_rgb(0, 128, 0),
    ];
    let projected = axes.project(&scene.camera);
    for ((direction, label), color) in projected.iter().zip(&axes.labels).zip(colors) {
        let end = center + Vec2::new(direction[0], -direction[1]) * radius;
        painter.line_segment([center, end], Stroke::new(3.0, color));
        let label_pos = center + (end - center) * 1.2;
        painter.text(
            label_pos,
            Align2::CENTER_CENTER,
            label,
            FontId::proportional(13.0),
            Color32::BLACK,
        );
    }
}

/// Anchor point and text alignment for a corner
pub fn corner_anchor(screen: Rect, corner: Corner) -> (Pos2, Align2) {
    let inner = screen.shrink(MARGIN);
    match corner {
        Corner::LowerLeft => (inner.left_bottom(), Align2::LEFT_BOTTOM),
        Corner::LowerRight => (inner.right_bottom(), Align2::RIGHT_BOTTOM),
        Corner::UpperLeft => (inner.left_top(), Align2::LEFT_TOP),
        Corner::UpperRight => (inner.right_top(), Align2::RIGHT_TOP),
    }
}

/// Corner text size: grows with the window up to `max_font_size`
pub fn annotation_font_size(screen: Rect, max_font_size: f32) -> f32 {
    (screen.height().min(screen.width()) / 40.0).clamp(8.0, max_font_size.max(8.0))
}

/// Map a `[xmin, ymin, xmax, ymax]` viewport with a bottom-left origin to screen space
pub fn viewport_rect(screen: Rect, viewport: [f32; 4]) -> Rect {
    let [x0, y0, x1, y1] = viewport;
    Rect::from_min_max(
        Pos2::new(
            screen.left() + x0 * screen.width(),
            screen.bottom() - y1 * screen.height(),
        ),
        Pos2::new(
            screen.left() + x1 * screen.width(),
            screen.bottom() - y0 * screen.height(),
        ),
    )
}

/// Rectangle of the colour bar, anchored by its lower-left corner
pub fn scalar_bar_rect(screen: Rect, bar: &ScalarBar) -> Rect {
    let (w, h) = match bar.orientation {
        Orientation::Horizontal => (BAR_LENGTH, BAR_THICKNESS),
        Orientation::Vertical => (BAR_THICKNESS, BAR_LENGTH),
    };
    let [x, y] = bar.position;
    viewport_rect(screen, [x, y, x + w, y + h])
}

fn format_label(value: f32) -> String {
    if value != 0.0 && (value.abs() >= 1e4 || value.abs() < 1e-2) {
        format!("{:.2e}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn color32(rgb: [f32; 3]) -> Color32 {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgb(r, g, b)
}

fn rgba32(rgba: [f32; 4]) -> Color32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn screen() -> Rect {
        Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 800.0))
    }

    #[test]
    fn test_viewport_origin_is_bottom_left() {
        let rect = viewport_rect(screen(), [0.0, 0.0, 0.2, 0.2]);
        assert_relative_eq!(rect.left(), 0.0);
        assert_relative_eq!(rect.right(), 160.0);
        assert_relative_eq!(rect.top(), 640.0);
        assert_relative_eq!(rect.bottom(), 800.0);
    }

    #[test]
    fn test_scalar_bar_sits_at_mid_height() {
        let rect = scalar_bar_rect(screen(), &ScalarBar::default());
        assert_relative_eq!(rect.left(), 0.0);
        assert_relative_eq!(rect.bottom(), 400.0);
        assert!(rect.width() > rect.height());

        let vertical = ScalarBar {
            orientation: Orientation::Vertical,
            ..ScalarBar::default()
        };
        let rect = scalar_bar_rect(screen(), &vertical);
        assert!(rect.height() > rect.width());
    }

    #[test]
    fn test_corner_anchor_lower_right() {
        let (pos, align) = corner_anchor(screen(), Corner::LowerRight);
        assert_eq!(align, Align2::RIGHT_BOTTOM);
        assert_relative_eq!(pos.x, 800.0 - MARGIN);
        assert_relative_eq!(pos.y, 800.0 - MARGIN);
    }

    #[test]
    fn test_annotation_font_size_is_capped() {
        assert_relative_eq!(annotation_font_size(screen(), 20.0), 20.0);
        let big = Rect::from_min_size(Pos2::ZERO, egui::vec2(2000.0, 2000.0));
        assert_relative_eq!(annotation_font_size(big, 20.0), 20.0);
        let small = Rect::from_min_size(Pos2::ZERO, egui::vec2(400.0, 400.0));
        assert_relative_eq!(annotation_font_size(small, 20.0), 10.0);
    }

    #[test]
    fn test_label_format() {
        assert_eq!(format_label(0.0), "0.000");
        assert_eq!(format_label(2.5), "2.500");
        assert_eq!(format_label(123456.0), "1.23e5");
    }

    #[test]
    fn test_colour_conversion_clamps() {
        assert_eq!(color32([1.5, 0.0, -1.0]), Color32::from_rgb(255, 0, 0));
        assert_eq!(rgba32([0.0, 1.0, 0.0, 1.0]), Color32::from_rgb(0, 255, 0));
    }
}
