//! Vello-based renderer implementation.

use crate::projection::{PartVisual, Projection, RubberBandVisual, WireVisual};
use crate::renderer::{RenderContext, Renderer};
use kurbo::{Affine, Circle, Rect, Stroke};
use peniko::{Color, Fill};
use vello::Scene;
use wirebench_core::Editor;
use wirebench_core::consts::WAYPOINT_RADIUS;

/// Vello-based renderer for GPU-accelerated 2D graphics.
///
/// Text (part titles, wire labels) is left to the host overlay.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
    part_fill: Color,
    part_stroke: Color,
    /// Current zoom, for constant-width outlines.
    zoom: f64,
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            part_fill: Color::from_rgba8(248, 250, 252, 255),
            part_stroke: Color::from_rgba8(51, 65, 85, 255),
            zoom: 1.0,
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Build a scene for export: white background, no handles, content-sized.
    ///
    /// `scale` is the export resolution multiplier. Returns the scene and
    /// its pixel bounds, or `None` bounds for an empty diagram.
    pub fn build_export_scene(&mut self, editor: &Editor, scale: f64) -> (Scene, Option<Rect>) {
        if editor.diagram().is_empty() {
            self.scene.reset();
            return (std::mem::take(&mut self.scene), None);
        }
        let ctx = RenderContext::for_export(editor)
            .with_scale_factor(scale)
            .with_handles(false);
        let bounds = Rect::new(
            0.0,
            0.0,
            ctx.viewport_size.width * scale,
            ctx.viewport_size.height * scale,
        );
        self.build_scene(&ctx);
        (std::mem::take(&mut self.scene), Some(bounds))
    }

    fn render_part(&mut self, part: &PartVisual, transform: Affine) {
        let transform = transform * part.transform;
        let body = part.body().to_rounded_rect(4.0);
        let outline = Stroke::new(1.0 / self.zoom);

        self.scene.fill(Fill::NonZero, transform, self.part_fill, None, &body);
        self.scene.stroke(&outline, transform, self.part_stroke, None, &body);
        for pin in &part.pins {
            let marker = Circle::new(pin.center, 4.0);
            self.scene.fill(Fill::NonZero, transform, Color::WHITE, None, &marker);
            self.scene.stroke(&outline, transform, self.part_stroke, None, &marker);
        }
    }

    fn render_wire(&mut self, wire: &WireVisual, transform: Affine, handles: bool) {
        let transform = transform * wire.to_diagram();
        let stroke = Stroke::new(wire.stroke_width)
            .with_caps(kurbo::Cap::Round)
            .with_join(kurbo::Join::Round);
        self.scene.stroke(&stroke, transform, wire.color, None, &wire.path);

        if !handles {
            return;
        }
        let outline = Stroke::new(1.5 / self.zoom);
        for handle in &wire.handles {
            let circle = Circle::new(*handle, WAYPOINT_RADIUS);
            self.scene.fill(Fill::NonZero, transform, Color::WHITE, None, &circle);
            self.scene.stroke(&outline, transform, wire.color, None, &circle);
        }
    }

    fn render_rubber_band(&mut self, band: &RubberBandVisual, transform: Affine, color: Color) {
        let transform = transform * band.to_diagram();
        let stroke = Stroke::new(band.stroke_width).with_dashes(0.0, band.dashes);
        self.scene.stroke(&stroke, transform, color, None, &band.path);
    }
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.scene.reset();
        self.zoom = ctx.zoom();

        let projection = Projection::of(ctx.editor);
        let transform = ctx.transform();

        if !ctx.use_viewport {
            let size = ctx.viewport_size;
            let background = Rect::new(
                0.0,
                0.0,
                size.width * ctx.scale_factor,
                size.height * ctx.scale_factor,
            );
            self.scene.fill(
                Fill::NonZero,
                Affine::IDENTITY,
                ctx.background_color,
                None,
                &background,
            );
        }

        for part in &projection.parts {
            self.render_part(part, transform);
        }
        for wire in &projection.wires {
            self.render_wire(wire, transform, ctx.show_handles);
        }
        if let Some(band) = &projection.rubber_band {
            self.render_rubber_band(band, transform, ctx.rubber_band_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::editor;
    use kurbo::{Point, Size};

    #[test]
    fn test_renderer_creation() {
        let renderer = VelloRenderer::new();
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_scene_with_diagram() {
        let mut renderer = VelloRenderer::new();
        let editor = editor();
        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx);
        assert!(!renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_export_scene_bounds() {
        let mut renderer = VelloRenderer::new();
        let editor = editor();
        let extent = editor.content_extent();
        let (_, bounds) = renderer.build_export_scene(&editor, 2.0);
        let bounds = bounds.unwrap();
        assert!((bounds.width() - extent.width * 2.0).abs() < 1e-9);
        assert!((bounds.height() - extent.height * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_empty_diagram() {
        let mut renderer = VelloRenderer::new();
        let editor = Editor::builder()
            .container(Point::ZERO, Size::new(100.0, 100.0))
            .build()
            .unwrap();
        let (scene, bounds) = renderer.build_export_scene(&editor, 1.0);
        assert!(bounds.is_none());
        assert!(scene.encoding().is_empty());
    }
}
