//! Renderer trait abstraction.

use kurbo::Size;
use peniko::Color;
use thiserror::Error;
use wirebench_core::Editor;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The editor whose diagram is drawn.
    pub editor: &'a Editor,
    /// Output size in logical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
    /// Color of the pending wire.
    pub rubber_band_color: Color,
    /// Apply the editor's pan and zoom. Exports draw in diagram space.
    pub use_viewport: bool,
    /// Draw waypoint handles on wires.
    pub show_handles: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a context drawing through the editor's viewport.
    pub fn new(editor: &'a Editor, viewport_size: Size) -> Self {
        Self {
            editor,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            rubber_band_color: Color::from_rgba8(59, 130, 246, 255),
            use_viewport: true,
            show_handles: true,
        }
    }

    /// Context for a static export sized to the diagram content.
    pub fn for_export(editor: &'a Editor) -> Self {
        Self::new(editor, editor.content_extent())
            .with_viewport(false)
            .with_background(Color::WHITE)
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the rubber band color.
    pub fn with_rubber_band_color(mut self, color: Color) -> Self {
        self.rubber_band_color = color;
        self
    }

    /// Toggle the viewport transform.
    pub fn with_viewport(mut self, enabled: bool) -> Self {
        self.use_viewport = enabled;
        self
    }

    /// Toggle waypoint handles.
    pub fn with_handles(mut self, show: bool) -> Self {
        self.show_handles = show;
        self
    }

    /// Scale applied to strokes so they keep a constant on-screen width.
    pub fn zoom(&self) -> f64 {
        if self.use_viewport {
            self.editor.viewport().scale()
        } else {
            1.0
        }
    }

    /// Diagram-to-output transform.
    pub fn transform(&self) -> kurbo::Affine {
        let view = if self.use_viewport {
            self.editor.viewport().transform()
        } else {
            kurbo::Affine::IDENTITY
        };
        kurbo::Affine::scale(self.scale_factor) * view
    }
}

/// Trait for rendering backends.
///
/// Implementations project the editor through [`crate::projection`] and
/// emit their own drawing commands.
pub trait Renderer: Send + Sync {
    /// Build the scene for a frame.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn editor() -> Editor {
        Editor::builder()
            .container(Point::ZERO, Size::new(800.0, 600.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_context_defaults() {
        let editor = editor();
        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));
        assert!(ctx.use_viewport);
        assert!(ctx.show_handles);
        assert!((ctx.zoom() - 1.0).abs() < f64::EPSILON);
        let bg = ctx.background_color.to_rgba8();
        assert_eq!((bg.r, bg.g, bg.b, bg.a), (250, 250, 250, 255));
    }

    #[test]
    fn test_export_context_ignores_zoom() {
        let mut editor = editor();
        editor.zoom_in();
        let ctx = RenderContext::for_export(&editor).with_scale_factor(2.0);
        assert!((ctx.zoom() - 1.0).abs() < f64::EPSILON);
        let p = ctx.transform() * Point::new(10.0, 5.0);
        assert!((p.x - 20.0).abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_live_context_follows_viewport() {
        let mut editor = editor();
        editor.zoom_in();
        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));
        assert!((ctx.zoom() - editor.viewport().scale()).abs() < f64::EPSILON);
    }
}
