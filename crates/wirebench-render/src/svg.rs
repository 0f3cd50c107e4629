//! SVG renderer. Produces a standalone document from the projection.

use crate::color::to_hex;
use crate::projection::{PartVisual, Projection, RubberBandVisual, WireVisual};
use crate::renderer::{RenderContext, RenderResult, Renderer};
use kurbo::Affine;
use peniko::Color;
use std::fmt::{self, Write};
use std::path::Path;
use wirebench_core::consts::WAYPOINT_RADIUS;

const PART_FILL: &str = "#f8fafc";
const PART_STROKE: &str = "#334155";
const PIN_RADIUS: f64 = 4.0;

/// SVG renderer.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    document: String,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last built document.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Take ownership of the document (leaves an empty one).
    pub fn take_document(&mut self) -> String {
        std::mem::take(&mut self.document)
    }

    /// Write the last built document to a file.
    pub fn write_to(&self, path: &Path) -> RenderResult<()> {
        std::fs::write(path, &self.document)?;
        log::info!("Wrote {} bytes of SVG to {}", self.document.len(), path.display());
        Ok(())
    }
}

impl Renderer for SvgRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        let projection = Projection::of(ctx.editor);
        self.document.clear();
        if let Err(e) = write_document(&mut self.document, ctx, &projection) {
            log::error!("SVG generation failed: {}", e);
            self.document.clear();
        }
    }
}

/// Render the editor's diagram as a standalone SVG sized to its content.
pub fn export_svg(editor: &wirebench_core::Editor) -> String {
    let mut renderer = SvgRenderer::new();
    renderer.build_scene(&RenderContext::for_export(editor).with_handles(false));
    renderer.take_document()
}

fn write_document(out: &mut String, ctx: &RenderContext, projection: &Projection) -> fmt::Result {
    let width = ctx.viewport_size.width * ctx.scale_factor;
    let height = ctx.viewport_size.height * ctx.scale_factor;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    )?;
    writeln!(
        out,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        to_hex(ctx.background_color)
    )?;
    writeln!(out, r#"<g transform="{}">"#, matrix(ctx.transform()))?;

    for part in &projection.parts {
        write_part(out, part)?;
    }
    let handle_stroke = 1.5 / ctx.zoom();
    for wire in &projection.wires {
        write_wire(out, wire, ctx.show_handles, handle_stroke)?;
    }
    if let Some(band) = &projection.rubber_band {
        write_rubber_band(out, band, ctx.rubber_band_color)?;
    }

    writeln!(out, "</g>")?;
    writeln!(out, "</svg>")
}

fn write_part(out: &mut String, part: &PartVisual) -> fmt::Result {
    let body = part.body();
    writeln!(
        out,
        r#"<g class="part" data-id="{}" data-type="{}" transform="{}">"#,
        escape(part.id.as_str()),
        escape(&part.kind),
        matrix(part.transform)
    )?;
    writeln!(
        out,
        r#"<rect width="{}" height="{}" rx="4" fill="{}" stroke="{}"/>"#,
        body.width(),
        body.height(),
        PART_FILL,
        PART_STROKE
    )?;
    writeln!(
        out,
        r#"<text x="4" y="14" font-family="sans-serif" font-size="12">{}</text>"#,
        escape(&part.title)
    )?;
    for pin in &part.pins {
        writeln!(
            out,
            r#"<circle cx="{}" cy="{}" r="{}" fill="white" stroke="{}"><title>{}</title></circle>"#,
            pin.center.x,
            pin.center.y,
            PIN_RADIUS,
            PART_STROKE,
            escape(&pin.label)
        )?;
    }
    writeln!(out, "</g>")
}

fn write_wire(out: &mut String, wire: &WireVisual, handles: bool, handle_stroke: f64) -> fmt::Result {
    let color = to_hex(wire.color);
    writeln!(
        out,
        r#"<g class="wire{}" data-id="{}" transform="{}">"#,
        if wire.selected { " selected" } else { "" },
        escape(wire.id.as_str()),
        matrix(wire.to_diagram())
    )?;
    writeln!(
        out,
        r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
        wire.path.to_svg(),
        color,
        wire.stroke_width
    )?;
    if handles {
        for handle in &wire.handles {
            writeln!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" fill="white" stroke="{}" stroke-width="{}"/>"#,
                handle.x, handle.y, WAYPOINT_RADIUS, color, handle_stroke
            )?;
        }
    }
    if let (Some(label), Some(anchor)) = (&wire.label, wire.label_anchor()) {
        writeln!(
            out,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="11" text-anchor="middle">{}</text>"#,
            anchor.x,
            anchor.y - wire.stroke_width,
            escape(label)
        )?;
    }
    writeln!(out, "</g>")
}

fn write_rubber_band(out: &mut String, band: &RubberBandVisual, color: Color) -> fmt::Result {
    writeln!(
        out,
        r#"<path class="rubber-band" transform="{}" d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-dasharray="{} {}"/>"#,
        matrix(band.to_diagram()),
        band.path.to_svg(),
        to_hex(color),
        band.stroke_width,
        band.dashes[0],
        band.dashes[1]
    )
}

fn matrix(affine: Affine) -> String {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    format!("matrix({} {} {} {} {} {})", a, b, c, d, e, f)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{editor, wire_id};
    use kurbo::{Point, Size};
    use wirebench_core::{MenuAction, MouseButton};

    #[test]
    fn test_export_document_structure() {
        let editor = editor();
        let svg = export_svg(&editor);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches(r#"class="part""#).count(), 2);
        assert_eq!(svg.matches(r#"class="wire""#).count(), 1);
        assert!(svg.contains(r##"stroke="#1e90ff""##));
        // Export hides handles.
        assert!(!svg.contains(r#"stroke-width="1.5""#));
    }

    #[test]
    fn test_export_sized_to_content() {
        let editor = editor();
        let extent = editor.content_extent();
        let svg = export_svg(&editor);
        assert!(svg.contains(&format!(r#"width="{}""#, extent.width)));
        assert!(svg.contains(&format!(r#"height="{}""#, extent.height)));
    }

    #[test]
    fn test_live_render_shows_handles_and_band() {
        let mut editor = editor();
        editor.pointer_down(Point::new(200.0, 130.0), MouseButton::Left);
        editor.pointer_move(Point::new(250.0, 250.0));

        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)));
        let svg = renderer.document();
        assert!(svg.contains("rubber-band"));
        assert!(svg.contains(r#"r="5""#));
    }

    #[test]
    fn test_label_is_escaped() {
        let mut editor = editor();
        pollster::block_on(editor.apply_action(MenuAction::SetWireLabel {
            connection: wire_id(),
            label: "SDA <3.3V>".to_string(),
        }))
        .unwrap();
        let svg = export_svg(&editor);
        assert!(svg.contains("SDA &lt;3.3V&gt;"));
    }

    #[test]
    fn test_empty_diagram() {
        let editor = wirebench_core::Editor::builder()
            .container(Point::ZERO, Size::new(100.0, 100.0))
            .build()
            .unwrap();
        let svg = export_svg(&editor);
        assert!(!svg.contains("<path"));
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&RenderContext::for_export(&editor()));
        renderer.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, renderer.document());
    }
}
