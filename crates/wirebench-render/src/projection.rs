//! Backend-independent projection of the editor into drawable visuals.
//!
//! Every wire becomes a padded box in diagram space with its polyline and
//! waypoint handles expressed relative to the box. Parts become rotated
//! rectangles with pin markers. Backends only translate these into their own
//! drawing commands.

use crate::color::resolve_color;
use kurbo::{Affine, BezPath, Point, Rect, Size};
use peniko::Color;
use wirebench_core::consts::{
    RUBBER_BAND_STROKE_WIDTH, SELECTED_WIRE_STROKE_WIDTH, WIRE_BOX_PADDING, WIRE_STROKE_WIDTH,
};
use wirebench_core::geometry::padded_bounds;
use wirebench_core::{Connection, ConnectionId, Editor, Part, PartId, RubberBand};

/// A wire, ready to draw.
#[derive(Debug, Clone)]
pub struct WireVisual {
    pub id: ConnectionId,
    /// Bounding box in diagram space, padded for the stroke and handles.
    pub bounds: Rect,
    /// Polyline relative to `bounds.origin()`.
    pub path: BezPath,
    /// Waypoint handle centers relative to `bounds.origin()`.
    pub handles: Vec<Point>,
    pub color: Color,
    pub stroke_width: f64,
    pub selected: bool,
    pub label: Option<String>,
}

impl WireVisual {
    /// Project a resolved polyline. Fewer than two points draws nothing.
    pub fn new(
        connection: &Connection,
        polyline: &[Point],
        color: Color,
        selected: bool,
    ) -> Option<Self> {
        if polyline.len() < 2 {
            return None;
        }
        let bounds = padded_bounds(polyline.iter().copied(), WIRE_BOX_PADDING)?;
        let shift = -bounds.origin().to_vec2();

        let mut path = BezPath::new();
        path.move_to(polyline[0] + shift);
        for p in &polyline[1..] {
            path.line_to(*p + shift);
        }

        Some(Self {
            id: connection.id.clone(),
            bounds,
            path,
            handles: connection.waypoints.iter().map(|p| *p + shift).collect(),
            color,
            stroke_width: if selected {
                SELECTED_WIRE_STROKE_WIDTH
            } else {
                WIRE_STROKE_WIDTH
            },
            selected,
            label: connection.label.clone(),
        })
    }

    /// Maps box-local coordinates into diagram space.
    pub fn to_diagram(&self) -> Affine {
        Affine::translate(self.bounds.origin().to_vec2())
    }

    /// Midpoint of the middle segment, in box-local coordinates. Labels sit here.
    pub fn label_anchor(&self) -> Option<Point> {
        let points: Vec<Point> = self
            .path
            .elements()
            .iter()
            .filter_map(|el| el.end_point())
            .collect();
        let mid = points.len().checked_sub(1)? / 2;
        let a = points.get(mid)?;
        let b = points.get(mid + 1)?;
        Some(a.midpoint(*b))
    }
}

/// A pin marker on a part, in part-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PinVisual {
    pub name: String,
    pub label: String,
    pub center: Point,
}

/// A part, ready to draw.
#[derive(Debug, Clone)]
pub struct PartVisual {
    pub id: PartId,
    pub kind: String,
    pub title: String,
    pub size: Size,
    /// Maps part-local coordinates into diagram space, rotation included.
    pub transform: Affine,
    pub pins: Vec<PinVisual>,
    /// Preview image reference from the schema, if any.
    pub preview: Option<String>,
}

impl PartVisual {
    pub fn new(editor: &Editor, part: &Part) -> Self {
        let frame = editor.part_frame(part);
        let schema = editor.part_schema(part);
        let pins = schema
            .as_ref()
            .map(|schema| {
                schema
                    .pins
                    .iter()
                    .map(|pin| PinVisual {
                        name: pin.name.clone(),
                        label: pin.display_label().to_string(),
                        center: pin.offset,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: part.id.clone(),
            kind: part.kind.clone(),
            title: schema
                .as_ref()
                .map(|s| s.display_name().to_string())
                .unwrap_or_else(|| part.kind.clone()),
            size: frame.size,
            transform: frame.to_parent(),
            pins,
            preview: schema.as_ref().and_then(|s| s.preview.clone()),
        }
    }

    /// Body rectangle in part-local coordinates.
    pub fn body(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size)
    }
}

/// The pending wire, ready to draw.
#[derive(Debug, Clone)]
pub struct RubberBandVisual {
    pub bounds: Rect,
    /// Straight line relative to `bounds.origin()`.
    pub path: BezPath,
    pub stroke_width: f64,
    pub dashes: [f64; 2],
}

impl RubberBandVisual {
    pub fn new(band: &RubberBand) -> Self {
        let bounds = band.bounds();
        let shift = -bounds.origin().to_vec2();
        let mut path = BezPath::new();
        path.move_to(band.start + shift);
        path.line_to(band.current + shift);
        Self {
            bounds,
            path,
            stroke_width: RUBBER_BAND_STROKE_WIDTH,
            dashes: [6.0, 4.0],
        }
    }

    pub fn to_diagram(&self) -> Affine {
        Affine::translate(self.bounds.origin().to_vec2())
    }
}

/// Everything drawn for one frame, in draw order.
#[derive(Debug, Clone)]
pub struct Projection {
    pub parts: Vec<PartVisual>,
    /// Wires in draw order; the selected wire is last.
    pub wires: Vec<WireVisual>,
    pub rubber_band: Option<RubberBandVisual>,
    /// Size of the surface needed to show the whole diagram.
    pub extent: Size,
}

impl Projection {
    pub fn of(editor: &Editor) -> Self {
        let parts = editor
            .diagram()
            .parts()
            .map(|part| PartVisual::new(editor, part))
            .collect();

        let fallback = resolve_color(&editor.config().default_wire_color, Color::BLACK);
        let selected = editor.selected_wire();
        let mut wires: Vec<WireVisual> = editor
            .resolved_wires()
            .into_iter()
            .filter_map(|(connection, polyline)| {
                let color = resolve_color(editor.wire_color(connection), fallback);
                let is_selected = selected == Some(&connection.id);
                WireVisual::new(connection, &polyline, color, is_selected)
            })
            .collect();
        // Stable: the selected wire moves last, the rest keep draw order.
        wires.sort_by_key(|wire| wire.selected);

        Self {
            parts,
            wires,
            rubber_band: editor.rubber_band().map(RubberBandVisual::new),
            extent: editor.content_extent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{editor, wire_id};
    use wirebench_core::PinRef;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_wire_bounds_and_local_path() {
        let editor = editor();
        let projection = Projection::of(&editor);
        assert_eq!(projection.wires.len(), 1);
        let wire = &projection.wires[0];

        // Endpoints (200,130) and (400,130), waypoint (300,200).
        assert!((wire.bounds.x0 - (200.0 - WIRE_BOX_PADDING)).abs() < EPS);
        assert!((wire.bounds.y0 - (130.0 - WIRE_BOX_PADDING)).abs() < EPS);
        assert!((wire.bounds.x1 - (400.0 + WIRE_BOX_PADDING)).abs() < EPS);
        assert!((wire.bounds.y1 - (200.0 + WIRE_BOX_PADDING)).abs() < EPS);

        assert_eq!(wire.handles.len(), 1);
        let handle = wire.handles[0];
        assert!((handle.x - (100.0 + WIRE_BOX_PADDING)).abs() < EPS);
        assert!((handle.y - (70.0 + WIRE_BOX_PADDING)).abs() < EPS);

        let back = wire.to_diagram() * handle;
        assert!((back.x - 300.0).abs() < EPS && (back.y - 200.0).abs() < EPS);
        assert!((wire.stroke_width - WIRE_STROKE_WIDTH).abs() < EPS);
    }

    #[test]
    fn test_straight_wire_without_waypoints() {
        let connection = Connection::new(
            ConnectionId::from("s"),
            PinRef::new("a", "1"),
            PinRef::new("b", "1"),
            "red",
        );
        let visual = WireVisual::new(
            &connection,
            &[Point::new(0.0, 0.0), Point::new(50.0, 0.0)],
            Color::BLACK,
            false,
        )
        .unwrap();
        assert_eq!(visual.path.elements().len(), 2);
        assert!(visual.handles.is_empty());
        let anchor = visual.label_anchor().unwrap();
        assert!((anchor.x - (25.0 + WIRE_BOX_PADDING)).abs() < EPS);
    }

    #[test]
    fn test_degenerate_polyline_draws_nothing() {
        let connection = Connection::new(
            ConnectionId::from("s"),
            PinRef::new("a", "1"),
            PinRef::new("b", "1"),
            "red",
        );
        assert!(WireVisual::new(&connection, &[Point::ZERO], Color::BLACK, false).is_none());
    }

    #[test]
    fn test_selected_wire_drawn_last_and_thicker() {
        let mut editor = editor();
        // Second wire, drawn after the first.
        let mut other = editor
            .diagram()
            .connection(&wire_id())
            .cloned()
            .unwrap();
        other.id = ConnectionId::from("w2");
        other.waypoints.clear();
        pollster::block_on(editor.apply_remote(wirebench_core::UpdateOp::UpsertConnection {
            connection: other,
        }));

        // Clicking the first wire's body selects it.
        editor.pointer_down(Point::new(250.0, 165.0), wirebench_core::MouseButton::Left);
        editor.pointer_up(Point::new(250.0, 165.0));
        assert_eq!(editor.selected_wire(), Some(&wire_id()));

        let projection = Projection::of(&editor);
        let last = projection.wires.last().unwrap();
        assert_eq!(last.id, wire_id());
        assert!(last.selected);
        assert!((last.stroke_width - SELECTED_WIRE_STROKE_WIDTH).abs() < EPS);
        assert!(!projection.wires[0].selected);
    }

    #[test]
    fn test_part_visuals() {
        let editor = editor();
        let projection = Projection::of(&editor);
        assert_eq!(projection.parts.len(), 2);
        let part = &projection.parts[0];
        assert_eq!(part.title, "Board");
        assert_eq!(part.preview, None);
        assert_eq!(part.pins.len(), 2);
        let right = part.transform * part.pins[1].center;
        assert!((right.x - 200.0).abs() < EPS && (right.y - 130.0).abs() < EPS);
    }

    #[test]
    fn test_rubber_band_visual() {
        let mut editor = editor();
        editor.pointer_down(Point::new(200.0, 130.0), wirebench_core::MouseButton::Left);
        editor.pointer_move(Point::new(260.0, 170.0));
        let projection = Projection::of(&editor);
        let band = projection.rubber_band.unwrap();
        assert!((band.stroke_width - RUBBER_BAND_STROKE_WIDTH).abs() < EPS);
        let start = band.to_diagram() * Point::new(8.0, 8.0);
        assert!((start.x - 200.0).abs() < EPS && (start.y - 130.0).abs() < EPS);
    }
}
