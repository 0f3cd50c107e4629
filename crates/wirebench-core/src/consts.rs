//! Named tuning constants shared by the editor, hit-testing and renderers.

/// Smallest allowed viewport scale.
pub const MIN_SCALE: f64 = 0.25;
/// Largest allowed viewport scale.
pub const MAX_SCALE: f64 = 4.0;
/// Multiplicative factor applied per wheel notch.
pub const ZOOM_FACTOR: f64 = 1.1;
/// Additive step used by the zoom buttons.
pub const ZOOM_STEP: f64 = 0.05;

/// Per-axis distance within which a dragged waypoint snaps to a reference point.
pub const SNAP_THRESHOLD: f64 = 15.0;
/// Maximum distance from a wire segment that still counts as a hit on the wire.
pub const WIRE_HIT_THRESHOLD: f64 = 8.0;
/// Maximum distance for picking the waypoint to remove from a context menu position.
pub const WAYPOINT_PICK_THRESHOLD: f64 = 16.0;

/// Radius of the clickable area around a pin center.
pub const PIN_HIT_RADIUS: f64 = 8.0;
/// Radius of the clickable area around a waypoint handle.
pub const WAYPOINT_HIT_RADIUS: f64 = 8.0;
/// Extra margin around a part body that still counts as a hit.
pub const PART_HIT_PADDING: f64 = 4.0;
/// Margin added around the pins of a part whose schema declares no size.
pub const PART_FALLBACK_MARGIN: f64 = 16.0;

/// Radius of a rendered waypoint handle.
pub const WAYPOINT_RADIUS: f64 = 5.0;
/// Padding around a wire's bounding box (handle diameter plus a small margin).
pub const WIRE_BOX_PADDING: f64 = WAYPOINT_RADIUS * 2.0 + 6.0;
/// Padding around the rubber band drawn while a wire is pending.
pub const RUBBER_BAND_PADDING: f64 = 8.0;
/// Stroke width of an unselected wire.
pub const WIRE_STROKE_WIDTH: f64 = 6.0;
/// Stroke width of the selected wire.
pub const SELECTED_WIRE_STROKE_WIDTH: f64 = 8.0;
/// Stroke width of the rubber band.
pub const RUBBER_BAND_STROKE_WIDTH: f64 = 3.0;
/// Margin added around the diagram content when sizing the drawing surface.
pub const CONTENT_PADDING: f64 = 64.0;
/// Margin added around each pin and waypoint when computing the content extent.
pub const CONTENT_POINT_MARGIN: f64 = 8.0;

/// Color used for wires whose stored color is empty.
pub const DEFAULT_WIRE_COLOR: &str = "black";
/// Label assigned by the "comment" wire action.
pub const DEFAULT_WIRE_LABEL: &str = "Comment";

/// Colors offered for new wires and the recolor action.
pub const PALETTE: [&str; 8] = [
    "#FF6347", "#3CB371", "#1E90FF", "#FFD700", "#BA55D3", "#FF8C00", "#00CED1", "#FF69B4",
];
