//! Hit-testing and spatial queries over parts and wire polylines.

use crate::geometry::{Frame, distance_squared, nearest_segment};
use crate::model::{ConnectionId, PartId, PinRef};
use kurbo::{Point, Rect};

/// What lies under a point, in hit priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    /// A waypoint handle of a wire.
    Waypoint { connection: ConnectionId, index: usize },
    Pin(PinRef),
    /// A part body.
    Part(PartId),
    /// A wire segment.
    Wire(ConnectionId),
    Canvas,
}

/// Find the wire whose polyline passes closest to `point`.
///
/// Returns the key of the global minimum when it lies within `threshold`.
/// Ties go to the first wire in iteration order. Polylines with fewer than
/// two points never match.
pub fn nearest_wire<K, P, I>(point: Point, wires: I, threshold: f64) -> Option<K>
where
    I: IntoIterator<Item = (K, P)>,
    P: AsRef<[Point]>,
{
    let limit = threshold * threshold;
    wires
        .into_iter()
        .filter_map(|(key, polyline)| {
            nearest_segment(point, polyline.as_ref()).map(|(_, d)| (key, d))
        })
        .filter(|(_, d)| *d <= limit)
        .fold(None, |best: Option<(K, f64)>, (key, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((key, d)),
        })
        .map(|(key, _)| key)
}

/// Index of the waypoint closest to `point` within `threshold`.
pub fn nearest_waypoint(waypoints: &[Point], point: Point, threshold: f64) -> Option<usize> {
    let limit = threshold * threshold;
    waypoints
        .iter()
        .enumerate()
        .map(|(i, wp)| (i, distance_squared(*wp, point)))
        .filter(|(_, d)| *d <= limit)
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

/// Waypoint index at which a point clicked near `polyline` should be inserted.
///
/// The polyline is `from, wp0, .., wpn, to`; clicking segment `i` inserts at
/// waypoint index `i`, between its two ends.
pub fn insertion_index(polyline: &[Point], point: Point) -> Option<usize> {
    nearest_segment(point, polyline).map(|(i, _)| i)
}

/// Whether `point` falls inside a (possibly rotated) frame grown by `padding`.
pub fn frame_contains(frame: &Frame, point: Point, padding: f64) -> bool {
    let local = frame.to_local() * point;
    Rect::from_origin_size(Point::ZERO, frame.size)
        .inflate(padding, padding)
        .contains(local)
}

/// Whether `point` lies within `radius` of `center`.
pub fn within_radius(center: Point, point: Point, radius: f64) -> bool {
    distance_squared(center, point) <= radius * radius
}
