//! Snap functionality for aligning waypoints to nearby reference points.

use kurbo::Point;

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap each axis of `point` independently to the closest reference coordinate.
///
/// An axis snaps when some reference lies within `threshold` (inclusive) on
/// that axis alone; the other axis of the reference is ignored. The closest
/// reference wins and the first one wins ties. With no references, or a
/// negative threshold, the point is returned unchanged.
pub fn snap_to_references<I>(point: Point, references: I, threshold: f64) -> SnapResult
where
    I: IntoIterator<Item = Point>,
{
    let mut best_x: Option<(f64, f64)> = None;
    let mut best_y: Option<(f64, f64)> = None;

    for reference in references {
        let dx = (point.x - reference.x).abs();
        if dx <= threshold && best_x.is_none_or(|(d, _)| dx < d) {
            best_x = Some((dx, reference.x));
        }
        let dy = (point.y - reference.y).abs();
        if dy <= threshold && best_y.is_none_or(|(d, _)| dy < d) {
            best_y = Some((dy, reference.y));
        }
    }

    SnapResult {
        point: Point::new(
            best_x.map_or(point.x, |(_, x)| x),
            best_y.map_or(point.y, |(_, y)| y),
        ),
        snapped_x: best_x.is_some(),
        snapped_y: best_y.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SNAP_THRESHOLD;

    #[test]
    fn test_snap_both_axes() {
        let result = snap_to_references(
            Point::new(108.0, 50.0),
            [Point::new(100.0, 50.0)],
            SNAP_THRESHOLD,
        );
        assert_eq!(result.point, Point::new(100.0, 50.0));
        assert!(result.snapped_x && result.snapped_y);
    }

    #[test]
    fn test_snap_single_axis() {
        let result = snap_to_references(
            Point::new(108.0, 300.0),
            [Point::new(100.0, 50.0)],
            SNAP_THRESHOLD,
        );
        assert!((result.point.x - 100.0).abs() < f64::EPSILON);
        assert!((result.point.y - 300.0).abs() < f64::EPSILON);
        assert!(result.snapped_x);
        assert!(!result.snapped_y);
    }

    #[test]
    fn test_snap_threshold_is_inclusive() {
        let result = snap_to_references(Point::new(115.0, 0.0), [Point::new(100.0, 200.0)], 15.0);
        assert!(result.snapped_x);
        let result = snap_to_references(Point::new(115.1, 0.0), [Point::new(100.0, 200.0)], 15.0);
        assert!(!result.is_snapped());
    }

    #[test]
    fn test_snap_prefers_closest_reference() {
        let result = snap_to_references(
            Point::new(100.0, 100.0),
            [Point::new(90.0, 500.0), Point::new(104.0, 500.0)],
            SNAP_THRESHOLD,
        );
        assert!((result.point.x - 104.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snap_without_references() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(snap_to_references(p, [], SNAP_THRESHOLD), SnapResult::none(p));
    }
}
