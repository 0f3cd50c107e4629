//! Geometry helpers: segment distances, bounding boxes and frame transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Squared Euclidean distance between two points.
pub fn distance_squared(a: Point, b: Point) -> f64 {
    (b - a).hypot2()
}

/// Squared distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to the segment, so points beyond an
/// end measure against that end. A degenerate segment (`a == b`) falls back
/// to the point distance.
pub fn point_to_segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq == 0.0 {
        return distance_squared(p, a);
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    let closest = a + seg * t;
    distance_squared(p, closest)
}

/// Find the segment of a polyline closest to `point`.
///
/// Returns the index of the segment start together with the squared
/// distance. The first segment wins ties. Polylines with fewer than two
/// points have no segments.
pub fn nearest_segment(point: Point, polyline: &[Point]) -> Option<(usize, f64)> {
    polyline
        .windows(2)
        .enumerate()
        .map(|(i, seg)| (i, point_to_segment_distance_squared(point, seg[0], seg[1])))
        .fold(None, |best, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
}

/// Tight bounding box of a set of points, or `None` for an empty set.
pub fn bounding_box<I>(points: I) -> Option<Rect>
where
    I: IntoIterator<Item = Point>,
{
    points.into_iter().fold(None, |acc, p| {
        Some(match acc {
            Some(r) => r.union_pt(p),
            None => Rect::from_points(p, p),
        })
    })
}

/// Bounding box of a set of points grown by `padding` on every side.
///
/// Width and height never drop below one unit.
pub fn padded_bounds<I>(points: I, padding: f64) -> Option<Rect>
where
    I: IntoIterator<Item = Point>,
{
    let rect = bounding_box(points)?.inflate(padding, padding);
    Some(Rect::new(
        rect.x0,
        rect.y0,
        rect.x0 + rect.width().max(1.0),
        rect.y0 + rect.height().max(1.0),
    ))
}

/// Rotate `point` by `degrees` (clockwise in screen space) about `origin`.
pub fn rotate_about(point: Point, origin: Point, degrees: f64) -> Point {
    if degrees == 0.0 {
        return point;
    }
    Affine::rotate_about(degrees.to_radians(), origin) * point
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let r = degrees % 360.0;
    if r < 0.0 { r + 360.0 } else { r }
}

/// A positioned, optionally rotated box that contains child coordinates.
///
/// Child coordinates are relative to the frame's top-left corner. Rotation is
/// applied about `origin`, which defaults to the frame's geometric center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Top-left corner in the parent's coordinate space.
    pub offset: Vec2,
    /// Frame size, used to locate the default rotation origin.
    pub size: Size,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Explicit transform origin in frame-local coordinates.
    pub origin: Option<Point>,
}

impl Frame {
    /// Create an unrotated frame.
    pub fn new(offset: Vec2, size: Size) -> Self {
        Self {
            offset,
            size,
            rotation: 0.0,
            origin: None,
        }
    }

    /// Set the rotation in degrees.
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set an explicit transform origin.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Transform origin in frame-local coordinates.
    pub fn transform_origin(&self) -> Point {
        self.origin
            .unwrap_or_else(|| Point::new(self.size.width / 2.0, self.size.height / 2.0))
    }

    /// Affine mapping frame-local coordinates into the parent space.
    pub fn to_parent(&self) -> Affine {
        let local = if self.rotation == 0.0 {
            Affine::IDENTITY
        } else {
            Affine::rotate_about(self.rotation.to_radians(), self.transform_origin())
        };
        Affine::translate(self.offset) * local
    }

    /// Affine mapping parent coordinates into frame-local space.
    pub fn to_local(&self) -> Affine {
        self.to_parent().inverse()
    }
}

/// Resolve a local point through a chain of frames to root coordinates.
///
/// `chain[0]` is the innermost frame (the one `local` is expressed in); each
/// subsequent frame contains the previous one.
pub fn absolute_position(local: Point, chain: &[Frame]) -> Point {
    chain.iter().fold(local, |p, frame| frame.to_parent() * p)
}
