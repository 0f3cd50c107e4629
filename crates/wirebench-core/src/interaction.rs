//! Pointer interaction state machine.

use crate::consts::RUBBER_BAND_PADDING;
use crate::geometry::padded_bounds;
use crate::model::{ConnectionId, PartId, PinRef};
use kurbo::{Point, Rect, Vec2};

/// The straight line shown while a wire is being drawn from a pin.
#[derive(Debug, Clone, PartialEq)]
pub struct RubberBand {
    /// Pin the wire starts from.
    pub from: PinRef,
    /// Start pin position in diagram coordinates.
    pub start: Point,
    /// Current pointer position in diagram coordinates.
    pub current: Point,
}

impl RubberBand {
    pub fn new(from: PinRef, start: Point) -> Self {
        Self {
            from,
            start,
            current: start,
        }
    }

    /// Box enclosing both ends, padded for the stroke.
    pub fn bounds(&self) -> Rect {
        padded_bounds([self.start, self.current], RUBBER_BAND_PADDING)
            .unwrap_or_else(|| Rect::from_points(self.start, self.current))
    }
}

/// Current pointer interaction. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging the empty canvas; `last` is the previous container position.
    Panning { last: Point },
    /// Dragging a part body; `offset` is the grab point relative to its top-left.
    DraggingPart { part: PartId, offset: Vec2 },
    /// Dragging a waypoint handle; `offset` is the grab point relative to the waypoint.
    DraggingWaypoint {
        connection: ConnectionId,
        index: usize,
        offset: Vec2,
    },
    DrawingWire(RubberBand),
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    /// The pending wire, if one is being drawn.
    pub fn rubber_band(&self) -> Option<&RubberBand> {
        match self {
            InteractionState::DrawingWire(band) => Some(band),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Panning { .. } => "panning",
            InteractionState::DraggingPart { .. } => "dragging-part",
            InteractionState::DraggingWaypoint { .. } => "dragging-waypoint",
            InteractionState::DrawingWire(_) => "drawing-wire",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubber_band_bounds() {
        let mut band = RubberBand::new(PinRef::new("a", "1"), Point::new(50.0, 50.0));
        band.current = Point::new(10.0, 80.0);
        let bounds = band.bounds();
        assert!((bounds.x0 - 2.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 42.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 58.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 88.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_state_queries() {
        assert!(InteractionState::default().is_idle());
        let drawing = InteractionState::DrawingWire(RubberBand::new(PinRef::new("a", "1"), Point::ZERO));
        assert!(drawing.rubber_band().is_some());
        assert_eq!(drawing.name(), "drawing-wire");
        assert!(InteractionState::Panning { last: Point::ZERO }.rubber_band().is_none());
    }
}
