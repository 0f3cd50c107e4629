//! Pointer events delivered to the editor.
//!
//! Positions are raw client coordinates; the editor subtracts the container
//! origin before doing anything else with them.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a DOM-style button index (0 primary, 1 auxiliary, 2 secondary).
    pub fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        }
    }

    /// Whether this is the button that starts drags.
    pub fn is_primary(self) -> bool {
        self == MouseButton::Left
    }
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
    },
    Up {
        position: Point,
    },
    Move {
        position: Point,
    },
    /// Wheel scroll. Negative `delta.y` scrolls up, which zooms in.
    Wheel {
        position: Point,
        delta: Vec2,
    },
    /// Secondary click requesting a context menu.
    ContextMenu {
        position: Point,
    },
}

impl PointerEvent {
    /// Client position carried by the event.
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position }
            | PointerEvent::Move { position }
            | PointerEvent::Wheel { position, .. }
            | PointerEvent::ContextMenu { position } => position,
        }
    }
}

/// Zoom direction for a wheel delta: `1.0` in, `-1.0` out, `0.0` for none.
pub fn wheel_zoom_direction(delta: Vec2) -> f64 {
    if delta.y < 0.0 {
        1.0
    } else if delta.y > 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_from_index() {
        assert_eq!(MouseButton::from_index(0), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_index(2), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_index(7), None);
        assert!(MouseButton::Left.is_primary());
        assert!(!MouseButton::Middle.is_primary());
    }

    #[test]
    fn test_event_position() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(PointerEvent::Up { position: p }.position(), p);
        assert_eq!(
            PointerEvent::Wheel {
                position: p,
                delta: Vec2::new(0.0, 1.0)
            }
            .position(),
            p
        );
    }

    #[test]
    fn test_wheel_direction() {
        assert!((wheel_zoom_direction(Vec2::new(0.0, -120.0)) - 1.0).abs() < f64::EPSILON);
        assert!((wheel_zoom_direction(Vec2::new(0.0, 53.0)) + 1.0).abs() < f64::EPSILON);
        assert!(wheel_zoom_direction(Vec2::new(4.0, 0.0)).abs() < f64::EPSILON);
    }
}
