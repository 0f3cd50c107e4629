//! Viewport module for pan/zoom transforms.

use crate::consts::{MAX_SCALE, MIN_SCALE, ZOOM_FACTOR, ZOOM_STEP};
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport manages the view transform for the diagram.
///
/// Screen coordinates are relative to the container's top-left corner.
/// Diagram coordinates are the coordinates parts and waypoints are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawViewport")]
pub struct Viewport {
    /// Current translation (pan) in screen pixels.
    pub translate: Vec2,
    /// Current scale, always within `[MIN_SCALE, MAX_SCALE]`.
    scale: f64,
}

/// Unchecked form read from JSON; the scale is clamped on conversion.
#[derive(Deserialize)]
struct RawViewport {
    translate: Vec2,
    scale: f64,
}

impl From<RawViewport> for Viewport {
    fn from(raw: RawViewport) -> Self {
        let mut viewport = Viewport {
            translate: raw.translate,
            scale: 1.0,
        };
        if raw.scale.is_finite() {
            viewport.set_scale(raw.scale);
        }
        viewport
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport at 100% with no pan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the scale directly, clamped into the allowed range.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Zoom level as a rounded percentage, for display.
    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }

    /// Transform converting diagram coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    /// Convert a container-relative screen point to diagram coordinates.
    pub fn screen_to_diagram(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.translate.x) / self.scale,
            (screen.y - self.translate.y) / self.scale,
        )
    }

    /// Convert a diagram point to container-relative screen coordinates.
    pub fn diagram_to_screen(&self, diagram: Point) -> Point {
        Point::new(
            diagram.x * self.scale + self.translate.x,
            diagram.y * self.scale + self.translate.y,
        )
    }

    /// Pan by a delta in screen pixels.
    pub fn apply_pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Zoom one wheel notch, keeping the diagram point under `screen` fixed.
    ///
    /// A positive `direction` zooms in. Returns `false` without touching the
    /// viewport when the scale is already at the bound in that direction.
    pub fn apply_zoom(&mut self, screen: Point, direction: f64) -> bool {
        let factor = if direction > 0.0 { ZOOM_FACTOR } else { 1.0 / ZOOM_FACTOR };
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if new_scale == self.scale {
            return false;
        }

        let focal = self.screen_to_diagram(screen);
        self.scale = new_scale;
        self.translate = Vec2::new(
            screen.x - focal.x * new_scale,
            screen.y - focal.y * new_scale,
        );
        true
    }

    /// Zoom by the fixed button step, without a focal point.
    ///
    /// Returns `false` when the scale did not change.
    pub fn step_zoom(&mut self, direction: f64) -> bool {
        let step = if direction > 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        let new_scale = (self.scale + step).clamp(MIN_SCALE, MAX_SCALE);
        if new_scale == self.scale {
            return false;
        }
        self.scale = new_scale;
        true
    }

    /// Reset to 100% with no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
