//! Tunable editor settings.

use crate::consts::{
    DEFAULT_WIRE_COLOR, DEFAULT_WIRE_LABEL, PALETTE, PART_HIT_PADDING, PIN_HIT_RADIUS,
    SNAP_THRESHOLD, WAYPOINT_HIT_RADIUS, WAYPOINT_PICK_THRESHOLD, WIRE_HIT_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// Editor thresholds and palette.
///
/// Every field has a default, so a config file only needs the overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub snap_threshold: f64,
    pub wire_hit_threshold: f64,
    pub waypoint_pick_threshold: f64,
    pub pin_hit_radius: f64,
    pub waypoint_hit_radius: f64,
    pub part_hit_padding: f64,
    /// Colors offered for new wires. Must not be empty.
    pub palette: Vec<String>,
    /// Stroke color for wires stored without one.
    pub default_wire_color: String,
    pub default_wire_label: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: SNAP_THRESHOLD,
            wire_hit_threshold: WIRE_HIT_THRESHOLD,
            waypoint_pick_threshold: WAYPOINT_PICK_THRESHOLD,
            pin_hit_radius: PIN_HIT_RADIUS,
            waypoint_hit_radius: WAYPOINT_HIT_RADIUS,
            part_hit_padding: PART_HIT_PADDING,
            palette: PALETTE.iter().map(|c| c.to_string()).collect(),
            default_wire_color: DEFAULT_WIRE_COLOR.to_string(),
            default_wire_label: DEFAULT_WIRE_LABEL.to_string(),
        }
    }
}

impl EditorConfig {
    /// Load overrides from JSON. An empty palette falls back to the default one.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        if config.palette.is_empty() {
            log::warn!("Empty palette in editor config, using the default");
            config.palette = Self::default().palette;
        }
        Ok(config)
    }

    /// Palette color at `index`, wrapping around.
    pub fn palette_color(&self, index: usize) -> &str {
        match self.palette.len() {
            0 => &self.default_wire_color,
            n => &self.palette[index % n],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert!((config.snap_threshold - 15.0).abs() < f64::EPSILON);
        assert_eq!(config.palette.len(), 8);
        assert_eq!(config.palette_color(8), config.palette_color(0));
    }

    #[test]
    fn test_partial_override() {
        let config = EditorConfig::from_json(r#"{"snap_threshold": 4, "palette": []}"#).unwrap();
        assert!((config.snap_threshold - 4.0).abs() < f64::EPSILON);
        assert!((config.wire_hit_threshold - WIRE_HIT_THRESHOLD).abs() < f64::EPSILON);
        assert_eq!(config.palette.len(), 8);
    }

    #[test]
    fn test_malformed_config() {
        assert!(EditorConfig::from_json("{\"snap_threshold\": \"x\"}").is_err());
    }
}
