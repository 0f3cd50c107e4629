//! Wire color strings to paint colors.

use peniko::Color;
use peniko::color::{Srgb, parse_color};

/// Parse a CSS color (`#rgb`, `#rrggbb`, `rgb(..)`, named) into a paint color.
pub fn parse_css_color(value: &str) -> Option<Color> {
    parse_color(value.trim())
        .ok()
        .map(|color| color.to_alpha_color::<Srgb>())
}

/// Parse `value`, falling back to `fallback` and logging when it is unusable.
pub fn resolve_color(value: &str, fallback: Color) -> Color {
    parse_css_color(value).unwrap_or_else(|| {
        log::warn!("Unparseable color {:?}, using fallback", value);
        fallback
    })
}

/// `#rrggbb` or `#rrggbbaa` form for text outputs.
pub fn to_hex(color: Color) -> String {
    let rgba = color.to_rgba8();
    if rgba.a == 255 {
        format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b, rgba.a)
    }
}
