//! Wirebench Render Library
//!
//! Projects a [`wirebench_core::Editor`] into drawable visuals and renders
//! them. The SVG renderer is always available; the Vello renderer sits behind
//! the `vello-renderer` feature.

pub mod color;
pub mod projection;
mod renderer;
pub mod svg;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

#[cfg(test)]
mod test_support;

pub use projection::{PartVisual, PinVisual, Projection, RubberBandVisual, WireVisual};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use svg::{SvgRenderer, export_svg};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
