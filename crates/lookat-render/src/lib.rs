// ABOUTME: Text rendering of canvases for terminals.
// ABOUTME: Draws each pad as a framed box holding a horizontal bar chart.

mod cells;
pub mod text_surface;

pub use text_surface::TextSurface;
