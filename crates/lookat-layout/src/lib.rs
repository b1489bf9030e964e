// ABOUTME: Canvas and pad management for lookat plots.
// ABOUTME: Arranges pads in a grid that re-flows as pads are added.

mod canvas;
mod grid;
mod manager;
mod surface;

pub use canvas::{Canvas, PadId, PadSlot, PadTexts};
pub use grid::{GridShape, Rect};
pub use manager::{LayoutError, LayoutManager};
pub use surface::{PadFrame, Surface, SurfaceError};
