// ABOUTME: Drawing-surface boundary: something that can show a canvas.
// ABOUTME: The layout decides where pads go, the surface decides how they look.

use crate::canvas::{Canvas, PadSlot};
use crate::grid::Rect;

/// Everything needed to render one pad
pub struct PadFrame<'a, P: ?Sized> {
    pub pad: &'a PadSlot,
    /// (row, column) in the canvas grid
    pub position: (usize, usize),
    pub rect: Rect,
    /// Label and payload of the pad's contents, if it shows a live histogram
    pub plot: Option<(&'a str, &'a P)>,
}

/// A surface that can present a canvas with its pads filled in
pub trait Surface<P: ?Sized> {
    fn present(&mut self, canvas: &Canvas, frames: &[PadFrame<'_, P>]) -> Result<(), SurfaceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Failed to write canvas: {0}")]
    Io(#[from] std::io::Error),

    #[error("Surface too small: {width}x{height}")]
    TooSmall { width: usize, height: usize },
}
