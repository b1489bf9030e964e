// ABOUTME: Tracks every canvas of the session and which one is current.
// ABOUTME: Decides whether a draw reuses, extends or replaces the current figure.

use lookat_core::{GridFlow, Handle};

use crate::canvas::{Canvas, PadId, PadTexts};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("No canvas {0}")]
    NoSuchCanvas(Handle),

    #[error("No canvas named '{0}'")]
    NoSuchCanvasName(String),

    #[error("Canvas {canvas} has no pad {index}")]
    NoSuchPad { canvas: Handle, index: usize },
}

/// Canvases in creation order plus the current one.
///
/// Handles for new canvases come from the caller so canvases share the
/// session's handle sequence with trees and histograms.
#[derive(Debug, Clone)]
pub struct LayoutManager {
    flow: GridFlow,
    canvases: Vec<Canvas>,
    current: Option<Handle>,
}

impl LayoutManager {
    pub fn new(flow: GridFlow) -> Self {
        Self {
            flow,
            canvases: Vec::new(),
            current: None,
        }
    }

    pub fn flow(&self) -> GridFlow {
        self.flow
    }

    pub fn canvases(&self) -> &[Canvas] {
        &self.canvases
    }

    pub fn canvas(&self, handle: Handle) -> Option<&Canvas> {
        self.canvases.iter().find(|c| c.handle() == handle)
    }

    /// Latest canvas with the given name
    pub fn canvas_by_name(&self, name: &str) -> Option<&Canvas> {
        self.canvases.iter().rev().find(|c| c.name() == name)
    }

    pub fn current_handle(&self) -> Option<Handle> {
        self.current
    }

    pub fn current(&self) -> Option<&Canvas> {
        self.current.and_then(|h| self.canvas(h))
    }

    pub fn current_pad(&self) -> Option<PadId> {
        self.current().map(Canvas::current_pad)
    }

    /// The current canvas, created with a single pad if there is none
    pub fn current_canvas(&mut self, allocate: impl FnOnce() -> Handle) -> &Canvas {
        if let Some(index) = self.current.and_then(|h| self.index_of(h)) {
            return &self.canvases[index];
        }
        self.open_canvas(allocate(), None);
        &self.canvases[self.canvases.len() - 1]
    }

    /// Start a new canvas and make it current. Unnamed canvases are called
    /// `c1`, `c2`, ... in creation order.
    pub fn new_canvas(&mut self, handle: Handle, name: Option<&str>) -> &Canvas {
        self.open_canvas(handle, name);
        &self.canvases[self.canvases.len() - 1]
    }

    /// A pad to draw the next object into.
    ///
    /// With `on_current`, the current canvas gets a new pad and its grid
    /// re-flows. An empty newest pad is handed out again instead of growing
    /// the grid, so a freshly created canvas is filled before it is extended.
    /// Without `on_current`, or when there is no canvas yet, a new canvas
    /// with a single pad becomes current.
    pub fn new_pad(&mut self, on_current: bool, allocate: impl FnOnce() -> Handle) -> PadId {
        let current = if on_current {
            self.current.and_then(|h| self.index_of(h))
        } else {
            None
        };

        match current {
            Some(index) => {
                let canvas = &mut self.canvases[index];
                if canvas.newest_pad().is_empty() {
                    canvas.newest_pad().id()
                } else {
                    canvas.add_pad()
                }
            }
            None => {
                let handle = self.open_canvas(allocate(), None);
                PadId {
                    canvas: handle,
                    index: 0,
                }
            }
        }
    }

    /// Record `object` as the contents of `pad` and make pad and canvas
    /// current. Returns the handle previously shown there.
    pub fn draw_into(&mut self, pad: PadId, object: Handle) -> Result<Option<Handle>, LayoutError> {
        let index = self
            .index_of(pad.canvas)
            .ok_or(LayoutError::NoSuchCanvas(pad.canvas))?;
        let previous = self.canvases[index]
            .draw_into(pad.index, object)
            .ok_or(LayoutError::NoSuchPad {
                canvas: pad.canvas,
                index: pad.index,
            })?;
        self.current = Some(pad.canvas);
        Ok(previous)
    }

    pub fn texts_mut(&mut self, pad: PadId) -> Result<&mut PadTexts, LayoutError> {
        let index = self
            .index_of(pad.canvas)
            .ok_or(LayoutError::NoSuchCanvas(pad.canvas))?;
        self.canvases[index]
            .texts_mut(pad.index)
            .ok_or(LayoutError::NoSuchPad {
                canvas: pad.canvas,
                index: pad.index,
            })
    }

    pub fn make_current(&mut self, handle: Handle) -> Result<&Canvas, LayoutError> {
        let index = self
            .index_of(handle)
            .ok_or(LayoutError::NoSuchCanvas(handle))?;
        self.current = Some(handle);
        Ok(&self.canvases[index])
    }

    /// Make the latest canvas called `name` current
    pub fn select(&mut self, name: &str) -> Result<&Canvas, LayoutError> {
        let handle = self
            .canvas_by_name(name)
            .map(Canvas::handle)
            .ok_or_else(|| LayoutError::NoSuchCanvasName(name.to_string()))?;
        self.make_current(handle)
    }

    /// Latest canvas that shows `object`
    pub fn canvas_showing(&self, object: Handle) -> Option<&Canvas> {
        self.canvases.iter().rev().find(|c| c.shows(object))
    }

    fn index_of(&self, handle: Handle) -> Option<usize> {
        self.canvases.iter().position(|c| c.handle() == handle)
    }

    fn open_canvas(&mut self, handle: Handle, name: Option<&str>) -> Handle {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("c{}", self.canvases.len() + 1),
        };
        self.canvases.push(Canvas::new(handle, name, self.flow));
        self.current = Some(handle);
        handle
    }
}

impl Default for LayoutManager {
    fn default() -> Self {
        Self::new(GridFlow::default())
    }
}
