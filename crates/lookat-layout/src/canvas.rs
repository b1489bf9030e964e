// ABOUTME: A canvas and the pads drawn on it.
// ABOUTME: Pads keep their insertion index; their cell is derived from the current grid.

use std::fmt;

use lookat_core::{GridFlow, Handle};

use crate::grid::{GridShape, Rect};

/// Identifies one pad: the owning canvas and the pad's row-major index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadId {
    pub canvas: Handle,
    pub index: usize,
}

impl fmt::Display for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.canvas, self.index + 1)
    }
}

/// Decorations shown around a pad's plot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PadTexts {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    /// Legend entry for the plot on the pad
    pub legend: String,
}

/// One pane of a canvas
#[derive(Debug, Clone)]
pub struct PadSlot {
    id: PadId,
    contents: Option<Handle>,
    texts: PadTexts,
}

impl PadSlot {
    fn new(id: PadId) -> Self {
        Self {
            id,
            contents: None,
            texts: PadTexts::default(),
        }
    }

    pub fn id(&self) -> PadId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.id.index
    }

    pub fn owning_canvas(&self) -> Handle {
        self.id.canvas
    }

    /// The object last drawn here. Does not keep the object alive.
    pub fn contents(&self) -> Option<Handle> {
        self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }

    pub fn texts(&self) -> &PadTexts {
        &self.texts
    }
}

/// A drawing surface owning a grid of pads
#[derive(Debug, Clone)]
pub struct Canvas {
    handle: Handle,
    name: String,
    flow: GridFlow,
    pads: Vec<PadSlot>,
    current_pad: usize,
}

impl Canvas {
    /// A canvas with a single empty pad
    pub fn new(handle: Handle, name: impl Into<String>, flow: GridFlow) -> Self {
        Self {
            handle,
            name: name.into(),
            flow,
            pads: vec![PadSlot::new(PadId { canvas: handle, index: 0 })],
            current_pad: 0,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pads(&self) -> &[PadSlot] {
        &self.pads
    }

    pub fn pad(&self, index: usize) -> Option<&PadSlot> {
        self.pads.get(index)
    }

    pub fn newest_pad(&self) -> &PadSlot {
        // A canvas is never without pads
        &self.pads[self.pads.len() - 1]
    }

    pub fn current_pad(&self) -> PadId {
        self.pads[self.current_pad].id
    }

    /// Grid for the pads added so far
    pub fn grid(&self) -> GridShape {
        GridShape::for_pads(self.pads.len(), self.flow)
    }

    pub fn position(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.pads.len()).then(|| self.grid().position(index))
    }

    pub fn rect(&self, index: usize) -> Option<Rect> {
        (index < self.pads.len()).then(|| self.grid().rect(index))
    }

    /// Contents of the current pad, i.e. what was drawn last
    pub fn latest_contents(&self) -> Option<Handle> {
        self.pads[self.current_pad].contents
    }

    /// Whether any pad currently shows `object`
    pub fn shows(&self, object: Handle) -> bool {
        self.pads.iter().any(|pad| pad.contents == Some(object))
    }

    /// Append a pad; the grid re-flows, existing pads keep their index
    pub(crate) fn add_pad(&mut self) -> PadId {
        let id = PadId {
            canvas: self.handle,
            index: self.pads.len(),
        };
        self.pads.push(PadSlot::new(id));
        id
    }

    /// Record `object` in a pad and make that pad current.
    /// Returns what the pad showed before.
    pub(crate) fn draw_into(&mut self, index: usize, object: Handle) -> Option<Option<Handle>> {
        let pad = self.pads.get_mut(index)?;
        let previous = pad.contents.replace(object);
        self.current_pad = index;
        Some(previous)
    }

    pub(crate) fn texts_mut(&mut self, index: usize) -> Option<&mut PadTexts> {
        self.pads.get_mut(index).map(|pad| &mut pad.texts)
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' [{}:", self.handle, self.name, self.grid())?;
        for pad in &self.pads {
            match pad.contents {
                Some(handle) => write!(f, " {handle}")?,
                None => write!(f, " -")?,
            }
        }
        write!(f, "]")
    }
}
