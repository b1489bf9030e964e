// ABOUTME: Surface that prints canvases as text to any writer.
// ABOUTME: Pads become framed boxes; histogram bins become horizontal bars.

use std::io::Write;

use lookat_core::Plottable;
use lookat_layout::{Canvas, PadFrame, Surface, SurfaceError};

use crate::cells::CellGrid;

/// Smallest pad box that can still show a bar
const MIN_PAD_WIDTH: usize = 16;
const MIN_PAD_HEIGHT: usize = 4;

/// Width of the bin-edge column left of the bars
const EDGE_LABEL_WIDTH: usize = 8;

pub struct TextSurface<W: Write> {
    out: W,
    width: usize,
    height: usize,
}

impl<W: Write> TextSurface<W> {
    /// Surface of `width` x `height` characters
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self { out, width, height }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write, P: Plottable + ?Sized> Surface<P> for TextSurface<W> {
    fn present(&mut self, canvas: &Canvas, frames: &[PadFrame<'_, P>]) -> Result<(), SurfaceError> {
        if self.width < MIN_PAD_WIDTH || self.height < MIN_PAD_HEIGHT {
            return Err(SurfaceError::TooSmall {
                width: self.width,
                height: self.height,
            });
        }

        // Pads never shrink below the minimum box; the grid cells that no
        // longer fit are listed below the canvas instead
        let grid = canvas.grid();
        let pad_width = (self.width / grid.columns).max(MIN_PAD_WIDTH);
        let pad_height = (self.height / grid.rows).max(MIN_PAD_HEIGHT);
        let visible_columns = (self.width / pad_width).min(grid.columns);
        let visible_rows = (self.height / pad_height).min(grid.rows);

        let mut cells = CellGrid::new(pad_width * visible_columns, pad_height * visible_rows);
        let current = canvas.current_pad();
        let mut hidden = Vec::new();
        for frame in frames {
            let (row, column) = frame.position;
            if row >= visible_rows || column >= visible_columns {
                hidden.push(frame);
                continue;
            }
            let origin = (row * pad_height, column * pad_width);
            let focused = frame.pad.id() == current && frames.len() > 1;
            paint_pad(&mut cells, origin, (pad_width, pad_height), frame, focused);
        }

        writeln!(self.out, "{} [{}]", canvas.name(), grid)?;
        for line in cells.lines() {
            writeln!(self.out, "{line}")?;
        }
        if !hidden.is_empty() {
            writeln!(self.out, "{} more pads not shown:", hidden.len())?;
            for frame in hidden.iter().copied() {
                writeln!(self.out, "  {}", summary_line(frame))?;
            }
        }
        self.out.flush()?;

        tracing::trace!(
            canvas = canvas.name(),
            pads = frames.len(),
            hidden = hidden.len(),
            "Presented canvas"
        );
        Ok(())
    }
}

/// One-line stand-in for a pad that did not fit on the surface
fn summary_line<P: Plottable + ?Sized>(frame: &PadFrame<'_, P>) -> String {
    let number = frame.pad.index() + 1;
    match (frame.plot, frame.pad.contents()) {
        (Some((label, plot)), _) => format!(
            "{number} {label}: {} bins, {} entries",
            plot.bin_content().len(),
            format_number(plot.entries())
        ),
        (None, Some(handle)) => format!("{number} ({handle} not available)"),
        (None, None) => format!("{number} (empty)"),
    }
}

fn paint_pad<P: Plottable + ?Sized>(
    cells: &mut CellGrid,
    (top, left): (usize, usize),
    (width, height): (usize, usize),
    frame: &PadFrame<'_, P>,
    focused: bool,
) {
    cells.frame(top, left, width, height, focused);

    let inner_width = width - 2;
    let texts = frame.pad.texts();
    let heading = match (&frame.plot, texts.title.is_empty()) {
        (_, false) => texts.title.clone(),
        (Some((label, _)), true) => label.to_string(),
        (None, true) => String::new(),
    };
    let heading = if texts.legend.is_empty() {
        format!(" {} {} ", frame.pad.index() + 1, heading)
    } else {
        format!(" {} {} [{}] ", frame.pad.index() + 1, heading, texts.legend)
    };
    cells.put_str(top, left + 1, &heading, inner_width);

    let body_top = top + 1;
    let body_rows = height - 2;

    let Some((_, plot)) = frame.plot else {
        let message = match frame.pad.contents() {
            Some(handle) => format!("({handle} not available)"),
            None => "(empty)".to_string(),
        };
        let row = body_top + body_rows / 2;
        let col = left + 1 + inner_width.saturating_sub(message.len()) / 2;
        cells.put_str(row, col, &message, inner_width);
        return;
    };

    // Last body row carries the axis labels when there is room for bars too
    let axis_row = (body_rows >= 2 && !(texts.xlabel.is_empty() && texts.ylabel.is_empty()))
        .then(|| body_top + body_rows - 1);
    let bar_rows = body_rows - usize::from(axis_row.is_some());

    let bar_col = left + 1 + EDGE_LABEL_WIDTH + 2;
    let bar_width = (left + width - 1).saturating_sub(bar_col + 1);
    let groups = group_bins(plot.bin_edges(), plot.bin_content(), bar_rows);
    let peak = groups.iter().map(|g| g.value).fold(0.0_f64, f64::max);
    let value_width = groups
        .iter()
        .map(|g| format_number(g.value).len())
        .max()
        .unwrap_or(0);
    let bar_space = bar_width.saturating_sub(value_width + 1);

    for (i, group) in groups.iter().enumerate() {
        let row = body_top + i;
        let edge = format!("{:>w$}", format_number(group.low), w = EDGE_LABEL_WIDTH);
        cells.put_str(row, left + 1, &edge, EDGE_LABEL_WIDTH);
        cells.put(row, bar_col - 1, '|');

        let length = if peak > 0.0 && group.value > 0.0 {
            ((group.value / peak) * bar_space as f64).round() as usize
        } else {
            0
        };
        cells.put_str(row, bar_col, &"#".repeat(length), bar_space);
        let value = format_number(group.value);
        cells.put_str(row, bar_col + length + 1, &value, value_width);
    }

    if let Some(row) = axis_row {
        let axes = match (texts.xlabel.is_empty(), texts.ylabel.is_empty()) {
            (false, false) => format!("x: {}  y: {}", texts.xlabel, texts.ylabel),
            (false, true) => format!("x: {}", texts.xlabel),
            _ => format!("y: {}", texts.ylabel),
        };
        cells.put_str(row, left + 1, &axes, inner_width);
    }
}

/// Consecutive bins shown on one bar row
#[derive(Debug, Clone, PartialEq)]
struct BinGroup {
    /// Lower edge of the first bin
    low: f64,
    /// Mean content of the bins in the group
    value: f64,
}

fn group_bins(edges: &[f64], content: &[f64], rows: usize) -> Vec<BinGroup> {
    if content.is_empty() || rows == 0 {
        return Vec::new();
    }
    let per_row = content.len().div_ceil(rows);
    content
        .chunks(per_row)
        .enumerate()
        .map(|(i, chunk)| BinGroup {
            low: edges.get(i * per_row).copied().unwrap_or(f64::NAN),
            value: chunk.iter().sum::<f64>() / chunk.len() as f64,
        })
        .collect()
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{v:.0}")
    } else if v.abs() >= 1e4 || (v != 0.0 && v.abs() < 1e-2) {
        format!("{v:.2e}")
    } else {
        format!("{v:.2}")
    }
}
