// ABOUTME: Grid geometry for the pads of one canvas.
// ABOUTME: Computes the grid shape for k pads and each pad's row-major cell.

use std::fmt;

use lookat_core::GridFlow;

/// Rectangle in normalized coordinates (0.0 to 1.0), origin top left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Rows x columns of a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub columns: usize,
}

impl GridShape {
    /// Shape holding `pads` pads under the given flow policy.
    ///
    /// `Square` gives `ceil(sqrt(k))` columns and `ceil(k / columns)` rows:
    /// 1x1, 1x2, 2x2, 2x2, 2x3, 2x3, 3x3 ...
    pub fn for_pads(pads: usize, flow: GridFlow) -> Self {
        let pads = pads.max(1);
        match flow {
            GridFlow::Square => {
                let columns = ceil_sqrt(pads);
                Self {
                    rows: pads.div_ceil(columns),
                    columns,
                }
            }
            GridFlow::Row => Self {
                rows: 1,
                columns: pads,
            },
            GridFlow::Column => Self {
                rows: pads,
                columns: 1,
            },
        }
    }

    pub fn cells(&self) -> usize {
        self.rows * self.columns
    }

    /// (row, column) of the pad with the given row-major index
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }

    /// Area of the pad with the given row-major index
    pub fn rect(&self, index: usize) -> Rect {
        let (row, column) = self.position(index);
        let width = 1.0 / self.columns as f32;
        let height = 1.0 / self.rows as f32;
        Rect {
            x: column as f32 * width,
            y: row as f32 * height,
            width,
            height,
        }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    // Float rounding can land one off either way
    while root * root < n {
        root += 1;
    }
    while root > 1 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root.max(1)
}
