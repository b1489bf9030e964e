// ABOUTME: Fixed-size character grid that pads are painted into.
// ABOUTME: Writes outside the grid are clipped.

pub(crate) struct CellGrid {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl CellGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; width * height],
        }
    }

    pub fn put(&mut self, row: usize, col: usize, c: char) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = c;
        }
    }

    /// Write `text` starting at (row, col), at most `max` characters
    pub fn put_str(&mut self, row: usize, col: usize, text: &str, max: usize) {
        for (i, c) in text.chars().take(max).enumerate() {
            self.put(row, col + i, c);
        }
    }

    /// Box outline; `focused` boxes use a heavier border
    pub fn frame(&mut self, row: usize, col: usize, width: usize, height: usize, focused: bool) {
        if width < 2 || height < 2 {
            return;
        }
        let (horizontal, vertical) = if focused { ('=', '#') } else { ('-', '|') };
        let (bottom, right) = (row + height - 1, col + width - 1);
        for c in col + 1..right {
            self.put(row, c, horizontal);
            self.put(bottom, c, horizontal);
        }
        for r in row + 1..bottom {
            self.put(r, col, vertical);
            self.put(r, right, vertical);
        }
        for (r, c) in [(row, col), (row, right), (bottom, col), (bottom, right)] {
            self.put(r, c, '+');
        }
    }

    /// Rows as strings with trailing blanks removed
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_and_text() {
        let mut grid = CellGrid::new(6, 3);
        grid.frame(0, 0, 6, 3, false);
        grid.put_str(1, 1, "abcdef", 4);
        let lines: Vec<String> = grid.lines().collect();
        assert_eq!(lines, vec!["+----+", "|abcd|", "+----+"]);
    }

    #[test]
    fn focused_frame() {
        let mut grid = CellGrid::new(4, 3);
        grid.frame(0, 0, 4, 3, true);
        let lines: Vec<String> = grid.lines().collect();
        assert_eq!(lines, vec!["+==+", "#  #", "+==+"]);
    }

    #[test]
    fn clips_outside() {
        let mut grid = CellGrid::new(2, 1);
        grid.put_str(0, 1, "xyz", 10);
        grid.put(5, 5, 'q');
        assert_eq!(grid.lines().collect::<Vec<_>>(), vec![" x"]);
    }
}
