//! Registered catalogue of brick layout patterns
//!
//! Each pattern is a predicate over grid cells. The generator picks one by
//! index; adding a pattern means adding an entry to `PATTERNS`.

/// A grid cell being tested against a pattern
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
    pub rows: i32,
    pub cols: i32,
}

impl Cell {
    pub fn new(row: u32, col: u32, rows: u32, cols: u32) -> Self {
        Self {
            row: row as i32,
            col: col as i32,
            rows: rows as i32,
            cols: cols as i32,
        }
    }

    /// Signed row offset from the grid's vertical centre line
    #[inline]
    fn dr(&self) -> f32 {
        self.row as f32 - (self.rows - 1) as f32 / 2.0
    }

    /// Signed column offset from the grid's horizontal centre line
    #[inline]
    fn dc(&self) -> f32 {
        self.col as f32 - (self.cols - 1) as f32 / 2.0
    }

    #[inline]
    fn center_dist(&self) -> f32 {
        (self.dr() * self.dr() + self.dc() * self.dc()).sqrt()
    }
}

/// A named layout predicate
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    pub name: &'static str,
    pub contains: fn(Cell) -> bool,
}

#[rustfmt::skip]
const HEART: [(i32, i32); 66] = [
    (0, 2), (0, 3), (0, 8), (0, 9),
    (1, 1), (1, 2), (1, 3), (1, 4), (1, 7), (1, 8), (1, 9), (1, 10),
    (2, 0), (2, 1), (2, 2), (2, 3), (2, 4), (2, 5), (2, 6), (2, 7), (2, 8), (2, 9), (2, 10), (2, 11),
    (3, 0), (3, 1), (3, 2), (3, 3), (3, 4), (3, 5), (3, 6), (3, 7), (3, 8), (3, 9), (3, 10), (3, 11),
    (4, 1), (4, 2), (4, 3), (4, 4), (4, 5), (4, 6), (4, 7), (4, 8), (4, 9), (4, 10),
    (5, 2), (5, 3), (5, 4), (5, 5), (5, 6), (5, 7), (5, 8), (5, 9),
    (6, 3), (6, 4), (6, 5), (6, 6), (6, 7), (6, 8),
    (7, 4), (7, 5), (7, 6), (7, 7),
    (8, 5), (8, 6),
];

/// All layouts, selected by index
pub const PATTERNS: [Pattern; 20] = [
    Pattern { name: "full", contains: |_| true },
    Pattern { name: "checkerboard", contains: |c| (c.row + c.col) % 2 == 0 },
    Pattern {
        name: "pyramid",
        contains: |c| c.dc().abs() <= c.row.min(5) as f32 && c.row < c.rows - 1,
    },
    Pattern {
        name: "inverted pyramid",
        contains: |c| {
            let reach = if c.row > 3 { c.rows - 1 - c.row } else { 5 };
            c.dc().abs() <= reach as f32 && c.row > 0
        },
    },
    Pattern { name: "diamond", contains: |c| c.dr().abs() + c.dc().abs() <= 5.5 },
    Pattern { name: "heart", contains: |c| HEART.contains(&(c.row, c.col)) },
    Pattern { name: "x", contains: |c| (c.dr().abs() - c.dc().abs()).abs() <= 1.5 },
    Pattern {
        name: "thick border",
        contains: |c| c.row <= 1 || c.row >= c.rows - 2 || c.col <= 1 || c.col >= c.cols - 2,
    },
    Pattern { name: "horizontal stripes", contains: |c| c.row % 2 == 0 || c.row % 3 == 0 },
    Pattern { name: "vertical stripes", contains: |c| c.col % 2 == 0 || c.col % 3 == 0 },
    Pattern { name: "plus", contains: |c| c.dr().abs() <= 1.5 || c.dc().abs() <= 1.5 },
    Pattern {
        name: "ring",
        contains: |c| (2.0..=5.5).contains(&c.center_dist()),
    },
    Pattern {
        name: "four corners",
        contains: |c| (c.row < 4 || c.row > 5) && (c.col < 4 || c.col > 7),
    },
    Pattern {
        name: "lattice",
        contains: |c| (c.row + c.col) % 2 == 0 || (c.row - c.col).rem_euclid(4) == 0,
    },
    Pattern {
        name: "two pillars",
        contains: |c| c.col < 4 || c.col > 7 || c.row < 2 || c.row > 7,
    },
    Pattern {
        name: "center box",
        contains: |c| c.row > 0 && c.row < c.rows - 1 && c.col > 0 && c.col < c.cols - 1,
    },
    Pattern {
        name: "stepped rows",
        contains: |c| matches!(c.row, 0 | 2 | 4 | 6 | 8) || c.row == c.rows - 1,
    },
    Pattern { name: "butterfly", contains: |c| c.dc().abs() >= c.dr().abs() - 1.0 },
    Pattern { name: "hourglass", contains: |c| c.dr().abs() >= c.dc().abs() - 1.0 },
    Pattern { name: "shards", contains: |c| (c.row + c.col) % 3 != 0 },
];
