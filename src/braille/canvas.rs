/// Dot bit for each position inside a braille cell, indexed `[y][x]`.
///
/// ```text
/// 0x01 0x08
/// 0x02 0x10
/// 0x04 0x20
/// 0x40 0x80
/// ```
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

const BRAILLE_BLANK: u32 = 0x2800;

/// Grid of braille cells addressed in dot coordinates.
/// A terminal cell holds 2x4 dots, so a `cols x rows` canvas is
/// `2*cols x 4*rows` dots.
#[derive(Clone)]
pub struct BrailleCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    /// Turn on the dot at `(x, y)`. Dots outside the canvas are dropped.
    pub fn plot(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (col, row) = (x / 2, y / 4);
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] |= DOT_BITS[y % 4][x % 2];
        }
    }

    /// Braille glyph of a cell, `None` when no dot is set
    pub fn glyph(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        match self.cells[row * self.cols + col] {
            0 => None,
            bits => char::from_u32(BRAILLE_BLANK + bits as u32),
        }
    }

    /// True when no dot is set anywhere
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&bits| bits == 0)
    }
}
