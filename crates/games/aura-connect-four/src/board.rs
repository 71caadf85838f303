use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Pieces in a row needed to win.
const CONNECT: usize = 4;

/// Directions scanned from every cell: right, down, down-right, down-left.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Piece colour. Seat 0 plays red, seat 1 yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disc {
    Red,
    Yellow,
}

impl Disc {
    pub fn for_seat(seat: usize) -> Self {
        if seat == 0 { Self::Red } else { Self::Yellow }
    }
}

/// 6x7 grid, row 0 at the top. Pieces fall to the highest-numbered empty row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Disc>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Disc> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Lowest empty row in `col`, or `None` if the column is full.
    pub fn next_open_row(&self, col: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    pub fn is_column_full(&self, col: usize) -> bool {
        self.cells[0][col].is_some()
    }

    /// Drop a disc into `col`. Returns the row it landed in, or `None` when
    /// the column is full (board untouched).
    pub fn drop_disc(&mut self, col: usize, disc: Disc) -> Option<usize> {
        let row = self.next_open_row(col)?;
        self.cells[row][col] = Some(disc);
        Some(row)
    }

    pub fn is_full(&self) -> bool {
        (0..COLS).all(|col| self.is_column_full(col))
    }

    /// Whether `disc` owns four contiguous cells in any row, column or
    /// diagonal. Scans the full board.
    pub fn has_four(&self, disc: Disc) -> bool {
        (0..ROWS).any(|row| {
            (0..COLS).any(|col| {
                DIRECTIONS
                    .iter()
                    .any(|&(dr, dc)| self.run_from(row, col, dr, dc, disc))
            })
        })
    }

    fn run_from(&self, row: usize, col: usize, dr: isize, dc: isize, disc: Disc) -> bool {
        (0..CONNECT as isize).all(|step| {
            let r = row as isize + dr * step;
            let c = col as isize + dc * step;
            r >= 0
                && c >= 0
                && (r as usize) < ROWS
                && (c as usize) < COLS
                && self.cells[r as usize][c as usize] == Some(disc)
        })
    }

    /// Text rows, top first, for logs and debugging.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(Disc::Red) => 'R',
                        Some(Disc::Yellow) => 'Y',
                        None => '.',
                    })
                    .collect()
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, row: usize, col: usize, disc: Option<Disc>) {
        self.cells[row][col] = disc;
    }
}
