//! Grid construction: column sampling and the 5×5 playing surface.

use std::fmt;
use std::str::FromStr;

use bingo_core::rng::DeterministicRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

/// Rows and columns per grid.
pub const GRID_SIZE: usize = 5;

/// Members in each column range.
pub const COLUMN_SPAN: usize = 15;

/// Literal rendered for the free centre cell.
pub const FREE_MARKER: &str = "FREE";

/// Row/column of the free cell.
pub const FREE_POSITION: (usize, usize) = (2, 2);

/// Separator used by [`Grid::canonical`]. Changing it changes every
/// fingerprint ever issued.
pub const CANONICAL_SEPARATOR: char = ',';

/// Inclusive value ranges for columns B, I, N, G, O.
pub const COLUMN_RANGES: [(u8, u8); GRID_SIZE] = [(1, 15), (16, 30), (31, 45), (46, 60), (61, 75)];

/// One cell of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// A drawn column value.
    Number(u8),
    /// The fixed centre cell.
    Free,
}

impl Cell {
    /// Returns the numeric value, or `None` for the free cell.
    #[must_use]
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Number(n) => Some(n),
            Self::Free => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Free => f.write_str(FREE_MARKER),
        }
    }
}

/// Error returned when a cell string is neither a number nor the free marker.
#[derive(Debug, thiserror::Error)]
#[error("invalid cell value: {0:?}")]
pub struct InvalidCell(String);

impl FromStr for Cell {
    type Err = InvalidCell;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FREE_MARKER {
            return Ok(Self::Free);
        }
        s.parse::<u8>()
            .map(Self::Number)
            .map_err(|_| InvalidCell(s.to_owned()))
    }
}

// Cells travel as strings ("12", "FREE") so the rendering layer can print
// them without caring which is which.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A 5×5 grid, indexed `[row][column]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Wraps raw cells. No invariant checking; see [`Grid::is_well_formed`].
    #[must_use]
    pub fn from_cells(cells: [[Cell; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells }
    }

    /// Returns the cell at `(row, column)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `column` is not below `GRID_SIZE`.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.cells[row][column]
    }

    /// Returns the rows in order.
    #[must_use]
    pub fn rows(&self) -> &[[Cell; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    /// Returns one column, top to bottom.
    ///
    /// # Panics
    ///
    /// Panics if `column >= GRID_SIZE`.
    #[must_use]
    pub fn column(&self, column: usize) -> [Cell; GRID_SIZE] {
        std::array::from_fn(|row| self.cells[row][column])
    }

    /// Row-major, comma-joined cell values. This string is what gets hashed
    /// into a fingerprint.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::with_capacity(GRID_SIZE * GRID_SIZE * 3);
        for (i, cell) in self.cells.iter().flatten().enumerate() {
            if i > 0 {
                out.push(CANONICAL_SEPARATOR);
            }
            out.push_str(&cell.to_string());
        }
        out
    }

    /// Checks the free-cell and column invariants.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let (free_row, free_col) = FREE_POSITION;
        if self.cells[free_row][free_col] != Cell::Free {
            return false;
        }
        COLUMN_RANGES.iter().enumerate().all(|(col, &(lo, hi))| {
            let mut seen = Vec::with_capacity(GRID_SIZE);
            for (row, cell) in self.column(col).into_iter().enumerate() {
                match cell {
                    Cell::Free if (row, col) == FREE_POSITION => {}
                    Cell::Number(n) if (lo..=hi).contains(&n) && !seen.contains(&n) => {
                        seen.push(n);
                    }
                    _ => return false,
                }
            }
            true
        })
    }
}

/// Draws a full permutation of one column's range.
///
/// Fisher–Yates from the last index down, `j` drawn from `[0, i]`. The
/// caller uses the first five entries and discards the rest.
///
/// # Panics
///
/// Panics if `column >= GRID_SIZE`.
pub fn permutation(column: usize, rng: &mut dyn DeterministicRng) -> [u8; COLUMN_SPAN] {
    let (lo, _) = COLUMN_RANGES[column];
    #[allow(clippy::cast_possible_truncation)]
    let mut values: [u8; COLUMN_SPAN] = std::array::from_fn(|i| lo + i as u8);
    for i in (1..COLUMN_SPAN).rev() {
        #[allow(clippy::cast_possible_truncation)]
        let j = rng.next_u32_range(0, i as u32) as usize;
        values.swap(i, j);
    }
    values
}

/// Composes five column permutations and the free cell into a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder;

impl GridBuilder {
    /// Builds one grid from `rng`.
    ///
    /// Column 2's third draw is overwritten by the free cell after the fact,
    /// so every grid consumes the same number of random values.
    pub fn build(rng: &mut dyn DeterministicRng, card_index: u32, round_number: u32) -> Grid {
        let mut cells = [[Cell::Free; GRID_SIZE]; GRID_SIZE];
        for col in 0..GRID_SIZE {
            let drawn = permutation(col, rng);
            for (row, value) in drawn.iter().take(GRID_SIZE).enumerate() {
                cells[row][col] = Cell::Number(*value);
            }
        }
        let (free_row, free_col) = FREE_POSITION;
        cells[free_row][free_col] = Cell::Free;

        trace!(card_index, round_number, "grid built");
        Grid { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo_core::rng::SeededRng;
    use bingo_test_support::{MockRng, SequenceRng};

    #[test]
    fn test_permutation_covers_whole_range() {
        let mut rng = SeededRng::from_key("perm");
        for (col, &(lo, hi)) in COLUMN_RANGES.iter().enumerate() {
            let mut values = permutation(col, &mut rng).to_vec();
            values.sort_unstable();
            assert_eq!(values, (lo..=hi).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_build_with_mock_rng_is_fixed_rotation() {
        let grid = GridBuilder::build(&mut MockRng, 0, 1);

        assert_eq!(grid.column(0).map(|c| c.value()), [2, 3, 4, 5, 6].map(Some));
        assert_eq!(grid.cell(2, 2), Cell::Free);
        assert_eq!(grid.cell(1, 2), Cell::Number(33));
        assert_eq!(grid.cell(3, 2), Cell::Number(35));
        assert_eq!(
            grid.canonical(),
            "2,17,32,47,62,3,18,33,48,63,4,19,FREE,49,64,5,20,35,50,65,6,21,36,51,66"
        );
    }

    #[test]
    fn test_discarded_free_draw_still_consumes_rng() {
        let mut rng = SequenceRng::new(vec![0; 70]);
        let _ = GridBuilder::build(&mut rng, 0, 1);

        // 14 swaps per column, including column 2 whose row-2 value is dropped.
        assert_eq!(rng.consumed(), 70);
    }

    #[test]
    fn test_seeded_grids_are_well_formed() {
        for round in 1..=10 {
            let mut rng = SeededRng::from_key(&format!("wf:{round}"));
            let grid = GridBuilder::build(&mut rng, 0, round);
            assert!(grid.is_well_formed(), "{}", grid.canonical());
        }
    }

    #[test]
    fn test_is_well_formed_rejects_duplicates_and_out_of_range() {
        let mut grid = GridBuilder::build(&mut MockRng, 0, 1);
        grid.cells[0][0] = grid.cells[1][0];
        assert!(!grid.is_well_formed());

        let mut grid = GridBuilder::build(&mut MockRng, 0, 1);
        grid.cells[4][4] = Cell::Number(3);
        assert!(!grid.is_well_formed());

        let mut grid = GridBuilder::build(&mut MockRng, 0, 1);
        grid.cells[2][2] = Cell::Number(31);
        assert!(!grid.is_well_formed());
    }

    #[test]
    fn test_grid_serializes_as_string_matrix() {
        let grid = GridBuilder::build(&mut MockRng, 0, 1);
        let json = serde_json::to_value(&grid).unwrap();

        assert_eq!(json[0][0], "2");
        assert_eq!(json[2][2], "FREE");

        let back: Grid = serde_json::from_value(json).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_cell_outside_grid_panics() {
        let grid = GridBuilder::build(&mut MockRng, 0, 1);
        let _ = grid.cell(GRID_SIZE, 0);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_column_outside_grid_panics() {
        let grid = GridBuilder::build(&mut MockRng, 0, 1);
        let _ = grid.column(GRID_SIZE);
    }

    #[test]
    fn test_cell_from_str_rejects_garbage() {
        assert!("FREE".parse::<Cell>().is_ok());
        assert!("free".parse::<Cell>().is_err());
        assert!("".parse::<Cell>().is_err());
    }
}
