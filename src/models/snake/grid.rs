//! Module for the game board grid and its cell classification.
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest board dimension that still has an interior.
pub const MIN_GRID_SIZE: usize = 3;

type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Both dimensions must be greater than 2 so the one-cell wall border
    /// leaves a non-empty interior.
    InvalidDimensions { columns: usize, rows: usize },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::InvalidDimensions { columns, rows } => {
                write!(f, "invalid grid dimensions {columns}x{rows}, both must be > 2")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// A single square on the game board. Equality is by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step away along the given delta.
    #[must_use]
    pub fn offset(self, delta: (i32, i32)) -> Self {
        Self {
            x: self.x + delta.0,
            y: self.y + delta.1,
        }
    }
}

/// A bounded board with a one-cell wall border. The interior cell set is
/// fixed for the lifetime of the instance; building a new [`Grid`] is the
/// only way to change it.
#[derive(Debug, Clone)]
pub struct Grid {
    columns: i32,
    rows: i32,
    interior: Vec<Cell>,
}

impl Grid {
    /// Builds a board of `columns` x `rows` cells where the outermost ring
    /// is wall and everything else is interior.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if either dimension is 2 or
    /// less, which would leave no interior to play in.
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        if columns < MIN_GRID_SIZE || rows < MIN_GRID_SIZE {
            return Err(GridError::InvalidDimensions { columns, rows });
        }
        let (Ok(columns), Ok(rows)) = (i32::try_from(columns), i32::try_from(rows)) else {
            return Err(GridError::InvalidDimensions { columns, rows });
        };
        let mut interior = Vec::with_capacity(((columns - 2) * (rows - 2)) as usize);
        for x in 1..columns - 1 {
            for y in 1..rows - 1 {
                interior.push(Cell::new(x, y));
            }
        }
        debug!("New {columns}x{rows} grid with {} interior cells", interior.len());
        Ok(Self { columns, rows, interior })
    }

    #[must_use]
    pub fn columns(&self) -> i32 {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Whether the cell lies on the board at all, wall ring included.
    #[must_use]
    pub fn is_inside_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.columns && cell.y >= 0 && cell.y < self.rows
    }

    /// Whether the cell is part of the boundary wall ring.
    #[must_use]
    pub fn is_wall(&self, cell: Cell) -> bool {
        self.is_inside_bounds(cell)
            && (cell.x == 0 || cell.x == self.columns - 1 || cell.y == 0 || cell.y == self.rows - 1)
    }

    /// Whether the cell is eligible for snake or food occupancy.
    #[must_use]
    pub fn is_interior(&self, cell: Cell) -> bool {
        self.is_inside_bounds(cell) && !self.is_wall(cell)
    }

    #[must_use]
    pub fn interior_cells(&self) -> &[Cell] {
        &self.interior
    }

    /// Uniformly selects one interior cell. The interior is never empty for
    /// dimensions accepted by [`Grid::new`].
    ///
    /// # Panics
    ///
    /// Panics if the interior is empty, which [`Grid::new`] rules out.
    #[must_use]
    pub fn random_interior_cell<R: Rng>(&self, rng: &mut R) -> Cell {
        self.interior[rng.gen_range(0..self.interior.len())]
    }

    /// The middle of the board, where the first food tile is seeded.
    #[must_use]
    pub fn center_cell(&self) -> Cell {
        Cell::new(self.columns / 2, self.rows / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_count_matches_dimensions() {
        let grid = Grid::new(13, 13).unwrap();
        assert_eq!(grid.interior_cells().len(), 11 * 11);
        let grid = Grid::new(3, 7).unwrap();
        assert_eq!(grid.interior_cells().len(), 5);
    }

    #[test]
    fn interior_never_overlaps_wall() {
        let grid = Grid::new(8, 5).unwrap();
        for &cell in grid.interior_cells() {
            assert!(!grid.is_wall(cell), "{cell:?} is both interior and wall");
            assert!(grid.is_interior(cell));
        }
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(matches!(
            Grid::new(2, 13),
            Err(GridError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Grid::new(13, 0),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn boundary_predicates() {
        let grid = Grid::new(13, 13).unwrap();
        assert!(grid.is_wall(Cell::new(0, 6)));
        assert!(grid.is_wall(Cell::new(12, 0)));
        assert!(!grid.is_wall(Cell::new(1, 1)));
        assert!(!grid.is_inside_bounds(Cell::new(13, 6)));
        assert!(!grid.is_inside_bounds(Cell::new(-1, 6)));
    }

    #[test]
    fn random_interior_cell_is_interior() {
        let grid = Grid::new(5, 5).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let cell = grid.random_interior_cell(&mut rng);
            assert!(grid.is_interior(cell));
        }
    }

    #[test]
    fn center_cell_is_interior() {
        let grid = Grid::new(13, 13).unwrap();
        assert_eq!(grid.center_cell(), Cell::new(6, 6));
        assert!(grid.is_interior(grid.center_cell()));
    }
}
