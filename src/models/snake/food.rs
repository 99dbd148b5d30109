//! Module for the single food tile and its collision-avoiding placement.
use std::collections::HashSet;

use log::{debug, warn};
use rand::Rng;

use super::grid::{Cell, Grid};

/// Result of one placement attempt. `exhausted` is the non-fatal "ran out
/// of tries" condition: the cell may overlap the snake on a pathologically
/// full board, which callers may surface as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub cell: Cell,
    pub exhausted: bool,
}

/// Owns the one active food cell per arena. Depends on the grid and the
/// snakes' occupancy for placement, nothing else.
#[derive(Debug, Clone, Default)]
pub struct FoodManager {
    current: Option<Cell>,
}

impl FoodManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Seeds the very first food tile at the board center.
    pub fn seed_at_center(&mut self, grid: &Grid) -> Cell {
        let cell = grid.center_cell();
        self.current = Some(cell);
        cell
    }

    /// Relocates the food to a random free interior cell. Sampling retries
    /// against `occupied` are bounded by `columns * rows` so placement
    /// always terminates; when the budget runs out the last sampled cell is
    /// used anyway and the outcome is flagged, preserving liveness on a
    /// near-full board.
    pub fn place<R: Rng>(&mut self, grid: &Grid, occupied: &HashSet<Cell>, rng: &mut R) -> Placement {
        let mut tries = (grid.columns() * grid.rows()) as usize;
        let mut cell = grid.random_interior_cell(rng);
        while occupied.contains(&cell) && tries > 0 {
            cell = grid.random_interior_cell(rng);
            tries -= 1;
        }
        let exhausted = occupied.contains(&cell);
        if exhausted {
            warn!("Food placement ran out of tries, using occupied cell {cell:?}");
        } else {
            debug!("Food placed at {cell:?}");
        }
        self.current = Some(cell);
        Placement { cell, exhausted }
    }

    /// The active food cell. `None` means no placement has happened yet,
    /// which is a precondition violation on the caller's side.
    #[must_use]
    pub fn current_position(&self) -> Option<Cell> {
        self.current
    }
}
