//! Module for the arena: the explicitly-constructed match context that
//! composes the grid, the snakes, the food manager and the stage
//! controller. There is no ambient global lookup; whoever orchestrates a
//! match owns an [`Arena`] and passes it by reference.
use std::collections::HashSet;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::food::FoodManager;
use super::grid::{Cell, Grid, GridError};
use super::snake::{CollisionCause, Direction, Snake, SnakeAction, StepOutcome};
use super::stage::{StageController, FOOD_SCORE};

/// Index of a snake within its arena.
pub type SnakeId = usize;

type Result<T> = std::result::Result<T, ArenaError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    Grid(GridError),
    /// A spawn point would place part of a snake outside the interior.
    InvalidSpawn { snake: SnakeId, cell: Cell },
    NoSnakes,
    UnknownSnake(SnakeId),
    /// The tick loop kept stepping a snake past its terminal collision.
    SnakeTerminated(SnakeId),
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArenaError::Grid(e) => write!(f, "{e}"),
            ArenaError::InvalidSpawn { snake, cell } => {
                write!(f, "spawn for snake {snake} puts a segment at {cell:?}, outside the interior")
            }
            ArenaError::NoSnakes => write!(f, "an arena needs at least one snake"),
            ArenaError::UnknownSnake(id) => write!(f, "no snake with id {id}"),
            ArenaError::SnakeTerminated(id) => {
                write!(f, "snake {id} is terminated and must be reset before stepping")
            }
        }
    }
}

impl std::error::Error for ArenaError {}

impl From<GridError> for ArenaError {
    fn from(e: GridError) -> Self {
        ArenaError::Grid(e)
    }
}

/// Where a snake starts and which way it heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub cell: Cell,
    pub direction: Direction,
}

/// Match parameters. The defaults mirror the classic 13x13 board with one
/// snake starting right of center and heading left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub columns: usize,
    pub rows: usize,
    pub initial_snake_length: usize,
    pub spawns: Vec<SpawnPoint>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::single(13, 13)
    }
}

impl ArenaConfig {
    /// One snake, spawned on the right half of the board heading left.
    #[must_use]
    pub fn single(columns: usize, rows: usize) -> Self {
        let (columns_i, rows_i) = (columns as i32, rows as i32);
        Self {
            columns,
            rows,
            initial_snake_length: 2,
            spawns: vec![SpawnPoint {
                cell: Cell::new(3 * columns_i / 4, rows_i / 2),
                direction: Direction::Left,
            }],
        }
    }

    /// Two snakes facing away from each other, sharing one food manager.
    #[must_use]
    pub fn duel(columns: usize, rows: usize) -> Self {
        let (columns_i, rows_i) = (columns as i32, rows as i32);
        let mut config = Self::single(columns, rows);
        config.spawns.push(SpawnPoint {
            cell: Cell::new(columns_i / 4, rows_i / 2),
            direction: Direction::Right,
        });
        config
    }
}

/// What the host subscribes to: score, stage and terminal transitions.
/// Rendering them is the host's business, none of it lives here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaEvent {
    FoodEaten { snake: SnakeId, new_score: u32 },
    StageAdvanced { new_interval: f32 },
    Collision { snake: SnakeId, cause: CollisionCause },
    /// Food placement fell back to an occupied cell (see
    /// [`super::food::Placement`]). A warning signal, not a failure.
    PlacementExhausted { cell: Cell },
}

/// One snake-tick worth of results.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub outcome: StepOutcome,
    pub events: Vec<ArenaEvent>,
}

/// The match context. Owns cell classification through the grid, each
/// snake's segments through the snakes, the food cell through the food
/// manager and the speed progression through the stage controller.
#[derive(Debug)]
pub struct Arena {
    grid: Grid,
    snakes: Vec<Snake>,
    spawns: Vec<SpawnPoint>,
    initial_snake_length: usize,
    food: FoodManager,
    stage: StageController,
}

impl Arena {
    /// Builds the board, spawns every configured snake and seeds the first
    /// food tile at the board center.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Grid`] for dimensions without an interior,
    /// [`ArenaError::NoSnakes`] for an empty spawn list and
    /// [`ArenaError::InvalidSpawn`] when a snake's initial segments would
    /// touch the wall or leave the board.
    pub fn new(config: ArenaConfig) -> Result<Self> {
        let grid = Grid::new(config.columns, config.rows)?;
        if config.spawns.is_empty() {
            return Err(ArenaError::NoSnakes);
        }
        let mut snakes = Vec::with_capacity(config.spawns.len());
        for (id, spawn) in config.spawns.iter().enumerate() {
            let snake = Snake::new(spawn.cell, spawn.direction, config.initial_snake_length);
            if let Some(cell) = snake.body_cells().find(|&c| !grid.is_interior(c)) {
                return Err(ArenaError::InvalidSpawn { snake: id, cell });
            }
            snakes.push(snake);
        }
        let mut food = FoodManager::new();
        food.seed_at_center(&grid);
        Ok(Self {
            grid,
            snakes,
            spawns: config.spawns,
            initial_snake_length: config.initial_snake_length,
            food,
            stage: StageController::new(),
        })
    }

    /// Buffers an intended heading for the snake's next tick. `Noop` leaves
    /// the current heading alone. Returns whether a turn was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UnknownSnake`] for an id out of range.
    pub fn buffer_action(&mut self, id: SnakeId, action: SnakeAction) -> Result<bool> {
        let snake = self
            .snakes
            .get_mut(id)
            .ok_or(ArenaError::UnknownSnake(id))?;
        match action.direction() {
            Some(direction) => Ok(snake.set_intended_direction(direction)),
            None => Ok(false),
        }
    }

    /// Runs one movement tick for one snake: commits its buffered heading,
    /// moves it, and applies every side effect of the outcome (growth,
    /// score, food relocation, stage advance, termination) before
    /// returning. Cross-snake occupancy is solid; only the moving snake's
    /// own vacating tail is exempt.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UnknownSnake`] for an id out of range and
    /// [`ArenaError::SnakeTerminated`] when the caller keeps ticking a
    /// snake whose episode already ended.
    pub fn step_snake(&mut self, id: SnakeId) -> Result<TickReport> {
        if id >= self.snakes.len() {
            return Err(ArenaError::UnknownSnake(id));
        }
        if !self.snakes[id].is_active() {
            return Err(ArenaError::SnakeTerminated(id));
        }

        let food = if let Some(cell) = self.food.current_position() {
            cell
        } else {
            // Cannot happen after construction; recover rather than crash.
            error!("Arena stepped with no food on the board, reseeding center");
            self.food.seed_at_center(&self.grid)
        };
        let blocked: HashSet<Cell> = self
            .snakes
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != id)
            .flat_map(|(_, s)| s.body_cells())
            .collect();

        let outcome = self.snakes[id].step(food, &self.grid, &blocked);
        let mut events = Vec::new();
        match outcome {
            StepOutcome::Ate => {
                if let Some(new_interval) = self.stage.on_score_increment(FOOD_SCORE) {
                    events.push(ArenaEvent::StageAdvanced { new_interval });
                }
                events.insert(
                    0,
                    ArenaEvent::FoodEaten {
                        snake: id,
                        new_score: self.stage.score(),
                    },
                );
                let occupied = self.occupied_cells();
                let placement =
                    self.food
                        .place(&self.grid, &occupied, &mut rand::thread_rng());
                if placement.exhausted {
                    events.push(ArenaEvent::PlacementExhausted {
                        cell: placement.cell,
                    });
                }
            }
            StepOutcome::Collided(cause) => {
                debug!("Snake {id} collided: {cause:?}");
                events.push(ArenaEvent::Collision { snake: id, cause });
            }
            StepOutcome::Moved => {}
        }
        Ok(TickReport { outcome, events })
    }

    /// Puts the whole match back to its initial state: snakes at their
    /// spawns, stage 0, score 0, food at the center. Idempotent.
    pub fn reset(&mut self) {
        for (snake, spawn) in self.snakes.iter_mut().zip(&self.spawns) {
            snake.reset(spawn.cell, spawn.direction, self.initial_snake_length);
        }
        self.stage.reset();
        self.food.seed_at_center(&self.grid);
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn snake(&self, id: SnakeId) -> Option<&Snake> {
        self.snakes.get(id)
    }

    #[must_use]
    pub fn snake_count(&self) -> usize {
        self.snakes.len()
    }

    #[must_use]
    pub fn head_position(&self, id: SnakeId) -> Option<Cell> {
        self.snakes.get(id).map(Snake::head)
    }

    #[must_use]
    pub fn body_cells(&self, id: SnakeId) -> Option<Vec<Cell>> {
        self.snakes.get(id).map(|s| s.body_cells().collect())
    }

    #[must_use]
    pub fn food_position(&self) -> Option<Cell> {
        self.food.current_position()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.stage.score()
    }

    #[must_use]
    pub fn stage(&self) -> u32 {
        self.stage.stage()
    }

    #[must_use]
    pub fn turn_interval(&self) -> f32 {
        self.stage.turn_interval()
    }

    #[must_use]
    pub fn is_snake_active(&self, id: SnakeId) -> bool {
        self.snakes.get(id).is_some_and(Snake::is_active)
    }

    /// The match is over once every snake has hit something.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.snakes.iter().all(|s| !s.is_active())
    }

    /// Every cell any snake currently occupies.
    #[must_use]
    pub fn occupied_cells(&self) -> HashSet<Cell> {
        self.snakes.iter().flat_map(Snake::body_cells).collect()
    }
}
