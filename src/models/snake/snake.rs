//! Module for the snake body, its direction buffering and its movement step.
use std::collections::{HashSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use super::grid::{Cell, Grid};

type Result<T> = std::result::Result<T, ActionError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// An action source handed over a discrete value outside the known set.
    /// This is a host integration bug, not a simulation event.
    InvalidAction(usize),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::InvalidAction(value) => {
                write!(f, "unknown discrete action value {value}")
            }
        }
    }
}

impl std::error::Error for ActionError {}

/// Heading of a snake, expressed as a unit step on the grid. The y axis
/// points up, matching the board's coordinate convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    #[must_use]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
        }
    }

    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// One discrete command from an action source. `Noop` keeps the current
/// heading, the rest request an absolute turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeAction {
    Left,
    Right,
    Up,
    Down,
    Noop,
}

impl From<Direction> for SnakeAction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => SnakeAction::Left,
            Direction::Right => SnakeAction::Right,
            Direction::Up => SnakeAction::Up,
            Direction::Down => SnakeAction::Down,
        }
    }
}

impl SnakeAction {
    pub const VARIANTS: &'static [SnakeAction] = &[
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::Noop,
    ];

    /// The heading this action requests, or `None` for [`SnakeAction::Noop`].
    #[must_use]
    pub fn direction(self) -> Option<Direction> {
        match self {
            SnakeAction::Left => Some(Direction::Left),
            SnakeAction::Right => Some(Direction::Right),
            SnakeAction::Up => Some(Direction::Up),
            SnakeAction::Down => Some(Direction::Down),
            SnakeAction::Noop => None,
        }
    }

    /// Position of this action inside [`SnakeAction::VARIANTS`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            SnakeAction::Left => 0,
            SnakeAction::Right => 1,
            SnakeAction::Up => 2,
            SnakeAction::Down => 3,
            SnakeAction::Noop => 4,
        }
    }

    /// Decodes a discrete action value.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidAction`] for values outside the known
    /// set. Callers must not clamp or ignore this silently.
    pub fn from_index(index: usize) -> Result<Self> {
        SnakeAction::VARIANTS
            .get(index)
            .copied()
            .ok_or(ActionError::InvalidAction(index))
    }
}

/// Why a snake's episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionCause {
    /// Hit the boundary wall or left the board.
    Wall,
    /// Hit its own body.
    SelfBody,
    /// Hit another snake in the same arena.
    OtherSnake,
}

/// Lifecycle of a snake within one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakePhase {
    /// Built or reset, no step taken yet.
    Idle,
    Moving,
    /// A terminal collision happened. No further steps until reset.
    Terminated,
}

/// What a single movement step resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Ate,
    Collided(CollisionCause),
}

/// A snake on the board. The head is the front of the body queue; moving is
/// an O(1) ring move that reuses the vacated tail cell instead of allocating
/// a segment per tick.
#[derive(Debug, Clone)]
pub struct Snake {
    body: VecDeque<Cell>,
    direction: Direction,
    buffered: Option<Direction>,
    phase: SnakePhase,
}

impl Snake {
    /// Creates a snake with its head at `head` and `initial_len - 1`
    /// segments laid out behind it, opposite the starting direction. A
    /// length of 0 is treated as 1: the head segment always exists.
    #[must_use]
    pub fn new(head: Cell, direction: Direction, initial_len: usize) -> Self {
        let back = direction.opposite().delta();
        let mut body = VecDeque::with_capacity(initial_len.max(1));
        let mut last = head;
        body.push_back(head);
        for _ in 1..initial_len {
            last = last.offset(back);
            body.push_back(last);
        }
        Self {
            body,
            direction,
            buffered: None,
            phase: SnakePhase::Idle,
        }
    }

    /// Buffers an intended heading for the next tick. A request along the
    /// current movement axis, reversal included, is rejected; when several
    /// requests arrive before the tick, only the last valid one is kept.
    ///
    /// Returns whether the request was accepted.
    pub fn set_intended_direction(&mut self, direction: Direction) -> bool {
        if direction.is_horizontal() == self.direction.is_horizontal() {
            return false;
        }
        self.buffered = Some(direction);
        true
    }

    /// Runs one movement tick against the current food cell and the cells
    /// occupied by other snakes. Collisions are a first-class outcome, not
    /// an error: the snake transitions to [`SnakePhase::Terminated`] and the
    /// caller must stop ticking it until [`Snake::reset`].
    pub fn step(&mut self, food: Cell, grid: &Grid, blocked: &HashSet<Cell>) -> StepOutcome {
        debug_assert!(
            self.phase != SnakePhase::Terminated,
            "stepped a terminated snake"
        );
        if let Some(direction) = self.buffered.take() {
            self.direction = direction;
        }
        self.phase = SnakePhase::Moving;

        let new_head = self.head().offset(self.direction.delta());

        if !grid.is_inside_bounds(new_head) || grid.is_wall(new_head) {
            self.phase = SnakePhase::Terminated;
            return StepOutcome::Collided(CollisionCause::Wall);
        }
        if blocked.contains(&new_head) {
            self.phase = SnakePhase::Terminated;
            return StepOutcome::Collided(CollisionCause::OtherSnake);
        }

        let grows = new_head == food;
        // The tail cell is vacated this same tick unless the snake grows,
        // so chasing one's own tail is legal.
        let solid_segments = if grows || self.body.len() < 2 {
            self.body.len()
        } else {
            self.body.len() - 1
        };
        if self.body.iter().take(solid_segments).any(|&c| c == new_head) {
            self.phase = SnakePhase::Terminated;
            return StepOutcome::Collided(CollisionCause::SelfBody);
        }

        if grows {
            self.body.push_front(new_head);
            debug!("Snake grew to {} segments at {new_head:?}", self.body.len());
            return StepOutcome::Ate;
        }
        self.body.pop_back();
        self.body.push_front(new_head);
        StepOutcome::Moved
    }

    /// Restores the documented initial state: segments re-laid from
    /// `head`, buffer cleared, phase back to [`SnakePhase::Idle`].
    pub fn reset(&mut self, head: Cell, direction: Direction, initial_len: usize) {
        *self = Snake::new(head, direction, initial_len);
    }

    /// # Panics
    ///
    /// Never in practice: the body always holds at least the head segment.
    #[must_use]
    pub fn head(&self) -> Cell {
        self.body[0]
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn phase(&self) -> SnakePhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != SnakePhase::Terminated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Head first, tail last.
    pub fn body_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.body.iter().copied()
    }

    #[must_use]
    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }
}
