//! Module for the agent's observation vector and the discrete action mask.
use log::error;

use crate::models::snake::arena::{Arena, SnakeId};
use crate::models::snake::grid::Cell;
use crate::models::snake::snake::{Direction, SnakeAction};

/// Number of features in the flattened observation vector.
pub const OBSERVATION_SIZE: usize = 7;

/// A fixed-size numeric snapshot of one snake's situation. Collecting it
/// never mutates the arena.
///
/// Flattened layout: `[to_food.x, to_food.y, heading.x, heading.y,
/// distance, prev_distance, heading_angle]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Unit vector from the head toward the food.
    pub to_food: (f32, f32),
    /// Current heading as a unit vector.
    pub heading: (f32, f32),
    /// Euclidean distance from the head to the food.
    pub distance: f32,
    /// The same distance as of the previous step, for reward shaping.
    pub prev_distance: f32,
    /// Heading expressed as a normalized angle in [-1, 1).
    pub heading_angle: f32,
}

impl Observation {
    /// Collects the observation for one snake. Pure: the arena is only
    /// read. Returns `None` for an unknown snake or a board without food,
    /// both of which indicate a host wiring bug.
    #[must_use]
    pub fn collect(arena: &Arena, id: SnakeId, prev_distance: f32) -> Option<Self> {
        let Some(snake) = arena.snake(id) else {
            error!("Observation requested for unknown snake {id}");
            return None;
        };
        let Some(food) = arena.food_position() else {
            error!("Observation requested before any food placement");
            return None;
        };
        let head = snake.head();
        let dx = (food.x - head.x) as f32;
        let dy = (food.y - head.y) as f32;
        let distance = (dx * dx + dy * dy).sqrt();
        let to_food = if distance > f32::EPSILON {
            (dx / distance, dy / distance)
        } else {
            (0.0, 0.0)
        };
        let delta = snake.direction().delta();
        Some(Self {
            to_food,
            heading: (delta.0 as f32, delta.1 as f32),
            distance,
            prev_distance,
            heading_angle: heading_angle(snake.direction()),
        })
    }
}

impl From<Observation> for Vec<f32> {
    fn from(obs: Observation) -> Self {
        vec![
            obs.to_food.0,
            obs.to_food.1,
            obs.heading.0,
            obs.heading.1,
            obs.distance,
            obs.prev_distance,
            obs.heading_angle,
        ]
    }
}

/// Maps the heading to a rotation angle (Right = 0, counterclockwise) and
/// normalizes it from [0, 360) degrees to [-1, 1).
fn heading_angle(direction: Direction) -> f32 {
    let degrees = match direction {
        Direction::Right => 0.0_f32,
        Direction::Up => 90.0,
        Direction::Left => 180.0,
        Direction::Down => 270.0,
    };
    degrees / 180.0 - 1.0
}

/// Validity flags over the discrete action set. Masks only the action that
/// would drive straight into the wall from a boundary-adjacent cell. A
/// survivability hint for masked policy sampling; the collision check in
/// the snake module remains authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMask {
    valid: [bool; SnakeAction::VARIANTS.len()],
}

impl ActionMask {
    /// Everything allowed.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            valid: [true; SnakeAction::VARIANTS.len()],
        }
    }

    /// Builds the wall-adjacency mask for one snake's head position. An
    /// unknown snake id yields the permissive mask.
    #[must_use]
    pub fn for_snake(arena: &Arena, id: SnakeId) -> Self {
        let Some(head) = arena.head_position(id) else {
            error!("Action mask requested for unknown snake {id}");
            return Self::permissive();
        };
        Self::for_head(arena, head)
    }

    #[must_use]
    pub fn for_head(arena: &Arena, head: Cell) -> Self {
        let grid = arena.grid();
        let mut mask = Self::permissive();
        if head.x == 1 {
            mask.forbid(SnakeAction::Left);
        }
        if head.x == grid.columns() - 2 {
            mask.forbid(SnakeAction::Right);
        }
        if head.y == 1 {
            mask.forbid(SnakeAction::Down);
        }
        if head.y == grid.rows() - 2 {
            mask.forbid(SnakeAction::Up);
        }
        mask
    }

    fn forbid(&mut self, action: SnakeAction) {
        self.valid[action.index()] = false;
    }

    #[must_use]
    pub fn allows(&self, action: SnakeAction) -> bool {
        self.valid[action.index()]
    }

    /// One flag per [`SnakeAction::VARIANTS`] entry, in order.
    #[must_use]
    pub fn as_vec(&self) -> Vec<bool> {
        self.valid.to_vec()
    }

    /// The allowed actions, in variant order.
    #[must_use]
    pub fn allowed_actions(&self) -> Vec<SnakeAction> {
        SnakeAction::VARIANTS
            .iter()
            .copied()
            .filter(|&a| self.allows(a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snake::arena::{ArenaConfig, SpawnPoint};
    use crate::models::snake::snake::Direction;

    fn arena_with_head_at(cell: Cell, direction: Direction) -> Arena {
        let config = ArenaConfig {
            columns: 13,
            rows: 13,
            initial_snake_length: 1,
            spawns: vec![SpawnPoint { cell, direction }],
        };
        Arena::new(config).unwrap()
    }

    #[test]
    fn observation_points_at_the_food() {
        // Head at (9,6), food seeded at (6,6): straight to the left.
        let arena = arena_with_head_at(Cell::new(9, 6), Direction::Left);
        let obs = Observation::collect(&arena, 0, 25.0).unwrap();
        assert!((obs.to_food.0 + 1.0).abs() < f32::EPSILON);
        assert!(obs.to_food.1.abs() < f32::EPSILON);
        assert!((obs.distance - 3.0).abs() < f32::EPSILON);
        assert!((obs.prev_distance - 25.0).abs() < f32::EPSILON);
        assert!((obs.heading.0 + 1.0).abs() < f32::EPSILON);
        // Heading left normalizes to angle 0.
        assert!(obs.heading_angle.abs() < f32::EPSILON);
    }

    #[test]
    fn observation_flattens_to_fixed_size() {
        let arena = arena_with_head_at(Cell::new(9, 6), Direction::Up);
        let obs = Observation::collect(&arena, 0, 0.0).unwrap();
        let vec: Vec<f32> = obs.into();
        assert_eq!(vec.len(), OBSERVATION_SIZE);
    }

    #[test]
    fn unknown_snake_has_no_observation() {
        let arena = arena_with_head_at(Cell::new(9, 6), Direction::Up);
        assert!(Observation::collect(&arena, 3, 0.0).is_none());
    }

    #[test]
    fn mask_forbids_stepping_into_the_wall() {
        let arena = arena_with_head_at(Cell::new(1, 6), Direction::Up);
        let mask = ActionMask::for_snake(&arena, 0);
        assert!(!mask.allows(SnakeAction::Left));
        assert!(mask.allows(SnakeAction::Right));
        assert!(mask.allows(SnakeAction::Up));
        assert!(mask.allows(SnakeAction::Down));
        assert!(mask.allows(SnakeAction::Noop));
    }

    #[test]
    fn corner_masks_two_actions() {
        let arena = arena_with_head_at(Cell::new(11, 11), Direction::Left);
        let mask = ActionMask::for_snake(&arena, 0);
        assert!(!mask.allows(SnakeAction::Right));
        assert!(!mask.allows(SnakeAction::Up));
        assert!(mask.allows(SnakeAction::Left));
        assert!(mask.allows(SnakeAction::Down));
        assert_eq!(mask.allowed_actions().len(), 3);
    }

    #[test]
    fn interior_cells_are_unmasked() {
        let arena = arena_with_head_at(Cell::new(6, 5), Direction::Up);
        let mask = ActionMask::for_snake(&arena, 0);
        assert_eq!(mask, ActionMask::permissive());
        assert_eq!(mask.as_vec(), vec![true; SnakeAction::VARIANTS.len()]);
    }
}
