//! A scripted source that walks greedily toward the food.
use crate::models::snake::action_source::ActionSource;
use crate::models::snake::snake::{Direction, SnakeAction};
use crate::rl::observation::{ActionMask, Observation};

const EPS: f32 = 1e-3;

/// Greedy food chaser. Prefers closing the larger food-direction
/// component, keeps going when already pointed the right way, and falls
/// back to any unmasked orthogonal turn when the wall is dead ahead. It
/// only sees the observation, so it cannot avoid snake bodies; the
/// simulation's collision check is what actually ends its episodes.
#[derive(Debug, Default)]
pub struct HeuristicSource;

impl HeuristicSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn heading_of(observation: &Observation) -> Direction {
    if observation.heading.0 < -0.5 {
        Direction::Left
    } else if observation.heading.0 > 0.5 {
        Direction::Right
    } else if observation.heading.1 > 0.5 {
        Direction::Up
    } else {
        Direction::Down
    }
}

impl ActionSource for HeuristicSource {
    fn decide(&mut self, observation: &Observation, mask: &ActionMask) -> SnakeAction {
        let heading = heading_of(observation);
        let (dx, dy) = observation.to_food;

        let mut candidates: Vec<(f32, Direction)> = Vec::with_capacity(2);
        if dx > EPS {
            candidates.push((dx, Direction::Right));
        } else if dx < -EPS {
            candidates.push((-dx, Direction::Left));
        }
        if dy > EPS {
            candidates.push((dy, Direction::Up));
        } else if dy < -EPS {
            candidates.push((-dy, Direction::Down));
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, direction) in candidates {
            if direction == heading {
                // Already closing in on the food.
                return SnakeAction::Noop;
            }
            let action = SnakeAction::from(direction);
            if direction.is_horizontal() != heading.is_horizontal() && mask.allows(action) {
                return action;
            }
        }

        // No useful turn toward the food; keep straight while that is safe.
        if mask.allows(SnakeAction::from(heading)) {
            return SnakeAction::Noop;
        }
        for direction in [
            Direction::Left,
            Direction::Right,
            Direction::Up,
            Direction::Down,
        ] {
            let action = SnakeAction::from(direction);
            if direction.is_horizontal() != heading.is_horizontal() && mask.allows(action) {
                return action;
            }
        }
        SnakeAction::Noop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(to_food: (f32, f32), heading: (f32, f32)) -> Observation {
        Observation {
            to_food,
            heading,
            distance: 5.0,
            prev_distance: 5.0,
            heading_angle: 0.0,
        }
    }

    #[test]
    fn keeps_going_when_pointed_at_the_food() {
        let mut source = HeuristicSource::new();
        let obs = observation((-1.0, 0.0), (-1.0, 0.0));
        let action = source.decide(&obs, &ActionMask::permissive());
        assert_eq!(action, SnakeAction::Noop);
    }

    #[test]
    fn turns_toward_the_food_across_axes() {
        let mut source = HeuristicSource::new();
        // Food below, moving right: turn down.
        let obs = observation((0.0, -1.0), (1.0, 0.0));
        let action = source.decide(&obs, &ActionMask::permissive());
        assert_eq!(action, SnakeAction::Down);
    }

    #[test]
    fn prefers_the_larger_component() {
        let mut source = HeuristicSource::new();
        // Food mostly above, slightly right, while moving right: the
        // vertical turn dominates.
        let obs = observation((0.3, 0.95), (1.0, 0.0));
        let action = source.decide(&obs, &ActionMask::permissive());
        assert_eq!(action, SnakeAction::Up);
    }
}
