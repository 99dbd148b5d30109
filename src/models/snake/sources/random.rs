//! A source that picks uniformly among the unmasked actions.
use rand::seq::SliceRandom;

use crate::models::snake::action_source::ActionSource;
use crate::models::snake::snake::SnakeAction;
use crate::rl::observation::{ActionMask, Observation};

/// Baseline opponent and exploration stand-in for tests.
#[derive(Debug, Default)]
pub struct RandomSource;

impl RandomSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ActionSource for RandomSource {
    fn decide(&mut self, _observation: &Observation, mask: &ActionMask) -> SnakeAction {
        mask.allowed_actions()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(SnakeAction::Noop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_the_mask() {
        let mut source = RandomSource::new();
        let obs = Observation {
            to_food: (0.0, 0.0),
            heading: (1.0, 0.0),
            distance: 0.0,
            prev_distance: 0.0,
            heading_angle: 0.0,
        };
        let mask = ActionMask::permissive();
        for _ in 0..20 {
            let action = source.decide(&obs, &mask);
            assert!(mask.allows(action));
        }
    }
}
