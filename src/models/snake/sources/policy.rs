//! A source backed by a trained tabular policy.
use std::io;
use std::path::Path;

use log::{debug, info};
use rand::seq::SliceRandom;

use crate::models::snake::action_source::ActionSource;
use crate::models::snake::snake::SnakeAction;
use crate::rl::observation::{ActionMask, Observation};
use crate::rl::q_learning::{encode_state, newest_policy_file, PolicyError, QTable};

/// Greedy argmax over a learned Q-table, restricted to the unmasked
/// actions. States the table never visited fall back to a random legal
/// action rather than a fixed one, so an undertrained policy still moves.
#[derive(Debug)]
pub struct PolicySource {
    table: QTable,
}

impl PolicySource {
    #[must_use]
    pub fn new(table: QTable) -> Self {
        Self { table }
    }

    /// Loads the most recently saved policy in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the directory holds no policy file or
    /// the newest one cannot be read.
    pub fn from_newest_in(dir: &Path) -> Result<Self, PolicyError> {
        let path = newest_policy_file(dir).ok_or_else(|| {
            PolicyError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no policy file under {}", dir.display()),
            ))
        })?;
        info!("Loading policy from {path:?}");
        Ok(Self::new(QTable::load(&path)?))
    }
}

impl ActionSource for PolicySource {
    fn decide(&mut self, observation: &Observation, mask: &ActionMask) -> SnakeAction {
        let features: Vec<f32> = (*observation).into();
        let key = encode_state(&features, &mask.as_vec());
        if let Some(action) = self.table.best_masked_action(&key, &mask.as_vec()) {
            return action;
        }
        debug!("Policy has no entry for state {key}, moving randomly");
        mask.allowed_actions()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(SnakeAction::Noop)
    }
}
