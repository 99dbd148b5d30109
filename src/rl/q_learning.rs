//! Module for the tabular Q-learning trainer and its persisted policy.
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::snake::snake::SnakeAction;
use crate::rl::environment::Environment;

/// Size of the discrete action space.
pub const ACTION_COUNT: usize = SnakeAction::VARIANTS.len();

type Result<T> = std::result::Result<T, PolicyError>;

#[derive(Debug)]
pub enum PolicyError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::Io(e) => write!(f, "policy file io error: {e}"),
            PolicyError::Json(e) => write!(f, "policy file format error: {e}"),
        }
    }
}

impl std::error::Error for PolicyError {}

impl From<std::io::Error> for PolicyError {
    fn from(e: std::io::Error) -> Self {
        PolicyError::Io(e)
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(e: serde_json::Error) -> Self {
        PolicyError::Json(e)
    }
}

/// Discretizes a flattened observation plus its action mask into a compact
/// table key: the sign of each direction-to-food component, the heading
/// step, and the wall-danger flags. Distances are dropped on purpose; the
/// signs already say which way the food lies.
#[must_use]
pub fn encode_state(features: &[f32], mask: &[bool]) -> String {
    let bucket = |v: f32| -> i8 {
        if v > 0.05 {
            1
        } else if v < -0.05 {
            -1
        } else {
            0
        }
    };
    let fx = features.first().copied().map_or(0, bucket);
    let fy = features.get(1).copied().map_or(0, bucket);
    let hx = features.get(2).copied().map_or(0, bucket);
    let hy = features.get(3).copied().map_or(0, bucket);
    let danger = mask
        .iter()
        .fold(0u8, |bits, &allowed| (bits << 1) | u8::from(!allowed));
    format!("f{fx},{fy};h{hx},{hy};d{danger:02}")
}

/// Q-values per discretized state, serialized to JSON so a trained policy
/// survives the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QTable {
    entries: HashMap<String, [f32; ACTION_COUNT]>,
}

impl QTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Q-values for a state, zeros when the state was never visited.
    #[must_use]
    pub fn values(&self, key: &str) -> [f32; ACTION_COUNT] {
        self.entries.get(key).copied().unwrap_or([0.0; ACTION_COUNT])
    }

    fn values_mut(&mut self, key: &str) -> &mut [f32; ACTION_COUNT] {
        self.entries
            .entry(key.to_owned())
            .or_insert([0.0; ACTION_COUNT])
    }

    /// The highest-valued action among the mask-allowed ones, or `None`
    /// for a state the table has never seen.
    #[must_use]
    pub fn best_masked_action(&self, key: &str, mask: &[bool]) -> Option<SnakeAction> {
        let values = self.entries.get(key)?;
        SnakeAction::VARIANTS
            .iter()
            .copied()
            .filter(|a| mask.get(a.index()).copied().unwrap_or(true))
            .max_by(|a, b| values[a.index()].total_cmp(&values[b.index()]))
    }

    /// Writes the table as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads a table back from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Saves a policy under a timestamped filename so successive training runs
/// never clobber each other.
///
/// # Errors
///
/// Returns [`PolicyError`] when the directory or file cannot be written.
pub fn save_timestamped(table: &QTable, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = dir.join(format!("policy_{timestamp}.json"));
    table.save(&path)?;
    info!("Saved policy with {} states to {path:?}", table.len());
    Ok(path)
}

/// The most recently written policy file in a directory, going by the
/// lexicographically greatest timestamped name.
#[must_use]
pub fn newest_policy_file(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
        .max_by_key(|path| path.file_stem().map(std::ffi::OsStr::to_os_string))
}

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct QLearningConfig {
    pub episodes: usize,
    pub max_steps: usize,
    pub alpha: f32,
    pub gamma: f32,
    pub epsilon: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            episodes: 2000,
            max_steps: 500,
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.99,
            epsilon_decay: 0.999,
            epsilon_min: 0.05,
        }
    }
}

/// Epsilon-greedy tabular Q-learning over any environment with the snake
/// action alphabet.
#[derive(Debug)]
pub struct QTrainer {
    table: QTable,
    config: QLearningConfig,
    epsilon: f32,
}

impl QTrainer {
    #[must_use]
    pub fn new(config: QLearningConfig) -> Self {
        Self::with_table(QTable::new(), config)
    }

    /// Continues training an existing policy.
    #[must_use]
    pub fn with_table(table: QTable, config: QLearningConfig) -> Self {
        let epsilon = config.epsilon;
        Self {
            table,
            config,
            epsilon,
        }
    }

    #[must_use]
    pub fn table(&self) -> &QTable {
        &self.table
    }

    #[must_use]
    pub fn into_table(self) -> QTable {
        self.table
    }

    /// Runs the configured number of episodes against the environment,
    /// decaying epsilon after each one.
    pub fn train<E>(&mut self, env: &mut E)
    where
        E: Environment<Action = SnakeAction>,
    {
        let mut rng = rand::thread_rng();
        for episode in 0..self.config.episodes {
            let features: Vec<f32> = env.reset().into();
            let mut key = encode_state(&features, &env.action_mask());
            let mut total_reward = 0.0;
            let mut steps = 0usize;

            for _ in 0..self.config.max_steps {
                let mask = env.action_mask();
                let action = self.select_action(&key, &mask, &mut rng);
                let (next_state, reward, done) = env.step(&action);
                let next_features: Vec<f32> = next_state.into();
                let next_key = encode_state(&next_features, &env.action_mask());
                self.learn(&key, action, reward, &next_key, done);
                total_reward += reward;
                steps += 1;
                key = next_key;
                if done {
                    break;
                }
            }

            self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
            if (episode + 1) % 100 == 0 {
                info!(
                    "Episode {}: reward {total_reward:.2} over {steps} steps, epsilon {:.3}, {} states",
                    episode + 1,
                    self.epsilon,
                    self.table.len()
                );
            } else {
                debug!(
                    "Episode {}: reward {total_reward:.2} over {steps} steps",
                    episode + 1
                );
            }
        }
    }

    fn select_action<R: Rng>(&self, key: &str, mask: &[bool], rng: &mut R) -> SnakeAction {
        let allowed: Vec<SnakeAction> = SnakeAction::VARIANTS
            .iter()
            .copied()
            .filter(|a| mask.get(a.index()).copied().unwrap_or(true))
            .collect();
        if rng.gen::<f32>() < self.epsilon {
            return allowed.choose(rng).copied().unwrap_or(SnakeAction::Noop);
        }
        self.table
            .best_masked_action(key, mask)
            .or_else(|| allowed.choose(rng).copied())
            .unwrap_or(SnakeAction::Noop)
    }

    /// One temporal-difference backup.
    fn learn(&mut self, key: &str, action: SnakeAction, reward: f32, next_key: &str, done: bool) {
        let max_next = if done {
            0.0
        } else {
            self.table
                .values(next_key)
                .iter()
                .fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
        };
        let values = self.table.values_mut(key);
        let index = action.index();
        values[index] += self.config.alpha * (reward + self.config.gamma * max_next - values[index]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snake::arena::ArenaConfig;
    use crate::rl::snake_env::SnakeEnv;

    #[test]
    fn encoding_discretizes_food_direction_and_danger() {
        let toward_left = encode_state(&[-1.0, 0.0, -1.0, 0.0, 3.0, 4.0, 0.0], &[true; 5]);
        let toward_right = encode_state(&[1.0, 0.0, -1.0, 0.0, 3.0, 4.0, 0.0], &[true; 5]);
        assert_ne!(toward_left, toward_right);
        // Distance changes alone do not change the key.
        let closer = encode_state(&[-1.0, 0.0, -1.0, 0.0, 1.0, 2.0, 0.0], &[true; 5]);
        assert_eq!(toward_left, closer);
        let masked = encode_state(
            &[-1.0, 0.0, -1.0, 0.0, 3.0, 4.0, 0.0],
            &[false, true, true, true, true],
        );
        assert_ne!(toward_left, masked);
    }

    #[test]
    fn learning_moves_values_toward_rewards() {
        let mut trainer = QTrainer::new(QLearningConfig::default());
        trainer.learn("s", SnakeAction::Left, 1.0, "t", true);
        let values = trainer.table().values("s");
        assert!(values[SnakeAction::Left.index()] > 0.0);
        assert!(values[SnakeAction::Right.index()].abs() < f32::EPSILON);
    }

    #[test]
    fn best_masked_action_respects_the_mask() {
        let mut table = QTable::new();
        table.values_mut("s")[SnakeAction::Left.index()] = 5.0;
        table.values_mut("s")[SnakeAction::Up.index()] = 1.0;
        let mut mask = [true; ACTION_COUNT];
        mask[SnakeAction::Left.index()] = false;
        assert_eq!(table.best_masked_action("s", &mask), Some(SnakeAction::Up));
        assert_eq!(table.best_masked_action("unseen", &mask), None);
    }

    #[test]
    fn short_training_run_populates_the_table() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut env = SnakeEnv::new(ArenaConfig::single(8, 8)).unwrap();
        let mut trainer = QTrainer::new(QLearningConfig {
            episodes: 25,
            max_steps: 50,
            ..QLearningConfig::default()
        });
        trainer.train(&mut env);
        assert!(!trainer.table().is_empty());
    }

    #[test]
    fn table_survives_a_save_and_load() {
        let mut table = QTable::new();
        table.values_mut("f1,0;h-1,0;d00")[2] = 0.75;
        let dir = std::env::temp_dir().join(format!("snake_arena_qtable_{}", std::process::id()));
        let path = save_timestamped(&table, &dir).unwrap();
        let loaded = QTable::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!((loaded.values("f1,0;h-1,0;d00")[2] - 0.75).abs() < f32::EPSILON);
        assert_eq!(newest_policy_file(&dir), Some(path.clone()));
        let _ = fs::remove_file(path);
    }
}
