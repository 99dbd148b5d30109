//! Module wrapping an arena as a single-agent RL environment.
use log::{error, warn};

use crate::models::snake::arena::{Arena, ArenaConfig, ArenaError, SnakeId};
use crate::models::snake::snake::{ActionError, SnakeAction, StepOutcome};
use crate::rl::environment::Environment;
use crate::rl::observation::{ActionMask, Observation};

/// Reward for reaching the food tile.
pub const FOOD_REWARD: f32 = 0.2;
/// Shaping reward for a step that does not move away from the food.
pub const SHAPING_REWARD: f32 = 0.01;
/// Reward for a terminal collision.
pub const COLLISION_PENALTY: f32 = -1.0;

type Result<T> = std::result::Result<T, ActionError>;

/// One trainable snake in its own arena. Tracks the per-episode
/// accumulator state (cumulative reward, step counter, terminal flag) and
/// the previous distance-to-food baseline the shaping reward compares
/// against.
#[derive(Debug)]
pub struct SnakeEnv {
    arena: Arena,
    agent: SnakeId,
    prev_distance: f32,
    episode_reward: f32,
    steps: u32,
    terminal: bool,
}

impl SnakeEnv {
    /// Builds the environment around the first configured snake. Extra
    /// snakes stay inert; training against moving opponents is a matter of
    /// ticking them from the session, not of this environment.
    ///
    /// # Errors
    ///
    /// Propagates [`ArenaError`] for invalid arena configurations.
    pub fn new(config: ArenaConfig) -> std::result::Result<Self, ArenaError> {
        if config.spawns.len() > 1 {
            warn!(
                "Environment built with {} snakes, training only the first",
                config.spawns.len()
            );
        }
        let arena = Arena::new(config)?;
        let mut env = Self {
            arena,
            agent: 0,
            prev_distance: 0.0,
            episode_reward: 0.0,
            steps: 0,
            terminal: false,
        };
        env.prev_distance = env.distance_to_food();
        Ok(env)
    }

    /// The current observation. Pure.
    #[must_use]
    pub fn observe(&self) -> Observation {
        Observation::collect(&self.arena, self.agent, self.prev_distance).unwrap_or(Observation {
            to_food: (0.0, 0.0),
            heading: (0.0, 0.0),
            distance: 0.0,
            prev_distance: 0.0,
            heading_angle: 0.0,
        })
    }

    /// The wall-adjacency mask for the trained snake.
    #[must_use]
    pub fn mask(&self) -> ActionMask {
        ActionMask::for_snake(&self.arena, self.agent)
    }

    /// Applies one discrete action and runs one tick.
    ///
    /// Rewards: [`FOOD_REWARD`] for eating, [`COLLISION_PENALTY`] for a
    /// terminal collision, and [`SHAPING_REWARD`] for any successful step
    /// that does not increase the distance to the food (moving away earns
    /// zero, not a penalty).
    pub fn step_action(&mut self, action: SnakeAction) -> (Observation, f32, bool) {
        if self.terminal {
            error!("Stepped the environment past the end of the episode");
            return (self.observe(), 0.0, true);
        }
        if let Err(e) = self.arena.buffer_action(self.agent, action) {
            error!("Could not buffer action for the agent: {e}");
        }
        let outcome = match self.arena.step_snake(self.agent) {
            Ok(report) => report.outcome,
            Err(e) => {
                error!("Environment tick failed: {e}");
                self.terminal = true;
                return (self.observe(), 0.0, true);
            }
        };
        let reward = match outcome {
            StepOutcome::Collided(_) => {
                self.terminal = true;
                COLLISION_PENALTY
            }
            StepOutcome::Ate => {
                // Reaching the food closed the distance to zero, so the
                // shaping reward applies on top of the food reward. The
                // baseline restarts against the relocated food tile.
                self.prev_distance = self.distance_to_food();
                SHAPING_REWARD + FOOD_REWARD
            }
            StepOutcome::Moved => {
                let distance = self.distance_to_food();
                let reward = if distance <= self.prev_distance {
                    SHAPING_REWARD
                } else {
                    0.0
                };
                self.prev_distance = distance;
                reward
            }
        };
        self.episode_reward += reward;
        self.steps += 1;
        (self.observe(), reward, self.terminal)
    }

    /// Decodes and applies a raw discrete action value.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidAction`] for values outside the
    /// action set; the simulation state is left untouched in that case.
    pub fn step_index(&mut self, index: usize) -> Result<(Observation, f32, bool)> {
        let action = SnakeAction::from_index(index)?;
        Ok(self.step_action(action))
    }

    /// Starts a fresh episode: arena reset, reward accumulator and step
    /// counter zeroed, distance baseline reinitialized, terminal cleared.
    pub fn reset_episode(&mut self) -> Observation {
        self.arena.reset();
        self.prev_distance = self.distance_to_food();
        self.episode_reward = 0.0;
        self.steps = 0;
        self.terminal = false;
        self.observe()
    }

    #[must_use]
    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    fn distance_to_food(&self) -> f32 {
        match (
            self.arena.head_position(self.agent),
            self.arena.food_position(),
        ) {
            (Some(head), Some(food)) => {
                let dx = (food.x - head.x) as f32;
                let dy = (food.y - head.y) as f32;
                (dx * dx + dy * dy).sqrt()
            }
            _ => {
                error!("Distance to food requested without a head or food cell");
                0.0
            }
        }
    }
}

impl Environment for SnakeEnv {
    type State = Observation;
    type Action = SnakeAction;

    fn reset(&mut self) -> Self::State {
        self.reset_episode()
    }

    fn step(&mut self, action: &Self::Action) -> (Self::State, f32, bool) {
        self.step_action(*action)
    }

    fn action_mask(&self) -> Vec<bool> {
        self.mask().as_vec()
    }

    fn all_actions() -> Vec<Self::Action> {
        SnakeAction::VARIANTS.to_vec()
    }

    fn action_to_index(action: &Self::Action) -> usize {
        action.index()
    }
}
