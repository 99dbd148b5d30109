//! Reinforcement-learning surface: the environment contract, the
//! observation/mask builders, the arena-backed environment and a tabular
//! Q-learning trainer.
pub mod environment;
pub mod observation;
pub mod q_learning;
pub mod snake_env;
