//! Module for the polymorphic action-source seam. One snake simulation
//! type takes its per-tick decision from any of these, whether that is a
//! human's buffered key presses, a scripted heuristic or a trained policy.
use super::snake::SnakeAction;
use super::sources::{heuristic::HeuristicSource, random::RandomSource};
use crate::rl::observation::{ActionMask, Observation};

/// Supplies one discrete action per tick. Implementations never touch the
/// arena; everything they may know arrives through the observation and the
/// mask.
pub trait ActionSource: Send {
    fn decide(&mut self, observation: &Observation, mask: &ActionMask) -> SnakeAction;
}

/// The known kinds of action source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSourceKind {
    Human,
    Heuristic,
    Random,
    Policy,
}

impl ActionSourceKind {
    pub const VALUES: [Self; 4] = [Self::Human, Self::Heuristic, Self::Random, Self::Policy];

    /// Builds a source for the kinds that need no external wiring. A
    /// [`ActionSourceKind::Human`] source needs its input channel and a
    /// [`ActionSourceKind::Policy`] source a loaded table, so the host
    /// builds those directly.
    #[must_use]
    pub fn make_source(&self) -> Option<Box<dyn ActionSource>> {
        match self {
            ActionSourceKind::Heuristic => Some(Box::new(HeuristicSource::new())),
            ActionSourceKind::Random => Some(Box::new(RandomSource::new())),
            ActionSourceKind::Human | ActionSourceKind::Policy => None,
        }
    }
}

impl std::fmt::Display for ActionSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionSourceKind::Human => write!(f, "Human Input"),
            ActionSourceKind::Heuristic => write!(f, "Greedy Heuristic"),
            ActionSourceKind::Random => write!(f, "Randomly Moving"),
            ActionSourceKind::Policy => write!(f, "Trained Policy"),
        }
    }
}
