//! A source fed by buffered key presses from the host.
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::snake::action_source::ActionSource;
use crate::models::snake::snake::SnakeAction;
use crate::rl::observation::{ActionMask, Observation};

/// Relays whatever input device the host polls into the simulation. Any
/// number of requests may arrive between two ticks; only the most recent
/// one survives, matching the direction buffer's own semantics.
#[derive(Debug)]
pub struct HumanSource {
    receiver: UnboundedReceiver<SnakeAction>,
}

impl HumanSource {
    /// Builds the source and the sender half the host pushes actions into.
    #[must_use]
    pub fn new() -> (Self, UnboundedSender<SnakeAction>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver }, sender)
    }
}

impl ActionSource for HumanSource {
    fn decide(&mut self, _observation: &Observation, _mask: &ActionMask) -> SnakeAction {
        let mut latest = SnakeAction::Noop;
        while let Ok(action) = self.receiver.try_recv() {
            latest = action;
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_observation() -> Observation {
        Observation {
            to_food: (0.0, 0.0),
            heading: (-1.0, 0.0),
            distance: 0.0,
            prev_distance: 0.0,
            heading_angle: 0.0,
        }
    }

    #[test]
    fn keeps_only_the_latest_request() {
        let (mut source, sender) = HumanSource::new();
        sender.send(SnakeAction::Up).unwrap();
        sender.send(SnakeAction::Left).unwrap();
        sender.send(SnakeAction::Down).unwrap();
        let action = source.decide(&dummy_observation(), &ActionMask::permissive());
        assert_eq!(action, SnakeAction::Down);
    }

    #[test]
    fn idle_input_means_noop() {
        let (mut source, _sender) = HumanSource::new();
        let action = source.decide(&dummy_observation(), &ActionMask::permissive());
        assert_eq!(action, SnakeAction::Noop);
    }
}
