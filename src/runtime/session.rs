//! Module for the match session: one task owning the arena, its action
//! sources and the per-snake schedulers. Every arena mutation flows
//! through this task's channel, which is what serializes food relocation
//! and all other tick side effects across snakes.
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::models::snake::action_source::ActionSource;
use crate::models::snake::arena::{Arena, ArenaConfig, ArenaError, ArenaEvent, SnakeId};
use crate::models::snake::grid::Cell;
use crate::models::snake::snake::SnakeAction;
use crate::rl::observation::{ActionMask, Observation};
use crate::runtime::scheduler::TickScheduler;

type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Arena(ArenaError),
    /// Every snake needs exactly one action source.
    SourceCountMismatch { snakes: usize, sources: usize },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Arena(e) => write!(f, "{e}"),
            SessionError::SourceCountMismatch { snakes, sources } => {
                write!(f, "{snakes} snakes but {sources} action sources")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ArenaError> for SessionError {
    fn from(e: ArenaError) -> Self {
        SessionError::Arena(e)
    }
}

/// Commands a host can send into a running match.
#[derive(Debug)]
pub enum SessionCommand {
    /// Queue a direction request for one snake, the human input path.
    BufferAction { snake: SnakeId, action: SnakeAction },
    /// Ask for a copy of the observable match state.
    Snapshot(oneshot::Sender<MatchSnapshot>),
    Stop,
}

/// Read-only view of the match, for host-side rendering and UI.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    /// Per snake, head first.
    pub bodies: Vec<Vec<Cell>>,
    pub food: Option<Cell>,
    pub score: u32,
    pub stage: u32,
    pub turn_interval: f32,
    pub over: bool,
}

/// Handle to a running match. Dropping it does not stop the match; use
/// [`MatchSession::shutdown`] or let it end on its own terminal collision.
#[derive(Debug)]
pub struct MatchSession {
    handle: JoinHandle<()>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl MatchSession {
    /// Builds the arena and starts the match task plus one scheduler per
    /// snake, each ticking at the stage controller's current interval.
    /// Returns the session handle and the event stream the host subscribes
    /// to. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the arena configuration is invalid or
    /// the source count does not match the snake count.
    pub fn spawn(
        config: ArenaConfig,
        sources: Vec<Box<dyn ActionSource>>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ArenaEvent>)> {
        let arena = Arena::new(config)?;
        if sources.len() != arena.snake_count() {
            return Err(SessionError::SourceCountMismatch {
                snakes: arena.snake_count(),
                sources: sources.len(),
            });
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let interval = Duration::from_secs_f32(arena.turn_interval());
        let schedulers: Vec<TickScheduler> = (0..arena.snake_count())
            .map(|id| TickScheduler::spawn(id, interval, tick_tx.clone()))
            .collect();
        let handle = tokio::spawn(Self::run(
            arena,
            sources,
            schedulers,
            tick_rx,
            command_rx,
            event_tx,
        ));
        Ok((
            Self {
                handle,
                commands: command_tx,
            },
            event_rx,
        ))
    }

    async fn run(
        mut arena: Arena,
        mut sources: Vec<Box<dyn ActionSource>>,
        schedulers: Vec<TickScheduler>,
        mut ticks: mpsc::UnboundedReceiver<SnakeId>,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        events: mpsc::UnboundedSender<ArenaEvent>,
    ) {
        let mut prev_distance: Vec<f32> = (0..arena.snake_count())
            .map(|id| distance_to_food(&arena, id))
            .collect();
        loop {
            tokio::select! {
                tick = ticks.recv() => {
                    let Some(id) = tick else {
                        break;
                    };
                    // A late tick may arrive after the collision stopped
                    // this snake's scheduler.
                    if !arena.is_snake_active(id) {
                        continue;
                    }
                    Self::run_tick(&mut arena, &mut sources, &schedulers, &events, &mut prev_distance, id);
                    if arena.is_over() {
                        debug!("Every snake has terminated, ending the match");
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(SessionCommand::BufferAction { snake, action }) => {
                        if let Err(e) = arena.buffer_action(snake, action) {
                            warn!("Dropping buffered action: {e}");
                        }
                    }
                    Some(SessionCommand::Snapshot(reply)) => {
                        let _ = reply.send(Self::snapshot_of(&arena));
                    }
                    Some(SessionCommand::Stop) | None => {
                        debug!("Match session stopping on command");
                        break;
                    }
                }
            }
        }
        for scheduler in schedulers {
            scheduler.shutdown().await;
        }
    }

    /// One full decision-action-resolution cycle for one snake.
    fn run_tick(
        arena: &mut Arena,
        sources: &mut [Box<dyn ActionSource>],
        schedulers: &[TickScheduler],
        events: &mpsc::UnboundedSender<ArenaEvent>,
        prev_distance: &mut [f32],
        id: SnakeId,
    ) {
        if let Some(observation) = Observation::collect(arena, id, prev_distance[id]) {
            let mask = ActionMask::for_snake(arena, id);
            let action = sources[id].decide(&observation, &mask);
            if let Err(e) = arena.buffer_action(id, action) {
                error!("Could not buffer decision for snake {id}: {e}");
            }
        }
        match arena.step_snake(id) {
            Ok(report) => {
                prev_distance[id] = distance_to_food(arena, id);
                for event in report.events {
                    match event {
                        ArenaEvent::StageAdvanced { new_interval } => {
                            let cadence = Duration::from_secs_f32(new_interval);
                            for scheduler in schedulers {
                                scheduler.reschedule(cadence);
                            }
                        }
                        ArenaEvent::Collision { snake, .. } => {
                            schedulers[snake].stop();
                        }
                        ArenaEvent::FoodEaten { .. } | ArenaEvent::PlacementExhausted { .. } => {}
                    }
                    if events.send(event).is_err() {
                        debug!("Event subscriber is gone");
                    }
                }
            }
            Err(e) => error!("Tick for snake {id} failed: {e}"),
        }
    }

    fn snapshot_of(arena: &Arena) -> MatchSnapshot {
        MatchSnapshot {
            bodies: (0..arena.snake_count())
                .filter_map(|id| arena.body_cells(id))
                .collect(),
            food: arena.food_position(),
            score: arena.score(),
            stage: arena.stage(),
            turn_interval: arena.turn_interval(),
            over: arena.is_over(),
        }
    }

    /// Queues a direction request for one snake, as a host input layer
    /// would on a key press.
    pub fn buffer_action(&self, snake: SnakeId, action: SnakeAction) {
        if let Err(e) = self
            .commands
            .send(SessionCommand::BufferAction { snake, action })
        {
            warn!("Match is gone, dropping input: {e}");
        }
    }

    /// Fetches a copy of the observable match state, or `None` once the
    /// match has ended.
    pub async fn snapshot(&self) -> Option<MatchSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Snapshot(reply_tx))
            .ok()?;
        reply_rx.await.ok()
    }

    /// Whether the match task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the match to end on its own (all snakes terminated).
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("Match task failed: {e}");
        }
    }

    /// Stops the match and waits briefly for the task to wind down,
    /// aborting it if it does not.
    pub async fn shutdown(mut self) {
        if self.commands.send(SessionCommand::Stop).is_err() {
            debug!("Match already ended");
        }
        match time::timeout(Duration::from_secs(2), &mut self.handle).await {
            Ok(Ok(())) => (),
            Ok(Err(e)) => error!("Match task failed: {e}"),
            Err(_) => {
                error!("Match did not stop in time, aborting");
                self.handle.abort();
            }
        }
    }
}

fn distance_to_food(arena: &Arena, id: SnakeId) -> f32 {
    match (arena.head_position(id), arena.food_position()) {
        (Some(head), Some(food)) => {
            let dx = (food.x - head.x) as f32;
            let dy = (food.y - head.y) as f32;
            (dx * dx + dy * dy).sqrt()
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snake::arena::SpawnPoint;
    use crate::models::snake::snake::{CollisionCause, Direction};
    use crate::models::snake::sources::heuristic::HeuristicSource;
    use crate::models::snake::sources::human::HumanSource;

    fn wall_facing_config() -> ArenaConfig {
        ArenaConfig {
            columns: 13,
            rows: 13,
            initial_snake_length: 2,
            spawns: vec![SpawnPoint {
                cell: Cell::new(1, 6),
                direction: Direction::Left,
            }],
        }
    }

    #[tokio::test]
    async fn collision_ends_the_match_and_the_event_stream() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (session, mut events) = MatchSession::spawn(
            wall_facing_config(),
            vec![Box::new(HumanSource::new().0)],
        )
        .unwrap();

        // The human source stays silent, so the first tick drives the
        // snake straight into the wall.
        let event = time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no event before timeout")
            .expect("event stream closed early");
        assert!(matches!(
            event,
            ArenaEvent::Collision {
                snake: 0,
                cause: CollisionCause::Wall
            }
        ));
        session.join().await;
    }

    #[tokio::test]
    async fn snapshot_and_stop_work_before_any_tick() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = ArenaConfig::single(13, 13);
        let (session, _events) =
            MatchSession::spawn(config, vec![Box::new(HeuristicSource::new())]).unwrap();

        let snapshot = session.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.bodies.len(), 1);
        assert_eq!(snapshot.food, Some(Cell::new(6, 6)));
        assert!(!snapshot.over);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn source_count_must_match_snake_count() {
        let result = MatchSession::spawn(ArenaConfig::duel(13, 13), Vec::new());
        assert!(matches!(
            result,
            Err(SessionError::SourceCountMismatch {
                snakes: 2,
                sources: 0
            })
        ));
    }
}
