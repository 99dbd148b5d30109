//! Module for the cancellable tick scheduler driving a snake's cadence.
use std::time::Duration;

use log::{debug, error};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time;

use crate::models::snake::arena::SnakeId;

#[derive(Debug, Clone, Copy)]
pub enum SchedulerCommand {
    /// Replace the tick cadence. Takes effect on the next tick; the
    /// pending sleep is cancelled, never fired retroactively.
    Reschedule(Duration),
    Stop,
}

/// Emits one tick message per interval for one snake. A single select
/// loop owns both the timer and the command channel, so a reschedule can
/// never interleave with a tick half-way.
#[derive(Debug)]
pub struct TickScheduler {
    handle: JoinHandle<()>,
    commands: UnboundedSender<SchedulerCommand>,
}

impl TickScheduler {
    /// Starts ticking `snake` every `interval`. Must be called from within
    /// a tokio runtime.
    #[must_use]
    pub fn spawn(snake: SnakeId, interval: Duration, ticks: UnboundedSender<SnakeId>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::run(snake, interval, ticks, receiver));
        Self { handle, commands }
    }

    async fn run(
        snake: SnakeId,
        mut interval: Duration,
        ticks: UnboundedSender<SnakeId>,
        mut commands: UnboundedReceiver<SchedulerCommand>,
    ) {
        loop {
            tokio::select! {
                () = time::sleep(interval) => {
                    if ticks.send(snake).is_err() {
                        debug!("Tick receiver for snake {snake} is gone, scheduler stopping");
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(SchedulerCommand::Reschedule(new_interval)) => {
                        debug!("Snake {snake} rescheduled from {interval:?} to {new_interval:?}");
                        interval = new_interval;
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        debug!("Scheduler for snake {snake} stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Speeds up (or slows down) the cadence starting with the next tick.
    pub fn reschedule(&self, interval: Duration) {
        if let Err(e) = self.commands.send(SchedulerCommand::Reschedule(interval)) {
            error!("Could not reschedule: {e}");
        }
    }

    /// Asks the scheduler to stop. Idempotent; late calls hit a closed
    /// channel and are ignored.
    pub fn stop(&self) {
        let _ = self.commands.send(SchedulerCommand::Stop);
    }

    /// Stops the scheduler and waits briefly for the task to finish,
    /// aborting it if it does not.
    pub async fn shutdown(mut self) {
        self.stop();
        match time::timeout(Duration::from_millis(500), &mut self.handle).await {
            Ok(Ok(())) => (),
            Ok(Err(e)) => error!("Scheduler task failed: {e}"),
            Err(_) => {
                error!("Scheduler did not stop in time, aborting");
                self.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_arrive_at_the_configured_cadence() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let scheduler = TickScheduler::spawn(3, Duration::from_millis(5), tick_tx);
        let id = time::timeout(Duration::from_secs(2), tick_rx.recv())
            .await
            .expect("no tick arrived")
            .expect("tick channel closed");
        assert_eq!(id, 3);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn stop_ends_the_tick_stream() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let scheduler = TickScheduler::spawn(0, Duration::from_millis(5), tick_tx);
        scheduler.shutdown().await;
        // Drain whatever was in flight; the stream must end.
        let closed = time::timeout(Duration::from_secs(2), async {
            while tick_rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn reschedule_applies_to_the_next_tick() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        // Start glacially slow, then reschedule fast: a tick arriving
        // promptly proves the pending sleep was cancelled.
        let scheduler = TickScheduler::spawn(0, Duration::from_secs(600), tick_tx);
        scheduler.reschedule(Duration::from_millis(5));
        let tick = time::timeout(Duration::from_secs(2), tick_rx.recv()).await;
        assert!(tick.is_ok());
        scheduler.shutdown().await;
    }
}
