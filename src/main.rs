use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use snake_arena::models::snake::action_source::{ActionSource, ActionSourceKind};
use snake_arena::models::snake::arena::{ArenaConfig, ArenaEvent};
use snake_arena::models::snake::sources::heuristic::HeuristicSource;
use snake_arena::models::snake::sources::policy::PolicySource;
use snake_arena::rl::q_learning::{
    newest_policy_file, save_timestamped, QLearningConfig, QTable, QTrainer,
};
use snake_arena::rl::snake_env::SnakeEnv;
use snake_arena::runtime::session::MatchSession;

#[derive(Parser)]
#[command(name = "snake_arena")]
#[command(version, about = "Grid snake with a trainable agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch one heuristic snake play a match to its end.
    Demo {
        #[arg(long, default_value = "13")]
        columns: usize,
        #[arg(long, default_value = "13")]
        rows: usize,
    },
    /// Heuristic snake versus the newest trained policy in one arena.
    Duel {
        #[arg(long, default_value = "13")]
        columns: usize,
        #[arg(long, default_value = "13")]
        rows: usize,
        /// Directory holding trained policy files.
        #[arg(long, default_value = "trained_policies")]
        policies: PathBuf,
    },
    /// Train the tabular policy and save it under a timestamped name.
    Train {
        #[arg(long, default_value = "2000")]
        episodes: usize,
        #[arg(long, default_value = "13")]
        columns: usize,
        #[arg(long, default_value = "13")]
        rows: usize,
        #[arg(long, default_value = "trained_policies")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "snake_arena=info");
    }
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Demo { columns, rows } => run_demo(columns, rows).await,
        Command::Duel {
            columns,
            rows,
            policies,
        } => run_duel(columns, rows, &policies).await,
        Command::Train {
            episodes,
            columns,
            rows,
            out,
        } => run_training(episodes, columns, rows, &out),
    }
}

async fn run_demo(columns: usize, rows: usize) -> Result<()> {
    info!(
        "Starting a {columns}x{rows} demo match driven by a {} source",
        ActionSourceKind::Heuristic
    );
    let source = ActionSourceKind::Heuristic
        .make_source()
        .expect("the heuristic source needs no wiring");
    let (session, events) = MatchSession::spawn(ArenaConfig::single(columns, rows), vec![source])?;
    relay_events(events).await;
    session.join().await;
    Ok(())
}

async fn run_duel(columns: usize, rows: usize, policies: &Path) -> Result<()> {
    let player: Box<dyn ActionSource> = Box::new(HeuristicSource::new());
    let opponent: Box<dyn ActionSource> = match PolicySource::from_newest_in(policies) {
        Ok(policy) => Box::new(policy),
        Err(e) => {
            warn!("No usable policy ({e}), the opponent plays the heuristic too");
            Box::new(HeuristicSource::new())
        }
    };
    let (session, events) =
        MatchSession::spawn(ArenaConfig::duel(columns, rows), vec![player, opponent])?;
    relay_events(events).await;
    session.join().await;
    Ok(())
}

fn run_training(episodes: usize, columns: usize, rows: usize, out: &Path) -> Result<()> {
    let mut env = SnakeEnv::new(ArenaConfig::single(columns, rows))?;
    let table = match newest_policy_file(out) {
        Some(path) => {
            info!("Continuing training from {path:?}");
            QTable::load(&path)?
        }
        None => QTable::new(),
    };
    let mut trainer = QTrainer::with_table(
        table,
        QLearningConfig {
            episodes,
            ..QLearningConfig::default()
        },
    );
    trainer.train(&mut env);
    let path = save_timestamped(trainer.table(), out)?;
    info!("Training done, policy at {}", path.display());
    Ok(())
}

/// The stand-in for a host UI: score text, stage changes and the game-over
/// screen all reduce to log lines here.
async fn relay_events(mut events: UnboundedReceiver<ArenaEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ArenaEvent::FoodEaten { snake, new_score } => {
                info!("Snake {snake} ate, score is now {new_score}");
            }
            ArenaEvent::StageAdvanced { new_interval } => {
                info!("Speeding up, moves now every {new_interval:.4}s");
            }
            ArenaEvent::Collision { snake, cause } => {
                info!("Snake {snake} is out: {cause:?}");
            }
            ArenaEvent::PlacementExhausted { cell } => {
                warn!("Board nearly full, food fell back to occupied cell {cell:?}");
            }
        }
    }
}
