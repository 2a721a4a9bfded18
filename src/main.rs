use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sweep_engine::gateway::{self, MessageResponse, MoveResponse};
use sweep_engine::{
    probability, solver, Agent, EnvConfig, Environment, Grid, Move, NeighborCache,
    TrainingConfig, TrainingHooks, TrainingSummary,
};

#[derive(Debug, Parser)]
#[command(name = "sweep", about = "Minesweeper move inference and Q-learning training")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Deterministic move from the counting rules
    Solve {
        /// JSON grid file, or `-` for stdin
        grid: PathBuf,
    },
    /// Reveal the covered cell with the lowest estimated mine probability
    Estimate {
        /// JSON grid file, or `-` for stdin
        grid: PathBuf,
    },
    /// Greedy move from a trained value table
    Recommend {
        /// Value table snapshot written by `train`
        #[arg(long)]
        table: PathBuf,
        /// JSON grid file, or `-` for stdin
        grid: PathBuf,
    },
    /// Train the Q-learning agent and write its value table
    Train {
        #[arg(long, default_value_t = TrainingConfig::default().episodes)]
        episodes: usize,
        #[arg(long, default_value_t = TrainingConfig::default().learning_rate)]
        learning_rate: f64,
        #[arg(long, default_value_t = TrainingConfig::default().discount)]
        discount: f64,
        #[arg(long, default_value_t = EnvConfig::default().rows)]
        rows: usize,
        #[arg(long, default_value_t = EnvConfig::default().cols)]
        cols: usize,
        #[arg(long, default_value_t = EnvConfig::default().bombs)]
        bombs: usize,
        /// Reveal whole zero regions in one step
        #[arg(long)]
        cascade: bool,
        /// Also write the snapshot every N episodes
        #[arg(long)]
        checkpoint_every: Option<usize>,
        /// Seed for board generation and exploration
        #[arg(long)]
        seed: Option<u64>,
        /// Snapshot output path
        #[arg(short, long)]
        out: PathBuf,
        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sweep_engine=info".parse()?),
        )
        .init();

    let args = Args::parse();
    match args.cmd {
        Cmd::Solve { grid } => {
            let grid = read_grid(&grid)?;
            let nc = NeighborCache::for_grid(&grid);
            print_move(solver::solve(&grid, &nc)?)
        }
        Cmd::Estimate { grid } => {
            let grid = read_grid(&grid)?;
            let nc = NeighborCache::for_grid(&grid);
            print_move(probability::safest_move(&grid, &nc)?)
        }
        Cmd::Recommend { table, grid } => {
            let grid = read_grid(&grid)?;
            let mut agent = Agent::load(&table)
                .with_context(|| format!("loading value table {}", table.display()))?;
            print_move(agent.recommend(&grid)?)
        }
        Cmd::Train {
            episodes,
            learning_rate,
            discount,
            rows,
            cols,
            bombs,
            cascade,
            checkpoint_every,
            seed,
            out,
            quiet,
        } => {
            let env_config = EnvConfig {
                rows,
                cols,
                bombs,
                cascade,
            };
            let config = TrainingConfig {
                episodes,
                learning_rate,
                discount,
                checkpoint_every,
                seed,
            };
            let summary = train(env_config, &config, &out, quiet)?;
            let message = format!(
                "Trained {} episodes ({} won, {} lost), {} table entries written to {}",
                summary.episodes,
                summary.wins,
                summary.losses,
                summary.table_entries,
                out.display()
            );
            println!("{}", serde_json::to_string(&MessageResponse { message })?);
            Ok(())
        }
    }
}

fn train(
    env_config: EnvConfig,
    config: &TrainingConfig,
    out: &Path,
    quiet: bool,
) -> anyhow::Result<TrainingSummary> {
    let mut env = match config.seed {
        Some(seed) => Environment::with_seed(env_config, seed)?,
        None => Environment::new(env_config)?,
    };
    let mut agent = Agent::new();

    let pb = if !quiet {
        let pb = ProgressBar::new(config.episodes as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} | {msg}",
            )?
            .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        Some(pb)
    } else {
        None
    };

    let report = |s: &TrainingSummary| {
        if let Some(pb) = &pb {
            pb.set_position(s.episodes as u64);
            if s.episodes % 100 == 0 {
                pb.set_message(format!("wins: {} | entries: {}", s.wins, s.table_entries));
            }
        }
    };
    let hooks = TrainingHooks {
        snapshot: Some(out),
        on_episode: Some(&report),
        ..TrainingHooks::default()
    };

    let summary = agent
        .train(&mut env, config, &hooks)
        .with_context(|| format!("training into {}", out.display()))?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(summary)
}

fn read_grid(path: &Path) -> anyhow::Result<Grid> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("reading grid {}", path.display()))?
    };
    Ok(gateway::parse_grid_json(&text)?)
}

fn print_move(m: Move) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(&MoveResponse::from(m))?);
    Ok(())
}
