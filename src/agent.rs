//! Tabular Q-learning agent.
//!
//! Training explores with uniformly random reveals and applies the one-step
//! update
//!
//! ```text
//! Q(s, a) += lr * (reward + discount * max_a' Q(s', a') - Q(s, a))
//! ```
//!
//! where `s` and `s'` are the [`LocalState`] around the revealed cell before
//! and after the step, and `a'` ranges over the cells still covered after it.
//! Queries rank covered cells greedily by their learned value.
//!
//! [`LocalState`]: crate::types::LocalState

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::environment::{Environment, Step, StepOutcome};
use crate::error::{Error, Result};
use crate::rng::GameRng;
use crate::table::{Action, SharedValueTable, ValueTable};
use crate::types::{Grid, Move};

/// Stream id mixed into `TrainingConfig::seed` so exploration never replays the
/// board generator's draws when both are seeded with the same value.
const EXPLORATION_STREAM: u64 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub learning_rate: f64,
    pub discount: f64,
    /// Save the snapshot every this many episodes, in addition to the final save.
    pub checkpoint_every: Option<usize>,
    /// Seed for the exploration policy.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            learning_rate: 0.1,
            discount: 0.9,
            checkpoint_every: None,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(Error::InvalidConfig(format!(
                "discount must be in [0, 1], got {}",
                self.discount
            )));
        }
        if self.checkpoint_every == Some(0) {
            return Err(Error::InvalidConfig("checkpoint interval must be positive".into()));
        }
        Ok(())
    }
}

/// Cooperative stop signal, checked between episodes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional side channels for a training run.
#[derive(Default)]
pub struct TrainingHooks<'a> {
    pub cancel: Option<&'a CancelToken>,
    /// Snapshot destination for checkpoints and the final save.
    pub snapshot: Option<&'a Path>,
    /// Receives a copy of the table at every checkpoint and at the end.
    pub shared: Option<&'a SharedValueTable>,
    /// Called after every episode with the running summary.
    pub on_episode: Option<&'a dyn Fn(&TrainingSummary)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_reward: f64,
    pub table_entries: usize,
    pub cancelled: bool,
}

pub struct Agent {
    table: ValueTable,
    rng: GameRng,
}

impl Agent {
    pub fn new() -> Self {
        Self::from_table(ValueTable::new())
    }

    pub fn from_table(table: ValueTable) -> Self {
        Self {
            table,
            rng: GameRng::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_table(ValueTable::load(path)?))
    }

    /// Replace the exploration / fallback RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: GameRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn into_table(self) -> ValueTable {
        self.table
    }

    /// Run `config.episodes` episodes against `env`, updating the table.
    ///
    /// Returns early, with `cancelled` set, when the cancel hook fires. The
    /// snapshot hook is written at every checkpoint and once at the end; a
    /// failed write aborts training.
    pub fn train(
        &mut self,
        env: &mut Environment,
        config: &TrainingConfig,
        hooks: &TrainingHooks<'_>,
    ) -> Result<TrainingSummary> {
        config.validate()?;
        if let Some(seed) = config.seed {
            self.rng = GameRng::from_seed_stream(seed, EXPLORATION_STREAM);
        }
        info!(
            episodes = config.episodes,
            learning_rate = config.learning_rate,
            discount = config.discount,
            "training started"
        );

        let mut summary = TrainingSummary::default();
        for episode in 0..config.episodes {
            if hooks.cancel.is_some_and(CancelToken::is_cancelled) {
                warn!(completed = episode, "training cancelled");
                summary.cancelled = true;
                break;
            }

            let (reward, outcome) = self.run_episode(env, config)?;
            summary.episodes += 1;
            summary.total_reward += reward;
            match outcome {
                StepOutcome::Cleared => summary.wins += 1,
                StepOutcome::Mine => summary.losses += 1,
                _ => {}
            }
            summary.table_entries = self.table.len();

            if let Some(cb) = hooks.on_episode {
                cb(&summary);
            }
            if summary.episodes % 1_000 == 0 {
                debug!(
                    episodes = summary.episodes,
                    wins = summary.wins,
                    entries = summary.table_entries,
                    "training progress"
                );
            }
            let due = config
                .checkpoint_every
                .is_some_and(|every| summary.episodes % every == 0);
            if due && summary.episodes < config.episodes {
                self.checkpoint(hooks)?;
                info!(episodes = summary.episodes, "checkpoint written");
            }
        }

        summary.table_entries = self.table.len();
        self.checkpoint(hooks)?;
        info!(
            episodes = summary.episodes,
            wins = summary.wins,
            losses = summary.losses,
            entries = summary.table_entries,
            "training finished"
        );
        Ok(summary)
    }

    fn checkpoint(&self, hooks: &TrainingHooks<'_>) -> Result<()> {
        if let Some(path) = hooks.snapshot {
            self.table.save(path)?;
        }
        if let Some(shared) = hooks.shared {
            shared.publish(self.table.clone());
        }
        Ok(())
    }

    /// Play one episode with random reveals; returns total reward and the final outcome.
    fn run_episode(
        &mut self,
        env: &mut Environment,
        config: &TrainingConfig,
    ) -> Result<(f64, StepOutcome)> {
        let mut observation = env.reset()?;
        let mut candidates: Vec<Action> = Vec::new();
        let mut total = 0.0;

        loop {
            candidates.clear();
            candidates.extend(observation.covered_cells());
            let Some((row, col)) = self.rng.choose(&candidates) else {
                return Err(Error::NoCandidateMoves);
            };
            let step = self.learn_step(env, &observation, (row, col), config)?;

            total += step.reward;
            if step.terminal {
                return Ok((total, step.outcome));
            }
            observation = step.observation;
        }
    }

    /// Reveal `action` in `env` and apply one Q update to the pair keyed by the
    /// local state of `observation`, the grid the move was chosen from.
    fn learn_step(
        &mut self,
        env: &mut Environment,
        observation: &Grid,
        action: Action,
        config: &TrainingConfig,
    ) -> Result<Step> {
        let (row, col) = action;
        let before = observation.local_state(row, col);
        let step = env.step(row, col)?;
        let after = step.observation.local_state(row, col);

        let best_next = self.table.best_value(after, step.observation.covered_cells());
        let target = step.reward + config.discount * best_next;
        self.table.update(before, action, target, config.learning_rate);
        Ok(step)
    }

    /// Greedy move for `grid`; see [`recommend_with`].
    pub fn recommend(&mut self, grid: &Grid) -> Result<Move> {
        recommend_with(&self.table, grid, &mut self.rng)
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

/// Reveal the covered cell with the highest learned value.
///
/// Unseen pairs count as 0 and the first maximum in row-major order wins.
/// An empty table has nothing to rank, so a uniformly random covered cell is
/// returned instead.
pub fn recommend_with(table: &ValueTable, grid: &Grid, rng: &mut GameRng) -> Result<Move> {
    let candidates: Vec<Action> = grid.covered_cells().collect();
    if candidates.is_empty() {
        return Err(Error::NoCandidateMoves);
    }

    let (row, col) = if table.is_empty() {
        rng.choose(&candidates).ok_or(Error::NoCandidateMoves)?
    } else {
        let mut best = candidates[0];
        let mut best_value = f64::NEG_INFINITY;
        for &(row, col) in &candidates {
            let value = table.get(grid.local_state(row, col), (row, col));
            if value > best_value {
                best = (row, col);
                best_value = value;
            }
        }
        best
    };
    Ok(Move::reveal(row, col))
}
