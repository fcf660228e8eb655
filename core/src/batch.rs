//! Batch runner: partitions simulations across workers and collects shards.
//!
//! RULES:
//!   - Simulation indices are assigned statically and contiguously:
//!     worker w owns [w*n + W*n*b, (w+1)*n + W*n*b) in block b.
//!   - Each worker owns its GameState (ledger, library, force registry).
//!     Only the read-only GameConfig is shared.
//!   - A fatal error stops that worker's remaining shards; other
//!     workers finish. The batch is complete only if no shard failed.

use crate::{
    book::Book,
    config::{BetMode, GameConfig},
    error::{SimError, SimResult},
    force::ForceRegistry,
    gamestate::{GameState, SpinStats},
    rng::SimRng,
    types::{BookId, SimIndex},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One contiguous range of simulation indices run by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPlan {
    pub worker: usize,
    pub block: usize,
    pub start: SimIndex,
    pub end: SimIndex,
}

impl ShardPlan {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn label(&self) -> String {
        format!("worker {} block {} [{}..{})", self.worker, self.block, self.start, self.end)
    }
}

/// Split `total` simulations into blocks of `workers` shards each, no
/// shard larger than `batch_size`.
pub fn partition(total: u64, workers: usize, batch_size: u64) -> Vec<ShardPlan> {
    let workers = workers.max(1) as u64;
    if total == 0 {
        return Vec::new();
    }
    let per_worker = total.div_ceil(workers);
    let n = per_worker.min(batch_size.max(1));
    let blocks = total.div_ceil(workers * n);

    let mut plans = Vec::new();
    for block in 0..blocks {
        for worker in 0..workers {
            let start = worker * n + workers * n * block;
            let end = (start + n).min(total);
            if start >= end {
                continue;
            }
            plans.push(ShardPlan {
                worker: worker as usize,
                block: block as usize,
                start,
                end,
            });
        }
    }
    plans
}

/// Criteria for every simulation index of a mode, split by quota
/// (largest remainder) and shuffled from the master seed.
pub fn assign_criteria(mode: &BetMode, num_sims: u64, seed: u64) -> Vec<String> {
    let total_quota: u64 = mode.distributions.iter().map(|d| d.quota).sum();
    if total_quota == 0 || num_sims == 0 {
        return Vec::new();
    }

    let mut counts: Vec<(usize, u64, u64)> = mode
        .distributions
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let exact = num_sims as u128 * d.quota as u128;
            let floor = (exact / total_quota as u128) as u64;
            let remainder = (exact % total_quota as u128) as u64;
            (i, floor, remainder)
        })
        .collect();

    let assigned: u64 = counts.iter().map(|c| c.1).sum();
    let mut leftover = num_sims - assigned;
    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by(|&a, &b| counts[b].2.cmp(&counts[a].2).then(a.cmp(&b)));
    for idx in by_remainder {
        if leftover == 0 {
            break;
        }
        counts[idx].1 += 1;
        leftover -= 1;
    }

    let mut table: Vec<String> = counts
        .iter()
        .flat_map(|&(i, n, _)| {
            std::iter::repeat(mode.distributions[i].criteria.clone()).take(n as usize)
        })
        .collect();
    SimRng::from_seed(seed).shuffle(&mut table);
    table
}

/// One row of the lookup table. Payout is in integer hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRow {
    pub book_id: BookId,
    pub weight: u64,
    pub payout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSplitRow {
    pub book_id: BookId,
    pub criteria: String,
    pub base_game_wins: f64,
    pub free_game_wins: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardSummary {
    pub mode: String,
    pub worker: usize,
    pub block: usize,
    pub sims: u64,
    pub total_wins: f64,
    pub base_wins: f64,
    pub free_wins: f64,
    pub rtp: f64,
    pub base_rtp: f64,
    pub free_rtp: f64,
    pub stats: SpinStats,
}

/// Everything one shard hands to the writers.
#[derive(Debug, Clone)]
pub struct ShardOutput {
    pub plan: ShardPlan,
    pub summary: ShardSummary,
    pub books: Vec<Book>,
    pub force: ForceRegistry,
    pub lookup: Vec<LookupRow>,
    pub payout_split: Option<Vec<PayoutSplitRow>>,
}

/// Destination for finished shards (database, files, ...).
pub trait ShardSink {
    fn write_shard(&mut self, run_id: &str, shard: &ShardOutput) -> SimResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFailure {
    pub plan: ShardPlan,
    pub error: String,
}

#[derive(Debug)]
pub struct BatchReport {
    pub mode: String,
    pub shards: Vec<ShardOutput>,
    pub failures: Vec<ShardFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn num_sims(&self) -> u64 {
        self.shards.iter().map(|s| s.summary.sims).sum()
    }

    pub fn total_wins(&self) -> f64 {
        self.shards.iter().map(|s| s.summary.total_wins).sum()
    }

    pub fn stats(&self) -> SpinStats {
        let mut stats = SpinStats::default();
        for shard in &self.shards {
            stats.merge(&shard.summary.stats);
        }
        stats
    }

    /// RTP over every completed shard, rounded to three decimals.
    pub fn rtp(&self, mode: &BetMode) -> f64 {
        round3(mode.rtp(self.total_wins(), self.num_sims()))
    }

    /// The shards, or an error naming every failed shard.
    pub fn into_shards(self) -> SimResult<Vec<ShardOutput>> {
        if self.failures.is_empty() {
            return Ok(self.shards);
        }
        Err(SimError::IncompleteBatch {
            failed: self
                .failures
                .iter()
                .map(|f| format!("{} {}: {}", self.mode, f.plan.label(), f.error))
                .collect(),
        })
    }
}

pub struct BatchRunner<'a> {
    config: &'a GameConfig,
    num_workers: usize,
    batch_size: u64,
    master_seed: u64,
    payout_split: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a GameConfig, num_workers: usize, master_seed: u64) -> Self {
        Self {
            config,
            num_workers: num_workers.max(1),
            batch_size: u64::MAX,
            master_seed,
            payout_split: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_payout_split(mut self, enabled: bool) -> Self {
        self.payout_split = enabled;
        self
    }

    /// Run `total_sims` simulations of `mode_name` across the workers.
    pub fn run_batch(&self, mode_name: &str, total_sims: u64) -> SimResult<BatchReport> {
        let mode = self.config.bet_mode(mode_name)?;
        let criteria = assign_criteria(mode, total_sims, self.master_seed);
        let plans = partition(total_sims, self.num_workers, self.batch_size);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .build()
            .map_err(|e| SimError::Other(anyhow::anyhow!("cannot build worker pool: {e}")))?;

        let per_worker: Vec<Vec<SimResult<ShardOutput>>> = pool.install(|| {
            (0..self.num_workers)
                .into_par_iter()
                .map(|worker| {
                    let mine = plans.iter().filter(|p| p.worker == worker);
                    self.run_worker(mode, mine, &criteria)
                })
                .collect()
        });

        let mut report = BatchReport {
            mode: mode.name.clone(),
            shards: Vec::new(),
            failures: Vec::new(),
        };
        let mut outcomes: Vec<(ShardPlan, SimResult<ShardOutput>)> = Vec::new();
        for (worker, results) in per_worker.into_iter().enumerate() {
            let mine: Vec<ShardPlan> =
                plans.iter().filter(|p| p.worker == worker).copied().collect();
            let ran = results.len();
            outcomes.extend(mine.iter().copied().zip(results));
            for plan in mine.into_iter().skip(ran) {
                outcomes.push((plan, Err(SimError::Other(anyhow::anyhow!(
                    "skipped after an earlier shard of worker {worker} failed"
                )))));
            }
        }
        outcomes.sort_by_key(|(plan, _)| (plan.block, plan.worker));

        for (plan, outcome) in outcomes {
            match outcome {
                Ok(shard) => report.shards.push(shard),
                Err(e) => {
                    log::error!("{} {} failed: {e}", mode.name, plan.label());
                    report.failures.push(ShardFailure { plan, error: e.to_string() });
                }
            }
        }
        Ok(report)
    }

    /// A worker's shards in order; stops at the first failure.
    fn run_worker<'p>(
        &self,
        mode: &BetMode,
        plans: impl Iterator<Item = &'p ShardPlan>,
        criteria: &[String],
    ) -> Vec<SimResult<ShardOutput>> {
        let mut results = Vec::new();
        for plan in plans {
            let outcome = self.run_shard(mode, *plan, criteria);
            let failed = outcome.is_err();
            results.push(outcome);
            if failed {
                break;
            }
        }
        results
    }

    /// Run one contiguous range and build its artifacts.
    pub fn run_shard(
        &self,
        mode: &BetMode,
        plan: ShardPlan,
        criteria: &[String],
    ) -> SimResult<ShardOutput> {
        let mut state = GameState::new(self.config, &mode.name, self.master_seed)?;
        for sim in plan.start..plan.end {
            let criteria = criteria.get(sim as usize).ok_or_else(|| SimError::InvalidConfig {
                reason: format!("no criteria assigned to sim {sim}"),
            })?;
            state.run_sim(sim, criteria)?;
        }

        let sims = plan.len();
        let ledger = &state.ledger;
        let summary = ShardSummary {
            mode: mode.name.clone(),
            worker: plan.worker,
            block: plan.block,
            sims,
            total_wins: ledger.total_cumulative_wins,
            base_wins: ledger.cumulative_base_wins,
            free_wins: ledger.cumulative_free_wins,
            rtp: round3(mode.rtp(ledger.total_cumulative_wins, sims)),
            base_rtp: round3(mode.rtp(ledger.cumulative_base_wins, sims)),
            free_rtp: round3(mode.rtp(ledger.cumulative_free_wins, sims)),
            stats: state.stats,
        };
        log::info!(
            "Thread {} finished with {} RTP for {} mode [baseGame: {}, freeGame: {}] \
             Spins: {} (Base: {}, Free: {}, {}%) repeats: {}",
            plan.worker,
            summary.rtp,
            mode.name,
            summary.base_rtp,
            summary.free_rtp,
            summary.stats.total_spins,
            summary.stats.base_spins,
            summary.stats.free_spins,
            summary.stats.freespin_percentage(),
            summary.stats.repeats,
        );

        let lookup = state
            .library
            .iter()
            .map(|b| LookupRow {
                book_id: b.id(),
                weight: 1,
                payout: (b.payout_multiplier() * 100.0).round() as u64,
            })
            .collect();
        let payout_split = self.payout_split.then(|| {
            state
                .library
                .iter()
                .map(|b| PayoutSplitRow {
                    book_id: b.id(),
                    criteria: b.criteria().to_string(),
                    base_game_wins: b.base_game_wins(),
                    free_game_wins: b.free_game_wins(),
                })
                .collect()
        });

        Ok(ShardOutput {
            plan,
            summary,
            books: state.library,
            force: state.force,
            lookup,
            payout_split,
        })
    }

    /// Run a batch and hand every shard to `sink`. Fails without writing
    /// anything if any shard failed.
    pub fn run_and_write<S: ShardSink + ?Sized>(
        &self,
        mode_name: &str,
        total_sims: u64,
        run_id: &str,
        sink: &mut S,
    ) -> SimResult<Vec<ShardSummary>> {
        let shards = self.run_batch(mode_name, total_sims)?.into_shards()?;
        let mut summaries = Vec::with_capacity(shards.len());
        for shard in &shards {
            sink.write_shard(run_id, shard)?;
            summaries.push(shard.summary.clone());
        }
        Ok(summaries)
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
