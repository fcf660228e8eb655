//! sim-runner: headless batch runner for the Bonk two-reel slot.
//!
//! Usage:
//!   sim-runner --seed 12345 --threads 8 --mode base=100000 --db books.db
//!   sim-runner --mode base=10000 --mode buy_super_bonk_spins=2000 --json

use anyhow::{bail, Result};
use bonk_core::{
    batch::{BatchRunner, ShardSink},
    config::GameConfig,
    store::SimStore,
};
use std::env;

/// Sims per mode when no `--mode` flag is given.
const DEFAULT_SIMS: u64 = 1_000;

#[derive(serde::Serialize)]
struct ModeSummary {
    mode: String,
    sims: u64,
    rtp: f64,
    base_rtp: f64,
    free_rtp: f64,
    total_spins: u64,
    free_spin_pct: f64,
    repeats: u64,
    lookup_rows: usize,
    force_records: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let threads = parse_arg(&args, "--threads", 4usize);
    let batch = parse_arg(&args, "--batch", 50_000u64);
    let json = args.iter().any(|a| a == "--json");
    let no_split = args.iter().any(|a| a == "--no-payout-split");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data/bonk");

    let config = GameConfig::load(data_dir)?;
    config.validate()?;

    let modes = resolve_modes(&args, &config)?;

    if !json {
        println!("Bonk: sim-runner");
        println!("  game:      {}", config.game_id);
        println!("  seed:      {seed}");
        println!("  threads:   {threads}");
        println!("  batch:     {batch}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let mut store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now().to_rfc3339();
    store.insert_run(&run_id, &config.game_id, seed, env!("CARGO_PKG_VERSION"), &started_at)?;

    let runner = BatchRunner::new(&config, threads, seed)
        .with_batch_size(batch)
        .with_payout_split(!no_split);

    let mut summaries = Vec::with_capacity(modes.len());
    for (mode_name, count) in &modes {
        let mode = config.bet_mode(mode_name)?;
        let report = runner.run_batch(mode_name, *count)?;
        if !report.is_complete() {
            for failure in &report.failures {
                eprintln!("  FAILED {mode_name} {}: {}", failure.plan.label(), failure.error);
            }
            bail!("{mode_name}: {} shard(s) failed, nothing written", report.failures.len());
        }

        let rtp = report.rtp(mode);
        let stats = report.stats();
        let sims = report.num_sims();
        let base_wins: f64 = report.shards.iter().map(|s| s.summary.base_wins).sum();
        let free_wins: f64 = report.shards.iter().map(|s| s.summary.free_wins).sum();

        for shard in report.into_shards()? {
            store.write_shard(&run_id, &shard)?;
        }
        let lookup = store.merged_lookup(&run_id, mode_name)?;
        let force = store.merged_force(&run_id, mode_name)?;
        log::info!(
            "{mode_name}: wrote {sims} sims ({} lookup rows, {} force records) rtp={rtp}",
            lookup.len(),
            force.len()
        );

        summaries.push(ModeSummary {
            mode: mode_name.clone(),
            sims,
            rtp,
            base_rtp: round3(mode.rtp(base_wins, sims)),
            free_rtp: round3(mode.rtp(free_wins, sims)),
            total_spins: stats.total_spins,
            free_spin_pct: stats.freespin_percentage(),
            repeats: stats.repeats,
            lookup_rows: lookup.len(),
            force_records: force.len(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summary(&run_id, &summaries);
    }
    Ok(())
}

fn print_summary(run_id: &str, summaries: &[ModeSummary]) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id: {run_id}");
    for s in summaries {
        println!();
        println!("  mode:          {}", s.mode);
        println!("  sims:          {}", s.sims);
        println!("  rtp:           {} (base {}, free {})", s.rtp, s.base_rtp, s.free_rtp);
        println!("  spins:         {} ({:.2}% free)", s.total_spins, s.free_spin_pct);
        println!("  repeats:       {}", s.repeats);
        println!("  lookup rows:   {}", s.lookup_rows);
        println!("  force records: {}", s.force_records);
    }
}

/// Modes to run: the `--mode` pairs, or every configured mode at the default count.
fn resolve_modes(args: &[String], config: &GameConfig) -> Result<Vec<(String, u64)>> {
    let modes = parse_modes(args)?;
    if !modes.is_empty() {
        return Ok(modes);
    }
    log::warn!(
        "no --mode given, running all {} bet modes with {DEFAULT_SIMS} sims each",
        config.bet_modes.len()
    );
    Ok(config
        .bet_modes
        .iter()
        .map(|m| (m.name.clone(), DEFAULT_SIMS))
        .collect())
}

/// Collect every `--mode name=count` pair in order.
fn parse_modes(args: &[String]) -> Result<Vec<(String, u64)>> {
    let mut modes = Vec::new();
    for w in args.windows(2).filter(|w| w[0] == "--mode") {
        let Some((name, count)) = w[1].split_once('=') else {
            bail!("--mode expects name=count, got '{}'", w[1]);
        };
        let count: u64 = count
            .parse()
            .map_err(|e| anyhow::anyhow!("bad sim count for mode {name}: {e}"))?;
        modes.push((name.to_string(), count));
    }
    Ok(modes)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn explicit_modes_keep_their_order_and_counts() {
        let config = GameConfig::default_test();
        let argv = args(&["sim-runner", "--mode", "base=10", "--mode", "buy_bonk_spins=3"]);
        let modes = resolve_modes(&argv, &config).expect("modes");
        assert_eq!(modes, vec![("base".to_string(), 10), ("buy_bonk_spins".to_string(), 3)]);
    }

    #[test]
    fn missing_mode_flag_runs_every_mode_at_the_default_count() {
        let config = GameConfig::default_test();
        let modes = resolve_modes(&args(&["sim-runner", "--seed", "9"]), &config).expect("modes");
        assert_eq!(modes.len(), config.bet_modes.len());
        assert!(modes.iter().all(|(_, n)| *n == DEFAULT_SIMS));
    }

    #[test]
    fn malformed_mode_pair_is_rejected() {
        let config = GameConfig::default_test();
        assert!(resolve_modes(&args(&["sim-runner", "--mode", "base"]), &config).is_err());
        assert!(resolve_modes(&args(&["sim-runner", "--mode", "base=many"]), &config).is_err());
    }
}
