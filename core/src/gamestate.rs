//! The simulation orchestrator: runs one simulation end to end.
//!
//! ATTEMPT ORDER (fixed, never reordered):
//!   1. RESET     ledger buckets, recorder, staged force records
//!   2. DRAW      base reel set from the distribution, then the board
//!   3. EVALUATE  base win and optional trigger
//!   4. BONUS     sub-loop until the round completes (if triggered)
//!   5. RECONCILE ledger invariant, FINAL_WIN event
//!   6. ACCEPT or REPEAT against the distribution criteria
//!
//! RULES:
//!   - The RNG stream for a simulation index is created once; repeated
//!     attempts keep drawing from it.
//!   - A REPEAT discards everything the attempt produced.
//!   - A ledger mismatch aborts the simulation with full context.

use crate::{
    bonus::{BonusKind, BonusMachine, BonusState},
    book::{Book, BookEvent, EventRecorder},
    config::{BetMode, Distribution, GameConfig},
    error::{SimError, SimResult},
    evaluator::{Trigger, WinEvaluator},
    force::ForceRegistry,
    ledger::{round2, Reconciled, WinLedger},
    reels::{Board, DrawSpec, OutcomeGenerator, OutcomeSource},
    rng::SimRng,
    symbol::ValueContext,
    types::{GameType, SimIndex},
};
use serde::{Deserialize, Serialize};

/// Repeat count at which (and at every multiple of which) a warning is logged.
pub const REPEAT_WARN_THRESHOLD: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinStats {
    pub total_spins: u64,
    pub base_spins: u64,
    pub free_spins: u64,
    pub repeats: u64,
    /// High-repeat warnings logged while rejection sampling.
    #[serde(default)]
    pub repeat_warnings: u64,
    pub bonus_rounds: u64,
    pub upgrades: u64,
    pub maxwins: u64,
}

impl SpinStats {
    pub fn freespin_percentage(&self) -> f64 {
        if self.total_spins == 0 {
            return 0.0;
        }
        round2(self.free_spins as f64 / self.total_spins as f64 * 100.0)
    }

    pub fn merge(&mut self, other: &SpinStats) {
        self.total_spins += other.total_spins;
        self.base_spins += other.base_spins;
        self.free_spins += other.free_spins;
        self.repeats += other.repeats;
        self.repeat_warnings += other.repeat_warnings;
        self.bonus_rounds += other.bonus_rounds;
        self.upgrades += other.upgrades;
        self.maxwins += other.maxwins;
    }
}

/// Transient state of one attempt.
struct Attempt {
    recorder: EventRecorder,
    triggered_freegame: bool,
    wincap_triggered: bool,
    last_bonus: Option<BonusState>,
    stats: SpinStats,
}

/// A finalized attempt waiting for the accept/repeat decision.
struct Settled {
    attempt: Attempt,
    totals: Reconciled,
}

/// Per-worker orchestrator. Owns its ledger, library and force registry.
pub struct GameState<'a> {
    config: &'a GameConfig,
    mode: &'a BetMode,
    master_seed: u64,
    pub ledger: WinLedger,
    pub library: Vec<Book>,
    pub force: ForceRegistry,
    pub stats: SpinStats,
    warn_after: u64,
}

impl<'a> GameState<'a> {
    pub fn new(config: &'a GameConfig, mode_name: &str, master_seed: u64) -> SimResult<Self> {
        let mode = config.bet_mode(mode_name)?;
        Ok(Self {
            config,
            mode,
            master_seed,
            ledger: WinLedger::new(mode.win_cap),
            library: Vec::new(),
            force: ForceRegistry::new(),
            stats: SpinStats::default(),
            warn_after: REPEAT_WARN_THRESHOLD,
        })
    }

    pub fn with_repeat_warning(mut self, every: u64) -> Self {
        self.warn_after = every.max(1);
        self
    }

    pub fn mode(&self) -> &'a BetMode {
        self.mode
    }

    /// Run simulation `sim` under `criteria` with its own seeded stream.
    pub fn run_sim(&mut self, sim: SimIndex, criteria: &str) -> SimResult<&Book> {
        let config: &'a GameConfig = self.config;
        let mut generator = OutcomeGenerator::new(config, SimRng::for_sim(self.master_seed, sim));
        self.run_sim_with(sim, criteria, &mut generator)
    }

    /// Run simulation `sim`, drawing every outcome from `source`.
    pub fn run_sim_with<S: OutcomeSource + ?Sized>(
        &mut self,
        sim: SimIndex,
        criteria: &str,
        source: &mut S,
    ) -> SimResult<&Book> {
        let mode: &'a BetMode = self.mode;
        let dist = mode.distribution(criteria)?;
        let mut repeat_count: u64 = 0;

        let settled = loop {
            let settled = self.run_attempt(sim, dist, source)?;
            let repeat = self.check_repeat(dist, &settled);

            repeat_count += 1;
            self.check_repeat_count(sim, criteria, repeat_count);

            if !repeat {
                break settled;
            }
            self.force.discard_staged();
            self.stats.repeats += 1;
        };

        let book_id = sim + 1;
        self.force.imprint(book_id);
        self.ledger.end_round(&settled.totals);
        self.stats.merge(&settled.attempt.stats);

        let book = settled.attempt.recorder.finish(&settled.totals);
        log::debug!(
            "sim={sim} mode={} accepted: payout={:.2} base={:.2} free={:.2} attempts={repeat_count}",
            self.mode.name,
            book.payout_multiplier(),
            book.base_game_wins(),
            book.free_game_wins(),
        );
        self.library.push(book);
        let last = self.library.len() - 1;
        Ok(&self.library[last])
    }

    fn run_attempt<S: OutcomeSource + ?Sized>(
        &mut self,
        sim: SimIndex,
        dist: &Distribution,
        source: &mut S,
    ) -> SimResult<Settled> {
        // RESET
        self.ledger.reset_round();
        self.force.discard_staged();
        let mut attempt = Attempt {
            recorder: EventRecorder::new(sim + 1, dist.criteria.clone()),
            triggered_freegame: false,
            wincap_triggered: false,
            last_bonus: None,
            stats: SpinStats::default(),
        };

        // DRAW
        let reel_set = source
            .pick_reel_set(&dist.reel_weights.base)
            .ok_or_else(|| SimError::InvalidConfig {
                reason: format!("criteria '{}' has no base reel weight", dist.criteria),
            })?;
        let board = source.draw(&DrawSpec::Standard { reel_set })?;
        attempt.recorder.add(BookEvent::Reveal {
            board: board.to_vec(),
            reel_set: reel_set.to_string(),
            game_type: GameType::Base,
        });

        // EVALUATE
        let evaluation =
            WinEvaluator::new(&self.config.symbols).evaluate(&board, ValueContext::Base);
        self.ledger.record_base_win(evaluation.win as f64);
        attempt.stats.base_spins += 1;
        attempt.stats.total_spins += 1;

        // BONUS
        if let Some(trigger) = evaluation.trigger {
            self.run_bonus(sim, trigger, &board, &mut attempt, source)?;
        }
        attempt.wincap_triggered = self.ledger.cap_reached();

        // RECONCILE
        let totals = self.ledger.reconcile().map_err(|m| SimError::LedgerMismatch {
            sim,
            mode: self.mode.name.clone(),
            base: m.base,
            free: m.free,
            total: m.total,
            cap: m.cap,
            bonus: format!("{:?}", attempt.last_bonus),
        })?;
        attempt.recorder.add(BookEvent::FinalWin {
            payout_multiplier: totals.total,
            base_game_wins: totals.base,
            free_game_wins: totals.free,
        });

        Ok(Settled { attempt, totals })
    }

    /// Drive one bonus round from trigger to completion.
    fn run_bonus<S: OutcomeSource + ?Sized>(
        &mut self,
        sim: SimIndex,
        trigger: Trigger,
        trigger_board: &Board,
        attempt: &mut Attempt,
        source: &mut S,
    ) -> SimResult<()> {
        let config: &'a GameConfig = self.config;
        let machine = BonusMachine::new(&config.bonus, &config.symbols);
        let specials = &config.symbols.specials;

        self.ledger.reset_spin_win();
        let mut state = machine.start(trigger);
        let entry_set = machine.draw_spec(&state).label();
        let session_id = format!("bonus_{}_{}", attempt.recorder.len(), entry_set);
        let trigger_symbol = match trigger.kind {
            BonusKind::Bonk => &specials.bonk,
            BonusKind::SuperBonk => &specials.super_bonk,
        };

        self.force.stage([
            ("kind", trigger.kind.name().to_string()),
            ("symbol", trigger_symbol.to_string()),
            ("gametype", GameType::Base.name().to_string()),
            ("double", trigger.double.to_string()),
        ]);
        attempt.recorder.add(BookEvent::BonusTrigger {
            bonus_type: trigger.kind,
            session_id: session_id.clone(),
            reel_set: entry_set,
            trigger_symbols: trigger_board.to_vec(),
            spins_received: state.spins_left,
        });
        attempt.triggered_freegame = true;
        attempt.stats.bonus_rounds += 1;

        while !state.is_complete() {
            let spec = machine.draw_spec(&state);
            let board = source.draw(&spec)?;
            let step = machine.advance(&state, &board);

            self.ledger.record_free_win(step.spin_win as f64);
            attempt.stats.free_spins += 1;
            attempt.stats.total_spins += 1;

            attempt.recorder.add(BookEvent::BonusSpin {
                spin_number: step.state.spins_played,
                session_id: session_id.clone(),
                reel_set: spec.label(),
                board: board.to_vec(),
                bonus_type: state.kind,
                spin_win: step.spin_win,
                total_bonus_win: step.state.total_win,
                spins_left: step.state.spins_left,
                extra_spins: step.extra_spins,
                multiplier: state.multiplier,
                sticky: step.state.sticky,
                upgraded: step.upgraded,
            });

            if step.upgraded {
                attempt.stats.upgrades += 1;
                self.force.stage([
                    ("kind", "upgrade".to_string()),
                    ("from", BonusKind::Bonk.name().to_string()),
                    ("to", BonusKind::SuperBonk.name().to_string()),
                    ("gametype", GameType::Free.name().to_string()),
                ]);
                log::debug!("bonus {session_id} upgraded at spin {}", step.state.spins_played);
            }
            if step.maxwin {
                attempt.stats.maxwins += 1;
                attempt.recorder.add(BookEvent::Maxwin {
                    bonus_type: step.state.kind,
                    total_win: step.state.total_win,
                    reason: "max_win_ceiling".into(),
                });
                self.force.stage([
                    ("kind", "maxwin".to_string()),
                    ("bonus", step.state.kind.name().to_string()),
                    ("gametype", GameType::Free.name().to_string()),
                ]);
            }
            state = step.state;
        }

        let bonk_symbols = state.symbols_collected.iter().filter(|s| **s == specials.bonk).count();
        let super_bonk_symbols = state
            .symbols_collected
            .iter()
            .filter(|s| **s == specials.super_bonk)
            .count();
        let average_win_per_spin = if state.spins_played > 0 {
            round2(state.total_win as f64 / state.spins_played as f64)
        } else {
            0.0
        };
        // The free-spin window opened at trigger time must hold exactly this round's win.
        if round2(self.ledger.spin_win) != round2(state.total_win as f64) {
            return Err(SimError::LedgerMismatch {
                sim,
                mode: self.mode.name.clone(),
                base: self.ledger.base_game_wins,
                free: self.ledger.free_game_wins,
                total: self.ledger.spin_win,
                cap: self.ledger.cap,
                bonus: format!("{state:?}"),
            });
        }

        attempt.recorder.add(BookEvent::BonusComplete {
            session_id: session_id.clone(),
            bonus_type: state.kind,
            total_win: state.total_win,
            spins_completed: state.spins_played,
            final_multiplier: state.multiplier,
            upgraded_from_bonk: state.upgraded_from_bonk,
            bonk_symbols,
            super_bonk_symbols,
            regular_symbols: state.symbols_collected.len() - bonk_symbols - super_bonk_symbols,
            average_win_per_spin,
        });
        log::debug!(
            "bonus {session_id} complete: kind={} spins={} total={}",
            state.kind.name(),
            state.spins_played,
            state.total_win
        );
        attempt.last_bonus = Some(state);
        Ok(())
    }

    /// Rejection-sampling criteria for a finalized attempt.
    fn check_repeat(&self, dist: &Distribution, settled: &Settled) -> bool {
        if let Some(target) = dist.win_criteria {
            if settled.totals.total != round2(target) {
                return true;
            }
        }
        if dist.force_freegame && !settled.attempt.triggered_freegame {
            return true;
        }
        if dist.force_wincap && !settled.attempt.wincap_triggered {
            return true;
        }
        false
    }

    fn check_repeat_count(&mut self, sim: SimIndex, criteria: &str, count: u64) {
        if count >= self.warn_after && count % self.warn_after == 0 {
            self.stats.repeat_warnings += 1;
            log::warn!(
                "High repeat count: {count} attempts (criteria={criteria}, mode={}, sim={sim})",
                self.mode.name
            );
        }
    }
}
