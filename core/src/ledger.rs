//! Win ledger: base/free split reconciled against the running total.
//!
//! RULE: every win is recorded through record_base_win or
//! record_free_win, which update their bucket AND the running total
//! together. reconcile() runs once per finalized attempt; a mismatch
//! means some path touched one side only and is always fatal.

/// Round to two decimals, the payout precision of a book.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Clamped, rounded totals of one finalized attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub base: f64,
    pub free: f64,
    pub total: f64,
}

/// Raw (unclamped) values at the time a reconciliation failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub base: f64,
    pub free: f64,
    pub total: f64,
    pub cap: f64,
}

#[derive(Debug, Clone)]
pub struct WinLedger {
    pub cap: f64,
    pub base_game_wins: f64,
    pub free_game_wins: f64,
    pub running_bet_win: f64,
    /// Win of the current spin window; cleared when a free-spin loop starts.
    pub spin_win: f64,

    // Batch-wide counters, used only for RTP reporting.
    pub cumulative_base_wins: f64,
    pub cumulative_free_wins: f64,
    pub total_cumulative_wins: f64,
}

impl WinLedger {
    pub fn new(cap: f64) -> Self {
        Self {
            cap,
            base_game_wins: 0.0,
            free_game_wins: 0.0,
            running_bet_win: 0.0,
            spin_win: 0.0,
            cumulative_base_wins: 0.0,
            cumulative_free_wins: 0.0,
            total_cumulative_wins: 0.0,
        }
    }

    /// Clear the per-attempt buckets. Cumulative counters are kept.
    pub fn reset_round(&mut self) {
        self.base_game_wins = 0.0;
        self.free_game_wins = 0.0;
        self.running_bet_win = 0.0;
        self.spin_win = 0.0;
    }

    pub fn reset_spin_win(&mut self) {
        self.spin_win = 0.0;
    }

    pub fn record_base_win(&mut self, amount: f64) {
        self.base_game_wins += amount;
        self.running_bet_win += amount;
        self.spin_win += amount;
    }

    pub fn record_free_win(&mut self, amount: f64) {
        self.free_game_wins += amount;
        self.running_bet_win += amount;
        self.spin_win += amount;
    }

    pub fn cap_reached(&self) -> bool {
        self.running_bet_win >= self.cap
    }

    /// Clamp each bucket to the cap and check base + free against total.
    pub fn reconcile(&self) -> Result<Reconciled, Mismatch> {
        let split = round2((self.base_game_wins + self.free_game_wins).min(self.cap));
        let total = round2(self.running_bet_win.min(self.cap));
        if split != total {
            return Err(Mismatch {
                base: self.base_game_wins,
                free: self.free_game_wins,
                total: self.running_bet_win,
                cap: self.cap,
            });
        }
        Ok(Reconciled {
            base: round2(self.base_game_wins.min(self.cap)),
            free: round2(self.free_game_wins.min(self.cap)),
            total,
        })
    }

    /// Fold an accepted attempt into the batch counters.
    pub fn end_round(&mut self, settled: &Reconciled) {
        self.cumulative_base_wins += settled.base;
        self.cumulative_free_wins += settled.free;
        self.total_cumulative_wins += settled.total;
    }
}
