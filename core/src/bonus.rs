//! Bonus round state machine.
//!
//! INACTIVE -> ACTIVE(BONK) -> [ACTIVE(SUPER_BONK) via upgrade] -> COMPLETE
//! INACTIVE -> ACTIVE(SUPER_BONK) -> COMPLETE
//!
//! RULES:
//!   - advance() is pure: it takes the current state by reference and
//!     returns the successor. Nothing else mutates a BonusState.
//!   - An upgrade is irreversible and applies from the next spin.
//!   - The sticky reel, once fixed, never moves; its value only grows.
//!   - Reaching the max-win ceiling zeroes spins_left on the same spin.

use crate::{
    error::SimError,
    evaluator::Trigger,
    reels::{Board, DrawSpec},
    symbol::{pair_win, Symbol, SymbolTable, ValueContext},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusKind {
    Bonk,
    SuperBonk,
}

impl BonusKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bonk => "BONK",
            Self::SuperBonk => "SUPER_BONK",
        }
    }
}

impl FromStr for BonusKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BONK" | "BONK_SPINS" => Ok(Self::Bonk),
            "SUPER_BONK" | "SUPER_BONK_SPINS" => Ok(Self::SuperBonk),
            other => Err(SimError::UnknownBonusKind { kind: other.to_string() }),
        }
    }
}

/// Reel sets used while a round is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusReelSets {
    pub bonk: String,
    pub super_bonk: String,
    /// Numeric-only population for the sticky reel.
    pub sticky_stick: String,
    /// Population for the free-running reel in sticky mode.
    pub sticky_run: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusRules {
    pub bonk_spins: u32,
    pub super_bonk_spins: u32,
    /// Allotment when both specials land on the trigger spin.
    pub double_trigger_spins: u32,
    pub bonk_multiplier: u64,
    pub super_bonk_multiplier: u64,
    /// Extra spins per weaker special inside BONK.
    pub bonk_extra_spins: u32,
    /// Extra spins per stronger special in either kind.
    pub super_bonk_extra_spins: u32,
    pub max_win_ceiling: u64,
    pub reel_sets: BonusReelSets,
}

impl BonusRules {
    pub fn allotment(&self, trigger: Trigger) -> u32 {
        match (trigger.kind, trigger.double) {
            (_, true) => self.double_trigger_spins,
            (BonusKind::Bonk, false) => self.bonk_spins,
            (BonusKind::SuperBonk, false) => self.super_bonk_spins,
        }
    }

    pub fn multiplier(&self, kind: BonusKind) -> u64 {
        match kind {
            BonusKind::Bonk => self.bonk_multiplier,
            BonusKind::SuperBonk => self.super_bonk_multiplier,
        }
    }
}

/// Locked value on one reel during SUPER_BONK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticky {
    pub reel: usize,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusState {
    pub kind: BonusKind,
    pub spins_left: u32,
    pub spins_played: u32,
    pub multiplier: u64,
    pub total_win: u64,
    pub sticky: Option<Sticky>,
    pub symbols_collected: Vec<Symbol>,
    pub upgraded_from_bonk: bool,
    pub maxwin_reached: bool,
}

impl BonusState {
    pub fn is_complete(&self) -> bool {
        self.spins_left == 0 || self.maxwin_reached
    }
}

/// Result of one bonus spin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusAdvance {
    pub state: BonusState,
    /// Win realized for the ledger on this spin, multiplier applied.
    pub spin_win: u64,
    pub extra_spins: u32,
    pub upgraded: bool,
    /// This spin hit the ceiling.
    pub maxwin: bool,
}

pub struct BonusMachine<'a> {
    rules: &'a BonusRules,
    table: &'a SymbolTable,
}

impl<'a> BonusMachine<'a> {
    pub fn new(rules: &'a BonusRules, table: &'a SymbolTable) -> Self {
        Self { rules, table }
    }

    pub fn start(&self, trigger: Trigger) -> BonusState {
        BonusState {
            kind: trigger.kind,
            spins_left: self.rules.allotment(trigger),
            spins_played: 0,
            multiplier: self.rules.multiplier(trigger.kind),
            total_win: 0,
            sticky: None,
            symbols_collected: Vec::new(),
            upgraded_from_bonk: false,
            maxwin_reached: false,
        }
    }

    /// Reels to draw the next spin from.
    pub fn draw_spec(&self, state: &BonusState) -> DrawSpec<'a> {
        let sets: &'a BonusReelSets = &self.rules.reel_sets;
        match (state.kind, state.sticky) {
            (BonusKind::Bonk, _) => DrawSpec::Standard { reel_set: &sets.bonk },
            (BonusKind::SuperBonk, None) => DrawSpec::Standard { reel_set: &sets.super_bonk },
            (BonusKind::SuperBonk, Some(s)) => DrawSpec::Sticky {
                stick: &sets.sticky_stick,
                run: &sets.sticky_run,
                sticky_reel: s.reel,
            },
        }
    }

    pub fn advance(&self, state: &BonusState, board: &Board) -> BonusAdvance {
        if state.is_complete() {
            return BonusAdvance {
                state: state.clone(),
                spin_win: 0,
                extra_spins: 0,
                upgraded: false,
                maxwin: false,
            };
        }
        let mut next = state.clone();
        let (raw_win, extra_spins, upgraded) = match state.kind {
            BonusKind::Bonk => self.advance_bonk(&mut next, board),
            BonusKind::SuperBonk => self.advance_super_bonk(&mut next, board),
        };

        next.symbols_collected.extend(board.iter().cloned());
        next.spins_played += 1;
        next.spins_left = (next.spins_left + extra_spins).saturating_sub(1);

        let mut spin_win = raw_win;
        let mut maxwin = false;
        let ceiling = self.rules.max_win_ceiling;
        if next.total_win.saturating_add(raw_win) >= ceiling {
            spin_win = ceiling.saturating_sub(next.total_win);
            next.total_win = ceiling;
            next.spins_left = 0;
            next.maxwin_reached = true;
            maxwin = true;
        } else {
            next.total_win += raw_win;
        }

        BonusAdvance { state: next, spin_win, extra_spins, upgraded, maxwin }
    }

    /// Pays the plain product under the BONK mapping. A stronger special
    /// upgrades the round to SUPER_BONK for the following spins.
    fn advance_bonk(&self, next: &mut BonusState, board: &Board) -> (u64, u32, bool) {
        let specials = &self.table.specials;
        let [a, b] = self.table.values(board, ValueContext::Bonk);
        let win = pair_win(a, b).saturating_mul(next.multiplier);

        let weak = board.iter().filter(|s| **s == specials.bonk).count() as u32;
        let strong = board.iter().filter(|s| **s == specials.super_bonk).count() as u32;
        let extra = weak * self.rules.bonk_extra_spins + strong * self.rules.super_bonk_extra_spins;

        let upgraded = strong > 0;
        if upgraded {
            next.kind = BonusKind::SuperBonk;
            next.multiplier = self.rules.super_bonk_multiplier;
            next.upgraded_from_bonk = true;
            next.sticky = None;
        }
        (win, extra, upgraded)
    }

    /// Sticky mode: the first winning spin locks the larger side; later
    /// winning spins may only raise the locked value on the same reel.
    /// The realized win is always sticky value x other reel.
    fn advance_super_bonk(&self, next: &mut BonusState, board: &Board) -> (u64, u32, bool) {
        let specials = &self.table.specials;
        let values = self.table.values(board, ValueContext::SuperBonk);
        let current = pair_win(values[0], values[1]);

        if current > 0 {
            next.sticky = match next.sticky {
                None => {
                    let reel = if values[1] > values[0] { 1 } else { 0 };
                    Some(Sticky { reel, value: values[reel] })
                }
                Some(s) if values[s.reel] > s.value => {
                    Some(Sticky { reel: s.reel, value: values[s.reel] })
                }
                keep => keep,
            };
        }

        let win = match next.sticky {
            Some(s) => pair_win(s.value, values[1 - s.reel]).saturating_mul(next.multiplier),
            None => 0,
        };
        let strong = board.iter().filter(|s| **s == specials.super_bonk).count() as u32;
        (win, strong * self.rules.super_bonk_extra_spins, false)
    }
}
