//! Books: the auditable per-simulation event log.
//!
//! RULE: an EventRecorder is append-only while an attempt runs and is
//! thrown away on REPEAT. finish() turns it into an immutable Book.

use crate::{
    bonus::{BonusKind, Sticky},
    ledger::Reconciled,
    symbol::Symbol,
    types::{BookId, GameType},
};
use serde::{Deserialize, Serialize};

/// Every event a simulation can record.
/// Variants are append-only: never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookEvent {
    #[serde(rename_all = "camelCase")]
    Reveal {
        board: Vec<Symbol>,
        reel_set: String,
        game_type: GameType,
    },
    #[serde(rename_all = "camelCase")]
    BonusTrigger {
        bonus_type: BonusKind,
        session_id: String,
        reel_set: String,
        trigger_symbols: Vec<Symbol>,
        spins_received: u32,
    },
    #[serde(rename_all = "camelCase")]
    BonusSpin {
        spin_number: u32,
        session_id: String,
        reel_set: String,
        board: Vec<Symbol>,
        bonus_type: BonusKind,
        spin_win: u64,
        total_bonus_win: u64,
        spins_left: u32,
        extra_spins: u32,
        multiplier: u64,
        sticky: Option<Sticky>,
        upgraded: bool,
    },
    #[serde(rename_all = "camelCase")]
    BonusComplete {
        session_id: String,
        bonus_type: BonusKind,
        total_win: u64,
        spins_completed: u32,
        final_multiplier: u64,
        upgraded_from_bonk: bool,
        bonk_symbols: usize,
        super_bonk_symbols: usize,
        regular_symbols: usize,
        average_win_per_spin: f64,
    },
    #[serde(rename_all = "camelCase")]
    Maxwin {
        bonus_type: BonusKind,
        total_win: u64,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    FinalWin {
        payout_multiplier: f64,
        base_game_wins: f64,
        free_game_wins: f64,
    },
}

impl BookEvent {
    /// Stable string name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Reveal { .. } => "REVEAL",
            Self::BonusTrigger { .. } => "BONUS_TRIGGER",
            Self::BonusSpin { .. } => "BONUS_SPIN",
            Self::BonusComplete { .. } => "BONUS_COMPLETE",
            Self::Maxwin { .. } => "MAXWIN",
            Self::FinalWin { .. } => "FINAL_WIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    pub index: usize,
    #[serde(flatten)]
    pub event: BookEvent,
}

/// Mutable event list for the attempt in flight.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    id: BookId,
    criteria: String,
    events: Vec<BookEntry>,
}

impl EventRecorder {
    pub fn new(id: BookId, criteria: impl Into<String>) -> Self {
        Self { id, criteria: criteria.into(), events: Vec::new() }
    }

    /// Append and return the event's index.
    pub fn add(&mut self, event: BookEvent) -> usize {
        let index = self.events.len();
        self.events.push(BookEntry { index, event });
        index
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn finish(self, settled: &Reconciled) -> Book {
        Book {
            id: self.id,
            criteria: self.criteria,
            events: self.events,
            payout_multiplier: settled.total,
            base_game_wins: settled.base,
            free_game_wins: settled.free,
        }
    }
}

/// The immutable record of one accepted simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: BookId,
    criteria: String,
    events: Vec<BookEntry>,
    payout_multiplier: f64,
    base_game_wins: f64,
    free_game_wins: f64,
}

impl Book {
    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn criteria(&self) -> &str {
        &self.criteria
    }

    pub fn events(&self) -> &[BookEntry] {
        &self.events
    }

    pub fn payout_multiplier(&self) -> f64 {
        self.payout_multiplier
    }

    pub fn base_game_wins(&self) -> f64 {
        self.base_game_wins
    }

    pub fn free_game_wins(&self) -> f64 {
        self.free_game_wins
    }

    pub fn count_of(&self, type_name: &str) -> usize {
        self.events.iter().filter(|e| e.event.type_name() == type_name).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
