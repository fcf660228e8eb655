//! Win evaluation for a drawn board.

use crate::{
    bonus::BonusKind,
    reels::Board,
    symbol::{pair_win, SymbolTable, ValueContext},
};
use serde::{Deserialize, Serialize};

/// A bonus trigger detected on a base-game board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: BonusKind,
    /// Weaker and stronger special landed together.
    pub double: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub win: u64,
    pub trigger: Option<Trigger>,
}

pub struct WinEvaluator<'a> {
    table: &'a SymbolTable,
}

impl<'a> WinEvaluator<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    /// Win for `board` under `ctx`, plus a trigger when a special lands
    /// in the base game. Specials never trigger inside a bonus context.
    pub fn evaluate(&self, board: &Board, ctx: ValueContext) -> Evaluation {
        let [a, b] = self.table.values(board, ctx);
        let trigger = match ctx {
            ValueContext::Base => self.detect_trigger(board),
            ValueContext::Bonk | ValueContext::SuperBonk => None,
        };
        Evaluation { win: pair_win(a, b), trigger }
    }

    fn detect_trigger(&self, board: &Board) -> Option<Trigger> {
        let specials = &self.table.specials;
        if !board.iter().any(|s| specials.is_special(s)) {
            return None;
        }
        let weak = board.iter().any(|s| *s == specials.bonk);
        let strong = board.iter().any(|s| *s == specials.super_bonk);
        match (weak, strong) {
            (_, true) => Some(Trigger { kind: BonusKind::SuperBonk, double: weak }),
            (true, false) => Some(Trigger { kind: BonusKind::Bonk, double: false }),
            (false, false) => None,
        }
    }
}
