//! Symbol tokens and context-dependent value resolution.
//!
//! A symbol is just its token. All behaviour is table-driven:
//! numeric tokens resolve to their face value, the two special tokens
//! resolve through a per-context override table, and anything else
//! resolves to 0.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single symbol token as it appears on a reel strip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Face value for purely numeric tokens.
    pub fn face_value(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Which value mapping is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueContext {
    Base,
    Bonk,
    SuperBonk,
}

/// The two special symbols of the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialSymbols {
    /// Weaker special: triggers BONK, adds spins inside BONK.
    pub bonk: Symbol,
    /// Stronger special: triggers SUPER_BONK, upgrades BONK rounds.
    pub super_bonk: Symbol,
}

impl SpecialSymbols {
    pub fn is_special(&self, symbol: &Symbol) -> bool {
        *symbol == self.bonk || *symbol == self.super_bonk
    }
}

/// Symbol-to-value mappings for every context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTable {
    pub specials: SpecialSymbols,
    pub base: HashMap<Symbol, u64>,
    pub bonk: HashMap<Symbol, u64>,
    pub super_bonk: HashMap<Symbol, u64>,
}

impl SymbolTable {
    fn overrides(&self, ctx: ValueContext) -> &HashMap<Symbol, u64> {
        match ctx {
            ValueContext::Base => &self.base,
            ValueContext::Bonk => &self.bonk,
            ValueContext::SuperBonk => &self.super_bonk,
        }
    }

    /// Resolve a token under `ctx`. Unrecognized tokens are worth 0 so
    /// that reel strips may carry symbols this build does not know yet.
    pub fn value(&self, symbol: &Symbol, ctx: ValueContext) -> u64 {
        if let Some(&v) = self.overrides(ctx).get(symbol) {
            return v;
        }
        match symbol.face_value() {
            Some(v) => v,
            None => {
                log::trace!("unrecognized symbol '{symbol}' resolves to 0");
                0
            }
        }
    }

    /// Both resolved values for a board.
    pub fn values(&self, board: &[Symbol; 2], ctx: ValueContext) -> [u64; 2] {
        [self.value(&board[0], ctx), self.value(&board[1], ctx)]
    }
}

/// Product of two resolved values with the single (1,1) -> 0 exception.
pub fn pair_win(a: u64, b: u64) -> u64 {
    if a == 1 && b == 1 {
        0
    } else {
        a.saturating_mul(b)
    }
}
