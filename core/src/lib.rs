//! bonk-core: deterministic simulation engine for a two-reel slot with
//! BONK / SUPER_BONK free-spin bonus rounds.

pub mod batch;
pub mod bonus;
pub mod book;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod force;
pub mod gamestate;
pub mod ledger;
pub mod reels;
pub mod rng;
pub mod store;
pub mod symbol;
pub mod types;
