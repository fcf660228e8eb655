use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown reel set '{id}'")]
    UnknownReelSet { id: String },

    #[error("Reel {reel} of reel set '{id}' is empty")]
    EmptyReel { id: String, reel: usize },

    #[error("Bet mode '{name}' not found")]
    UnknownBetMode { name: String },

    #[error("Criteria '{criteria}' not found in bet mode '{mode}'")]
    UnknownCriteria { mode: String, criteria: String },

    #[error("Unknown bonus kind '{kind}'")]
    UnknownBonusKind { kind: String },

    #[error(
        "Base + free game payout mismatch in sim {sim} ({mode}): \
         base={base:.2} free={free:.2} total={total:.2} cap={cap:.2}; bonus state: {bonus}"
    )]
    LedgerMismatch {
        sim: u64,
        mode: String,
        base: f64,
        free: f64,
        total: f64,
        cap: f64,
        bonus: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Batch incomplete, failed shards: {}", failed.join("; "))]
    IncompleteBatch { failed: Vec<String> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
