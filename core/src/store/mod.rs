//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The batch runner hands finished shards to a ShardSink; it never
//! executes SQL directly.

use crate::error::SimResult;
use rusqlite::{params, Connection};

mod books;
mod shard;

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL is ignored for in-memory databases.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_books.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        game_id: &str,
        seed: u64,
        version: &str,
        started_at: &str,
    ) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, game_id, seed, version, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, game_id, seed as i64, version, started_at],
        )?;
        Ok(())
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<u64> {
        let seed: i64 = self.conn.query_row(
            "SELECT seed FROM run WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(seed as u64)
    }
}
