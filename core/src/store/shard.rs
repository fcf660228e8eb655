//! Store methods for shard artifacts: lookup tables, payout splits,
//! force records and per-shard summaries.

use super::SimStore;
use crate::{
    batch::{LookupRow, PayoutSplitRow, ShardOutput, ShardSink, ShardSummary},
    error::SimResult,
    force::{ForceEntry, ForceRegistry},
};
use rusqlite::{params, Connection};

impl ShardSink for SimStore {
    /// Write every artifact of one shard in a single transaction.
    fn write_shard(&mut self, run_id: &str, shard: &ShardOutput) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        let mode = shard.summary.mode.as_str();

        insert_summary(&tx, run_id, &shard.summary)?;
        for book in &shard.books {
            tx.execute(
                "INSERT INTO book (
                    run_id, mode, book_id, criteria,
                    payout_multiplier, base_game_wins, free_game_wins, book_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run_id,
                    mode,
                    book.id() as i64,
                    book.criteria(),
                    book.payout_multiplier(),
                    book.base_game_wins(),
                    book.free_game_wins(),
                    book.to_json()?,
                ],
            )?;
        }
        for row in &shard.lookup {
            tx.execute(
                "INSERT INTO lookup_row (run_id, mode, book_id, weight, payout)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![run_id, mode, row.book_id as i64, row.weight as i64, row.payout as i64],
            )?;
        }
        for row in shard.payout_split.iter().flatten() {
            tx.execute(
                "INSERT INTO payout_split (
                    run_id, mode, book_id, criteria, base_game_wins, free_game_wins
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id,
                    mode,
                    row.book_id as i64,
                    row.criteria,
                    row.base_game_wins,
                    row.free_game_wins,
                ],
            )?;
        }
        for entry in shard.force.entries() {
            tx.execute(
                "INSERT INTO force_record (
                    run_id, mode, worker, block, search_json, times_triggered, book_ids_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run_id,
                    mode,
                    shard.plan.worker as i64,
                    shard.plan.block as i64,
                    serde_json::to_string(&entry.search)?,
                    entry.times_triggered as i64,
                    serde_json::to_string(&entry.book_ids)?,
                ],
            )?;
        }
        for key in shard.force.force_keys() {
            tx.execute(
                "INSERT OR IGNORE INTO force_key (run_id, mode, key) VALUES (?1, ?2, ?3)",
                params![run_id, mode, key],
            )?;
        }

        tx.commit()?;
        log::debug!(
            "stored {} books for {mode} worker {} block {}",
            shard.books.len(),
            shard.plan.worker,
            shard.plan.block
        );
        Ok(())
    }
}

fn insert_summary(conn: &Connection, run_id: &str, s: &ShardSummary) -> SimResult<()> {
    conn.execute(
        "INSERT INTO shard_summary (
            run_id, mode, worker, block, sims,
            total_wins, base_wins, free_wins, rtp, base_rtp, free_rtp, stats_json
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            run_id,
            s.mode,
            s.worker as i64,
            s.block as i64,
            s.sims as i64,
            s.total_wins,
            s.base_wins,
            s.free_wins,
            s.rtp,
            s.base_rtp,
            s.free_rtp,
            serde_json::to_string(&s.stats)?,
        ],
    )?;
    Ok(())
}

impl SimStore {
    /// Lookup rows of every shard of a mode, merged in book-id order.
    pub fn merged_lookup(&self, run_id: &str, mode: &str) -> SimResult<Vec<LookupRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT book_id, weight, payout FROM lookup_row
             WHERE run_id = ?1 AND mode = ?2
             ORDER BY book_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| {
                Ok(LookupRow {
                    book_id: row.get::<_, i64>(0)? as u64,
                    weight: row.get::<_, i64>(1)? as u64,
                    payout: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn payout_split(&self, run_id: &str, mode: &str) -> SimResult<Vec<PayoutSplitRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT book_id, criteria, base_game_wins, free_game_wins FROM payout_split
             WHERE run_id = ?1 AND mode = ?2
             ORDER BY book_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| {
                Ok(PayoutSplitRow {
                    book_id: row.get::<_, i64>(0)? as u64,
                    criteria: row.get(1)?,
                    base_game_wins: row.get(2)?,
                    free_game_wins: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Force records of every shard of a mode folded into one registry.
    pub fn merged_force(&self, run_id: &str, mode: &str) -> SimResult<ForceRegistry> {
        let mut stmt = self.conn.prepare(
            "SELECT search_json, book_ids_json FROM force_record
             WHERE run_id = ?1 AND mode = ?2
             ORDER BY block ASC, worker ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut registry = ForceRegistry::new();
        for (search, book_ids) in rows {
            let entry = ForceEntry {
                search: serde_json::from_str(&search)?,
                times_triggered: 0,
                book_ids: serde_json::from_str(&book_ids)?,
            };
            registry.absorb(&entry);
        }
        Ok(registry)
    }

    pub fn force_keys(&self, run_id: &str, mode: &str) -> SimResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT key FROM force_key WHERE run_id = ?1 AND mode = ?2 ORDER BY key ASC",
        )?;
        let keys = stmt
            .query_map(params![run_id, mode], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn shard_summaries(&self, run_id: &str, mode: &str) -> SimResult<Vec<ShardSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT worker, block, sims, total_wins, base_wins, free_wins,
                    rtp, base_rtp, free_rtp, stats_json
             FROM shard_summary
             WHERE run_id = ?1 AND mode = ?2
             ORDER BY block ASC, worker ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    [row.get::<_, f64>(3)?, row.get(4)?, row.get(5)?],
                    [row.get::<_, f64>(6)?, row.get(7)?, row.get(8)?],
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (worker, block, sims, wins, rtps, stats) in rows {
            summaries.push(ShardSummary {
                mode: mode.to_string(),
                worker: worker as usize,
                block: block as usize,
                sims: sims as u64,
                total_wins: wins[0],
                base_wins: wins[1],
                free_wins: wins[2],
                rtp: rtps[0],
                base_rtp: rtps[1],
                free_rtp: rtps[2],
                stats: serde_json::from_str(&stats)?,
            });
        }
        Ok(summaries)
    }
}
