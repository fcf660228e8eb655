//! Store methods for simulation books.

use super::SimStore;
use crate::{book::Book, error::SimResult, types::BookId};
use rusqlite::{params, OptionalExtension};

impl SimStore {
    pub fn book_count(&self, run_id: &str, mode: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM book WHERE run_id = ?1 AND mode = ?2",
            params![run_id, mode],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Book counts per criteria, ordered by criteria name.
    pub fn criteria_counts(&self, run_id: &str, mode: &str) -> SimResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT criteria, COUNT(*) FROM book
             WHERE run_id = ?1 AND mode = ?2
             GROUP BY criteria ORDER BY criteria ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The serialized book exactly as the simulation emitted it.
    pub fn book_json(
        &self,
        run_id: &str,
        mode: &str,
        book_id: BookId,
    ) -> SimResult<Option<String>> {
        let json = self
            .conn
            .query_row(
                "SELECT book_json FROM book
                 WHERE run_id = ?1 AND mode = ?2 AND book_id = ?3",
                params![run_id, mode, book_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json)
    }

    pub fn load_book(&self, run_id: &str, mode: &str, book_id: BookId) -> SimResult<Option<Book>> {
        match self.book_json(run_id, mode, book_id)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All books of a mode in book-id order.
    pub fn books_for_mode(&self, run_id: &str, mode: &str) -> SimResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(
            "SELECT book_json FROM book
             WHERE run_id = ?1 AND mode = ?2
             ORDER BY book_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, mode], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut books = Vec::with_capacity(rows.len());
        for json in rows {
            books.push(serde_json::from_str(&json)?);
        }
        Ok(books)
    }
}
