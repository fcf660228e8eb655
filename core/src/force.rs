//! Force-event registry: rare conditions and the books they occurred in.
//!
//! Records are staged while an attempt runs. A REPEAT drops them; an
//! ACCEPT imprints them under the accepted book id.

use crate::types::BookId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A string-keyed description, e.g. {kind: BONK, symbol: Bat, gametype: base}.
pub type ForceDescription = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceRecord {
    pub times_triggered: u64,
    pub book_ids: Vec<BookId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceEntry {
    pub search: ForceDescription,
    pub times_triggered: u64,
    pub book_ids: Vec<BookId>,
}

#[derive(Debug, Clone, Default)]
pub struct ForceRegistry {
    staged: Vec<ForceDescription>,
    records: BTreeMap<ForceDescription, ForceRecord>,
    force_keys: BTreeSet<String>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let description = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.staged.push(description);
    }

    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Move staged records into the registry under `book_id`.
    /// A book id is listed at most once per description.
    pub fn imprint(&mut self, book_id: BookId) {
        for description in self.staged.drain(..) {
            self.force_keys.extend(description.keys().cloned());
            let record = self.records.entry(description).or_default();
            if !record.book_ids.contains(&book_id) {
                record.times_triggered += 1;
                record.book_ids.push(book_id);
            }
        }
    }

    /// Fold another shard's registry into this one.
    pub fn merge(&mut self, other: &ForceRegistry) {
        self.force_keys.extend(other.force_keys.iter().cloned());
        for (description, theirs) in &other.records {
            self.absorb_ids(description, &theirs.book_ids);
        }
    }

    /// Fold one persisted entry into the registry.
    pub fn absorb(&mut self, entry: &ForceEntry) {
        self.force_keys.extend(entry.search.keys().cloned());
        self.absorb_ids(&entry.search, &entry.book_ids);
    }

    fn absorb_ids(&mut self, description: &ForceDescription, book_ids: &[BookId]) {
        let ours = self.records.entry(description.clone()).or_default();
        for id in book_ids {
            if !ours.book_ids.contains(id) {
                ours.times_triggered += 1;
                ours.book_ids.push(*id);
            }
        }
    }

    pub fn force_keys(&self) -> impl Iterator<Item = &str> {
        self.force_keys.iter().map(String::as_str)
    }

    pub fn get(&self, description: &ForceDescription) -> Option<&ForceRecord> {
        self.records.get(description)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entries(&self) -> Vec<ForceEntry> {
        self.records
            .iter()
            .map(|(search, r)| ForceEntry {
                search: search.clone(),
                times_triggered: r.times_triggered,
                book_ids: r.book_ids.clone(),
            })
            .collect()
    }
}
