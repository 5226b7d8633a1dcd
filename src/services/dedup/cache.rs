//! Recent-window similarity cache.
//!
//! Bounded in-memory store of recently fingerprinted items, delivered or
//! not. Exact lookups go through the combined-hash map; near-duplicate
//! lookups scan every entry and score it against its own time-tiered
//! threshold.
//!
//! Not durable: a process restart empties the window, and the delivery
//! registry carries the long-horizon guarantee instead.

use super::config::DedupConfig;
use super::similarity::{combined_similarity, media_similarity, text_similarity, tier_threshold};
use crate::models::{CandidateItem, Fingerprint};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Fraction of capacity kept by a batch eviction.
const EVICTION_KEEP_RATIO: f64 = 0.8;

/// One cached item.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Fingerprint computed at evaluation time.
    pub fingerprint: Fingerprint,
    /// The item as it was evaluated.
    pub item: CandidateItem,
    /// Topic label, kept for omission reporting.
    pub topic: String,
    /// Insertion time; doubles as the entry's age base for tier selection.
    pub inserted_at: DateTime<Utc>,
}

/// A near-duplicate hit: the entry plus its combined similarity score.
#[derive(Debug)]
pub struct NearMatch<'a> {
    /// The matched cache entry.
    pub entry: &'a CacheEntry,
    /// Combined similarity, `0.0..=100.0`.
    pub score: f64,
}

/// Bounded recent-window store keyed by combined hash.
///
/// # Eviction
///
/// Coarse batch eviction rather than per-insert LRU: once an insert pushes
/// the size past capacity, entries are sorted by insertion time and only the
/// newest 80% of capacity survive. Eviction is rare relative to inserts, so
/// the occasional O(n log n) pass beats bookkeeping on every hit.
pub struct SimilarityCache {
    /// Entries keyed by combined hash.
    entries: HashMap<String, CacheEntry>,
    /// Combined hashes in insertion order, oldest first.
    order: Vec<String>,
    /// Maximum size before a batch eviction runs.
    capacity: usize,
}

impl SimilarityCache {
    /// Creates a cache with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts an entry, evicting the oldest entries when over capacity.
    pub fn insert(&mut self, entry: CacheEntry) {
        let key = entry.fingerprint.combined_hash.clone();
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push(key);
        }

        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }

        metrics::gauge!("relaygate_cache_size").set(self.entries.len() as f64);
    }

    /// Exact combined-hash lookup.
    #[must_use]
    pub fn find_exact(&self, fingerprint: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(&fingerprint.combined_hash)
    }

    /// Scans all entries for the best near-duplicate.
    ///
    /// Each entry is scored with the combined text/media similarity and
    /// accepted only when the score meets the threshold of the entry's own
    /// age tier. The comparison is inclusive so that identical media alone
    /// (combined 70) clears the first tier. Among accepted entries the
    /// highest score wins; ties go to the most recently inserted entry.
    #[must_use]
    pub fn find_nearest(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
        config: &DedupConfig,
    ) -> Option<NearMatch<'_>> {
        let mut best: Option<NearMatch<'_>> = None;

        for entry in self.entries.values() {
            let elapsed = now - entry.inserted_at;
            let threshold = tier_threshold(elapsed, config);

            let text_sim =
                text_similarity(&fingerprint.normalized_text, &entry.fingerprint.normalized_text);
            let media_sim =
                media_similarity(&fingerprint.media_refs, &entry.fingerprint.media_refs);
            let score = combined_similarity(text_sim, media_sim);

            if score < threshold {
                continue;
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    score > current.score
                        || ((score - current.score).abs() < f64::EPSILON
                            && entry.inserted_at > current.entry.inserted_at)
                },
            };
            if better {
                best = Some(NearMatch { entry, score });
            }
        }

        best
    }

    /// Current number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        metrics::gauge!("relaygate_cache_size").set(0.0);
    }

    /// Batch eviction: keep the newest `capacity * 0.8` entries.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn evict_oldest(&mut self) {
        let before = self.entries.len();
        let keep = (self.capacity as f64 * EVICTION_KEEP_RATIO).floor() as usize;

        let mut sorted: Vec<(String, CacheEntry)> = self.entries.drain().collect();
        sorted.sort_by(|a, b| b.1.inserted_at.cmp(&a.1.inserted_at));
        sorted.truncate(keep);

        self.order.clear();
        for (key, entry) in sorted.into_iter().rev() {
            self.order.push(key.clone());
            self.entries.insert(key, entry);
        }

        tracing::debug!(before, after = self.entries.len(), "similarity cache evicted");
    }
}
