//! Running usage counters.

use crate::storage::PartitionStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Running totals for the current session, persisted as a single JSON
/// object that is rewritten on change.
///
/// Restored at startup only when the persisted session started the same
/// calendar day; a stale file from a previous day starts fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Items evaluated since the session started.
    pub total_analyzed: u64,
    /// Items omitted as duplicates since the session started.
    pub total_omitted: u64,
    /// Omission counts per author handle.
    pub omissions_by_author: HashMap<String, u64>,
    /// Omission counts per topic label.
    pub omissions_by_topic: HashMap<String, u64>,
    /// When the session started.
    pub session_start: DateTime<Utc>,
}

impl UsageStats {
    /// Creates empty counters for a session starting now.
    #[must_use]
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            total_analyzed: 0,
            total_omitted: 0,
            omissions_by_author: HashMap::new(),
            omissions_by_topic: HashMap::new(),
            session_start,
        }
    }

    /// Restores persisted counters, keeping them only when the persisted
    /// session started on the same day as `now`. Any read or parse failure
    /// degrades to fresh counters.
    #[must_use]
    pub fn restore(store: &dyn PartitionStore, name: &str, now: DateTime<Utc>) -> Self {
        match store.read(name) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Self>(&bytes) {
                Ok(stats) if stats.session_start.date_naive() == now.date_naive() => stats,
                Ok(_) => {
                    tracing::debug!("persisted stats are from a previous day, starting fresh");
                    Self::new(now)
                },
                Err(e) => {
                    tracing::warn!(error = %e, "persisted stats unparsable, starting fresh");
                    Self::new(now)
                },
            },
            Ok(None) => Self::new(now),
            Err(e) => {
                tracing::warn!(error = %e, "persisted stats unreadable, starting fresh");
                Self::new(now)
            },
        }
    }

    /// Rewrites the persisted stats object.
    pub fn persist(&self, store: &dyn PartitionStore, name: &str) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "serialize_stats".to_string(),
            cause: e.to_string(),
        })?;
        store.write(name, &bytes)
    }

    /// Counts one analyzed item.
    pub fn record_analyzed(&mut self) {
        self.total_analyzed += 1;
    }

    /// Counts one omission against its author and topic.
    pub fn record_omission(&mut self, author: &str, topic: &str) {
        self.total_omitted += 1;
        *self
            .omissions_by_author
            .entry(author.to_string())
            .or_default() += 1;
        *self.omissions_by_topic.entry(topic.to_string()).or_default() += 1;
    }

    /// Share of analyzed items that were omitted, as a rounded percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn efficiency_pct(&self) -> u8 {
        if self.total_analyzed == 0 {
            return 0;
        }
        ((self.total_omitted as f64 / self.total_analyzed as f64) * 100.0).round() as u8
    }

    /// The `n` authors with the most omissions, descending.
    #[must_use]
    pub fn top_authors(&self, n: usize) -> Vec<(String, u64)> {
        Self::top_n(&self.omissions_by_author, n)
    }

    /// The `n` topics with the most omissions, descending.
    #[must_use]
    pub fn top_topics(&self, n: usize) -> Vec<(String, u64)> {
        Self::top_n(&self.omissions_by_topic, n)
    }

    /// Resets every counter for a session starting at `session_start`.
    pub fn reset(&mut self, session_start: DateTime<Utc>) {
        *self = Self::new(session_start);
    }

    fn top_n(counts: &HashMap<String, u64>, n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> =
            counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        // Count descending, then name for a stable order between equals.
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}
