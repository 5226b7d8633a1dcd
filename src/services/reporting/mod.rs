//! Omission and usage reporting.
//!
//! Accumulates counts, records per-omission detail, writes both through to
//! durable storage, and notifies the external channel. Every durable write
//! and notifier push here degrades with a warning on failure; reporting is
//! never allowed to fail the relay.

mod notify;
mod omissions;
mod stats;
mod summary;

pub use notify::{NoopNotifier, OmissionNotifier};
pub use omissions::OmissionLog;
pub use stats::UsageStats;
pub use summary::{DailySummary, format_elapsed};

use crate::models::OmissionRecord;
use crate::storage::PartitionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Name of the persisted stats object.
const STATS_PARTITION: &str = "stats.json";

/// Reporting facade the engine drives.
///
/// Owns the usage counters, the omission log, and the notifier port.
pub struct Reporter {
    stats: UsageStats,
    stats_store: Arc<dyn PartitionStore>,
    omissions: OmissionLog,
    notifier: Arc<dyn OmissionNotifier>,
}

impl Reporter {
    /// Opens the reporter, restoring persisted stats when they belong to
    /// the current day.
    #[must_use]
    pub fn open(
        stats_store: Arc<dyn PartitionStore>,
        omission_store: Arc<dyn PartitionStore>,
        notifier: Arc<dyn OmissionNotifier>,
        now: DateTime<Utc>,
    ) -> Self {
        let stats = UsageStats::restore(stats_store.as_ref(), STATS_PARTITION, now);
        Self {
            stats,
            stats_store,
            omissions: OmissionLog::new(omission_store, now.date_naive()),
            notifier,
        }
    }

    /// Counts one analyzed item.
    pub fn item_analyzed(&mut self) {
        self.stats.record_analyzed();
    }

    /// Records one omission: counters, durable log, and notification.
    pub fn omission(&mut self, record: &OmissionRecord, author: &str) {
        self.stats.record_omission(author, &record.topic);
        self.omissions.append(record);
        self.persist_stats();

        if let Err(e) = self.notifier.omission(record) {
            tracing::warn!(error = %e, "omission notification failed");
        }
    }

    /// Builds the structured daily summary for the external channel.
    #[must_use]
    pub fn daily_summary(&self, now: DateTime<Utc>) -> DailySummary {
        DailySummary::build(&self.stats, self.omissions.today_len(), now)
    }

    /// Pushes the daily summary and resets the daily counters, mirroring
    /// the nightly report cycle. Scheduling is the host's concern.
    pub fn daily_rollover(&mut self, now: DateTime<Utc>) -> DailySummary {
        let summary = self.daily_summary(now);
        if let Err(e) = self.notifier.daily_summary(&summary) {
            tracing::warn!(error = %e, "daily summary notification failed");
        }

        self.stats.reset(now);
        self.omissions.reset_day(now.date_naive());
        self.persist_stats();
        summary
    }

    /// Today's omission records, newest last.
    #[must_use]
    pub fn omissions_today(&self) -> &[OmissionRecord] {
        self.omissions.today()
    }

    /// A copy of the running counters.
    #[must_use]
    pub fn stats_snapshot(&self) -> UsageStats {
        self.stats.clone()
    }

    /// Flushes the counters to durable storage.
    pub fn flush(&self) {
        self.persist_stats();
    }

    fn persist_stats(&self) {
        if let Err(e) = self.stats.persist(self.stats_store.as_ref(), STATS_PARTITION) {
            tracing::warn!(error = %e, "stats write dropped");
        }
    }
}
