//! Durable delivery registry.
//!
//! Day-partitioned log of items that were actually delivered, giving the
//! gate its cross-session at-most-once guarantee. The current day is
//! mirrored in an in-memory index keyed by combined hash for the fast path;
//! older days are scanned on demand with a bounded lookback.
//!
//! Partition files are append-only from this process's perspective. Nothing
//! here is safe against multiple processes writing the same partition; a
//! deployment running several gate instances needs a single writer in front
//! of the store.

use super::config::DedupConfig;
use super::similarity::text_similarity;
use crate::models::{CandidateItem, DeliveryMeta, Fingerprint, SentRecord};
use crate::storage::PartitionStore;
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix of sent partition file names.
const PARTITION_PREFIX: &str = "sent-";
/// Suffix of sent partition file names.
const PARTITION_SUFFIX: &str = ".json";

/// A registry hit: the persisted record plus time since its delivery.
#[derive(Debug)]
pub struct RegistryMatch {
    /// The matched sent record.
    pub record: SentRecord,
    /// Time elapsed since the record's delivery.
    pub elapsed: Duration,
}

/// Durable, day-partitioned store of delivered items.
pub struct DeliveryRegistry {
    /// Storage port for `sent-<date>.json` partitions.
    store: Arc<dyn PartitionStore>,
    /// Current day's records keyed by combined hash.
    index: HashMap<String, SentRecord>,
    /// The day the index mirrors.
    today: NaiveDate,
    /// How many prior partitions a lookback scans.
    lookback: usize,
    /// Text-similarity bar for the lookback fallback.
    text_threshold: f64,
    /// Partitions older than this many days are skipped.
    retention_days: u32,
}

impl DeliveryRegistry {
    /// Opens the registry, loading today's partition into the index.
    ///
    /// A missing or unreadable partition degrades to an empty index; the
    /// registry never fails to open over bad data.
    #[must_use]
    pub fn open(store: Arc<dyn PartitionStore>, config: &DedupConfig) -> Self {
        let today = Utc::now().date_naive();
        let mut registry = Self {
            store,
            index: HashMap::new(),
            today,
            lookback: config.registry_lookback,
            text_threshold: config.registry_text_threshold,
            retention_days: config.retention_days,
        };
        registry.index = registry.load_index(today);
        tracing::info!(
            day = %today,
            records = registry.index.len(),
            "delivery registry opened"
        );
        registry
    }

    /// Looks up a fingerprint: current-day index first, then bounded
    /// lookback across prior partitions.
    ///
    /// The lookback accepts an exact combined-hash match or normalized-text
    /// similarity strictly above the registry threshold; the first match in
    /// the newest partition wins. All read failures degrade to "not found".
    pub fn lookup(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<RegistryMatch> {
        self.roll_day(now.date_naive());

        if let Some(record) = self.index.get(&fingerprint.combined_hash) {
            return Some(RegistryMatch {
                elapsed: now - record.delivered_at(),
                record: record.clone(),
            });
        }

        self.scan_lookback(fingerprint, now)
    }

    /// Appends a sent record to today's partition and updates the index.
    ///
    /// The partition write is durable before this returns `Ok`; a failed
    /// write surfaces as an error because a delivery that is not recorded
    /// would silently break at-most-once. Concurrent duplicate records for
    /// the same fingerprint both append; single-writer dedup is the
    /// caller's responsibility via `evaluate` + `commit` ordering.
    pub fn record(
        &mut self,
        item: &CandidateItem,
        fingerprint: &Fingerprint,
        meta: &DeliveryMeta,
        delivered_at: DateTime<Utc>,
    ) -> Result<SentRecord> {
        self.roll_day(delivered_at.date_naive());

        let record = SentRecord::build(item, fingerprint, meta, delivered_at);
        let name = Self::partition_name(self.today);

        let mut records = match self.store.read(&name) {
            Ok(Some(bytes)) => serde_json::from_slice::<Vec<SentRecord>>(&bytes).unwrap_or_else(|e| {
                // Unparsable current partition: rebuild from the in-memory
                // mirror rather than wedging every commit for the day.
                tracing::warn!(partition = %name, error = %e, "rebuilding corrupt current partition from index");
                self.index_snapshot()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(partition = %name, error = %e, "rebuilding unreadable current partition from index");
                self.index_snapshot()
            },
        };
        records.push(record.clone());

        let bytes = serde_json::to_vec_pretty(&records).map_err(|e| Error::OperationFailed {
            operation: "serialize_sent_partition".to_string(),
            cause: e.to_string(),
        })?;
        self.store.write(&name, &bytes)?;

        self.index
            .insert(record.fingerprint.combined_hash.clone(), record.clone());

        tracing::debug!(
            id = %record.id,
            partition = %name,
            topic = %record.meta.topic,
            "sent record appended"
        );

        Ok(record)
    }

    /// Number of records delivered today.
    #[must_use]
    pub fn today_len(&self) -> usize {
        self.index.len()
    }

    /// Swaps in a fresh index when the day changes.
    fn roll_day(&mut self, day: NaiveDate) {
        if day != self.today {
            tracing::info!(from = %self.today, to = %day, "delivery registry day rollover");
            self.today = day;
            self.index = self.load_index(day);
        }
    }

    /// Loads one day's partition into an index, degrading to empty.
    fn load_index(&self, day: NaiveDate) -> HashMap<String, SentRecord> {
        self.load_partition(&Self::partition_name(day))
            .unwrap_or_default()
            .into_iter()
            .map(|r| (r.fingerprint.combined_hash.clone(), r))
            .collect()
    }

    /// Scans prior partitions, newest first, up to the lookback depth.
    fn scan_lookback(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<RegistryMatch> {
        let mut dates: Vec<NaiveDate> = match self.store.list() {
            Ok(names) => names
                .iter()
                .filter_map(|n| Self::partition_date(n))
                // Today's partition is already fully mirrored by the index.
                .filter(|d| *d != self.today)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "partition listing failed, lookback skipped");
                return None;
            },
        };
        dates.sort_unstable_by(|a, b| b.cmp(a));

        for date in dates
            .into_iter()
            .filter(|d| (self.today - *d).num_days() <= i64::from(self.retention_days))
            .take(self.lookback)
        {
            let name = Self::partition_name(date);
            let Some(records) = self.load_partition(&name) else {
                continue;
            };

            for record in records {
                let exact = record.fingerprint.combined_hash == fingerprint.combined_hash;
                let verbatim = !exact
                    && text_similarity(
                        &fingerprint.normalized_text,
                        &record.item.normalized_text,
                    ) > self.text_threshold;

                if exact || verbatim {
                    tracing::debug!(
                        partition = %name,
                        id = %record.id,
                        exact,
                        "lookback matched a delivered item"
                    );
                    return Some(RegistryMatch {
                        elapsed: now - record.delivered_at(),
                        record,
                    });
                }
            }
        }

        None
    }

    /// Reads and parses one partition. Missing, unreadable, and corrupt
    /// files all degrade to `None`; corrupt files are left in place.
    fn load_partition(&self, name: &str) -> Option<Vec<SentRecord>> {
        match self.store.read(name) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(records) => Some(records),
                Err(e) => {
                    tracing::warn!(partition = %name, error = %e, "skipping corrupt partition");
                    metrics::counter!("relaygate_corrupt_partitions_total").increment(1);
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(partition = %name, error = %e, "skipping unreadable partition");
                None
            },
        }
    }

    /// Today's records in delivery order, for partition rebuilds.
    fn index_snapshot(&self) -> Vec<SentRecord> {
        let mut records: Vec<SentRecord> = self.index.values().cloned().collect();
        records.sort_by_key(|r| r.timestamp);
        records
    }

    /// `sent-<ISO-date>.json` for a day.
    fn partition_name(day: NaiveDate) -> String {
        format!("{PARTITION_PREFIX}{day}{PARTITION_SUFFIX}")
    }

    /// Parses the day out of a partition file name.
    fn partition_date(name: &str) -> Option<NaiveDate> {
        let date = name
            .strip_prefix(PARTITION_PREFIX)?
            .strip_suffix(PARTITION_SUFFIX)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::services::dedup::FingerprintGenerator;
    use crate::storage::FsPartitionStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 12, 0, 0).unwrap()
    }

    fn open_registry(dir: &std::path::Path) -> DeliveryRegistry {
        let store = Arc::new(FsPartitionStore::with_create(dir).unwrap());
        DeliveryRegistry::open(store, &DedupConfig::default())
    }

    fn fingerprinted(text: &str, author: &str, at: DateTime<Utc>) -> (CandidateItem, Fingerprint) {
        let item = CandidateItem::new(text, author, at);
        let fingerprint = FingerprintGenerator::fingerprint(&item);
        (item, fingerprint)
    }

    #[test]
    fn test_record_then_lookup_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", now());
        let meta = DeliveryMeta::new("d-1", "front-page").with_media_kind(MediaKind::Image);
        registry.record(&item, &fp, &meta, now()).unwrap();

        let hit = registry.lookup(&fp, now() + Duration::minutes(40)).unwrap();
        assert_eq!(hit.record.id, "d-1");
        assert_eq!(hit.elapsed, Duration::minutes(40));
    }

    #[test]
    fn test_restart_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", now());

        {
            let mut registry = open_registry(dir.path());
            registry
                .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), now())
                .unwrap();
        }

        // Fresh instance simulating a process restart.
        let mut registry = open_registry(dir.path());
        // Same calendar day, so the reloaded current-day index answers.
        let hit = registry.lookup(&fp, now() + Duration::hours(1));
        assert!(hit.is_some());
    }

    #[test]
    fn test_lookback_exact_match_prior_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let two_days_ago = now() - Duration::days(2);
        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", two_days_ago);
        registry
            .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), two_days_ago)
            .unwrap();

        // Lookup at `now` rolls the index to today; only lookback can match.
        let hit = registry.lookup(&fp, now()).unwrap();
        assert_eq!(hit.record.id, "d-1");
        assert_eq!(hit.elapsed, Duration::days(2));
    }

    #[test]
    fn test_lookback_text_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let yesterday = now() - Duration::days(1);
        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", yesterday);
        registry
            .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), yesterday)
            .unwrap();

        // Different author changes the combined hash, but the verbatim text
        // clears the fixed 95 bar (identical strings score 100).
        let (_, other_fp) = fingerprinted("Mayor opens the NEW bridge!", "@otherdesk", now());
        let hit = registry.lookup(&other_fp, now()).unwrap();
        assert_eq!(hit.record.id, "d-1");
    }

    #[test]
    fn test_lookback_rejects_merely_similar_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let yesterday = now() - Duration::days(1);
        let (item, fp) = fingerprinted(
            "mayor opens the new bridge across the river today",
            "@citydesk",
            yesterday,
        );
        registry
            .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), yesterday)
            .unwrap();

        // High but sub-95 overlap must not match days later.
        let (_, other_fp) = fingerprinted(
            "mayor opens the new bridge across the river tomorrow",
            "@otherdesk",
            now(),
        );
        assert!(registry.lookup(&other_fp, now()).is_none());
    }

    #[test]
    fn test_corrupt_partition_skipped_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsPartitionStore::with_create(dir.path()).unwrap());

        let two_days_ago = now() - Duration::days(2);
        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", two_days_ago);
        {
            let mut registry = DeliveryRegistry::open(store.clone(), &DedupConfig::default());
            registry
                .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), two_days_ago)
                .unwrap();
        }

        // A corrupt partition between today and the good one.
        let yesterday = (now() - Duration::days(1)).date_naive();
        store
            .write(&format!("sent-{yesterday}.json"), b"{ not json")
            .unwrap();

        let mut registry = DeliveryRegistry::open(store.clone(), &DedupConfig::default());
        let hit = registry.lookup(&fp, now());
        assert!(hit.is_some());

        // Skipped, not deleted.
        assert!(store.read(&format!("sent-{yesterday}.json")).unwrap().is_some());
    }

    #[test]
    fn test_retention_horizon_skips_old_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let ten_days_ago = now() - Duration::days(10);
        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", ten_days_ago);
        registry
            .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), ten_days_ago)
            .unwrap();

        assert!(registry.lookup(&fp, now()).is_none());
    }

    #[test]
    fn test_day_rollover_swaps_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = open_registry(dir.path());

        let (item, fp) = fingerprinted("mayor opens the new bridge", "@citydesk", now());
        registry
            .record(&item, &fp, &DeliveryMeta::new("d-1", "front-page"), now())
            .unwrap();
        assert_eq!(registry.today_len(), 1);

        // Next day: the index resets, but lookback still finds the record.
        let tomorrow = now() + Duration::days(1);
        let hit = registry.lookup(&fp, tomorrow);
        assert!(hit.is_some());
        assert_eq!(registry.today_len(), 0);
    }

    #[test]
    fn test_partition_name_round_trip() {
        let day = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let name = DeliveryRegistry::partition_name(day);
        assert_eq!(name, "sent-2025-07-14.json");
        assert_eq!(DeliveryRegistry::partition_date(&name), Some(day));
        assert_eq!(DeliveryRegistry::partition_date("omissions-2025-07-14.json"), None);
        assert_eq!(DeliveryRegistry::partition_date("sent-garbage.json"), None);
    }
}
