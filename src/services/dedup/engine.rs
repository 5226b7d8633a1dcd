//! Decision engine orchestrator.
//!
//! Runs the classification pipeline over the registry and the cache, applies
//! the duplicate side effects, and exposes the two operations a caller
//! needs: `evaluate` and `commit`.

use super::cache::{CacheEntry, SimilarityCache};
use super::config::DedupConfig;
use super::fingerprint::FingerprintGenerator;
use super::registry::DeliveryRegistry;
use crate::models::{
    CandidateItem, Classification, Decision, DeliveryMeta, DeliveryTicket, Fingerprint,
    MatchedContent, OmissionDetail, OmissionRecord, OmittedItem, SentRecord,
};
use crate::services::reporting::{
    DailySummary, OmissionNotifier, Reporter, UsageStats, format_elapsed,
};
use crate::storage::FsPartitionStore;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Characters of matched text kept in omission previews.
const PREVIEW_CHARS: usize = 100;

/// A terminal duplicate classification with its evidence.
struct DuplicateHit {
    classification: Classification,
    matched: MatchedContent,
    similarity: u8,
    elapsed: Duration,
}

/// Mutable engine state behind the single mutual-exclusion boundary.
///
/// Several upstream feeds may submit near-simultaneous items; one lock
/// around the cache, the registry index, and the counters keeps two
/// `evaluate` calls from interleaving their mutations.
struct EngineInner {
    cache: SimilarityCache,
    registry: DeliveryRegistry,
    reporter: Reporter,
}

impl EngineInner {
    /// Runs the ordered checks; the first match is terminal.
    fn classify(
        &mut self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
        config: &DedupConfig,
    ) -> Option<DuplicateHit> {
        // 1. Already delivered through the relay (durable, cross-session).
        if let Some(hit) = self.registry.lookup(fingerprint, now) {
            return Some(DuplicateHit {
                classification: Classification::AlreadyDelivered,
                matched: MatchedContent {
                    author: hit.record.item.author.clone(),
                    text: hit.record.item.text.clone(),
                    matched_at: hit.record.delivered_at(),
                },
                similarity: 100,
                elapsed: hit.elapsed,
            });
        }

        // 2. Exact hash in the recent window, delivered or not.
        if let Some(entry) = self.cache.find_exact(fingerprint) {
            return Some(DuplicateHit {
                classification: Classification::ExactDuplicate,
                matched: Self::matched_entry(entry),
                similarity: 100,
                elapsed: now - entry.inserted_at,
            });
        }

        // 3. Near duplicate over the whole window, tiered by entry age.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        if let Some(near) = self.cache.find_nearest(fingerprint, now, config) {
            return Some(DuplicateHit {
                classification: Classification::NearDuplicate,
                matched: Self::matched_entry(near.entry),
                similarity: near.score.round() as u8,
                elapsed: now - near.entry.inserted_at,
            });
        }

        None
    }

    fn matched_entry(entry: &CacheEntry) -> MatchedContent {
        MatchedContent {
            author: entry.item.author.clone(),
            text: entry.item.text.clone(),
            matched_at: entry.inserted_at,
        }
    }
}

/// The dedup gate.
///
/// One instance owns the similarity cache, the delivery registry index, and
/// the reporting counters for the whole process; construct it once at
/// startup and call [`DedupEngine::shutdown`] before exit.
///
/// # Example
///
/// ```rust,ignore
/// let engine = DedupEngine::open(DedupConfig::from_env(), Arc::new(NoopNotifier))?;
///
/// let decision = engine.evaluate(item);
/// if let Some(ticket) = decision.ticket {
///     channel.deliver(ticket.item())?;
///     engine.commit(ticket, DeliveryMeta::new(delivery_id, "front-page"))?;
/// }
/// ```
pub struct DedupEngine {
    config: DedupConfig,
    inner: Mutex<EngineInner>,
}

impl DedupEngine {
    /// Opens the engine with filesystem-backed storage under the
    /// configured data directory.
    ///
    /// Loads today's registry partition, today's omission partition, and
    /// the persisted stats.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage directory cannot be created.
    pub fn open(config: DedupConfig, notifier: Arc<dyn OmissionNotifier>) -> Result<Self> {
        let sent_store = Arc::new(FsPartitionStore::with_create(config.sent_dir())?);
        let omission_store = Arc::new(FsPartitionStore::with_create(config.omissions_dir())?);
        let stats_store = Arc::new(FsPartitionStore::with_create(&config.data_dir)?);

        let registry = DeliveryRegistry::open(sent_store, &config);
        let reporter = Reporter::open(stats_store, omission_store, notifier, Utc::now());
        let cache = SimilarityCache::new(config.cache_capacity);

        Ok(Self {
            config,
            inner: Mutex::new(EngineInner {
                cache,
                registry,
                reporter,
            }),
        })
    }

    /// Classifies one candidate item.
    ///
    /// Checks run strictly in order — already delivered, exact duplicate,
    /// near duplicate — and the first match is terminal. Duplicate outcomes
    /// increment the omission counters, append an omission record, and
    /// notify the reporting channel; those side effects never fail the
    /// call.
    ///
    /// A `Unique` item is inserted into the similarity cache immediately,
    /// not at `commit`: items the caller later drops for unrelated reasons
    /// must still suppress a true duplicate of themselves within the
    /// window.
    ///
    /// `item.arrived_at` is "now" for every elapsed-time computation.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    #[instrument(
        skip(self, item),
        fields(
            operation = "evaluate",
            author = %item.author,
            text_length = item.text.len()
        )
    )]
    pub fn evaluate(&self, item: CandidateItem) -> Decision {
        let start = Instant::now();
        let now = item.arrived_at;
        let fingerprint = FingerprintGenerator::fingerprint(&item);

        let mut inner = self.lock_inner();
        inner.reporter.item_analyzed();

        let decision = match inner.classify(&fingerprint, now, &self.config) {
            Some(hit) => {
                let record = Self::build_omission(&item, &fingerprint, &hit, now);
                inner.reporter.omission(&record, &item.author);

                tracing::info!(
                    classification = %hit.classification,
                    similarity = hit.similarity,
                    matched_author = %hit.matched.author,
                    topic = %fingerprint.topic,
                    "duplicate omitted"
                );

                Decision::duplicate(hit.classification, hit.matched, hit.similarity, hit.elapsed)
            },
            None => {
                inner.cache.insert(CacheEntry {
                    topic: fingerprint.topic.clone(),
                    fingerprint: fingerprint.clone(),
                    item: item.clone(),
                    inserted_at: now,
                });

                tracing::debug!(topic = %fingerprint.topic, "unique item cached");
                Decision::unique(DeliveryTicket::new(item, fingerprint))
            },
        };
        drop(inner);

        metrics::counter!(
            "relaygate_decisions_total",
            "classification" => decision.classification.as_str()
        )
        .increment(1);
        metrics::histogram!("relaygate_evaluate_duration_ms")
            .record(start.elapsed().as_millis() as f64);

        decision
    }

    /// Records a successful delivery in the durable registry.
    ///
    /// Call only after the caller's own channel has delivered the item.
    /// The ticket came from a `Unique` decision, so duplication is not
    /// re-checked here. The registry write is durable before this returns.
    #[instrument(skip(self, ticket, meta), fields(operation = "commit", id = %meta.id))]
    pub fn commit(&self, ticket: DeliveryTicket, meta: DeliveryMeta) -> Result<SentRecord> {
        let (item, fingerprint) = ticket.into_parts();
        let delivered_at = Utc::now();

        let mut inner = self.lock_inner();
        let record = inner.registry.record(&item, &fingerprint, &meta, delivered_at)?;
        drop(inner);

        metrics::counter!(
            "relaygate_deliveries_total",
            "channel" => meta.channel.clone()
        )
        .increment(1);

        Ok(record)
    }

    /// Builds the structured daily summary without resetting anything.
    #[must_use]
    pub fn daily_summary(&self) -> DailySummary {
        self.lock_inner().reporter.daily_summary(Utc::now())
    }

    /// Pushes the daily summary to the notifier and resets the daily
    /// counters. The host schedules this; the gate only executes it.
    pub fn daily_rollover(&self) -> DailySummary {
        self.lock_inner().reporter.daily_rollover(Utc::now())
    }

    /// Today's omission records, for on-demand inspection.
    #[must_use]
    pub fn omissions_today(&self) -> Vec<OmissionRecord> {
        self.lock_inner().reporter.omissions_today().to_vec()
    }

    /// A copy of the running usage counters.
    #[must_use]
    pub fn stats_snapshot(&self) -> UsageStats {
        self.lock_inner().reporter.stats_snapshot()
    }

    /// Current similarity-cache size.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.lock_inner().cache.len()
    }

    /// Flushes counters to durable storage. Call before process exit.
    pub fn shutdown(&self) {
        self.lock_inner().reporter.flush();
        tracing::info!("dedup engine shut down");
    }

    /// Locks the engine state.
    ///
    /// Poisoning is handled fail-open: a panic elsewhere must not wedge the
    /// relay, and the worst case of acting on mid-update state is one
    /// missed or doubled duplicate check.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Builds the omission record for a duplicate hit.
    fn build_omission(
        item: &CandidateItem,
        fingerprint: &Fingerprint,
        hit: &DuplicateHit,
        now: DateTime<Utc>,
    ) -> OmissionRecord {
        let mut preview: String = hit.matched.text.chars().take(PREVIEW_CHARS).collect();
        if hit.matched.text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }

        OmissionRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: now.timestamp_millis(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            item: OmittedItem {
                text: item.text.clone(),
                author: item.author.clone(),
                url: item.url.clone(),
                media_ref: item.media_ref.clone(),
            },
            classification: hit.classification,
            topic: fingerprint.topic.clone(),
            detail: OmissionDetail {
                similarity: hit.similarity,
                matched_author: hit.matched.author.clone(),
                matched_time: hit.matched.matched_at.format("%H:%M:%S").to_string(),
                matched_text_preview: preview,
                elapsed_human: format_elapsed(hit.elapsed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reporting::NoopNotifier;

    fn engine(dir: &std::path::Path) -> DedupEngine {
        let config = DedupConfig::default().with_data_dir(dir);
        DedupEngine::open(config, Arc::new(NoopNotifier)).unwrap()
    }

    fn item(text: &str, author: &str) -> CandidateItem {
        CandidateItem::new(text, author, Utc::now())
    }

    #[test]
    fn test_unique_then_exact_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let first = engine.evaluate(item("reservoir drops to 40 percent", "@desk"));
        assert_eq!(first.classification, Classification::Unique);
        assert!(first.ticket.is_some());

        let second = engine.evaluate(item("Reservoir drops to 40 percent!", "@desk"));
        assert_eq!(second.classification, Classification::ExactDuplicate);
        assert_eq!(second.similarity, Some(100));
        assert!(second.ticket.is_none());
    }

    #[test]
    fn test_unique_is_cached_without_commit() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let decision = engine.evaluate(item("storm closes mountain pass", "@desk"));
        assert_eq!(decision.classification, Classification::Unique);
        assert_eq!(engine.cache_len(), 1);
    }

    #[test]
    fn test_near_duplicate_within_window() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.evaluate(item(
            "city council approves new water restriction plan for the summer",
            "@desk-one",
        ));
        let decision = engine.evaluate(item(
            "city council approves new water restriction plan for this summer",
            "@desk-two",
        ));

        assert_eq!(decision.classification, Classification::NearDuplicate);
        let similarity = decision.similarity.unwrap();
        assert!(similarity > 70 && similarity < 100);
        assert_eq!(
            decision.matched.map(|m| m.author),
            Some("@desk-one".to_string())
        );
    }

    #[test]
    fn test_commit_then_already_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let decision = engine.evaluate(item("governor signs the relief bill", "@desk"));
        let ticket = decision.ticket.unwrap();
        engine
            .commit(ticket, DeliveryMeta::new("d-77", "front-page"))
            .unwrap();

        // Even with the cache cleared of context (fresh text evaluation hits
        // the registry first), the registry answers before the cache.
        let repeat = engine.evaluate(item("governor signs the relief bill", "@desk"));
        assert_eq!(repeat.classification, Classification::AlreadyDelivered);
        assert_eq!(repeat.similarity, Some(100));
    }

    #[test]
    fn test_duplicate_records_omission_and_counters() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.evaluate(item("breaking reservoir at forty percent", "@desk"));
        engine.evaluate(item("breaking reservoir at forty percent", "@desk"));

        let omissions = engine.omissions_today();
        assert_eq!(omissions.len(), 1);
        assert_eq!(omissions[0].classification, Classification::ExactDuplicate);
        assert_eq!(omissions[0].detail.similarity, 100);

        let stats = engine.stats_snapshot();
        assert_eq!(stats.total_analyzed, 2);
        assert_eq!(stats.total_omitted, 1);
        assert_eq!(stats.omissions_by_author.get("@desk"), Some(&1));
    }

    #[test]
    fn test_unique_has_no_side_effects_beyond_cache() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.evaluate(item("quiet afternoon no news", "@desk"));

        assert!(engine.omissions_today().is_empty());
        let stats = engine.stats_snapshot();
        assert_eq!(stats.total_analyzed, 1);
        assert_eq!(stats.total_omitted, 0);
    }

    #[test]
    fn test_daily_rollover_resets_counters() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.evaluate(item("first story of the day", "@desk"));
        engine.evaluate(item("first story of the day", "@desk"));

        let summary = engine.daily_rollover();
        assert_eq!(summary.total_analyzed, 2);
        assert_eq!(summary.omitted_today, 1);

        let stats = engine.stats_snapshot();
        assert_eq!(stats.total_analyzed, 0);
        assert!(engine.omissions_today().is_empty());
    }
}
