//! # Relaygate
//!
//! An at-most-once duplicate gate for scraped social-content relays.
//!
//! Items scraped from external feeds pass through the gate before being
//! forwarded to a delivery channel; the gate guarantees the same story is
//! never relayed twice. Detection runs in three tiers:
//!
//! - **Already delivered**: durable, day-partitioned registry of items that
//!   actually went out, with a fast current-day index and a bounded lookback
//!   across prior days
//! - **Exact duplicate**: combined-hash match in a bounded in-memory cache of
//!   recently seen items (delivered or not)
//! - **Near duplicate**: Jaccard text similarity and media-reference overlap
//!   scored against every cached entry, accepted through time-tiered
//!   thresholds that tighten as the candidate match ages
//!
//! ## Example
//!
//! ```rust,ignore
//! use relaygate::{CandidateItem, Classification, DedupEngine, DeliveryMeta};
//!
//! let engine = DedupEngine::open(config, notifier)?;
//! let decision = engine.evaluate(item);
//! if let Some(ticket) = decision.ticket {
//!     channel.deliver(ticket.item())?;
//!     engine.commit(ticket, DeliveryMeta::new("front-page"))?;
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use models::{
    CandidateItem, Classification, Decision, DeliveryMeta, DeliveryTicket, Fingerprint,
    MatchedContent, MediaKind, OmissionRecord, SentRecord,
};
pub use services::dedup::{
    DedupConfig, DedupEngine, DeliveryRegistry, FingerprintGenerator, SimilarityCache,
};
pub use services::reporting::{DailySummary, NoopNotifier, OmissionNotifier, UsageStats};
pub use storage::{FsPartitionStore, PartitionStore};

/// Error type for relaygate operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// Most I/O failures inside the gate never surface as errors: lookback reads,
/// omission writes, and stats writes degrade to "nothing found" / "write
/// dropped" with a logged warning, because losing a little dedup accuracy is
/// always preferable to halting the relay. The exceptions are durable
/// registry writes (a delivery that is not recorded would break at-most-once
/// silently) and construction-time failures.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A partition name contains path separators or other unsafe characters
    /// - A persisted record fails validation on load
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - A partition file cannot be written
    /// - A record cannot be serialized
    /// - The storage directory cannot be created
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for relaygate operations.
pub type Result<T> = std::result::Result<T, Error>;
