//! Duplicate detection for the relay pipeline.
//!
//! This module provides three-tier duplicate checking:
//! 1. **Already delivered**: combined-hash lookup in the durable delivery
//!    registry (current-day index, then bounded lookback across prior days)
//! 2. **Exact duplicate**: combined-hash lookup in the recent-window cache
//! 3. **Near duplicate**: Jaccard text similarity and media overlap scored
//!    against every cached entry, with time-tiered acceptance thresholds
//!
//! Checks short-circuit: the first match is terminal.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         DedupEngine                           │
//! │  ┌────────────────┐  ┌─────────────────┐  ┌────────────────┐  │
//! │  │ Delivery       │  │ Similarity      │  │ Fingerprint    │  │
//! │  │ Registry       │  │ Cache           │  │ Generator      │  │
//! │  │                │  │                 │  │                │  │
//! │  │ day partitions │  │ bounded window  │  │ normalize +    │  │
//! │  │ + 7-day scan   │  │ tiered scoring  │  │ hash + topics  │  │
//! │  └────────────────┘  └─────────────────┘  └────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use relaygate::{DedupConfig, DedupEngine, DeliveryMeta};
//!
//! let engine = DedupEngine::open(config, notifier)?;
//! let decision = engine.evaluate(item);
//! if let Some(ticket) = decision.ticket {
//!     channel.deliver(ticket.item())?;          // caller's own delivery
//!     engine.commit(ticket, DeliveryMeta::new(id, "front-page"))?;
//! }
//! ```

mod cache;
mod config;
mod engine;
mod fingerprint;
mod registry;
mod similarity;

pub use cache::{CacheEntry, NearMatch, SimilarityCache};
pub use config::DedupConfig;
pub use engine::DedupEngine;
pub use fingerprint::FingerprintGenerator;
pub use registry::{DeliveryRegistry, RegistryMatch};
pub use similarity::{combined_similarity, media_similarity, text_similarity, tier_threshold};
