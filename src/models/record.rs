//! Persisted record types.
//!
//! These structs serialize to the exact JSON shapes the day-partition files
//! carry, so a partition written today is readable by any later session (and
//! by the external reporting dashboard that tails the same files).

use super::{CandidateItem, Classification, Fingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media attached to a delivered item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Text only, no attachment.
    #[default]
    Text,
    /// Still image.
    Image,
    /// Video clip.
    Video,
}

impl MediaKind {
    /// Stable string form, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied context for a successful delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryMeta {
    /// Delivery id assigned by the caller's channel.
    pub id: String,
    /// Channel or column label the item went out on.
    pub channel: String,
    /// Kind of media that was delivered.
    pub media_kind: MediaKind,
}

impl DeliveryMeta {
    /// Creates delivery metadata for the given channel.
    #[must_use]
    pub fn new(id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel: channel.into(),
            media_kind: MediaKind::Text,
        }
    }

    /// Sets the media kind.
    #[must_use]
    pub fn with_media_kind(mut self, media_kind: MediaKind) -> Self {
        self.media_kind = media_kind;
        self
    }
}

/// Trimmed copy of the delivered item inside a [`SentRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentItem {
    /// Raw text as scraped.
    pub text: String,
    /// Lowercased normalized text, kept for the lookback similarity fallback.
    pub normalized_text: String,
    /// Author handle.
    pub author: String,
    /// Source URL, when captured.
    #[serde(default)]
    pub url: Option<String>,
    /// Media reference, when present.
    #[serde(default)]
    pub media_ref: Option<String>,
}

/// Fingerprint subset persisted with a [`SentRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentFingerprint {
    /// Hash of the normalized text.
    pub content_hash: String,
    /// The primary duplicate key.
    pub combined_hash: String,
    /// Extracted media tokens, order preserved.
    pub media_refs: Vec<String>,
}

/// Delivery metadata persisted with a [`SentRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMeta {
    /// Channel or column label.
    pub channel: String,
    /// Kind of media delivered.
    pub media_kind: MediaKind,
    /// Topic label derived at fingerprint time.
    pub topic: String,
}

/// A single delivered item, append-only within its day partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRecord {
    /// Caller-supplied delivery id.
    pub id: String,
    /// Delivery time, Unix milliseconds.
    pub timestamp: i64,
    /// Delivery date, `YYYY-MM-DD`.
    pub date: String,
    /// Delivery wall time, `HH:MM:SS`.
    pub time: String,
    /// Trimmed copy of the delivered item.
    pub item: SentItem,
    /// Fingerprint subset for lookback matching.
    pub fingerprint: SentFingerprint,
    /// Delivery metadata.
    pub meta: SentMeta,
}

impl SentRecord {
    /// Builds a record from an evaluated item and its delivery metadata.
    #[must_use]
    pub fn build(
        item: &CandidateItem,
        fingerprint: &Fingerprint,
        meta: &DeliveryMeta,
        delivered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: meta.id.clone(),
            timestamp: delivered_at.timestamp_millis(),
            date: delivered_at.format("%Y-%m-%d").to_string(),
            time: delivered_at.format("%H:%M:%S").to_string(),
            item: SentItem {
                text: item.text.clone(),
                normalized_text: fingerprint.normalized_text.clone(),
                author: item.author.clone(),
                url: item.url.clone(),
                media_ref: item.media_ref.clone(),
            },
            fingerprint: SentFingerprint {
                content_hash: fingerprint.content_hash.clone(),
                combined_hash: fingerprint.combined_hash.clone(),
                media_refs: fingerprint.media_refs.clone(),
            },
            meta: SentMeta {
                channel: meta.channel.clone(),
                media_kind: meta.media_kind,
                topic: fingerprint.topic.clone(),
            },
        }
    }

    /// Delivery time reconstructed from the persisted millisecond timestamp.
    #[must_use]
    pub fn delivered_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }
}

/// Copy of the omitted item inside an [`OmissionRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmittedItem {
    /// Raw text as scraped.
    pub text: String,
    /// Author handle.
    pub author: String,
    /// Source URL, when captured.
    #[serde(default)]
    pub url: Option<String>,
    /// Media reference, when present.
    #[serde(default)]
    pub media_ref: Option<String>,
}

/// Match detail persisted with an [`OmissionRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmissionDetail {
    /// Rounded similarity percentage against the matched content.
    pub similarity: u8,
    /// Author of the matched content.
    pub matched_author: String,
    /// Wall time the matched content was first seen or delivered.
    pub matched_time: String,
    /// First 100 characters of the matched content's text.
    pub matched_text_preview: String,
    /// Human-readable elapsed time since the match, e.g. `"3h 25m"`.
    pub elapsed_human: String,
}

/// One omitted (not relayed) item with the evidence for the omission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmissionRecord {
    /// Generated omission id.
    pub id: String,
    /// Omission time, Unix milliseconds.
    pub timestamp: i64,
    /// Omission date, `YYYY-MM-DD`.
    pub date: String,
    /// Omission wall time, `HH:MM:SS`.
    pub time: String,
    /// Copy of the omitted item.
    pub item: OmittedItem,
    /// Why the item was omitted.
    pub classification: Classification,
    /// Topic label derived at fingerprint time.
    pub topic: String,
    /// Evidence for the omission.
    pub detail: OmissionDetail,
}
