//! Decision types returned by the engine.

use super::{CandidateItem, Fingerprint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one candidate item.
///
/// Outcomes are checked strictly in this order; the first match is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The item was already delivered through the relay (durable registry hit).
    AlreadyDelivered,
    /// Combined hash matches a recently seen item that may not have been
    /// delivered.
    ExactDuplicate,
    /// Similarity against a recently seen item cleared the time-tiered
    /// threshold.
    NearDuplicate,
    /// None of the above; the caller may proceed to deliver.
    Unique,
}

impl Classification {
    /// Returns true for any duplicate outcome.
    #[must_use]
    pub const fn is_duplicate(self) -> bool {
        !matches!(self, Self::Unique)
    }

    /// Stable string form, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyDelivered => "already_delivered",
            Self::ExactDuplicate => "exact_duplicate",
            Self::NearDuplicate => "near_duplicate",
            Self::Unique => "unique",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the duplicate matched against, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedContent {
    /// Author of the matched item.
    pub author: String,
    /// Raw text of the matched item.
    pub text: String,
    /// When the matched item was first seen (cache) or delivered (registry).
    pub matched_at: DateTime<Utc>,
}

/// Capability to commit a delivery.
///
/// Only a `Unique` decision produces a ticket, and `commit` consumes one, so
/// committing an item the engine classified as duplicate does not typecheck.
/// The ticket carries the evaluated item and its fingerprint so the caller
/// never recomputes either.
#[derive(Debug)]
pub struct DeliveryTicket {
    item: CandidateItem,
    fingerprint: Fingerprint,
}

impl DeliveryTicket {
    pub(crate) fn new(item: CandidateItem, fingerprint: Fingerprint) -> Self {
        Self { item, fingerprint }
    }

    /// The evaluated item, for the caller's delivery channel.
    #[must_use]
    pub fn item(&self) -> &CandidateItem {
        &self.item
    }

    /// The fingerprint computed during evaluation.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub(crate) fn into_parts(self) -> (CandidateItem, Fingerprint) {
        (self.item, self.fingerprint)
    }
}

/// Result of one `evaluate` call.
#[derive(Debug)]
pub struct Decision {
    /// The terminal classification.
    pub classification: Classification,
    /// The matched record or cache entry, for duplicate outcomes.
    pub matched: Option<MatchedContent>,
    /// Rounded similarity percentage; 100 for registry and exact-hash hits.
    pub similarity: Option<u8>,
    /// Time since the matched item was first seen or delivered.
    pub elapsed: Option<Duration>,
    /// Present only on `Unique`; required by `commit`.
    pub ticket: Option<DeliveryTicket>,
}

impl Decision {
    /// Returns true for any duplicate outcome.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        self.classification.is_duplicate()
    }

    pub(crate) fn unique(ticket: DeliveryTicket) -> Self {
        Self {
            classification: Classification::Unique,
            matched: None,
            similarity: None,
            elapsed: None,
            ticket: Some(ticket),
        }
    }

    pub(crate) fn duplicate(
        classification: Classification,
        matched: MatchedContent,
        similarity: u8,
        elapsed: Duration,
    ) -> Self {
        Self {
            classification,
            matched: Some(matched),
            similarity: Some(similarity),
            elapsed: Some(elapsed),
            ticket: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::AlreadyDelivered.to_string(), "already_delivered");
        assert_eq!(Classification::ExactDuplicate.to_string(), "exact_duplicate");
        assert_eq!(Classification::NearDuplicate.to_string(), "near_duplicate");
        assert_eq!(Classification::Unique.to_string(), "unique");
    }

    #[test]
    fn test_is_duplicate() {
        assert!(Classification::AlreadyDelivered.is_duplicate());
        assert!(Classification::ExactDuplicate.is_duplicate());
        assert!(Classification::NearDuplicate.is_duplicate());
        assert!(!Classification::Unique.is_duplicate());
    }

    #[test]
    fn test_classification_serde_snake_case() {
        let json = serde_json::to_string(&Classification::NearDuplicate).unwrap();
        assert_eq!(json, "\"near_duplicate\"");
        let back: Classification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Classification::NearDuplicate);
    }
}
