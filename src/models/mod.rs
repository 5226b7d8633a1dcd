//! Data models for relaygate.
//!
//! This module contains all the core data structures used throughout the gate.

mod decision;
mod fingerprint;
mod item;
mod record;

pub use decision::{Classification, Decision, DeliveryTicket, MatchedContent};
pub use fingerprint::Fingerprint;
pub use item::CandidateItem;
pub use record::{
    DeliveryMeta, MediaKind, OmissionDetail, OmissionRecord, OmittedItem, SentFingerprint,
    SentItem, SentMeta, SentRecord,
};
