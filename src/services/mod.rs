//! Business logic services.
//!
//! Services orchestrate the storage port and provide the gate's high-level
//! operations.

pub mod dedup;
pub mod reporting;
