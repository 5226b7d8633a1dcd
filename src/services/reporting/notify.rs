//! Notification port.

use super::summary::DailySummary;
use crate::Result;
use crate::models::OmissionRecord;

/// Port to the external chat-bot channel.
///
/// The gate pushes structured data only; rendering and transport are the
/// implementation's concern. Implementations should do their own retries —
/// the gate logs a failed push and moves on.
pub trait OmissionNotifier: Send + Sync {
    /// Pushes one omission as it happens.
    fn omission(&self, record: &OmissionRecord) -> Result<()>;

    /// Pushes the periodic daily summary.
    fn daily_summary(&self, summary: &DailySummary) -> Result<()>;
}

/// Notifier that drops every push, for hosts without a channel and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl OmissionNotifier for NoopNotifier {
    fn omission(&self, _record: &OmissionRecord) -> Result<()> {
        Ok(())
    }

    fn daily_summary(&self, _summary: &DailySummary) -> Result<()> {
        Ok(())
    }
}
