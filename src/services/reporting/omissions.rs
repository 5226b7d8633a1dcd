//! Durable omission log.

use crate::models::OmissionRecord;
use crate::storage::PartitionStore;
use chrono::NaiveDate;
use std::sync::Arc;

/// Day-partitioned log of omitted items, mirrored in memory for the day.
///
/// Writes degrade with a warning on failure; losing an omission record
/// costs reporting detail, never dedup correctness.
pub struct OmissionLog {
    store: Arc<dyn PartitionStore>,
    today: NaiveDate,
    today_records: Vec<OmissionRecord>,
}

impl OmissionLog {
    /// Creates a log for the given day.
    ///
    /// Today's partition is reloaded so the in-memory view survives a
    /// restart mid-day.
    #[must_use]
    pub fn new(store: Arc<dyn PartitionStore>, today: NaiveDate) -> Self {
        let today_records = Self::load_day(store.as_ref(), today);
        Self {
            store,
            today,
            today_records,
        }
    }

    /// Appends a record to today's partition and the in-memory view.
    pub fn append(&mut self, record: &OmissionRecord) {
        self.roll_day(record.date.parse().unwrap_or(self.today));
        self.today_records.push(record.clone());

        let name = Self::partition_name(self.today);
        match serde_json::to_vec_pretty(&self.today_records) {
            Ok(bytes) => {
                if let Err(e) = self.store.write(&name, &bytes) {
                    tracing::warn!(partition = %name, error = %e, "omission write dropped");
                }
            },
            Err(e) => {
                tracing::warn!(partition = %name, error = %e, "omission serialization failed");
            },
        }
    }

    /// Today's records, oldest first.
    #[must_use]
    pub fn today(&self) -> &[OmissionRecord] {
        &self.today_records
    }

    /// Number of omissions recorded today.
    #[must_use]
    pub fn today_len(&self) -> usize {
        self.today_records.len()
    }

    /// Clears the in-memory view for a new day.
    pub fn reset_day(&mut self, today: NaiveDate) {
        self.today = today;
        self.today_records.clear();
    }

    fn roll_day(&mut self, day: NaiveDate) {
        if day != self.today {
            self.today = day;
            self.today_records = Self::load_day(self.store.as_ref(), day);
        }
    }

    fn load_day(store: &dyn PartitionStore, day: NaiveDate) -> Vec<OmissionRecord> {
        match store.read(&Self::partition_name(day)) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "omission partition unparsable, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "omission partition unreadable, starting empty");
                Vec::new()
            },
        }
    }

    /// `omissions-<ISO-date>.json` for a day.
    fn partition_name(day: NaiveDate) -> String {
        format!("omissions-{day}.json")
    }
}
