//! Storage port trait.

use crate::Result;

/// Blocking store for named partition files.
///
/// One instance covers one directory-like namespace (sent partitions,
/// omission partitions, or the stats object). Reads of missing partitions
/// return `Ok(None)` rather than an error; writes must be durable before
/// they return `Ok`.
pub trait PartitionStore: Send + Sync {
    /// Reads a partition's raw bytes, `None` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Writes a partition's raw bytes, replacing any previous content.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Lists the partition names currently present, in no particular order.
    fn list(&self) -> Result<Vec<String>>;
}
