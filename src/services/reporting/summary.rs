//! Daily summary data.

use super::stats::UsageStats;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How many authors the summary ranks.
const TOP_AUTHORS: usize = 5;
/// How many topics the summary ranks.
const TOP_TOPICS: usize = 3;

/// Structured data for the periodic daily-summary push.
///
/// The gate only supplies the numbers; formatting and sending belong to the
/// external channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Summary date, `YYYY-MM-DD`.
    pub date: String,
    /// Omissions recorded today.
    pub omitted_today: usize,
    /// Items analyzed this session.
    pub total_analyzed: u64,
    /// Items omitted this session.
    pub total_omitted: u64,
    /// Share of analyzed items omitted, rounded percent.
    pub efficiency_pct: u8,
    /// Authors with the most omissions, descending.
    pub top_authors: Vec<(String, u64)>,
    /// Topics with the most omissions, descending.
    pub top_topics: Vec<(String, u64)>,
}

impl DailySummary {
    /// Builds the summary from the running counters.
    #[must_use]
    pub fn build(stats: &UsageStats, omitted_today: usize, now: DateTime<Utc>) -> Self {
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            omitted_today,
            total_analyzed: stats.total_analyzed,
            total_omitted: stats.total_omitted,
            efficiency_pct: stats.efficiency_pct(),
            top_authors: stats.top_authors(TOP_AUTHORS),
            top_topics: stats.top_topics(TOP_TOPICS),
        }
    }
}

/// Renders an elapsed duration the way operators read it: `"3h 25m"`, or
/// `"12m"` under an hour. Sub-minute gaps render as `"0m"`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    let hours = minutes / 60;

    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else {
        format!("{minutes}m")
    }
}
