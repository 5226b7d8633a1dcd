//! Candidate item input type.

use chrono::{DateTime, Utc};

/// A scraped item awaiting a relay decision.
///
/// Owned by the caller and never mutated by the engine. The item exists for
/// the duration of one `evaluate` call, plus the optional later `commit` (the
/// `Unique` decision carries it back inside the delivery ticket).
///
/// `arrived_at` is treated as "now" for every elapsed-time computation during
/// evaluation, which keeps decisions deterministic under test.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use relaygate::CandidateItem;
///
/// let item = CandidateItem::new("Breaking: reservoir at 40% capacity", "@waternews", Utc::now())
///     .with_url("https://x.com/waternews/status/1")
///     .with_media_ref("https://pbs.example.com/media/Gv2M0ZRWoAAMom6.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    /// Free text of the item as scraped.
    pub text: String,
    /// Author handle or display name.
    pub author: String,
    /// Source URL, when the scraper captured one.
    pub url: Option<String>,
    /// Media reference: a URL or opaque id for an attached image/video.
    pub media_ref: Option<String>,
    /// When the scraper handed the item to the gate.
    pub arrived_at: DateTime<Utc>,
}

impl CandidateItem {
    /// Creates a new candidate item.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        arrived_at: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            url: None,
            media_ref: None,
            arrived_at,
        }
    }

    /// Sets the source URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the media reference.
    #[must_use]
    pub fn with_media_ref(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }
}
