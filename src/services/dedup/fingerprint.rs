//! Fingerprint generation.
//!
//! Derives the identity bundle used for every duplicate check. Text is
//! normalized before hashing so the same story matches despite formatting
//! noise: URLs, @-mentions, #-hashtags, punctuation, casing, and whitespace
//! runs all disappear. A total function with no failure mode.

use crate::models::{CandidateItem, Fingerprint};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

// Static patterns are guaranteed to compile, so expect() is safe here.
#[allow(clippy::expect_used)]
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("static regex: url"));

#[allow(clippy::expect_used)]
static MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\w+").expect("static regex: mention"));

#[allow(clippy::expect_used)]
static HASHTAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("static regex: hashtag"));

#[allow(clippy::expect_used)]
static SYMBOL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex: symbol"));

/// Platform-style opaque media identifiers embedded in URLs, e.g.
/// `Gv2M0ZRWoAAMom6`.
#[allow(clippy::expect_used)]
static MEDIA_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_-]{15,}").expect("static regex: media id"));

/// Common function words excluded from the keyword set. Tokens of three
/// characters or fewer are already dropped by the length filter.
const STOPWORDS: [&str; 10] = [
    "that", "with", "from", "this", "have", "will", "been", "were", "about", "which",
];

/// Minimum token length for topic and keyword extraction.
const SIGNIFICANT_TOKEN_LEN: usize = 3;

/// Maximum tokens in the topic label.
const TOPIC_TOKENS: usize = 5;

/// Maximum keywords kept per fingerprint.
const MAX_KEYWORDS: usize = 10;

/// Topic label used when normalization leaves no significant tokens.
pub(crate) const UNCLASSIFIED_TOPIC: &str = "unclassified";

/// Fingerprint generator.
///
/// # Normalization
///
/// Applied in order, each step on the previous step's output:
/// 1. Strip URLs
/// 2. Strip @-mentions
/// 3. Strip #-hashtags
/// 4. Replace every character that is not a letter, digit, or whitespace
///    with a space
/// 5. Collapse whitespace runs and trim
/// 6. Lowercase
///
/// The lowercased result is both hashed and scored, which is what makes the
/// equivalence invariant hold: items that normalize identically hash
/// identically.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use relaygate::{CandidateItem, FingerprintGenerator};
///
/// let a = FingerprintGenerator::fingerprint(&CandidateItem::new(
///     "Hello World! http://x.co @user #tag",
///     "desk",
///     Utc::now(),
/// ));
/// let b = FingerprintGenerator::fingerprint(&CandidateItem::new(
///     "hello   world",
///     "desk",
///     Utc::now(),
/// ));
/// assert_eq!(a.content_hash, b.content_hash);
/// ```
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    /// Computes the fingerprint for a candidate item.
    #[must_use]
    pub fn fingerprint(item: &CandidateItem) -> Fingerprint {
        let normalized = Self::normalize(&item.text);
        let media_refs = Self::extract_media_refs(item.media_ref.as_deref().unwrap_or(""));

        let content_hash = Self::digest(&normalized);
        let combined = format!(
            "{normalized}|{}|{}",
            item.author,
            media_refs.join(",")
        );
        let combined_hash = Self::digest(&combined.to_lowercase());

        Fingerprint {
            content_hash,
            combined_hash,
            topic: Self::topic(&normalized),
            keywords: Self::keywords(&normalized),
            normalized_text: normalized,
            media_refs,
        }
    }

    /// Normalizes text for hashing and similarity scoring.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        let stripped = URL_PATTERN.replace_all(text, "");
        let stripped = MENTION_PATTERN.replace_all(&stripped, "");
        let stripped = HASHTAG_PATTERN.replace_all(&stripped, "");
        let spaced = SYMBOL_PATTERN.replace_all(&stripped, " ");

        spaced
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Extracts platform media identifiers from a raw media URL or id.
    ///
    /// All matches are returned in order of appearance, duplicates preserved;
    /// the ordered list feeds the combined hash, while overlap scoring
    /// de-duplicates into a set.
    #[must_use]
    pub fn extract_media_refs(media_ref: &str) -> Vec<String> {
        MEDIA_ID_PATTERN
            .find_iter(media_ref)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Derives the short topic label from normalized text.
    #[must_use]
    pub fn topic(normalized: &str) -> String {
        let tokens: Vec<&str> = normalized
            .split_whitespace()
            .filter(|t| t.chars().count() > SIGNIFICANT_TOKEN_LEN)
            .take(TOPIC_TOKENS)
            .collect();

        if tokens.is_empty() {
            UNCLASSIFIED_TOPIC.to_string()
        } else {
            tokens.join(" ")
        }
    }

    /// Derives the keyword set from normalized text.
    #[must_use]
    pub fn keywords(normalized: &str) -> Vec<String> {
        normalized
            .split_whitespace()
            .filter(|t| t.chars().count() > SIGNIFICANT_TOKEN_LEN && !STOPWORDS.contains(t))
            .take(MAX_KEYWORDS)
            .map(ToString::to_string)
            .collect()
    }

    /// Hex-encoded SHA-256 digest.
    ///
    /// Collision resistance far beyond what duplicate keying needs, but the
    /// digest is deterministic and cheap at relay volumes.
    fn digest(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }
}
