//! Similarity scoring and tiered thresholds.
//!
//! Scores are percentages in `0.0..=100.0`. Text similarity is Jaccard over
//! whitespace token sets; media similarity is set overlap over extracted
//! media tokens. When media is present on both sides it dominates the
//! combined score: identical media with different captions is a stronger
//! duplicate signal than identical wording without media.

use super::config::DedupConfig;
use chrono::Duration;
use std::collections::HashSet;

/// Weight of the text score when media overlap is present.
const TEXT_WEIGHT: f64 = 0.3;
/// Weight of the media score when media overlap is present.
const MEDIA_WEIGHT: f64 = 0.7;

/// Jaccard similarity of two normalized texts, as a percentage.
///
/// Literal string equality scores 100 before any tokenization, which is the
/// only way two token-empty texts can be fully similar; unequal strings
/// whose token union is empty score 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();

    (intersection as f64 / union as f64) * 100.0
}

/// Media-reference overlap of two token lists, as a percentage.
///
/// Both sides are de-duplicated into sets before scoring. Returns 0 when
/// either side has no media refs, so text similarity alone decides.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn media_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let shared = set_a.intersection(&set_b).count();
    let larger = set_a.len().max(set_b.len());

    (shared as f64 / larger as f64) * 100.0
}

/// Combines text and media scores.
///
/// Text similarity alone when there is no media overlap, otherwise a
/// media-dominant weighted blend.
#[must_use]
pub fn combined_similarity(text_sim: f64, media_sim: f64) -> f64 {
    if media_sim <= 0.0 {
        text_sim
    } else {
        text_sim.mul_add(TEXT_WEIGHT, media_sim * MEDIA_WEIGHT)
    }
}

/// Acceptance threshold for a cache entry, selected by its age.
///
/// The bar rises as the entry ages: shortly after first sight a similar item
/// is almost certainly a re-post of the same story, while the same score a
/// day later is increasingly likely to be a different event reusing common
/// phrasing. Negative elapsed values (out-of-order arrival timestamps) fall
/// into the most permissive tier.
#[must_use]
pub fn tier_threshold(elapsed: Duration, config: &DedupConfig) -> f64 {
    let elapsed_ms = elapsed.num_milliseconds().max(0);

    if elapsed_ms < as_millis(config.tier_immediate) {
        config.threshold_immediate
    } else if elapsed_ms < as_millis(config.tier_short) {
        config.threshold_short
    } else if elapsed_ms < as_millis(config.tier_medium) {
        config.threshold_medium
    } else {
        config.threshold_long
    }
}

fn as_millis(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_strings_score_100() {
        assert!(approx_eq(text_similarity("water plan approved", "water plan approved"), 100.0));
    }

    #[test]
    fn test_empty_equals_empty() {
        assert!(approx_eq(text_similarity("", ""), 100.0));
    }

    #[test]
    fn test_empty_vs_nonempty_not_conflated() {
        assert!(approx_eq(text_similarity("", "water"), 0.0));
    }

    #[test]
    fn test_jaccard_half_overlap() {
        // tokens {a b c} vs {b c d}: intersection 2, union 4
        assert!(approx_eq(text_similarity("aa bb cc", "bb cc dd"), 50.0));
    }

    #[test]
    fn test_disjoint_texts_score_0() {
        assert!(approx_eq(text_similarity("aa bb", "cc dd"), 0.0));
    }

    #[test]
    fn test_media_empty_side_scores_0() {
        let media = vec!["Gv2M0ZRWoAAMom6".to_string()];
        assert!(approx_eq(media_similarity(&media, &[]), 0.0));
        assert!(approx_eq(media_similarity(&[], &media), 0.0));
    }

    #[test]
    fn test_media_full_overlap() {
        let a = vec!["Gv2M0ZRWoAAMom6".to_string()];
        let b = vec!["Gv2M0ZRWoAAMom6".to_string()];
        assert!(approx_eq(media_similarity(&a, &b), 100.0));
    }

    #[test]
    fn test_media_duplicates_deduped_for_scoring() {
        // Same token twice on one side still counts as one against one.
        let a = vec!["Gv2M0ZRWoAAMom6".to_string(), "Gv2M0ZRWoAAMom6".to_string()];
        let b = vec!["Gv2M0ZRWoAAMom6".to_string()];
        assert!(approx_eq(media_similarity(&a, &b), 100.0));
    }

    #[test]
    fn test_media_partial_overlap() {
        let a = vec!["AAAAAAAAAAAAAAA1".to_string(), "BBBBBBBBBBBBBBB2".to_string()];
        let b = vec!["AAAAAAAAAAAAAAA1".to_string()];
        assert!(approx_eq(media_similarity(&a, &b), 50.0));
    }

    #[test]
    fn test_combined_without_media_is_text() {
        assert!(approx_eq(combined_similarity(80.0, 0.0), 80.0));
    }

    #[test]
    fn test_combined_blend_media_dominant() {
        // 0.3 * 50 + 0.7 * 100 = 85
        assert!(approx_eq(combined_similarity(50.0, 100.0), 85.0));
    }

    #[test]
    fn test_identical_media_alone_clears_first_tier() {
        // mediaSim 100 with textSim 0 => combined 70, exactly at the
        // first-tier bar (tier acceptance is inclusive).
        assert!(approx_eq(combined_similarity(0.0, 100.0), 70.0));
    }

    #[test_case(10, 70.0; "inside immediate tier")]
    #[test_case(29, 70.0; "end of immediate tier")]
    #[test_case(30, 80.0; "start of short tier")]
    #[test_case(119, 80.0; "end of short tier")]
    #[test_case(120, 90.0; "start of medium tier")]
    #[test_case(24 * 60 - 1, 90.0; "end of medium tier")]
    #[test_case(24 * 60, 95.0; "past medium tier")]
    #[test_case(7 * 24 * 60, 95.0; "a week out")]
    fn test_tier_thresholds(elapsed_minutes: i64, expected: f64) {
        let config = DedupConfig::default();
        let threshold = tier_threshold(Duration::minutes(elapsed_minutes), &config);
        assert!(approx_eq(threshold, expected));
    }

    #[test]
    fn test_negative_elapsed_uses_first_tier() {
        let config = DedupConfig::default();
        assert!(approx_eq(tier_threshold(Duration::minutes(-5), &config), 70.0));
    }
}
