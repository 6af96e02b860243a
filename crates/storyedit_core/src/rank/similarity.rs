//! Confidence-filtered ranking over Jaro-Winkler similarity.
//!
//! # Responsibility
//! - Score candidate strings against a query in `[0, 1]`.
//! - Narrow the ranked list with the two-tier confidence filter.
//!
//! # Invariants
//! - Scores are compared on chars, not bytes.
//! - `rank` never drops candidates when no score reaches `LOW_CONFIDENCE`.

use std::cmp::Ordering;

/// Scores at or above this narrow the result to high-confidence matches.
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// Scores at or above this narrow the result when no match is high-confidence.
pub const LOW_CONFIDENCE: f64 = 0.6;

/// Jaro-Winkler similarity between two strings.
///
/// Identical strings score `1.0`; a comparison against an empty string
/// scores `0.0`.
pub use strsim::jaro_winkler;

/// Sorts scored items by descending score and applies the two-tier filter.
///
/// The sort is stable, so equal scores keep their input order.
pub fn confidence_filter<T>(mut scored: Vec<(T, f64)>) -> Vec<T> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let Some(top) = scored.first().map(|(_, score)| *score) else {
        return Vec::new();
    };
    let floor = if top >= HIGH_CONFIDENCE {
        Some(HIGH_CONFIDENCE)
    } else if top >= LOW_CONFIDENCE {
        Some(LOW_CONFIDENCE)
    } else {
        None
    };

    scored
        .into_iter()
        .filter(|(_, score)| floor.map_or(true, |floor| *score >= floor))
        .map(|(item, _)| item)
        .collect()
}

/// Ranks `candidates` by similarity to `query`.
pub fn rank<S: AsRef<str>>(candidates: &[S], query: &str, case_insensitive: bool) -> Vec<String> {
    let query = if case_insensitive {
        query.to_lowercase()
    } else {
        query.to_string()
    };

    let scored = candidates
        .iter()
        .map(|candidate| {
            let candidate = candidate.as_ref();
            let score = if case_insensitive {
                jaro_winkler(&query, &candidate.to_lowercase())
            } else {
                jaro_winkler(&query, candidate)
            };
            (candidate.to_string(), score)
        })
        .collect();

    confidence_filter(scored)
}

#[cfg(test)]
mod tests {
    use super::{confidence_filter, jaro_winkler, rank};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn jaro_winkler_matches_reference_values() {
        assert!(close(jaro_winkler("MARTHA", "MARHTA"), 0.961));
        assert!(close(jaro_winkler("DIXON", "DICKSONX"), 0.813));
        assert!(close(jaro_winkler("bol", "bold"), 0.942));
        assert_eq!(jaro_winkler("same", "same"), 1.0);
        assert_eq!(jaro_winkler("", "abc"), 0.0);
        assert_eq!(jaro_winkler("abc", "xyz"), 0.0);
    }

    #[test]
    fn rank_of_empty_candidates_is_empty() {
        let candidates: Vec<String> = Vec::new();
        assert!(rank(&candidates, "anything", false).is_empty());
    }

    #[test]
    fn empty_query_keeps_every_candidate() {
        let candidates = ["Start", "Cellar", "Attic"];
        let ranked = rank(&candidates, "", false);
        assert_eq!(ranked.len(), 3);
        for name in candidates {
            assert!(ranked.iter().any(|value| value == name));
        }
    }

    #[test]
    fn high_confidence_match_excludes_weaker_candidates() {
        let candidates = ["Cellar", "Start", "Starting Room", "Zebra"];
        let ranked = rank(&candidates, "Start", false);
        assert_eq!(ranked[0], "Start");
        assert!(ranked.contains(&"Starting Room".to_string()));
        assert!(!ranked.contains(&"Zebra".to_string()));
        assert!(!ranked.contains(&"Cellar".to_string()));
    }

    #[test]
    fn case_insensitive_rank_ignores_case() {
        let ranked = rank(&["START", "other"], "start", true);
        assert_eq!(ranked, vec!["START".to_string()]);
    }

    #[test]
    fn filter_keeps_all_when_nothing_is_confident() {
        let items = vec![("a", 0.1), ("b", 0.5), ("c", 0.3)];
        assert_eq!(confidence_filter(items), vec!["b", "c", "a"]);
    }

    #[test]
    fn filter_uses_low_tier_when_top_is_moderate() {
        let items = vec![("a", 0.65), ("b", 0.7), ("c", 0.59)];
        assert_eq!(confidence_filter(items), vec!["b", "a"]);
    }
}
