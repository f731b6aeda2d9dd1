//! Chunk-level `query_must` filter predicates
//!
//! A predicate is stored as a JSON-encoded string in flat chunk metadata and
//! evaluated against the query text at retrieval time. Evaluation is a pure
//! function over strings; it touches no store and no network.

use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref INT_RE: Regex = Regex::new(r"\b\d+\b").expect("static regex");
}

/// Inclusive integer interval matched against numbers in the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainRange {
    pub min: i64,
    pub max: i64,
}

/// Declarative filter attached to chunks that are noisy on semantically
/// similar but contextually wrong queries. All operators present must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryMust {
    /// Word-boundary term match, tolerating a trailing plural `s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contain: Option<String>,

    /// OR groups; every group needs at least one member in the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contain_one_of: Option<Vec<Vec<String>>>,

    /// Every term must appear in the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contain_all_of: Option<Vec<String>>,

    /// At least one integer in the query must fall in the interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contain_range: Option<ContainRange>,
}

/// Parse a stored `query_must` JSON payload
pub fn parse_query_must(raw: &str) -> Result<QueryMust> {
    Ok(serde_json::from_str(raw)?)
}

/// Whether the query satisfies the predicate.
///
/// Absent operators are vacuously satisfied; an empty predicate passes
/// every query.
pub fn satisfies(query: &str, predicate: &QueryMust) -> bool {
    contain_holds(query, predicate)
        && one_of_holds(query, predicate)
        && all_of_holds(query, predicate)
        && range_holds(query, predicate)
}

fn contain_holds(query: &str, predicate: &QueryMust) -> bool {
    match &predicate.contain {
        None => true,
        Some(term) => {
            let pattern = format!(r"(?i)\b{}s?\b", regex::escape(term));
            Regex::new(&pattern)
                .map(|re| re.is_match(query))
                .unwrap_or(false)
        }
    }
}

fn one_of_holds(query: &str, predicate: &QueryMust) -> bool {
    match &predicate.contain_one_of {
        None => true,
        Some(groups) => {
            let query_lower = query.to_lowercase();
            groups.iter().all(|group| {
                group
                    .iter()
                    .any(|term| query_lower.contains(&term.to_lowercase()))
            })
        }
    }
}

fn all_of_holds(query: &str, predicate: &QueryMust) -> bool {
    match &predicate.contain_all_of {
        None => true,
        Some(terms) => {
            let query_lower = query.to_lowercase();
            terms
                .iter()
                .all(|term| query_lower.contains(&term.to_lowercase()))
        }
    }
}

fn range_holds(query: &str, predicate: &QueryMust) -> bool {
    match &predicate.contain_range {
        None => true,
        Some(range) => extract_ints(query)
            .into_iter()
            .any(|n| n >= range.min && n <= range.max),
    }
}

/// Integers appearing in the query, in order
pub fn extract_ints(query: &str) -> Vec<i64> {
    INT_RE
        .find_iter(query)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_predicate_passes_everything() {
        let predicate = QueryMust::default();
        assert!(satisfies("anything at all", &predicate));
        assert!(satisfies("", &predicate));
    }

    #[test]
    fn contain_is_word_bounded_and_plural_tolerant() {
        let predicate = QueryMust {
            contain: Some("cleric".to_string()),
            ..Default::default()
        };
        assert!(satisfies("what does a Cleric need", &predicate));
        assert!(satisfies("what do clerics need", &predicate));
        assert!(!satisfies("clerical errors abound", &predicate));
        assert!(!satisfies("anticleric sentiment", &predicate));
    }

    #[test]
    fn one_of_requires_every_group() {
        // Attack matrix predicate: class group AND armor-class group.
        let raw = r#"{"contain_one_of":[["cleric","clerics","druid","druids","monk","monks"],["ac 6","armor class 6","a.c. 6"]]}"#;
        let predicate = parse_query_must(raw).unwrap();

        assert!(satisfies(
            "What does a 7th level cleric need to roll to hit AC 6?",
            &predicate
        ));
        assert!(!satisfies(
            "What does a 7th level cleric need to roll to hit AC 5?",
            &predicate
        ));
        assert!(!satisfies(
            "What does a 7th level fighter need to roll to hit AC 6?",
            &predicate
        ));
    }

    #[test]
    fn all_of_requires_every_term() {
        let predicate = QueryMust {
            contain_all_of: Some(vec!["saving".to_string(), "throw".to_string()]),
            ..Default::default()
        };
        assert!(satisfies("saving throw against poison", &predicate));
        assert!(!satisfies("saving the village", &predicate));
    }

    #[test]
    fn range_matches_any_query_integer() {
        let raw =
            r#"{"contain_one_of":[["psionic","psychic"]],"contain_range":{"min":10,"max":13}}"#;
        let predicate = parse_query_must(raw).unwrap();

        assert!(satisfies("intelligence 12 psionic blast", &predicate));
        assert!(!satisfies("intelligence 8 psionic blast", &predicate));
        assert!(!satisfies("intelligence 12 fireball", &predicate));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let predicate = QueryMust {
            contain_range: Some(ContainRange { min: 10, max: 13 }),
            ..Default::default()
        };
        assert!(satisfies("value 10", &predicate));
        assert!(satisfies("value 13", &predicate));
        assert!(!satisfies("value 9", &predicate));
        assert!(!satisfies("value 14", &predicate));
        assert!(!satisfies("no numbers here", &predicate));
    }

    #[test]
    fn extract_ints_uses_word_boundaries() {
        assert_eq!(extract_ints("roll 2d6 plus 3, then 12"), vec![3, 12]);
        assert_eq!(extract_ints("7th level"), vec![7]);
        assert!(extract_ints("no digits").is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(parse_query_must("{not json").is_err());
        assert!(parse_query_must(r#"{"contain_one_of":"flat string"}"#).is_err());
        assert!(parse_query_must(r#"{"unknown_op":"x"}"#).is_err());
    }

    #[test]
    fn evaluator_is_pure() {
        let predicate = QueryMust {
            contain: Some("dragon".to_string()),
            contain_range: Some(ContainRange { min: 1, max: 5 }),
            ..Default::default()
        };
        let query = "a dragon with 3 heads";
        assert_eq!(satisfies(query, &predicate), satisfies(query, &predicate));
    }

    proptest! {
        #[test]
        fn satisfies_never_panics(query in ".*", term in ".*") {
            let predicate = QueryMust {
                contain: Some(term),
                contain_one_of: Some(vec![vec!["a".to_string()], vec![]]),
                contain_all_of: Some(vec!["b".to_string()]),
                contain_range: Some(ContainRange { min: 0, max: 100 }),
            };
            let _ = satisfies(&query, &predicate);
        }

        #[test]
        fn empty_predicate_accepts_any_query(query in ".*") {
            prop_assert!(satisfies(&query, &QueryMust::default()));
        }
    }
}
