//! Comparison-query detection and entity-aware reordering
//!
//! Queries shaped like "X vs Y" retrieve best when the initial search is
//! widened and chunks naming the compared entities are pulled to the front.

use super::RetrievedChunk;
use crate::config::RetrievalConfig;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VS_RE: Regex = Regex::new(r"(?i)\bvs\.?\b|\bversus\b").expect("static regex");
    static ref COMPARE_RE: Regex = Regex::new(r"(?i)\bcompare\b").expect("static regex");
    static ref DIFF_RE: Regex =
        Regex::new(r"(?i)\bdifferences?\s+between\b").expect("static regex");
    // Two capitalized multi-word noun phrases joined by "and".
    static ref CAP_PAIR_RE: Regex = Regex::new(
        r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\s+and\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)"
    )
    .expect("static regex");
    static ref VS_SPLIT_RE: Regex =
        Regex::new(r"(?is)^(.*?)\b(?:vs\.?|versus)\b(.*)$").expect("static regex");
    static ref DIFF_PAIR_RE: Regex = Regex::new(
        r"(?is)\bdifferences?\s+between\s+(.+?)\s+and\s+(.+?)(?:[?.!,;]|$)"
    )
    .expect("static regex");
    static ref COMPARE_PAIR_RE: Regex = Regex::new(
        r"(?is)\bcompare\s+(.+?)\s+(?:and|with|to)\s+(.+?)(?:[?.!,;]|$)"
    )
    .expect("static regex");
}

/// Leading words stripped from an extracted phrase before it becomes an
/// entity name.
const PHRASE_PREFIX_WORDS: &[&str] = &[
    "a", "an", "the", "what", "is", "are", "do", "does", "how", "who", "which", "between",
];

/// Detects comparison queries and widens/reorders retrieval for them
#[derive(Debug, Clone)]
pub struct EntityDetector {
    expand_factor: usize,
    expand_cap: usize,
}

impl EntityDetector {
    /// Create from retrieval configuration
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            expand_factor: config.entity_expand_factor,
            expand_cap: config.entity_expand_cap,
        }
    }

    /// Whether the query is syntactically a comparison
    pub fn is_comparison(&self, query: &str) -> bool {
        VS_RE.is_match(query)
            || COMPARE_RE.is_match(query)
            || DIFF_RE.is_match(query)
            || CAP_PAIR_RE.is_match(query)
    }

    /// Candidate entity names, lowercased with whitespace collapsed.
    ///
    /// No corpus validation happens here; entities that match nothing simply
    /// never promote a chunk.
    pub fn extract_entities(&self, query: &str) -> Vec<String> {
        let mut entities = Vec::new();

        if let Some(caps) = DIFF_PAIR_RE.captures(query) {
            push_entity(&mut entities, &caps[1]);
            push_entity(&mut entities, &caps[2]);
        } else if let Some(caps) = COMPARE_PAIR_RE.captures(query) {
            push_entity(&mut entities, &caps[1]);
            push_entity(&mut entities, &caps[2]);
        } else if let Some(caps) = VS_SPLIT_RE.captures(query) {
            push_entity(&mut entities, &caps[1]);
            push_entity(&mut entities, &caps[2]);
        } else if let Some(caps) = CAP_PAIR_RE.captures(query) {
            push_entity(&mut entities, &caps[1]);
            push_entity(&mut entities, &caps[2]);
        }

        entities
    }

    /// Widened result count for comparison queries
    pub fn expand_k(&self, k: usize, is_comparison: bool) -> usize {
        if is_comparison {
            (k * self.expand_factor).min(self.expand_cap)
        } else {
            k
        }
    }

    /// Stable partition: chunks whose title names an entity move to the
    /// front, each side preserving its distance order. Truncates to `k`.
    pub fn reorder(
        results: Vec<RetrievedChunk>,
        entities: &[String],
        k: usize,
    ) -> Vec<RetrievedChunk> {
        let (mut front, back): (Vec<_>, Vec<_>) = results
            .into_iter()
            .partition(|chunk| title_matches_any(chunk, entities));
        front.extend(back);
        front.truncate(k);
        front
    }
}

/// A title matches an entity when every token of the entity appears in the
/// title, case-insensitively. Token-wise matching lets "red dragon" find a
/// chunk titled "Dragon: Red".
fn title_matches_any(chunk: &RetrievedChunk, entities: &[String]) -> bool {
    let title = match chunk.title() {
        Some(t) => t.to_lowercase(),
        None => return false,
    };
    entities
        .iter()
        .any(|entity| entity.split_whitespace().all(|token| title.contains(token)))
}

fn push_entity(entities: &mut Vec<String>, raw: &str) {
    let normalized = normalize_phrase(raw);
    if !normalized.is_empty() && !entities.contains(&normalized) {
        entities.push(normalized);
    }
}

/// Lowercase, collapse whitespace, trim punctuation, drop leading filler
/// words.
fn normalize_phrase(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    let mut start = 0;
    while start < words.len() && PHRASE_PREFIX_WORDS.contains(&words[start]) {
        start += 1;
    }

    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MetadataValue;
    use std::collections::HashMap;

    fn detector() -> EntityDetector {
        EntityDetector::new(&RetrievalConfig::default())
    }

    fn chunk(id: &str, title: &str, distance: f32) -> RetrievedChunk {
        let mut metadata = HashMap::new();
        metadata.insert("title".to_string(), MetadataValue::from(title));
        RetrievedChunk {
            id: id.to_string(),
            text: String::new(),
            metadata,
            distance,
        }
    }

    #[test]
    fn detects_comparison_shapes() {
        let d = detector();
        assert!(d.is_comparison("owlbear vs ogre"));
        assert!(d.is_comparison("owlbear vs. ogre"));
        assert!(d.is_comparison("owlbear versus ogre"));
        assert!(d.is_comparison("compare fireball and lightning bolt"));
        assert!(d.is_comparison("what is the difference between a lich and a vampire?"));
        assert!(d.is_comparison("differences between mace and flail"));
        assert!(d.is_comparison("Red Dragon and White Dragon breath weapons"));
        assert!(!d.is_comparison("how many hit dice does an owlbear have?"));
        assert!(!d.is_comparison("sword and board fighting"));
    }

    #[test]
    fn extracts_difference_between_entities() {
        let entities =
            detector().extract_entities("What is the difference between a red dragon and a white dragon?");
        assert_eq!(entities, vec!["red dragon", "white dragon"]);
    }

    #[test]
    fn extracts_vs_entities() {
        let entities = detector().extract_entities("owlbear vs ogre");
        assert_eq!(entities, vec!["owlbear", "ogre"]);
    }

    #[test]
    fn extracts_compare_entities() {
        let entities = detector().extract_entities("compare the magic missile with the fireball?");
        assert_eq!(entities, vec!["magic missile", "fireball"]);
    }

    #[test]
    fn expand_k_multiplies_and_caps() {
        let d = detector();
        assert_eq!(d.expand_k(15, false), 15);
        assert_eq!(d.expand_k(10, true), 30);
        assert_eq!(d.expand_k(15, true), 45);
        assert_eq!(d.expand_k(20, true), 45);
    }

    #[test]
    fn reorder_promotes_matching_titles_stably() {
        let results = vec![
            chunk("1", "Bear, Cave", 0.10),
            chunk("2", "Dragon: Red", 0.15),
            chunk("3", "Ogre", 0.20),
            chunk("4", "Dragon: White", 0.50),
            chunk("5", "Troll", 0.55),
        ];
        let entities = vec!["red dragon".to_string(), "white dragon".to_string()];
        let reordered = EntityDetector::reorder(results, &entities, 4);

        let ids: Vec<&str> = reordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn reorder_without_matches_is_distance_order() {
        let results = vec![
            chunk("1", "Bear, Cave", 0.10),
            chunk("2", "Ogre", 0.20),
        ];
        let entities = vec!["beholder".to_string()];
        let reordered = EntityDetector::reorder(results, &entities, 5);
        let ids: Vec<&str> = reordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn normalize_strips_articles_and_punctuation() {
        assert_eq!(normalize_phrase("a Red Dragon?"), "red dragon");
        assert_eq!(normalize_phrase("  the   White  Dragon. "), "white dragon");
        assert_eq!(normalize_phrase("What is the lich"), "lich");
    }
}
