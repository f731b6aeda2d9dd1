//! Adaptive gap-based truncation
//!
//! A large jump between consecutive distances marks the boundary between
//! relevant and marginal results; cutting there beats a fixed k.

use super::RetrievedChunk;
use crate::config::TruncateConfig;

/// Cut the ordered result list at the largest qualifying distance gap.
///
/// The first gap is never considered, so one exceptionally close match
/// cannot strand the rest. When no gap clears the threshold, the cut falls
/// back to the first distance more than `distance_offset` above the best.
/// The kept count is clamped to `[min_results, k]`.
pub fn adaptive_truncate(
    mut chunks: Vec<RetrievedChunk>,
    config: &TruncateConfig,
    min_results: usize,
    k: usize,
) -> Vec<RetrievedChunk> {
    if chunks.len() <= min_results {
        return chunks;
    }

    let distances: Vec<f32> = chunks.iter().map(|c| c.distance).collect();
    let gaps: Vec<f32> = distances.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f32)> = None;
    for (i, &gap) in gaps.iter().enumerate().skip(1) {
        if gap >= config.gap_threshold {
            match best {
                Some((_, best_gap)) if gap <= best_gap => {}
                _ => best = Some((i, gap)),
            }
        }
    }

    let cut = match best {
        Some((position, _)) => position + 1,
        None => {
            let ceiling = distances[0] + config.distance_offset;
            distances
                .iter()
                .position(|&d| d > ceiling)
                .unwrap_or(distances.len())
        }
    };

    let cut = cut.max(min_results).min(k).min(chunks.len());
    chunks.truncate(cut);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunks_with_distances(distances: &[f32]) -> Vec<RetrievedChunk> {
        distances
            .iter()
            .enumerate()
            .map(|(i, &distance)| RetrievedChunk {
                id: format!("c{}", i),
                text: String::new(),
                metadata: HashMap::new(),
                distance,
            })
            .collect()
    }

    fn config() -> TruncateConfig {
        TruncateConfig::default()
    }

    #[test]
    fn cuts_at_largest_qualifying_gap() {
        let chunks = chunks_with_distances(&[0.12, 0.18, 0.22, 0.35, 0.50, 0.55, 0.60]);
        // Gaps after the skipped first: 0.04, 0.13, 0.15, 0.05, 0.05.
        // Largest qualifying gap sits after index 3.
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.last().unwrap().id, "c3");
    }

    #[test]
    fn first_gap_is_ignored() {
        // Huge gap right after the best match must not cut to one result.
        let chunks = chunks_with_distances(&[0.05, 0.40, 0.42, 0.44]);
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn falls_back_to_distance_offset() {
        // Uniform ramp, no gap clears 0.10; ceiling is 0.10 + 0.40.
        let chunks = chunks_with_distances(&[0.10, 0.19, 0.28, 0.37, 0.46, 0.55, 0.64]);
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn keeps_everything_when_uniformly_close() {
        let chunks = chunks_with_distances(&[0.10, 0.12, 0.14, 0.16]);
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn never_cuts_below_floor() {
        // Offset fallback would cut after one result; the floor holds it at 2.
        let chunks = chunks_with_distances(&[0.10, 0.60, 0.62, 0.64]);
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn never_exceeds_k() {
        let chunks = chunks_with_distances(&[0.10, 0.12, 0.14, 0.16, 0.18]);
        let kept = adaptive_truncate(chunks, &config(), 2, 3);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn short_lists_pass_through() {
        let chunks = chunks_with_distances(&[0.10]);
        let kept = adaptive_truncate(chunks, &config(), 2, 15);
        assert_eq!(kept.len(), 1);

        let empty = adaptive_truncate(Vec::new(), &config(), 2, 15);
        assert!(empty.is_empty());
    }
}
