//! RAG (Retrieval-Augmented Generation) over stored form responses.
//!
//! A question is embedded, compared against every response of the chosen
//! form, and the best matches are formatted into the context of a single
//! generation request.

pub mod context;
mod engine;

pub use context::assemble;
pub use engine::{AnalysisResult, AnswerEngine, Stage, NO_ANSWER};

use crate::error::{FormragError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of responses forwarded as context.
pub const DEFAULT_LIMIT: usize = 2;

/// A response matched against a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Copy of the response data.
    pub data: Value,
    /// Cosine similarity to the question, in [-1, 1].
    pub similarity: f32,
}

/// Compute cosine similarity between two equal-length vectors.
///
/// Sums are accumulated in f64. If either vector has zero magnitude (or the
/// inputs contain non-finite values) the similarity is defined as 0.0.
/// Callers are responsible for checking lengths; extra trailing elements of
/// the longer slice are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0) as f32
}

/// Rank candidates by cosine similarity to `query`, best first.
///
/// Returns `min(limit, candidates)` results. Equal similarities keep their
/// original candidate order. Any candidate whose length differs from the
/// query aborts the whole ranking with `DimensionMismatch`.
pub fn rank<'a, I>(query: &[f32], candidates: I, limit: usize) -> Result<Vec<RankedResult>>
where
    I: IntoIterator<Item = (&'a Value, &'a [f32])>,
{
    let mut scored: Vec<(&'a Value, f32)> = Vec::new();
    for (data, vector) in candidates {
        if vector.len() != query.len() {
            return Err(FormragError::DimensionMismatch {
                expected: query.len(),
                found: vector.len(),
            });
        }
        scored.push((data, cosine_similarity(query, vector)));
    }

    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(data, similarity)| RankedResult {
            data: data.clone(),
            similarity,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(Value, Vec<f32>)]) -> impl Iterator<Item = (&Value, &[f32])> {
        items.iter().map(|(d, v)| (d, v.as_slice()))
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_self_similarity_and_symmetry() {
        let vectors = [
            vec![0.3, -2.0, 7.5, 0.01],
            vec![1e-3, 1e-3, 1e-3, 1e-3],
            vec![1e4, -3e4, 2.0, 0.0],
        ];
        for a in &vectors {
            assert!((cosine_similarity(a, a) - 1.0).abs() < 1e-6);
            for b in &vectors {
                assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
            }
        }
    }

    #[test]
    fn test_zero_magnitude_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_closer_response_first() {
        let items = vec![
            (json!({"color": "red"}), vec![1.0, 0.0]),
            (json!({"color": "blue"}), vec![0.0, 1.0]),
        ];

        let results = rank(&[0.9, 0.1], pairs(&items), 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data, json!({"color": "red"}));
        assert!((results[0].similarity - 0.9939).abs() < 1e-3);
    }

    #[test]
    fn test_rank_limit_picks_top_two() {
        let items: Vec<(Value, Vec<f32>)> = [0.1f32, 0.9, 0.4, 0.95, 0.2]
            .iter()
            .enumerate()
            .map(|(i, x)| (json!({ "i": i }), vec![*x, 1.0 - x]))
            .collect();

        let results = rank(&[1.0, 0.0], pairs(&items), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].data, json!({"i": 3}));
        assert_eq!(results[1].data, json!({"i": 1}));
    }

    #[test]
    fn test_rank_bounds() {
        let items = vec![(json!({"a": 1}), vec![1.0, 0.0])];
        assert_eq!(rank(&[1.0, 0.0], pairs(&items), 5).unwrap().len(), 1);
        assert!(rank(&[1.0, 0.0], pairs(&items), 0).unwrap().is_empty());
        assert!(rank(&[1.0, 0.0], pairs(&[]), 2).unwrap().is_empty());
    }

    #[test]
    fn test_rank_sorted_and_stable() {
        let items = vec![
            (json!("first"), vec![1.0, 1.0]),
            (json!("low"), vec![0.0, 1.0]),
            (json!("second"), vec![2.0, 2.0]),
            (json!("best"), vec![1.0, 0.0]),
            (json!("third"), vec![0.5, 0.5]),
        ];

        let results = rank(&[1.0, 0.0], pairs(&items), 10).unwrap();
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));

        let order: Vec<&Value> = results.iter().map(|r| &r.data).collect();
        assert_eq!(
            order,
            vec![&json!("best"), &json!("first"), &json!("second"), &json!("third"), &json!("low")]
        );
    }

    #[test]
    fn test_rank_dimension_mismatch_aborts() {
        let items = vec![
            (json!({"ok": true}), vec![1.0, 0.0]),
            (json!({"ok": false}), vec![1.0, 0.0, 0.0]),
        ];
        let err = rank(&[1.0, 0.0], pairs(&items), 2).unwrap_err();
        assert!(matches!(
            err,
            FormragError::DimensionMismatch { expected: 2, found: 3 }
        ));
    }
}
