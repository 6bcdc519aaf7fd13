//! Vector similarity and ranking.

/// Cosine similarity between two vectors.
///
/// Returns `None` when the similarity is undefined: empty or differently
/// sized vectors, or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-12 {
        None
    } else {
        Some(dot / denom)
    }
}

/// Keep the `top_n` highest-scoring items, best first.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank<T>(mut scored: Vec<(T, f64)>, top_n: usize) -> Vec<(T, f64)> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_same_direction_is_one() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![2.0f32, 4.0, 6.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-12);
    }

    #[test]
    fn cosine_opposite_is_minus_one() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_magnitude_is_undefined() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn cosine_mismatched_lengths_are_undefined() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
    }

    #[test]
    fn rank_orders_descending_and_truncates() {
        let ranked = rank(vec![("low", 0.1), ("high", 0.9), ("mid", 0.5)], 2);
        let names: Vec<_> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["high", "mid"]);
    }

    #[test]
    fn rank_keeps_insertion_order_on_ties() {
        let ranked = rank(vec![("a", 0.5), ("b", 0.7), ("c", 0.5), ("d", 0.5)], 10);
        let names: Vec<_> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "a", "c", "d"]);
    }
}
