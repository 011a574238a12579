//! Chroma normalization and similarity

use super::Chroma;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-9;

/// Scale a chroma vector to sum to 1
///
/// Vectors with (near) zero mass are set to all-zero instead, which is how silence
/// is represented. Returns `true` when the vector carries energy.
pub fn normalize_sum(chroma: &mut Chroma) -> bool {
    let sum: f32 = chroma.iter().sum();
    if sum <= EPSILON || !sum.is_finite() {
        *chroma = [0.0; 12];
        return false;
    }
    for v in chroma.iter_mut() {
        *v /= sum;
    }
    true
}

/// Euclidean norm
pub fn l2_norm(chroma: &Chroma) -> f32 {
    chroma.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Cosine similarity in `[0, 1]` for non-negative vectors; zero if either is silent
pub fn cosine_similarity(a: &Chroma, b: &Chroma) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= EPSILON || nb <= EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (na * nb)).clamp(0.0, 1.0)
}

/// Index of the strongest bin, or `None` for silence
pub fn strongest_bin(chroma: &Chroma) -> Option<u8> {
    let (idx, &max) = chroma
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if max <= EPSILON {
        None
    } else {
        Some(idx as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sum() {
        let mut chroma = [0.0f32; 12];
        chroma[0] = 2.0;
        chroma[4] = 1.0;
        chroma[7] = 1.0;
        assert!(normalize_sum(&mut chroma));
        assert!((chroma.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((chroma[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_silence_is_zero() {
        let mut chroma = [1e-12f32; 12];
        assert!(!normalize_sum(&mut chroma));
        assert!(chroma.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cosine_similarity() {
        let mut a = [0.0f32; 12];
        a[0] = 1.0;
        a[4] = 1.0;
        let b = a;
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0; 12]), 0.0);
        assert_eq!(strongest_bin(&[0.0; 12]), None);
        assert_eq!(strongest_bin(&a), Some(0));
    }
}
