//! Bass stability filter
//!
//! A single-frame bass estimate is often a percussive transient. An estimate is
//! only kept when the same pitch class recurs in enough neighboring frames.

use crate::theory::pitch::PitchClass;

/// Keep raw estimates confirmed by at least `min_agreeing` frames within `±radius`
///
/// # Example
///
/// ```
/// use chordline::features::bass::stabilize_bass;
///
/// let raw = vec![Some(9), Some(9), Some(9), Some(2), Some(9), Some(9), Some(9)];
/// let stable = stabilize_bass(&raw, 2, 2);
/// assert_eq!(stable, vec![Some(9), Some(9), Some(9), None, Some(9), Some(9), Some(9)]);
/// ```
pub fn stabilize_bass(
    raw: &[Option<PitchClass>],
    radius: usize,
    min_agreeing: usize,
) -> Vec<Option<PitchClass>> {
    raw.iter()
        .enumerate()
        .map(|(i, &estimate)| {
            let pc = estimate?;
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(raw.len());
            let agreeing = (lo..hi)
                .filter(|&j| j != i && raw[j] == Some(pc))
                .count();
            if agreeing >= min_agreeing {
                Some(pc)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_spike_is_rejected() {
        let raw = vec![None, None, Some(4), None, None];
        assert!(stabilize_bass(&raw, 2, 2).iter().all(|b| b.is_none()));
    }

    #[test]
    fn test_zero_requirement_keeps_everything() {
        let raw = vec![Some(1), None, Some(3)];
        assert_eq!(stabilize_bass(&raw, 1, 0), raw);
    }

    #[test]
    fn test_run_edges_survive() {
        let raw = vec![Some(0), Some(0), Some(0), Some(7), Some(7), Some(7)];
        let stable = stabilize_bass(&raw, 2, 2);
        assert_eq!(stable, raw);
    }
}
