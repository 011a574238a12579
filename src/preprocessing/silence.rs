//! Music start detection

/// Index of the first frame whose energy lies within `threshold_db` of the loudest
/// frame, or `None` when every frame is silent
///
/// Energies are power values, so the threshold is `max · 10^(threshold_db / 10)`.
///
/// # Example
///
/// ```
/// use chordline::preprocessing::silence::music_start_frame;
///
/// let energies = [0.0, 1e-7, 0.5, 1.0];
/// assert_eq!(music_start_frame(&energies, -40.0), Some(2));
/// assert_eq!(music_start_frame(&[0.0, 0.0], -40.0), None);
/// ```
pub fn music_start_frame(energies: &[f32], threshold_db: f32) -> Option<usize> {
    let max = energies.iter().copied().fold(0.0f32, f32::max);
    if max <= 1e-12 {
        return None;
    }
    let threshold = max * 10.0_f32.powf(threshold_db / 10.0);
    energies.iter().position(|&e| e >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_silence_is_skipped() {
        let mut energies = vec![0.0f32; 20];
        energies.extend(vec![1.0f32; 10]);
        assert_eq!(music_start_frame(&energies, -40.0), Some(20));
    }

    #[test]
    fn test_quiet_intro_counts_within_threshold() {
        let energies = [1e-3, 1.0];
        assert_eq!(music_start_frame(&energies, -40.0), Some(0));
        assert_eq!(music_start_frame(&energies, -20.0), Some(1));
    }

    #[test]
    fn test_all_silent() {
        assert_eq!(music_start_frame(&[], -40.0), None);
    }
}
