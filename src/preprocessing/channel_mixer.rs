//! Channel mixing utilities (interleaved multichannel to mono)

use crate::error::AnalysisError;

/// Average interleaved channels into a mono signal
///
/// # Arguments
///
/// * `samples` - Interleaved samples (`L, R, L, R, ...` for stereo)
/// * `channels` - Number of interleaved channels
///
/// # Returns
///
/// One sample per frame, the mean of its channels. Mono input is copied unchanged.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for zero channels or a sample count that
/// is not a multiple of the channel count
///
/// # Example
///
/// ```
/// use chordline::preprocessing::channel_mixer::downmix;
///
/// let stereo = vec![0.5f32, 0.3, 0.8, 0.2];
/// let mono = downmix(&stereo, 2)?;
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.4).abs() < 1e-6);
/// # Ok::<(), chordline::AnalysisError>(())
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput("Channel count must be > 0".to_string()));
    }
    let channels = channels as usize;
    if samples.len() % channels != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Sample count {} is not divisible by channel count {}",
            samples.len(),
            channels
        )));
    }
    if channels == 1 {
        return Ok(samples.to_vec());
    }

    log::debug!(
        "Downmixing {} frames of {} channels to mono",
        samples.len() / channels,
        channels
    );
    let scale = 1.0 / channels as f32;
    Ok(samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_average() {
        let mono = downmix(&[1.0, -1.0, 0.5, 0.5], 2).unwrap();
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn test_mono_passthrough() {
        assert_eq!(downmix(&[0.1, 0.2, 0.3], 1).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(downmix(&[0.1, 0.2, 0.3], 2).is_err());
        assert!(downmix(&[0.1], 0).is_err());
    }
}
