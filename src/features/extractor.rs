//! Per-frame feature extraction
//!
//! Runs the windowed FFT once per frame and derives chroma, raw bass and energy from
//! the same spectrum. Frames are independent, so they are computed in parallel with
//! one set of scratch buffers per worker; bass stabilization then runs sequentially
//! over the finished sequence.

use rayon::prelude::*;

use super::bass::pitch::BassEstimator;
use super::bass::stabilize_bass;
use super::chroma::extractor::ChromaMapper;
use super::spectrum::SpectrumAnalyzer;
use super::{FeatureSet, FeatureVector};
use crate::config::FeatureConfig;
use crate::error::AnalysisError;

/// Extract chroma, bass and energy for every frame of a mono clip
///
/// # Arguments
///
/// * `samples` - Mono samples at `sample_rate`
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Feature extraction parameters
///
/// # Returns
///
/// A [`FeatureSet`] with `ceil(len / hop)` frames; frame `i` is centered on sample
/// `i · hop`. Frames whose window is not entirely inside the clip never carry a bass
/// estimate.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty clip or degenerate parameters
pub fn extract_features(
    samples: &[f32],
    sample_rate: u32,
    config: &FeatureConfig,
) -> Result<FeatureSet, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }
    if config.frame_size < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "Frame size too small: {}",
            config.frame_size
        )));
    }

    let hop_size = config.hop_size();
    let num_frames = samples.len().div_ceil(hop_size);
    let duration = samples.len() as f32 / sample_rate as f32;

    let analyzer = SpectrumAnalyzer::new(config.frame_size, sample_rate);
    let mapper = ChromaMapper::new(analyzer.num_bins(), analyzer.bin_hz(), config);
    let bass = BassEstimator::new(analyzer.fft_size(), sample_rate, config);

    log::debug!(
        "Extracting features: {} samples, {} frames, frame={}, fft={}, hop={}, chroma bins={}",
        samples.len(),
        num_frames,
        analyzer.frame_size(),
        analyzer.fft_size(),
        hop_size,
        mapper.len()
    );

    let mut frames: Vec<FeatureVector> = (0..num_frames)
        .into_par_iter()
        .map_init(
            || (analyzer.scratch(), bass.scratch()),
            |(spectrum, bass_scratch), i| {
                let info = analyzer.analyze(samples, i * hop_size, spectrum);
                let chroma = mapper.chroma(&spectrum.magnitudes);
                let raw_bass = if info.full_window {
                    bass.estimate(&spectrum.magnitudes, bass_scratch)
                } else {
                    None
                };
                FeatureVector {
                    chroma,
                    bass: raw_bass,
                    energy: info.energy,
                }
            },
        )
        .collect();

    if frames.iter().any(|f| !f.energy.is_finite()) {
        return Err(AnalysisError::NumericalError(
            "Non-finite frame energy".to_string(),
        ));
    }

    let raw: Vec<_> = frames.iter().map(|f| f.bass).collect();
    let stable = stabilize_bass(&raw, config.bass_stability_radius, config.bass_min_agreeing);
    let raw_count = raw.iter().filter(|b| b.is_some()).count();
    for (frame, b) in frames.iter_mut().zip(stable) {
        frame.bass = b;
    }
    log::debug!(
        "Bass: {} raw estimates, {} stable",
        raw_count,
        frames.iter().filter(|f| f.bass.is_some()).count()
    );

    Ok(FeatureSet::new(frames, sample_rate, hop_size, duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, seconds: f32, amp: f32) -> Vec<f32> {
        let n = (sr as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * amp)
            .collect()
    }

    #[test]
    fn test_chroma_is_normalized_or_silent() {
        let sr = 22050;
        let mut samples = sine(440.0, sr, 1.0, 0.5);
        samples.extend(vec![0.0; sr as usize]);
        let set = extract_features(&samples, sr, &FeatureConfig::default()).unwrap();

        assert_eq!(set.len(), samples.len().div_ceil(410));
        for frame in set.frames() {
            let sum: f32 = frame.chroma.iter().sum();
            assert!(sum == 0.0 || (sum - 1.0).abs() < 1e-4, "chroma sum {}", sum);
            assert!(frame.chroma.iter().all(|&v| v >= 0.0));
        }
        // The tail is pure silence
        let last = set.frames().last().unwrap();
        assert!(last.chroma.iter().all(|&v| v == 0.0));
        assert_eq!(last.bass, None);
    }

    #[test]
    fn test_bass_of_a2() {
        let sr = 22050;
        let samples = sine(110.0, sr, 2.0, 0.5);
        let set = extract_features(&samples, sr, &FeatureConfig::default()).unwrap();

        // Edge frames whose window hangs off the clip carry no bass
        assert_eq!(set.frames()[0].bass, None);
        assert_eq!(set.frames().last().unwrap().bass, None);

        let mid = set.len() / 2;
        assert_eq!(set.frames()[mid].bass, Some(9));
        let voiced = set.frames().iter().filter(|f| f.bass == Some(9)).count();
        assert!(voiced > set.len() / 2, "only {} of {} frames voiced", voiced, set.len());
    }

    #[test]
    fn test_short_clip_has_frames_without_bass() {
        let sr = 22050;
        let samples = sine(110.0, sr, 0.1, 0.5);
        let set = extract_features(&samples, sr, &FeatureConfig::default()).unwrap();
        assert!(!set.is_empty());
        assert!(set.frames().iter().all(|f| f.bass.is_none()));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(extract_features(&[], 22050, &FeatureConfig::default()).is_err());
        assert!(extract_features(&[0.0; 100], 0, &FeatureConfig::default()).is_err());
    }
}
