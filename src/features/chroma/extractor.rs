//! Chroma vector extraction
//!
//! Converts an FFT magnitude spectrum into a 12-element chroma vector.
//!
//! Every bin between `chroma_min_hz` and `chroma_max_hz` is mapped to its nearest
//! equal-tempered pitch class via `69 + 12·log2(f/440)`. Each bin above the
//! floor adds `sqrt(magnitude) · register_weight` to its pitch class, so one loud
//! partial cannot own its class. Register weights favor octaves 3-6, where chord
//! tones usually live, over sub-bass rumble and high harmonics.

use super::normalization::normalize_sum;
use super::Chroma;
use crate::config::FeatureConfig;
use crate::theory::pitch::{frequency_to_midi, to_pc, PitchClass};

/// Absolute magnitude below which a frame counts as silent
const SILENCE_MAGNITUDE: f32 = 1e-6;

/// Register weight for a MIDI octave (MIDI 60 = C4 sits in octave 4)
pub fn register_weight(octave: i32) -> f32 {
    match octave {
        i32::MIN..=1 => 0.25,
        2 => 0.5,
        3..=6 => 1.0,
        7 => 0.6,
        _ => 0.3,
    }
}

/// Precomputed bin → (pitch class, weight) mapping for one spectrum layout
#[derive(Debug, Clone)]
pub struct ChromaMapper {
    bins: Vec<(usize, PitchClass, f32)>,
    floor_ratio: f32,
}

impl ChromaMapper {
    /// Build the mapping for spectra with `num_bins` bins spaced `bin_hz` apart
    pub fn new(num_bins: usize, bin_hz: f32, config: &FeatureConfig) -> Self {
        let bins = (1..num_bins)
            .filter_map(|k| {
                let freq = k as f32 * bin_hz;
                if freq < config.chroma_min_hz || freq > config.chroma_max_hz {
                    return None;
                }
                let midi = frequency_to_midi(freq).round() as i32;
                let octave = midi.div_euclid(12) - 1;
                Some((k, to_pc(midi), register_weight(octave)))
            })
            .collect();
        Self {
            bins,
            floor_ratio: 10.0_f32.powf(config.magnitude_floor_db / 20.0),
        }
    }

    /// Number of bins that feed the chroma
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when no bin falls inside the chroma band
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Fold a magnitude spectrum into a chroma vector that sums to 1 (or is all-zero)
    pub fn chroma(&self, magnitudes: &[f32]) -> Chroma {
        let mut chroma = [0.0f32; 12];
        let peak = self
            .bins
            .iter()
            .filter_map(|&(k, _, _)| magnitudes.get(k).copied())
            .fold(0.0f32, f32::max);
        if peak < SILENCE_MAGNITUDE {
            return chroma;
        }
        let floor = peak * self.floor_ratio;
        for &(k, pc, weight) in &self.bins {
            let mag = magnitudes.get(k).copied().unwrap_or(0.0);
            if mag > floor {
                chroma[pc as usize] += weight * mag.sqrt();
            }
        }
        normalize_sum(&mut chroma);
        chroma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::spectrum::SpectrumAnalyzer;

    fn tone(freqs: &[f32], sr: u32, seconds: f32) -> Vec<f32> {
        let n = (sr as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                freqs
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
                    / freqs.len() as f32
            })
            .collect()
    }

    #[test]
    fn test_register_weights() {
        assert_eq!(register_weight(4), 1.0);
        assert!(register_weight(2) < register_weight(3));
        assert!(register_weight(8) < register_weight(6));
        assert_eq!(register_weight(-3), 0.25);
    }

    #[test]
    fn test_triad_chroma() {
        let sr = 22050;
        let config = FeatureConfig::default();
        let analyzer = SpectrumAnalyzer::new(config.frame_size, sr);
        let mapper = ChromaMapper::new(analyzer.num_bins(), analyzer.bin_hz(), &config);
        let samples = tone(&[261.63, 329.63, 392.0], sr, 1.0);

        let mut scratch = analyzer.scratch();
        analyzer.analyze(&samples, samples.len() / 2, &mut scratch);
        let chroma = mapper.chroma(&scratch.magnitudes);

        assert!((chroma.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        let triad = chroma[0] + chroma[4] + chroma[7];
        assert!(triad > 0.7, "C, E and G should dominate, got {:?}", chroma);
    }

    #[test]
    fn test_magnitudes_are_compressed_per_bin() {
        let config = FeatureConfig::default();
        let bin_hz = 22050.0 / 4096.0;
        let mapper = ChromaMapper::new(2049, bin_hz, &config);
        let mut magnitudes = vec![0.0f32; 2049];
        magnitudes[(261.63 / bin_hz).round() as usize] = 16.0;
        magnitudes[(392.0 / bin_hz).round() as usize] = 1.0;

        let chroma = mapper.chroma(&magnitudes);
        // sqrt(16) : sqrt(1)
        assert!((chroma[0] / chroma[7] - 4.0).abs() < 1e-3, "got {:?}", chroma);
        assert!((chroma[0] - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_silent_spectrum() {
        let config = FeatureConfig::default();
        let mapper = ChromaMapper::new(2049, 22050.0 / 4096.0, &config);
        let chroma = mapper.chroma(&vec![0.0; 2049]);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }
}
