//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Windowed magnitude spectra
//! - Chroma extraction
//! - Bass pitch estimation and stabilization
//! - Onset novelty and texture
//! - Period estimation (tempo and beat grid)
//! - Key detection (tonal-center voting)

pub mod bass;
pub mod chroma;
pub mod extractor;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectrum;

use std::ops::Range;

use chroma::smoothing::weighted_mean_chroma;
use chroma::Chroma;

use crate::theory::pitch::PitchClass;

pub use extractor::extract_features;

/// Features of one analysis frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    /// Pitch-class energy, sums to 1 (or all-zero for silence)
    pub chroma: Chroma,

    /// Stabilized bass pitch class, `None` when no confident bass was found
    pub bass: Option<PitchClass>,

    /// Sum of squared windowed samples
    pub energy: f32,
}

/// Energy percentiles over all frames, computed once per clip
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyPercentiles {
    /// 30th percentile
    pub p30: f32,
    /// Median
    pub p50: f32,
    /// 70th percentile
    pub p70: f32,
    /// 80th percentile
    pub p80: f32,
}

impl EnergyPercentiles {
    /// Compute percentiles from unsorted frame energies
    pub fn from_energies(energies: &[f32]) -> Self {
        if energies.is_empty() {
            return Self::default();
        }
        let mut sorted = energies.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            p30: percentile(&sorted, 0.3),
            p50: percentile(&sorted, 0.5),
            p70: percentile(&sorted, 0.7),
            p80: percentile(&sorted, 0.8),
        }
    }
}

/// Nearest-rank percentile of an ascending slice (`p` in `[0, 1]`)
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f32 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Frame-level features of a whole clip
///
/// Frame `i` is centered on sample `i · hop_size`. The set is immutable once built;
/// every later stage reads it through shared references.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    frames: Vec<FeatureVector>,
    sample_rate: u32,
    hop_size: usize,
    duration: f32,
    percentiles: EnergyPercentiles,
    global_chroma: Chroma,
}

impl FeatureSet {
    /// Bundle extracted frames with their timing
    pub fn new(frames: Vec<FeatureVector>, sample_rate: u32, hop_size: usize, duration: f32) -> Self {
        let energies: Vec<f32> = frames.iter().map(|f| f.energy).collect();
        let percentiles = EnergyPercentiles::from_energies(&energies);
        let global_chroma = weighted_mean_chroma(&frames);
        Self {
            frames,
            sample_rate,
            hop_size: hop_size.max(1),
            duration,
            percentiles,
            global_chroma,
        }
    }

    /// All frames in time order
    pub fn frames(&self) -> &[FeatureVector] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the clip produced no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Analysis sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Seconds between consecutive frames
    pub fn hop_seconds(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate.max(1) as f32
    }

    /// Frames per second
    pub fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Clip duration in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Center time of frame `i` in seconds
    pub fn frame_time(&self, i: usize) -> f32 {
        i as f32 * self.hop_seconds()
    }

    /// First frame whose center lies at or after `t` (clamped to `len`)
    pub fn frame_at(&self, t: f32) -> usize {
        if t <= 0.0 {
            return 0;
        }
        let idx = (t / self.hop_seconds() - 1e-4).ceil().max(0.0) as usize;
        idx.min(self.frames.len())
    }

    /// Energy percentiles of the clip
    pub fn percentiles(&self) -> EnergyPercentiles {
        self.percentiles
    }

    /// Energy-weighted mean chroma of the whole clip
    pub fn global_chroma(&self) -> &Chroma {
        &self.global_chroma
    }

    /// Energy-weighted mean chroma of a frame range (clamped to the clip)
    pub fn mean_chroma(&self, range: Range<usize>) -> Chroma {
        let end = range.end.min(self.frames.len());
        let start = range.start.min(end);
        weighted_mean_chroma(&self.frames[start..end])
    }

    /// Most frequent stable bass in a frame range, if it covers at least `share`
    /// of the range's frames
    pub fn dominant_bass(&self, range: Range<usize>, share: f32) -> Option<PitchClass> {
        let end = range.end.min(self.frames.len());
        let start = range.start.min(end);
        if start == end {
            return None;
        }
        let mut counts = [0usize; 12];
        for frame in &self.frames[start..end] {
            if let Some(pc) = frame.bass {
                counts[pc as usize % 12] += 1;
            }
        }
        let (pc, &count) = counts
            .iter()
            .enumerate()
            .max_by_key(|&(pc, &count)| (count, std::cmp::Reverse(pc)))?;
        if count == 0 || (count as f32) < share * (end - start) as f32 {
            return None;
        }
        Some(pc as PitchClass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bass: Option<PitchClass>, energy: f32) -> FeatureVector {
        let mut chroma = [0.0f32; 12];
        chroma[bass.unwrap_or(0) as usize] = 1.0;
        FeatureVector { chroma, bass, energy }
    }

    #[test]
    fn test_percentiles() {
        let energies: Vec<f32> = (0..=10).map(|i| i as f32).collect();
        let p = EnergyPercentiles::from_energies(&energies);
        assert_eq!(p.p30, 3.0);
        assert_eq!(p.p50, 5.0);
        assert_eq!(p.p80, 8.0);
    }

    #[test]
    fn test_frame_timing() {
        let set = FeatureSet::new(vec![FeatureVector::default(); 100], 22050, 410, 1.86);
        assert!((set.frame_time(10) - 410.0 * 10.0 / 22050.0).abs() < 1e-6);
        assert_eq!(set.frame_at(set.frame_time(10)), 10);
        assert_eq!(set.frame_at(set.frame_time(10) + 0.001), 11);
        assert_eq!(set.frame_at(100.0), 100);
        assert_eq!(set.frame_at(-1.0), 0);
    }

    #[test]
    fn test_dominant_bass_share() {
        let frames = vec![
            frame(Some(7), 1.0),
            frame(Some(7), 1.0),
            frame(Some(2), 1.0),
            frame(None, 1.0),
        ];
        let set = FeatureSet::new(frames, 22050, 410, 0.1);
        assert_eq!(set.dominant_bass(0..4, 0.5), Some(7));
        assert_eq!(set.dominant_bass(0..4, 0.6), None);
        assert_eq!(set.dominant_bass(3..4, 0.1), None);
        assert_eq!(set.dominant_bass(4..4, 0.1), None);
    }
}
