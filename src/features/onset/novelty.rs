//! Novelty curves and onset peak picking
//!
//! Two frame-rate novelty curves are derived from the feature set:
//! - Energy flux: half-wave rectified increase of frame RMS
//! - Chroma flux: total-variation distance between chroma `lag` frames apart,
//!   centered on the frame so a chord change peaks at its own frame
//!
//! The tempo estimator consumes their normalized sum; the segmenter consumes the
//! chroma flux alone.

use crate::features::FeatureSet;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Energy flux: `E_flux[n] = max(0, rms[n] - rms[n-1])`, with `E_flux[0] = 0`
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
pub fn energy_flux(features: &FeatureSet) -> Vec<f32> {
    let rms: Vec<f32> = features.frames().iter().map(|f| f.energy.max(0.0).sqrt()).collect();
    let mut flux = vec![0.0f32; rms.len()];
    for i in 1..rms.len() {
        flux[i] = (rms[i] - rms[i - 1]).max(0.0);
    }
    flux
}

/// Chroma flux: `0.5 · Σ |c[n + lag/2] - c[n - lag/2]|`, in `[0, 1]`
///
/// Indices are clamped at the clip edges. A silent frame against a voiced one
/// scores 0.5, two disjoint chords score 1.0.
pub fn chroma_flux(features: &FeatureSet, lag: usize) -> Vec<f32> {
    let frames = features.frames();
    let n = frames.len();
    if n == 0 {
        return Vec::new();
    }
    let lag = lag.max(1);
    let back = lag / 2;
    let ahead = lag - back;
    (0..n)
        .map(|i| {
            let a = &frames[i.saturating_sub(back)].chroma;
            let b = &frames[(i + ahead).min(n - 1)].chroma;
            0.5 * a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f32>()
        })
        .collect()
}

/// Scale a curve so its maximum is 1 (all-zero curves stay all-zero)
pub fn normalize_peak(curve: &mut [f32]) {
    let max = curve.iter().copied().fold(0.0f32, f32::max);
    if max > EPSILON {
        for v in curve.iter_mut() {
            *v /= max;
        }
    }
}

/// Combined novelty for tempo estimation: peak-normalized energy flux plus
/// peak-normalized chroma flux
pub fn combined_novelty(features: &FeatureSet, chroma_lag: usize) -> Vec<f32> {
    let mut energy = energy_flux(features);
    let mut chroma = chroma_flux(features, chroma_lag);
    normalize_peak(&mut energy);
    normalize_peak(&mut chroma);
    energy.iter().zip(chroma.iter()).map(|(e, c)| e + c).collect()
}

/// Pick onset frames from a novelty curve
///
/// A frame is an onset when it is a local maximum (`> prev`, `>= next`, which
/// handles plateaus) above `max · 10^(threshold_db / 20)`. Onsets closer than
/// `min_gap` frames to the previous one are dropped.
///
/// # Arguments
///
/// * `novelty` - Novelty curve at frame rate
/// * `threshold_db` - Threshold in dB relative to the curve maximum (typically -20 dB)
/// * `min_gap` - Minimum distance in frames between reported onsets
///
/// # Returns
///
/// Onset frame indices in ascending order
pub fn pick_onsets(novelty: &[f32], threshold_db: f32, min_gap: usize) -> Vec<usize> {
    if novelty.len() < 3 {
        return Vec::new();
    }
    let max = novelty.iter().copied().fold(0.0f32, f32::max);
    if max <= EPSILON {
        log::debug!("Novelty curve is flat, no onsets detected");
        return Vec::new();
    }
    let threshold = max * 10.0_f32.powf(threshold_db / 20.0);

    let mut onsets: Vec<usize> = Vec::new();
    for i in 1..novelty.len() - 1 {
        let value = novelty[i];
        if value > threshold && value > novelty[i - 1] && value >= novelty[i + 1] {
            match onsets.last() {
                Some(&last) if i - last < min_gap.max(1) => {}
                _ => onsets.push(i),
            }
        }
    }
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn set_of(frames: Vec<FeatureVector>) -> FeatureSet {
        FeatureSet::new(frames, 22050, 410, 1.0)
    }

    fn chord_frame(pcs: &[usize], energy: f32) -> FeatureVector {
        let mut chroma = [0.0f32; 12];
        for &pc in pcs {
            chroma[pc] = 1.0 / pcs.len() as f32;
        }
        FeatureVector {
            chroma,
            bass: None,
            energy,
        }
    }

    #[test]
    fn test_chroma_flux_peaks_at_change() {
        let mut frames = vec![chord_frame(&[0, 4, 7], 1.0); 10];
        frames.extend(vec![chord_frame(&[2, 5, 9], 1.0); 10]);
        let flux = chroma_flux(&set_of(frames), 4);
        assert_eq!(flux.len(), 20);
        assert!(flux[0].abs() < 1e-6);
        assert!((flux[9] - 1.0).abs() < 1e-6);
        assert!(flux[19].abs() < 1e-6);
    }

    #[test]
    fn test_energy_flux_is_rectified() {
        let frames = vec![
            chord_frame(&[0], 1.0),
            chord_frame(&[0], 4.0),
            chord_frame(&[0], 1.0),
        ];
        let flux = energy_flux(&set_of(frames));
        assert_eq!(flux, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_pick_onsets() {
        let mut novelty = vec![0.0f32; 40];
        for i in (5..40).step_by(10) {
            novelty[i] = 1.0;
        }
        novelty[20] = 0.01; // below -20 dB
        assert_eq!(pick_onsets(&novelty, -20.0, 2), vec![5, 15, 25, 35]);
        assert!(pick_onsets(&[0.0; 10], -20.0, 2).is_empty());
    }
}
