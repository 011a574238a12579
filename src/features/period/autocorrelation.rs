//! Autocorrelation-based tempo estimation
//!
//! Finds periodicity in a frame-rate novelty curve using FFT-accelerated
//! autocorrelation.
//!
//! # Algorithm
//!
//! 1. Remove the mean of the novelty curve
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(signal)|²)`
//! 3. Find peaks in the ACF inside the lag range of `[min_bpm, max_bpm]`
//! 4. Refine the strongest lag with parabolic interpolation
//! 5. Convert lag to BPM: `BPM = 60 · frames_per_second / lag`
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::BpmCandidate;
use crate::error::AnalysisError;

const EPSILON: f32 = 1e-10;

/// Estimate BPM candidates from a novelty curve
///
/// # Arguments
///
/// * `novelty` - Novelty curve, one value per analysis frame
/// * `frames_per_second` - Frame rate of the curve
/// * `min_bpm` - Minimum BPM to consider (default: 60.0)
/// * `max_bpm` - Maximum BPM to consider (default: 180.0)
///
/// # Returns
///
/// BPM candidates ranked by confidence (highest first); empty when the curve is
/// too short or has no periodicity in range
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a non-positive frame rate or an
/// inverted BPM range
pub fn estimate_bpm_from_autocorrelation(
    novelty: &[f32],
    frames_per_second: f32,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<Vec<BpmCandidate>, AnalysisError> {
    log::debug!(
        "Estimating BPM from autocorrelation: {} frames at {:.2} fps, range=[{:.1}, {:.1}] BPM",
        novelty.len(),
        frames_per_second,
        min_bpm,
        max_bpm
    );

    if frames_per_second <= 0.0 || !frames_per_second.is_finite() {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid frame rate: {}",
            frames_per_second
        )));
    }
    if min_bpm <= 0.0 || max_bpm <= 0.0 || min_bpm >= max_bpm {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            min_bpm, max_bpm
        )));
    }

    // Step 1: convert the BPM range to lags in frames
    let lag_min = ((60.0 * frames_per_second) / max_bpm).ceil() as usize;
    let lag_max = ((60.0 * frames_per_second) / min_bpm).floor() as usize;
    if lag_min < 2 || lag_min >= lag_max || lag_max + 1 >= novelty.len() {
        log::debug!(
            "Novelty too short for lag range [{}, {}]: {} frames",
            lag_min,
            lag_max,
            novelty.len()
        );
        return Ok(Vec::new());
    }

    // Step 2: autocorrelation of the mean-removed curve
    let mean = novelty.iter().sum::<f32>() / novelty.len() as f32;
    let centered: Vec<f32> = novelty.iter().map(|&x| x - mean).collect();
    let acf = compute_autocorrelation_fft(&centered);
    let zero_lag = acf.first().copied().unwrap_or(0.0);
    if zero_lag <= EPSILON {
        return Ok(Vec::new());
    }

    // Step 3: peaks within the lag range
    let peaks = find_peaks_in_acf(&acf[lag_min - 1..=lag_max + 1], lag_min - 1);

    // Step 4: refine and convert
    let mut candidates: Vec<BpmCandidate> = peaks
        .into_iter()
        .filter(|&(lag, _)| lag >= lag_min && lag <= lag_max)
        .map(|(lag, value)| {
            let (a, c) = (acf[lag - 1], acf[lag + 1]);
            let denom = a - 2.0 * value + c;
            let offset = if denom.abs() > EPSILON {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            };
            BpmCandidate {
                bpm: 60.0 * frames_per_second / (lag as f32 + offset),
                confidence: (value / zero_lag).clamp(0.0, 1.0),
            }
        })
        .filter(|c| c.bpm >= min_bpm * 0.98 && c.bpm <= max_bpm * 1.02)
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!("Autocorrelation found {} BPM candidates", candidates.len());

    Ok(candidates)
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²). The result has the same length
/// as the input and is left unnormalized, which favors shorter lags and keeps
/// half-tempo peaks from winning.
pub fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // FFT size: next power of 2 >= 2*n (for zero-padding)
    let fft_size = (2 * n).next_power_of_two();

    let mut fft_input: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_input.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut fft_input);

    for x in &mut fft_input {
        *x = *x * x.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut fft_input);

    let scale = 1.0 / (fft_size as f32);
    fft_input[..n].iter().map(|x| x.re * scale).collect()
}

/// Find local maxima with minimum prominence (10% of the slice maximum)
///
/// Returns `(lag, value)` pairs with `offset` added to the indices, highest first.
fn find_peaks_in_acf(acf_slice: &[f32], offset: usize) -> Vec<(usize, f32)> {
    if acf_slice.len() < 3 {
        return Vec::new();
    }

    let max_value = acf_slice.iter().copied().fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return Vec::new();
    }
    let min_prominence = max_value * 0.1;

    let mut peaks: Vec<(usize, f32)> = Vec::new();
    for i in 1..(acf_slice.len() - 1) {
        let value = acf_slice[i];
        if value > acf_slice[i - 1] && value >= acf_slice[i + 1] {
            let floor = acf_slice[..i]
                .iter()
                .rev()
                .take(4)
                .chain(acf_slice[i + 1..].iter().take(4))
                .copied()
                .fold(f32::MAX, f32::min);
            if value - floor >= min_prominence || value >= max_value {
                peaks.push((i + offset, value));
            }
        }
    }

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(bpm: f32, fps: f32, frames: usize) -> Vec<f32> {
        let period = 60.0 * fps / bpm;
        let mut signal = vec![0.0f32; frames];
        let mut t = 0.0f32;
        while (t as usize) < frames {
            let i = t.round() as usize;
            if i < frames {
                signal[i] = 1.0;
                if i + 1 < frames {
                    signal[i + 1] = 0.5;
                }
            }
            t += period;
        }
        signal
    }

    #[test]
    fn test_autocorrelation_120bpm() {
        let fps = 22050.0 / 410.0;
        let novelty = pulse_train(120.0, fps, 1000);
        let candidates = estimate_bpm_from_autocorrelation(&novelty, fps, 60.0, 180.0).unwrap();
        assert!(!candidates.is_empty(), "Should find at least one candidate");
        let best = &candidates[0];
        assert!(
            (best.bpm - 120.0).abs() < 3.0,
            "Best BPM should be close to 120, got {:.2}",
            best.bpm
        );
        assert!(best.confidence > 0.0);
    }

    #[test]
    fn test_autocorrelation_90bpm() {
        let fps = 22050.0 / 410.0;
        let novelty = pulse_train(90.0, fps, 1500);
        let candidates = estimate_bpm_from_autocorrelation(&novelty, fps, 60.0, 180.0).unwrap();
        assert!((candidates[0].bpm - 90.0).abs() < 3.0, "got {:.2}", candidates[0].bpm);
    }

    #[test]
    fn test_autocorrelation_short_or_flat() {
        let fps = 50.0;
        assert!(estimate_bpm_from_autocorrelation(&[1.0; 10], fps, 60.0, 180.0)
            .unwrap()
            .is_empty());
        assert!(estimate_bpm_from_autocorrelation(&[0.0; 500], fps, 60.0, 180.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_autocorrelation_invalid_params() {
        assert!(estimate_bpm_from_autocorrelation(&[0.0; 100], 0.0, 60.0, 180.0).is_err());
        assert!(estimate_bpm_from_autocorrelation(&[0.0; 100], 50.0, 180.0, 60.0).is_err());
    }

    #[test]
    fn test_fft_autocorrelation_matches_direct() {
        let signal = [1.0f32, -0.5, 0.25, 0.0, 0.75];
        let acf = compute_autocorrelation_fft(&signal);
        for lag in 0..signal.len() {
            let direct: f32 = (0..signal.len() - lag).map(|i| signal[i] * signal[i + lag]).sum();
            assert!((acf[lag] - direct).abs() < 1e-4, "lag {}: {} vs {}", lag, acf[lag], direct);
        }
    }
}
