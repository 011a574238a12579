//! Autocorrelation bass pitch estimator
//!
//! # Algorithm
//!
//! 1. Keep only FFT bins inside the bass band (default 40-300 Hz)
//! 2. Resynthesize a low-pass pseudo-signal `x[n] = Σ mag(k)·cos(2π·f_k·n/sr)`
//! 3. Compute its autocorrelation with FFT acceleration: `ACF = IFFT(|FFT(x)|²)`
//! 4. Normalize each lag by `ACF[0]` and by the overlap length
//! 5. Among local maxima in the band's lag range, take the first one within
//!    `bass_peak_tolerance` of the strongest; if it clears the correlation
//!    threshold its lag gives F0, otherwise the frame has no bass pitch
//!
//! Resynthesizing from magnitudes discards phase, which is fine here: only the
//! periodicity of the low band matters, and the zero-phase signal makes every
//! harmonic line up at lag 0 and again at the fundamental period.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::FeatureConfig;
use crate::theory::pitch::{frequency_to_pc, PitchClass};

const EPSILON: f32 = 1e-10;

/// Absolute bass-band magnitude below which no pitch is attempted
const SILENCE_MAGNITUDE: f32 = 1e-6;

/// Per-thread working buffers for [`BassEstimator::estimate`]
#[derive(Debug, Clone)]
pub struct BassScratch {
    pseudo: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
}

/// Bass F0 estimator bound to one spectrum layout
pub struct BassEstimator {
    bins: Vec<usize>,
    cos_table: Vec<f32>,
    fft_size: usize,
    signal_len: usize,
    acf_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    lag_min: usize,
    lag_max: usize,
    sample_rate: u32,
    min_hz: f32,
    max_hz: f32,
    threshold: f32,
    tolerance: f32,
    relative_floor: f32,
}

impl std::fmt::Debug for BassEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BassEstimator")
            .field("bins", &self.bins.len())
            .field("lag_min", &self.lag_min)
            .field("lag_max", &self.lag_max)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl BassEstimator {
    /// Build an estimator for spectra of an `fft_size`-point FFT at `sample_rate`
    pub fn new(fft_size: usize, sample_rate: u32, config: &FeatureConfig) -> Self {
        debug_assert!(fft_size.is_power_of_two());
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let bins: Vec<usize> = (1..=fft_size / 2)
            .filter(|&k| {
                let f = k as f32 * bin_hz;
                f >= config.bass_min_hz && f <= config.bass_max_hz
            })
            .collect();

        // cos(2π·k·n/N) depends only on (k·n) mod N
        let cos_table: Vec<f32> = (0..fft_size)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos())
            .collect();

        let signal_len = fft_size / 2;
        let acf_size = (2 * signal_len).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(acf_size);
        let inverse = planner.plan_fft_inverse(acf_size);

        let sr = sample_rate as f32;
        let lag_min = ((sr / config.bass_max_hz).floor() as usize).max(2);
        let lag_max = ((sr / config.bass_min_hz).ceil() as usize).min(signal_len.saturating_sub(2));

        Self {
            bins,
            cos_table,
            fft_size,
            signal_len,
            acf_size,
            forward,
            inverse,
            lag_min,
            lag_max,
            sample_rate,
            min_hz: config.bass_min_hz,
            max_hz: config.bass_max_hz,
            threshold: config.bass_correlation_threshold,
            tolerance: config.bass_peak_tolerance.clamp(0.0, 1.0),
            relative_floor: 10.0_f32.powf(config.bass_relative_floor_db / 20.0),
        }
    }

    /// Allocate working buffers for one worker
    pub fn scratch(&self) -> BassScratch {
        let scratch_len = self
            .forward
            .get_inplace_scratch_len()
            .max(self.inverse.get_inplace_scratch_len());
        BassScratch {
            pseudo: vec![0.0; self.signal_len],
            buffer: vec![Complex::new(0.0, 0.0); self.acf_size],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Estimate the bass pitch class of one magnitude spectrum
    ///
    /// Returns `None` when the bass band is silent, too weak relative to the rest
    /// of the spectrum, or not periodic enough.
    pub fn estimate(&self, magnitudes: &[f32], scratch: &mut BassScratch) -> Option<PitchClass> {
        if self.bins.is_empty() || self.lag_min + 2 >= self.lag_max {
            return None;
        }

        let frame_peak = magnitudes.iter().copied().fold(0.0f32, f32::max);
        let bass_peak = self
            .bins
            .iter()
            .filter_map(|&k| magnitudes.get(k).copied())
            .fold(0.0f32, f32::max);
        if bass_peak < SILENCE_MAGNITUDE || bass_peak < frame_peak * self.relative_floor {
            return None;
        }

        // Step 1: resynthesize the low-pass pseudo-signal
        let mask = self.fft_size - 1;
        for (n, x) in scratch.pseudo.iter_mut().enumerate() {
            *x = self
                .bins
                .iter()
                .map(|&k| magnitudes.get(k).copied().unwrap_or(0.0) * self.cos_table[(k * n) & mask])
                .sum();
        }

        // Step 2: autocorrelation via FFT
        for (slot, i) in scratch.buffer.iter_mut().zip(0..) {
            let value = if i < self.signal_len { scratch.pseudo[i] } else { 0.0 };
            *slot = Complex::new(value, 0.0);
        }
        self.forward
            .process_with_scratch(&mut scratch.buffer, &mut scratch.fft_scratch);
        for x in scratch.buffer.iter_mut() {
            *x = *x * x.conj();
        }
        self.inverse
            .process_with_scratch(&mut scratch.buffer, &mut scratch.fft_scratch);

        let r0 = scratch.buffer[0].re;
        if r0 <= EPSILON {
            return None;
        }
        let len = self.signal_len as f32;
        let norm = |lag: usize| -> f32 {
            scratch.buffer[lag].re / r0 * len / (len - lag as f32)
        };

        // Step 3: local maxima inside the lag range
        let mut peaks: Vec<(usize, f32)> = Vec::new();
        for lag in (self.lag_min + 1)..self.lag_max {
            let (prev, value, next) = (norm(lag - 1), norm(lag), norm(lag + 1));
            if value > prev && value >= next {
                peaks.push((lag, value));
            }
        }
        let best = peaks.iter().map(|&(_, v)| v).fold(f32::MIN, f32::max);
        if peaks.is_empty() || best < self.threshold {
            return None;
        }
        let (lag, value) = peaks
            .iter()
            .copied()
            .find(|&(_, v)| v >= self.tolerance * best)?;

        // Step 4: parabolic interpolation around the chosen lag
        let (a, c) = (norm(lag - 1), norm(lag + 1));
        let denom = a - 2.0 * value + c;
        let offset = if denom.abs() > EPSILON {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let f0 = self.sample_rate as f32 / (lag as f32 + offset);
        if f0 < self.min_hz * 0.9 || f0 > self.max_hz * 1.1 {
            return None;
        }
        Some(frequency_to_pc(f0))
    }
}
