//! Windowed magnitude spectra
//!
//! Frames are centered: frame `i` covers `[i·hop − frame/2, i·hop + frame/2)` with
//! zeros outside the clip. The FFT length is always a power of two; shorter frames
//! are zero-padded up to it.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Compute a periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let m = n as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / m).cos())
        .collect()
}

/// Per-thread working buffers for [`SpectrumAnalyzer::analyze`]
#[derive(Debug, Clone)]
pub struct SpectrumScratch {
    buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    /// Magnitudes of the last analyzed frame (`fft_size / 2 + 1` bins)
    pub magnitudes: Vec<f32>,
}

/// Summary of one analyzed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Sum of squared windowed samples
    pub energy: f32,
    /// True when the whole window lies inside the clip
    pub full_window: bool,
}

/// Hann-windowed FFT magnitude analyzer with a cached plan
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame_size: usize,
    fft_size: usize,
    sample_rate: u32,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("frame_size", &self.frame_size)
            .field("fft_size", &self.fft_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// Plan an analyzer for `frame_size` samples at `sample_rate`
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let frame_size = frame_size.max(2);
        let fft_size = frame_size.next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            window: hann_window(frame_size),
            frame_size,
            fft_size,
            sample_rate,
        }
    }

    /// Window length in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// FFT length (next power of two of the frame size)
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency spacing between bins in Hz
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Allocate working buffers for one worker
    pub fn scratch(&self) -> SpectrumScratch {
        SpectrumScratch {
            buffer: vec![Complex::new(0.0, 0.0); self.fft_size],
            fft_scratch: vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()],
            magnitudes: vec![0.0; self.num_bins()],
        }
    }

    /// Window the frame centered on sample `center` and store its magnitudes in
    /// `scratch.magnitudes`
    pub fn analyze(&self, samples: &[f32], center: usize, scratch: &mut SpectrumScratch) -> FrameInfo {
        debug_assert!(self.fft_size.is_power_of_two());
        debug_assert_eq!(scratch.buffer.len(), self.fft_size);

        let half = self.frame_size / 2;
        let start = center as isize - half as isize;
        let full_window = start >= 0 && (start as usize + self.frame_size) <= samples.len();

        let mut energy = 0.0f32;
        for (j, slot) in scratch.buffer.iter_mut().enumerate() {
            let value = if j < self.frame_size {
                let idx = start + j as isize;
                let sample = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize]
                } else {
                    0.0
                };
                sample * self.window[j]
            } else {
                0.0
            };
            energy += value * value;
            *slot = Complex::new(value, 0.0);
        }

        self.fft
            .process_with_scratch(&mut scratch.buffer, &mut scratch.fft_scratch);

        for (mag, bin) in scratch.magnitudes.iter_mut().zip(scratch.buffer.iter()) {
            *mag = bin.norm();
        }

        FrameInfo { energy, full_window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_power_of_two_frame_is_padded() {
        let analyzer = SpectrumAnalyzer::new(3000, 22050);
        assert_eq!(analyzer.fft_size(), 4096);
        assert_eq!(analyzer.num_bins(), 2049);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 22050;
        let analyzer = SpectrumAnalyzer::new(4096, sr);
        let freq = 440.0;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let mut scratch = analyzer.scratch();
        let info = analyzer.analyze(&samples, 10_000, &mut scratch);
        assert!(info.full_window);
        assert!(info.energy > 0.0);

        let peak = scratch
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let peak_hz = peak as f32 * analyzer.bin_hz();
        assert!((peak_hz - freq).abs() < analyzer.bin_hz(), "peak at {} Hz", peak_hz);
    }

    #[test]
    fn test_edge_frame_is_partial() {
        let analyzer = SpectrumAnalyzer::new(1024, 22050);
        let samples = vec![0.5f32; 4096];
        let mut scratch = analyzer.scratch();
        assert!(!analyzer.analyze(&samples, 0, &mut scratch).full_window);
        assert!(analyzer.analyze(&samples, 512, &mut scratch).full_window);
        assert!(!analyzer.analyze(&samples, 4000, &mut scratch).full_window);
    }
}
