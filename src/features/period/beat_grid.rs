//! Beat grid fitting
//!
//! A constant-tempo grid `t_k = phase + k · period`. The phase is the offset inside
//! one period whose grid positions collect the most novelty, so beats land on the
//! strongest recurring onsets.

use serde::{Deserialize, Serialize};

/// Constant-tempo beat grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Seconds per beat
    pub period: f32,

    /// Time of the first beat in `[0, period)`
    pub phase: f32,
}

impl BeatGrid {
    /// Grid with the given tempo and phase
    pub fn new(bpm: f32, phase: f32) -> Self {
        let period = 60.0 / bpm.max(1.0);
        Self {
            period,
            phase: phase.rem_euclid(period),
        }
    }

    /// Fit the phase of a `bpm` grid to a novelty curve sampled at `frames_per_second`
    pub fn fit(novelty: &[f32], frames_per_second: f32, bpm: f32) -> Self {
        let period_frames = 60.0 * frames_per_second / bpm.max(1.0);
        let steps = period_frames.round().max(1.0) as usize;
        if novelty.is_empty() || frames_per_second <= 0.0 {
            return Self::new(bpm, 0.0);
        }

        let mut best = (0usize, f32::MIN);
        for offset in 0..steps {
            let mut sum = 0.0f32;
            let mut t = offset as f32;
            while (t.round() as usize) < novelty.len() {
                sum += novelty[t.round() as usize];
                t += period_frames;
            }
            if sum > best.1 {
                best = (offset, sum);
            }
        }
        Self::new(bpm, best.0 as f32 / frames_per_second)
    }

    /// Tempo in BPM
    pub fn bpm(&self) -> f32 {
        60.0 / self.period
    }

    /// Beat times inside `[start, end)`
    pub fn beats_between(&self, start: f32, end: f32) -> Vec<f32> {
        if end <= start || self.period <= 0.0 {
            return Vec::new();
        }
        let first = ((start - self.phase) / self.period).ceil().max(0.0) as usize;
        (first..)
            .map(|k| self.phase + k as f32 * self.period)
            .take_while(|&t| t < end)
            .filter(|&t| t >= start)
            .collect()
    }
}
