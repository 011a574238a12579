//! Period estimation modules
//!
//! Convert a novelty curve into a tempo and beat grid using:
//! - Autocorrelation
//! - Beat grid phase fitting

pub mod autocorrelation;
pub mod beat_grid;

pub use beat_grid::BeatGrid;

use crate::config::TempoConfig;
use crate::error::AnalysisError;

/// BPM candidate with confidence
#[derive(Debug, Clone)]
pub struct BpmCandidate {
    /// BPM estimate
    pub bpm: f32,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

/// Final tempo estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// BPM estimate
    pub bpm: f32,

    /// Confidence score (0.0 when the default tempo was used)
    pub confidence: f32,

    /// Beat grid fitted to the novelty curve
    pub grid: BeatGrid,
}

/// Estimate tempo and beat grid from a novelty curve
///
/// Falls back to `config.default_bpm` with zero confidence when no periodicity is
/// found in range.
pub fn estimate_tempo(
    novelty: &[f32],
    frames_per_second: f32,
    config: &TempoConfig,
) -> Result<TempoEstimate, AnalysisError> {
    let candidates = autocorrelation::estimate_bpm_from_autocorrelation(
        novelty,
        frames_per_second,
        config.min_bpm,
        config.max_bpm,
    )?;

    let (bpm, confidence) = match candidates.first() {
        Some(best) => (best.bpm, best.confidence),
        None => {
            log::debug!("No tempo candidates, using default {:.1} BPM", config.default_bpm);
            (config.default_bpm, 0.0)
        }
    };

    let grid = BeatGrid::fit(novelty, frames_per_second, bpm);
    log::debug!(
        "Tempo: {:.2} BPM (confidence {:.3}), beat phase {:.3}s",
        bpm,
        confidence,
        grid.phase
    );

    Ok(TempoEstimate {
        bpm,
        confidence,
        grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_novelty_uses_default() {
        let estimate = estimate_tempo(&vec![0.0; 400], 50.0, &TempoConfig::default()).unwrap();
        assert_eq!(estimate.bpm, 120.0);
        assert_eq!(estimate.confidence, 0.0);
        assert!((estimate.grid.period - 0.5).abs() < 1e-6);
    }
}
