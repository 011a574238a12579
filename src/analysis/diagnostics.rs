//! Stage progress and structured diagnostics
//!
//! The pipeline reports to an [`AnalysisObserver`] only between stages. Algorithm
//! code returns its decisions as values; the pipeline turns them into
//! [`Diagnostic`] events, so none of the scoring code performs I/O.

use std::sync::Mutex;

use crate::analysis::result::Key;
use crate::theory::chord::Chord;
use crate::theory::pitch::PitchClass;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Input validation, downmix and resampling
    Preprocess,
    /// Per-frame chroma, bass and energy
    Features,
    /// Tempo and beat grid
    Tempo,
    /// Tonal center voting
    Key,
    /// Viterbi decoding and bass-anchored segmentation
    Decode,
    /// Consensus and refinement passes
    Refine,
    /// Tonic re-validation
    Validate,
}

impl Stage {
    /// Stable stage name for progress reporting
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Features => "features",
            Stage::Tempo => "tempo",
            Stage::Key => "key",
            Stage::Decode => "decode",
            Stage::Refine => "refine",
            Stage::Validate => "validate",
        }
    }
}

/// Origin of a tonal-center vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSource {
    /// Energy-weighted bass histogram with cadence bonuses
    BassHistogram,
    /// Krumhansl-Schmuckler profile correlation
    KeyProfile,
    /// First clean triad after the music start
    FirstChord,
    /// Most frequent strongest chroma bin in loud frames
    DominantPitch,
}

/// One cast vote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    /// Which evidence source cast it
    pub source: VoteSource,
    /// Pitch class voted for
    pub root: PitchClass,
    /// Vote weight
    pub weight: f32,
}

/// Structured diagnostic event
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Tonal-center vote breakdown
    TonicVotes {
        /// Summed votes per pitch class
        tallies: [f32; 12],
        /// Individual votes
        votes: Vec<Vote>,
        /// Chosen key
        key: Key,
    },
    /// The fourth-above guard moved the tonic to the first-chord candidate
    FourthGuardApplied {
        /// Raw vote winner
        from: PitchClass,
        /// Reassigned tonic
        to: PitchClass,
    },
    /// Decoding ran with a narrower beam and no borrowed states
    ConservativeDecode {
        /// Key confidence that triggered it
        key_confidence: f32,
    },
    /// Pattern memory corrected an event
    PatternCorrection {
        /// Event start time
        time: f32,
        /// Chord before correction
        from: Chord,
        /// Chord after correction
        to: Chord,
    },
    /// Outlier smoothing replaced an event
    OutlierSmoothed {
        /// Event start time
        time: f32,
        /// Chord before smoothing
        from: Chord,
        /// Neighbor chord that replaced it
        to: Chord,
    },
    /// Tonic re-validation outcome
    TonicRevalidated {
        /// Key going in
        current: Key,
        /// Better-scoring candidate, if any
        proposed: Option<Key>,
        /// Whether the candidate replaced the current key
        accepted: bool,
    },
    /// Decode and refinement re-ran against a corrected key
    DecodeRerun {
        /// Corrected key
        key: Key,
    },
}

/// Receives progress and diagnostics at stage boundaries
///
/// All methods have no-op defaults. `is_cancelled` is polled at the same
/// boundaries; returning `true` aborts with [`crate::AnalysisError::Cancelled`].
pub trait AnalysisObserver {
    /// A stage is about to start; `fraction` is overall progress in `[0, 1]`
    fn on_progress(&self, _stage: Stage, _fraction: f32) {}

    /// A decision worth reporting was made
    fn on_diagnostic(&self, _diagnostic: &Diagnostic) {}

    /// Whether the host wants the analysis stopped
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Observer that records everything it receives
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    progress: Mutex<Vec<(Stage, f32)>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded progress checkpoints
    pub fn progress(&self) -> Vec<(Stage, f32)> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Recorded diagnostics
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl AnalysisObserver for DiagnosticCollector {
    fn on_progress(&self, stage: Stage, fraction: f32) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.push((stage, fraction));
        }
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_records_in_order() {
        let collector = DiagnosticCollector::new();
        collector.on_progress(Stage::Features, 0.1);
        collector.on_progress(Stage::Key, 0.5);
        collector.on_diagnostic(&Diagnostic::ConservativeDecode { key_confidence: 0.2 });

        let progress = collector.progress();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].0.name(), "key");
        assert_eq!(collector.diagnostics().len(), 1);
        assert!(!collector.is_cancelled());
    }
}
