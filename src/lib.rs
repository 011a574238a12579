//! # Chordline
//!
//! A chord recognition engine: turns a recording into a chord timeline, plus the
//! song's key and tempo.
//!
//! ## Features
//!
//! - **Feature Extraction**: FFT chroma, autocorrelation bass pitch and frame energy
//! - **Key Detection**: Four weighted evidence votes with a fourth-above guard
//! - **Chord Decoding**: Beam-searched Viterbi and a bass-anchored segmenter, reconciled
//! - **Refinement**: Extensions, inversions, pattern memory, outlier smoothing and
//!   tonic re-validation
//!
//! ## Quick Start
//!
//! ```no_run
//! use chordline::{analyze_audio, AnalysisConfig, AudioInput};
//!
//! // Interleaved stereo samples, f32 in [-1.0, 1.0]
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let input = AudioInput::interleaved(&samples, 2, 44100);
//!
//! let result = analyze_audio(&input, AnalysisConfig::default())?;
//!
//! println!("Key: {} (confidence: {:.2})", result.key.name(), result.key.confidence);
//! for entry in &result.timeline {
//!     println!("{:>7.2}s  {}", entry.start_time, entry.label);
//! }
//! # Ok::<(), chordline::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The analysis pipeline follows this flow:
//!
//! ```text
//! Audio Input → Preprocessing → Features → Tempo → Key → Decode (A + B)
//!             → Consensus → Refinement → Tonic Validation → Output
//! ```
//!
//! A validated key change re-runs decoding and refinement once.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod decoding;
pub mod error;
pub mod features;
pub mod preprocessing;
pub mod refinement;
pub mod theory;

// Re-export main types
pub use analysis::diagnostics::{AnalysisObserver, Diagnostic, DiagnosticCollector, NoopObserver, Stage};
pub use analysis::result::{AnalysisMetadata, AnalysisResult, Key, TimelineEntry};
pub use analysis::timeline::{ChordEvent, Timeline};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use theory::chord::{Chord, ChordQuality, Provenance};
pub use theory::pitch::PitchClass;

use std::time::Instant;

use decoding::{decode_viterbi, segment_bass_anchored};
use features::onset::{estimate_texture, novelty::combined_novelty};
use features::period::estimate_tempo;
use features::{extract_features, FeatureSet};
use refinement::{merge_timelines, refine, revalidate_tonic, KeyChangeGuard, RefinedTimeline};

/// Decode/refine passes per analysis: the first, plus one after a key change
const MAX_DECODE_PASSES: u32 = 2;

/// Raw audio handed to the engine
#[derive(Debug, Clone, Copy)]
pub struct AudioInput<'a> {
    /// Interleaved samples, normalized to [-1.0, 1.0]
    pub samples: &'a [f32],

    /// Number of interleaved channels
    pub channels: u16,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl<'a> AudioInput<'a> {
    /// Mono input
    pub fn mono(samples: &'a [f32], sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Interleaved multichannel input
    pub fn interleaved(samples: &'a [f32], channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Reject input the engine cannot analyze
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.samples.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
        }
        if self.channels == 0 {
            return Err(AnalysisError::InvalidInput("Channel count is zero".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
        }
        if self.samples.len() % self.channels as usize != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Sample count {} is not divisible by channel count {}",
                self.samples.len(),
                self.channels
            )));
        }
        if let Some(pos) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "Non-finite sample at index {}",
                pos
            )));
        }
        Ok(())
    }
}

/// Report progress for `stage`, or stop if the host cancelled
fn checkpoint(observer: &dyn AnalysisObserver, stage: Stage, fraction: f32) -> Result<(), AnalysisError> {
    if observer.is_cancelled() {
        log::debug!("Analysis cancelled before stage {}", stage.name());
        return Err(AnalysisError::Cancelled(stage.name().to_string()));
    }
    observer.on_progress(stage, fraction);
    Ok(())
}

/// Main analysis function
///
/// Analyzes audio samples and returns the chord timeline, key and tempo.
///
/// # Arguments
///
/// * `input` - Interleaved samples with channel count and sample rate
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `AnalysisResult` containing the timeline, key, tempo and metadata
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty input, zero channels, a zero
/// sample rate, a sample count not divisible by the channel count, non-finite
/// samples, or a clip shorter than one analysis frame
///
/// # Example
///
/// ```no_run
/// use chordline::{analyze_audio, AnalysisConfig, AudioInput};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// let result = analyze_audio(&AudioInput::mono(&samples, 44100), AnalysisConfig::default())?;
/// assert!(result.timeline.is_empty());
/// # Ok::<(), chordline::AnalysisError>(())
/// ```
pub fn analyze_audio(input: &AudioInput<'_>, config: AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
    analyze_audio_with_observer(input, config, &NoopObserver)
}

/// [`analyze_audio`] with progress, diagnostics and cancellation
///
/// The observer is called only between stages. Cancellation is polled at the same
/// points and aborts with `AnalysisError::Cancelled`.
pub fn analyze_audio_with_observer(
    input: &AudioInput<'_>,
    config: AnalysisConfig,
    observer: &dyn AnalysisObserver,
) -> Result<AnalysisResult, AnalysisError> {
    let start_time = Instant::now();

    checkpoint(observer, Stage::Preprocess, 0.0)?;
    log::debug!(
        "Starting chord analysis: {} samples, {} channels at {} Hz",
        input.samples.len(),
        input.channels,
        input.sample_rate
    );
    input.validate()?;

    let mono = preprocessing::channel_mixer::downmix(input.samples, input.channels)?;
    let sample_rate = config.analysis_sample_rate;
    let samples = preprocessing::resample::resample(&mono, input.sample_rate, sample_rate)?;
    if samples.len() < config.features.frame_size {
        return Err(AnalysisError::InvalidInput(format!(
            "Clip too short: {} samples at {} Hz, need at least one {}-sample frame",
            samples.len(),
            sample_rate,
            config.features.frame_size
        )));
    }

    checkpoint(observer, Stage::Features, 0.1)?;
    let features = extract_features(&samples, sample_rate, &config.features)?;
    let energies: Vec<f32> = features.frames().iter().map(|f| f.energy).collect();

    let Some(start_frame) = preprocessing::silence::music_start_frame(&energies, config.min_amplitude_db)
    else {
        log::warn!("Clip is silent, returning an empty timeline");
        return Ok(silent_result(&features, &config, start_time));
    };
    let music_start_time = features.frame_time(start_frame);

    checkpoint(observer, Stage::Tempo, 0.35)?;
    let fps = features.frames_per_second();
    let novelty = combined_novelty(&features, config.segmenter.flux_lag_frames);
    let tempo = estimate_tempo(&novelty, fps, &config.tempo)?;
    let texture = estimate_texture(&novelty[start_frame..], fps, &config.tempo);

    checkpoint(observer, Stage::Key, 0.45)?;
    let estimate = features::key::detect_key(&features, start_frame, &config.key)?;
    observer.on_diagnostic(&Diagnostic::TonicVotes {
        tallies: estimate.tallies,
        votes: estimate.votes.clone(),
        key: estimate.key,
    });
    if let Some((from, to)) = estimate.fourth_guard {
        observer.on_diagnostic(&Diagnostic::FourthGuardApplied { from, to });
    }

    let mut warnings = Vec::new();
    if tempo.confidence <= 0.0 {
        warnings.push(format!("No clear periodicity; tempo defaulted to {:.0} BPM", tempo.bpm));
    }
    if estimate.key.confidence < config.key.low_confidence {
        warnings.push(format!(
            "Low key confidence ({:.2}); decoded conservatively",
            estimate.key.confidence
        ));
    }

    let initial_key = estimate.key;
    let mut key = initial_key;
    let mut guard = KeyChangeGuard::new(config.refine.max_key_changes);
    let mut passes = 0u32;

    let refined: RefinedTimeline = loop {
        passes += 1;
        let base = if passes == 1 { 0.55 } else { 0.8 };

        checkpoint(observer, Stage::Decode, base)?;
        let conservative = key.confidence < config.key.low_confidence;
        if conservative {
            observer.on_diagnostic(&Diagnostic::ConservativeDecode {
                key_confidence: key.confidence,
            });
        }
        let viterbi = decode_viterbi(&features, start_frame, &key, &config.theory, &config.decoder, conservative);
        let segmented = segment_bass_anchored(
            &features,
            start_frame,
            &key,
            &tempo.grid,
            texture,
            &config.theory,
            &config.segmenter,
        );

        checkpoint(observer, Stage::Refine, base + 0.1)?;
        let merged = merge_timelines(&viterbi, &segmented, &key, &config.theory, &config.refine);
        let refined = refine(&merged, &features, &key, texture, &config.theory, &config.refine);
        for diagnostic in &refined.diagnostics {
            observer.on_diagnostic(diagnostic);
        }

        if passes >= MAX_DECODE_PASSES {
            break refined;
        }

        checkpoint(observer, Stage::Validate, base + 0.15)?;
        let decision = revalidate_tonic(&refined.timeline, &key, &mut guard, &config.refine);
        observer.on_diagnostic(&Diagnostic::TonicRevalidated {
            current: decision.current,
            proposed: decision.proposed,
            accepted: decision.accepted,
        });
        if !decision.accepted {
            break refined;
        }
        key = decision.key();
        log::debug!("Key corrected {} -> {}, re-running decode", initial_key.name(), key.name());
        observer.on_diagnostic(&Diagnostic::DecodeRerun { key });
    };

    if refined.timeline.is_empty() {
        warnings.push("No chord cleared its confidence floor".to_string());
    }

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
    log::debug!(
        "Analysis complete: key {}, {:.1} BPM, {} chords, {} pass(es) in {:.1} ms",
        key.name(),
        tempo.bpm,
        refined.timeline.len(),
        passes,
        processing_time_ms
    );

    Ok(AnalysisResult {
        timeline: refined.timeline.to_entries(),
        key,
        tempo_bpm: tempo.bpm.round().max(0.0) as u32,
        music_start_time,
        duration_seconds: features.duration(),
        metadata: AnalysisMetadata {
            sample_rate,
            frame_count: features.len(),
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            tempo_confidence: tempo.confidence,
            texture,
            initial_key,
            key_corrected: !key.same_tonality(&initial_key),
            decode_passes: passes,
            patterns: refined.patterns,
            confidence_warnings: warnings,
        },
    })
}

/// Result for a clip with no frame above the music-start threshold
fn silent_result(features: &FeatureSet, config: &AnalysisConfig, start_time: Instant) -> AnalysisResult {
    let key = Key::new(0, false, 0.0);
    AnalysisResult {
        timeline: Vec::new(),
        key,
        tempo_bpm: config.tempo.default_bpm.round().max(0.0) as u32,
        music_start_time: features.duration(),
        duration_seconds: features.duration(),
        metadata: AnalysisMetadata {
            sample_rate: features.sample_rate(),
            frame_count: features.len(),
            processing_time_ms: start_time.elapsed().as_secs_f32() * 1000.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            tempo_confidence: 0.0,
            texture: features::onset::Texture::Sustained,
            initial_key: key,
            key_corrected: false,
            decode_passes: 0,
            patterns: Vec::new(),
            confidence_warnings: vec!["Clip is silent".to_string()],
        },
    }
}
