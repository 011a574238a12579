//! Configuration parameters for chord analysis
//!
//! Every tuned threshold of the pipeline lives here as a named, overridable default.
//!
//! All sections derive serde traits with `#[serde(default)]`, so a host can override
//! a handful of fields from JSON and inherit the rest:
//!
//! ```
//! use chordline::AnalysisConfig;
//!
//! let config: AnalysisConfig =
//!     serde_json::from_str(r#"{ "decoder": { "beam_width": 4 } }"#).unwrap();
//! assert_eq!(config.decoder.beam_width, 4);
//! assert_eq!(config.features.frame_size, 4096);
//! ```

use serde::{Deserialize, Serialize};

use crate::theory::chord::ChordQuality;

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Internal analysis sample rate in Hz (default: 22050)
    /// Input audio is resampled to this rate before feature extraction
    pub analysis_sample_rate: u32,

    /// Music start threshold in dB relative to the loudest frame (default: -40.0)
    pub min_amplitude_db: f32,

    /// Spectral feature extraction
    pub features: FeatureConfig,

    /// Tempo and beat grid estimation
    pub tempo: TempoConfig,

    /// Tonal center voting
    pub key: KeyConfig,

    /// Borrowed-chord allow-lists shared by decoding and refinement
    pub theory: TheoryConfig,

    /// Strategy A: beam-searched Viterbi decoder
    pub decoder: DecoderConfig,

    /// Strategy B: bass-anchored segmentation
    pub segmenter: SegmenterConfig,

    /// Consensus and refinement passes
    pub refine: RefineConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: 22050,
            min_amplitude_db: -40.0,
            features: FeatureConfig::default(),
            tempo: TempoConfig::default(),
            key: KeyConfig::default(),
            theory: TheoryConfig::default(),
            decoder: DecoderConfig::default(),
            segmenter: SegmenterConfig::default(),
            refine: RefineConfig::default(),
        }
    }
}

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Analysis frame size in samples (default: 4096, padded to a power of two)
    pub frame_size: usize,

    /// Hop size as a fraction of the frame size (default: 0.1)
    pub hop_ratio: f32,

    /// Lowest frequency folded into chroma (default: 80 Hz)
    pub chroma_min_hz: f32,

    /// Highest frequency folded into chroma (default: 5000 Hz)
    pub chroma_max_hz: f32,

    /// Bins further than this below the frame's peak bin are ignored (default: -60 dB)
    pub magnitude_floor_db: f32,

    /// Bass band lower edge (default: 40 Hz)
    pub bass_min_hz: f32,

    /// Bass band upper edge (default: 300 Hz)
    pub bass_max_hz: f32,

    /// Bass band peak must be within this many dB of the frame's peak bin (default: -30 dB)
    pub bass_relative_floor_db: f32,

    /// Minimum normalized autocorrelation for a bass period (default: 0.3)
    pub bass_correlation_threshold: f32,

    /// The first autocorrelation peak within this ratio of the best one wins (default: 0.9)
    /// Prevents picking a sub-octave lag when the true period repeats inside the band
    pub bass_peak_tolerance: f32,

    /// Neighbor radius in frames for the bass stability check (default: 2)
    pub bass_stability_radius: usize,

    /// Neighbors inside the radius that must agree with a frame's bass (default: 2)
    pub bass_min_agreeing: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            hop_ratio: 0.1,
            chroma_min_hz: 80.0,
            chroma_max_hz: 5000.0,
            magnitude_floor_db: -60.0,
            bass_min_hz: 40.0,
            bass_max_hz: 300.0,
            bass_relative_floor_db: -30.0,
            bass_correlation_threshold: 0.3,
            bass_peak_tolerance: 0.9,
            bass_stability_radius: 2,
            bass_min_agreeing: 2,
        }
    }
}

impl FeatureConfig {
    /// Hop size in samples derived from the frame size and hop ratio
    pub fn hop_size(&self) -> usize {
        ((self.frame_size as f32 * self.hop_ratio).round() as usize).max(1)
    }
}

/// Tempo and beat grid parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Minimum BPM to consider (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 180.0)
    pub max_bpm: f32,

    /// Tempo reported when no periodicity is found (default: 120.0)
    pub default_bpm: f32,

    /// Onset peak-picking threshold relative to the strongest novelty peak (default: -20 dB)
    pub onset_threshold_db: f32,

    /// Onsets per second above which a clip counts as percussive (default: 3.0)
    pub percussive_onset_rate: f32,

    /// Minimum spacing between picked onsets in seconds (default: 0.1)
    pub onset_min_gap_seconds: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 180.0,
            default_bpm: 120.0,
            onset_threshold_db: -20.0,
            percussive_onset_rate: 3.0,
            onset_min_gap_seconds: 0.1,
        }
    }
}

/// Tonal center voting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Maximum weight of the bass histogram vote (default: 2.0)
    pub bass_vote_weight: f32,

    /// Weight of the key-profile correlation vote (default: 1.5)
    pub profile_vote_weight: f32,

    /// Weight of the first-strong-chord vote (default: 1.5)
    pub first_chord_vote_weight: f32,

    /// Weight of the dominant pitch class vote (default: 1.0)
    pub dominant_vote_weight: f32,

    /// Length of the opening/closing windows that receive extra bass weight (default: 3.0 s)
    pub edge_window_seconds: f32,

    /// Bass histogram multiplier inside the opening/closing windows (default: 1.5)
    pub edge_weight: f32,

    /// Bonus per fourth/fifth bass motion into a pitch class, as a fraction of the
    /// histogram mean (default: 0.5)
    pub cadence_weight: f32,

    /// Bonus per `ii→V→I` / `IV→V→I` bass pattern, as a fraction of the histogram mean
    /// (default: 1.0)
    pub three_step_cadence_weight: f32,

    /// How far after the music start the first strong chord is searched (default: 2.0 s)
    pub first_chord_window_seconds: f32,

    /// Frames averaged per first-chord probe (default: 5)
    pub first_chord_frames: usize,

    /// Minimum clean-triad score for the first strong chord (default: 0.6)
    pub first_chord_floor: f32,

    /// Minimum chroma share for each triad member of the first strong chord (default: 0.08)
    pub first_chord_min_component: f32,

    /// Factor applied to the first-chord vote when the confident bass vote disagrees
    /// (default: 0.5)
    pub first_chord_disagreement_discount: f32,

    /// Internal bass confidence above which the bass vote counts as confident (default: 0.5)
    pub bass_confident: f32,

    /// The fourth-above guard reassigns the tonic when the first-chord candidate holds at
    /// least this share of the winner's votes (default: 0.6)
    pub fourth_guard_ratio: f32,

    /// Relative margin the stronger third must clear to commit a mode (default: 0.12)
    pub mode_third_margin: f32,

    /// Profile correlation difference that counts as "non-trivially higher" (default: 0.05)
    pub mode_profile_margin: f32,

    /// Key confidence below which the decoder runs conservatively (default: 0.4)
    pub low_confidence: f32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            bass_vote_weight: 2.0,
            profile_vote_weight: 1.5,
            first_chord_vote_weight: 1.5,
            dominant_vote_weight: 1.0,
            edge_window_seconds: 3.0,
            edge_weight: 1.5,
            cadence_weight: 0.5,
            three_step_cadence_weight: 1.0,
            first_chord_window_seconds: 2.0,
            first_chord_frames: 5,
            first_chord_floor: 0.6,
            first_chord_min_component: 0.08,
            first_chord_disagreement_discount: 0.5,
            bass_confident: 0.5,
            fourth_guard_ratio: 0.6,
            mode_third_margin: 0.12,
            mode_profile_margin: 0.05,
            low_confidence: 0.4,
        }
    }
}

/// A borrowed chord expressed relative to the tonic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowedChord {
    /// Root interval above the tonic in semitones
    pub interval: u8,

    /// Chord quality
    pub quality: ChordQuality,
}

impl BorrowedChord {
    /// Create a borrowed chord entry
    pub const fn new(interval: u8, quality: ChordQuality) -> Self {
        Self { interval, quality }
    }
}

/// Borrowed-chord allow-lists per mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TheoryConfig {
    /// Chords tolerated in major keys (default: bVII, bIII, iv, bVI)
    pub borrowed_in_major: Vec<BorrowedChord>,

    /// Chords tolerated in minor keys (default: V, IV)
    pub borrowed_in_minor: Vec<BorrowedChord>,
}

impl Default for TheoryConfig {
    fn default() -> Self {
        Self {
            borrowed_in_major: vec![
                BorrowedChord::new(10, ChordQuality::Major),
                BorrowedChord::new(3, ChordQuality::Major),
                BorrowedChord::new(5, ChordQuality::Minor),
                BorrowedChord::new(8, ChordQuality::Major),
            ],
            borrowed_in_minor: vec![
                BorrowedChord::new(7, ChordQuality::Major),
                BorrowedChord::new(5, ChordQuality::Major),
            ],
        }
    }
}

/// Viterbi decoder parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Predecessor states kept per step (default: 8)
    pub beam_width: usize,

    /// Emission bonus when the frame bass is the candidate root (default: 0.15)
    pub bass_root_bonus: f32,

    /// Emission bonus when the frame bass is the candidate third or fifth (default: 0.05)
    pub bass_member_bonus: f32,

    /// Emission bonus for diatonic states (default: 0.05)
    pub in_key_bonus: f32,

    /// Emission penalty for frames below the 30th energy percentile (default: 0.1)
    pub low_energy_penalty: f32,

    /// Runs whose mean emission falls below this are dropped (default: 0.35)
    pub emission_floor: f32,

    /// Fixed cost of changing state (default: 0.6)
    pub switch_penalty: f32,

    /// Scale of the tonal distance added to the switch penalty (default: 0.6)
    pub distance_scale: f32,

    /// Circle-of-fifths share of the tonal distance (default: 0.6)
    pub fifths_weight: f32,

    /// Chromatic share of the tonal distance (default: 0.4)
    pub chromatic_weight: f32,

    /// Distance factor for root motion by a fourth or fifth (default: 0.6)
    pub fourth_fifth_factor: f32,

    /// Distance factor for `ii→V`, `IV→V` and `V→I` (default: 0.5)
    pub functional_factor: f32,

    /// Added distance when the quality changes (default: 0.1)
    pub quality_change_cost: f32,

    /// Added distance between two non-diatonic states (default: 0.2)
    pub non_diatonic_pair_cost: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam_width: 8,
            bass_root_bonus: 0.15,
            bass_member_bonus: 0.05,
            in_key_bonus: 0.05,
            low_energy_penalty: 0.1,
            emission_floor: 0.35,
            switch_penalty: 0.6,
            distance_scale: 0.6,
            fifths_weight: 0.6,
            chromatic_weight: 0.4,
            fourth_fifth_factor: 0.6,
            functional_factor: 0.5,
            quality_change_cost: 0.1,
            non_diatonic_pair_cost: 0.2,
        }
    }
}

/// Bass-anchored segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Lag in frames for chroma flux (default: 4, about half an analysis window)
    pub flux_lag_frames: usize,

    /// Percentile of the flux curve used as the adaptive threshold (default: 0.7)
    pub flux_percentile: f32,

    /// Lower bound of the adaptive flux threshold (default: 0.15)
    pub min_flux: f32,

    /// Flux threshold multiplier for percussive material (default: 1.5)
    pub percussive_flux_scale: f32,

    /// Boundary search window around each beat as a fraction of the beat (default: 0.25)
    pub beat_tolerance: f32,

    /// Absolute minimum segment length (default: 0.25 s)
    pub min_segment_seconds: f32,

    /// Minimum segment length in beats (default: 1.0)
    pub min_segment_beats: f32,

    /// Score above which a short segment survives (default: 0.85)
    pub strong_score: f32,

    /// Score floors for the candidate tiers: diatonic root, diatonic inversion,
    /// secondary/borrowed, chromatic (default: 0.45, 0.5, 0.55, 0.7)
    pub tier_floors: [f32; 4],

    /// Weight of the absent third subtracted from a triad score (default: 0.5)
    pub wrong_third_penalty: f32,

    /// Share of a segment's stable bass frames needed to call its bass (default: 0.4)
    pub bass_share: f32,

    /// Minimum chroma share of every chord tone of a segment candidate (default: 0.05)
    pub member_floor: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            flux_lag_frames: 4,
            flux_percentile: 0.7,
            min_flux: 0.15,
            percussive_flux_scale: 1.5,
            beat_tolerance: 0.25,
            min_segment_seconds: 0.25,
            min_segment_beats: 1.0,
            strong_score: 0.85,
            tier_floors: [0.45, 0.5, 0.55, 0.7],
            wrong_third_penalty: 0.5,
            bass_share: 0.4,
            member_floor: 0.05,
        }
    }
}

/// Consensus and refinement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Confidence bonus when both decoders name the same root (default: 0.1)
    pub agreement_bonus: f32,

    /// Confidence factor when the decoders disagree (default: 0.9)
    pub disagreement_factor: f32,

    /// Extension degree must reach this fraction of the root's chroma (default: 0.5)
    pub extension_ratio: f32,

    /// Extension degree must reach this absolute chroma share (default: 0.06)
    pub extension_floor: f32,

    /// Both thirds below this share allow a suspended reading (default: 0.04)
    pub sus_third_max: f32,

    /// Perfect fifth below this share allows a diminished or augmented reading
    /// (default: 0.05)
    pub altered_fifth_max: f32,

    /// Minimum chroma share of a slash bass note (default: 0.06)
    pub inversion_prominence: f32,

    /// Share of an event's stable bass frames needed to call its bass (default: 0.5)
    pub inversion_bass_share: f32,

    /// Bass intervals above the root tolerated besides chord tones (default: [10])
    pub tolerated_bass_intervals: Vec<u8>,

    /// Shortest repeating root pattern (default: 2)
    pub pattern_min_len: usize,

    /// Longest repeating root pattern (default: 6)
    pub pattern_max_len: usize,

    /// Occurrences for a pattern to be remembered (default: 3)
    pub pattern_min_occurrences: usize,

    /// Only events below this confidence are corrected by pattern memory (default: 0.6)
    pub pattern_low_confidence: f32,

    /// Confidence gap below both neighbors that marks an outlier (default: 0.15)
    pub outlier_margin: f32,

    /// Outlier margin multiplier for percussive material (default: 0.75)
    pub percussive_outlier_scale: f32,

    /// Tonic evidence weight of root duration share (default: 1.0)
    pub tonic_duration_weight: f32,

    /// Tonic evidence weight of the opening chord (default: 0.3)
    pub tonic_open_weight: f32,

    /// Tonic evidence weight of the closing chord (default: 0.5)
    pub tonic_close_weight: f32,

    /// Tonic evidence weight of cadence share (default: 1.0)
    pub tonic_cadence_weight: f32,

    /// Relative margin a new tonic must clear over the current one (default: 0.25)
    pub tonic_switch_margin: f32,

    /// Relative margin for a switch onto the current key's subdominant (default: 1.0)
    pub subdominant_switch_margin: f32,

    /// Key changes allowed per analysis (default: 1)
    pub max_key_changes: u32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            agreement_bonus: 0.1,
            disagreement_factor: 0.9,
            extension_ratio: 0.5,
            extension_floor: 0.06,
            sus_third_max: 0.04,
            altered_fifth_max: 0.05,
            inversion_prominence: 0.06,
            inversion_bass_share: 0.5,
            tolerated_bass_intervals: vec![10],
            pattern_min_len: 2,
            pattern_max_len: 6,
            pattern_min_occurrences: 3,
            pattern_low_confidence: 0.6,
            outlier_margin: 0.15,
            percussive_outlier_scale: 0.75,
            tonic_duration_weight: 1.0,
            tonic_open_weight: 0.3,
            tonic_close_weight: 0.5,
            tonic_cadence_weight: 1.0,
            tonic_switch_margin: 0.25,
            subdominant_switch_margin: 1.0,
            max_key_changes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hop_is_ten_percent() {
        let config = FeatureConfig::default();
        assert_eq!(config.hop_size(), 410);
    }

    #[test]
    fn test_partial_json_override() {
        let json = r#"{ "key": { "low_confidence": 0.25 }, "refine": { "max_key_changes": 0 } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.key.low_confidence, 0.25);
        assert_eq!(config.refine.max_key_changes, 0);
        assert_eq!(config.key.bass_vote_weight, 2.0);
        assert_eq!(config.theory, TheoryConfig::default());
    }
}
