//! Analysis result types

use serde::{Deserialize, Serialize};

use crate::features::onset::Texture;
use crate::refinement::pattern_memory::DetectedPattern;
use crate::theory::chord::{ChordQuality, Provenance};
use crate::theory::pitch::{note_name, PitchClass};

/// Musical key (tonal center)
///
/// Keys are replaced wholesale when re-validated, never edited field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// Tonic pitch class (0 = C, 1 = C#, ..., 11 = B)
    pub root: PitchClass,

    /// Minor mode when true
    pub minor: bool,

    /// Confidence (0.0-1.0)
    pub confidence: f32,
}

impl Key {
    /// Create a key; the root is folded onto a pitch class
    pub fn new(root: PitchClass, minor: bool, confidence: f32) -> Self {
        Self {
            root: root % 12,
            minor,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// True when both keys share tonic and mode, regardless of confidence
    pub fn same_tonality(&self, other: &Key) -> bool {
        self.root == other.root && self.minor == other.minor
    }

    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use chordline::Key;
    ///
    /// assert_eq!(Key::new(0, false, 1.0).name(), "C");
    /// assert_eq!(Key::new(6, false, 1.0).name(), "F#");
    /// assert_eq!(Key::new(9, true, 1.0).name(), "Am");
    /// ```
    pub fn name(&self) -> String {
        if self.minor {
            format!("{}m", note_name(self.root))
        } else {
            note_name(self.root).to_string()
        }
    }

    /// Get key in DJ standard numerical notation (e.g., "1A", "2B", "12A")
    ///
    /// Major keys run 1A-12A and minor keys 1B-12B, each step up a fifth
    /// (1A = C, 2A = G, 1B = Am, 2B = Em).
    ///
    /// # Example
    ///
    /// ```
    /// use chordline::Key;
    ///
    /// assert_eq!(Key::new(0, false, 1.0).numerical(), "1A");
    /// assert_eq!(Key::new(4, true, 1.0).numerical(), "2B");
    /// ```
    pub fn numerical(&self) -> String {
        let (circle, suffix) = if self.minor {
            (&CIRCLE_OF_FIFTHS_MINOR, "B")
        } else {
            (&CIRCLE_OF_FIFTHS_MAJOR, "A")
        };
        let position = circle.iter().position(|&x| x == self.root).unwrap_or(0);
        format!("{}{}", position + 1, suffix)
    }

    /// Parse DJ numerical notation back into a key with zero confidence
    pub fn from_numerical(notation: &str) -> Option<Self> {
        if notation.len() < 2 {
            return None;
        }
        let (num_str, suffix) = notation.split_at(notation.len() - 1);
        let num: usize = num_str.parse().ok()?;
        if !(1..=12).contains(&num) {
            return None;
        }
        match suffix {
            "A" => Some(Key::new(CIRCLE_OF_FIFTHS_MAJOR[num - 1], false, 0.0)),
            "B" => Some(Key::new(CIRCLE_OF_FIFTHS_MINOR[num - 1], true, 0.0)),
            _ => None,
        }
    }
}

/// C, G, D, A, E, B, F#, C#, G#, D#, A#, F
const CIRCLE_OF_FIFTHS_MAJOR: [PitchClass; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Am, Em, Bm, F#m, C#m, G#m, D#m, A#m, Fm, Cm, Gm, Dm
const CIRCLE_OF_FIFTHS_MINOR: [PitchClass; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

/// One span of the output chord timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Start time in seconds
    pub start_time: f32,

    /// End time in seconds (start of the next entry, or the clip end)
    pub end_time: f32,

    /// Display label with sharp spelling (e.g. "Am7/E")
    pub label: String,

    /// Chord root pitch class
    pub root: PitchClass,

    /// Chord quality
    pub quality: ChordQuality,

    /// Sounding bass pitch class when it differs from the root
    pub bass: Option<PitchClass>,

    /// Confidence (0.0-1.0)
    pub confidence: f32,

    /// Theory category relative to the final key
    pub provenance: Provenance,
}

/// Complete analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Chord timeline covering `[music_start_time, duration_seconds)`
    pub timeline: Vec<TimelineEntry>,

    /// Global tonal center
    pub key: Key,

    /// Tempo estimate in BPM
    pub tempo_bpm: u32,

    /// Time of the first non-silent frame in seconds
    pub music_start_time: f32,

    /// Clip duration in seconds
    pub duration_seconds: f32,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Internal analysis sample rate in Hz
    pub sample_rate: u32,

    /// Number of analysis frames
    pub frame_count: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Tempo confidence (0.0-1.0, zero when the default tempo was used)
    pub tempo_confidence: f32,

    /// Coarse material texture used to tune filter aggressiveness
    pub texture: Texture,

    /// Key chosen by tonal-center voting before re-validation
    pub initial_key: Key,

    /// True when tonic re-validation replaced the initial key
    pub key_corrected: bool,

    /// Decode/refine passes executed (1, or 2 after a key correction)
    pub decode_passes: u32,

    /// Repeating root patterns found by pattern memory in the final pass
    pub patterns: Vec<DetectedPattern>,

    /// Confidence warnings (low confidence, ambiguous results, etc.)
    pub confidence_warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name() {
        assert_eq!(Key::new(0, false, 0.5).name(), "C");
        assert_eq!(Key::new(1, true, 0.5).name(), "C#m");
        assert_eq!(Key::new(11, false, 0.5).name(), "B");
    }

    #[test]
    fn test_key_root_is_folded() {
        assert_eq!(Key::new(14, false, 2.0).root, 2);
        assert_eq!(Key::new(14, false, 2.0).confidence, 1.0);
    }

    #[test]
    fn test_key_numerical_roundtrip() {
        for root in 0..12u8 {
            for minor in [false, true] {
                let key = Key::new(root, minor, 0.0);
                let parsed = Key::from_numerical(&key.numerical()).unwrap();
                assert!(parsed.same_tonality(&key), "roundtrip failed for {}", key.name());
            }
        }
        assert_eq!(Key::from_numerical("13A"), None);
        assert_eq!(Key::from_numerical("1C"), None);
        assert_eq!(Key::from_numerical(""), None);
    }
}
