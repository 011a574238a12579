//! Chord types
//!
//! Chords carry structured fields (root, quality, bass) from the moment they are
//! created. The display label is rendered from those fields and never parsed back.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pitch::{interval, note_name, transpose, PitchClass};

/// Chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    /// Major triad (C-E-G)
    Major,
    /// Minor triad (C-Eb-G)
    Minor,
    /// Diminished triad (C-Eb-Gb)
    Diminished,
    /// Augmented triad (C-E-G#)
    Augmented,
    /// Suspended second (C-D-G)
    Sus2,
    /// Suspended fourth (C-F-G)
    Sus4,
    /// Dominant seventh (C-E-G-Bb)
    Dominant7,
    /// Major seventh (C-E-G-B)
    Major7,
    /// Minor seventh (C-Eb-G-Bb)
    Minor7,
    /// Major sixth (C-E-G-A)
    Six,
    /// Added ninth (C-E-G-D)
    Nine,
}

impl ChordQuality {
    /// Intervals above the root, root first
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Six => &[0, 4, 7, 9],
            ChordQuality::Nine => &[0, 4, 7, 2],
        }
    }

    /// Third above the root, if the chord has one
    pub fn third(self) -> Option<u8> {
        match self {
            ChordQuality::Sus2 | ChordQuality::Sus4 => None,
            ChordQuality::Minor | ChordQuality::Diminished | ChordQuality::Minor7 => Some(3),
            _ => Some(4),
        }
    }

    /// Fifth above the root
    pub fn fifth(self) -> u8 {
        match self {
            ChordQuality::Diminished => 6,
            ChordQuality::Augmented => 8,
            _ => 7,
        }
    }

    /// The triad this quality decorates (`Dominant7` → `Major`, `Minor7` → `Minor`)
    pub fn triad(self) -> ChordQuality {
        match self {
            ChordQuality::Dominant7 | ChordQuality::Major7 | ChordQuality::Six | ChordQuality::Nine => {
                ChordQuality::Major
            }
            ChordQuality::Minor7 => ChordQuality::Minor,
            other => other,
        }
    }

    /// True for the plain major/minor triads
    pub fn is_plain_triad(self) -> bool {
        matches!(self, ChordQuality::Major | ChordQuality::Minor)
    }

    /// Label suffix (`""`, `"m"`, `"dim"`, `"7"`, ...)
    pub fn suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Six => "6",
            ChordQuality::Nine => "add9",
        }
    }
}

/// Where a chord sits relative to the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Built on a scale degree with the scale's own quality
    Diatonic,
    /// Taken from the parallel mode's allow-list
    Borrowed,
    /// Major chord a fifth above a diatonic degree
    SecondaryDominant,
    /// No theory explanation
    Chromatic,
}

impl Provenance {
    /// Theory category rank: diatonic (0) beats borrowed/secondary (1) beats chromatic (2)
    pub fn rank(self) -> u8 {
        match self {
            Provenance::Diatonic => 0,
            Provenance::Borrowed | Provenance::SecondaryDominant => 1,
            Provenance::Chromatic => 2,
        }
    }
}

/// A chord with structured fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    /// Root pitch class
    pub root: PitchClass,

    /// Chord quality
    pub quality: ChordQuality,

    /// Sounding bass when it differs from the root (slash chord / inversion)
    pub bass: Option<PitchClass>,
}

impl Chord {
    /// Root-position chord
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        Self {
            root: root % 12,
            quality,
            bass: None,
        }
    }

    /// Same chord over `bass`; a bass equal to the root yields root position
    pub fn with_bass(self, bass: Option<PitchClass>) -> Self {
        Self {
            bass: bass.filter(|&b| b != self.root),
            ..self
        }
    }

    /// Same root and bass with another quality
    pub fn with_quality(self, quality: ChordQuality) -> Self {
        Self { quality, ..self }
    }

    /// Absolute pitch classes of the chord tones, root first
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        self.quality
            .intervals()
            .iter()
            .map(|&i| transpose(self.root, i as i32))
            .collect()
    }

    /// Absolute pitch class of the third, if any
    pub fn third(&self) -> Option<PitchClass> {
        self.quality.third().map(|i| transpose(self.root, i as i32))
    }

    /// Absolute pitch class of the fifth
    pub fn fifth(&self) -> PitchClass {
        transpose(self.root, self.quality.fifth() as i32)
    }

    /// True when `pc` is one of the chord tones
    pub fn contains(&self, pc: PitchClass) -> bool {
        self.quality.intervals().contains(&interval(self.root, pc))
    }

    /// Binary root/third/fifth template, L2-normalized
    pub fn triad_template(&self) -> [f32; 12] {
        let mut template = [0.0f32; 12];
        let triad = self.quality.triad();
        let mut members = 0.0f32;
        for &i in triad.intervals().iter().take(3) {
            template[transpose(self.root, i as i32) as usize] = 1.0;
            members += 1.0;
        }
        let norm = members.sqrt();
        for v in template.iter_mut() {
            *v /= norm;
        }
        template
    }

    /// Display label with sharp spelling, e.g. `"Am7/E"`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", note_name(self.root), self.quality.suffix())?;
        if let Some(bass) = self.bass {
            write!(f, "/{}", note_name(bass))?;
        }
        Ok(())
    }
}

/// A scored chord hypothesis at one decision point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordCandidate {
    /// The hypothesized chord
    pub chord: Chord,

    /// Theory category relative to the working key
    pub provenance: Provenance,

    /// Evidence score (higher is better)
    pub score: f32,
}

impl ChordCandidate {
    /// Create an unscored candidate
    pub fn new(chord: Chord, provenance: Provenance) -> Self {
        Self {
            chord,
            provenance,
            score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Chord::new(9, ChordQuality::Minor7).with_bass(Some(4)).label(), "Am7/E");
        assert_eq!(Chord::new(0, ChordQuality::Major).label(), "C");
        assert_eq!(Chord::new(6, ChordQuality::Diminished).label(), "F#dim");
        assert_eq!(Chord::new(7, ChordQuality::Dominant7).label(), "G7");
    }

    #[test]
    fn test_bass_equal_to_root_is_root_position() {
        let chord = Chord::new(2, ChordQuality::Minor).with_bass(Some(2));
        assert_eq!(chord.bass, None);
        assert_eq!(chord.label(), "Dm");
    }

    #[test]
    fn test_chord_tones() {
        let g7 = Chord::new(7, ChordQuality::Dominant7);
        assert_eq!(g7.pitch_classes(), vec![7, 11, 2, 5]);
        assert_eq!(g7.third(), Some(11));
        assert_eq!(g7.fifth(), 2);
        assert!(g7.contains(5));
        assert!(!g7.contains(0));
        assert_eq!(Chord::new(0, ChordQuality::Sus4).third(), None);
    }

    #[test]
    fn test_triad_template_is_unit_length() {
        let template = Chord::new(9, ChordQuality::Minor7).triad_template();
        let norm: f32 = template.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(template[9] > 0.0 && template[0] > 0.0 && template[4] > 0.0);
        assert_eq!(template[7], 0.0, "seventh is not part of the triad template");
    }

    #[test]
    fn test_provenance_rank() {
        assert!(Provenance::Diatonic.rank() < Provenance::Borrowed.rank());
        assert_eq!(Provenance::Borrowed.rank(), Provenance::SecondaryDominant.rank());
        assert!(Provenance::SecondaryDominant.rank() < Provenance::Chromatic.rank());
    }
}
