//! Key-relative harmony: scale degrees, diatonic triads and their relatives
//!
//! Minor keys use the natural minor scale; the raised-leading-tone dominant is
//! reachable through the borrowed-chord allow-list instead.

use super::chord::{Chord, ChordQuality, Provenance};
use super::pitch::{interval, transpose, PitchClass};
use crate::analysis::result::Key;
use crate::config::TheoryConfig;

/// Major scale intervals
pub const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Natural minor scale intervals
pub const MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Triad quality per major scale degree (I ii iii IV V vi vii°)
pub const MAJOR_TRIADS: [ChordQuality; 7] = [
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Minor,
    ChordQuality::Major,
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Diminished,
];

/// Triad quality per natural minor scale degree (i ii° III iv v VI VII)
pub const MINOR_TRIADS: [ChordQuality; 7] = [
    ChordQuality::Minor,
    ChordQuality::Diminished,
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Minor,
    ChordQuality::Major,
    ChordQuality::Major,
];

fn scale_of(key: &Key) -> (&'static [u8; 7], &'static [ChordQuality; 7]) {
    if key.minor {
        (&MINOR_SCALE, &MINOR_TRIADS)
    } else {
        (&MAJOR_SCALE, &MAJOR_TRIADS)
    }
}

/// Absolute pitch classes of the key's seven scale degrees
pub fn scale_pitch_classes(key: &Key) -> [PitchClass; 7] {
    let (scale, _) = scale_of(key);
    let mut out = [0u8; 7];
    for (slot, &i) in out.iter_mut().zip(scale.iter()) {
        *slot = transpose(key.root, i as i32);
    }
    out
}

/// Scale degree index (0-6) of a pitch class, if it belongs to the key
pub fn degree_of(key: &Key, pc: PitchClass) -> Option<usize> {
    let (scale, _) = scale_of(key);
    let rel = interval(key.root, pc);
    scale.iter().position(|&i| i == rel)
}

/// True when `pc` belongs to the key's scale
pub fn is_in_scale(key: &Key, pc: PitchClass) -> bool {
    degree_of(key, pc).is_some()
}

/// Diatonic triad quality built on `root`, if the root is a scale degree
pub fn diatonic_quality(key: &Key, root: PitchClass) -> Option<ChordQuality> {
    let (_, triads) = scale_of(key);
    degree_of(key, root).map(|d| triads[d])
}

/// The seven diatonic triads, tonic first
pub fn diatonic_triads(key: &Key) -> Vec<Chord> {
    let (_, triads) = scale_of(key);
    scale_pitch_classes(key)
        .iter()
        .zip(triads.iter())
        .map(|(&root, &quality)| Chord::new(root, quality))
        .collect()
}

/// Major chords a fifth above each diatonic degree, excluding the tonic and the
/// diminished degree (which have no stable resolution target)
pub fn secondary_dominants(key: &Key) -> Vec<Chord> {
    diatonic_triads(key)
        .iter()
        .enumerate()
        .filter(|(degree, target)| *degree != 0 && target.quality != ChordQuality::Diminished)
        .map(|(_, target)| Chord::new(transpose(target.root, 7), ChordQuality::Major))
        .filter(|chord| diatonic_quality(key, chord.root) != Some(ChordQuality::Major))
        .collect()
}

/// Borrowed chords from the allow-list of the key's mode
pub fn borrowed_chords(key: &Key, theory: &TheoryConfig) -> Vec<Chord> {
    let list = if key.minor {
        &theory.borrowed_in_minor
    } else {
        &theory.borrowed_in_major
    };
    list.iter()
        .map(|b| Chord::new(transpose(key.root, b.interval as i32), b.quality))
        .filter(|chord| diatonic_quality(key, chord.root) != Some(chord.quality))
        .collect()
}

/// Theory category of a chord relative to the key
///
/// Extensions are judged by the triad they decorate, so `G7` in C major is
/// diatonic and `D7` is a secondary dominant.
pub fn classify(key: &Key, chord: &Chord, theory: &TheoryConfig) -> Provenance {
    let triad = chord.quality.triad();
    match diatonic_quality(key, chord.root) {
        Some(q) if q == triad => return Provenance::Diatonic,
        Some(_) if matches!(triad, ChordQuality::Sus2 | ChordQuality::Sus4) => {
            return Provenance::Diatonic
        }
        _ => {}
    }
    if borrowed_chords(key, theory)
        .iter()
        .any(|b| b.root == chord.root && b.quality == triad)
    {
        return Provenance::Borrowed;
    }
    if triad == ChordQuality::Major
        && secondary_dominants(key).iter().any(|d| d.root == chord.root)
    {
        return Provenance::SecondaryDominant;
    }
    Provenance::Chromatic
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_major() -> Key {
        Key::new(0, false, 1.0)
    }

    fn a_minor() -> Key {
        Key::new(9, true, 1.0)
    }

    #[test]
    fn test_diatonic_triads_c_major() {
        let labels: Vec<String> = diatonic_triads(&c_major()).iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["C", "Dm", "Em", "F", "G", "Am", "Bdim"]);
    }

    #[test]
    fn test_diatonic_triads_a_minor() {
        let labels: Vec<String> = diatonic_triads(&a_minor()).iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Am", "Bdim", "C", "Dm", "Em", "F", "G"]);
    }

    #[test]
    fn test_secondary_dominants_c_major() {
        let labels: Vec<String> = secondary_dominants(&c_major()).iter().map(|c| c.label()).collect();
        // V/ii, V/iii, V/IV is C itself (excluded), V/V, V/vi
        assert_eq!(labels, vec!["A", "B", "D", "E"]);
    }

    #[test]
    fn test_classify() {
        let theory = TheoryConfig::default();
        let key = c_major();
        assert_eq!(classify(&key, &Chord::new(7, ChordQuality::Dominant7), &theory), Provenance::Diatonic);
        assert_eq!(classify(&key, &Chord::new(2, ChordQuality::Major), &theory), Provenance::SecondaryDominant);
        assert_eq!(classify(&key, &Chord::new(10, ChordQuality::Major), &theory), Provenance::Borrowed);
        assert_eq!(classify(&key, &Chord::new(5, ChordQuality::Minor), &theory), Provenance::Borrowed);
        assert_eq!(classify(&key, &Chord::new(1, ChordQuality::Major), &theory), Provenance::Chromatic);
        assert_eq!(classify(&key, &Chord::new(2, ChordQuality::Sus4), &theory), Provenance::Diatonic);
    }

    #[test]
    fn test_classify_minor_borrowed_dominant() {
        let theory = TheoryConfig::default();
        let key = a_minor();
        assert_eq!(classify(&key, &Chord::new(4, ChordQuality::Major), &theory), Provenance::Borrowed);
        assert_eq!(classify(&key, &Chord::new(4, ChordQuality::Minor), &theory), Provenance::Diatonic);
    }

    #[test]
    fn test_scale_membership() {
        let key = c_major();
        assert!(is_in_scale(&key, 11));
        assert!(!is_in_scale(&key, 10));
        assert_eq!(degree_of(&key, 7), Some(4));
        assert_eq!(diatonic_quality(&key, 11), Some(ChordQuality::Diminished));
    }
}
