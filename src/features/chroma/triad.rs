//! Triad evidence from a chroma vector

use super::Chroma;
use crate::theory::chord::ChordQuality;
use crate::theory::pitch::{transpose, PitchClass};

/// Best plain triad on a fixed root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriadMatch {
    /// Root pitch class
    pub root: PitchClass,
    /// `Major` or `Minor`, whichever third is actually present
    pub quality: ChordQuality,
    /// Root + third + fifth energy minus the penalized wrong third
    pub score: f32,
    /// Smallest of the three member energies
    pub weakest_member: f32,
}

/// Score a triad with explicit third/fifth intervals
///
/// `score = root + third + fifth − penalty · other_third`, where the other third is
/// the one the chord does not use (only defined for thirds of 3 or 4 semitones).
pub fn triad_score(chroma: &Chroma, root: PitchClass, third: u8, fifth: u8, penalty: f32) -> f32 {
    let at = |i: u8| chroma[transpose(root, i as i32) as usize];
    let wrong = match third {
        3 => at(4),
        4 => at(3),
        _ => 0.0,
    };
    at(0) + at(third) + at(fifth) - penalty * wrong
}

/// Score the chord's own triad (root, third or suspension, fifth)
pub fn quality_score(chroma: &Chroma, root: PitchClass, quality: ChordQuality, penalty: f32) -> f32 {
    let triad = quality.triad();
    let third = triad.third().unwrap_or(triad.intervals()[1]);
    triad_score(chroma, root, third, triad.fifth(), penalty)
}

/// Auto-detect the third on `root` and score the resulting major or minor triad
pub fn best_triad_at(chroma: &Chroma, root: PitchClass, penalty: f32) -> TriadMatch {
    let at = |i: i32| chroma[transpose(root, i) as usize];
    let (quality, third) = if at(3) > at(4) {
        (ChordQuality::Minor, 3)
    } else {
        (ChordQuality::Major, 4)
    };
    TriadMatch {
        root,
        quality,
        score: triad_score(chroma, root, third, 7, penalty),
        weakest_member: at(0).min(at(third as i32)).min(at(7)),
    }
}
