//! Tonal-center detection by weighted evidence voting
//!
//! Four independent sources each propose a tonic:
//! 1. Bass histogram with edge and cadence weighting
//! 2. Krumhansl-Kessler profile correlation of the global chroma
//! 3. The first clean triad after the music start
//! 4. The dominant strongest-bin pitch class of loud frames
//!
//! Proposals are summed into a 12-bin tally. The winner may be reassigned by the
//! fourth-above guard (a song opening on I and spending long stretches on IV tends
//! to elect IV), and the mode is decided separately from the chroma around the
//! chosen tonic.

use super::mode::detect_mode;
use super::templates::KeyTemplates;
use super::votes::{
    argmax, bass_histogram_vote, dominant_pitch_vote, first_chord_vote, profile_vote,
};
use super::KeyEstimate;
use crate::analysis::diagnostics::{Vote, VoteSource};
use crate::analysis::result::Key;
use crate::config::KeyConfig;
use crate::error::AnalysisError;
use crate::features::FeatureSet;
use crate::theory::pitch::{transpose, PitchClass};

/// Detect the global key of a clip
///
/// # Arguments
///
/// * `features` - Extracted features of the whole clip
/// * `start_frame` - First frame after the music start
/// * `config` - Voting weights and thresholds
///
/// # Returns
///
/// The chosen key with every cast vote. A clip with no usable evidence yields C
/// major with zero confidence.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` when the feature set is empty
pub fn detect_key(
    features: &FeatureSet,
    start_frame: usize,
    config: &KeyConfig,
) -> Result<KeyEstimate, AnalysisError> {
    if features.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty feature set".to_string()));
    }
    log::debug!(
        "Detecting key from {} frames (start frame {})",
        features.len(),
        start_frame
    );

    let templates = KeyTemplates::new();
    let mut votes: Vec<Vote> = Vec::with_capacity(4);

    let bass = bass_histogram_vote(features, start_frame, config);
    if let Some(b) = bass {
        votes.push(Vote {
            source: VoteSource::BassHistogram,
            root: b.root,
            weight: config.bass_vote_weight * (0.5 + 0.5 * b.confidence),
        });
    }

    let profile = profile_vote(features.global_chroma(), &templates);
    if let Some(p) = profile {
        votes.push(Vote {
            source: VoteSource::KeyProfile,
            root: p.root,
            weight: config.profile_vote_weight,
        });
    }

    let first = first_chord_vote(features, start_frame, config);
    if let Some(f) = first {
        let bass_disagrees = bass
            .map(|b| b.confidence > config.bass_confident && b.root != f.root)
            .unwrap_or(false);
        let discount = if bass_disagrees {
            config.first_chord_disagreement_discount
        } else {
            1.0
        };
        votes.push(Vote {
            source: VoteSource::FirstChord,
            root: f.root,
            weight: config.first_chord_vote_weight * discount,
        });
    }

    if let Some(root) = dominant_pitch_vote(features, start_frame) {
        votes.push(Vote {
            source: VoteSource::DominantPitch,
            root,
            weight: config.dominant_vote_weight,
        });
    }

    let mut tallies = [0.0f32; 12];
    for vote in &votes {
        tallies[vote.root as usize % 12] += vote.weight;
    }
    let total: f32 = tallies.iter().sum();

    let Some((winner, _)) = argmax(&tallies) else {
        log::warn!("No tonal evidence, defaulting to C major with zero confidence");
        return Ok(KeyEstimate {
            key: Key::new(0, false, 0.0),
            tallies,
            votes,
            first_chord_root: None,
            fourth_guard: None,
        });
    };

    let mut tonic = winner;
    let mut fourth_guard = None;
    if let Some(f) = first {
        if let Some(guarded) = apply_fourth_guard(&tallies, winner, f.root, config.fourth_guard_ratio) {
            log::debug!(
                "Fourth-above guard: winner {} is IV of first chord {}, reassigning tonic",
                winner,
                guarded
            );
            tonic = guarded;
            fourth_guard = Some((winner, guarded));
        }
    }

    let confidence = if total > 0.0 {
        tallies[tonic as usize] / total
    } else {
        0.0
    };
    let minor = detect_mode(features.global_chroma(), tonic, &templates, config);
    let key = Key::new(tonic, minor, confidence);

    log::debug!(
        "Key: {} (confidence {:.3}) from {} votes, tallies {:?}",
        key.name(),
        key.confidence,
        votes.len(),
        tallies
    );

    Ok(KeyEstimate {
        key,
        tallies,
        votes,
        first_chord_root: first.map(|f| f.root),
        fourth_guard,
    })
}

/// Reassign the tonic to the first-chord root when the vote winner sits a perfect
/// fourth above it and the first-chord root holds at least `ratio` of the
/// winner's votes
pub fn apply_fourth_guard(
    tallies: &[f32; 12],
    winner: PitchClass,
    first_root: PitchClass,
    ratio: f32,
) -> Option<PitchClass> {
    let winner_votes = tallies[winner as usize % 12];
    if winner == transpose(first_root, 5) && tallies[first_root as usize % 12] >= ratio * winner_votes {
        Some(first_root)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    /// Root-heavy chord frame so the strongest bin is the root
    fn frame(pcs: &[usize], bass: Option<PitchClass>) -> FeatureVector {
        let mut chroma = [0.0f32; 12];
        chroma[pcs[0]] = 0.4;
        for &pc in &pcs[1..] {
            chroma[pc] = 0.6 / (pcs.len() - 1) as f32;
        }
        FeatureVector {
            chroma,
            bass,
            energy: 1.0,
        }
    }

    fn set_of(chords: &[(&[usize], PitchClass, usize)]) -> FeatureSet {
        let mut frames = Vec::new();
        for &(pcs, bass, n) in chords {
            frames.extend(std::iter::repeat(frame(pcs, Some(bass))).take(n));
        }
        let duration = frames.len() as f32 * 410.0 / 22050.0;
        FeatureSet::new(frames, 22050, 410, duration)
    }

    #[test]
    fn test_c_major_progression() {
        let c: &[usize] = &[0, 4, 7];
        let f: &[usize] = &[5, 9, 0];
        let g: &[usize] = &[7, 11, 2];
        let set = set_of(&[(c, 0, 54), (f, 5, 54), (g, 7, 54), (c, 0, 54)].repeat(3));
        let estimate = detect_key(&set, 0, &KeyConfig::default()).unwrap();
        assert_eq!(estimate.key.root, 0);
        assert!(!estimate.key.minor);
        assert!(estimate.key.confidence >= 0.6, "confidence {}", estimate.key.confidence);
        assert_eq!(estimate.first_chord_root, Some(0));
        assert!(estimate.fourth_guard.is_none());
        assert_eq!(estimate.votes.len(), 4);
    }

    #[test]
    fn test_opening_tonic_survives_long_subdominant() {
        let c: &[usize] = &[0, 4, 7];
        let f: &[usize] = &[5, 9, 0];
        let set = set_of(&[(c, 0, 200), (f, 5, 300)]);
        let estimate = detect_key(&set, 0, &KeyConfig::default()).unwrap();
        assert_eq!(estimate.key.root, 0);
    }

    #[test]
    fn test_fourth_guard() {
        let mut tallies = [0.0f32; 12];
        tallies[5] = 3.0;
        tallies[0] = 2.0;
        assert_eq!(apply_fourth_guard(&tallies, 5, 0, 0.6), Some(0));
        tallies[0] = 1.0;
        assert_eq!(apply_fourth_guard(&tallies, 5, 0, 0.6), None);
        // A fifth above is not guarded
        tallies[7] = 3.0;
        tallies[0] = 2.5;
        assert_eq!(apply_fourth_guard(&tallies, 7, 0, 0.6), None);
    }

    #[test]
    fn test_silent_clip() {
        let set = FeatureSet::new(vec![FeatureVector::default(); 50], 22050, 410, 0.93);
        let estimate = detect_key(&set, 0, &KeyConfig::default()).unwrap();
        assert_eq!(estimate.key.confidence, 0.0);
        assert!(estimate.votes.is_empty());
    }
}
