//! Tonal-center evidence sources
//!
//! Each source inspects the feature set independently and proposes one pitch class.
//! The detector weighs and sums the proposals.

use super::templates::{KeyTemplates, ProfileMatch};
use crate::config::KeyConfig;
use crate::features::chroma::normalization::strongest_bin;
use crate::features::chroma::triad::{best_triad_at, TriadMatch};
use crate::features::chroma::Chroma;
use crate::features::FeatureSet;
use crate::theory::pitch::{interval, transpose, PitchClass};

/// Wrong-third penalty used when probing for the first strong chord
const FIRST_CHORD_WRONG_THIRD_PENALTY: f32 = 1.0;

/// Bass histogram proposal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BassVote {
    /// Winning bass pitch class
    pub root: PitchClass,
    /// `1 − runner_up / best` of the weighted histogram
    pub confidence: f32,
    /// Weighted histogram including cadence bonuses
    pub histogram: [f32; 12],
}

/// Bass histogram vote with edge-window and cadence weighting
///
/// Frames before `start_frame` are ignored. Frames inside the opening and closing
/// `edge_window_seconds` count `edge_weight` times. Every bass motion by a perfect
/// fourth or fifth adds `cadence_weight · mean` to its target, and every
/// `ii→V→I` or `IV→V→I` bass pattern adds `three_step_cadence_weight · mean`.
pub fn bass_histogram_vote(
    features: &FeatureSet,
    start_frame: usize,
    config: &KeyConfig,
) -> Option<BassVote> {
    let frames = features.frames();
    if start_frame >= frames.len() {
        return None;
    }
    let start_time = features.frame_time(start_frame);
    let end_time = features.duration();

    let mut histogram = [0.0f32; 12];
    let mut runs: Vec<PitchClass> = Vec::new();
    for (i, frame) in frames.iter().enumerate().skip(start_frame) {
        let Some(pc) = frame.bass else { continue };
        let t = features.frame_time(i);
        let edge = t - start_time < config.edge_window_seconds
            || end_time - t < config.edge_window_seconds;
        let weight = if edge { config.edge_weight } else { 1.0 };
        histogram[pc as usize] += frame.energy * weight;
        if runs.last() != Some(&pc) {
            runs.push(pc);
        }
    }

    let total: f32 = histogram.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mean = total / 12.0;

    for pair in runs.windows(2) {
        let step = interval(pair[0], pair[1]);
        if step == 5 || step == 7 {
            histogram[pair[1] as usize] += config.cadence_weight * mean;
        }
    }
    for triple in runs.windows(3) {
        let target = triple[2];
        let dominant = transpose(target, 7);
        let from_ii = transpose(target, 2);
        let from_iv = transpose(target, 5);
        if triple[1] == dominant && (triple[0] == from_ii || triple[0] == from_iv) {
            histogram[target as usize] += config.three_step_cadence_weight * mean;
        }
    }

    let (root, best) = argmax(&histogram)?;
    let runner_up = histogram
        .iter()
        .enumerate()
        .filter(|&(pc, _)| pc != root as usize)
        .map(|(_, &v)| v)
        .fold(0.0f32, f32::max);
    let confidence = if best > 0.0 {
        (1.0 - runner_up / best).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(BassVote {
        root,
        confidence,
        histogram,
    })
}

/// Best of the 24 rotated key profiles against the global chroma
pub fn profile_vote(global_chroma: &Chroma, templates: &KeyTemplates) -> Option<ProfileMatch> {
    templates.best_match(global_chroma)
}

/// First clean triad in the window after the music start
///
/// Windows of `first_chord_frames` frames slide one frame at a time through the
/// first `first_chord_window_seconds`. The first window whose best triad clears
/// `first_chord_floor` with every member above `first_chord_min_component` wins.
pub fn first_chord_vote(
    features: &FeatureSet,
    start_frame: usize,
    config: &KeyConfig,
) -> Option<TriadMatch> {
    let span = config.first_chord_frames.max(1);
    let window_end = features
        .frame_at(features.frame_time(start_frame) + config.first_chord_window_seconds)
        .min(features.len());
    let mut first = start_frame;
    while first + span <= window_end {
        let chroma = features.mean_chroma(first..first + span);
        let best = (0..12u8)
            .map(|root| best_triad_at(&chroma, root, FIRST_CHORD_WRONG_THIRD_PENALTY))
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(m) = best {
            if m.score >= config.first_chord_floor
                && m.weakest_member >= config.first_chord_min_component
            {
                return Some(m);
            }
        }
        first += 1;
    }
    None
}

/// Most frequent strongest chroma bin over frames at or above the 70th energy
/// percentile
pub fn dominant_pitch_vote(features: &FeatureSet, start_frame: usize) -> Option<PitchClass> {
    let threshold = features.percentiles().p70;
    let mut counts = [0.0f32; 12];
    for frame in features.frames().iter().skip(start_frame) {
        if frame.energy <= 0.0 || frame.energy < threshold {
            continue;
        }
        if let Some(pc) = strongest_bin(&frame.chroma) {
            counts[pc as usize] += 1.0;
        }
    }
    argmax(&counts).map(|(pc, _)| pc)
}

/// Index and value of the largest positive bin (lowest index on ties)
pub fn argmax(values: &[f32; 12]) -> Option<(PitchClass, f32)> {
    let mut best: Option<(PitchClass, f32)> = None;
    for (pc, &v) in values.iter().enumerate() {
        if v > 0.0 && best.map(|(_, b)| v > b).unwrap_or(true) {
            best = Some((pc as PitchClass, v));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn frame(pcs: &[usize], bass: Option<PitchClass>) -> FeatureVector {
        let mut chroma = [0.0f32; 12];
        for &pc in pcs {
            chroma[pc] = 1.0 / pcs.len() as f32;
        }
        FeatureVector {
            chroma,
            bass,
            energy: 1.0,
        }
    }

    /// One second per chord at about 54 frames per second
    fn progression(chords: &[(&[usize], PitchClass)]) -> FeatureSet {
        let mut frames = Vec::new();
        for &(pcs, bass) in chords {
            frames.extend(std::iter::repeat(frame(pcs, Some(bass))).take(54));
        }
        let duration = frames.len() as f32 * 410.0 / 22050.0;
        FeatureSet::new(frames, 22050, 410, duration)
    }

    #[test]
    fn test_bass_vote_prefers_cadence_target() {
        // Bass F G C F G C ... with equal time per pitch class: the V→I and
        // IV→V→I bonuses tip the histogram to C.
        let c: &[usize] = &[0, 4, 7];
        let f: &[usize] = &[5, 9, 0];
        let g: &[usize] = &[7, 11, 2];
        let set = progression(&[(f, 5), (g, 7), (c, 0), (f, 5), (g, 7), (c, 0), (f, 5), (g, 7), (c, 0)]);
        let mut config = KeyConfig::default();
        config.edge_weight = 1.0;
        let vote = bass_histogram_vote(&set, 0, &config).unwrap();
        assert_eq!(vote.root, 0);
        assert!(vote.confidence > 0.0);
    }

    #[test]
    fn test_bass_vote_without_bass() {
        let set = FeatureSet::new(vec![frame(&[0, 4, 7], None); 100], 22050, 410, 1.86);
        assert!(bass_histogram_vote(&set, 0, &KeyConfig::default()).is_none());
    }

    #[test]
    fn test_first_chord_vote() {
        let am: &[usize] = &[9, 0, 4];
        let set = progression(&[(am, 9), (&[5, 9, 0], 5)]);
        let m = first_chord_vote(&set, 0, &KeyConfig::default()).unwrap();
        assert_eq!(m.root, 9);
        assert_eq!(m.quality, crate::theory::chord::ChordQuality::Minor);
    }

    #[test]
    fn test_dominant_pitch_vote() {
        let mut frames = vec![frame(&[7], None); 30];
        frames.extend(vec![frame(&[2], None); 10]);
        let set = FeatureSet::new(frames, 22050, 410, 0.75);
        assert_eq!(dominant_pitch_vote(&set, 0), Some(7));
    }
}
