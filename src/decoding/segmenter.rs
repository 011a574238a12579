//! Bass-anchored segmentation
//!
//! An independent second decoder. Boundaries are only placed near beat-grid
//! positions, where chroma flux is high or the stable bass moves. Each segment then
//! picks its chord tier by tier from its energy-weighted mean chroma:
//!
//! 0. diatonic triads whose root is the segment bass
//! 1. diatonic triads that contain the bass as third or fifth (slash chords)
//! 2. secondary dominants and borrowed chords
//! 3. any major or minor triad, third detected from the chroma
//!
//! The first tier whose best candidate clears that tier's floor wins. Short weak
//! segments are merged into a neighbor and re-scored.

use std::ops::Range;

use crate::analysis::result::Key;
use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::{SegmenterConfig, TheoryConfig};
use crate::features::chroma::triad::{best_triad_at, quality_score};
use crate::features::chroma::Chroma;
use crate::features::onset::novelty::chroma_flux;
use crate::features::onset::Texture;
use crate::features::period::BeatGrid;
use crate::features::{percentile, FeatureSet};
use crate::theory::chord::{Chord, ChordCandidate, Provenance};
use crate::theory::pitch::{transpose, PitchClass};
use crate::theory::scale::{borrowed_chords, classify, diatonic_triads, secondary_dominants};

/// A frame range with its chosen chord, if any cleared a floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First frame
    pub start_frame: usize,
    /// One past the last frame
    pub end_frame: usize,
    /// Winning candidate
    pub candidate: Option<ChordCandidate>,
}

impl Segment {
    /// Length in frames
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    /// True for a zero-length segment
    pub fn is_empty(&self) -> bool {
        self.end_frame <= self.start_frame
    }

    /// Score of the winning candidate (0 when none)
    pub fn score(&self) -> f32 {
        self.candidate.map(|c| c.score).unwrap_or(0.0)
    }
}

/// Score a chord's triad against a chroma vector, or `None` when a chord tone is
/// missing
fn score_chord(chroma: &Chroma, chord: &Chord, config: &SegmenterConfig) -> Option<f32> {
    let triad = chord.quality.triad();
    let present = triad
        .intervals()
        .iter()
        .take(3)
        .all(|&i| chroma[transpose(chord.root, i as i32) as usize] >= config.member_floor);
    if !present {
        return None;
    }
    Some(quality_score(chroma, chord.root, chord.quality, config.wrong_third_penalty))
}

/// Best candidate of one tier
fn best_of<I>(candidates: I, chroma: &Chroma, config: &SegmenterConfig) -> Option<ChordCandidate>
where
    I: IntoIterator<Item = ChordCandidate>,
{
    candidates
        .into_iter()
        .filter_map(|mut c| {
            c.score = score_chord(chroma, &c.chord, config)?;
            Some(c)
        })
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
}

/// Choose a segment's chord from its mean chroma and stable bass
///
/// # Arguments
///
/// * `chroma` - Energy-weighted mean chroma of the segment
/// * `bass` - Dominant stable bass of the segment
/// * `key` - Working key
///
/// # Returns
///
/// The winner of the first tier whose best candidate reaches the tier's floor, or
/// `None` when no tier does
pub fn choose_chord(
    chroma: &Chroma,
    bass: Option<PitchClass>,
    key: &Key,
    theory: &TheoryConfig,
    config: &SegmenterConfig,
) -> Option<ChordCandidate> {
    let diatonic = diatonic_triads(key);
    let floors = config.tier_floors;

    let tier0 = diatonic
        .iter()
        .filter(|c| bass.map_or(true, |b| c.root == b))
        .map(|&c| ChordCandidate::new(c, Provenance::Diatonic));
    if let Some(c) = best_of(tier0, chroma, config).filter(|c| c.score >= floors[0]) {
        return Some(c);
    }

    if let Some(b) = bass {
        let tier1 = diatonic
            .iter()
            .filter(|c| c.root != b && (c.third() == Some(b) || c.fifth() == b))
            .map(|&c| ChordCandidate::new(c.with_bass(Some(b)), Provenance::Diatonic));
        if let Some(c) = best_of(tier1, chroma, config).filter(|c| c.score >= floors[1]) {
            return Some(c);
        }
    }

    let tier2 = secondary_dominants(key)
        .into_iter()
        .map(|c| ChordCandidate::new(c, Provenance::SecondaryDominant))
        .chain(
            borrowed_chords(key, theory)
                .into_iter()
                .map(|c| ChordCandidate::new(c, Provenance::Borrowed)),
        )
        .map(|c| ChordCandidate {
            chord: c.chord.with_bass(bass.filter(|&b| c.chord.contains(b))),
            ..c
        });
    if let Some(c) = best_of(tier2, chroma, config).filter(|c| c.score >= floors[2]) {
        return Some(c);
    }

    (0..12u8)
        .map(|root| best_triad_at(chroma, root, config.wrong_third_penalty))
        .filter(|m| m.weakest_member >= config.member_floor && m.score >= floors[3])
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
        .map(|m| {
            let chord = Chord::new(m.root, m.quality);
            let chord = chord.with_bass(bass.filter(|&b| chord.contains(b)));
            ChordCandidate {
                chord,
                provenance: classify(key, &chord, theory),
                score: m.score,
            }
        })
}

/// Bass-anchored segmenter over one feature set and key
#[derive(Debug, Clone)]
pub struct BassAnchoredSegmenter<'a> {
    features: &'a FeatureSet,
    key: Key,
    theory: &'a TheoryConfig,
    config: &'a SegmenterConfig,
}

impl<'a> BassAnchoredSegmenter<'a> {
    /// Create a segmenter for `key`
    pub fn new(features: &'a FeatureSet, key: &Key, theory: &'a TheoryConfig, config: &'a SegmenterConfig) -> Self {
        Self {
            features,
            key: *key,
            theory,
            config,
        }
    }

    /// Candidate for a frame range
    pub fn score_range(&self, range: Range<usize>) -> Option<ChordCandidate> {
        let chroma = self.features.mean_chroma(range.clone());
        let bass = self.features.dominant_bass(range, self.config.bass_share);
        choose_chord(&chroma, bass, &self.key, self.theory, self.config)
    }

    /// Boundary frames near beats, strictly inside `(start_frame, len)`
    pub fn propose_boundaries(&self, start_frame: usize, grid: &BeatGrid, texture: Texture) -> Vec<usize> {
        let n = self.features.len();
        if start_frame + 1 >= n {
            return Vec::new();
        }
        let flux = chroma_flux(self.features, self.config.flux_lag_frames);
        let mut sorted = flux[start_frame..].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mut threshold = percentile(&sorted, self.config.flux_percentile).max(self.config.min_flux);
        if texture.is_percussive() {
            threshold *= self.config.percussive_flux_scale;
        }

        let fps = self.features.frames_per_second();
        let half_beat = ((grid.period * fps) / 2.0).round().max(1.0) as usize;
        let tolerance = self.config.beat_tolerance * grid.period;
        let start_time = self.features.frame_time(start_frame);

        let mut boundaries = Vec::new();
        for beat in grid.beats_between(start_time, self.features.duration()) {
            let lo = self.features.frame_at(beat - tolerance).max(start_frame + 1);
            let hi = (self.features.frame_at(beat + tolerance) + 1).min(n);
            if lo >= hi {
                continue;
            }
            let beat_frame = (beat * fps).round() as usize;
            let peak = (lo..hi)
                .max_by(|&a, &b| {
                    flux[a]
                        .partial_cmp(&flux[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| beat_frame.abs_diff(b).cmp(&beat_frame.abs_diff(a)))
                })
                .unwrap_or(lo);

            if flux[peak] >= threshold {
                boundaries.push(peak);
                continue;
            }

            let share = 0.5;
            let before = self.features.dominant_bass(lo.saturating_sub(half_beat)..lo, share);
            let after = self.features.dominant_bass(hi..hi + half_beat, share);
            if let (Some(b), Some(a)) = (before, after) {
                if a != b {
                    let frames = self.features.frames();
                    let at = (lo..hi).find(|&i| frames[i].bass == Some(a)).unwrap_or(peak);
                    boundaries.push(at);
                }
            }
        }
        boundaries.sort_unstable();
        boundaries.dedup();
        boundaries
    }

    /// Segments with chosen chords after short-segment merging
    pub fn segments(&self, start_frame: usize, grid: &BeatGrid, texture: Texture) -> Vec<Segment> {
        let n = self.features.len();
        if start_frame >= n {
            return Vec::new();
        }
        let mut edges = vec![start_frame];
        edges.extend(self.propose_boundaries(start_frame, grid, texture));
        edges.push(n);

        let mut segments: Vec<Segment> = edges
            .windows(2)
            .map(|w| Segment {
                start_frame: w[0],
                end_frame: w[1],
                candidate: self.score_range(w[0]..w[1]),
            })
            .collect();

        let min_seconds = self
            .config
            .min_segment_seconds
            .max(self.config.min_segment_beats * grid.period);
        let min_frames = (min_seconds * self.features.frames_per_second()).round() as usize;

        while segments.len() > 1 {
            let Some(idx) = segments
                .iter()
                .position(|s| s.len() < min_frames && s.score() < self.config.strong_score)
            else {
                break;
            };
            let (keep, drop) = if idx == 0 { (0, 1) } else { (idx - 1, idx) };
            let start = segments[keep].start_frame;
            let end = segments[drop].end_frame;
            segments[keep] = Segment {
                start_frame: start,
                end_frame: end,
                candidate: self.score_range(start..end),
            };
            segments.remove(drop);
        }
        segments
    }

    /// Segment frames `start_frame..` into a chord timeline
    pub fn segment(&self, start_frame: usize, grid: &BeatGrid, texture: Texture) -> Timeline {
        let start = self.features.frame_time(start_frame).min(self.features.duration());
        let segments = self.segments(start_frame, grid, texture);
        let events: Vec<ChordEvent> = segments
            .iter()
            .filter_map(|s| {
                let c = s.candidate?;
                Some(ChordEvent::new(
                    self.features.frame_time(s.start_frame),
                    c.chord,
                    c.score,
                    c.provenance,
                ))
            })
            .collect();
        log::debug!(
            "Bass-anchored segmentation: {} segments, {} with a chord",
            segments.len(),
            events.len()
        );
        Timeline::from_segments(start, self.features.duration(), events)
    }
}

/// Segment a clip against `key` with a fresh segmenter
pub fn segment_bass_anchored(
    features: &FeatureSet,
    start_frame: usize,
    key: &Key,
    grid: &BeatGrid,
    texture: Texture,
    theory: &TheoryConfig,
    config: &SegmenterConfig,
) -> Timeline {
    BassAnchoredSegmenter::new(features, key, theory, config).segment(start_frame, grid, texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::theory::chord::ChordQuality;

    const SR: u32 = 22050;
    const HOP: usize = 441;

    fn chroma_of(pcs: &[(usize, f32)]) -> Chroma {
        let mut c = [0.0f32; 12];
        for &(pc, v) in pcs {
            c[pc] = v;
        }
        c
    }

    fn block(root: usize, third: usize, fifth: usize, bass: Option<u8>, n: usize) -> Vec<FeatureVector> {
        let chroma = chroma_of(&[(root, 0.4), (third, 0.3), (fifth, 0.3)]);
        vec![FeatureVector { chroma, bass, energy: 1.0 }; n]
    }

    fn set(frames: Vec<FeatureVector>) -> FeatureSet {
        let duration = frames.len() as f32 * HOP as f32 / SR as f32;
        FeatureSet::new(frames, SR, HOP, duration)
    }

    #[test]
    fn test_tier_order() {
        let key = Key::new(0, false, 0.9);
        let theory = TheoryConfig::default();
        let config = SegmenterConfig::default();

        let c_major = chroma_of(&[(0, 0.4), (4, 0.3), (7, 0.3)]);
        let root = choose_chord(&c_major, Some(0), &key, &theory, &config).unwrap();
        assert_eq!(root.chord.label(), "C");

        // Em is missing its fifth, so the slash reading wins
        let inverted = choose_chord(&c_major, Some(4), &key, &theory, &config).unwrap();
        assert_eq!(inverted.chord.label(), "C/E");

        let d_major = chroma_of(&[(2, 0.4), (6, 0.3), (9, 0.3)]);
        let secondary = choose_chord(&d_major, Some(2), &key, &theory, &config).unwrap();
        assert_eq!(secondary.chord.label(), "D");
        assert_eq!(secondary.provenance, Provenance::SecondaryDominant);

        let c_sharp = chroma_of(&[(1, 0.4), (5, 0.3), (8, 0.3)]);
        let chromatic = choose_chord(&c_sharp, None, &key, &theory, &config).unwrap();
        assert_eq!(chromatic.chord.root, 1);
        assert_eq!(chromatic.chord.quality, ChordQuality::Major);
        assert_eq!(chromatic.provenance, Provenance::Chromatic);

        let noise = [1.0 / 12.0; 12];
        assert!(choose_chord(&noise, None, &key, &theory, &config).is_none());
    }

    #[test]
    fn test_segments_follow_beats() {
        let mut frames = block(0, 4, 7, Some(0), 50);
        frames.extend(block(5, 9, 0, Some(5), 50));
        frames.extend(block(7, 11, 2, Some(7), 50));
        frames.extend(block(0, 4, 7, Some(0), 50));
        let features = set(frames);
        let key = Key::new(0, false, 0.9);
        let grid = BeatGrid::new(60.0, 0.0);
        let theory = TheoryConfig::default();
        let config = SegmenterConfig::default();

        let timeline = segment_bass_anchored(&features, 0, &key, &grid, Texture::Sustained, &theory, &config);
        assert_eq!(timeline.roots(), vec![0, 5, 7, 0]);
        assert!(timeline.is_partition());
        for (event, expected) in timeline.events().iter().zip([0.0f32, 1.0, 2.0, 3.0]) {
            assert!((event.start_time - expected).abs() <= 0.06, "{} vs {}", event.start_time, expected);
        }
    }

    #[test]
    fn test_bass_change_without_flux_splits() {
        // Same upper chroma, bass moves from C to A on the beat
        let mut frames = block(0, 4, 7, Some(0), 50);
        let mut am = block(0, 4, 7, Some(9), 50);
        for f in am.iter_mut() {
            f.chroma = chroma_of(&[(0, 0.4), (4, 0.3), (7, 0.25), (9, 0.05)]);
        }
        frames.extend(am);
        let features = set(frames);
        let segmenter_config = SegmenterConfig::default();
        let theory = TheoryConfig::default();
        let key = Key::new(0, false, 0.9);
        let segmenter = BassAnchoredSegmenter::new(&features, &key, &theory, &segmenter_config);

        let boundaries = segmenter.propose_boundaries(0, &BeatGrid::new(60.0, 0.0), Texture::Sustained);
        assert_eq!(boundaries, vec![50]);
    }

    #[test]
    fn test_short_weak_segment_merges_into_previous() {
        let mut frames = block(0, 4, 7, Some(0), 50);
        // One beat of smeared chroma that matches nothing well
        frames.extend(vec![
            FeatureVector {
                chroma: [1.0 / 12.0; 12],
                bass: None,
                energy: 1.0
            };
            10
        ]);
        frames.extend(block(7, 11, 2, Some(7), 50));
        let features = set(frames);
        let key = Key::new(0, false, 0.9);
        let theory = TheoryConfig::default();
        let config = SegmenterConfig::default();
        let segmenter = BassAnchoredSegmenter::new(&features, &key, &theory, &config);
        let grid = BeatGrid::new(300.0, 0.0);

        assert_eq!(segmenter.propose_boundaries(0, &grid, Texture::Sustained), vec![50, 60]);
        let segments = segmenter.segments(0, &grid, Texture::Sustained);
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_frame, segments[0].end_frame), (0, 60));
        assert_eq!(segments[0].candidate.map(|c| c.chord.root), Some(0));

        let timeline = segmenter.segment(0, &grid, Texture::Sustained);
        assert_eq!(timeline.roots(), vec![0, 7]);
    }
}
