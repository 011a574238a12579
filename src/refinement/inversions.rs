//! Inversion and slash-chord detection

use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::RefineConfig;
use crate::features::chroma::Chroma;
use crate::features::FeatureSet;
use crate::theory::chord::Chord;
use crate::theory::pitch::{interval, PitchClass};

/// Bass note to print under `chord`, given the event's dominant stable bass
///
/// A chord tone in the bass is accepted when its chroma is prominent enough; a few
/// non-chord intervals (default: the minor seventh) are tolerated as passing basses.
/// The root clears any slash.
pub fn slash_bass(
    chord: &Chord,
    bass: Option<PitchClass>,
    chroma: &Chroma,
    config: &RefineConfig,
) -> Option<PitchClass> {
    let b = bass?;
    if b == chord.root {
        return None;
    }
    let tone = chord.contains(b) && chroma[b as usize] >= config.inversion_prominence;
    let tolerated = config.tolerated_bass_intervals.contains(&interval(chord.root, b));
    if tone || tolerated {
        Some(b)
    } else {
        chord.bass
    }
}

/// Attach slash basses where the stable bass sits under a non-root tone
pub fn detect_inversions(timeline: &Timeline, features: &FeatureSet, config: &RefineConfig) -> Timeline {
    timeline.map_events(|i, event| {
        let range = timeline.frame_range(i, features);
        let chroma = features.mean_chroma(range.clone());
        let bass = features.dominant_bass(range, config.inversion_bass_share);
        if bass.is_none() {
            return *event;
        }
        ChordEvent {
            chord: event.chord.with_bass(slash_bass(&event.chord, bass, &chroma, config)),
            ..*event
        }
    })
}
