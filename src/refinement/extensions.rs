//! Extension decoration
//!
//! Plain major and minor triads pick up a seventh, sixth, added ninth or a
//! suspension when the event's mean chroma carries the extra degree strongly
//! enough, measured against the root's own chroma. A triad whose perfect fifth is
//! missing while the raised (major) or lowered (minor) fifth is strong becomes
//! augmented or diminished.

use crate::analysis::result::Key;
use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::{RefineConfig, TheoryConfig};
use crate::features::chroma::Chroma;
use crate::features::FeatureSet;
use crate::theory::chord::{Chord, ChordQuality};
use crate::theory::pitch::transpose;
use crate::theory::scale::classify;

/// Candidate extensions per triad quality, as (interval, quality)
fn extensions_of(quality: ChordQuality) -> &'static [(u8, ChordQuality)] {
    match quality {
        ChordQuality::Major => &[
            (10, ChordQuality::Dominant7),
            (11, ChordQuality::Major7),
            (9, ChordQuality::Six),
            (2, ChordQuality::Nine),
        ],
        ChordQuality::Minor => &[(10, ChordQuality::Minor7)],
        _ => &[],
    }
}

/// Decorated quality for a chord given its mean chroma, if any extension applies
pub fn extend_chord(chord: &Chord, chroma: &Chroma, config: &RefineConfig) -> Option<ChordQuality> {
    if !chord.quality.is_plain_triad() {
        return None;
    }
    let at = |i: u8| chroma[transpose(chord.root, i as i32) as usize];
    let root = at(0);
    if root <= 0.0 {
        return None;
    }
    let strong = |v: f32| v >= config.extension_floor && v >= config.extension_ratio * root;

    if at(3) < config.sus_third_max && at(4) < config.sus_third_max {
        let (second, fourth) = (at(2), at(5));
        if strong(fourth) && fourth >= second {
            return Some(ChordQuality::Sus4);
        }
        if strong(second) {
            return Some(ChordQuality::Sus2);
        }
    }

    if at(7) < config.altered_fifth_max {
        match chord.quality {
            ChordQuality::Major if strong(at(8)) => return Some(ChordQuality::Augmented),
            ChordQuality::Minor if strong(at(6)) => return Some(ChordQuality::Diminished),
            _ => {}
        }
    }

    extensions_of(chord.quality)
        .iter()
        .filter(|(i, _)| strong(at(*i)))
        .max_by(|a, b| at(a.0).partial_cmp(&at(b.0)).unwrap_or(std::cmp::Ordering::Equal))
        .map(|&(_, quality)| quality)
}

/// Decorate every plain triad in the timeline
pub fn decorate_extensions(
    timeline: &Timeline,
    features: &FeatureSet,
    key: &Key,
    theory: &TheoryConfig,
    config: &RefineConfig,
) -> Timeline {
    timeline.map_events(|i, event| {
        let chroma = features.mean_chroma(timeline.frame_range(i, features));
        match extend_chord(&event.chord, &chroma, config) {
            Some(quality) => {
                let chord = event.chord.with_quality(quality);
                ChordEvent {
                    chord,
                    provenance: classify(key, &chord, theory),
                    ..*event
                }
            }
            None => *event,
        }
    })
}
