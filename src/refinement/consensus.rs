//! Consensus between the two decoders
//!
//! Both timelines are cut at the union of their boundaries. In every piece:
//! - the same root on both sides is accepted with an agreement bonus, taking the
//!   quality of the more confident side and re-classifying against the key
//! - different roots go to the lower theory category, ties to the higher confidence
//! - a piece covered by only one decoder keeps that decoder's chord
//!
//! The merge never invents a root: each output event names a root one of the
//! decoders proposed over the same span.

use crate::analysis::result::Key;
use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::{RefineConfig, TheoryConfig};
use crate::theory::scale::classify;

const BOUNDARY_EPSILON: f32 = 1e-4;

/// Reconcile two events covering the same span
fn reconcile(
    a: &ChordEvent,
    b: &ChordEvent,
    key: &Key,
    theory: &TheoryConfig,
    config: &RefineConfig,
) -> ChordEvent {
    let (hi, lo) = if a.confidence >= b.confidence { (a, b) } else { (b, a) };
    if a.chord.root == b.chord.root {
        let chord = hi.chord;
        return ChordEvent::new(
            hi.start_time,
            chord,
            hi.confidence.max(lo.confidence) + config.agreement_bonus,
            classify(key, &chord, theory),
        );
    }

    let winner = match a.provenance.rank().cmp(&b.provenance.rank()) {
        std::cmp::Ordering::Less => a,
        std::cmp::Ordering::Greater => b,
        std::cmp::Ordering::Equal => hi,
    };
    ChordEvent {
        confidence: winner.confidence * config.disagreement_factor,
        ..*winner
    }
}

/// Merge the Viterbi and segmenter timelines
///
/// # Arguments
///
/// * `a` - First decoder's timeline
/// * `b` - Second decoder's timeline over the same span
/// * `key` - Working key used to re-classify agreeing chords
///
/// # Returns
///
/// A timeline over `a`'s span
pub fn merge_timelines(
    a: &Timeline,
    b: &Timeline,
    key: &Key,
    theory: &TheoryConfig,
    config: &RefineConfig,
) -> Timeline {
    let mut cuts: Vec<f32> = a.boundaries();
    cuts.extend(b.boundaries());
    cuts.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    cuts.dedup_by(|x, y| (*x - *y).abs() < BOUNDARY_EPSILON);

    let mut agreed = 0usize;
    let events: Vec<ChordEvent> = cuts
        .iter()
        .filter_map(|&t| {
            let event = match (a.event_at(t), b.event_at(t)) {
                (Some(x), Some(y)) => {
                    if x.chord.root == y.chord.root {
                        agreed += 1;
                    }
                    reconcile(x, y, key, theory, config)
                }
                (Some(x), None) => *x,
                (None, Some(y)) => *y,
                (None, None) => return None,
            };
            Some(ChordEvent {
                start_time: t,
                ..event
            })
        })
        .collect();

    log::debug!(
        "Consensus: {} + {} events, {} pieces, {} agreeing",
        a.len(),
        b.len(),
        events.len(),
        agreed
    );
    Timeline::from_segments(a.start(), a.end(), events)
}
