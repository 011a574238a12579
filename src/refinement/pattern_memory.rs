//! Repeating root-pattern memory
//!
//! Root n-grams that recur often enough are remembered. A low-confidence event that
//! is the single mismatch inside an otherwise exact occurrence is corrected to the
//! pattern's root, as long as that root is diatonic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::result::Key;
use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::RefineConfig;
use crate::theory::chord::{Chord, Provenance};
use crate::theory::pitch::PitchClass;
use crate::theory::scale::diatonic_quality;

/// A repeating root sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Root pitch classes in order
    pub roots: Vec<PitchClass>,

    /// Number of (possibly overlapping) occurrences
    pub occurrences: usize,
}

/// A correction applied by pattern memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternCorrection {
    /// Start time of the corrected event
    pub time: f32,
    /// Chord before
    pub from: Chord,
    /// Chord after
    pub to: Chord,
}

fn contains_run(haystack: &[PitchClass], needle: &[PitchClass]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Find maximal repeating root patterns
///
/// Patterns made of a single repeated root are ignored. A pattern is dropped when a
/// longer pattern contains it and occurs at least as often. Longer patterns come
/// first; ties keep the order of first appearance.
pub fn detect_patterns(roots: &[PitchClass], config: &RefineConfig) -> Vec<DetectedPattern> {
    let min_len = config.pattern_min_len.max(2);
    let mut found: Vec<DetectedPattern> = Vec::new();

    for len in min_len..=config.pattern_max_len {
        if len > roots.len() {
            break;
        }
        let mut counts: HashMap<&[PitchClass], usize> = HashMap::new();
        let mut order: Vec<&[PitchClass]> = Vec::new();
        for window in roots.windows(len) {
            if window.iter().all(|&r| r == window[0]) {
                continue;
            }
            let count = counts.entry(window).or_insert(0);
            if *count == 0 {
                order.push(window);
            }
            *count += 1;
        }
        for window in order {
            let occurrences = counts[window];
            if occurrences >= config.pattern_min_occurrences {
                found.push(DetectedPattern {
                    roots: window.to_vec(),
                    occurrences,
                });
            }
        }
    }

    let maximal: Vec<DetectedPattern> = found
        .iter()
        .filter(|p| {
            !found.iter().any(|q| {
                q.roots.len() > p.roots.len()
                    && q.occurrences >= p.occurrences
                    && contains_run(&q.roots, &p.roots)
            })
        })
        .cloned()
        .collect();

    let mut maximal = maximal;
    maximal.sort_by(|a, b| b.roots.len().cmp(&a.roots.len()));
    maximal
}

/// Expected root at event `i` if it is the only mismatch of an occurrence of `pattern`
fn expected_root(roots: &[PitchClass], i: usize, pattern: &[PitchClass]) -> Option<PitchClass> {
    let len = pattern.len();
    for offset in 0..len {
        let Some(start) = i.checked_sub(offset) else {
            break;
        };
        if start + len > roots.len() {
            continue;
        }
        let window = &roots[start..start + len];
        let mismatches = window.iter().zip(pattern).filter(|(a, b)| a != b).count();
        if mismatches == 1 && window[offset] != pattern[offset] {
            return Some(pattern[offset]);
        }
    }
    None
}

/// Detect patterns and correct isolated low-confidence mismatches
///
/// # Returns
///
/// The corrected timeline, the detected patterns and every correction made
pub fn apply_pattern_memory(
    timeline: &Timeline,
    key: &Key,
    config: &RefineConfig,
) -> (Timeline, Vec<DetectedPattern>, Vec<PatternCorrection>) {
    let roots = timeline.roots();
    let patterns = detect_patterns(&roots, config);
    let mut corrections = Vec::new();

    let corrected = timeline.map_events(|i, event| {
        if event.confidence >= config.pattern_low_confidence {
            return *event;
        }
        let replacement = patterns.iter().find_map(|p| {
            let root = expected_root(&roots, i, &p.roots)?;
            let quality = diatonic_quality(key, root)?;
            Some(Chord::new(root, quality))
        });
        match replacement {
            Some(chord) => {
                corrections.push(PatternCorrection {
                    time: event.start_time,
                    from: event.chord,
                    to: chord,
                });
                ChordEvent {
                    chord,
                    provenance: Provenance::Diatonic,
                    ..*event
                }
            }
            None => *event,
        }
    });

    log::debug!(
        "Pattern memory: {} patterns, {} corrections",
        patterns.len(),
        corrections.len()
    );
    (corrected, patterns, corrections)
}
