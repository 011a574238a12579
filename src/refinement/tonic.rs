//! Tonic re-validation from the decoded chord sequence
//!
//! Each root is scored from how the chords actually behave:
//!
//! ```text
//! score[r] = duration_weight · (time on root r / total time)
//!          + open_weight     · [first chord has root r]
//!          + close_weight    · [last chord has root r]
//!          + cadence_weight  · (cadences into r / all cadences)
//! ```
//!
//! where `V→I` and `IV→I` count once and `IV→V→I` counts once more. A different
//! root replaces the current tonic only if it beats it by a relative margin; a
//! move onto the current key's subdominant needs the larger subdominant margin.
//! Every change is charged against a [`KeyChangeGuard`].

use crate::analysis::result::Key;
use crate::analysis::timeline::Timeline;
use crate::config::RefineConfig;
use crate::theory::pitch::{interval, PitchClass};

/// Request-scoped key-change limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChangeGuard {
    max_changes: u32,
    changes: u32,
}

impl KeyChangeGuard {
    /// Guard allowing at most `max_changes` key changes
    pub fn new(max_changes: u32) -> Self {
        Self {
            max_changes,
            changes: 0,
        }
    }

    /// Whether another change is allowed
    pub fn can_change(&self) -> bool {
        self.changes < self.max_changes
    }

    /// Charge one change; `false` when no changes are left
    pub fn record_change(&mut self) -> bool {
        if !self.can_change() {
            return false;
        }
        self.changes += 1;
        true
    }

    /// Changes made so far
    pub fn changes(&self) -> u32 {
        self.changes
    }
}

/// Outcome of one re-validation
#[derive(Debug, Clone, PartialEq)]
pub struct TonicDecision {
    /// Key going in
    pub current: Key,
    /// Better-scoring key, if any root beat the current tonic
    pub proposed: Option<Key>,
    /// Whether the proposal cleared its margin and the guard
    pub accepted: bool,
    /// Per-root tonic scores
    pub scores: [f32; 12],
}

impl TonicDecision {
    /// Key to continue with
    pub fn key(&self) -> Key {
        match (self.accepted, self.proposed) {
            (true, Some(key)) => key,
            _ => self.current,
        }
    }
}

/// Per-root tonic evidence from a timeline
pub fn tonic_scores(timeline: &Timeline, config: &RefineConfig) -> [f32; 12] {
    let mut scores = [0.0f32; 12];
    let roots = timeline.roots();
    if roots.is_empty() {
        return scores;
    }

    let mut durations = [0.0f32; 12];
    for (i, &root) in roots.iter().enumerate() {
        durations[root as usize] += timeline.duration_of(i);
    }
    let total: f32 = durations.iter().sum();

    let mut cadences = [0.0f32; 12];
    for i in 1..roots.len() {
        let (prev, cur) = (roots[i - 1], roots[i]);
        let step = interval(cur, prev);
        if step == 7 || step == 5 {
            cadences[cur as usize] += 1.0;
        }
        if i >= 2 && interval(cur, roots[i - 2]) == 5 && step == 7 {
            cadences[cur as usize] += 1.0;
        }
    }
    let total_cadences: f32 = cadences.iter().sum();

    for (pc, score) in scores.iter_mut().enumerate() {
        if total > 0.0 {
            *score += config.tonic_duration_weight * durations[pc] / total;
        }
        if total_cadences > 0.0 {
            *score += config.tonic_cadence_weight * cadences[pc] / total_cadences;
        }
    }
    scores[roots[0] as usize] += config.tonic_open_weight;
    scores[roots[roots.len() - 1] as usize] += config.tonic_close_weight;
    scores
}

/// Root that should replace the current tonic, if any clears its margin
pub fn propose_tonic(scores: &[f32; 12], key: &Key, config: &RefineConfig) -> Option<PitchClass> {
    let (best, &best_score) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let best = best as PitchClass;
    if best == key.root {
        return None;
    }
    let margin = if interval(key.root, best) == 5 {
        config.subdominant_switch_margin
    } else {
        config.tonic_switch_margin
    };
    let current = scores[key.root as usize];
    (best_score > current * (1.0 + margin)).then_some(best)
}

/// Mode implied by the chords built on `root`, weighted by duration
fn implied_minor(timeline: &Timeline, root: PitchClass) -> bool {
    let (mut minor, mut major) = (0.0f32, 0.0f32);
    for (i, event) in timeline.events().iter().enumerate() {
        if event.chord.root != root {
            continue;
        }
        match event.chord.quality.third() {
            Some(3) => minor += timeline.duration_of(i),
            Some(_) => major += timeline.duration_of(i),
            None => {}
        }
    }
    minor > major
}

/// Re-validate the tonic against the decoded timeline
///
/// # Arguments
///
/// * `timeline` - Refined chord timeline
/// * `key` - Current key
/// * `guard` - Request-scoped change limiter, charged when a change is accepted
///
/// # Returns
///
/// The decision, including the scores that produced it
pub fn revalidate_tonic(
    timeline: &Timeline,
    key: &Key,
    guard: &mut KeyChangeGuard,
    config: &RefineConfig,
) -> TonicDecision {
    let scores = tonic_scores(timeline, config);
    let proposed = propose_tonic(&scores, key, config).map(|root| {
        let total: f32 = scores.iter().sum();
        let confidence = if total > 0.0 { scores[root as usize] / total } else { 0.0 };
        Key::new(root, implied_minor(timeline, root), confidence)
    });
    let accepted = proposed.is_some() && guard.record_change();

    log::debug!(
        "Tonic re-validation: current {} ({:.2}), proposed {:?}, accepted {}",
        key.name(),
        scores[key.root as usize],
        proposed.map(|k| k.name()),
        accepted
    );
    TonicDecision {
        current: *key,
        proposed,
        accepted,
        scores,
    }
}
