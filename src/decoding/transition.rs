//! Chord-to-chord transition costs
//!
//! Cost of moving between two different states:
//!
//! ```text
//! cost = switch_penalty + distance_scale · d
//! d    = fifths_weight · fifths/6 + chromatic_weight · chromatic/6   (root distance)
//!        × functional_factor        for ii→V, IV→V, V→I
//!        × fourth_fifth_factor      for any other root motion by a fourth or fifth
//!        + quality_change_cost      when the quality changes
//!        + non_diatonic_pair_cost   when neither state is diatonic
//! ```
//!
//! Staying in the same state costs nothing.

use super::states::DecoderState;
use crate::analysis::result::Key;
use crate::config::DecoderConfig;
use crate::theory::pitch::{chromatic_distance, fifths_distance, interval};

/// Dense `n × n` cost matrix, row = from, column = to
#[derive(Debug, Clone)]
pub struct TransitionCosts {
    costs: Vec<f32>,
    n: usize,
}

impl TransitionCosts {
    /// Precompute costs between every pair of states
    pub fn new(states: &[DecoderState], key: &Key, config: &DecoderConfig) -> Self {
        let n = states.len();
        let mut costs = vec![0.0f32; n * n];
        for (i, from) in states.iter().enumerate() {
            for (j, to) in states.iter().enumerate() {
                if i != j {
                    costs[i * n + j] = transition_cost(from, to, key, config);
                }
            }
        }
        Self { costs, n }
    }

    /// Cost of moving from state `from` to state `to`
    pub fn cost(&self, from: usize, to: usize) -> f32 {
        self.costs[from * self.n + to]
    }
}

/// True for `ii→V`, `IV→V` and `V→I` root motion relative to the tonic
fn is_functional(from: &DecoderState, to: &DecoderState, key: &Key) -> bool {
    let a = interval(key.root, from.chord.root);
    let b = interval(key.root, to.chord.root);
    matches!((a, b), (2, 7) | (5, 7) | (7, 0))
}

/// Cost of switching from one state to a different one
pub fn transition_cost(from: &DecoderState, to: &DecoderState, key: &Key, config: &DecoderConfig) -> f32 {
    if from.chord == to.chord {
        return 0.0;
    }
    let (a, b) = (from.chord.root, to.chord.root);
    let mut distance = config.fifths_weight * fifths_distance(a, b) as f32 / 6.0
        + config.chromatic_weight * chromatic_distance(a, b) as f32 / 6.0;

    let step = interval(a, b);
    if is_functional(from, to, key) {
        distance *= config.functional_factor;
    } else if step == 5 || step == 7 {
        distance *= config.fourth_fifth_factor;
    }
    if from.chord.quality != to.chord.quality {
        distance += config.quality_change_cost;
    }
    if !from.is_diatonic() && !to.is_diatonic() {
        distance += config.non_diatonic_pair_cost;
    }
    config.switch_penalty + config.distance_scale * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TheoryConfig;
    use crate::decoding::states::build_states;

    fn state(states: &[DecoderState], label: &str) -> usize {
        states.iter().position(|s| s.chord.label() == label).unwrap()
    }

    #[test]
    fn test_cadential_motion_is_cheaper() {
        let key = Key::new(0, false, 1.0);
        let config = DecoderConfig::default();
        let states = build_states(&key, &TheoryConfig::default(), false);
        let costs = TransitionCosts::new(&states, &key, &config);

        let (c, g, dm, em) = (state(&states, "C"), state(&states, "G"), state(&states, "Dm"), state(&states, "Em"));
        assert_eq!(costs.cost(c, c), 0.0);
        assert!(costs.cost(g, c) < costs.cost(c, em));
        assert!(costs.cost(dm, g) < costs.cost(g, dm));
        assert!(costs.cost(c, g) >= config.switch_penalty);
    }

    #[test]
    fn test_non_diatonic_pair_costs_more() {
        let key = Key::new(0, false, 1.0);
        let config = DecoderConfig::default();
        let states = build_states(&key, &TheoryConfig::default(), false);
        let (d, e, bb) = (state(&states, "D"), state(&states, "E"), state(&states, "A#"));
        let (dm, em) = (state(&states, "Dm"), state(&states, "Em"));
        let pair = transition_cost(&states[d], &states[e], &key, &config);
        let diatonic = transition_cost(&states[dm], &states[em], &key, &config);
        assert!(pair > diatonic);
        assert!(transition_cost(&states[bb], &states[d], &key, &config) > config.switch_penalty);
    }
}
