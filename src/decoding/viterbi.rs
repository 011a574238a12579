//! Beam-limited Viterbi decoding over the key's chord states
//!
//! Scores are accumulated as `Σ emission − Σ transition cost` and maximized. At each
//! frame only the `beam_width` best states of the previous frame are considered as
//! predecessors, plus the state's own continuation so a held chord can never fall
//! out of the beam.

use super::emission::emission;
use super::states::{build_states, DecoderState};
use super::transition::TransitionCosts;
use crate::analysis::result::Key;
use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::{DecoderConfig, TheoryConfig};
use crate::features::FeatureSet;

/// A maximal run of frames assigned to one state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateRun {
    /// State index
    pub state: usize,
    /// First frame (absolute index)
    pub start_frame: usize,
    /// One past the last frame
    pub end_frame: usize,
    /// Mean emission score over the run
    pub mean_emission: f32,
}

/// Viterbi chord decoder for one key
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    states: Vec<DecoderState>,
    costs: TransitionCosts,
    beam_width: usize,
    config: DecoderConfig,
}

impl ViterbiDecoder {
    /// Build the state space and transition costs for `key`
    ///
    /// `conservative` drops the borrowed states and halves the beam.
    pub fn new(key: &Key, theory: &TheoryConfig, config: &DecoderConfig, conservative: bool) -> Self {
        let states = build_states(key, theory, conservative);
        let costs = TransitionCosts::new(&states, key, config);
        let beam_width = if conservative {
            (config.beam_width / 2).max(1)
        } else {
            config.beam_width.max(1)
        };
        Self {
            states,
            costs,
            beam_width,
            config: config.clone(),
        }
    }

    /// Decoder states
    pub fn states(&self) -> &[DecoderState] {
        &self.states
    }

    /// Effective beam width
    pub fn beam_width(&self) -> usize {
        self.beam_width
    }

    /// Emission matrix (frame-major) for frames `start_frame..`
    fn emissions(&self, features: &FeatureSet, start_frame: usize) -> Vec<f32> {
        let percentiles = features.percentiles();
        features.frames()[start_frame.min(features.len())..]
            .iter()
            .flat_map(|frame| {
                self.states
                    .iter()
                    .map(move |state| emission(frame, state, &percentiles, &self.config))
            })
            .collect()
    }

    /// Best state path through a frame-major emission matrix
    ///
    /// # Arguments
    ///
    /// * `emissions` - `num_frames × num_states` scores, frame-major
    ///
    /// # Returns
    ///
    /// One state index per frame (empty when there are no frames)
    pub fn best_path(&self, emissions: &[f32]) -> Vec<usize> {
        let num_states = self.states.len();
        if num_states == 0 || emissions.len() < num_states {
            return Vec::new();
        }
        let num_frames = emissions.len() / num_states;

        let mut previous: Vec<f32> = emissions[..num_states].to_vec();
        let mut current = vec![f32::NEG_INFINITY; num_states];
        let mut bt = vec![0usize; num_states * num_frames];
        for (state, slot) in bt.iter_mut().take(num_states).enumerate() {
            *slot = state;
        }

        let mut order: Vec<usize> = (0..num_states).collect();
        for frame in 1..num_frames {
            order.sort_by(|&a, &b| {
                previous[b]
                    .partial_cmp(&previous[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let beam = &order[..self.beam_width.min(num_states)];
            let dens = &emissions[frame * num_states..(frame + 1) * num_states];

            for state in 0..num_states {
                let mut best = previous[state];
                let mut best_prev = state;
                for &prev_state in beam {
                    if prev_state == state {
                        continue;
                    }
                    let score = previous[prev_state] - self.costs.cost(prev_state, state);
                    if score > best {
                        best = score;
                        best_prev = prev_state;
                    }
                }
                current[state] = best + dens[state];
                bt[frame * num_states + state] = best_prev;
            }
            previous.clone_from_slice(&current);
        }

        let mut best_state = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (i, v) in previous.iter().enumerate() {
            if *v > best_score {
                best_score = *v;
                best_state = i;
            }
        }

        let mut path = vec![0usize; num_frames];
        let mut state = best_state;
        for frame in (0..num_frames).rev() {
            path[frame] = state;
            state = bt[frame * num_states + state];
        }
        path
    }

    /// Collapse a path into runs with their mean emission
    fn runs(&self, path: &[usize], emissions: &[f32], start_frame: usize) -> Vec<StateRun> {
        let num_states = self.states.len();
        let mut runs: Vec<StateRun> = Vec::new();
        let mut run_start = 0usize;
        for i in 1..=path.len() {
            if i < path.len() && path[i] == path[run_start] {
                continue;
            }
            let state = path[run_start];
            let total: f32 = (run_start..i).map(|f| emissions[f * num_states + state]).sum();
            runs.push(StateRun {
                state,
                start_frame: start_frame + run_start,
                end_frame: start_frame + i,
                mean_emission: total / (i - run_start) as f32,
            });
            run_start = i;
        }
        runs
    }

    /// Decode frames `start_frame..` into state runs
    pub fn decode_runs(&self, features: &FeatureSet, start_frame: usize) -> Vec<StateRun> {
        let emissions = self.emissions(features, start_frame);
        let path = self.best_path(&emissions);
        self.runs(&path, &emissions, start_frame)
    }

    /// Decode frames `start_frame..` into a chord timeline
    ///
    /// Runs whose mean emission is below the floor are dropped; the preceding run
    /// (or the following one, at the start) absorbs their time.
    pub fn decode(&self, features: &FeatureSet, start_frame: usize) -> Timeline {
        let start = features.frame_time(start_frame).min(features.duration());
        let runs = self.decode_runs(features, start_frame);
        let total = runs.len();

        let events: Vec<ChordEvent> = runs
            .into_iter()
            .filter(|run| run.mean_emission >= self.config.emission_floor)
            .map(|run| {
                let state = &self.states[run.state];
                ChordEvent::new(
                    features.frame_time(run.start_frame),
                    state.chord,
                    run.mean_emission,
                    state.provenance,
                )
            })
            .collect();

        log::debug!(
            "Viterbi decode: {} states, beam {}, {} runs, {} kept",
            self.states.len(),
            self.beam_width,
            total,
            events.len()
        );
        Timeline::from_segments(start, features.duration(), events)
    }
}

/// Decode a timeline for `key` with a fresh decoder
pub fn decode_viterbi(
    features: &FeatureSet,
    start_frame: usize,
    key: &Key,
    theory: &TheoryConfig,
    config: &DecoderConfig,
    conservative: bool,
) -> Timeline {
    ViterbiDecoder::new(key, theory, config, conservative).decode(features, start_frame)
}
