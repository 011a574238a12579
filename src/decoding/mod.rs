//! Chord sequence decoding
//!
//! Two independent strategies produce a chord timeline for a key:
//! - Beam-limited Viterbi over diatonic, secondary-dominant and borrowed triads
//! - Bass-anchored, beat-aligned segmentation with tiered candidate selection
//!
//! The refinement layer reconciles the two.

pub mod emission;
pub mod segmenter;
pub mod states;
pub mod transition;
pub mod viterbi;

pub use segmenter::{segment_bass_anchored, BassAnchoredSegmenter};
pub use viterbi::{decode_viterbi, ViterbiDecoder};
