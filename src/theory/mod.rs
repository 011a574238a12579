//! Music theory primitives
//!
//! Pitch-class arithmetic, chord qualities and key-relative classification shared by
//! every stage after feature extraction:
//! - Pitch classes and intervals (modulo 12, negative-safe)
//! - Chords with structured root/quality/bass fields
//! - Scale degrees, diatonic triads, secondary dominants and borrowed chords

pub mod chord;
pub mod pitch;
pub mod scale;

pub use chord::{Chord, ChordCandidate, ChordQuality, Provenance};
pub use pitch::{to_pc, PitchClass};
