//! Key detection modules
//!
//! Detect the tonal center using:
//! - Krumhansl-Kessler templates (24 keys)
//! - Four weighted evidence votes
//! - Third/sixth/seventh mode decision

pub mod detector;
pub mod mode;
pub mod templates;
pub mod votes;

pub use detector::detect_key;
pub use templates::KeyTemplates;

use crate::analysis::diagnostics::Vote;
use crate::analysis::result::Key;
use crate::theory::pitch::PitchClass;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyEstimate {
    /// Detected key
    pub key: Key,

    /// Summed vote weight per pitch class
    pub tallies: [f32; 12],

    /// Every vote that was cast
    pub votes: Vec<Vote>,

    /// Root of the first strong chord, if one was found
    pub first_chord_root: Option<PitchClass>,

    /// `(raw winner, reassigned tonic)` when the fourth-above guard fired
    pub fourth_guard: Option<(PitchClass, PitchClass)>,
}
