//! Bass pitch tracking
//!
//! Per-frame F0 estimation in the bass band followed by a stability filter that
//! discards estimates not confirmed by neighboring frames:
//! - Autocorrelation of a resynthesized low-pass pseudo-signal
//! - Neighborhood stability check

pub mod pitch;
pub mod stability;

pub use pitch::BassEstimator;
pub use stability::stabilize_bass;
