//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor) and scores a chroma
//! vector against them with Pearson correlation.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use crate::features::chroma::Chroma;
use crate::theory::pitch::PitchClass;

/// C major probe-tone profile
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// C minor probe-tone profile
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Best-correlating key of a chroma vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileMatch {
    /// Tonic pitch class
    pub root: PitchClass,
    /// Minor mode when true
    pub minor: bool,
    /// Pearson correlation with the rotated profile
    pub correlation: f32,
}

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates indexed by tonic (C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates indexed by tonic (C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create templates by rotating the Krumhansl-Kessler profiles onto each tonic
    pub fn new() -> Self {
        let mut major = [[0.0f32; 12]; 12];
        let mut minor = [[0.0f32; 12]; 12];
        for tonic in 0..12 {
            for pc in 0..12 {
                let degree = (pc + 12 - tonic) % 12;
                major[tonic][pc] = MAJOR_PROFILE[degree];
                minor[tonic][pc] = MINOR_PROFILE[degree];
            }
        }
        Self { major, minor }
    }

    /// Pearson correlation of `chroma` with one key's template
    pub fn score(&self, chroma: &Chroma, root: PitchClass, minor: bool) -> f32 {
        let template = if minor {
            &self.minor[root as usize % 12]
        } else {
            &self.major[root as usize % 12]
        };
        pearson(chroma, template)
    }

    /// Best of the 24 keys, or `None` for a silent chroma
    pub fn best_match(&self, chroma: &Chroma) -> Option<ProfileMatch> {
        if chroma.iter().all(|&v| v <= 0.0) {
            return None;
        }
        let mut best: Option<ProfileMatch> = None;
        for root in 0..12u8 {
            for minor in [false, true] {
                let correlation = self.score(chroma, root, minor);
                if best.map(|b| correlation > b.correlation).unwrap_or(true) {
                    best = Some(ProfileMatch {
                        root,
                        minor,
                        correlation,
                    });
                }
            }
        }
        best
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Pearson correlation coefficient; zero when either vector is constant
pub fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;
    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= 1e-12 {
        0.0
    } else {
        cov / denom
    }
}
