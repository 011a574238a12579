//! Coarse material texture

use serde::{Deserialize, Serialize};

/// Sustained or percussive material, used to tune segmentation and smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    /// Held chords, pads, slow strumming
    Sustained,
    /// Dense onsets, drums, staccato comping
    Percussive,
}

impl Texture {
    /// Classify by onset rate (onsets per second) against `percussive_rate`
    pub fn from_onset_rate(onsets_per_second: f32, percussive_rate: f32) -> Self {
        if onsets_per_second > percussive_rate {
            Texture::Percussive
        } else {
            Texture::Sustained
        }
    }

    /// True for percussive material
    pub fn is_percussive(self) -> bool {
        self == Texture::Percussive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_onset_rate() {
        assert_eq!(Texture::from_onset_rate(1.0, 3.0), Texture::Sustained);
        assert_eq!(Texture::from_onset_rate(3.0, 3.0), Texture::Sustained);
        assert!(Texture::from_onset_rate(6.5, 3.0).is_percussive());
    }
}
