//! Major/minor mode decision for a known tonic

use super::templates::KeyTemplates;
use crate::config::KeyConfig;
use crate::features::chroma::Chroma;
use crate::theory::pitch::{transpose, PitchClass};

/// Degree pairs below this combined share are too faint to compare
const MIN_DEGREE_ENERGY: f32 = 0.01;

/// Signed vote of one scale-degree pair: `+1` favors minor, `-1` major, `0` undecided
fn degree_vote(chroma: &Chroma, tonic: PitchClass, minor_degree: i32, major_degree: i32, margin: f32) -> i32 {
    let flat = chroma[transpose(tonic, minor_degree) as usize];
    let natural = chroma[transpose(tonic, major_degree) as usize];
    if flat + natural < MIN_DEGREE_ENERGY {
        0
    } else if flat > natural * (1.0 + margin) {
        1
    } else if natural > flat * (1.0 + margin) {
        -1
    } else {
        0
    }
}

/// Decide the mode of `tonic` from the global chroma
///
/// The third decides (weight 2) when one third beats the other by
/// `mode_third_margin`; the sixth (b6 vs 6) and seventh (b7 vs 7) corroborate
/// (weight 1 each). A committed third stands unless both other degrees contradict
/// it; without a committed third, agreeing sixth and seventh decide. Otherwise the
/// profile correlation decides if one mode scores `mode_profile_margin` higher,
/// and the fallback is major.
///
/// # Returns
///
/// `true` for minor
pub fn detect_mode(
    chroma: &Chroma,
    tonic: PitchClass,
    templates: &KeyTemplates,
    config: &KeyConfig,
) -> bool {
    let margin = config.mode_third_margin;
    let third = degree_vote(chroma, tonic, 3, 4, margin);
    let sixth = degree_vote(chroma, tonic, 8, 9, margin);
    let seventh = degree_vote(chroma, tonic, 10, 11, margin);
    let total = 2 * third + sixth + seventh;

    log::debug!(
        "Mode votes for {}: third={} sixth={} seventh={}",
        tonic,
        third,
        sixth,
        seventh
    );

    if third != 0 && total.signum() == third.signum() {
        return third > 0;
    }
    if third == 0 && total.abs() >= 2 {
        return total > 0;
    }

    let major = templates.score(chroma, tonic, false);
    let minor = templates.score(chroma, tonic, true);
    if (minor - major).abs() > config.mode_profile_margin {
        minor > major
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroma_of(pcs: &[(usize, f32)]) -> Chroma {
        let mut c = [0.0f32; 12];
        for &(pc, v) in pcs {
            c[pc] = v;
        }
        c
    }

    #[test]
    fn test_major_third_decides() {
        let chroma = chroma_of(&[(0, 0.4), (4, 0.3), (7, 0.3)]);
        assert!(!detect_mode(&chroma, 0, &KeyTemplates::new(), &KeyConfig::default()));
    }

    #[test]
    fn test_minor_third_with_corroboration() {
        let chroma = chroma_of(&[(9, 0.3), (0, 0.25), (4, 0.2), (5, 0.1), (7, 0.15)]);
        assert!(detect_mode(&chroma, 9, &KeyTemplates::new(), &KeyConfig::default()));
    }

    #[test]
    fn test_close_thirds_use_other_degrees() {
        // Thirds within the margin; b6 and b7 clearly present
        let chroma = chroma_of(&[(0, 0.3), (3, 0.105), (4, 0.1), (7, 0.2), (8, 0.15), (10, 0.145)]);
        assert!(detect_mode(&chroma, 0, &KeyTemplates::new(), &KeyConfig::default()));
    }
}
