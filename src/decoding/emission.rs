//! Frame emission scores

use super::states::DecoderState;
use crate::config::DecoderConfig;
use crate::features::chroma::normalization::cosine_similarity;
use crate::features::{EnergyPercentiles, FeatureVector};

/// Emission score of `state` for one frame
///
/// `cosine(chroma, template)` plus a bass bonus (root beats third or fifth), plus
/// an in-key bonus for diatonic states, minus a penalty for frames below the 30th
/// energy percentile.
pub fn emission(
    frame: &FeatureVector,
    state: &DecoderState,
    percentiles: &EnergyPercentiles,
    config: &DecoderConfig,
) -> f32 {
    let mut score = cosine_similarity(&frame.chroma, &state.template);
    if let Some(bass) = frame.bass {
        if bass == state.chord.root {
            score += config.bass_root_bonus;
        } else if Some(bass) == state.chord.third() || bass == state.chord.fifth() {
            score += config.bass_member_bonus;
        }
    }
    if state.is_diatonic() {
        score += config.in_key_bonus;
    }
    if frame.energy < percentiles.p30 {
        score -= config.low_energy_penalty;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::Key;
    use crate::config::TheoryConfig;
    use crate::decoding::states::build_states;

    fn frame(pcs: &[usize], bass: Option<u8>, energy: f32) -> FeatureVector {
        let mut chroma = [0.0f32; 12];
        for &pc in pcs {
            chroma[pc] = 1.0 / pcs.len() as f32;
        }
        FeatureVector { chroma, bass, energy }
    }

    #[test]
    fn test_bass_root_beats_bass_fifth() {
        let states = build_states(&Key::new(0, false, 1.0), &TheoryConfig::default(), false);
        let c = &states[0];
        let config = DecoderConfig::default();
        let p = EnergyPercentiles::default();
        let on_root = emission(&frame(&[0, 4, 7], Some(0), 1.0), c, &p, &config);
        let on_fifth = emission(&frame(&[0, 4, 7], Some(7), 1.0), c, &p, &config);
        let none = emission(&frame(&[0, 4, 7], None, 1.0), c, &p, &config);
        assert!(on_root > on_fifth && on_fifth > none);
        assert!((none - (1.0 + config.in_key_bonus)).abs() < 1e-5);
    }

    #[test]
    fn test_quiet_frames_are_penalized() {
        let states = build_states(&Key::new(0, false, 1.0), &TheoryConfig::default(), false);
        let config = DecoderConfig::default();
        let p = EnergyPercentiles {
            p30: 0.5,
            ..Default::default()
        };
        let loud = emission(&frame(&[0, 4, 7], None, 1.0), &states[0], &p, &config);
        let quiet = emission(&frame(&[0, 4, 7], None, 0.1), &states[0], &p, &config);
        assert!((loud - quiet - config.low_energy_penalty).abs() < 1e-5);
    }
}
