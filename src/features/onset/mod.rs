//! Onset detection modules
//!
//! Frame-rate novelty curves and their consumers:
//! - Energy flux and chroma flux
//! - Peak picking
//! - Texture classification from the onset rate

pub mod novelty;
pub mod texture;

pub use texture::Texture;

use crate::config::TempoConfig;

/// Classify a clip's texture from the onset rate of its novelty curve
pub fn estimate_texture(novelty: &[f32], frames_per_second: f32, config: &TempoConfig) -> Texture {
    if novelty.is_empty() || frames_per_second <= 0.0 {
        return Texture::Sustained;
    }
    let min_gap = (config.onset_min_gap_seconds * frames_per_second).round().max(1.0) as usize;
    let onsets = novelty::pick_onsets(novelty, config.onset_threshold_db, min_gap);
    let seconds = novelty.len() as f32 / frames_per_second;
    let rate = onsets.len() as f32 / seconds;
    log::debug!("Texture: {} onsets in {:.2}s ({:.2}/s)", onsets.len(), seconds, rate);
    Texture::from_onset_rate(rate, config.percussive_onset_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_texture() {
        let config = TempoConfig::default();
        let fps = 50.0;
        // Two onsets per second
        let mut slow = vec![0.0f32; 500];
        for i in (10..500).step_by(25) {
            slow[i] = 1.0;
        }
        assert_eq!(estimate_texture(&slow, fps, &config), Texture::Sustained);

        // Eight onsets per second
        let mut busy = vec![0.0f32; 500];
        for i in (3..500).step_by(6) {
            busy[i] = 1.0;
        }
        assert_eq!(estimate_texture(&busy, fps, &config), Texture::Percussive);
        assert_eq!(estimate_texture(&[], fps, &config), Texture::Sustained);
    }
}
