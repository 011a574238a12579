//! Outlier smoothing
//!
//! An out-of-key event sandwiched between two identical in-key events, and clearly
//! less confident than both, is replaced by its neighbors' chord.

use crate::analysis::timeline::{ChordEvent, Timeline};
use crate::config::RefineConfig;
use crate::features::onset::Texture;
use crate::theory::chord::{Chord, Provenance};

/// A replacement made by outlier smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierReplacement {
    /// Start time of the replaced event
    pub time: f32,
    /// Chord before
    pub from: Chord,
    /// Neighbor chord after
    pub to: Chord,
}

/// Replace flanked out-of-key outliers
///
/// The confidence margin is scaled by `percussive_outlier_scale` for percussive
/// material.
pub fn smooth_outliers(
    timeline: &Timeline,
    texture: Texture,
    config: &RefineConfig,
) -> (Timeline, Vec<OutlierReplacement>) {
    let margin = if texture.is_percussive() {
        config.outlier_margin * config.percussive_outlier_scale
    } else {
        config.outlier_margin
    };
    let events = timeline.events();
    let mut replacements = Vec::new();

    let smoothed = timeline.map_events(|i, event| {
        if i == 0 || i + 1 >= events.len() {
            return *event;
        }
        let (prev, next) = (&events[i - 1], &events[i + 1]);
        let flanked = prev.chord == next.chord
            && prev.provenance == Provenance::Diatonic
            && next.provenance == Provenance::Diatonic;
        let outlier = event.provenance != Provenance::Diatonic
            && event.confidence + margin < prev.confidence.min(next.confidence);
        if flanked && outlier {
            replacements.push(OutlierReplacement {
                time: event.start_time,
                from: event.chord,
                to: prev.chord,
            });
            ChordEvent {
                chord: prev.chord,
                provenance: prev.provenance,
                ..*event
            }
        } else {
            *event
        }
    });
    (smoothed, replacements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::chord::ChordQuality;

    fn timeline(middle_confidence: f32, middle: Provenance) -> Timeline {
        Timeline::from_segments(
            0.0,
            3.0,
            vec![
                ChordEvent::new(0.0, Chord::new(0, ChordQuality::Major), 0.9, Provenance::Diatonic),
                ChordEvent::new(1.0, Chord::new(1, ChordQuality::Major), middle_confidence, middle),
                ChordEvent::new(2.0, Chord::new(0, ChordQuality::Major), 0.8, Provenance::Diatonic),
            ],
        )
    }

    #[test]
    fn test_weak_outlier_is_replaced() {
        let (out, replaced) = smooth_outliers(&timeline(0.5, Provenance::Chromatic), Texture::Sustained, &RefineConfig::default());
        assert_eq!(replaced.len(), 1);
        assert_eq!(out.roots(), vec![0]);
    }

    #[test]
    fn test_confident_or_diatonic_middle_is_kept() {
        let config = RefineConfig::default();
        let (out, _) = smooth_outliers(&timeline(0.7, Provenance::Chromatic), Texture::Sustained, &config);
        assert_eq!(out.len(), 3);
        let (out, _) = smooth_outliers(&timeline(0.3, Provenance::Diatonic), Texture::Sustained, &config);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_percussive_margin_is_smaller() {
        let config = RefineConfig::default();
        // 0.68 + 0.15 > 0.8, but 0.68 + 0.1125 < 0.8
        let (sustained, _) = smooth_outliers(&timeline(0.68, Provenance::Chromatic), Texture::Sustained, &config);
        let (percussive, _) = smooth_outliers(&timeline(0.68, Provenance::Chromatic), Texture::Percussive, &config);
        assert_eq!(sustained.len(), 3);
        assert_eq!(percussive.len(), 1);
    }
}
