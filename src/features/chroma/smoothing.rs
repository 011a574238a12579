//! Energy-weighted chroma averaging over frame spans

use super::normalization::normalize_sum;
use super::Chroma;
use crate::features::FeatureVector;

/// Energy-weighted mean chroma of a span of frames, normalized to sum 1
///
/// Silent frames carry no weight; a span without energy averages to all-zero.
pub fn weighted_mean_chroma(frames: &[FeatureVector]) -> Chroma {
    let mut acc = [0.0f32; 12];
    for frame in frames {
        if frame.energy <= 0.0 {
            continue;
        }
        for (a, &c) in acc.iter_mut().zip(frame.chroma.iter()) {
            *a += frame.energy * c;
        }
    }
    normalize_sum(&mut acc);
    acc
}
