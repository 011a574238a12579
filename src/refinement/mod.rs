//! Consensus and refinement
//!
//! Runs after both decoders, in a fixed order:
//! 1. Consensus merge of the two timelines
//! 2. Extension decoration
//! 3. Inversion/slash detection
//! 4. Pattern memory
//! 5. Outlier smoothing
//!
//! Tonic re-validation runs last and is driven by the pipeline, since an accepted
//! key change re-runs decoding and every pass above.

pub mod consensus;
pub mod extensions;
pub mod inversions;
pub mod outliers;
pub mod pattern_memory;
pub mod tonic;

pub use consensus::merge_timelines;
pub use pattern_memory::DetectedPattern;
pub use tonic::{revalidate_tonic, KeyChangeGuard, TonicDecision};

use crate::analysis::diagnostics::Diagnostic;
use crate::analysis::result::Key;
use crate::analysis::timeline::Timeline;
use crate::config::{RefineConfig, TheoryConfig};
use crate::features::onset::Texture;
use crate::features::FeatureSet;

/// Output of the refinement passes
#[derive(Debug, Clone)]
pub struct RefinedTimeline {
    /// Refined timeline
    pub timeline: Timeline,
    /// Patterns found by pattern memory
    pub patterns: Vec<DetectedPattern>,
    /// Decisions worth reporting, in pass order
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the refinement passes over a merged timeline
pub fn refine(
    merged: &Timeline,
    features: &FeatureSet,
    key: &Key,
    texture: Texture,
    theory: &TheoryConfig,
    config: &RefineConfig,
) -> RefinedTimeline {
    let extended = extensions::decorate_extensions(merged, features, key, theory, config);
    let inverted = inversions::detect_inversions(&extended, features, config);
    let (patterned, patterns, corrections) = pattern_memory::apply_pattern_memory(&inverted, key, config);
    let (smoothed, replacements) = outliers::smooth_outliers(&patterned, texture, config);

    let mut diagnostics: Vec<Diagnostic> = corrections
        .into_iter()
        .map(|c| Diagnostic::PatternCorrection {
            time: c.time,
            from: c.from,
            to: c.to,
        })
        .collect();
    diagnostics.extend(replacements.into_iter().map(|r| Diagnostic::OutlierSmoothed {
        time: r.time,
        from: r.from,
        to: r.to,
    }));

    log::debug!(
        "Refinement: {} -> {} events, {} patterns, {} diagnostics",
        merged.len(),
        smoothed.len(),
        patterns.len(),
        diagnostics.len()
    );
    RefinedTimeline {
        timeline: smoothed,
        patterns,
        diagnostics,
    }
}
