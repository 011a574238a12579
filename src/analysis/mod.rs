//! Analysis result aggregation modules
//!
//! Types that cross stage boundaries:
//! - Result bundle and key
//! - Chord timeline
//! - Stage progress and diagnostics

pub mod diagnostics;
pub mod result;
pub mod timeline;
