//! Chroma extraction modules
//!
//! Fold magnitude spectra into 12 pitch classes:
//! - Chroma vector computation with register weighting
//! - Normalization and similarity
//! - Energy-weighted averaging over frame spans
//! - Triad evidence scoring

pub mod extractor;
pub mod normalization;
pub mod smoothing;
pub mod triad;

/// Chroma vector: one non-negative value per pitch class
pub type Chroma = [f32; 12];
