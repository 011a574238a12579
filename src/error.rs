//! Error types for the chord analysis engine

use std::fmt;

/// Errors that can occur during chord analysis
///
/// Almost every weak-evidence situation (unpitched frames, ambiguous keys, segments
/// without a convincing chord) resolves internally; only input the engine cannot
/// analyze at all, or a host cancellation, reaches the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (empty audio, zero sample rate, ...)
    InvalidInput(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (non-finite samples, overflow, etc.)
    NumericalError(String),

    /// The host cancelled the analysis at a stage boundary
    Cancelled(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            AnalysisError::Cancelled(stage) => write!(f, "Analysis cancelled before stage: {}", stage),
        }
    }
}

impl std::error::Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::InvalidInput("Empty audio samples".to_string());
        assert_eq!(err.to_string(), "Invalid input: Empty audio samples");

        let err = AnalysisError::Cancelled("decode".to_string());
        assert_eq!(err.to_string(), "Analysis cancelled before stage: decode");
    }
}
