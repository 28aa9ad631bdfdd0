//! Unified error types for the synthesis pipeline
//!
//! This module provides a common error type [`SynthError`] that can represent
//! errors from any part of the system. Errors raised below the per-synthesis
//! boundary propagate with `?`; the orchestrator converts them into a failed
//! entry of the run report.
//!
//! # Example
//!
//! ```ignore
//! use nwsynth_core::{SynthError, SynthResult};
//!
//! fn load_hydro(deck: &dyn DeckAccessor) -> SynthResult<()> {
//!     let plants = required("confhd", deck.hydro_plants())?;
//!     resolve(&plants)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all synthesis operations.
#[derive(Error, Debug)]
pub enum SynthError {
    /// I/O errors (file access, directory creation, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Table or record validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required static input (registry/deck file) is absent
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The dependency table contains a cycle reachable from the request
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    /// The hydro cascade is not a tree rooted at the outlet
    #[error("Cascade cycle involving plant {0}")]
    CascadeCycle(i32),

    /// A stub rule needed a synthesis that was never cached
    #[error("Synthesis {0} is not cached")]
    NotCached(String),

    /// A per-entity worker failed or did not answer in time
    #[error("Worker error: {0}")]
    Worker(String),

    /// Export collaborator errors
    #[error("Export error: {0}")]
    Export(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SynthError.
pub type SynthResult<T> = Result<T, SynthError>;

impl From<anyhow::Error> for SynthError {
    fn from(err: anyhow::Error) -> Self {
        SynthError::Other(err.to_string())
    }
}

impl From<String> for SynthError {
    fn from(s: String) -> Self {
        SynthError::Other(s)
    }
}

impl From<&str> for SynthError {
    fn from(s: &str) -> Self {
        SynthError::Other(s.to_string())
    }
}

impl From<chrono::ParseError> for SynthError {
    fn from(err: chrono::ParseError) -> Self {
        SynthError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SynthError::MissingInput("patamar.dat".into());
        assert!(err.to_string().contains("Missing required input"));
        assert!(err.to_string().contains("patamar.dat"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SynthError = io_err.into();
        assert!(matches!(err, SynthError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> SynthResult<()> {
            Err(SynthError::Validation("test".into()))
        }

        fn outer() -> SynthResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
