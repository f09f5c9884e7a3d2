//! Error types for perfilar
//!
//! Two failure classes with different propagation policies:
//! - Recoverable ambiguity (no forward-pass match, unmatched operator) is
//!   absorbed locally as `Option`/defaults and never surfaces here.
//! - Structural contract violations (malformed annotation, malformed
//!   tile/grid sub-structure inside a recognized GEMM name) are fatal and
//!   propagate to `main`, which terminates the process.

use thiserror::Error;

/// Error type for all perfilar operations
#[derive(Debug, Error)]
pub enum PerfilarError {
    /// Input line could not be decoded into a kernel record
    #[error("Malformed kernel record on line {line}: {source}")]
    MalformedRecord {
        /// 1-based input line number
        line: usize,
        /// Underlying JSON decode error
        #[source]
        source: serde_json::Error,
    },

    /// Argument-marker annotation matched the recognized predicate but its
    /// body violates the annotation structure contract
    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),

    /// Unknown element datatype tag inside an annotation
    #[error("Unknown dtype tag: {0:?}")]
    UnknownDtype(String),

    /// Kernel name matched a recognized GEMM pattern but its tile-size token
    /// structure is invalid
    #[error("Malformed CTA tile in kernel name {name:?}: {reason}")]
    MalformedTile {
        /// Offending kernel name
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// Launch grid string is not three comma-separated integers
    #[error("Malformed launch grid {grid:?}")]
    MalformedGrid {
        /// Offending grid string
        grid: String,
    },

    /// A backward-pass record violated the input contract
    #[error("Backward-pass record {index} violates input contract: {reason}")]
    BpropContract {
        /// Ordinal index of the record
        index: usize,
        /// Violated condition
        reason: String,
    },

    /// GEMM shape derived from tile and grid contradicts the cell geometry
    #[error("Inconsistent GEMM shape for kernel {name:?}: {reason}")]
    InconsistentGemm {
        /// Offending kernel name
        name: String,
        /// Violated condition
        reason: String,
    },

    /// Requested output column is not in the column table
    #[error("Unknown output column: {0:?}")]
    UnknownColumn(String),

    /// Selected columns do not fit the requested output width
    #[error("Minimum width required to print {columns} = {required}, got {width}")]
    WidthTooSmall {
        /// Comma-joined selected columns
        columns: String,
        /// Minimum width the selection needs
        required: usize,
        /// Width that was requested
        width: usize,
    },

    /// I/O error while reading records or writing rows
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for perfilar operations
pub type Result<T> = std::result::Result<T, PerfilarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_tile() {
        let err = PerfilarError::MalformedTile {
            name: "volta_sgemm_bad".to_string(),
            reason: "no tile token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("volta_sgemm_bad"));
        assert!(msg.contains("no tile token"));
    }

    #[test]
    fn test_error_display_width() {
        let err = PerfilarError::WidthTooSmall {
            columns: "idx,kernel".to_string(),
            required: 120,
            width: 80,
        };
        assert!(err.to_string().contains("120"));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PerfilarError = io.into();
        assert!(matches!(err, PerfilarError::Io(_)));
    }
}
