//! Stage construction errors.

use thiserror::Error;

/// Reasons an analysis stage could not be built or reconfigured.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// A mode, method, or unit token was not recognised.
    #[error("unknown {kind} '{token}'")]
    UnknownMode {
        /// What the token selects (e.g. "onset mode").
        kind: &'static str,
        /// The rejected token.
        token: String,
    },

    /// A size or rate parameter is out of range.
    #[error("invalid {what}: {value}")]
    InvalidSize {
        /// Name of the parameter.
        what: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// The operation requires a filter of a specific order.
    #[error("filter order {actual} does not support this design (need order {expected})")]
    InvalidOrder {
        /// Order the design needs.
        expected: usize,
        /// Order of the filter.
        actual: usize,
    },

    /// A frequency range is empty or lies outside `[0, nyquist]`.
    #[error("invalid frequency range {low}..{high} Hz")]
    InvalidRange {
        /// Lower edge in Hz.
        low: f32,
        /// Upper edge in Hz.
        high: f32,
    },
}

impl StageError {
    /// Create an unknown-mode error.
    pub fn unknown_mode(kind: &'static str, token: impl Into<String>) -> Self {
        StageError::UnknownMode {
            kind,
            token: token.into(),
        }
    }

    /// Create an invalid-size error.
    pub fn invalid_size(what: &'static str, value: usize) -> Self {
        StageError::InvalidSize { what, value }
    }
}
