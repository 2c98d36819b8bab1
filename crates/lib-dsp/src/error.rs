//! Error types for DSP operations.

use thiserror::Error;

/// Errors that can occur during DSP operations.
///
/// Every failure is local and synchronous: the operation returns early
/// and leaves engine state as it was before the call.
#[derive(Debug, Error)]
pub enum DspError {
    /// A parameter is outside its documented range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Input length mismatch.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A buffer required by the operation was never loaded.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A value lies outside the mathematical domain of the operation.
    #[error("Numeric domain error: {0}")]
    NumericDomain(String),
}

/// Coarse classification of a [`DspError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad range, type, or incompatible array sizes.
    InvalidParameter,
    /// An operation needs a buffer that was never loaded.
    MissingData,
    /// E.g. a logarithmic ADC receiving a non-positive sample.
    NumericDomain,
}

impl DspError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. }
            | Self::LengthMismatch { .. }
            | Self::InsufficientData { .. } => ErrorKind::InvalidParameter,
            Self::MissingData(_) => ErrorKind::MissingData,
            Self::NumericDomain(_) => ErrorKind::NumericDomain,
        }
    }
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(
            DspError::LengthMismatch { expected: 3, actual: 2 }.kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            DspError::InsufficientData { needed: 2, got: 1 }.kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(DspError::missing("waveform").kind(), ErrorKind::MissingData);
        assert_eq!(
            DspError::NumericDomain("log of -1".into()).kind(),
            ErrorKind::NumericDomain
        );
    }

    #[test]
    fn test_messages() {
        let err = DspError::invalid("fcut", "must lie in (0, 0.5), got 0.7");
        assert_eq!(err.to_string(), "Invalid parameter `fcut`: must lie in (0, 0.5), got 0.7");
    }
}
