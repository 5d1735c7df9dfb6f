//! Error types and result utilities for onset and beat extraction.
//!
//! Configuration problems surface as [`ParameterError`], incompatible array
//! shapes or channel layouts as [`LayoutError`]. Both are wrapped by the
//! top-level [`AudioEventError`] so that every fallible operation in the crate
//! returns an [`AudioEventResult`].

use thiserror::Error;

/// Convenience type alias for results that may contain an [`AudioEventError`].
pub type AudioEventResult<T> = Result<T, AudioEventError>;

/// Error types that can occur while extracting events from audio.
#[derive(Error, Debug)]
pub enum AudioEventError {
    /// An invalid parameter or configuration value was supplied.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Arrays used together do not have compatible shapes or layouts.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Reading or writing persisted activations or events failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted text file could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending entry.
        line: usize,
        /// Description of what failed to parse.
        message: String,
    },
}

impl AudioEventError {
    /// Create a new parse error.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised for invalid parameters.
///
/// These are never corrected silently: a frame size of zero, a filterbank with
/// fewer than three usable frequencies or an inverted tempo range fail at
/// construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter has a value that is invalid for the operation.
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        /// Name of the parameter.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A numeric parameter lies outside its permitted range.
    #[error("Parameter '{parameter}' = {value} is out of range [{min}, {max}]: {reason}")]
    OutOfRange {
        /// Name of the parameter.
        parameter: String,
        /// The offending value, formatted.
        value: String,
        /// Lower bound, formatted.
        min: String,
        /// Upper bound, formatted.
        max: String,
        /// Why the range applies.
        reason: String,
    },
}

impl ParameterError {
    /// Create a new invalid value error.
    pub fn invalid_value(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create a new out of range error.
    pub fn out_of_range(
        parameter: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            parameter: parameter.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised when array shapes or channel layouts are incompatible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Two arrays that must be used jointly have different shapes.
    #[error("Shape mismatch in {operation}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The operation that detected the mismatch.
        operation: String,
        /// The expected shape, formatted.
        expected: String,
        /// The shape actually received, formatted.
        actual: String,
    },

    /// The operation does not support the signal's channel count.
    #[error("{operation} does not support {num_channels} channels")]
    UnsupportedChannels {
        /// The operation that was attempted.
        operation: String,
        /// Number of channels of the offending signal.
        num_channels: usize,
    },
}

impl LayoutError {
    /// Create a new shape mismatch error.
    pub fn shape_mismatch(
        operation: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            operation: operation.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    /// Create a new unsupported channel count error.
    pub fn unsupported_channels(operation: impl Into<String>, num_channels: usize) -> Self {
        Self::UnsupportedChannels {
            operation: operation.into(),
            num_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_converts_into_top_level() {
        let err: AudioEventError = ParameterError::invalid_value("hop_size", "must be > 0").into();
        assert!(matches!(err, AudioEventError::Parameter(_)));
        assert_eq!(err.to_string(), "Invalid value for 'hop_size': must be > 0");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = LayoutError::shape_mismatch("phase_deviation", (10, 5), (10, 4));
        assert_eq!(
            err.to_string(),
            "Shape mismatch in phase_deviation: expected (10, 5), got (10, 4)"
        );
    }
}
