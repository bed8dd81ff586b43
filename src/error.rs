//! Error types for batchr

use thiserror::Error;

/// Result type alias using batchr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in batchr operations
///
/// Numerical singularity is not an error: singular matrices are reported
/// through the per-matrix `info` output while the call returns `Ok`. The
/// variants here cover the argument and resource failures that abort a call
/// before any output is written.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unsupported argument value (e.g. a transpose mode the
    /// precision does not support)
    #[error("Invalid value for '{arg}': {reason}")]
    InvalidValue {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Inconsistent problem dimensions or strides
    #[error("Invalid size for '{arg}': {reason}")]
    InvalidSize {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A required buffer is missing or too small for the problem extent
    #[error("Invalid buffer for '{arg}': missing or shorter than the problem extent")]
    InvalidPointer {
        /// The argument name
        arg: &'static str,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Feature not yet implemented
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },
}

impl Error {
    /// Create an invalid value error
    pub fn invalid_value(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid size error
    pub fn invalid_size(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSize {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid buffer error
    pub fn invalid_pointer(arg: &'static str) -> Self {
        Self::InvalidPointer { arg }
    }
}
