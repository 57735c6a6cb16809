//! Error types for the Galaxy3D backend
//!
//! Every error is a contract violation surfaced to the caller, either when the
//! offending command is recorded or when the batch holding it is executed.
//! None of them are retried.

use std::fmt;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A handle that was never created, was already destroyed, or is of the wrong kind
    InvalidHandle(String),

    /// A buffer write reaching past the end of its buffer
    OutOfRangeUpdate {
        /// First byte written
        byte_offset: u64,
        /// Number of bytes written
        length: u64,
        /// Size of the target buffer
        buffer_size: u64,
    },

    /// Draw or end outside an active render pass, or begin while already recording
    IllegalStateTransition(String),

    /// The device rejected a command; the rest of the batch was aborted
    SubmissionFailure(String),

    /// Malformed resource descriptor or binding configuration
    InvalidResource(String),
}

impl Error {
    /// Wrap a device-reported error into a submission failure for `command`
    pub(crate) fn submission(command: &str, cause: Error) -> Self {
        match cause {
            Error::SubmissionFailure(msg) => Error::SubmissionFailure(format!("{}: {}", command, msg)),
            other => Error::SubmissionFailure(format!("{}: {}", command, other)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            Error::OutOfRangeUpdate { byte_offset, length, buffer_size } => write!(
                f,
                "Out of range update: {} bytes at offset {} exceeds buffer size {}",
                length, byte_offset, buffer_size
            ),
            Error::IllegalStateTransition(msg) => write!(f, "Illegal state transition: {}", msg),
            Error::SubmissionFailure(msg) => write!(f, "Submission failure: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
