//! Error types for core operations.

use thiserror::Error;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the core type layer.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// A date could not be constructed or parsed.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the invalid date.
        message: String,
    },

    /// A schedule could not be generated.
    #[error("Schedule error: {reason}")]
    Schedule {
        /// Description of the failure.
        reason: String,
    },

    /// A calendar operation failed.
    #[error("Calendar error: {reason}")]
    Calendar {
        /// Description of the failure.
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates a schedule error.
    #[must_use]
    pub fn schedule(reason: impl Into<String>) -> Self {
        Self::Schedule {
            reason: reason.into(),
        }
    }

    /// Creates a calendar error.
    #[must_use]
    pub fn calendar(reason: impl Into<String>) -> Self {
        Self::Calendar {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_date("2025-02-30");
        assert!(err.to_string().contains("2025-02-30"));
    }
}
