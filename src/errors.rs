/*!
 * Error Types
 * Wait outcomes and configuration errors with thiserror and miette support
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result type for wait operations
///
/// `Ok(())` means the waiter was woken by a wake-family call.
pub type WaitResult<T = ()> = Result<T, WaitError>;

/// Wait operation outcomes other than a normal wake
///
/// `ValueMismatch` is the fast path, not a failure: the condition the caller
/// was waiting on already changed before the waiter could be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitError {
    #[error("Butex value did not match the expected value")]
    ValueMismatch,

    #[error("Wait operation timed out")]
    Timeout,

    #[error("Wait was interrupted by a stop request")]
    Interrupted,
}

impl WaitError {
    #[inline]
    pub fn is_value_mismatch(&self) -> bool {
        matches!(self, WaitError::ValueMismatch)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout)
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WaitError::Interrupted)
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Unknown wait strategy: {0}")]
    #[diagnostic(
        code(butex::config::unknown_strategy),
        help("Use one of: futex, condvar, spin, auto.")
    )]
    UnknownStrategy(String),

    #[error("Invalid number for {var}: {value}")]
    #[diagnostic(
        code(butex::config::invalid_number),
        help("Expected a non-negative integer.")
    )]
    InvalidNumber { var: &'static str, value: String },
}
