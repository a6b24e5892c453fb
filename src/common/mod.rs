pub mod utility;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The crate-wide error type.
///
/// Storage, locking, and execution all funnel their failures through this
/// enum so that an operator tree can be unwound with `?` all the way to the
/// transaction boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The transaction must be rolled back: it was chosen as a deadlock
    /// victim, or the buffer pool could not make room without evicting an
    /// uncommitted dirty page.
    TransactionAborted,
    /// An internal invariant was violated.
    InvalidData(String),
    /// The caller supplied an argument the engine cannot act on.
    InvalidInput(String),
    /// An index beyond the bounds of a tuple, page, or pool.
    OutOfBounds,
    /// An underlying disk read or write failed.
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransactionAborted => write!(f, "transaction aborted"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::OutOfBounds => write!(f, "index out of bounds"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Constructs an `Err(Error::InvalidInput)` from a format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => {
        Err($crate::common::Error::InvalidInput(format!($($args)*)))
    };
}

/// Constructs an `Err(Error::InvalidData)` from a format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => {
        Err($crate::common::Error::InvalidData(format!($($args)*)))
    };
}

/// Asserts that evaluating the expression panics. Used by tests
/// exercising misuse of APIs whose contracts are enforced by assertion.
#[macro_export]
macro_rules! assert_errors {
    ($expr:expr) => {
        assert!(
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _ = $expr;
            }))
            .is_err(),
            "expected the expression to fail"
        );
    };
}
