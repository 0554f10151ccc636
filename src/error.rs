//! Error handling for cloudtune.
//!
//! Errors carry a coarse [`ErrorKind`] modelled after gRPC status codes,
//! plus the underlying error for details. Callers branch on the kind and
//! log the rest.
//!
//! Some conditions are deliberately *not* errors:
//! * a zero or missing track duration (the previous duration is kept)
//! * a shuffle that could not avoid a boundary repeat (logged only)
//! * a playback device that goes off while playing (triggers an advance)
//!
//! # Example
//!
//! ```rust
//! use cloudtune::error::{Error, ErrorKind, Result};
//!
//! fn volume(level: f32) -> Result<f32> {
//!     if !(0.0..=1.0).contains(&level) {
//!         return Err(Error::out_of_range(format!("volume {level} not in 0.0..=1.0")));
//!     }
//!     Ok(level)
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

use crate::queue;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for cloudtune operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the original definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// The operation was cancelled, typically because a session shut down.
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// Anything that does not fit another category.
    #[error("unknown error")]
    Unknown = 2,

    /// A malformed request, URI or configuration value.
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// A collaborator did not answer in time.
    #[error("operation timed out")]
    DeadlineExceeded = 4,

    /// A file, track or search option does not exist.
    #[error("not found")]
    NotFound = 5,

    /// The operation needs state that is not there, like an empty queue.
    #[error("invalid state")]
    FailedPrecondition = 9,

    /// A value outside of its valid bounds.
    #[error("out of range")]
    OutOfRange = 11,

    /// The collaborator does not support the request.
    #[error("not implemented")]
    Unimplemented = 12,

    /// The playback device or catalog cannot be reached.
    #[error("service unavailable")]
    Unavailable = 14,
}

impl Error {
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// Useful to recover a [`queue::Error`] after it was converted into
    /// the crate-wide error.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    pub fn deadline_exceeded<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DeadlineExceeded, error)
    }

    /// Creates an error for operations that failed due to current state.
    ///
    /// Use when the player cannot act on its current state, for example
    /// when asked to play from an empty queue.
    pub fn failed_precondition<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::FailedPrecondition, error)
    }

    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    pub fn not_found<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::NotFound, error)
    }

    pub fn out_of_range<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::OutOfRange, error)
    }

    pub fn unavailable<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unavailable, error)
    }

    pub fn unimplemented<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unimplemented, error)
    }

    pub fn unknown<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unknown, error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error as "{kind}: {details}".
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied | AddrNotAvailable | ConnectionRefused | NotConnected => {
                Self::unavailable(err)
            }
            Interrupted | WouldBlock => Self::cancelled(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts queue errors:
/// * `Empty` -> `FailedPrecondition`
/// * `OutOfRange` -> `OutOfRange`
impl From<queue::Error> for Error {
    fn from(err: queue::Error) -> Self {
        match err {
            queue::Error::Empty => Self::failed_precondition(err),
            queue::Error::OutOfRange { .. } => Self::out_of_range(err),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_argument(err)
    }
}

/// Malformed URIs and indices are invalid arguments.
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_argument(err)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Self::invalid_argument(err)
    }
}
