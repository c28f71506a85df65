// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// The error class a caller wants encoding failures reported as.
///
/// Callers of [`encode_string`](crate::encode_string) and
/// [`encode_file_path`](crate::encode_file_path) may name the class of error they expect
/// (for example `"ValueError"` or `"FileNotFoundError"`). Failures that would otherwise be
/// swallowed are then raised as [`Error::Encoding`] or [`Error::NullPath`] tagged with that class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorClass(Cow<'static, str>);

impl ErrorClass {
    /// Creates an error class with the given name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The name of the class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An error raised synchronously while opening a stream or encoding a value.
///
/// Errors that happen inside stream operations are never returned as this type; see
/// [`ErrorSink`](crate::ErrorSink).
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The value is neither an openable path nor a stream-capable object.
    #[error("Invalid filetype object")]
    InvalidType,

    /// Memory was exhausted. Always fatal.
    #[error("out of memory")]
    OutOfMemory,

    /// Text could not be encoded and the caller asked for the failure as `class`.
    #[error("{class}: {message}")]
    Encoding {
        /// The caller-supplied error class.
        class: ErrorClass,
        /// The message of the underlying codec failure.
        message: String,
    },

    /// An encoded file path contains NUL bytes.
    #[error("{class}: File path '{path}' contains null characters")]
    NullPath {
        /// The caller-supplied error class.
        class: ErrorClass,
        /// The offending path, rendered with the default encoding.
        path: String,
    },

    /// An invariant of this crate was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// A textual path could not be opened.
    #[error("No such file or directory.")]
    NotFound(#[source] std::io::Error),
}

impl Error {
    /// The caller-supplied error class, for errors raised on the caller's behalf.
    #[must_use]
    pub const fn class(&self) -> Option<&ErrorClass> {
        match self {
            Self::Encoding { class, .. } | Self::NullPath { class, .. } => Some(class),
            _ => None,
        }
    }
}

/// A specialized `Result` for opening and encoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents the adapter error as a standard I/O error, for callers that only speak `std::io`.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        use std::io::ErrorKind;

        match value {
            Error::NotFound(error) => Self::new(ErrorKind::NotFound, error),
            Error::InvalidType => Self::new(ErrorKind::InvalidInput, value),
            Error::OutOfMemory => Self::new(ErrorKind::OutOfMemory, value),
            Error::Encoding { .. } | Error::NullPath { .. } => Self::new(ErrorKind::InvalidData, value),
            Error::Internal(_) => Self::other(value),
        }
    }
}
