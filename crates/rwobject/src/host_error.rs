// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use thiserror::Error;

/// The category of an error raised by a host object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HostErrorKind {
    /// The host ran out of memory while servicing the call.
    OutOfMemory,

    /// A value of the wrong type was supplied or returned.
    Type,

    /// A value had the right type but an unacceptable content.
    Value,

    /// The host object failed to perform I/O.
    Io,

    /// The host object does not expose the requested method.
    MissingMethod,

    /// Anything else.
    Other,
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutOfMemory => "out of memory",
            Self::Type => "type error",
            Self::Value => "value error",
            Self::Io => "I/O error",
            Self::MissingMethod => "missing method",
            Self::Other => "error",
        })
    }
}

/// An error raised by a method of a host object.
///
/// Stream operations cannot return host errors, as the stream interface has no error channel.
/// They are handed to an [`ErrorSink`](crate::ErrorSink) instead.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct HostError {
    kind: HostErrorKind,
    message: String,
}

impl HostError {
    /// Creates a host error of the given kind.
    #[must_use]
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`HostErrorKind::Type`] error.
    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Type, message)
    }

    /// Creates a [`HostErrorKind::Value`] error.
    #[must_use]
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Value, message)
    }

    /// Creates a [`HostErrorKind::Io`] error.
    #[must_use]
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Io, message)
    }

    /// Creates the error raised when an object lacks the method `name`.
    #[must_use]
    pub fn missing_method(name: &str) -> Self {
        Self::new(HostErrorKind::MissingMethod, format!("object has no method '{name}'"))
    }

    /// The category of the error.
    #[must_use]
    pub const fn kind(&self) -> HostErrorKind {
        self.kind
    }

    /// The human-readable message attached to the error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The result of a call into a host object.
pub type HostResult<T> = Result<T, HostError>;
