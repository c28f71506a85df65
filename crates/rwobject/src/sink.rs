// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use tracing::{Level, event};

use crate::HostError;

/// The host method whose call failed inside a stream operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Operation {
    /// `read`.
    Read,
    /// `write`.
    Write,
    /// `seek`.
    Seek,
    /// `tell`, called when `seek` returned no position.
    Tell,
    /// `close`.
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Tell => "tell",
            Self::Close => "close",
        })
    }
}

/// Receives host errors that stream operations cannot return.
///
/// The stream interface reports failure only through its return values (0 items read or
/// written, -1 from seek, size and close). Whatever the host raised is handed to the sink of the
/// [`Adapter`](crate::Adapter) that created the stream, while the caller sees the sentinel.
///
/// Sinks are called while the global host lock is held and must not block on it from another
/// thread.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink {
    /// Records that calling `operation` on a wrapped object failed with `error`.
    fn report(&self, operation: Operation, error: &HostError);
}

/// The default [`ErrorSink`], which emits every error as a `tracing` event at `ERROR` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, operation: Operation, error: &HostError) {
        event!(
            Level::ERROR,
            message = "host call failed inside stream operation",
            operation = %operation,
            kind = %error.kind(),
            error = %error.message()
        );
    }
}
