// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Level, event};

use crate::{FileLike, HostResult};

/// A shared, reference-counted host object that may back a stream.
///
/// Cloning the `Arc` acquires a reference to the object, dropping it releases one.
pub type FileObject = Arc<dyn FileLike + Send + Sync>;

/// A host object that has a filesystem path representation.
///
/// This is the counterpart of the `os.PathLike` protocol: [`fspath`](PathLike::fspath) returns the
/// path as [`HostValue::Text`] or [`HostValue::Bytes`].
#[cfg_attr(test, mockall::automock)]
pub trait PathLike {
    /// Returns the filesystem representation of the object.
    ///
    /// # Errors
    ///
    /// Any error the host object raises while producing its path.
    fn fspath(&self) -> HostResult<HostValue>;
}

/// A dynamically typed value handed to the adapter by the host.
///
/// The adapter accepts anything the host can produce and decides by inspecting the value whether
/// it is usable as a path, as text to encode or as a stream-capable object.
#[derive(Clone, Default)]
#[non_exhaustive]
pub enum HostValue {
    /// The "no value" sentinel.
    #[default]
    None,

    /// A boolean.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// Text.
    Text(String),

    /// A byte string.
    Bytes(Vec<u8>),

    /// A filesystem path.
    Path(PathBuf),

    /// An object implementing [`PathLike`].
    PathLike(Arc<dyn PathLike + Send + Sync>),

    /// An object implementing [`FileLike`].
    Object(FileObject),
}

impl HostValue {
    /// Wraps a file-like object.
    #[must_use]
    pub fn object(file: impl FileLike + Send + Sync + 'static) -> Self {
        Self::Object(Arc::new(file))
    }

    /// Wraps a path-like object.
    #[must_use]
    pub fn path_like(path: impl PathLike + Send + Sync + 'static) -> Self {
        Self::PathLike(Arc::new(path))
    }

    /// Returns `true` for the "no value" sentinel.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the value is text.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Interprets the value as a boolean the way the host does.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Text(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::Path(_) | Self::PathLike(_) | Self::Object(_) => true,
        }
    }

    /// Interprets the value as a stream position.
    ///
    /// Returns `None` for non-numeric values.
    #[must_use]
    pub const fn as_position(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// A short name of the value's type, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Path(_) => "path",
            Self::PathLike(_) => "path-like object",
            Self::Object(_) => "file-like object",
        }
    }

    /// Converts a path or path-like object into its text or bytes representation.
    ///
    /// Values without a filesystem representation are returned unchanged. A path-like object
    /// whose conversion fails, or produces something other than text or bytes, is treated as
    /// having no filesystem representation.
    #[must_use]
    pub fn fspath(&self) -> Cow<'_, Self> {
        match self {
            Self::Path(path) => Cow::Owned(path_to_value(path)),
            Self::PathLike(path_like) => match path_like.fspath() {
                Ok(value @ (Self::Text(_) | Self::Bytes(_))) => Cow::Owned(value),
                Ok(other) => {
                    event!(
                        Level::DEBUG,
                        message = "path-like object returned a non-path value",
                        returned = other.type_name()
                    );
                    Cow::Borrowed(self)
                }
                Err(error) => {
                    event!(Level::DEBUG, message = "path-like conversion failed", error = %error);
                    Cow::Borrowed(self)
                }
            },
            _ => Cow::Borrowed(self),
        }
    }
}

#[cfg(unix)]
fn path_to_value(path: &std::path::Path) -> HostValue {
    use std::os::unix::ffi::OsStrExt;

    match path.to_str() {
        Some(text) => HostValue::Text(text.to_owned()),
        None => HostValue::Bytes(path.as_os_str().as_bytes().to_vec()),
    }
}

#[cfg(not(unix))]
fn path_to_value(path: &std::path::Path) -> HostValue {
    HostValue::Text(path.to_string_lossy().into_owned())
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::PathLike(_) => f.write_str("PathLike(..)"),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for HostValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<PathBuf> for HostValue {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&std::path::Path> for HostValue {
    fn from(value: &std::path::Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<FileObject> for HostValue {
    fn from(value: FileObject) -> Self {
        Self::Object(value)
    }
}
