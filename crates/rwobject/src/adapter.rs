// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tracing::{Level, event};

use crate::object_stream::{ObjectStream, OwnedRef};
use crate::probe::probe;
use crate::{Error, ErrorSink, HostValue, LogSink, Result, Stream, encode_string, host};

/// Opens paths and wraps host objects as [`Stream`]s.
///
/// An adapter carries the configuration shared by the streams it creates. The free functions
/// [`open`], [`wrap`] and [`try_open_path`] use [`Adapter::default`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use rwobject::{Adapter, HostValue, LogSink, MemoryFile};
///
/// let adapter = Adapter::builder().error_sink(Arc::new(LogSink)).require_tell(true).build();
///
/// let stream = adapter.open(&HostValue::object(MemoryFile::new()))?;
/// assert!(stream.is_object_stream());
/// # Ok::<(), rwobject::Error>(())
/// ```
#[derive(Clone)]
pub struct Adapter {
    sink: Arc<dyn ErrorSink + Send + Sync>,
    require_tell: bool,
}

impl Adapter {
    /// Starts building an adapter.
    #[must_use]
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::default()
    }

    /// Returns `true` if `obj` is an object that [`wrap`](Adapter::wrap) accepts.
    ///
    /// Never reads or writes data. May call the object's `seekable` query.
    #[must_use]
    pub fn is_stream_capable(&self, obj: Option<&HostValue>) -> bool {
        probe(obj, self.require_tell)
    }

    /// Opens `obj` as a native file if it is a path that can be opened for reading.
    ///
    /// Text, byte strings, paths and path-like objects are treated as paths. Returns `Ok(None)`
    /// when `obj` is absent, is not a path, or names a file that cannot be opened and is not text.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if `obj` is text naming a file that cannot be opened.
    /// * [`Error::OutOfMemory`] if the path could not be encoded for lack of memory.
    pub fn try_open_path(&self, obj: Option<&HostValue>) -> Result<Option<Stream>> {
        let Some(obj) = obj else {
            return Ok(None);
        };

        let Some(encoded) = encode_string(obj, Some("UTF-8"), None, None)? else {
            return Ok(None);
        };

        let path = bytes_to_path(encoded);
        match File::open(&path) {
            Ok(file) => Ok(Some(Stream::native(file, path))),
            Err(error) if obj.is_text() => {
                event!(Level::DEBUG, message = "path could not be opened", path = %path.display(), error = %error);
                Err(Error::NotFound(error))
            }
            Err(error) => {
                event!(Level::DEBUG, message = "path could not be opened, ignoring", path = %path.display(), error = %error);
                Ok(None)
            }
        }
    }

    /// Wraps a stream-capable host object.
    ///
    /// The stream holds its own reference to the object, released when the stream is closed or
    /// dropped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] if `obj` is not stream-capable, see
    /// [`is_stream_capable`](Adapter::is_stream_capable).
    pub fn wrap(&self, obj: &HostValue) -> Result<Stream> {
        let HostValue::Object(file) = obj else {
            return Err(Error::InvalidType);
        };

        if !self.is_stream_capable(Some(obj)) {
            return Err(Error::InvalidType);
        }

        let stream = Stream::object(ObjectStream::new(OwnedRef::acquire(file), Arc::clone(&self.sink)));
        host::init_threads();
        Ok(stream)
    }

    /// Opens `obj` as a path if possible and wraps it as a host object otherwise.
    ///
    /// # Errors
    ///
    /// Any error of [`try_open_path`](Adapter::try_open_path), or [`Error::InvalidType`] if
    /// `obj` is neither an openable path nor a stream-capable object.
    pub fn open(&self, obj: &HostValue) -> Result<Stream> {
        match self.try_open_path(Some(obj))? {
            Some(stream) => Ok(stream),
            None => self.wrap(obj),
        }
    }
}

impl Default for Adapter {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("require_tell", &self.require_tell)
            .finish_non_exhaustive()
    }
}

/// Builds an [`Adapter`].
#[derive(Default)]
pub struct AdapterBuilder {
    sink: Option<Arc<dyn ErrorSink + Send + Sync>>,
    require_tell: bool,
}

impl AdapterBuilder {
    /// Where streams report failures raised by wrapped objects.
    ///
    /// Optional. Defaults to [`LogSink`].
    #[must_use]
    pub fn error_sink(mut self, sink: Arc<dyn ErrorSink + Send + Sync>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Requires wrapped objects to expose `tell` as well as `read`, `write` and `seek`.
    ///
    /// Optional. Defaults to `false`. Enable this for hosts whose objects have no `seekable`
    /// query and whose `seek` may return no position.
    #[must_use]
    pub const fn require_tell(mut self, require_tell: bool) -> Self {
        self.require_tell = require_tell;
        self
    }

    /// Builds the adapter.
    #[must_use]
    pub fn build(self) -> Adapter {
        Adapter {
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
            require_tell: self.require_tell,
        }
    }
}

impl fmt::Debug for AdapterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBuilder")
            .field("require_tell", &self.require_tell)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;

    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn default_adapter() -> &'static Adapter {
    static DEFAULT: OnceLock<Adapter> = OnceLock::new();
    DEFAULT.get_or_init(Adapter::default)
}

/// Opens `obj` as a path if possible and wraps it as a host object otherwise.
///
/// Uses the default [`Adapter`].
///
/// # Errors
///
/// See [`Adapter::open`].
pub fn open(obj: &HostValue) -> Result<Stream> {
    default_adapter().open(obj)
}

/// Wraps a stream-capable host object.
///
/// Uses the default [`Adapter`].
///
/// # Errors
///
/// See [`Adapter::wrap`].
pub fn wrap(obj: &HostValue) -> Result<Stream> {
    default_adapter().wrap(obj)
}

/// Opens `obj` as a native file if it is a path that can be opened for reading.
///
/// Uses the default [`Adapter`].
///
/// # Errors
///
/// See [`Adapter::try_open_path`].
pub fn try_open_path(obj: Option<&HostValue>) -> Result<Option<Stream>> {
    default_adapter().try_open_path(obj)
}
