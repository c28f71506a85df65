// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Uniform byte-stream handles over host file-like objects, paths and in-memory buffers.
//!
//! A native multimedia library consumes bytes through one fixed stream interface: read items,
//! write items, seek, measure the size, close. This crate adapts the values a managed host hands
//! over to that interface:
//!
//! * paths (text, byte strings, [`std::path::Path`] and [`PathLike`] objects) are opened
//!   natively for reading, see [`try_open_path`];
//! * host objects implementing [`FileLike`] with `read`, `write` and `seek` are wrapped so that
//!   every stream operation calls back into the object, see [`wrap`];
//! * [`open`] tries the former and falls back to the latter.
//!
//! The resulting [`Stream`] can be used from Rust directly or handed to C code as a
//! [`ffi::RawStream`].
//!
//! Calls into host objects happen under the global host lock (see [`host`]). Errors the host
//! raises inside a stream operation cannot travel through the stream interface; they go to the
//! [`ErrorSink`] configured on the [`Adapter`] and the operation returns its failure value.
//!
//! Text and paths are turned into bytes by [`encode_string`] and [`encode_file_path`], which
//! follow the host's encoding and error-recovery rules.
//!
//! # Examples
//!
//! ```
//! use rwobject::{HostValue, MemoryFile, Whence, open};
//!
//! let buffer = HostValue::object(MemoryFile::with_contents(b"GIF89a".to_vec()));
//!
//! let mut stream = open(&buffer)?;
//! assert!(stream.is_object_stream());
//! assert_eq!(stream.size(), 6);
//!
//! let mut magic = [0_u8; 3];
//! assert_eq!(stream.read(&mut magic, 3, 1), 1);
//! assert_eq!(&magic, b"GIF");
//! assert_eq!(stream.seek(0, Whence::Current), 3);
//! assert_eq!(stream.close(), 0);
//! # Ok::<(), rwobject::Error>(())
//! ```
//!
//! The `test-util` feature enables test doubles for host objects and error sinks. These are in
//! the `testing` module.

mod adapter;
pub mod codec;
mod encode;
mod error;
pub mod ffi;
mod file_like;
pub mod host;
mod host_error;
mod memory_file;
mod object_stream;
mod probe;
mod sink;
mod stream;
mod value;

pub use adapter::{Adapter, AdapterBuilder, open, try_open_path, wrap};
pub use encode::{DEFAULT_ENCODING, DEFAULT_ERRORS, FS_ENCODING, FS_ERRORS, encode_file_path, encode_string};
pub use error::{Error, ErrorClass, Result};
pub use file_like::{Capabilities, FileLike, Whence};
pub use host_error::{HostError, HostErrorKind, HostResult};
pub use memory_file::MemoryFile;
pub use probe::is_stream_capable;
pub use sink::{ErrorSink, LogSink, Operation};
pub use stream::{Stream, StreamKind};
pub use value::{FileObject, HostValue, PathLike};

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
