// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Stream operations backed by a wrapped host object.
//!
//! Each operation holds the global host lock for its whole duration. Host errors cannot be
//! returned through the stream interface; they are handed to the adapter's [`ErrorSink`] and
//! the operation returns its failure sentinel instead.

use std::fmt;
use std::sync::Arc;

use tracing::{Level, event};

use crate::{ErrorSink, FileObject, HostError, HostValue, Operation, Whence, host};

/// Owns exactly one reference to a wrapped host object.
///
/// The reference is acquired on construction and released exactly once: by
/// [`release`](OwnedRef::release) or, failing that, on drop.
pub(crate) struct OwnedRef(Option<FileObject>);

impl OwnedRef {
    pub(crate) fn acquire(file: &FileObject) -> Self {
        let _host = host::acquire();
        Self(Some(Arc::clone(file)))
    }

    fn get(&self) -> Option<&FileObject> {
        self.0.as_ref()
    }

    fn release(&mut self) {
        let _host = host::acquire();
        drop(self.0.take());
    }
}

impl Drop for OwnedRef {
    fn drop(&mut self) {
        if self.0.is_some() {
            event!(Level::TRACE, message = "stream dropped without close, releasing object reference");
            self.release();
        }
    }
}

pub(crate) struct ObjectStream {
    file: OwnedRef,
    sink: Arc<dyn ErrorSink + Send + Sync>,
}

impl ObjectStream {
    pub(crate) fn new(file: OwnedRef, sink: Arc<dyn ErrorSink + Send + Sync>) -> Self {
        Self { file, sink }
    }

    fn report(&self, operation: Operation, error: &HostError) {
        self.sink.report(operation, error);
    }

    /// Reads up to `size * maxnum` bytes, never more than `buf` holds, and returns the number of
    /// bytes copied into `buf`.
    pub(crate) fn read(&mut self, buf: &mut [u8], size: usize, maxnum: usize) -> usize {
        let Some(requested) = size.checked_mul(maxnum) else {
            event!(Level::WARN, message = "read request overflows", size, maxnum);
            return 0;
        };
        let requested = requested.min(buf.len());

        let _host = host::acquire();
        let Some(file) = self.file.get() else {
            return 0;
        };

        let data = match file.read(requested) {
            Ok(HostValue::Bytes(data)) => data,
            Ok(other) => {
                event!(Level::DEBUG, message = "read() returned a non-bytes value", returned = other.type_name());
                return 0;
            }
            Err(error) => {
                self.report(Operation::Read, &error);
                return 0;
            }
        };

        if data.len() > requested {
            event!(
                Level::WARN,
                message = "read() returned more bytes than requested, extra bytes dropped",
                requested,
                returned = data.len()
            );
        }

        let copied = data.len().min(requested);
        buf[..copied].copy_from_slice(&data[..copied]);
        copied
    }

    pub(crate) fn write(&mut self, buf: &[u8], size: usize, num: usize) -> usize {
        let (len, items) = match size.checked_mul(num) {
            Some(requested) if requested <= buf.len() => (requested, num),
            // A short buffer holds fewer whole items than asked for; `size` is non-zero here.
            _ => {
                let items = buf.len() / size;
                (items * size, items)
            }
        };

        let _host = host::acquire();
        let Some(file) = self.file.get() else {
            return 0;
        };

        match file.write(&buf[..len]) {
            Ok(_) => items,
            Err(error) => {
                self.report(Operation::Write, &error);
                0
            }
        }
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: Whence) -> i64 {
        let _host = host::acquire();
        let Some(file) = self.file.get() else {
            return -1;
        };

        let result = match file.seek(offset, whence) {
            // Some objects return nothing from seek; ask for the position instead.
            Ok(HostValue::None) => file.tell().map_err(|error| (Operation::Tell, error)),
            other => other.map_err(|error| (Operation::Seek, error)),
        };

        match result {
            Ok(value) => value.as_position().unwrap_or_else(|| {
                let error = HostError::type_error(format!("an integer is required, got {}", value.type_name()));
                self.report(Operation::Seek, &error);
                -1
            }),
            Err((operation, error)) => {
                self.report(operation, &error);
                -1
            }
        }
    }

    pub(crate) fn close(mut self) -> i32 {
        let _host = host::acquire();
        let Some(file) = self.file.get() else {
            return -1;
        };

        let status = match file.close() {
            Ok(_) => 0,
            Err(error) => {
                self.report(Operation::Close, &error);
                -1
            }
        };

        self.file.release();
        status
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("open", &self.file.get().is_some())
            .finish_non_exhaustive()
    }
}
