// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

use crate::{Capabilities, FileLike, HostError, HostErrorKind, HostResult, HostValue, Whence};

const CLOSED: &str = "I/O operation on closed file.";

/// An in-memory byte buffer host object.
///
/// Behaves like a seekable binary buffer of the host: reads past the end return empty bytes,
/// writes past the end pad the gap with zeros, and any operation on a closed buffer raises a
/// value error.
///
/// # Examples
///
/// ```
/// use rwobject::{HostValue, MemoryFile, Whence, wrap};
///
/// let mut stream = wrap(&HostValue::object(MemoryFile::new()))?;
/// assert_eq!(stream.write(b"abc", 1, 3), 3);
/// assert_eq!(stream.seek(0, Whence::Set), 0);
///
/// let mut buf = [0_u8; 3];
/// assert_eq!(stream.read(&mut buf, 1, 3), 3);
/// assert_eq!(&buf, b"abc");
/// assert_eq!(stream.close(), 0);
/// # Ok::<(), rwobject::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryFile {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    contents: Vec<u8>,
    position: usize,
    closed: bool,
}

impl State {
    fn open(&mut self) -> HostResult<&mut Self> {
        if self.closed {
            Err(HostError::value_error(CLOSED))
        } else {
            Ok(self)
        }
    }
}

impl MemoryFile {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding `contents`, positioned at the start.
    #[must_use]
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(State {
                contents: contents.into(),
                ..State::default()
            }),
        }
    }

    /// A copy of the whole buffer, regardless of the position.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().contents.clone()
    }

    /// Returns `true` once the buffer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

fn position_value(position: usize) -> HostResult<HostValue> {
    i64::try_from(position)
        .map(HostValue::Int)
        .map_err(|_| HostError::new(HostErrorKind::Other, "position out of range"))
}

impl FileLike for MemoryFile {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn read(&self, size: usize) -> HostResult<HostValue> {
        let mut guard = self.state.lock();
        let state = guard.open()?;

        let start = state.position.min(state.contents.len());
        let end = start.saturating_add(size).min(state.contents.len());
        state.position = state.position.max(end);

        Ok(HostValue::Bytes(state.contents[start..end].to_vec()))
    }

    fn write(&self, data: &[u8]) -> HostResult<HostValue> {
        let mut guard = self.state.lock();
        let state = guard.open()?;

        let end = state
            .position
            .checked_add(data.len())
            .ok_or_else(|| HostError::new(HostErrorKind::OutOfMemory, "buffer size overflow"))?;

        if state.contents.len() < end {
            state.contents.resize(end, 0);
        }
        state.contents[state.position..end].copy_from_slice(data);
        state.position = end;

        position_value(data.len())
    }

    fn seek(&self, offset: i64, whence: Whence) -> HostResult<HostValue> {
        let mut guard = self.state.lock();
        let state = guard.open()?;

        let base = match whence {
            Whence::Set => {
                if offset < 0 {
                    return Err(HostError::value_error(format!("negative seek value {offset}")));
                }
                0
            }
            Whence::Current => state.position,
            Whence::End => state.contents.len(),
        };

        let base = i64::try_from(base).map_err(|_| HostError::value_error("position out of range"))?;
        // Relative seeks before the start stop at the start.
        let target = base.saturating_add(offset).max(0);
        state.position = usize::try_from(target).map_err(|_| HostError::value_error("position out of range"))?;

        Ok(HostValue::Int(target))
    }

    fn tell(&self) -> HostResult<HostValue> {
        let mut guard = self.state.lock();
        let state = guard.open()?;
        position_value(state.position)
    }

    fn seekable(&self) -> HostResult<HostValue> {
        let mut guard = self.state.lock();
        guard.open()?;
        Ok(HostValue::Bool(true))
    }

    fn close(&self) -> HostResult<HostValue> {
        self.state.lock().closed = true;
        Ok(HostValue::None)
    }
}
