// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{Capabilities, FileLike, HostError, HostResult, HostValue, MemoryFile, Operation, Whence};

/// A configurable host object for exercising stream behavior.
///
/// Backed by an in-memory buffer. The builder can remove methods from the object, make any
/// method fail, make `seek` return no position and fix the answer of the `seekable` query.
/// Every call is counted.
///
/// This is for test purposes only.
#[derive(Debug)]
pub struct FakeFile {
    inner: MemoryFile,
    capabilities: Capabilities,
    failing: Vec<Operation>,
    seek_returns_none: bool,
    seekable: bool,
    calls: Mutex<HashMap<Operation, usize>>,
    seekable_calls: Mutex<usize>,
}

impl FakeFile {
    /// Starts building a new `FakeFile`.
    #[must_use]
    pub fn builder() -> FakeFileBuilder {
        FakeFileBuilder {
            contents: Vec::new(),
            capabilities: Capabilities::ALL,
            failing: Vec::new(),
            seek_returns_none: false,
            seekable: true,
        }
    }

    /// Creates a well-behaved `FakeFile` holding `contents`.
    #[must_use]
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self::builder().contents(contents).build()
    }

    /// How many times the host method behind `operation` has been called.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.lock().get(&operation).copied().unwrap_or_default()
    }

    /// How many times the `seekable` query has been called.
    #[must_use]
    pub fn seekable_calls(&self) -> usize {
        *self.seekable_calls.lock()
    }

    /// A copy of the whole underlying buffer.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.inner.contents()
    }

    /// Returns `true` once `close` has succeeded.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn enter(&self, operation: Operation) -> HostResult<()> {
        *self.calls.lock().entry(operation).or_default() += 1;

        if self.failing.contains(&operation) {
            Err(HostError::io_error(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }
}

impl FileLike for FakeFile {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn read(&self, size: usize) -> HostResult<HostValue> {
        self.enter(Operation::Read)?;
        self.inner.read(size)
    }

    fn write(&self, data: &[u8]) -> HostResult<HostValue> {
        self.enter(Operation::Write)?;
        self.inner.write(data)
    }

    fn seek(&self, offset: i64, whence: Whence) -> HostResult<HostValue> {
        self.enter(Operation::Seek)?;
        let position = self.inner.seek(offset, whence)?;
        Ok(if self.seek_returns_none { HostValue::None } else { position })
    }

    fn tell(&self) -> HostResult<HostValue> {
        self.enter(Operation::Tell)?;
        self.inner.tell()
    }

    fn seekable(&self) -> HostResult<HostValue> {
        *self.seekable_calls.lock() += 1;
        Ok(HostValue::Bool(self.seekable))
    }

    fn close(&self) -> HostResult<HostValue> {
        self.enter(Operation::Close)?;
        self.inner.close()
    }
}

/// Creates an instance of [`FakeFile`].
///
/// Access through [`FakeFile::builder()`].
#[derive(Debug)]
pub struct FakeFileBuilder {
    contents: Vec<u8>,
    capabilities: Capabilities,
    failing: Vec<Operation>,
    seek_returns_none: bool,
    seekable: bool,
}

impl FakeFileBuilder {
    /// The initial contents of the buffer.
    ///
    /// Optional. Defaults to empty.
    #[must_use]
    pub fn contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = contents.into();
        self
    }

    /// The methods the object exposes.
    ///
    /// Optional. Defaults to [`Capabilities::ALL`].
    #[must_use]
    pub const fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Makes every call of the host method behind `operation` raise an I/O error.
    ///
    /// May be called more than once.
    #[must_use]
    pub fn fail(mut self, operation: Operation) -> Self {
        self.failing.push(operation);
        self
    }

    /// Makes `seek` move the position but return no value, like objects whose `seek` returns
    /// nothing.
    ///
    /// Optional. Defaults to `false`.
    #[must_use]
    pub const fn seek_returns_none(mut self, value: bool) -> Self {
        self.seek_returns_none = value;
        self
    }

    /// The answer of the `seekable` query.
    ///
    /// Optional. Defaults to `true`.
    #[must_use]
    pub const fn seekable(mut self, value: bool) -> Self {
        self.seekable = value;
        self
    }

    /// Builds the `FakeFile`.
    #[must_use]
    pub fn build(self) -> FakeFile {
        FakeFile {
            inner: MemoryFile::with_contents(self.contents),
            capabilities: self.capabilities,
            failing: self.failing,
            seek_returns_none: self.seek_returns_none,
            seekable: self.seekable,
            calls: Mutex::new(HashMap::new()),
            seekable_calls: Mutex::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_calls() {
        let file = FakeFile::new(b"abc".to_vec());
        file.read(1).unwrap();
        file.read(1).unwrap();
        file.seekable().unwrap();

        assert_eq!(file.calls(Operation::Read), 2);
        assert_eq!(file.calls(Operation::Write), 0);
        assert_eq!(file.seekable_calls(), 1);
    }

    #[test]
    fn injected_failures() {
        let file = FakeFile::builder().fail(Operation::Close).fail(Operation::Tell).build();

        assert_eq!(file.close().unwrap_err().message(), "injected close failure");
        assert!(file.tell().is_err());
        assert!(!file.is_closed());
        assert_eq!(file.calls(Operation::Close), 1);
    }

    #[test]
    fn seek_without_result_still_moves() {
        let file = FakeFile::builder().contents(b"abcdef".to_vec()).seek_returns_none(true).build();

        assert!(file.seek(4, Whence::Set).unwrap().is_none());
        assert!(matches!(file.tell().unwrap(), HostValue::Int(4)));
    }

    #[test]
    fn configurable_surface() {
        let file = FakeFile::builder()
            .capabilities(Capabilities::READ)
            .seekable(false)
            .build();

        assert_eq!(file.capabilities(), Capabilities::READ);
        assert!(!file.seekable().unwrap().is_truthy());
    }
}
