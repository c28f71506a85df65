// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::fs::File;
use std::io::{self, ErrorKind, Read as _, Seek as _, SeekFrom};
use std::path::PathBuf;

use tracing::{Level, event};

use crate::Whence;
use crate::object_stream::ObjectStream;

/// What a [`Stream`] is backed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StreamKind {
    /// A file opened natively from a filesystem path.
    NativeFile,

    /// A wrapped host object.
    Object,
}

/// A byte stream with the uniform read/write/seek/size/close contract.
///
/// Streams are produced by [`open`](crate::open), [`wrap`](crate::wrap) and
/// [`try_open_path`](crate::try_open_path), or the same methods of an [`Adapter`](crate::Adapter).
///
/// Operations report failure only through their return values: 0 items for reads and writes,
/// -1 for seeks, sizes and closes. Failures raised by a wrapped host object are handed to the
/// adapter's [`ErrorSink`](crate::ErrorSink).
///
/// A stream should be finished with [`close`](Stream::close). Dropping it instead still releases
/// the wrapped object, but does not call the object's `close` method.
///
/// `Stream` also implements [`std::io::Read`], [`std::io::Write`] and [`std::io::Seek`].
///
/// # Thread safety
///
/// This type is thread-safe. Operations on one stream are serialized by `&mut self`.
pub struct Stream {
    backing: Backing,
}

enum Backing {
    NativeFile(NativeFile),
    Object(ObjectStream),
}

impl Stream {
    pub(crate) fn native(file: File, path: PathBuf) -> Self {
        event!(Level::TRACE, message = "native file stream opened", path = %path.display());
        Self {
            backing: Backing::NativeFile(NativeFile { file, path }),
        }
    }

    pub(crate) fn object(object: ObjectStream) -> Self {
        event!(Level::TRACE, message = "object stream created");
        Self {
            backing: Backing::Object(object),
        }
    }

    /// What this stream is backed by.
    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        match self.backing {
            Backing::NativeFile(_) => StreamKind::NativeFile,
            Backing::Object(_) => StreamKind::Object,
        }
    }

    /// Returns `true` if this stream is backed by a wrapped host object.
    #[must_use]
    pub const fn is_object_stream(&self) -> bool {
        matches!(self.kind(), StreamKind::Object)
    }

    /// Reads up to `maxnum` items of `size` bytes each into `buf`.
    ///
    /// Returns the number of whole items read. Bytes of a trailing partial item are still
    /// copied into `buf`. Returns 0 on failure, at end of stream, or when `size` is 0.
    pub fn read(&mut self, buf: &mut [u8], size: usize, maxnum: usize) -> usize {
        self.read_bytes(buf, size, maxnum).checked_div(size).unwrap_or(0)
    }

    /// Like [`read`](Stream::read), but returns the number of bytes copied into `buf`.
    pub(crate) fn read_bytes(&mut self, buf: &mut [u8], size: usize, maxnum: usize) -> usize {
        match &mut self.backing {
            Backing::NativeFile(file) => file.read(buf, size, maxnum),
            Backing::Object(object) => object.read(buf, size, maxnum),
        }
    }

    /// Writes `num` items of `size` bytes each from `buf`.
    ///
    /// Returns `num` on success and 0 on failure.
    pub fn write(&mut self, buf: &[u8], size: usize, num: usize) -> usize {
        match &mut self.backing {
            // Native files are always opened read-only.
            Backing::NativeFile(_) => {
                event!(Level::DEBUG, message = "write to a read-only native file stream");
                0
            }
            Backing::Object(object) => object.write(buf, size, num),
        }
    }

    /// Moves the stream position and returns the new position, or -1 on failure.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> i64 {
        match &mut self.backing {
            Backing::NativeFile(file) => file.seek(offset, whence),
            Backing::Object(object) => object.seek(offset, whence),
        }
    }

    /// Returns the total size of the stream in bytes, or -1 on failure.
    ///
    /// The size is measured by seeking to the end and back; the position is unchanged afterwards.
    pub fn size(&mut self) -> i64 {
        let position = self.seek(0, Whence::Current);
        if position < 0 {
            return -1;
        }

        let size = self.seek(0, Whence::End);
        if size < 0 {
            return -1;
        }

        if self.seek(position, Whence::Set) < 0 {
            return -1;
        }

        size
    }

    /// Closes the stream, returning 0 on success and -1 on failure.
    ///
    /// The wrapped object is released whether or not closing it succeeded.
    #[must_use = "a failed close is only visible through the returned status"]
    pub fn close(self) -> i32 {
        let status = match self.backing {
            Backing::NativeFile(file) => file.close(),
            Backing::Object(object) => object.close(),
        };

        event!(Level::TRACE, message = "stream closed", status);
        status
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backing {
            Backing::NativeFile(file) => f.debug_struct("Stream").field("path", &file.path).finish(),
            Backing::Object(object) => f.debug_struct("Stream").field("object", object).finish(),
        }
    }
}

struct NativeFile {
    file: File,
    path: PathBuf,
}

impl NativeFile {
    fn read(&mut self, buf: &mut [u8], size: usize, maxnum: usize) -> usize {
        if size == 0 {
            return 0;
        }

        let Some(requested) = size.checked_mul(maxnum) else {
            return 0;
        };
        let wanted = requested.min(buf.len());

        let mut filled = 0;
        while filled < wanted {
            match self.file.read(&mut buf[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => {
                    event!(Level::DEBUG, message = "native read failed", error = %error);
                    break;
                }
            }
        }

        filled
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> i64 {
        let target = match whence {
            Whence::Set => match u64::try_from(offset) {
                Ok(offset) => SeekFrom::Start(offset),
                Err(_) => return -1,
            },
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };

        match self.file.seek(target) {
            Ok(position) => i64::try_from(position).unwrap_or(-1),
            Err(error) => {
                event!(Level::DEBUG, message = "native seek failed", error = %error);
                -1
            }
        }
    }

    fn close(self) -> i32 {
        drop(self.file);
        0
    }
}

impl io::Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(Self::read(self, buf, 1, len))
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        match Self::write(self, buf, 1, buf.len()) {
            0 => Err(io::Error::other("stream write failed")),
            written => Ok(written),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset).map_err(|_| io::Error::new(ErrorKind::InvalidInput, "seek offset out of range"))?,
                Whence::Set,
            ),
            SeekFrom::Current(offset) => (offset, Whence::Current),
            SeekFrom::End(offset) => (offset, Whence::End),
        };

        u64::try_from(Self::seek(self, offset, whence)).map_err(|_| io::Error::other("stream seek failed"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, Write};
    use std::sync::Arc;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::object_stream::OwnedRef;
    use crate::{FileObject, LogSink, MemoryFile};

    fn native_over(contents: &[u8]) -> (Stream, tempfile::NamedTempFile) {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(contents).unwrap();

        let path = temp.path().to_path_buf();
        (Stream::native(File::open(&path).unwrap(), path), temp)
    }

    fn object_over(file: &FileObject) -> Stream {
        Stream::object(ObjectStream::new(OwnedRef::acquire(file), Arc::new(LogSink)))
    }

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Stream: Send, Sync);
    }

    #[test]
    fn kinds() {
        let (native, _temp) = native_over(b"");
        assert_eq!(native.kind(), StreamKind::NativeFile);
        assert!(!native.is_object_stream());

        let file: FileObject = Arc::new(MemoryFile::new());
        let object = object_over(&file);
        assert_eq!(object.kind(), StreamKind::Object);
        assert!(object.is_object_stream());
    }

    #[test]
    fn native_read_counts_whole_items() {
        let (mut stream, _temp) = native_over(b"0123456789");

        let mut buf = [0_u8; 8];
        assert_eq!(stream.read(&mut buf, 4, 2), 2);
        assert_eq!(&buf, b"01234567");

        let mut buf = [0_u8; 8];
        assert_eq!(stream.read(&mut buf, 4, 2), 0);
        assert_eq!(&buf[..2], b"89");
    }

    #[test]
    fn short_buffers_never_lose_data() {
        let (native, _temp) = native_over(b"abcdef");
        let file: FileObject = Arc::new(MemoryFile::with_contents(b"abcdef".to_vec()));

        for mut stream in [native, object_over(&file)] {
            let mut buf = [0_u8; 2];
            assert_eq!(stream.read(&mut buf, 1, 4), 2);
            assert_eq!(&buf, b"ab");
            assert_eq!(stream.seek(0, Whence::Current), 2);

            let mut buf = [0_u8; 3];
            assert_eq!(stream.read(&mut buf, 2, 2), 1);
            assert_eq!(&buf, b"cde");
            assert_eq!(stream.seek(0, Whence::Current), 5);
        }
    }

    #[test]
    fn native_write_fails() {
        let (mut stream, _temp) = native_over(b"abc");
        assert_eq!(stream.write(b"xyz", 1, 3), 0);
    }

    #[test]
    fn native_seek_and_size() {
        let (mut stream, _temp) = native_over(b"0123456789");

        assert_eq!(stream.seek(4, Whence::Set), 4);
        assert_eq!(stream.size(), 10);
        assert_eq!(stream.seek(0, Whence::Current), 4);
        assert_eq!(stream.seek(-2, Whence::End), 8);
        assert_eq!(stream.seek(-1, Whence::Set), -1);
        assert_eq!(stream.close(), 0);
    }

    #[test]
    fn object_size_restores_position() {
        let file: FileObject = Arc::new(MemoryFile::with_contents(b"hello world".to_vec()));
        let mut stream = object_over(&file);

        assert_eq!(stream.seek(6, Whence::Set), 6);
        assert_eq!(stream.size(), 11);
        assert_eq!(stream.seek(0, Whence::Current), 6);
    }

    #[test]
    fn size_fails_when_seek_fails() {
        let file: FileObject = Arc::new(MemoryFile::new());
        let mut stream = object_over(&file);
        file.close().unwrap();

        assert_eq!(stream.size(), -1);
    }

    #[test]
    fn dropping_releases_without_close() {
        let memory = Arc::new(MemoryFile::new());
        let file: FileObject = Arc::<MemoryFile>::clone(&memory);
        let stream = object_over(&file);
        assert_eq!(Arc::strong_count(&memory), 3);

        drop(stream);
        assert_eq!(Arc::strong_count(&memory), 2);
        assert!(!memory.is_closed());
    }

    #[test]
    fn io_traits() {
        let file: FileObject = Arc::new(MemoryFile::new());
        let mut stream = object_over(&file);

        stream.write_all(b"interop").unwrap();
        stream.flush().unwrap();
        assert_eq!(stream.stream_position().unwrap(), 7);

        stream.rewind().unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "interop");

        assert_eq!(Seek::seek(&mut stream, SeekFrom::End(-3)).unwrap(), 4);
        assert!(Seek::seek(&mut stream, SeekFrom::Start(u64::MAX)).is_err());
    }

    #[test]
    fn io_write_reports_failure() {
        let (mut stream, _temp) = native_over(b"");
        let error = Write::write(&mut stream, b"x").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Other);
        assert_eq!(Write::write(&mut stream, b"").unwrap(), 0);
    }

    #[test]
    fn debug_output() {
        let (stream, _temp) = native_over(b"");
        assert!(format!("{stream:?}").starts_with("Stream { path:"));
    }
}
