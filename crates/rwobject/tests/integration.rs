// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#![allow(clippy::missing_panics_doc, reason = "Tests")]
#![allow(missing_docs, reason = "Tests")]
#![allow(clippy::assertions_on_result_states, reason = "Tests use assert!(x.is_err()) for clarity")]

use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use rwobject::{
    Adapter, Capabilities, Error, ErrorClass, ErrorSink, FileLike, FileObject, HostError, HostResult, HostValue, MemoryFile,
    Operation, StreamKind, Whence, encode_file_path, encode_string, is_stream_capable, open, try_open_path, wrap,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A buffer whose `close` may fail and whose `seek` may return nothing.
#[derive(Default)]
struct Quirky {
    buffer: MemoryFile,
    failing_close: bool,
    silent_seek: bool,
    closes: AtomicUsize,
    tells: AtomicUsize,
}

impl FileLike for Quirky {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn read(&self, size: usize) -> HostResult<HostValue> {
        self.buffer.read(size)
    }

    fn write(&self, data: &[u8]) -> HostResult<HostValue> {
        self.buffer.write(data)
    }

    fn seek(&self, offset: i64, whence: Whence) -> HostResult<HostValue> {
        let position = self.buffer.seek(offset, whence)?;
        Ok(if self.silent_seek { HostValue::None } else { position })
    }

    fn tell(&self) -> HostResult<HostValue> {
        self.tells.fetch_add(1, Ordering::SeqCst);
        self.buffer.tell()
    }

    fn seekable(&self) -> HostResult<HostValue> {
        self.buffer.seekable()
    }

    fn close(&self) -> HostResult<HostValue> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.failing_close {
            return Err(HostError::io_error("flush failed"));
        }
        self.buffer.close()
    }
}

#[derive(Default)]
struct CollectingSink(Mutex<Vec<Operation>>);

impl ErrorSink for CollectingSink {
    fn report(&self, operation: Operation, _error: &HostError) {
        self.0.lock().push(operation);
    }
}

fn object(file: &Arc<Quirky>) -> HostValue {
    let file: FileObject = Arc::<Quirky>::clone(file);
    HostValue::Object(file)
}

// ===========================================================================
// Object streams
// ===========================================================================

mod object_streams {
    use super::*;

    #[test]
    fn write_seek_read_round_trip() {
        let mut stream = wrap(&HostValue::object(MemoryFile::new())).unwrap();

        assert_eq!(stream.write(b"abc", 1, 3), 3);
        assert_eq!(stream.seek(0, Whence::Set), 0);

        let mut buf = [0_u8; 3];
        assert_eq!(stream.read(&mut buf, 1, 3), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(stream.close(), 0);
    }

    #[test]
    fn buffers_of_any_size_round_trip() {
        let large: Vec<u8> = (0..10_000_u32).map(|i| u8::try_from(i % 251).unwrap()).collect();

        for data in [&b""[..], b"\0", b"\xff\xfe binary \0 data", large.as_slice()] {
            let mut stream = wrap(&HostValue::object(MemoryFile::new())).unwrap();

            assert_eq!(stream.write(data, 1, data.len()), data.len());
            assert_eq!(stream.size(), i64::try_from(data.len()).unwrap());
            assert_eq!(stream.seek(0, Whence::Current), i64::try_from(data.len()).unwrap());
            assert_eq!(stream.seek(0, Whence::Set), 0);

            let mut back = vec![0_u8; data.len()];
            assert_eq!(stream.read(&mut back, 1, data.len()), data.len());
            assert_eq!(back, data);
            assert_eq!(stream.close(), 0);
        }
    }

    #[test]
    fn close_calls_host_once_and_releases_reference() {
        let file = Arc::new(Quirky::default());
        let stream = wrap(&object(&file)).unwrap();
        assert_eq!(Arc::strong_count(&file), 2);

        assert_eq!(stream.close(), 0);
        assert_eq!(file.closes.load(Ordering::SeqCst), 1);
        assert_eq!(Arc::strong_count(&file), 1);
    }

    #[test]
    fn failed_close_still_releases_reference() {
        let file = Arc::new(Quirky {
            failing_close: true,
            ..Quirky::default()
        });
        let sink = Arc::new(CollectingSink::default());
        let adapter = Adapter::builder().error_sink(Arc::<CollectingSink>::clone(&sink)).build();

        let stream = adapter.wrap(&object(&file)).unwrap();
        assert_eq!(stream.close(), -1);
        assert_eq!(file.closes.load(Ordering::SeqCst), 1);
        assert_eq!(Arc::strong_count(&file), 1);
        assert_eq!(*sink.0.lock(), [Operation::Close]);
    }

    #[test]
    fn drop_releases_reference_without_closing() {
        let file = Arc::new(Quirky::default());
        drop(wrap(&object(&file)).unwrap());

        assert_eq!(file.closes.load(Ordering::SeqCst), 0);
        assert_eq!(Arc::strong_count(&file), 1);
    }

    #[test]
    fn size_does_not_move_position() {
        let mut stream = wrap(&HostValue::object(MemoryFile::with_contents(b"0123456789".to_vec()))).unwrap();

        assert_eq!(stream.seek(3, Whence::Set), 3);
        assert_eq!(stream.size(), 10);
        assert_eq!(stream.seek(0, Whence::Current), 3);
    }

    #[test]
    fn seek_falls_back_to_tell() {
        let file = Arc::new(Quirky {
            silent_seek: true,
            ..Quirky::default()
        });
        file.buffer.write(b"0123456789").unwrap();

        let mut stream = wrap(&object(&file)).unwrap();
        assert_eq!(stream.seek(4, Whence::Set), 4);
        assert_eq!(stream.size(), 10);
        assert!(file.tells.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn closed_buffers_are_rejected() {
        let buffer = MemoryFile::new();
        buffer.close().unwrap();
        assert!(matches!(wrap(&HostValue::object(buffer)), Err(Error::InvalidType)));
    }

    #[test]
    fn failures_return_sentinels() {
        let file = Arc::new(Quirky::default());
        let mut stream = wrap(&object(&file)).unwrap();
        file.buffer.close().unwrap();

        let mut buf = [0_u8; 4];
        assert_eq!(stream.read(&mut buf, 1, 4), 0);
        assert_eq!(stream.write(b"abcd", 2, 2), 0);
        assert_eq!(stream.seek(0, Whence::Set), -1);
        assert_eq!(stream.size(), -1);
    }

    #[test]
    fn std_io_interop() {
        let mut stream = open(&HostValue::object(MemoryFile::new())).unwrap();
        write!(stream, "hello {}", 42).unwrap();

        std::io::Seek::rewind(&mut stream).unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello 42");
    }

    #[test]
    fn streams_are_usable_from_other_threads() {
        let buffer = Arc::new(MemoryFile::new());
        let file: FileObject = Arc::<MemoryFile>::clone(&buffer);
        let value = HostValue::Object(file);

        let handles: Vec<_> = (0..4_u8)
            .map(|i| {
                let value = value.clone();
                thread::spawn(move || {
                    let mut stream = wrap(&value).unwrap();

                    // Keeps the seek and the write together; the lock is re-entrant.
                    let _host = rwobject::host::acquire();
                    assert_eq!(stream.seek(i64::from(i), Whence::Set), i64::from(i));
                    assert_eq!(stream.write(&[b'a' + i], 1, 1), 1);
                    stream
                })
            })
            .collect();

        for handle in handles {
            drop(handle.join().unwrap());
        }

        assert_eq!(buffer.contents(), b"abcd");
        assert_eq!(Arc::strong_count(&buffer), 2);
    }
}

// ===========================================================================
// Capability probing
// ===========================================================================

mod probing {
    use super::*;

    struct ReadOnly;

    impl FileLike for ReadOnly {
        fn capabilities(&self) -> Capabilities {
            Capabilities::READ | Capabilities::SEEK | Capabilities::TELL
        }

        fn read(&self, _size: usize) -> HostResult<HostValue> {
            panic!("probing must not read")
        }

        fn write(&self, _data: &[u8]) -> HostResult<HostValue> {
            panic!("probing must not write")
        }

        fn seek(&self, _offset: i64, _whence: Whence) -> HostResult<HostValue> {
            panic!("probing must not seek")
        }
    }

    #[test]
    fn only_capable_objects_qualify() {
        assert!(!is_stream_capable(None));
        assert!(!is_stream_capable(Some(&HostValue::from("image.png"))));
        assert!(!is_stream_capable(Some(&HostValue::object(ReadOnly))));
        assert!(is_stream_capable(Some(&HostValue::object(MemoryFile::new()))));
    }

    #[test]
    fn wrap_rejects_what_the_probe_rejects() {
        let error = wrap(&HostValue::object(ReadOnly)).unwrap_err();
        assert_eq!(error.to_string(), "Invalid filetype object");
    }
}

// ===========================================================================
// Paths
// ===========================================================================

mod paths {
    use super::*;

    fn file_with(contents: &[u8]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::File::create(&path).unwrap().write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_text_path_is_not_found() {
        let error = try_open_path(Some(&HostValue::from("/nonexistent/file"))).unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert_eq!(std::io::Error::from(error).kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn non_paths_are_not_opened() {
        assert!(try_open_path(Some(&HostValue::Int(12345))).unwrap().is_none());
        assert!(try_open_path(None).unwrap().is_none());
    }

    #[test]
    fn open_reads_native_files() {
        let (_dir, path) = file_with(b"\x89PNG\r\n");

        let mut stream = open(&HostValue::from(path.to_str().unwrap())).unwrap();
        assert_eq!(stream.kind(), StreamKind::NativeFile);
        assert!(!stream.is_object_stream());
        assert_eq!(stream.size(), 6);

        let mut magic = [0_u8; 4];
        assert_eq!(stream.read(&mut magic, 4, 1), 1);
        assert_eq!(&magic, b"\x89PNG");
        assert_eq!(stream.write(b"x", 1, 1), 0);
        assert_eq!(stream.close(), 0);
    }

    #[test]
    fn open_accepts_byte_paths() {
        let (_dir, path) = file_with(b"bytes");
        let bytes = path.to_str().unwrap().as_bytes().to_vec();

        let stream = open(&HostValue::from(bytes)).unwrap();
        assert_eq!(stream.kind(), StreamKind::NativeFile);
    }

    #[test]
    fn embedded_nul_is_not_truncated() {
        let (_dir, path) = file_with(b"real");
        let text = format!("{}\0junk", path.to_str().unwrap());

        let error = try_open_path(Some(&HostValue::from(text.as_str()))).unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert!(try_open_path(Some(&HostValue::from(text.into_bytes()))).unwrap().is_none());
    }

    #[test]
    fn open_rejects_everything_else() {
        assert!(matches!(open(&HostValue::Int(1)), Err(Error::InvalidType)));
        assert!(matches!(open(&HostValue::from("/nonexistent/file")), Err(Error::NotFound(_))));
    }
}

// ===========================================================================
// Encoding
// ===========================================================================

mod encoding {
    use super::*;

    #[test]
    fn non_text_encodes_to_nothing() {
        assert_eq!(encode_string(&HostValue::Int(12345), None, None, None).unwrap(), None);
    }

    #[test]
    fn default_encoding_escapes() {
        let encoded = encode_string(&HostValue::from("na\u{ef}ve \u{1f600}"), None, None, None).unwrap();
        assert_eq!(encoded.as_deref(), Some(&br"na\xefve \U0001f600"[..]));
    }

    #[test]
    fn requested_class_is_used_for_failures() {
        let class = ErrorClass::new("UnicodeEncodeError");
        let error = encode_string(&HostValue::from("\u{e9}"), Some("ascii"), Some("strict"), Some(&class)).unwrap_err();
        assert_eq!(error.class(), Some(&class));
    }

    #[test]
    fn file_path_with_nul() {
        let value = HostValue::from("a\0b");

        assert_eq!(encode_file_path(&value, None).unwrap(), None);

        let error = encode_file_path(&value, Some(&ErrorClass::new("ValueError"))).unwrap_err();
        assert_eq!(
            error.to_string(),
            r"ValueError: File path 'a\x00b' contains null characters"
        );
    }

    #[test]
    fn file_path_of_plain_path() {
        let encoded = encode_file_path(&HostValue::from(PathBuf::from("images/logo.png")), None).unwrap();
        assert_eq!(encoded.as_deref(), Some(&b"images/logo.png"[..]));
    }
}
