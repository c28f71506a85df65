// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A C-compatible stream record for handing streams to native multimedia libraries.
//!
//! [`RawStream`] is field-prefix compatible with an SDL2 `SDL_RWops`: five function slots in the
//! order `size`, `seek`, `read`, `write`, `close`, a `u32` type tag and the two payload pointers
//! of the `hidden.unknown` member. It is not padded to the full size of SDL's `hidden` union, so
//! native code must not copy the record by value or touch other union members. Native code
//! drives the stream only through the slots and releases it by calling `close`.

use std::ffi::{c_int, c_void};
use std::ptr;

use tracing::{Level, event};

use crate::{Stream, StreamKind, Whence};

/// Type tag of records backed by a wrapped host object.
pub const RAW_KIND_UNKNOWN: u32 = 0;

/// Type tag of records backed by a natively opened file.
pub const RAW_KIND_STDFILE: u32 = 2;

type CloseFn = unsafe extern "C" fn(ctx: *mut RawStream) -> c_int;

/// A stream as a C record.
///
/// Create with [`RawStream::into_raw`]. The record owns its [`Stream`] through `data1` and is
/// freed by its own `close` slot.
#[repr(C)]
#[derive(Debug)]
pub struct RawStream {
    /// Returns the size of the stream, or -1.
    pub size: unsafe extern "C" fn(ctx: *mut RawStream) -> i64,

    /// Moves the position (`whence` is `SEEK_SET`, `SEEK_CUR` or `SEEK_END`); returns it, or -1.
    pub seek: unsafe extern "C" fn(ctx: *mut RawStream, offset: i64, whence: c_int) -> i64,

    /// Reads up to `maxnum` items of `size` bytes; returns the number of whole items read.
    pub read: unsafe extern "C" fn(ctx: *mut RawStream, ptr: *mut c_void, size: usize, maxnum: usize) -> usize,

    /// Writes `num` items of `size` bytes; returns `num`, or 0.
    pub write: unsafe extern "C" fn(ctx: *mut RawStream, ptr: *const c_void, size: usize, num: usize) -> usize,

    /// Closes the stream and frees the record; returns 0, or -1.
    pub close: CloseFn,

    /// [`RAW_KIND_UNKNOWN`] or [`RAW_KIND_STDFILE`].
    pub kind: u32,

    /// The owned [`Stream`].
    pub data1: *mut c_void,

    /// Unused, always null.
    pub data2: *mut c_void,
}

impl RawStream {
    /// Moves `stream` into a newly allocated C record.
    ///
    /// The record must eventually be released by calling its `close` slot exactly once.
    #[must_use]
    pub fn into_raw(stream: Stream) -> *mut Self {
        let kind = match stream.kind() {
            StreamKind::NativeFile => RAW_KIND_STDFILE,
            StreamKind::Object => RAW_KIND_UNKNOWN,
        };

        Box::into_raw(Box::new(Self {
            size: raw_size,
            seek: raw_seek,
            read: raw_read,
            write: raw_write,
            close: raw_close,
            kind,
            data1: Box::into_raw(Box::new(stream)).cast(),
            data2: ptr::null_mut(),
        }))
    }
}

/// Returns `true` if `ctx` was created by [`RawStream::into_raw`] from a stream backed by a
/// wrapped host object.
///
/// Records from other libraries are recognized by their `close` slot, whatever their tag.
///
/// # Safety
///
/// `ctx` must be null or point to a live [`RawStream`].
#[must_use]
pub unsafe fn raw_is_object_stream(ctx: *const RawStream) -> bool {
    // SAFETY: The caller guarantees that a non-null `ctx` points to a live record.
    let Some(raw) = (unsafe { ctx.as_ref() }) else {
        return false;
    };

    // Only records whose `close` slot is ours carry a `Stream` in `data1`.
    raw.kind == RAW_KIND_UNKNOWN && ptr::fn_addr_eq(raw.close, raw_close as CloseFn)
}

/// # Safety
///
/// `ctx` must point to a live record created by [`RawStream::into_raw`], not used concurrently.
unsafe fn stream<'a>(ctx: *mut RawStream) -> &'a mut Stream {
    // SAFETY: The caller guarantees `ctx` is live; `data1` of such a record always holds the
    // boxed `Stream` placed there by `into_raw`.
    let data = unsafe { (*ctx).data1 };

    // SAFETY: See above; the stream is exclusively ours for the duration of the slot call.
    unsafe { &mut *data.cast::<Stream>() }
}

unsafe extern "C" fn raw_size(ctx: *mut RawStream) -> i64 {
    // SAFETY: Native callers pass the record the slot was read from.
    unsafe { stream(ctx) }.size()
}

unsafe extern "C" fn raw_seek(ctx: *mut RawStream, offset: i64, whence: c_int) -> i64 {
    let Some(whence) = Whence::from_raw(whence) else {
        return -1;
    };

    // SAFETY: Native callers pass the record the slot was read from.
    unsafe { stream(ctx) }.seek(offset, whence)
}

unsafe extern "C" fn raw_read(ctx: *mut RawStream, ptr: *mut c_void, size: usize, maxnum: usize) -> usize {
    let Some(len) = size.checked_mul(maxnum) else {
        return 0;
    };
    if ptr.is_null() || len == 0 {
        return 0;
    }

    // The caller's buffer may be uninitialized, so it is only ever written through `ptr`.
    let mut buf = Vec::new();
    if buf.try_reserve_exact(len).is_err() {
        event!(Level::WARN, message = "read buffer could not be allocated", len);
        return 0;
    }
    buf.resize(len, 0);

    // SAFETY: Native callers pass the record the slot was read from.
    let copied = unsafe { stream(ctx) }.read_bytes(&mut buf, size, maxnum);

    // SAFETY: The caller provides a writable buffer of at least `size * maxnum` bytes, possibly
    // uninitialized, that does not overlap our own allocation; `copied <= len`.
    unsafe { ptr::copy_nonoverlapping(buf.as_ptr(), ptr.cast::<u8>(), copied) };

    copied / size
}

unsafe extern "C" fn raw_write(ctx: *mut RawStream, ptr: *const c_void, size: usize, num: usize) -> usize {
    let Some(len) = size.checked_mul(num) else {
        return 0;
    };

    let buf: &[u8] = if len == 0 {
        &[]
    } else if ptr.is_null() {
        return 0;
    } else {
        // SAFETY: The caller provides a readable buffer of at least `size * num` bytes.
        unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) }
    };

    // SAFETY: Native callers pass the record the slot was read from.
    unsafe { stream(ctx) }.write(buf, size, num)
}

unsafe extern "C" fn raw_close(ctx: *mut RawStream) -> c_int {
    if ctx.is_null() {
        return -1;
    }

    // SAFETY: The record was allocated by `into_raw` and is released here exactly once.
    let raw = unsafe { Box::from_raw(ctx) };

    // SAFETY: `data1` holds the boxed `Stream` placed there by `into_raw`, still owned by the record.
    let stream = unsafe { Box::from_raw(raw.data1.cast::<Stream>()) };

    stream.close()
}
