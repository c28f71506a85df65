// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::{HostError, HostResult, HostValue};

/// The reference point of a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Whence {
    /// Relative to the start of the stream.
    Set = 0,

    /// Relative to the current position.
    Current = 1,

    /// Relative to the end of the stream.
    End = 2,
}

impl Whence {
    /// Converts the raw `SEEK_SET`/`SEEK_CUR`/`SEEK_END` value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Set),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }

    /// The raw `SEEK_*` value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

/// The set of methods a [`FileLike`] object exposes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No methods.
    pub const NONE: Self = Self(0);
    /// `read`.
    pub const READ: Self = Self(1);
    /// `write`.
    pub const WRITE: Self = Self(1 << 1);
    /// `seek`.
    pub const SEEK: Self = Self(1 << 2);
    /// `tell`.
    pub const TELL: Self = Self(1 << 3);
    /// The `seekable` query.
    pub const SEEKABLE: Self = Self(1 << 4);
    /// `close`.
    pub const CLOSE: Self = Self(1 << 5);
    /// Every method.
    pub const ALL: Self = Self(0b11_1111);

    /// Returns `true` if every method in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the methods in either set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Capabilities, &str); 6] = [
            (Capabilities::READ, "read"),
            (Capabilities::WRITE, "write"),
            (Capabilities::SEEK, "seek"),
            (Capabilities::TELL, "tell"),
            (Capabilities::SEEKABLE, "seekable"),
            (Capabilities::CLOSE, "close"),
        ];

        f.debug_set()
            .entries(NAMES.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| name))
            .finish()
    }
}

/// A host object that can back a stream.
///
/// Implementations declare through [`capabilities`](FileLike::capabilities) which methods they
/// really expose. The adapter only calls methods that are declared; the defaults of the optional
/// methods raise a "missing method" error.
///
/// Every method takes `&self`: host objects are shared and reference counted, so any mutable
/// state lives behind interior mutability. Calls made by the adapter always happen while the
/// global host lock is held.
///
/// Methods return [`HostValue`]s rather than typed results because the host is free to return
/// anything. The adapter validates what it gets back.
#[cfg_attr(test, mockall::automock)]
pub trait FileLike {
    /// The methods this object exposes.
    fn capabilities(&self) -> Capabilities;

    /// Reads up to `size` bytes; a well-behaved object returns [`HostValue::Bytes`].
    ///
    /// # Errors
    ///
    /// Any error the object raises.
    fn read(&self, size: usize) -> HostResult<HostValue>;

    /// Writes `data`.
    ///
    /// # Errors
    ///
    /// Any error the object raises.
    fn write(&self, data: &[u8]) -> HostResult<HostValue>;

    /// Moves the position; returns the new position or [`HostValue::None`].
    ///
    /// # Errors
    ///
    /// Any error the object raises.
    fn seek(&self, offset: i64, whence: Whence) -> HostResult<HostValue>;

    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Any error the object raises; a missing method error by default.
    fn tell(&self) -> HostResult<HostValue> {
        Err(HostError::missing_method("tell"))
    }

    /// Reports whether the object supports seeking.
    ///
    /// # Errors
    ///
    /// Any error the object raises; a missing method error by default.
    fn seekable(&self) -> HostResult<HostValue> {
        Err(HostError::missing_method("seekable"))
    }

    /// Closes the object.
    ///
    /// # Errors
    ///
    /// Any error the object raises; a missing method error by default.
    fn close(&self) -> HostResult<HostValue> {
        Err(HostError::missing_method("close"))
    }
}
