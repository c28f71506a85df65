// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The host runtime's global lock.
//!
//! Host objects are not thread-safe on their own terms: every call into one must happen while
//! the process-wide host lock is held. Stream operations may be invoked from any thread,
//! including threads the host never created, so each of them acquires the lock for its whole
//! duration through [`acquire`].
//!
//! The lock is re-entrant: a host method may itself use another stream (or the same one)
//! without deadlocking the thread that already holds the lock.

use std::fmt;
use std::sync::OnceLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{Level, event};

struct HostState {
    lock: ReentrantMutex<()>,
}

static HOST: OnceLock<HostState> = OnceLock::new();

fn state() -> &'static HostState {
    HOST.get_or_init(|| {
        event!(Level::TRACE, message = "host threading initialized");
        HostState {
            lock: ReentrantMutex::new(()),
        }
    })
}

/// Initializes the host's concurrency state.
///
/// Idempotent. Stream construction calls this before handing out a handle, so that later
/// operations can acquire the lock from arbitrary threads.
pub fn init_threads() {
    let _ = state();
}

/// Returns `true` once [`init_threads`] (or [`acquire`]) has run.
#[must_use]
pub fn threads_initialized() -> bool {
    HOST.get().is_some()
}

/// Acquires the global host lock, blocking until it is available.
///
/// The lock is released when the returned guard is dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub fn acquire() -> HostGuard {
    HostGuard {
        _guard: state().lock.lock(),
    }
}

#[cfg(test)]
pub(crate) fn held_by_current_thread() -> bool {
    state().lock.is_owned_by_current_thread()
}

/// Proof that the current thread holds the global host lock.
pub struct HostGuard {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl fmt::Debug for HostGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostGuard").finish_non_exhaustive()
    }
}
