// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tracing::{Level, event};

use crate::{Capabilities, HostValue, host};

const REQUIRED: Capabilities = Capabilities::READ.union(Capabilities::WRITE).union(Capabilities::SEEK);

/// Decides whether `obj` can back a stream.
///
/// An object qualifies if it exposes `read`, `write` and `seek` (plus `tell` when `require_tell`
/// is set) and, if it exposes a `seekable` query, that query answers truthfully. A failing
/// `seekable` query disqualifies the object; the failure itself is not propagated.
///
/// No data is read or written.
pub(crate) fn probe(obj: Option<&HostValue>, require_tell: bool) -> bool {
    let Some(HostValue::Object(file)) = obj else {
        return false;
    };

    let _host = host::acquire();
    let capabilities = file.capabilities();
    let mut required = REQUIRED;
    if require_tell {
        required |= Capabilities::TELL;
    }

    if !capabilities.contains(required) {
        event!(Level::TRACE, message = "object lacks stream methods", capabilities = ?capabilities);
        return false;
    }

    if !capabilities.contains(Capabilities::SEEKABLE) {
        return true;
    }

    match file.seekable() {
        Ok(answer) => answer.is_truthy(),
        Err(error) => {
            event!(Level::DEBUG, message = "seekable() failed, object is not stream-capable", error = %error);
            false
        }
    }
}

/// Returns `true` if `obj` is an object that can back a stream.
///
/// This is the check [`wrap`](crate::wrap) performs before accepting an object, with the
/// default adapter configuration. See [`Adapter::is_stream_capable`](crate::Adapter::is_stream_capable).
#[must_use]
pub fn is_stream_capable(obj: Option<&HostValue>) -> bool {
    probe(obj, false)
}
