// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tracing::{Level, event};

use crate::codec::{self, CodecError};
use crate::{Error, ErrorClass, HostValue, Result};

/// The encoding used when the caller does not name one. Encodes every string.
pub const DEFAULT_ENCODING: &str = "unicode_escape";

/// The error policy used when the caller does not name one.
pub const DEFAULT_ERRORS: &str = "backslashreplace";

/// The encoding used for filesystem paths.
pub const FS_ENCODING: &str = "utf-8";

/// The error policy used for filesystem paths.
pub const FS_ERRORS: &str = "surrogateescape";

/// Encodes text, paths and path-like objects into bytes.
///
/// Paths and path-like objects are first converted to their filesystem representation. Text is
/// then encoded with `encoding` and the `errors` policy (defaulting to [`DEFAULT_ENCODING`] and
/// [`DEFAULT_ERRORS`]), byte strings are returned unchanged, and any other value yields
/// `Ok(None)`.
///
/// When encoding fails, the failure is raised as an [`Error::Encoding`] of `error_class` if one
/// is given and swallowed into `Ok(None)` otherwise.
///
/// # Errors
///
/// * [`Error::OutOfMemory`] if the output could not be allocated.
/// * [`Error::Encoding`] if encoding failed and `error_class` was given.
/// * [`Error::Internal`] if encoding failed with both defaults in effect, which never happens
///   for a correctly working codec.
///
/// # Example
///
/// ```
/// use rwobject::{HostValue, encode_string};
///
/// let bytes = encode_string(&HostValue::from("caf\u{e9}"), None, None, None)?;
/// assert_eq!(bytes.as_deref(), Some(&br"caf\xe9"[..]));
///
/// let nothing = encode_string(&HostValue::Int(12345), None, None, None)?;
/// assert_eq!(nothing, None);
/// # Ok::<(), rwobject::Error>(())
/// ```
pub fn encode_string(
    obj: &HostValue,
    encoding: Option<&str>,
    errors: Option<&str>,
    error_class: Option<&ErrorClass>,
) -> Result<Option<Vec<u8>>> {
    match obj.fspath().as_ref() {
        HostValue::Text(text) => {
            match codec::encode_text(text, encoding.unwrap_or(DEFAULT_ENCODING), errors.unwrap_or(DEFAULT_ERRORS)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(error) => recover(error, encoding.is_some() || errors.is_some(), error_class),
            }
        }
        HostValue::Bytes(bytes) => Ok(Some(bytes.clone())),
        _ => Ok(None),
    }
}

fn recover(error: CodecError, explicit: bool, error_class: Option<&ErrorClass>) -> Result<Option<Vec<u8>>> {
    if let CodecError::OutOfMemory(_) = error {
        return Err(Error::OutOfMemory);
    }

    if let Some(class) = error_class {
        return Err(Error::Encoding {
            class: class.clone(),
            message: error.to_string(),
        });
    }

    if !explicit {
        return Err(Error::Internal(format!("unexpected encoding error with default settings: {error}")));
    }

    event!(Level::DEBUG, message = "encoding failed, producing no value", error = %error);
    Ok(None)
}

/// Encodes a filesystem path into bytes, rejecting paths with embedded NUL bytes.
///
/// Uses [`FS_ENCODING`] and [`FS_ERRORS`]. A result containing a NUL byte is raised as
/// [`Error::NullPath`] of `error_class` if one is given and turned into `Ok(None)` otherwise.
///
/// # Errors
///
/// * [`Error::OutOfMemory`] if the output could not be allocated.
/// * [`Error::Encoding`] if encoding failed and `error_class` was given.
/// * [`Error::NullPath`] if the path contains a NUL byte and `error_class` was given.
pub fn encode_file_path(obj: &HostValue, error_class: Option<&ErrorClass>) -> Result<Option<Vec<u8>>> {
    let Some(encoded) = encode_string(obj, Some(FS_ENCODING), Some(FS_ERRORS), error_class)? else {
        return Ok(None);
    };

    if !encoded.contains(&0) {
        return Ok(Some(encoded));
    }

    let Some(class) = error_class else {
        event!(Level::DEBUG, message = "file path contains null characters, producing no value");
        return Ok(None);
    };

    // The path is shown the way a C string would print it: up to the first NUL byte.
    let rendered = encode_string(obj, None, None, None)?.unwrap_or_default();
    let shown = rendered.split(|byte| *byte == 0).next().unwrap_or_default();

    Err(Error::NullPath {
        class: class.clone(),
        path: String::from_utf8_lossy(shown).into_owned(),
    })
}
