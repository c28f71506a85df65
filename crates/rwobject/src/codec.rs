// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Text encoders with the host's names and error policies.

use std::collections::TryReserveError;
use std::fmt::Write as _;

use encoding_rs::{EncoderResult, Encoding};
use thiserror::Error;

const CHUNK_SIZE: usize = 1024;

/// An error produced while encoding text into bytes.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// No codec is registered under the requested name.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// An unencodable character was met and the error policy name is not recognized.
    #[error("unknown error handler name '{0}'")]
    UnknownErrorHandler(String),

    /// A character cannot be represented in the target encoding under the `strict` policy.
    #[error("'{encoding}' codec can't encode character '{}' in position {position}: {reason}", escape_char_ref(.character))]
    Unencodable {
        /// Canonical name of the codec.
        encoding: String,
        /// The offending character.
        character: char,
        /// Index of the offending character, counted in characters.
        position: usize,
        /// Why the character cannot be encoded.
        reason: &'static str,
    },

    /// The output buffer could not be allocated.
    #[error("out of memory")]
    OutOfMemory(#[from] TryReserveError),
}

#[derive(Clone, Copy, Debug)]
enum Codec {
    Utf8,
    Ascii,
    Latin1,
    UnicodeEscape,
    Utf16 { big_endian: bool, bom: bool },
    Whatwg(&'static Encoding),
}

impl Codec {
    fn lookup(name: &str) -> Option<Self> {
        let normalized = normalize(name);
        let codec = match normalized.as_str() {
            "utf_8" | "utf8" | "u8" | "utf" | "cp65001" => Self::Utf8,
            "ascii" | "us_ascii" | "646" => Self::Ascii,
            "latin_1" | "latin1" | "latin" | "iso_8859_1" | "iso8859_1" | "8859" | "l1" => Self::Latin1,
            "unicode_escape" => Self::UnicodeEscape,
            "utf_16" | "utf16" | "u16" => Self::Utf16 {
                big_endian: false,
                bom: true,
            },
            "utf_16_le" | "utf_16le" => Self::Utf16 {
                big_endian: false,
                bom: false,
            },
            "utf_16_be" | "utf_16be" => Self::Utf16 {
                big_endian: true,
                bom: false,
            },
            _ => {
                let encoding = Encoding::for_label(name.trim().as_bytes())
                    .or_else(|| Encoding::for_label(normalized.replace('_', "-").as_bytes()))?;
                if encoding == encoding_rs::UTF_8 {
                    Self::Utf8
                } else if encoding.output_encoding() != encoding {
                    // Decode-only labels (UTF-16, "replacement") have no encoder of their own.
                    return None;
                } else {
                    Self::Whatwg(encoding)
                }
            }
        };
        Some(codec)
    }

    fn name(self) -> String {
        match self {
            Self::Utf8 => "utf-8".to_owned(),
            Self::Ascii => "ascii".to_owned(),
            Self::Latin1 => "latin-1".to_owned(),
            Self::UnicodeEscape => "unicode_escape".to_owned(),
            Self::Utf16 { bom: true, .. } => "utf-16".to_owned(),
            Self::Utf16 { big_endian: false, .. } => "utf-16-le".to_owned(),
            Self::Utf16 { big_endian: true, .. } => "utf-16-be".to_owned(),
            Self::Whatwg(encoding) => encoding.name().to_ascii_lowercase(),
        }
    }
}

#[derive(Clone, Debug)]
enum Policy {
    Strict,
    Ignore,
    Replace,
    BackslashReplace,
    XmlCharRefReplace,
    // A Rust string never carries lone surrogates, so these only ever see real characters.
    Surrogate,
    Unknown(String),
}

impl Policy {
    fn lookup(name: &str) -> Self {
        match normalize(name).as_str() {
            "strict" => Self::Strict,
            "ignore" => Self::Ignore,
            "replace" => Self::Replace,
            "backslashreplace" => Self::BackslashReplace,
            "xmlcharrefreplace" => Self::XmlCharRefReplace,
            "surrogateescape" | "surrogatepass" => Self::Surrogate,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Returns the text to emit in place of `character`, `None` to drop it.
    fn substitute(&self, character: char, unencodable: impl FnOnce() -> CodecError) -> Result<Option<String>, CodecError> {
        match self {
            Self::Strict | Self::Surrogate => Err(unencodable()),
            Self::Ignore => Ok(None),
            Self::Replace => Ok(Some("?".to_owned())),
            Self::BackslashReplace => Ok(Some(escape_char(character))),
            Self::XmlCharRefReplace => Ok(Some(format!("&#{};", u32::from(character)))),
            Self::Unknown(name) => Err(CodecError::UnknownErrorHandler(name.clone())),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

fn escape_char_ref(character: &char) -> String {
    escape_char(*character)
}

/// Renders `character` as a `\xNN`, `\uNNNN` or `\UNNNNNNNN` escape.
fn escape_char(character: char) -> String {
    let code = u32::from(character);
    if code < 0x100 {
        format!("\\x{code:02x}")
    } else if code < 0x1_0000 {
        format!("\\u{code:04x}")
    } else {
        format!("\\U{code:08x}")
    }
}

/// Encodes `text` with the codec named `encoding`, handling unencodable characters according
/// to the error policy named `errors`.
///
/// Supported policies are `strict`, `ignore`, `replace`, `backslashreplace`,
/// `xmlcharrefreplace` and `surrogateescape`. An unknown policy only fails once an
/// unencodable character is met.
///
/// # Errors
///
/// * [`CodecError::UnknownEncoding`] if `encoding` names no codec.
/// * [`CodecError::Unencodable`] or [`CodecError::UnknownErrorHandler`] if a character cannot be
///   encoded and the policy does not recover from it.
/// * [`CodecError::OutOfMemory`] if the output buffer cannot be allocated.
pub fn encode_text(text: &str, encoding: &str, errors: &str) -> Result<Vec<u8>, CodecError> {
    let codec = Codec::lookup(encoding).ok_or_else(|| CodecError::UnknownEncoding(encoding.to_owned()))?;
    let policy = Policy::lookup(errors);

    match codec {
        Codec::Utf8 => {
            let mut out = Vec::new();
            out.try_reserve_exact(text.len())?;
            out.extend_from_slice(text.as_bytes());
            Ok(out)
        }
        Codec::Ascii => encode_by_limit(text, codec, &policy, 0x80, "ordinal not in range(128)"),
        Codec::Latin1 => encode_by_limit(text, codec, &policy, 0x100, "ordinal not in range(256)"),
        Codec::UnicodeEscape => encode_unicode_escape(text),
        Codec::Utf16 { big_endian, bom } => encode_utf16(text, big_endian, bom),
        Codec::Whatwg(encoding) => encode_whatwg(text, codec, encoding, &policy),
    }
}

fn encode_by_limit(text: &str, codec: Codec, policy: &Policy, limit: u32, reason: &'static str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    out.try_reserve(text.len())?;

    for (position, character) in text.chars().enumerate() {
        let code = u32::from(character);
        if code < limit {
            #[expect(clippy::cast_possible_truncation, reason = "code is below 0x100")]
            out.push(code as u8);
            continue;
        }

        let substitute = policy.substitute(character, || CodecError::Unencodable {
            encoding: codec.name(),
            character,
            position,
            reason,
        })?;
        if let Some(substitute) = substitute {
            out.extend_from_slice(substitute.as_bytes());
        }
    }

    Ok(out)
}

fn encode_unicode_escape(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut escaped = String::new();
    escaped.try_reserve(text.len())?;

    for character in text.chars() {
        match character {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            ' '..='~' => escaped.push(character),
            _ => {
                let code = u32::from(character);
                // Writing into a String cannot fail.
                let _ = if code < 0x100 {
                    write!(escaped, "\\x{code:02x}")
                } else if code < 0x1_0000 {
                    write!(escaped, "\\u{code:04x}")
                } else {
                    write!(escaped, "\\U{code:08x}")
                };
            }
        }
    }

    Ok(escaped.into_bytes())
}

fn encode_utf16(text: &str, big_endian: bool, bom: bool) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    out.try_reserve(text.len().saturating_mul(2).saturating_add(2))?;

    let mut push = |unit: u16| {
        let bytes = if big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
        out.extend_from_slice(&bytes);
    };

    if bom {
        push(0xFEFF);
    }
    text.encode_utf16().for_each(&mut push);

    Ok(out)
}

fn encode_whatwg(text: &str, codec: Codec, encoding: &'static Encoding, policy: &Policy) -> Result<Vec<u8>, CodecError> {
    let reason = if encoding.is_single_byte() {
        "character maps to <undefined>"
    } else {
        "illegal multibyte sequence"
    };

    let mut encoder = encoding.new_encoder();
    let mut out = Vec::new();
    if let Some(max) = encoder.max_buffer_length_from_utf8_without_replacement(text.len()) {
        out.try_reserve(max)?;
    }

    let mut chunk = [0_u8; CHUNK_SIZE];
    let mut consumed = 0;

    loop {
        let (result, read, written) = encoder.encode_from_utf8_without_replacement(&text[consumed..], &mut chunk, false);
        out.try_reserve(written)?;
        out.extend_from_slice(&chunk[..written]);
        consumed += read;

        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(character) => {
                let position = text[..consumed - character.len_utf8()].chars().count();
                let substitute = policy.substitute(character, || CodecError::Unencodable {
                    encoding: codec.name(),
                    character,
                    position,
                    reason,
                })?;
                if let Some(substitute) = substitute {
                    // Substitutes are ASCII and therefore always mappable.
                    flush_through(&mut encoder, &substitute, false, &mut out, &mut chunk)?;
                }
            }
        }
    }

    flush_through(&mut encoder, "", true, &mut out, &mut chunk)?;
    Ok(out)
}

fn flush_through(
    encoder: &mut encoding_rs::Encoder,
    mut src: &str,
    last: bool,
    out: &mut Vec<u8>,
    chunk: &mut [u8],
) -> Result<(), CodecError> {
    loop {
        let (result, read, written) = encoder.encode_from_utf8_without_replacement(src, chunk, last);
        out.try_reserve(written)?;
        out.extend_from_slice(&chunk[..written]);
        src = &src[read..];

        match result {
            EncoderResult::OutputFull => {}
            EncoderResult::InputEmpty | EncoderResult::Unmappable(_) => return Ok(()),
        }
    }
}
