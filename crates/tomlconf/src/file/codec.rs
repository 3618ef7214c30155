//! Whole-buffer text codec used by [`TextFile`](super::TextFile).
//!
//! Encodings are looked up by label. Most labels go to `encoding_rs`, which
//! knows the WHATWG names (`"utf-8"`, `"iso-8859-5"`, `"windows-1251"`, ...);
//! Python-style spellings with underscores (`"iso_8859_5"`) are accepted as
//! well. A few labels are handled here instead, because the WHATWG mapping
//! does not match what the name promises:
//!
//! | Label                                         | Codec                                      |
//! |-----------------------------------------------|--------------------------------------------|
//! | `ascii`, `us-ascii`                           | 7-bit ASCII; bytes `0x80..` are malformed  |
//! | `latin-1`, `latin1`, `iso-8859-1`, `l1`       | byte `N` is U+00NN, both ways              |
//! | `utf-16`                                      | byte order from the BOM, little-endian if none |
//!
//! WHATWG folds `ascii` and `iso-8859-1` into windows-1252, which would let a
//! strict ASCII file silently accept `é` and write `€` as byte `0x80`.
//!
//! # Why error policies? (for beginners)
//!
//! A config file is not always in the encoding the application expects: it
//! may have been saved by another editor, copied from another machine, or
//! hand-edited with a stray byte. The error policy decides what happens then.
//! `strict` refuses to guess and reports the first bad position, which is
//! what you want for files the program writes itself. The lenient policies
//! let a tool still show or repair a damaged file:
//!
//! | Policy             | Malformed bytes (decode)   | Unmappable chars (encode)      |
//! |--------------------|----------------------------|--------------------------------|
//! | `strict`           | error                      | error                          |
//! | `replace`          | U+FFFD per bad sequence    | `?`                            |
//! | `ignore`           | dropped                    | dropped                        |
//! | `backslashreplace` | `\xNN` per bad byte        | `\xNN` / `\uNNNN` / `\UNNNNNNNN` |
//!
//! Apart from the `utf-16` label, decoding never sniffs or strips a
//! byte-order mark: the named encoding is applied to the bytes exactly as
//! they are on disk.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use encoding_rs::{
    DecoderResult, Encoder, EncoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfError;

/// Policy applied when bytes cannot be decoded or characters cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail the operation.
    #[default]
    Strict,
    /// Substitute U+FFFD when decoding and `?` when encoding.
    Replace,
    /// Skip the offending input.
    Ignore,
    /// Substitute a backslash escape of the offending byte or character.
    BackslashReplace,
}

impl ErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorPolicy::Strict => "strict",
            ErrorPolicy::Replace => "replace",
            ErrorPolicy::Ignore => "ignore",
            ErrorPolicy::BackslashReplace => "backslashreplace",
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ErrorPolicy::Strict),
            "replace" => Ok(ErrorPolicy::Replace),
            "ignore" => Ok(ErrorPolicy::Ignore),
            "backslashreplace" => Ok(ErrorPolicy::BackslashReplace),
            other => Err(ConfError::UnknownErrorPolicy {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a codec operation failed under [`ErrorPolicy::Strict`].
///
/// [`TextFile`](super::TextFile) turns this into [`ConfError::Decode`] or
/// [`ConfError::Encode`] with the file path attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Malformed input starting at this byte offset.
    #[error("malformed input at byte offset {offset}")]
    Malformed { offset: usize },
    /// A character the encoding cannot represent.
    #[error("unmappable character {character:?}")]
    Unmappable { character: char },
}

/// Which implementation backs a [`TextCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    /// Highest code point is U+007F.
    Ascii,
    /// Highest code point is U+00FF.
    Latin1,
    /// Endianness picked per buffer from the byte-order mark.
    Utf16,
    Whatwg(&'static Encoding),
}

/// An encoding paired with an error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCodec {
    charset: Charset,
    policy: ErrorPolicy,
}

impl Default for TextCodec {
    /// UTF-8 with the strict policy.
    fn default() -> Self {
        Self {
            charset: Charset::Whatwg(UTF_8),
            policy: ErrorPolicy::Strict,
        }
    }
}

impl TextCodec {
    /// Looks up `label`, falling back to UTF-8 when no label is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::UnknownEncoding`] if the label is not recognised.
    pub fn new(label: Option<&str>, policy: ErrorPolicy) -> Result<Self, ConfError> {
        let charset = match label {
            None => Charset::Whatwg(UTF_8),
            Some(label) => lookup(label)?,
        };
        Ok(Self { charset, policy })
    }

    /// Canonical name of the encoding, e.g. `"ISO-8859-5"`.
    ///
    /// This is the registered name, not the label it was looked up by:
    /// `"utf8"` reports `"UTF-8"` and `"latin_1"` reports `"ISO-8859-1"`.
    pub fn encoding_name(&self) -> &'static str {
        match self.charset {
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16 => "UTF-16",
            Charset::Whatwg(encoding) => encoding.name(),
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Whether text can be encoded back into this encoding.
    pub fn can_encode(&self) -> bool {
        match self.charset {
            Charset::Ascii | Charset::Latin1 => true,
            Charset::Utf16 => false,
            Charset::Whatwg(encoding) => encoding.output_encoding() == encoding,
        }
    }

    /// Decodes a whole buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] for invalid input under the strict policy.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        match self.charset {
            Charset::Ascii => self.decode_single_byte(bytes, 0x7f),
            Charset::Latin1 => self.decode_single_byte(bytes, 0xff),
            Charset::Utf16 => match Encoding::for_bom(bytes) {
                Some((encoding, bom_len)) if encoding == UTF_16BE || encoding == UTF_16LE => {
                    self.decode_with(encoding, bytes, bom_len)
                }
                _ => self.decode_with(UTF_16LE, bytes, 0),
            },
            Charset::Whatwg(encoding) => self.decode_with(encoding, bytes, 0),
        }
    }

    /// Encodes a whole string.
    ///
    /// Callers must check [`TextCodec::can_encode`] first; encodings that
    /// cannot be produced are written as UTF-8 by `encoding_rs`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unmappable`] for a character the encoding cannot
    /// represent under the strict policy.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        match self.charset {
            Charset::Ascii => self.encode_single_byte(text, 0x7f),
            Charset::Latin1 => self.encode_single_byte(text, 0xff),
            Charset::Utf16 => self.encode_with(UTF_16LE, text),
            Charset::Whatwg(encoding) => self.encode_with(encoding, text),
        }
    }

    /// Decodes `bytes[start..]`; reported offsets count from the buffer start.
    fn decode_with(
        &self,
        encoding: &'static Encoding,
        bytes: &[u8],
        start: usize,
    ) -> Result<String, CodecError> {
        let mut decoder = encoding.new_decoder_without_bom_handling();
        let remaining = bytes.len() - start;
        let mut out = String::with_capacity(
            decoder
                .max_utf8_buffer_length_without_replacement(remaining)
                .unwrap_or(remaining),
        );
        let mut consumed = start;

        loop {
            let (result, read) =
                decoder.decode_to_string_without_replacement(&bytes[consumed..], &mut out, true);
            consumed += read;

            match result {
                DecoderResult::InputEmpty => return Ok(out),
                DecoderResult::OutputFull => {
                    let needed = decoder
                        .max_utf8_buffer_length_without_replacement(bytes.len() - consumed)
                        .unwrap_or(bytes.len() - consumed);
                    out.reserve(needed.max(16));
                }
                DecoderResult::Malformed(bad_len, trailing) => {
                    // The malformed sequence ends `trailing` bytes before the
                    // current read position.
                    let end = consumed.saturating_sub(usize::from(trailing));
                    let begin = end.saturating_sub(usize::from(bad_len));
                    self.malformed(&bytes[begin..end], begin, &mut out)?;
                }
            }
        }
    }

    fn encode_with(&self, encoding: &'static Encoding, text: &str) -> Result<Vec<u8>, CodecError> {
        let mut encoder = encoding.new_encoder();
        let mut out = Vec::with_capacity(capacity_for(&encoder, text.len()));
        let mut consumed = 0;

        loop {
            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut out, true);
            consumed += read;

            match result {
                EncoderResult::InputEmpty => return Ok(out),
                EncoderResult::OutputFull => {
                    let needed = capacity_for(&encoder, text.len() - consumed);
                    out.reserve(needed.max(16));
                }
                EncoderResult::Unmappable(character) => {
                    if let Some(substitute) = self.unmappable(character)? {
                        push_encoded(&mut encoder, &substitute, &mut out);
                    }
                }
            }
        }
    }

    /// Decodes a charset whose byte `N` is U+00NN for every `N <= max`.
    fn decode_single_byte(&self, bytes: &[u8], max: u8) -> Result<String, CodecError> {
        let mut out = String::with_capacity(bytes.len());
        for (offset, &byte) in bytes.iter().enumerate() {
            if byte <= max {
                out.push(char::from(byte));
            } else {
                self.malformed(&bytes[offset..=offset], offset, &mut out)?;
            }
        }
        Ok(out)
    }

    fn encode_single_byte(&self, text: &str, max: u8) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(text.len());
        for character in text.chars() {
            match u8::try_from(u32::from(character)) {
                Ok(byte) if byte <= max => out.push(byte),
                _ => {
                    // Substitutes are ASCII, so they are valid bytes as is.
                    if let Some(substitute) = self.unmappable(character)? {
                        out.extend_from_slice(substitute.as_bytes());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Applies the policy to a malformed byte sequence found at `offset`.
    fn malformed(&self, bad: &[u8], offset: usize, out: &mut String) -> Result<(), CodecError> {
        match self.policy {
            ErrorPolicy::Strict => return Err(CodecError::Malformed { offset }),
            ErrorPolicy::Replace => out.push('\u{FFFD}'),
            ErrorPolicy::Ignore => {}
            ErrorPolicy::BackslashReplace => {
                for byte in bad {
                    // Writing to a String cannot fail.
                    let _ = write!(out, "\\x{byte:02x}");
                }
            }
        }
        Ok(())
    }

    /// ASCII text to write in place of `character`, or `None` to drop it.
    fn unmappable(&self, character: char) -> Result<Option<String>, CodecError> {
        match self.policy {
            ErrorPolicy::Strict => Err(CodecError::Unmappable { character }),
            ErrorPolicy::Replace => Ok(Some("?".to_string())),
            ErrorPolicy::Ignore => Ok(None),
            ErrorPolicy::BackslashReplace => Ok(Some(backslash_escape(character))),
        }
    }
}

fn lookup(label: &str) -> Result<Charset, ConfError> {
    let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.as_str() {
        "ascii" | "us-ascii" => return Ok(Charset::Ascii),
        "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => return Ok(Charset::Latin1),
        "utf-16" | "utf16" => return Ok(Charset::Utf16),
        _ => {}
    }

    Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(normalized.as_bytes()))
        .map(Charset::Whatwg)
        .ok_or_else(|| ConfError::UnknownEncoding {
            label: label.to_string(),
        })
}

fn capacity_for(encoder: &Encoder, len: usize) -> usize {
    encoder
        .max_buffer_length_from_utf8_without_replacement(len)
        .unwrap_or(len)
}

/// Feeds ASCII substitution text through the encoder so stateful encodings
/// stay consistent.
fn push_encoded(encoder: &mut Encoder, ascii: &str, out: &mut Vec<u8>) {
    let mut consumed = 0;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&ascii[consumed..], out, false);
        consumed += read;
        match result {
            EncoderResult::OutputFull => out.reserve(capacity_for(encoder, ascii.len()).max(16)),
            // ASCII is representable in every encoding that can be written.
            EncoderResult::InputEmpty | EncoderResult::Unmappable(_) => return,
        }
    }
}

fn backslash_escape(character: char) -> String {
    let code = u32::from(character);
    if code <= 0xff {
        format!("\\x{code:02x}")
    } else if code <= 0xffff {
        format!("\\u{code:04x}")
    } else {
        format!("\\U{code:08x}")
    }
}
