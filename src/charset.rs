use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bstr::ByteSlice;

use crate::error::Error;

/// The character encoding of a CSV byte stream.
///
/// Decoding never fails: bytes that are not valid in the encoding are
/// replaced with `U+FFFD`. Encoding never fails either: characters that the
/// encoding cannot represent are written as `?`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Charset {
    /// UTF-8. This is the default.
    Utf8,
    /// ISO-8859-1, where every byte is the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

impl Default for Charset {
    fn default() -> Charset {
        Charset::Utf8
    }
}

impl Charset {
    /// The canonical name of this charset.
    pub fn name(&self) -> &'static str {
        match *self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Decode one line of raw bytes into text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match *self {
            Charset::Utf8 => bytes.to_str_lossy(),
            Charset::Latin1 => {
                if bytes.is_ascii() {
                    return bytes.to_str_lossy();
                }
                Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
            }
            Charset::Ascii => {
                if bytes.is_ascii() {
                    return bytes.to_str_lossy();
                }
                Cow::Owned(
                    bytes
                        .iter()
                        .map(|&b| {
                            if b.is_ascii() {
                                char::from(b)
                            } else {
                                char::REPLACEMENT_CHARACTER
                            }
                        })
                        .collect(),
                )
            }
        }
    }

    /// Encode text into raw bytes, appending them to `buf`.
    pub fn encode(&self, text: &str, buf: &mut Vec<u8>) {
        let limit = match *self {
            Charset::Utf8 => {
                buf.extend_from_slice(text.as_bytes());
                return;
            }
            Charset::Latin1 => 0xFF,
            Charset::Ascii => 0x7F,
        };
        if text.is_ascii() {
            buf.extend_from_slice(text.as_bytes());
            return;
        }
        buf.extend(text.chars().map(|c| {
            let cp = u32::from(c);
            if cp <= limit {
                cp as u8
            } else {
                b'?'
            }
        }));
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(name: &str) -> Result<Charset, Error> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        match &*normalized {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => {
                Ok(Charset::Latin1)
            }
            "us-ascii" | "ascii" => Ok(Charset::Ascii),
            _ => Err(Error::config(format!("unsupported charset '{}'", name))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
