//! Canonical JSON serialization for hashing
//!
//! The encoding shared with every other writer of this ledger format:
//!
//! - object keys in sorted order
//! - `", "` between items and `": "` between key and value
//! - ASCII-only output (non-ASCII and DEL escaped as lowercase `\uXXXX`,
//!   surrogate pairs above the BMP)
//!
//! Any deviation here changes every digest, so the format is fixed.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io::{self, Write};

/// Formatter with `", "` / `": "` separators and ASCII-only strings
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if fragment.bytes().all(is_plain_ascii) {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() && is_plain_ascii(ch as u8) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Bytes written verbatim (control characters and quotes never reach the
/// fragment writer; serde_json escapes those itself)
fn is_plain_ascii(b: u8) -> bool {
    b.is_ascii() && b != 0x7f
}

/// Serialize any value to canonical JSON bytes
pub fn to_canonical_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    // Going through `Value` sorts struct fields as well as map keys.
    // Relies on serde_json's `Map` being a BTreeMap (no `preserve_order`).
    let value = serde_json::to_value(value)?;

    let mut buffer = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Serialize any value to a canonical JSON string
pub fn to_canonical_string<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let bytes = to_canonical_vec(value)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Other(format!("Canonical output is not UTF-8: {}", e)))
}
