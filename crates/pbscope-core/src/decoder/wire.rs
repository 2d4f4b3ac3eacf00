//! Low-level protobuf wire format reading.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3, 4: SGROUP / EGROUP (deprecated groups)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! Varints are read without a width limit into a [`BigUint`], so malformed
//! input with long continuation runs still decodes to an exact value.

use crate::error::{Error, Result};
use num_bigint::BigUint;
use serde::Serialize;
use std::fmt;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    #[serde(rename = "SGROUP")]
    StartGroup = 3,
    /// End group (deprecated)
    #[serde(rename = "EGROUP")]
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Returns the conventional upper-case name of the wire type
    pub fn name(&self) -> &'static str {
        match self {
            WireType::Varint => "VARINT",
            WireType::I64 => "I64",
            WireType::Len => "LEN",
            WireType::StartGroup => "SGROUP",
            WireType::EndGroup => "EGROUP",
            WireType::I32 => "I32",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for WireType {
    type Error = u8;

    /// Fails with the raw code for 6 and 7, which name no wire type
    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            other => Err(other),
        }
    }
}

/// Read position inside an immutable byte slice.
///
/// `base` is the absolute offset of `data` within the buffer handed to the
/// top-level decode call, so positions reported in errors and items stay
/// meaningful across nested sub-decodes.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor at the start of `data`
    pub fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            position: 0,
            base,
        }
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.base + self.position
    }

    /// True once every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// The `len` bytes immediately before the cursor
    pub fn consumed_tail(&self, len: usize) -> &'a [u8] {
        &self.data[self.position - len..self.position]
    }

    /// Reads a base-128 varint.
    ///
    /// Returns the decoded value and the number of bytes consumed.
    pub fn read_varint(&mut self) -> Result<(BigUint, usize)> {
        let (value, len) = decode_varint(self.remaining())
            .ok_or_else(|| Error::truncated_varint(self.offset()))?;
        self.position += len;
        Ok((value, len))
    }

    /// Reads up to `width` bytes as a big-endian unsigned integer.
    ///
    /// Never fails: a short buffer yields the bytes that are left and moves
    /// the cursor to the end. Returns the value and the bytes consumed.
    pub fn read_fixed(&mut self, width: usize) -> (BigUint, usize) {
        let len = width.min(self.remaining().len());
        let value = BigUint::from_bytes_be(&self.remaining()[..len]);
        self.position += len;
        (value, len)
    }

    /// Consumes a length-delimited payload and renders it as a hex dump.
    ///
    /// At most `cap` bytes are rendered; the cursor always advances by the
    /// full declared length. Returns the dump and the payload length.
    pub fn read_payload(&mut self, declared: &BigUint, cap: usize) -> Result<(String, usize)> {
        let available = self.remaining().len();
        let length = match usize::try_from(declared) {
            Ok(length) if length <= available => length,
            _ => {
                return Err(Error::truncated_payload(
                    self.offset(),
                    declared.clone(),
                    available,
                ))
            }
        };

        let dump = hex_dump(&self.remaining()[..length], cap);
        self.position += length;
        Ok((dump, length))
    }
}

/// Decode a varint from the start of `data`.
///
/// Returns the value and the number of bytes it occupies, or `None` if
/// `data` ends before a byte with the high bit clear.
pub fn decode_varint(data: &[u8]) -> Option<(BigUint, usize)> {
    let end = data.iter().position(|&byte| byte & 0x80 == 0)?;
    let value = data[..=end]
        .iter()
        .rev()
        .fold(BigUint::default(), |acc, &byte| {
            acc * 128u32 + u32::from(byte & 0x7F)
        });
    Some((value, end + 1))
}

/// Renders bytes as space-separated lowercase hex pairs.
///
/// Bytes past `cap` are not rendered; a ` (omit N bytes)` suffix records how
/// many were left out.
pub fn hex_dump(bytes: &[u8], cap: usize) -> String {
    let shown = bytes.len().min(cap);
    let mut dump = bytes[..shown]
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ");

    if bytes.len() > shown {
        dump.push_str(&format!(" (omit {} bytes)", bytes.len() - shown));
    }
    dump
}
