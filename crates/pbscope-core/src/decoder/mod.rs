//! Schema-less wire format decoding.
//!
//! The [`Decoder`] walks a byte buffer field by field and produces a tree of
//! [`DecodedItem`]s. No schema is involved, so every LEN payload is a guess:
//! the decoder tries to read it as a nested message and keeps the result only
//! if the whole payload parses.
//!
//! ## Algorithm Overview
//!
//! 1. Read the tag varint and split it into wire type (`tag mod 8`) and field
//!    number (`tag div 8`)
//! 2. Read the payload according to the wire type
//! 3. For LEN payloads, decode the payload bytes recursively and discard any
//!    failure
//! 4. Repeat until the buffer is exhausted
//!
//! ```
//! use pbscope_core::Decoder;
//!
//! let items = Decoder::new().decode(&[0x0a, 0x02, 0x08, 0x02, 0x10, 0x64])?;
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[0].sub_items[0].value, "2");
//! assert_eq!(items[1].value, "100");
//! # Ok::<(), pbscope_core::Error>(())
//! ```

mod wire;

use crate::error::{Error, Result};
use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use std::path::Path;
use tracing::{debug, trace};

pub use wire::{decode_varint, hex_dump, ByteCursor, WireType};

/// Number of payload bytes rendered in a LEN value before the dump is cut
pub const DEFAULT_HEX_DUMP_CAP: usize = 100;

/// Deepest nesting level the decoder expands by default
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard ceiling on nesting levels, whatever the configuration says
pub const MAX_SUPPORTED_DEPTH: usize = 256;

/// One decoded field occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedItem {
    /// Raw 3-bit wire type code from the tag
    #[serde(rename = "wireType", serialize_with = "serialize_wire_code")]
    pub wire_code: u8,
    /// Field number from the tag
    #[serde(serialize_with = "serialize_decimal")]
    pub field_tag: BigUint,
    /// Bytes consumed by the payload
    pub length: usize,
    /// Absolute offset of the payload in the decoded buffer
    pub offset: usize,
    /// Display form of the payload
    pub value: String,
    /// Nested fields when the payload parsed as a message
    pub sub_items: Vec<DecodedItem>,
}

impl DecodedItem {
    /// The wire type, or `None` for codes 6 and 7
    pub fn wire_type(&self) -> Option<WireType> {
        WireType::try_from(self.wire_code).ok()
    }

    /// Display name of the wire type
    pub fn wire_type_name(&self) -> String {
        match self.wire_type() {
            Some(wire_type) => wire_type.name().to_string(),
            None => format!("UNKNOWN({})", self.wire_code),
        }
    }

    /// Returns true if the payload was expanded into nested items
    pub fn is_expanded(&self) -> bool {
        !self.sub_items.is_empty()
    }

    /// Byte range of the payload in the decoded buffer
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

fn serialize_wire_code<S: Serializer>(
    code: &u8,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match WireType::try_from(*code) {
        Ok(wire_type) => wire_type.serialize(serializer),
        Err(code) => serializer.serialize_u8(code),
    }
}

fn serialize_decimal<S: Serializer>(
    value: &BigUint,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum number of nesting levels in the decoded tree
    pub max_depth: usize,
    /// Number of payload bytes rendered before a LEN value is cut
    pub hex_dump_cap: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            hex_dump_cap: DEFAULT_HEX_DUMP_CAP,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth (1 disables expansion)
    ///
    /// Values above [`MAX_SUPPORTED_DEPTH`] are clamped to it.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.min(MAX_SUPPORTED_DEPTH);
        self
    }

    /// Sets the number of bytes shown in LEN hex dumps
    pub fn hex_dump_cap(mut self, cap: usize) -> Self {
        self.hex_dump_cap = cap;
        self
    }
}

/// Schema-less wire format decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `data` into its top-level fields.
    ///
    /// Fails if the buffer is not valid wire-format data; the error carries
    /// the offset at or after which decoding broke down.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<DecodedItem>> {
        debug!("Decoding {} bytes", data.len());
        let items = self.decode_level(data, 0, 0)?;
        debug!("Decoded {} top-level fields", items.len());
        Ok(items)
    }

    /// Reads a file and decodes its contents
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<Vec<DecodedItem>> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        self.decode(&data)
    }

    /// Nesting limit in effect; `max_depth` is a public field and may
    /// bypass the clamping setter
    fn depth_limit(&self) -> usize {
        self.config.max_depth.min(MAX_SUPPORTED_DEPTH)
    }

    /// Decodes every field of one nesting level
    fn decode_level(&self, data: &[u8], base: usize, depth: usize) -> Result<Vec<DecodedItem>> {
        let mut cursor = ByteCursor::new(data, base);
        let mut items = Vec::new();

        while !cursor.is_at_end() {
            items.push(self.decode_field(&mut cursor, depth)?);
        }

        Ok(items)
    }

    fn decode_field(&self, cursor: &mut ByteCursor<'_>, depth: usize) -> Result<DecodedItem> {
        let tag_offset = cursor.offset();
        let (tag, _) = cursor
            .read_varint()
            .map_err(|_| Error::tag_read(tag_offset))?;

        let wire_code = (tag.iter_u32_digits().next().unwrap_or(0) % 8) as u8;
        let field_tag = tag / 8u32;

        let (value, length) = match WireType::try_from(wire_code) {
            Ok(WireType::I32) => {
                let (value, length) = cursor.read_fixed(4);
                (value.to_string(), length)
            }
            Ok(WireType::I64) => {
                let (value, length) = cursor.read_fixed(8);
                (value.to_string(), length)
            }
            Ok(WireType::Varint) => {
                let (value, length) = cursor.read_varint()?;
                (value.to_string(), length)
            }
            // Groups and the unassigned codes 6 and 7 are read as LEN
            _ => {
                let (declared, _) = cursor.read_varint()?;
                cursor.read_payload(&declared, self.config.hex_dump_cap)?
            }
        };

        let offset = cursor.offset() - length;
        let sub_items = if wire_code == WireType::Len as u8 && length > 0 {
            self.expand(cursor.consumed_tail(length), offset, depth)
        } else {
            Vec::new()
        };

        Ok(DecodedItem {
            wire_code,
            field_tag,
            length,
            offset,
            value,
            sub_items,
        })
    }

    /// Tries to read a LEN payload as a nested message.
    ///
    /// Returns no items when the payload does not parse or the depth limit
    /// is reached; the failure never reaches the caller.
    fn expand(&self, payload: &[u8], offset: usize, depth: usize) -> Vec<DecodedItem> {
        let limit = self.depth_limit();
        if depth + 1 >= limit {
            trace!("Depth limit {} reached at offset {}", limit, offset);
            return Vec::new();
        }

        match self.decode_level(payload, offset, depth + 1) {
            Ok(items) => items,
            Err(e) => {
                trace!("Payload at offset {} is not a nested message: {}", offset, e);
                Vec::new()
            }
        }
    }
}

/// Decodes `data` with the default configuration
pub fn decode(data: &[u8]) -> Result<Vec<DecodedItem>> {
    Decoder::new().decode(data)
}

/// Reads a file and decodes its contents
///
/// This is a convenience function for decoding raw dumps saved to disk.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Vec<DecodedItem>> {
    Decoder::new().decode_file(path)
}
