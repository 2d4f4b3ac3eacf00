//! Schema-driven JSON encoding.
//!
//! The [`Encoder`] compiles `.proto` source text, looks up the root message
//! and encodes a JSON document against it. Schema compilation is delegated to
//! a [`SchemaCompiler`]; the default [`ProtoxCompiler`] compiles in memory
//! with `protox`.
//!
//! ```
//! use pbscope_core::encode;
//!
//! let schema = r#"
//!     syntax = "proto3";
//!     message Root { int32 distance = 2; }
//! "#;
//!
//! let bytes = encode(schema, r#"{"distance": 100}"#)?;
//! assert_eq!(bytes, vec![0x10, 0x64]);
//! # Ok::<(), pbscope_core::Error>(())
//! ```

mod compiler;

use crate::error::{Error, Result};
use prost::Message;
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor};
use tracing::debug;

pub use compiler::{ProtoxCompiler, SchemaCompiler, SCHEMA_FILE_NAME};

/// Name of the message type JSON documents are encoded as
pub const DEFAULT_ROOT_MESSAGE: &str = "Root";

/// Configuration for the encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Message type the JSON document is encoded as
    pub root_message: String,
    /// Reject JSON keys that name no field of the message
    pub deny_unknown_fields: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            root_message: DEFAULT_ROOT_MESSAGE.to_string(),
            deny_unknown_fields: true,
        }
    }
}

impl EncoderConfig {
    /// Creates a new encoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root message name
    pub fn root_message(mut self, name: impl Into<String>) -> Self {
        self.root_message = name.into();
        self
    }

    /// Sets whether unknown JSON keys are rejected
    pub fn deny_unknown_fields(mut self, deny: bool) -> Self {
        self.deny_unknown_fields = deny;
        self
    }
}

/// Encodes JSON documents against a compiled schema
#[derive(Debug, Clone)]
pub struct Encoder<C = ProtoxCompiler> {
    compiler: C,
    config: EncoderConfig,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates a new encoder with the default compiler and configuration
    pub fn new() -> Self {
        Self {
            compiler: ProtoxCompiler::new(),
            config: EncoderConfig::default(),
        }
    }
}

impl<C: SchemaCompiler> Encoder<C> {
    /// Creates a new encoder backed by a custom schema compiler
    pub fn with_compiler(compiler: C) -> Self {
        Self {
            compiler,
            config: EncoderConfig::default(),
        }
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Compiles `schema` and returns the root message descriptor
    pub fn root_descriptor(&self, schema: &str) -> Result<MessageDescriptor> {
        let pool = self.compiler.compile(schema)?;
        let name = self.config.root_message.as_str();

        pool.get_message_by_name(name)
            .or_else(|| pool.all_messages().find(|message| message.name() == name))
            .ok_or_else(|| Error::schema(format!("{} message not found", name)))
    }

    /// Encodes the JSON document `data` as the root message of `schema`
    pub fn encode(&self, schema: &str, data: &str) -> Result<Vec<u8>> {
        let descriptor = self.root_descriptor(schema)?;
        debug!("Encoding JSON as {}", descriptor.full_name());

        let value: serde_json::Value = serde_json::from_str(data)?;
        let bytes = self.encode_value(descriptor, value)?;

        debug!("Encoded {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Encodes an already parsed JSON value as `descriptor`
    pub fn encode_value(
        &self,
        descriptor: MessageDescriptor,
        value: serde_json::Value,
    ) -> Result<Vec<u8>> {
        let options =
            DeserializeOptions::new().deny_unknown_fields(self.config.deny_unknown_fields);
        let message = DynamicMessage::deserialize_with_options(descriptor, value, &options)
            .map_err(|e| Error::encoding(e.to_string()))?;

        Ok(message.encode_to_vec())
    }
}

/// Encodes `data` as the `Root` message of `schema` with the default encoder
pub fn encode(schema: &str, data: &str) -> Result<Vec<u8>> {
    Encoder::new().encode(schema, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode, WireType};
    use pretty_assertions::assert_eq;

    const POINT_SCHEMA: &str = r#"
        syntax = "proto3";

        message Point {
          int32 x = 1;
          int32 y = 2;
        }

        message Root {
          Point point = 1;
          int32 distance = 2;
        }
    "#;

    const SCALAR_SCHEMA: &str = r#"
        syntax = "proto3";

        message Root {
          uint64 value = 1;
          string name = 2;
          fixed32 flags = 3;
          double ratio = 4;
          repeated string tags = 5;
        }
    "#;

    #[test]
    fn test_encode_point() {
        let bytes = encode(POINT_SCHEMA, r#"{"point":{"x":2,"y":1},"distance":100}"#).unwrap();
        assert_eq!(bytes, vec![0x0a, 0x04, 0x08, 0x02, 0x10, 0x01, 0x10, 0x64]);
    }

    #[test]
    fn test_round_trip_point() {
        let bytes = encode(POINT_SCHEMA, r#"{"point":{"x":2,"y":1},"distance":100}"#).unwrap();
        let items = decode(&bytes).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].field_tag.to_string(), "1");
        assert_eq!(items[0].wire_type(), Some(WireType::Len));
        let children: Vec<_> = items[0].sub_items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(children, vec!["2", "1"]);
        assert!(items[0]
            .sub_items
            .iter()
            .all(|i| i.wire_type() == Some(WireType::Varint)));
        assert_eq!(items[1].field_tag.to_string(), "2");
        assert_eq!(items[1].wire_type(), Some(WireType::Varint));
        assert_eq!(items[1].value, "100");
    }

    #[test]
    fn test_round_trip_field_numbers_declared() {
        let data = r#"{
            "value": "9223372036854775808",
            "name": "pbscope",
            "flags": 7,
            "ratio": 0.5,
            "tags": ["a", "b"]
        }"#;
        let bytes = encode(SCALAR_SCHEMA, data).unwrap();
        let items = decode(&bytes).unwrap();

        let declared = ["1", "2", "3", "4", "5"];
        assert!(items
            .iter()
            .all(|item| declared.contains(&item.field_tag.to_string().as_str())));

        let last = items.last().unwrap();
        assert_eq!(last.payload_range().end, bytes.len());
        assert_eq!(items[0].value, "9223372036854775808");
        assert_eq!(items.iter().filter(|i| i.field_tag.to_string() == "5").count(), 2);
    }

    #[test]
    fn test_varint_round_trip() {
        for value in [0u64, 127, 128, 300, 1 << 32, 1 << 63] {
            let data = format!(r#"{{"value": "{}"}}"#, value);
            let bytes = encode(SCALAR_SCHEMA, &data).unwrap();
            let items = decode(&bytes).unwrap();

            // proto3 omits default values
            if value == 0 {
                assert!(items.is_empty());
                continue;
            }
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].value, value.to_string());
        }
    }

    #[test]
    fn test_packaged_root() {
        let schema = r#"
            syntax = "proto3";
            package demo.v1;
            message Root { bool enabled = 1; }
        "#;
        let bytes = encode(schema, r#"{"enabled": true}"#).unwrap();
        assert_eq!(bytes, vec![0x08, 0x01]);
    }

    #[test]
    fn test_custom_root_message() {
        let encoder = Encoder::new().with_config(EncoderConfig::new().root_message("Point"));
        let bytes = encoder.encode(POINT_SCHEMA, r#"{"x": 1}"#).unwrap();
        assert_eq!(bytes, vec![0x08, 0x01]);
    }

    #[test]
    fn test_well_known_import() {
        let schema = r#"
            syntax = "proto3";
            import "google/protobuf/timestamp.proto";
            message Root { google.protobuf.Timestamp at = 1; }
        "#;
        let bytes = encode(schema, r#"{"at": "1970-01-01T00:00:01Z"}"#).unwrap();
        assert_eq!(bytes, vec![0x0a, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn test_custom_compiler() {
        struct Fixed(prost_reflect::DescriptorPool);

        impl SchemaCompiler for Fixed {
            fn compile(&self, _schema: &str) -> Result<prost_reflect::DescriptorPool> {
                Ok(self.0.clone())
            }
        }

        let pool = ProtoxCompiler::new().compile(POINT_SCHEMA).unwrap();
        let encoder = Encoder::with_compiler(Fixed(pool));
        let bytes = encoder.encode("ignored", r#"{"distance": 1}"#).unwrap();
        assert_eq!(bytes, vec![0x10, 0x01]);
    }

    #[test]
    fn test_missing_root() {
        let schema = r#"syntax = "proto3"; message Other { int32 a = 1; }"#;
        let err = encode(schema, "{}").unwrap_err();
        assert!(matches!(err, Error::Schema(ref msg) if msg == "Root message not found"));
    }

    #[test]
    fn test_invalid_schema() {
        let err = encode("message Root { int32 = ; }", "{}").unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = encode(POINT_SCHEMA, r#"{"distance": }"#).unwrap_err();
        match err {
            Error::JsonParse { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_field() {
        let err = encode(POINT_SCHEMA, r#"{"speed": 3}"#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_unknown_field_allowed() {
        let encoder = Encoder::new().with_config(EncoderConfig::new().deny_unknown_fields(false));
        let bytes = encoder.encode(POINT_SCHEMA, r#"{"speed": 3}"#).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let err = encode(POINT_SCHEMA, r#"{"distance": "far"}"#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        let err = encode(POINT_SCHEMA, r#"{"point": 5}"#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
