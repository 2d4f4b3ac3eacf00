//! # pbscope-core
//!
//! A library for inspecting Protocol Buffer wire data.
//!
//! This crate provides the core functionality for:
//! - Decoding arbitrary protobuf wire bytes into a field tree without a schema
//! - Encoding JSON documents against `.proto` schema text
//! - Rendering decoded trees as text
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`decoder`]: Schema-less wire format decoding
//! - [`encoder`]: Schema compilation and JSON encoding
//! - [`render`]: Tree writers
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use pbscope_core::{decode, encode, render::render_table};
//!
//! let schema = r#"
//!     syntax = "proto3";
//!     message Point { int32 x = 1; int32 y = 2; }
//!     message Root { Point point = 1; int32 distance = 2; }
//! "#;
//!
//! let bytes = encode(schema, r#"{"point": {"x": 2, "y": 1}, "distance": 100}"#)?;
//! let items = decode(&bytes)?;
//! println!("{}", render_table(&items));
//! # Ok::<(), pbscope_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`SchemaCompiler`]: Swap the schema compiler used by the encoder
//! - [`ItemWriter`]: Customize how decoded items are written
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod render;

// Re-export primary types for convenience
pub use decoder::{decode, decode_file, DecodedItem, Decoder, DecoderConfig, WireType};
pub use encoder::{encode, Encoder, EncoderConfig, ProtoxCompiler, SchemaCompiler};
pub use error::{Error, Result};
pub use render::{ItemWriter, StatsWriter, TableWriter};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
