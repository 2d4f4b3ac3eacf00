//! Pluggable schema compilation.
//!
//! This module provides the [`SchemaCompiler`] trait for turning `.proto`
//! source text into a [`DescriptorPool`], and the default `protox`-backed
//! implementation.

use crate::error::{Error, Result};
use prost_reflect::DescriptorPool;
use protox::file::{ChainFileResolver, File, FileResolver, GoogleFileResolver};
use protox::Compiler;
use std::path::Path;
use tracing::trace;

/// Virtual file name the schema text is compiled under
pub const SCHEMA_FILE_NAME: &str = "root.proto";

/// Trait for compiling schema text into descriptors.
///
/// Implement this trait to plug in another schema source, such as a
/// precompiled descriptor set.
///
/// # Example
///
/// ```
/// use pbscope_core::encoder::SchemaCompiler;
/// use pbscope_core::Result;
/// use prost_reflect::DescriptorPool;
///
/// struct Precompiled(DescriptorPool);
///
/// impl SchemaCompiler for Precompiled {
///     fn compile(&self, _schema: &str) -> Result<DescriptorPool> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait SchemaCompiler: Send + Sync {
    /// Compile the schema text into a descriptor pool
    fn compile(&self, schema: &str) -> Result<DescriptorPool>;
}

/// Compiles schema text in memory with `protox`.
///
/// Imports of the Google well-known types (`google/protobuf/*.proto`) are
/// resolved from the copies bundled with `protox`; any other import fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoxCompiler;

impl ProtoxCompiler {
    /// Creates a new protox compiler
    pub fn new() -> Self {
        Self
    }
}

impl SchemaCompiler for ProtoxCompiler {
    fn compile(&self, schema: &str) -> Result<DescriptorPool> {
        let mut resolver = ChainFileResolver::new();
        resolver.add(SourceResolver {
            source: schema.to_string(),
        });
        resolver.add(GoogleFileResolver::new());

        let mut compiler = Compiler::with_file_resolver(resolver);
        compiler
            .open_file(SCHEMA_FILE_NAME)
            .map_err(|e| Error::schema(e.to_string()))?;

        let pool = compiler.descriptor_pool();
        trace!("Compiled schema with {} messages", pool.all_messages().count());
        Ok(pool)
    }
}

/// Serves the schema text as the single file [`SCHEMA_FILE_NAME`]
struct SourceResolver {
    source: String,
}

impl FileResolver for SourceResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        (path == Path::new(SCHEMA_FILE_NAME)).then(|| SCHEMA_FILE_NAME.to_string())
    }

    fn open_file(&self, name: &str) -> std::result::Result<File, protox::Error> {
        if name == SCHEMA_FILE_NAME {
            File::from_source(name, &self.source)
        } else {
            Err(protox::Error::file_not_found(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_messages() {
        let pool = ProtoxCompiler::new()
            .compile(r#"syntax = "proto3"; message Root { string name = 1; }"#)
            .unwrap();
        let root = pool.get_message_by_name("Root").unwrap();
        assert_eq!(root.fields().count(), 1);
        assert!(pool.get_file_by_name(SCHEMA_FILE_NAME).is_some());
    }

    #[test]
    fn test_unknown_import() {
        let err = ProtoxCompiler::new()
            .compile(r#"syntax = "proto3"; import "other.proto"; message Root {}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_unresolved_type() {
        let err = ProtoxCompiler::new()
            .compile(r#"syntax = "proto3"; message Root { Missing m = 1; }"#)
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
