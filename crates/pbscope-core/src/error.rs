//! Error types for the pbscope-core library.
//!
//! Decoding errors carry the absolute byte offset at which the buffer stopped
//! being valid wire-format data. Encoding errors carry a message suitable for
//! direct display.

use num_bigint::BigUint;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pbscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all pbscope operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The buffer ended while reading a field tag
    #[error("cannot read type at offset {offset}: buffer ends inside the field tag")]
    TagRead {
        /// Byte offset where the tag started
        offset: usize,
    },

    /// A varint ran to the end of the buffer without a terminating byte
    #[error("truncated varint at offset {offset}: no terminating byte before end of buffer")]
    TruncatedVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// A declared LEN payload runs past the end of the buffer
    #[error(
        "cannot read payload at offset {offset}: declared {declared} bytes, only {available} available"
    )]
    TruncatedPayload {
        /// Byte offset where the payload would start
        offset: usize,
        /// Declared payload length
        declared: BigUint,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Schema text failed to compile or lacks the root message
    #[error("schema error: {0}")]
    Schema(String),

    /// Data text is not valid JSON
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    JsonParse {
        /// Parser message
        message: String,
        /// One-based line of the failure
        line: usize,
        /// One-based column of the failure
        column: usize,
    },

    /// JSON value does not conform to the root message
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new tag read error
    pub fn tag_read(offset: usize) -> Self {
        Self::TagRead { offset }
    }

    /// Creates a new truncated varint error
    pub fn truncated_varint(offset: usize) -> Self {
        Self::TruncatedVarint { offset }
    }

    /// Creates a new truncated payload error
    pub fn truncated_payload(
        offset: usize,
        declared: impl Into<BigUint>,
        available: usize,
    ) -> Self {
        Self::TruncatedPayload {
            offset,
            declared: declared.into(),
            available,
        }
    }

    /// Creates a new schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a new encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Byte offset of a decoding error, if this is one
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::TagRead { offset }
            | Self::TruncatedVarint { offset }
            | Self::TruncatedPayload { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns true if the buffer ended before a complete field was read
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::TagRead { .. } | Self::TruncatedVarint { .. } | Self::TruncatedPayload { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::tag_read(7);
        assert!(err.to_string().contains("cannot read type"));
        assert!(err.to_string().contains("offset 7"));

        let err = Error::truncated_payload(2, 127u32, 0);
        assert_eq!(
            err.to_string(),
            "cannot read payload at offset 2: declared 127 bytes, only 0 available"
        );
    }

    #[test]
    fn test_is_truncation() {
        assert!(Error::truncated_varint(0).is_truncation());
        assert!(Error::tag_read(0).is_truncation());
        assert!(!Error::schema("Root message not found").is_truncation());
    }

    #[test]
    fn test_offset() {
        assert_eq!(Error::truncated_varint(12).offset(), Some(12));
        assert_eq!(Error::encoding("bad").offset(), None);
    }

    #[test]
    fn test_json_error_position() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }")
            .unwrap_err()
            .into();
        match err {
            Error::JsonParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
