//! Error types for BSON encoding and decoding.

use std::io;

use thiserror::Error;

use crate::model::Kind;

/// Coarse error categories, used as message prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Fewer bytes than required
    Truncated,
    /// E002: Structural violation (terminator, framing, lengths)
    MalformedDocument,
    /// E003: Unknown element type or binary subtype
    UnknownType,
    /// E004: Invalid UTF-8 encoding
    InvalidUtf8,
    /// E005: Configured limit exceeded
    LimitExceeded,
    /// E006: Failure raised by a user codec or the underlying stream
    External,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::Truncated => "E001",
            ErrorCode::MalformedDocument => "E002",
            ErrorCode::UnknownType => "E003",
            ErrorCode::InvalidUtf8 => "E004",
            ErrorCode::LimitExceeded => "E005",
            ErrorCode::External => "E006",
        }
    }
}

/// Error during decoding.
///
/// Every decode error is fatal to the current call; no partial document is
/// ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Truncated ===
    #[error("[E001] unexpected end of input while reading {context}")]
    Truncated { context: &'static str },

    // === E002: Malformed document ===
    #[error("[E002] malformed document: {context}")]
    MalformedDocument { context: &'static str },

    #[error("[E002] invalid {context} length: {len}")]
    InvalidLength { context: &'static str, len: i64 },

    #[error("[E002] invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("[E002] array key {key:?} is not an index")]
    InvalidArrayKey { key: String },

    #[error("[E002] {count} trailing bytes after document")]
    TrailingBytes { count: usize },

    // === E003: Unknown type ===
    #[error("[E003] unknown element type code: {tag:#04x}")]
    UnknownTypeCode { tag: u8 },

    #[error("[E003] unknown binary subtype: {subtype:#04x}")]
    UnknownBinarySubtype { subtype: u8 },

    // === E004: Invalid UTF-8 ===
    #[error("[E004] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    // === E005: Limits ===
    #[error("[E005] nesting depth exceeds maximum {max}")]
    NestingTooDeep { max: usize },

    #[error("[E005] document length {len} exceeds maximum {max}")]
    DocumentTooLarge { len: usize, max: usize },

    // === E006: External ===
    #[error("[E006] custom decoder failed: {message}")]
    Custom { message: String },

    #[error("[E006] I/O error: {0}")]
    Io(String),
}

impl DecodeError {
    /// Creates a [`DecodeError::Custom`] for use in user-supplied decoders.
    pub fn custom(message: impl Into<String>) -> Self {
        DecodeError::Custom {
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::Truncated { .. } => ErrorCode::Truncated,
            DecodeError::UnknownTypeCode { .. } | DecodeError::UnknownBinarySubtype { .. } => {
                ErrorCode::UnknownType
            }
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            DecodeError::NestingTooDeep { .. } | DecodeError::DocumentTooLarge { .. } => {
                ErrorCode::LimitExceeded
            }
            DecodeError::Custom { .. } | DecodeError::Io(_) => ErrorCode::External,
            _ => ErrorCode::MalformedDocument,
        }
    }

    /// Maps a stream error, treating a short read as truncated input.
    pub(crate) fn from_io(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated { context }
        } else {
            DecodeError::Io(err.to_string())
        }
    }
}

/// Error during encoding.
///
/// The document is assembled in memory before anything is written, so an
/// encode error never leaves partial output in the sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("root value must be a document, found {kind}")]
    InvalidRootValue { kind: Kind },

    #[error("no encoder or transformer handles values of kind {kind}")]
    UnsupportedType { kind: Kind },

    #[error("big-number exponent {exponent} exceeds signed byte range")]
    ExponentOverflow { exponent: i64 },

    #[error("element name {key:?} contains a NUL byte")]
    KeyContainsNul { key: String },

    #[error("nesting depth exceeds maximum {max}")]
    NestingTooDeep { max: usize },

    #[error("{field} length {len} exceeds maximum {max}")]
    DocumentTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("custom encoder failed: {message}")]
    Custom { message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl EncodeError {
    /// Creates an [`EncodeError::Custom`] for use in user-supplied encoders.
    pub fn custom(message: impl Into<String>) -> Self {
        EncodeError::Custom {
            message: message.into(),
        }
    }
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            DecodeError::Truncated { context: "x" }.code(),
            ErrorCode::Truncated
        );
        assert_eq!(
            DecodeError::UnknownTypeCode { tag: 0x39 }.code(),
            ErrorCode::UnknownType
        );
        assert_eq!(
            DecodeError::InvalidArrayKey { key: "a".into() }.code(),
            ErrorCode::MalformedDocument
        );
        assert_eq!(DecodeError::custom("boom").code().code(), "E006");
    }

    #[test]
    fn test_error_messages() {
        let err = DecodeError::UnknownTypeCode { tag: 0x39 };
        assert_eq!(err.to_string(), "[E003] unknown element type code: 0x39");

        let err = EncodeError::InvalidRootValue { kind: Kind::Array };
        assert_eq!(err.to_string(), "root value must be a document, found array");
    }

    #[test]
    fn test_short_read_maps_to_truncated() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(
            DecodeError::from_io(io_err, "document"),
            DecodeError::Truncated { context: "document" }
        );

        let io_err = io::Error::other("disk on fire");
        assert!(matches!(DecodeError::from_io(io_err, "document"), DecodeError::Io(_)));
    }
}
