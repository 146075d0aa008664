//! Simple BSON: a self-describing binary document codec.
//!
//! This crate encodes string-keyed documents of dynamically typed values to
//! a BSON-compatible byte layout and decodes them back, with hooks for
//! application types.
//!
//! # Overview
//!
//! - **Documents at the root**: every encoded unit is one length-prefixed
//!   document
//! - **Big numbers**: integers beyond 64 bits and exact decimals travel in a
//!   binary extension (subtype `0x80`)
//! - **Extensible**: custom encoders and decoders, encode-side transformers
//!   and decode-side recreators
//!
//! # Quick Start
//!
//! ```rust
//! use simple_bson::{doc, from_bytes, to_bytes, Value};
//!
//! let value: Value = doc! {
//!     "name" => "Alice",
//!     "tags" => Value::array(["a", "b"]),
//!     "big" => num_bigint::BigInt::from(2).pow(73),
//! }
//! .into();
//!
//! let bytes = to_bytes(&value).unwrap();
//! let decoded = from_bytes(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Value, Document and Decimal types
//! - [`codec`]: Encoder, Decoder and the codec tables
//! - [`error`]: Error types
//! - [`limits`]: Wire constants and decoding limits
//! - [`util`]: Datetime helpers
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Length prefixes are validated before anything is allocated
//! - Nesting depth and document size are bounded by configurable limits
//! - Invalid data is rejected with descriptive errors
//!
//! # Wire Format
//!
//! ```text
//! document := i32 len + element* + 0x00
//! element  := tag:u8 + name:cstring + payload
//! ```
//!
//! All integers and floats are little-endian. Arrays are documents keyed
//! `"0"`, `"1"`, and so on.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod util;

// Re-export commonly used types at crate root
pub use codec::{
    decode, encode, from_bytes, to_bytes, CodecTable, Decoder, DecoderBuilder, DecoderKey,
    ElementType, Encoder, EncoderBuilder,
};
pub use error::{DecodeError, EncodeError, ErrorCode};
pub use model::{Decimal, Document, Extension, ExtensionKind, Kind, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
