//! Binary encoding/decoding for BSON documents.
//!
//! The free functions use an [`Encoder`] or [`Decoder`] with only the
//! built-in codecs. Build your own through [`Encoder::builder`] and
//! [`Decoder::builder`] to register custom codecs, transformers and
//! recreators.

pub mod bignum;
pub mod decoder;
pub mod encoder;
pub mod primitives;
pub mod value;

use std::io::{Read, Write};

use lazy_static::lazy_static;

use crate::error::{DecodeError, EncodeError};
use crate::model::Value;

pub use bignum::{decode_bignum, encode_bigint, encode_bignum, encode_decimal, BigNum};
pub use decoder::{Decoder, DecoderBuilder, RecreateFn};
pub use encoder::{Encoder, EncoderBuilder, TransformFn};
pub use primitives::{Reader, Writer};
pub use value::{write_binary, BinarySubtype, CodecTable, DecodeFn, DecoderKey, ElementType, EncodeFn};

lazy_static! {
    static ref DEFAULT_ENCODER: Encoder = Encoder::new();
    static ref DEFAULT_DECODER: Decoder = Decoder::new();
}

/// Encodes a document to `sink` with the built-in codecs.
pub fn encode<W: Write>(value: &Value, sink: &mut W) -> Result<usize, EncodeError> {
    DEFAULT_ENCODER.encode(value, sink)
}

/// Encodes a document to a new buffer with the built-in codecs.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>, EncodeError> {
    DEFAULT_ENCODER.to_bytes(value)
}

/// Reads one document from `source` with the built-in codecs.
pub fn decode<R: Read>(source: &mut R) -> Result<Value, DecodeError> {
    DEFAULT_DECODER.decode(source)
}

/// Decodes a document occupying all of `bytes` with the built-in codecs.
pub fn from_bytes(bytes: &[u8]) -> Result<Value, DecodeError> {
    DEFAULT_DECODER.from_bytes(bytes)
}
