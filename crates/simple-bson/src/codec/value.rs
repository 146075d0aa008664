//! Element types and the default codec table.
//!
//! The table maps a value's [`Kind`] to an encode function and an element
//! type (plus binary subtype) to a decode function. The default table is
//! built once and shared; user tables passed to the encoder and decoder
//! builders are consulted first and never modify it.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use num_traits::ToPrimitive;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::codec::bignum::{decode_bignum, encode_bigint, encode_decimal};
use crate::codec::primitives::Writer;
use crate::error::{DecodeError, EncodeError};
use crate::limits::{TERMINATOR, UUID_LEN};
use crate::model::{Kind, Value};

/// Element type codes (BSON 1.0 subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Float64 = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Bool = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Int32 = 0x10,
    Int64 = 0x12,
}

impl ElementType {
    /// Creates an ElementType from its wire representation.
    pub fn from_u8(v: u8) -> Option<ElementType> {
        match v {
            0x01 => Some(ElementType::Float64),
            0x02 => Some(ElementType::String),
            0x03 => Some(ElementType::Document),
            0x04 => Some(ElementType::Array),
            0x05 => Some(ElementType::Binary),
            0x08 => Some(ElementType::Bool),
            0x09 => Some(ElementType::DateTime),
            0x0A => Some(ElementType::Null),
            0x10 => Some(ElementType::Int32),
            0x12 => Some(ElementType::Int64),
            _ => None,
        }
    }

    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Binary subtypes with a built-in decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinarySubtype {
    /// Raw bytes.
    Generic = 0x00,
    /// 16-byte UUID.
    Uuid = 0x04,
    /// Big-number extension, or any user-defined payload.
    Custom = 0x80,
}

impl BinarySubtype {
    /// Creates a BinarySubtype from its wire representation.
    pub fn from_u8(v: u8) -> Option<BinarySubtype> {
        match v {
            0x00 => Some(BinarySubtype::Generic),
            0x04 => Some(BinarySubtype::Uuid),
            0x80 => Some(BinarySubtype::Custom),
            _ => None,
        }
    }

    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Key of the decoder table: an element type, plus the subtype for binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderKey {
    pub element_type: ElementType,
    pub subtype: Option<u8>,
}

impl DecoderKey {
    /// Key for a non-binary element type.
    pub fn element(element_type: ElementType) -> Self {
        Self {
            element_type,
            subtype: None,
        }
    }

    /// Key for a binary subtype.
    pub fn binary(subtype: u8) -> Self {
        Self {
            element_type: ElementType::Binary,
            subtype: Some(subtype),
        }
    }
}

/// Writes a value's payload and returns its element type.
pub type EncodeFn =
    Arc<dyn Fn(&Value, &mut Writer) -> Result<ElementType, EncodeError> + Send + Sync>;

/// Decodes a framed payload.
///
/// Strings arrive without their length and terminator, binaries without
/// their length and subtype byte, fixed-width values as-is.
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> Result<Value, DecodeError> + Send + Sync>;

/// Encoder and decoder lookup tables.
#[derive(Clone, Default)]
pub struct CodecTable {
    encoders: FxHashMap<Kind, EncodeFn>,
    decoders: FxHashMap<DecoderKey, DecodeFn>,
}

lazy_static! {
    static ref DEFAULT_CODECS: CodecTable = CodecTable::build_defaults();
}

impl CodecTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared table of built-in codecs.
    pub fn defaults() -> &'static CodecTable {
        &DEFAULT_CODECS
    }

    /// Registers (or replaces) the encoder for a kind.
    pub fn register_encoder<F>(&mut self, kind: Kind, encode: F)
    where
        F: Fn(&Value, &mut Writer) -> Result<ElementType, EncodeError> + Send + Sync + 'static,
    {
        self.encoders.insert(kind, Arc::new(encode));
    }

    /// Registers (or replaces) the decoder for a key.
    pub fn register_decoder<F>(&mut self, key: DecoderKey, decode: F)
    where
        F: Fn(&[u8]) -> Result<Value, DecodeError> + Send + Sync + 'static,
    {
        self.decoders.insert(key, Arc::new(decode));
    }

    pub fn encoder(&self, kind: &Kind) -> Option<&EncodeFn> {
        self.encoders.get(kind)
    }

    pub fn decoder(&self, key: &DecoderKey) -> Option<&DecodeFn> {
        self.decoders.get(key)
    }

    fn build_defaults() -> Self {
        let mut table = CodecTable::new();

        table.register_encoder(Kind::Null, encode_null);
        table.register_encoder(Kind::Bool, encode_bool);
        table.register_encoder(Kind::Integer, encode_integer);
        table.register_encoder(Kind::Float, encode_float);
        table.register_encoder(Kind::String, encode_string);
        table.register_encoder(Kind::Binary, encode_binary);
        table.register_encoder(Kind::Uuid, encode_uuid);
        table.register_encoder(Kind::Custom, encode_custom);
        table.register_encoder(Kind::DateTime, encode_datetime);
        table.register_encoder(Kind::Decimal, encode_decimal_value);

        table.register_decoder(DecoderKey::element(ElementType::Float64), decode_float);
        table.register_decoder(DecoderKey::element(ElementType::String), decode_string);
        table.register_decoder(DecoderKey::element(ElementType::Bool), decode_bool);
        table.register_decoder(DecoderKey::element(ElementType::DateTime), decode_datetime);
        table.register_decoder(DecoderKey::element(ElementType::Null), decode_null);
        table.register_decoder(DecoderKey::element(ElementType::Int32), decode_int32);
        table.register_decoder(DecoderKey::element(ElementType::Int64), decode_int64);
        table.register_decoder(
            DecoderKey::binary(BinarySubtype::Generic.as_u8()),
            decode_binary,
        );
        table.register_decoder(DecoderKey::binary(BinarySubtype::Uuid.as_u8()), decode_uuid);
        table.register_decoder(
            DecoderKey::binary(BinarySubtype::Custom.as_u8()),
            decode_custom,
        );

        table
    }
}

impl fmt::Debug for CodecTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecTable")
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writes a binary payload: i32 length, subtype, bytes.
pub fn write_binary(writer: &mut Writer, subtype: u8, payload: &[u8]) -> Result<(), EncodeError> {
    writer.write_len(payload.len(), "binary")?;
    writer.write_byte(subtype);
    writer.write_bytes(payload);
    Ok(())
}

fn mismatch(value: &Value) -> EncodeError {
    EncodeError::UnsupportedType { kind: value.kind() }
}

fn encode_null(value: &Value, _writer: &mut Writer) -> Result<ElementType, EncodeError> {
    match value {
        Value::Null => Ok(ElementType::Null),
        _ => Err(mismatch(value)),
    }
}

fn encode_bool(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Bool(b) = value else {
        return Err(mismatch(value));
    };
    writer.write_byte(u8::from(*b));
    Ok(ElementType::Bool)
}

/// Encodes an integer as int32, int64 or big-number, by magnitude.
fn encode_integer(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let wide = match value {
        Value::Int32(v) => i64::from(*v),
        Value::Int64(v) => *v,
        Value::BigInt(big) => match big.to_i64() {
            Some(v) => v,
            None => {
                write_binary(writer, BinarySubtype::Custom.as_u8(), &encode_bigint(big)?)?;
                return Ok(ElementType::Binary);
            }
        },
        _ => return Err(mismatch(value)),
    };

    match i32::try_from(wide) {
        Ok(narrow) => {
            writer.write_i32(narrow);
            Ok(ElementType::Int32)
        }
        Err(_) => {
            writer.write_i64(wide);
            Ok(ElementType::Int64)
        }
    }
}

fn encode_float(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Float64(v) = value else {
        return Err(mismatch(value));
    };
    writer.write_f64(*v);
    Ok(ElementType::Float64)
}

fn encode_string(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::String(s) = value else {
        return Err(mismatch(value));
    };
    writer.write_len(s.len() + 1, "string")?;
    writer.write_bytes(s.as_bytes());
    writer.write_byte(TERMINATOR);
    Ok(ElementType::String)
}

fn encode_binary(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Binary(bytes) = value else {
        return Err(mismatch(value));
    };
    write_binary(writer, BinarySubtype::Generic.as_u8(), bytes)?;
    Ok(ElementType::Binary)
}

fn encode_uuid(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Uuid(uuid) = value else {
        return Err(mismatch(value));
    };
    write_binary(writer, BinarySubtype::Uuid.as_u8(), uuid.as_bytes())?;
    Ok(ElementType::Binary)
}

fn encode_custom(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Custom { subtype, payload } = value else {
        return Err(mismatch(value));
    };
    write_binary(writer, *subtype, payload)?;
    Ok(ElementType::Binary)
}

fn encode_datetime(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::DateTime(ms) = value else {
        return Err(mismatch(value));
    };
    writer.write_i64(*ms);
    Ok(ElementType::DateTime)
}

fn encode_decimal_value(value: &Value, writer: &mut Writer) -> Result<ElementType, EncodeError> {
    let Value::Decimal(d) = value else {
        return Err(mismatch(value));
    };
    write_binary(writer, BinarySubtype::Custom.as_u8(), &encode_decimal(d)?)?;
    Ok(ElementType::Binary)
}

// =============================================================================
// DECODING
// =============================================================================

fn fixed<const N: usize>(bytes: &[u8], context: &'static str) -> Result<[u8; N], DecodeError> {
    bytes
        .try_into()
        .map_err(|_| DecodeError::MalformedDocument { context })
}

fn decode_float(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(Value::Float64(f64::from_le_bytes(fixed(bytes, "float64 must be 8 bytes")?)))
}

fn decode_string(bytes: &[u8]) -> Result<Value, DecodeError> {
    std::str::from_utf8(bytes)
        .map(|s| Value::String(s.to_string()))
        .map_err(|_| DecodeError::InvalidUtf8 { field: "string" })
}

fn decode_bool(bytes: &[u8]) -> Result<Value, DecodeError> {
    let [byte] = fixed::<1>(bytes, "bool must be 1 byte")?;
    match byte {
        0x00 => Ok(Value::Bool(false)),
        0x01 => Ok(Value::Bool(true)),
        _ => Err(DecodeError::InvalidBool { value: byte }),
    }
}

fn decode_datetime(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(Value::DateTime(i64::from_le_bytes(fixed(bytes, "datetime must be 8 bytes")?)))
}

fn decode_null(bytes: &[u8]) -> Result<Value, DecodeError> {
    if !bytes.is_empty() {
        return Err(DecodeError::MalformedDocument {
            context: "null must have no payload",
        });
    }
    Ok(Value::Null)
}

fn decode_int32(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(Value::Int32(i32::from_le_bytes(fixed(bytes, "int32 must be 4 bytes")?)))
}

fn decode_int64(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(Value::Int64(i64::from_le_bytes(fixed(bytes, "int64 must be 8 bytes")?)))
}

fn decode_binary(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(Value::Binary(bytes.to_vec()))
}

fn decode_uuid(bytes: &[u8]) -> Result<Value, DecodeError> {
    let raw: [u8; UUID_LEN] = fixed(bytes, "uuid binary must be 16 bytes")?;
    Ok(Value::Uuid(Uuid::from_bytes(raw)))
}

fn decode_custom(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(decode_bignum(bytes)?.into_value())
}
