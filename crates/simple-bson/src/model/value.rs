//! Value types for BSON documents.
//!
//! [`Value`] is the closed set of values the codec understands, plus one
//! opaque [`Value::Extension`] slot for application types that a user
//! encoder or transformer knows how to handle.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use uuid::Uuid;

use crate::model::{Decimal, Document};
use crate::util::datetime::{datetime_to_millis, millis_to_datetime};

/// An application type carried in [`Value::Extension`].
///
/// Implemented for every `Debug + PartialEq + Send + Sync + 'static` type,
/// so wrapping a value only requires [`Value::extension`].
pub trait Extension: Any + fmt::Debug + Send + Sync {
    /// Upcasts to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compares against another extension value of possibly different type.
    fn dyn_eq(&self, other: &dyn Extension) -> bool;

    /// Returns the runtime kind used for encoder lookup.
    fn extension_kind(&self) -> ExtensionKind;
}

impl<T> Extension for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Extension) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn extension_kind(&self) -> ExtensionKind {
        ExtensionKind::of::<T>()
    }
}

/// Identifies an application type in the encoder table.
///
/// Equality and hashing use the `TypeId` only; the name is for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionKind {
    id: TypeId,
    name: &'static str,
}

impl ExtensionKind {
    /// Returns the kind of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ExtensionKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ExtensionKind {}

impl Hash for ExtensionKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Runtime kind of a value, the key of the encoder table.
///
/// All integer variants share [`Kind::Integer`]; the wire width is chosen by
/// magnitude, not by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Binary,
    Uuid,
    Custom,
    DateTime,
    Decimal,
    Document,
    Array,
    Extension(ExtensionKind),
}

impl Kind {
    /// Returns the kind of an application type stored as an extension.
    pub fn of<T: Any>() -> Kind {
        Kind::Extension(ExtensionKind::of::<T>())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Binary => "binary",
            Kind::Uuid => "uuid",
            Kind::Custom => "custom binary",
            Kind::DateTime => "datetime",
            Kind::Decimal => "decimal",
            Kind::Document => "document",
            Kind::Array => "array",
            Kind::Extension(ext) => ext.name(),
        };
        f.write_str(name)
    }
}

/// A value that can be stored in a document.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence marker.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer that fits in 32 bits.
    Int32(i32),

    /// Integer that fits in 64 bits.
    Int64(i64),

    /// Integer outside the 64-bit range.
    BigInt(BigInt),

    /// Fixed-point decimal.
    Decimal(Decimal),

    /// 64-bit IEEE 754 float.
    Float64(f64),

    /// UTF-8 string.
    String(String),

    /// Generic binary (subtype 0x00).
    Binary(Vec<u8>),

    /// UUID binary (subtype 0x04).
    Uuid(Uuid),

    /// Binary with an explicit subtype, written verbatim.
    Custom { subtype: u8, payload: Vec<u8> },

    /// UTC datetime as milliseconds since the Unix epoch.
    DateTime(i64),

    /// Embedded document.
    Document(Document),

    /// Array of values.
    Array(Vec<Value>),

    /// Application value without a built-in wire form.
    Extension(Arc<dyn Extension>),
}

impl Value {
    /// Wraps an application value.
    pub fn extension<T: Extension>(value: T) -> Value {
        Value::Extension(Arc::new(value))
    }

    /// Creates the narrowest integer variant holding `value`.
    pub fn integer(value: BigInt) -> Value {
        if let Some(v) = value.to_i32() {
            Value::Int32(v)
        } else if let Some(v) = value.to_i64() {
            Value::Int64(v)
        } else {
            Value::BigInt(value)
        }
    }

    /// Creates an array from anything convertible to values.
    pub fn array<I, T>(items: I) -> Value
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int32(_) | Value::Int64(_) | Value::BigInt(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::Float64(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Binary(_) => Kind::Binary,
            Value::Uuid(_) => Kind::Uuid,
            Value::Custom { .. } => Kind::Custom,
            Value::DateTime(_) => Kind::DateTime,
            Value::Document(_) => Kind::Document,
            Value::Array(_) => Kind::Array,
            Value::Extension(ext) => Kind::Extension(ext.extension_kind()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any integer variant that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::BigInt(v) => v.to_i64(),
            _ => None,
        }
    }

    /// Returns any integer variant as a `BigInt`.
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Int32(v) => Some(BigInt::from(*v)),
            Value::Int64(v) => Some(BigInt::from(*v)),
            Value::BigInt(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            Value::Custom { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the datetime, or `None` if out of chrono's range.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(ms) => millis_to_datetime(*ms),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the application value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Extension(ext) => ext.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // Integers compare by value whichever variant holds them
            (
                Value::Int32(_) | Value::Int64(_) | Value::BigInt(_),
                Value::Int32(_) | Value::Int64(_) | Value::BigInt(_),
            ) => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a == b,
                (None, None) => self.as_bigint() == other.as_bigint(),
                _ => false,
            },
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (
                Value::Custom { subtype: s1, payload: p1 },
                Value::Custom { subtype: s2, payload: p2 },
            ) => s1 == s2 && p1 == p2,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Extension(a), Value::Extension(b)) => a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        match i32::try_from(v) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(v),
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::from(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::integer(BigInt::from(v))
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::integer(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(datetime_to_millis(v))
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Fraction(i64, i64);

    #[test]
    fn test_integer_normalization() {
        assert_eq!(Value::from(0i64), Value::Int32(0));
        assert_eq!(Value::from(i64::from(i32::MAX) + 1), Value::Int64(1 << 31));
        assert_eq!(Value::from(u64::MAX), Value::BigInt(BigInt::from(u64::MAX)));
        assert_eq!(Value::integer(BigInt::from(-5)), Value::Int32(-5));
        assert_eq!(Value::integer(BigInt::from(i64::MIN)), Value::Int64(i64::MIN));
    }

    #[test]
    fn test_integer_variants_share_kind() {
        assert_eq!(Value::Int32(1).kind(), Kind::Integer);
        assert_eq!(Value::Int64(1).kind(), Kind::Integer);
        assert_eq!(Value::BigInt(BigInt::from(1)).kind(), Kind::Integer);
        assert_eq!(Value::Int32(7).as_i64(), Some(7));
    }

    #[test]
    fn test_integer_equality_ignores_variant() {
        assert_eq!(Value::Int64(5), Value::Int32(5));
        assert_eq!(Value::BigInt(BigInt::from(7)), Value::Int32(7));
        assert_eq!(Value::BigInt(BigInt::from(i64::MIN)), Value::Int64(i64::MIN));
        assert_ne!(Value::Int64(5), Value::Int32(6));
        assert_ne!(Value::Int64(i64::MAX), Value::BigInt(BigInt::from(2).pow(73)));
        assert_eq!(
            Value::BigInt(BigInt::from(2).pow(73)),
            Value::BigInt(BigInt::from(2).pow(73))
        );
        // Integers never equal floats or decimals
        assert_ne!(Value::Int32(1), Value::Float64(1.0));
        assert_eq!(
            Value::Int64(-3).as_bigint(),
            Some(BigInt::from(-3))
        );
    }

    #[test]
    fn test_extension_kind_and_equality() {
        let a = Value::extension(Fraction(3, 4));
        let b = Value::extension(Fraction(3, 4));
        let c = Value::extension(Fraction(1, 2));

        assert_eq!(a.kind(), Kind::of::<Fraction>());
        assert_ne!(a.kind(), Kind::of::<String>());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Value::extension("3/4".to_string()));
        assert_eq!(a.downcast_ref::<Fraction>(), Some(&Fraction(3, 4)));
        assert_eq!(a.downcast_ref::<String>(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Custom.to_string(), "custom binary");
        assert!(Kind::of::<Fraction>().to_string().ends_with("Fraction"));
    }
}
