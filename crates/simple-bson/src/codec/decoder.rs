//! Document decoding.
//!
//! Element payloads are framed here by their type tag and handed to the
//! decoder table, user decoders first. Documents and arrays are always
//! framed and decoded here; once a document's elements are decoded the
//! recreators get a chance to replace it, so recreation runs innermost
//! first.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::primitives::Reader;
use crate::codec::value::{CodecTable, DecodeFn, DecoderKey, ElementType};
use crate::error::DecodeError;
use crate::limits::{
    LENGTH_PREFIX_LEN, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MIN_DOCUMENT_SIZE, TERMINATOR,
};
use crate::model::{Document, Value};

/// Decode-side hook that may replace a freshly decoded document.
pub type RecreateFn = Arc<dyn Fn(&Document) -> Option<Value> + Send + Sync>;

/// Decodes documents from bytes.
///
/// Configuration is fixed at construction; a decoder is cheap to clone and
/// can be shared across threads.
#[derive(Clone)]
pub struct Decoder {
    decoders: Arc<CodecTable>,
    recreators: Arc<[RecreateFn]>,
    max_depth: usize,
    max_document_size: usize,
}

impl Decoder {
    /// Creates a decoder with only the built-in codecs.
    pub fn new() -> Self {
        DecoderBuilder::new().build()
    }

    /// Starts building a configured decoder.
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// Reads exactly one document from `source`.
    ///
    /// The length prefix is validated before the body is read, so a hostile
    /// prefix cannot force a large allocation.
    pub fn decode<R: Read>(&self, source: &mut R) -> Result<Value, DecodeError> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        source
            .read_exact(&mut prefix)
            .map_err(|e| DecodeError::from_io(e, "document length"))?;
        let len = self.check_length(i32::from_le_bytes(prefix))?;

        let mut buf = vec![0u8; len];
        buf[..LENGTH_PREFIX_LEN].copy_from_slice(&prefix);
        source
            .read_exact(&mut buf[LENGTH_PREFIX_LEN..])
            .map_err(|e| DecodeError::from_io(e, "document"))?;

        self.from_bytes(&buf)
    }

    /// Decodes one document occupying all of `bytes`.
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(bytes);
        let value = self.read_document(&mut reader, 1)?;
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                count: reader.remaining_len(),
            });
        }
        debug!(bytes = bytes.len(), "decoded document");
        Ok(value)
    }

    fn check_length(&self, len: i32) -> Result<usize, DecodeError> {
        let size = usize::try_from(len).unwrap_or(0);
        if size < MIN_DOCUMENT_SIZE {
            return Err(DecodeError::InvalidLength {
                context: "document",
                len: i64::from(len),
            });
        }
        if size > self.max_document_size {
            return Err(DecodeError::DocumentTooLarge {
                len: size,
                max: self.max_document_size,
            });
        }
        Ok(size)
    }

    /// Reads a length-prefixed element list and returns the elements
    /// without the prefix and terminator.
    fn read_framed<'a>(&self, reader: &mut Reader<'a>, depth: usize) -> Result<&'a [u8], DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::NestingTooDeep {
                max: self.max_depth,
            });
        }
        let len = self.check_length(reader.read_i32("document length")?)?;
        let body = reader.read_bytes(len - LENGTH_PREFIX_LEN, "document")?;
        match body.split_last() {
            Some((&TERMINATOR, elements)) => Ok(elements),
            _ => Err(DecodeError::MalformedDocument {
                context: "document terminator is not 0x00",
            }),
        }
    }

    fn read_document(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Value, DecodeError> {
        let mut elements = Reader::new(self.read_framed(reader, depth)?);
        let mut doc = Document::new();
        while !elements.is_empty() {
            let (key, value) = self.read_element(&mut elements, depth)?;
            doc.insert(key, value);
        }
        Ok(self.recreate(doc))
    }

    /// Reads an array, ordering elements by their numeric keys.
    fn read_array(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Value, DecodeError> {
        let mut elements = Reader::new(self.read_framed(reader, depth)?);
        let mut items: Vec<(u64, Value)> = Vec::new();
        while !elements.is_empty() {
            let (key, value) = self.read_element(&mut elements, depth)?;
            let index = parse_index(key).ok_or_else(|| DecodeError::InvalidArrayKey {
                key: key.to_string(),
            })?;
            items.push((index, value));
        }
        items.sort_by_key(|(index, _)| *index);
        Ok(Value::Array(items.into_iter().map(|(_, value)| value).collect()))
    }

    fn read_element<'a>(
        &self,
        reader: &mut Reader<'a>,
        depth: usize,
    ) -> Result<(&'a str, Value), DecodeError> {
        let tag = reader.read_byte("element type")?;
        let element_type = ElementType::from_u8(tag).ok_or(DecodeError::UnknownTypeCode { tag })?;
        let key = reader.read_cstring("element name")?;

        let value = match element_type {
            ElementType::Document => self.read_document(reader, depth + 1)?,
            ElementType::Array => self.read_array(reader, depth + 1)?,
            ElementType::Binary => {
                let len = reader.read_len("binary length")?;
                let subtype = reader.read_byte("binary subtype")?;
                let payload = reader.read_bytes(len, "binary")?;
                let decode = self
                    .lookup(&DecoderKey::binary(subtype))
                    .ok_or(DecodeError::UnknownBinarySubtype { subtype })?;
                decode(payload)?
            }
            ElementType::String => {
                let len = reader.read_len("string length")?;
                let bytes = reader.read_bytes(len, "string")?;
                let content = match bytes.split_last() {
                    Some((&TERMINATOR, content)) => content,
                    _ => {
                        return Err(DecodeError::MalformedDocument {
                            context: "string terminator is not 0x00",
                        });
                    }
                };
                self.decode_element(element_type, content)?
            }
            fixed => {
                let payload = reader.read_bytes(fixed_width(fixed), "element")?;
                self.decode_element(fixed, payload)?
            }
        };
        Ok((key, value))
    }

    fn decode_element(&self, element_type: ElementType, payload: &[u8]) -> Result<Value, DecodeError> {
        let decode = self
            .lookup(&DecoderKey::element(element_type))
            .ok_or(DecodeError::UnknownTypeCode {
                tag: element_type.as_u8(),
            })?;
        decode(payload)
    }

    fn lookup(&self, key: &DecoderKey) -> Option<&DecodeFn> {
        match self.decoders.decoder(key) {
            Some(decode) => {
                trace!(?key, "using registered decoder");
                Some(decode)
            }
            None => CodecTable::defaults().decoder(key),
        }
    }

    fn recreate(&self, doc: Document) -> Value {
        for (idx, recreate) in self.recreators.iter().enumerate() {
            if let Some(value) = recreate(&doc) {
                trace!(recreator = idx, "document recreated");
                return value;
            }
        }
        Value::Document(doc)
    }
}

/// Parses an array key: ASCII digits only, no sign.
fn parse_index(key: &str) -> Option<u64> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Payload width of the fixed-size element types.
fn fixed_width(element_type: ElementType) -> usize {
    match element_type {
        ElementType::Float64 | ElementType::DateTime | ElementType::Int64 => 8,
        ElementType::Int32 => 4,
        ElementType::Bool => 1,
        _ => 0,
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("decoders", &self.decoders)
            .field("recreators", &self.recreators.len())
            .field("max_depth", &self.max_depth)
            .field("max_document_size", &self.max_document_size)
            .finish()
    }
}

/// Builder for a [`Decoder`].
pub struct DecoderBuilder {
    decoders: CodecTable,
    recreators: Vec<RecreateFn>,
    max_depth: usize,
    max_document_size: usize,
}

impl DecoderBuilder {
    /// Creates a builder with no overrides and the default limits.
    pub fn new() -> Self {
        Self {
            decoders: CodecTable::new(),
            recreators: Vec::new(),
            max_depth: MAX_NESTING_DEPTH,
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }

    /// Registers a decoder for `key`, taking precedence over the default.
    ///
    /// Document and array tags are always decoded structurally; decoders
    /// registered for them are never consulted.
    pub fn decoder<F>(mut self, key: DecoderKey, decode: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Value, DecodeError> + Send + Sync + 'static,
    {
        self.decoders.register_decoder(key, decode);
        self
    }

    /// Appends a recreator; recreators are tried in registration order.
    pub fn recreator<F>(mut self, recreate: F) -> Self
    where
        F: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        self.recreators.push(Arc::new(recreate));
        self
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum accepted document size, including nested ones.
    pub fn max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }

    pub fn build(self) -> Decoder {
        Decoder {
            decoders: Arc::new(self.decoders),
            recreators: self.recreators.into(),
            max_depth: self.max_depth,
            max_document_size: self.max_document_size,
        }
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::Encoder;
    use crate::doc;
    use std::sync::Mutex;

    fn encode(value: Value) -> Vec<u8> {
        Encoder::new().to_bytes(&value).unwrap()
    }

    #[test]
    fn test_simple_document() {
        let bytes = [0x0C, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];
        let value = Decoder::new().from_bytes(&bytes).unwrap();
        assert_eq!(value, Value::from(doc! { "a" => 1 }));
    }

    #[test]
    fn test_decode_from_reader() {
        let bytes = encode(doc! { "name" => "x", "n" => 2.5 }.into());
        let mut stream = bytes.clone();
        stream.extend_from_slice(b"next");

        let mut cursor = std::io::Cursor::new(stream);
        let value = Decoder::new().decode(&mut cursor).unwrap();
        assert_eq!(value, Value::from(doc! { "name" => "x", "n" => 2.5 }));
        // Only the document is consumed
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn test_bad_terminator() {
        let mut bytes = encode(doc! { "a" => 1 }.into());
        *bytes.last_mut().unwrap() = 0x01;
        assert!(matches!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_unknown_type_code() {
        let mut bytes = encode(doc! { "a" => 1 }.into());
        bytes[4] = 0x39;
        assert_eq!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::UnknownTypeCode { tag: 0x39 })
        );
    }

    #[test]
    fn test_unknown_binary_subtype() {
        let mut bytes = encode(doc! { "b" => vec![1u8, 2, 3] }.into());
        // tag, "b\0", len(4)
        bytes[11] = 0x42;
        assert_eq!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::UnknownBinarySubtype { subtype: 0x42 })
        );
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = encode(doc! { "a" => "hello" }.into());
        let mut short = &bytes[..bytes.len() - 3];
        assert!(matches!(
            Decoder::new().decode(&mut short),
            Err(DecodeError::Truncated { .. })
        ));

        let mut empty: &[u8] = &[];
        assert!(matches!(
            Decoder::new().decode(&mut empty),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_length_prefix_bounds() {
        let decoder = Decoder::new();
        assert!(matches!(
            decoder.from_bytes(&[4, 0, 0, 0, 0]),
            Err(DecodeError::InvalidLength { len: 4, .. })
        ));
        assert!(matches!(
            decoder.from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0]),
            Err(DecodeError::InvalidLength { len: -1, .. })
        ));

        let small = Decoder::builder().max_document_size(16).build();
        let bytes = encode(doc! { "s" => "x".repeat(32) }.into());
        assert!(matches!(
            small.decode(&mut bytes.as_slice()),
            Err(DecodeError::DocumentTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(Document::new().into());
        bytes.push(0);
        assert_eq!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn test_embedded_length_overrun() {
        let mut bytes = encode(doc! { "d" => doc! { "x" => 1 } }.into());
        // Embedded document length claims more than the parent holds
        bytes[7] = 0x40;
        assert!(matches!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_string_terminator_checked() {
        let mut bytes = encode(doc! { "s" => "ab" }.into());
        // tag, "s\0", len(4), 'a', 'b', NUL
        bytes[13] = b'c';
        assert!(matches!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_array_keys_sorted_numerically() {
        // ["c" at 10, "a" at 2, "b" at 9]
        let mut elements = Vec::new();
        for (key, value) in [("10", b'c'), ("2", b'a'), ("9", b'b')] {
            elements.push(0x02);
            elements.extend_from_slice(key.as_bytes());
            elements.push(0);
            elements.extend_from_slice(&2i32.to_le_bytes());
            elements.extend_from_slice(&[value, 0]);
        }
        let mut array = ((elements.len() + 5) as i32).to_le_bytes().to_vec();
        array.extend_from_slice(&elements);
        array.push(0);

        let mut bytes = ((array.len() + 8) as i32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0x04, b'l', 0]);
        bytes.extend_from_slice(&array);
        bytes.push(0);

        let value = Decoder::new().from_bytes(&bytes).unwrap();
        assert_eq!(value, Value::from(doc! { "l" => Value::array(["a", "b", "c"]) }));
    }

    #[test]
    fn test_array_key_must_be_numeric() {
        let mut bytes = encode(doc! { "l" => Value::array([true]) }.into());
        // tag, "l\0", len(4), tag, key
        bytes[12] = b'x';
        assert_eq!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::InvalidArrayKey { key: "x".to_string() })
        );
    }

    #[test]
    fn test_array_key_rejects_sign() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("007"), Some(7));
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index(" 1"), None);

        let mut bytes = encode(doc! { "l" => Value::array([true, false]) }.into());
        // Rewrite the second key "1" as "+" so it still fits in one byte
        let second_key = bytes.len() - 5;
        assert_eq!(bytes[second_key], b'1');
        bytes[second_key] = b'+';
        assert_eq!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::InvalidArrayKey { key: "+".to_string() })
        );
    }

    #[test]
    fn test_duplicate_keys_last_value_wins() {
        let mut bytes = vec![0u8; 4];
        for value in [1u8, 2] {
            bytes.extend_from_slice(&[0x10, b'k', 0, value, 0, 0, 0]);
        }
        bytes.push(0);
        let len = bytes.len() as i32;
        bytes[..4].copy_from_slice(&len.to_le_bytes());

        let value = Decoder::new().from_bytes(&bytes).unwrap();
        assert_eq!(value, Value::from(doc! { "k" => 2 }));
    }

    #[test]
    fn test_decoder_override() {
        let decoder = Decoder::builder()
            .decoder(DecoderKey::element(ElementType::Int32), |bytes| {
                let n = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(Value::from(n.to_string()))
            })
            .build();
        let bytes = encode(doc! { "n" => 7 }.into());
        assert_eq!(
            decoder.from_bytes(&bytes).unwrap(),
            Value::from(doc! { "n" => "7" })
        );
    }

    #[test]
    fn test_recreators_run_innermost_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let decoder = Decoder::builder()
            .recreator(move |doc| {
                let name = doc.get("name").and_then(Value::as_str).unwrap_or("?");
                log.lock().unwrap().push(name.to_string());
                None
            })
            .build();

        let bytes = encode(
            doc! {
                "name" => "outer",
                "child" => doc! { "name" => "inner" },
            }
            .into(),
        );
        decoder.from_bytes(&bytes).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["inner", "outer"]);
    }

    #[test]
    fn test_first_recreator_wins() {
        let decoder = Decoder::builder()
            .recreator(|doc| doc.contains_key("a").then(|| Value::from("first")))
            .recreator(|_| Some(Value::from("second")))
            .build();

        let bytes = encode(doc! { "inner" => doc! { "a" => 1 }, "other" => doc! { "b" => 1 } }.into());
        // The root is replaced by the catch-all too
        assert_eq!(decoder.from_bytes(&bytes).unwrap(), Value::from("second"));

        let decoder = Decoder::builder()
            .recreator(|doc| doc.contains_key("a").then(|| Value::from("first")))
            .build();
        assert_eq!(
            decoder.from_bytes(&bytes).unwrap(),
            Value::from(doc! { "inner" => "first", "other" => doc! { "b" => 1 } })
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut value = Value::from(doc! { "leaf" => 1 });
        for _ in 0..9 {
            value = doc! { "d" => value }.into();
        }
        let bytes = encode(value);

        assert!(Decoder::builder().max_depth(10).build().from_bytes(&bytes).is_ok());
        assert_eq!(
            Decoder::builder().max_depth(9).build().from_bytes(&bytes),
            Err(DecodeError::NestingTooDeep { max: 9 })
        );
    }

    #[test]
    fn test_invalid_bool_byte() {
        let mut bytes = encode(doc! { "t" => true }.into());
        bytes[7] = 2;
        assert!(matches!(
            Decoder::new().from_bytes(&bytes),
            Err(DecodeError::InvalidBool { value: 2 })
        ));
    }
}
