//! Document encoding.
//!
//! Implements the encode side of the wire format:
//!
//! ```text
//! document := i32 len (incl. itself and terminator) + elements + 0x00
//! element  := tag:u8 + name:cstring + payload
//! ```
//!
//! Values are dispatched in this order: documents, arrays, user encoders,
//! default encoders, then transformers. The first transformer returning a
//! substitute wins and the substitute is encoded from the top again.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::primitives::Writer;
use crate::codec::value::{CodecTable, ElementType, EncodeFn};
use crate::error::EncodeError;
use crate::limits::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, TERMINATOR};
use crate::model::{Document, Kind, Value};

/// Encode-side fallback that substitutes an otherwise unsupported value.
pub type TransformFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Encodes documents to bytes.
///
/// Configuration is fixed at construction; an encoder is cheap to clone and
/// can be shared across threads.
#[derive(Clone)]
pub struct Encoder {
    encoders: Arc<CodecTable>,
    transformers: Arc<[TransformFn]>,
    max_depth: usize,
    max_document_size: usize,
}

impl Encoder {
    /// Creates an encoder with only the built-in codecs.
    pub fn new() -> Self {
        EncoderBuilder::new().build()
    }

    /// Starts building a configured encoder.
    pub fn builder() -> EncoderBuilder {
        EncoderBuilder::new()
    }

    /// Encodes `value` and writes it to `sink`, returning the byte count.
    ///
    /// The document is assembled in memory first, so on error nothing is
    /// written.
    pub fn encode<W: Write>(&self, value: &Value, sink: &mut W) -> Result<usize, EncodeError> {
        let bytes = self.to_bytes(value)?;
        sink.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Encodes `value` to a new buffer.
    ///
    /// Arrays are rejected at the root. Any other non-document value goes
    /// through the user encoders and transformers and must come out as a
    /// document, otherwise [`EncodeError::InvalidRootValue`] is returned.
    pub fn to_bytes(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        match value {
            Value::Document(doc) => self.encode_document(doc),
            Value::Array(_) => Err(EncodeError::InvalidRootValue { kind: Kind::Array }),
            other => {
                let mut writer = Writer::with_capacity(64);
                if self.encode_value(&mut writer, other, 0)? != ElementType::Document {
                    return Err(EncodeError::InvalidRootValue { kind: other.kind() });
                }
                self.finish(writer)
            }
        }
    }

    /// Encodes a document to a new buffer.
    pub fn encode_document(&self, doc: &Document) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::with_capacity(64);
        self.write_document(&mut writer, doc, 1)?;
        self.finish(writer)
    }

    fn finish(&self, writer: Writer) -> Result<Vec<u8>, EncodeError> {
        let len = writer.len();
        if len > self.max_document_size {
            return Err(EncodeError::DocumentTooLarge {
                field: "document",
                len,
                max: self.max_document_size,
            });
        }
        debug!(bytes = len, "encoded document");
        Ok(writer.into_bytes())
    }

    fn write_document(&self, writer: &mut Writer, doc: &Document, depth: usize) -> Result<(), EncodeError> {
        self.write_framed(writer, depth, |writer| {
            for (key, value) in doc.iter() {
                self.write_element(writer, key, value, depth)?;
            }
            Ok(())
        })
    }

    fn write_array(&self, writer: &mut Writer, items: &[Value], depth: usize) -> Result<(), EncodeError> {
        self.write_framed(writer, depth, |writer| {
            for (idx, value) in items.iter().enumerate() {
                self.write_element(writer, &idx.to_string(), value, depth)?;
            }
            Ok(())
        })
    }

    /// Writes the length prefix and terminator around `body`.
    fn write_framed<F>(&self, writer: &mut Writer, depth: usize, body: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Writer) -> Result<(), EncodeError>,
    {
        if depth > self.max_depth {
            return Err(EncodeError::NestingTooDeep {
                max: self.max_depth,
            });
        }
        let start = writer.reserve_i32();
        body(writer)?;
        writer.write_byte(TERMINATOR);

        let len = writer.len() - start;
        let len = i32::try_from(len).map_err(|_| EncodeError::DocumentTooLarge {
            field: "document",
            len,
            max: i32::MAX as usize,
        })?;
        writer.patch_i32(start, len);
        Ok(())
    }

    fn write_element(
        &self,
        writer: &mut Writer,
        key: &str,
        value: &Value,
        depth: usize,
    ) -> Result<(), EncodeError> {
        let tag_offset = writer.reserve_byte();
        writer.write_cstring(key)?;
        let tag = self.encode_value(writer, value, depth)?;
        writer.patch_byte(tag_offset, tag.as_u8());
        Ok(())
    }

    /// Writes the payload of a single value and returns its element type.
    fn encode_value(&self, writer: &mut Writer, value: &Value, depth: usize) -> Result<ElementType, EncodeError> {
        if depth > self.max_depth {
            return Err(EncodeError::NestingTooDeep {
                max: self.max_depth,
            });
        }

        match value {
            Value::Document(doc) => {
                self.write_document(writer, doc, depth + 1)?;
                return Ok(ElementType::Document);
            }
            Value::Array(items) => {
                self.write_array(writer, items, depth + 1)?;
                return Ok(ElementType::Array);
            }
            _ => {}
        }

        let kind = value.kind();
        if let Some(encode) = self.lookup(&kind) {
            return encode(value, writer);
        }

        for (idx, transform) in self.transformers.iter().enumerate() {
            if let Some(substitute) = transform(value) {
                trace!(%kind, transformer = idx, "value transformed");
                return self.encode_value(writer, &substitute, depth + 1);
            }
        }

        Err(EncodeError::UnsupportedType { kind })
    }

    fn lookup(&self, kind: &Kind) -> Option<&EncodeFn> {
        match self.encoders.encoder(kind) {
            Some(encode) => {
                trace!(%kind, "using registered encoder");
                Some(encode)
            }
            None => CodecTable::defaults().encoder(kind),
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("encoders", &self.encoders)
            .field("transformers", &self.transformers.len())
            .field("max_depth", &self.max_depth)
            .field("max_document_size", &self.max_document_size)
            .finish()
    }
}

/// Builder for an [`Encoder`].
pub struct EncoderBuilder {
    encoders: CodecTable,
    transformers: Vec<TransformFn>,
    max_depth: usize,
    max_document_size: usize,
}

impl EncoderBuilder {
    /// Creates a builder with no overrides and the default limits.
    pub fn new() -> Self {
        Self {
            encoders: CodecTable::new(),
            transformers: Vec::new(),
            max_depth: MAX_NESTING_DEPTH,
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }

    /// Registers an encoder for `kind`, taking precedence over the default.
    pub fn encoder<F>(mut self, kind: Kind, encode: F) -> Self
    where
        F: Fn(&Value, &mut Writer) -> Result<ElementType, EncodeError> + Send + Sync + 'static,
    {
        self.encoders.register_encoder(kind, encode);
        self
    }

    /// Appends a transformer; transformers are tried in registration order.
    pub fn transformer<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(transform));
        self
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum encoded document size.
    pub fn max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }

    pub fn build(self) -> Encoder {
        Encoder {
            encoders: Arc::new(self.encoders),
            transformers: self.transformers.into(),
            max_depth: self.max_depth,
            max_document_size: self.max_document_size,
        }
    }
}

impl Default for EncoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
