//! Wire constants and default decoding limits.
//!
//! The limits protect the decoder against untrusted input. Both the encoder
//! and the decoder can be configured with tighter or looser values through
//! their builders.

/// Size of a document length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Smallest possible document: a length prefix plus the terminator.
pub const MIN_DOCUMENT_SIZE: usize = LENGTH_PREFIX_LEN + 1;

/// Default maximum encoded document size (16 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum nesting depth of documents and arrays.
///
/// The root document is depth 1. Transformer substitutions count as an
/// additional level so a transformer that keeps returning unsupported values
/// terminates with an error instead of recursing forever.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Terminator byte for documents, strings and element names.
pub const TERMINATOR: u8 = 0x00;

/// Fixed payload length of a UUID binary.
pub const UUID_LEN: usize = 16;
