//! Data model types for BSON documents.
//!
//! - [`Value`]: the tagged union of everything a document can hold
//! - [`Document`]: ordered string-keyed mapping
//! - [`Decimal`]: fixed-point decimal for the big-number extension
//! - [`Kind`]: runtime kind, used to key the encoder table

pub mod decimal;
pub mod document;
pub mod value;

pub use decimal::{Decimal, ParseDecimalError};
pub use document::Document;
pub use value::{Extension, ExtensionKind, Kind, Value};
