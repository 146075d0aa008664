//! Utility modules.

pub mod datetime;

pub use datetime::{
    datetime_to_millis, format_millis_rfc3339, millis_to_datetime, parse_rfc3339_millis,
    DateTimeParseError,
};
