//! Simple dumper to inspect BSON files.
//!
//! Reads every document in the file and prints it as an indented tree.
//! Set `RUST_LOG=simple_bson=trace` to see codec tracing.

use std::fs;
use std::io::Cursor;

use simple_bson::util::format_millis_rfc3339;
use simple_bson::{Decoder, Value};

fn format_scalar(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("{}", b),
        Value::Int32(n) => format!("{} (int32)", n),
        Value::Int64(n) => format!("{} (int64)", n),
        Value::BigInt(n) => format!("{} (bigint)", n),
        Value::Decimal(d) => format!("{} (decimal)", d),
        Value::Float64(f) => format!("{}", f),
        Value::String(s) => {
            let preview: String = s.chars().take(80).collect();
            if s.chars().count() > 80 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::Binary(b) => format!("BYTES[{}]", b.len()),
        Value::Uuid(u) => format!("UUID({})", u),
        Value::Custom { subtype, payload } => {
            format!("BINARY(subtype={:#04x}, {} bytes)", subtype, payload.len())
        }
        Value::DateTime(ms) => format!("DATETIME({})", format_millis_rfc3339(*ms)),
        Value::Extension(ext) => format!("{:?}", ext),
        Value::Document(_) | Value::Array(_) => unreachable!("containers are printed by dump"),
    }
}

fn dump(name: &str, value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Document(doc) => {
            println!("{}{}: {{{} keys}}", pad, name, doc.len());
            for (key, child) in doc.iter() {
                dump(key, child, indent + 1);
            }
        }
        Value::Array(items) => {
            println!("{}{}: [{} items]", pad, name, items.len());
            for (idx, child) in items.iter().enumerate() {
                dump(&idx.to_string(), child, indent + 1);
            }
        }
        scalar => println!("{}{}: {}", pad, name, format_scalar(scalar)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .expect("usage: dump_document <file.bson>");

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let decoder = Decoder::new();
    let mut cursor = Cursor::new(data.as_slice());
    let mut count = 0;
    while (cursor.position() as usize) < data.len() {
        let value = decoder.decode(&mut cursor).expect("Failed to decode");
        dump(&format!("document {}", count), &value, 0);
        count += 1;
    }

    println!("\n{} documents", count);
}
