//! Bidirectional JSON codec for extraction results.
//!
//! Encoding tags every result with a stable `type` discriminator so
//! [`from_json`] can dispatch to the correct variant. Binary payloads
//! (image bytes, attachment bytes) are base64-encoded when
//! [`EncodeOptions::include_binary`] is set; otherwise the key is kept and
//! its value is an explicit null, never silently dropped, so the schema is
//! identical either way.
//!
//! Decoding is forward-compatible: unknown extra keys are ignored and
//! missing optional keys fall back to the type's default. Decoding a
//! structure encoded without binaries yields payload fields of `None`, not
//! an error.

use crate::error::Result;
use crate::types::DocumentContent;
use serde_json::Value;

/// Options controlling [`to_json`].
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// Include binary payloads (base64). When false the payload keys are
    /// emitted with null values.
    pub include_binary: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { include_binary: true }
    }
}

/// Encode an extraction result into a JSON-safe structure.
pub fn to_json(content: &DocumentContent, options: &EncodeOptions) -> Result<Value> {
    let mut value = serde_json::to_value(content)?;
    if !options.include_binary {
        strip_binary(&mut value);
    }
    Ok(value)
}

/// Decode a structure produced by [`to_json`] (or conforming to its schema)
/// back into a typed result.
pub fn from_json(value: Value) -> Result<DocumentContent> {
    Ok(serde_json::from_value(value)?)
}

/// Replace every binary payload value with null, keeping the key.
///
/// Payload-bearing objects (images, attachments) are recognized by carrying
/// both a `content_type` and a `data` key.
fn strip_binary(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("content_type") {
                if let Some(data) = map.get_mut("data") {
                    *data = Value::Null;
                }
            }
            for child in map.values_mut() {
                strip_binary(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_binary(item);
            }
        }
        _ => {}
    }
}
