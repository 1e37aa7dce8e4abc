//! Text extraction from structured error payloads.
//!
//! Walks descriptive fields breadth-limited and depth-limited, so arbitrarily
//! nested or oversized payloads still terminate.

use serde_json::Value;

/// Deepest nesting level inspected.
const MAX_DEPTH: usize = 8;

/// Array elements inspected per level.
const MAX_ITEMS: usize = 16;

/// Upper bound on collected text, in bytes.
const MAX_TEXT_BYTES: usize = 4096;

/// Object fields that carry human-readable error text, in priority order.
const DESCRIPTIVE_FIELDS: &[&str] = &[
    "message",
    "error_description",
    "error",
    "jse_message",
    "reason",
    "data",
    "stack",
    "format",
    "name",
];

/// Descriptive text segments found in `value`, most prominent first.
pub fn text_segments(value: &Value) -> Vec<String> {
    let mut segments = Vec::new();
    let mut budget = MAX_TEXT_BYTES;
    collect(value, 0, &mut segments, &mut budget);
    segments
}

fn collect(value: &Value, depth: usize, out: &mut Vec<String>, budget: &mut usize) {
    if depth > MAX_DEPTH || *budget == 0 {
        return;
    }
    match value {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return;
            }
            let mut end = text.len().min(*budget);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            if end == 0 {
                return;
            }
            *budget -= end;
            out.push(text[..end].to_string());
        }
        Value::Object(map) => {
            for field in DESCRIPTIVE_FIELDS {
                if let Some(inner) = map.get(*field) {
                    collect(inner, depth + 1, out, budget);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter().take(MAX_ITEMS) {
                collect(item, depth + 1, out, budget);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
