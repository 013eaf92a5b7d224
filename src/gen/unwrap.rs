//! Response Unwrapper
//!
//! Providers wrap the intended payload in one of a small set of envelope
//! shapes: the payload directly, `{ <single key>: payload }`, or a composite
//! top-level object carrying recognized marker keys. The unwrapper codifies
//! the observed shapes as an explicit priority list — first match wins —
//! rather than open-ended reflection, which bounds the heuristic and keeps
//! it testable.
//!
//! Known limitation: when a response legitimately contains multiple
//! object-valued top-level keys, "first object-valued key" is ambiguous.
//! Insertion order is used as the best-effort tiebreak.

use serde_json::Value;

use crate::types::{RecapError, Result};

/// Section name prefix marking composite (integrated) generations whose
/// top-level shape is itself the payload.
const COMPOSITE_SECTION_PREFIX: &str = "integrated";

/// Marker keys identifying a composite report payload at the top level.
const COMPOSITE_MARKER_KEYS: &[&str] = &["report_sections", "overview"];

/// Locate the intended payload inside a parsed provider response.
///
/// Priority order:
/// 1. composite section with a recognized marker key → the object itself
/// 2. exactly one top-level key holding a non-array object → that value
/// 3. single top-level string value → scan for the first object-valued key,
///    falling back to the object itself
/// 4. anything else that is still an object → the object itself
///
/// Arrays, null, and empty objects fail with [`RecapError::UnexpectedShape`].
/// Regardless of the path taken, the final result must be a non-null,
/// non-array object or the call fails with [`RecapError::InvalidResultType`].
pub fn unwrap_payload(parsed: Value, section: &str) -> Result<Value> {
    let candidate = select_candidate(parsed, section)?;

    // Post-condition: applies regardless of which branch matched.
    if !candidate.is_object() {
        return Err(RecapError::InvalidResultType {
            section: section.to_string(),
            keys: available_keys(&candidate),
        });
    }

    Ok(candidate)
}

fn select_candidate(parsed: Value, section: &str) -> Result<Value> {
    let obj = match &parsed {
        Value::Object(obj) if !obj.is_empty() => obj,
        other => {
            return Err(RecapError::UnexpectedShape {
                section: section.to_string(),
                detail: format!("expected a non-empty object, got {}", shape_name(other)),
            });
        }
    };

    // 1. Composite generations already are the payload.
    if is_composite_section(section)
        && COMPOSITE_MARKER_KEYS.iter().any(|k| obj.contains_key(*k))
    {
        return Ok(parsed);
    }

    if obj.len() == 1 {
        if let Some((_key, value)) = obj.iter().next() {
            // 2. Single wrapper key around an object payload.
            if value.is_object() {
                return Ok(value.clone());
            }

            // 3. Single string value: the model nested the payload one level
            //    off. Scan for the first object-valued key; none found means
            //    the parsed object itself is the best candidate.
            if value.is_string() {
                if let Some(inner) = obj.values().find(|v| v.is_object()) {
                    return Ok(inner.clone());
                }
                return Ok(parsed);
            }
        }
    }

    // 4. Multi-key objects are treated as the payload directly.
    Ok(parsed)
}

fn is_composite_section(section: &str) -> bool {
    section.starts_with(COMPOSITE_SECTION_PREFIX)
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "empty object",
    }
}

/// Snapshot of top-level keys for diagnostics; bounded, no values included.
fn available_keys(value: &Value) -> String {
    match value {
        Value::Object(obj) => obj
            .keys()
            .take(10)
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        other => shape_name(other).to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
