//! Schema Sanitizer
//!
//! Providers accept only a subset of JSON Schema keywords in their
//! constrained-output configuration; the rest are rejected at request time.
//! The sanitizer strips unsupported keywords while preserving the semantic
//! constraints of the schema:
//!
//! - `required` must stay a subset of `properties` (violations are fatal,
//!   never silently dropped)
//! - a node left with an empty `properties` map is a fatal error, since it
//!   almost always means the caller mis-modeled the schema
//! - union types containing a null marker are narrowed to the first
//!   non-null member
//!
//! Sanitization is idempotent: a sanitized schema passes through unchanged.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::types::{RecapError, Result};

/// Keywords commonly accepted in provider response-schema configs.
/// Everything else (description, pattern, minItems, maxLength, ...) is
/// rejected by at least one supported provider.
pub const DEFAULT_ALLOWED_KEYWORDS: &[&str] = &["type", "properties", "items", "required", "enum"];

/// Recursive keyword-whitelist sanitizer for response schemas.
pub struct SchemaSanitizer {
    allowed: HashSet<String>,
}

impl Default for SchemaSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_KEYWORDS.iter().map(|s| s.to_string()))
    }
}

impl SchemaSanitizer {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Sanitize a schema tree against the allowed keyword set.
    ///
    /// The input is not mutated; a new tree is returned. Fails with
    /// [`RecapError::SchemaValidation`] when sanitization would produce an
    /// empty `properties` map or drop a `required` entry.
    pub fn sanitize(&self, schema: &Value) -> Result<Value> {
        self.sanitize_node(schema, "$")
    }

    fn sanitize_node(&self, schema: &Value, path: &str) -> Result<Value> {
        let obj = match schema {
            Value::Object(obj) => obj,
            // Leaf values (enum entries, type strings) pass through; the
            // keyword filter operates on object nodes only.
            other => return Ok(other.clone()),
        };

        let mut out = Map::new();

        for (key, value) in obj {
            if !self.allowed.contains(key.as_str()) {
                continue;
            }

            match key.as_str() {
                "properties" => {
                    let sanitized = self.sanitize_properties(value, path)?;
                    out.insert(key.clone(), Value::Object(sanitized));
                }
                "items" => {
                    let child_path = format!("{}.items", path);
                    out.insert(key.clone(), self.sanitize_node(value, &child_path)?);
                }
                "type" => {
                    out.insert(key.clone(), narrow_type(value));
                }
                // `required` is validated below, once properties are known.
                _ => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }

        if let Some(required) = out.get("required").cloned() {
            self.check_required(&required, out.get("properties"), path)?;
        }

        Ok(Value::Object(out))
    }

    fn sanitize_properties(&self, value: &Value, path: &str) -> Result<Map<String, Value>> {
        let props = match value {
            Value::Object(props) => props,
            _ => {
                return Err(RecapError::SchemaValidation(format!(
                    "'properties' at {} must be an object",
                    path
                )));
            }
        };

        let mut sanitized = Map::new();
        for (name, child) in props {
            // Null/absent property schemas are dropped from the map.
            if child.is_null() {
                continue;
            }
            let child_path = format!("{}.{}", path, name);
            sanitized.insert(name.clone(), self.sanitize_node(child, &child_path)?);
        }

        if sanitized.is_empty() {
            return Err(RecapError::SchemaValidation(format!(
                "sanitization left no properties at {} (schema likely mis-modeled)",
                path
            )));
        }

        Ok(sanitized)
    }

    /// Every `required` name must survive in `properties`; a mismatch means
    /// the schema and the provider's keyword support have drifted apart and
    /// must not go undetected.
    fn check_required(&self, required: &Value, properties: Option<&Value>, path: &str) -> Result<()> {
        let names = match required {
            Value::Array(names) => names,
            _ => {
                return Err(RecapError::SchemaValidation(format!(
                    "'required' at {} must be an array of property names",
                    path
                )));
            }
        };

        let props = properties.and_then(|p| p.as_object());

        for name in names {
            let name = name.as_str().ok_or_else(|| {
                RecapError::SchemaValidation(format!(
                    "'required' at {} contains a non-string entry",
                    path
                ))
            })?;

            let present = props.map(|p| p.contains_key(name)).unwrap_or(false);
            if !present {
                return Err(RecapError::SchemaValidation(format!(
                    "required property '{}' at {} missing from sanitized properties",
                    name, path
                )));
            }
        }

        Ok(())
    }
}

/// Narrow a union type to its first non-null member; most providers expect
/// a single type string.
fn narrow_type(value: &Value) -> Value {
    match value {
        Value::Array(members) => members
            .iter()
            .find(|m| m.as_str().map(|s| s != "null").unwrap_or(true))
            .cloned()
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
