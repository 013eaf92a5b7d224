//! JSON Repair Layer
//!
//! Best-effort recovery of malformed LLM output before giving up.
//!
//! Handles the common failure shapes:
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas before closers
//! - Strings truncated mid-value (output token ceiling hit)
//! - Missing closing braces/brackets
//!
//! Contract: direct parse first, one structural repair pass second. If both
//! fail the caller gets [`RecapError::MalformedResponse`] with a bounded
//! preview of the text — never the raw parser error, and never the full
//! payload in logs.

use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::repair as repair_constants;
use crate::types::{RecapError, Result};

/// Parse provider text, attempting structural repair if the direct parse
/// fails. Returns the parsed value and whether repair was needed.
pub fn parse_robust(text: &str) -> Result<(Value, bool)> {
    let cleaned = preprocess(text);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok((value, false));
    }

    debug!("direct JSON parse failed, attempting repair");

    let repaired = repair(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("JSON repaired after parse failure");
        return Ok((value, true));
    }

    Err(RecapError::MalformedResponse {
        preview: cleaned
            .chars()
            .take(repair_constants::PREVIEW_CHARS)
            .collect(),
        length: cleaned.len(),
    })
}

/// Strip code fences, BOM, and surrounding whitespace.
fn preprocess(raw: &str) -> String {
    let mut s = raw.trim();
    s = s.trim_start_matches('\u{feff}').trim();

    let mut out = s.to_string();
    if out.starts_with("```") {
        if let Some(first_newline) = out.find('\n') {
            out = out[first_newline + 1..].to_string();
        }
    }
    if out.ends_with("```") {
        out = out[..out.len() - 3].trim_end().to_string();
    }

    out.trim().to_string()
}

/// One structural repair pass: trailing commas, unterminated strings,
/// unbalanced brackets.
fn repair(s: &str) -> String {
    let mut result = fix_trailing_commas(s);
    result = fix_truncated_strings(&result);
    balance_brackets(&result)
}

/// Drop commas immediately preceding `]` or `}`.
fn fix_trailing_commas(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];

        if ch == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == ']' || chars[j] == '}') {
                i += 1;
                continue;
            }
        }

        result.push(ch);
        i += 1;
    }

    result
}

/// Close strings truncated at a newline or at end of input.
fn fix_truncated_strings(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape = true;
                result.push(ch);
            }
            '"' => {
                in_string = !in_string;
                result.push(ch);
            }
            '\n' | '\r' if in_string => {
                result.push('"');
                in_string = false;
                result.push(ch);
            }
            _ => result.push(ch),
        }
    }

    if in_string {
        result.push('"');
    }

    result
}

/// Append missing closers for unbalanced braces/brackets.
fn balance_brackets(s: &str) -> String {
    let mut result = s.to_string();

    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for ch in result.chars() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => brace_count -= 1,
            '[' if !in_string => bracket_count += 1,
            ']' if !in_string => bracket_count -= 1,
            _ => {}
        }
    }

    if in_string {
        result.push('"');
    }
    for _ in 0..bracket_count.max(0) {
        result.push(']');
    }
    for _ in 0..brace_count.max(0) {
        result.push('}');
    }

    result
}

// =============================================================================
// Tests
// =============================================================================
