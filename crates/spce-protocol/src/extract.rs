//! Tolerant value extraction from response payloads.
//!
//! The instrument occasionally wraps readings in diagnostic text
//! (`STATUS=RUNNING, value=3.2e-6`), so extraction scans the payload for
//! the first parseable value instead of demanding an exact format. Parse
//! failure is not an error: it degrades to [`Value::Absent`], and callers
//! that must tell "nothing parseable" apart from "zero" inspect the
//! variant explicitly.

/// The kind of value a command expects back, declared per command in the
/// catalog rather than inferred from response content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A floating-point reading.
    Float,
    /// An integer setting.
    Integer,
    /// Free text or a `key=value` payload.
    Text,
}

/// A typed value extracted from a response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(i64),
    Text(String),
    /// The payload held nothing parseable as the expected kind.
    Absent,
}

impl Value {
    /// Get the float, if this is a `Float` value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the integer, if this is an `Integer` value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Whether extraction found nothing.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

/// Extract a value of the given kind from a response payload.
pub fn extract(payload: &str, kind: ValueKind) -> Value {
    match kind {
        ValueKind::Float => extract_float(payload).map_or(Value::Absent, Value::Float),
        ValueKind::Integer => extract_int(payload).map_or(Value::Absent, Value::Integer),
        ValueKind::Text => Value::Text(extract_text(payload)),
    }
}

/// Extract the first floating-point number from a payload.
///
/// Matches an optional sign, digits, an optional decimal point with
/// digits, and an optional exponent, anywhere in the payload.
pub fn extract_float(payload: &str) -> Option<f64> {
    let bytes = payload.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some((token, end)) = match_float(bytes, i) {
            if let Ok(value) = token.parse::<f64>() {
                return Some(value);
            }
            i = end;
        } else {
            i += 1;
        }
    }
    None
}

/// Extract the first integer (optional sign followed by digits) from a
/// payload.
pub fn extract_int(payload: &str) -> Option<i64> {
    let bytes = payload.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some((token, end)) = match_int(bytes, i) {
            if let Ok(value) = token.parse::<i64>() {
                return Some(value);
            }
            i = end;
        } else {
            i += 1;
        }
    }
    None
}

/// Extract a string value from a payload.
///
/// If the payload contains comma-separated `key=value` segments, the
/// value of the first such segment is returned; otherwise the trimmed
/// payload comes back verbatim.
pub fn extract_text(payload: &str) -> String {
    for part in payload.split(',') {
        if part.contains('=') {
            if let Some(value) = part.split('=').nth(1) {
                return value.trim().to_string();
            }
        }
    }
    payload.trim().to_string()
}

/// Try to match a float token starting at `start`. Returns the matched
/// slice and the index one past it.
fn match_float(bytes: &[u8], start: usize) -> Option<(&str, usize)> {
    let mut i = start;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    // A decimal point only counts when digits follow it.
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - (i + 1);
        if frac_digits > 0 {
            i = j;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // An exponent only counts when digits follow it.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    std::str::from_utf8(&bytes[start..i]).ok().map(|s| (s, i))
}

/// Try to match an integer token starting at `start`.
fn match_int(bytes: &[u8], start: usize) -> Option<(&str, usize)> {
    let mut i = start;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digit_start {
        return None;
    }
    std::str::from_utf8(&bytes[start..i]).ok().map(|s| (s, i))
}
