//! Lenient value coercion for heterogeneous document fields
//!
//! Annotation documents mix missing, textual, and numeric representations of
//! the same logical fields. [`RawValue`] makes that explicit as a sum type
//! with one total coercion function per target type, so downstream code never
//! shape-sniffs.

/// A field value as found in the document, before coercion
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Absent,
}

impl RawValue {
    /// Build a value from optional element text content
    ///
    /// Whitespace-only content is treated as absent.
    pub fn from_content(content: Option<String>) -> Self {
        match content {
            Some(text) if !text.trim().is_empty() => RawValue::Text(text),
            _ => RawValue::Absent,
        }
    }

    /// Coerce to text, substituting `default` when absent
    pub fn to_text(&self, default: &str) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(t) => t.trim().to_string(),
            RawValue::Absent => default.to_string(),
        }
    }

    /// Coerce to a finite number, defaulting to 0.0
    ///
    /// Non-numeric text and non-finite numbers both coerce to 0.0 rather than
    /// failing, so a single bad token cannot abort a whole feature. Range
    /// validation happens later, in the normalizer.
    pub fn to_finite_number(&self) -> f64 {
        match self {
            RawValue::Number(n) if n.is_finite() => *n,
            RawValue::Number(_) => 0.0,
            RawValue::Text(t) => lenient_number(t),
            RawValue::Absent => 0.0,
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }
}

/// Parse a numeric token, returning 0.0 for malformed or non-finite input
#[inline]
pub fn lenient_number(token: &str) -> f64 {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
