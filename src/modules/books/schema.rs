//! Declarative request validation for book payloads.
//!
//! Both schemas share one rule table; they differ only in whether every
//! field must be present.

use serde_json::Value;
use url::Url;

/// Which rule set a payload is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Every field required (create, full update)
    Full,
    /// Every field optional, but present fields are checked as in `Full`
    Partial,
}

/// Type a field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Non-empty string
    Text,
    /// Non-empty string that parses as an absolute URL
    Url,
    /// JSON integer (a float with no fractional part counts), optionally bounded below
    Integer { min: Option<i64> },
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub field_type: FieldType,
}

const fn rule(name: &'static str, field_type: FieldType) -> FieldRule {
    FieldRule { name, field_type }
}

/// Rules for every `Book` field, in serialization order. All are required
/// under `Full`.
pub const BOOK_RULES: &[FieldRule] = &[
    rule("isbn", FieldType::Text),
    rule("amazon_url", FieldType::Url),
    rule("author", FieldType::Text),
    rule("language", FieldType::Text),
    rule("pages", FieldType::Integer { min: Some(1) }),
    rule("publisher", FieldType::Text),
    rule("title", FieldType::Text),
    rule("year", FieldType::Integer { min: None }),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    /// One message per failed constraint, in rule order
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn into_result(self) -> Result<(), Vec<String>> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(violations) => Err(violations),
        }
    }
}

/// Check `payload` against the book rule set selected by `kind`.
///
/// Values are never coerced: `"264"` is not an integer and `264` is not a
/// string. Fields outside the rule table are violations too.
pub fn validate(payload: &Value, kind: SchemaKind) -> ValidationResult {
    let Some(fields) = payload.as_object() else {
        return ValidationResult::Invalid(vec![format!(
            "book: must be an object, got {}",
            type_name(payload)
        )]);
    };

    let mut violations = Vec::new();
    for rule in BOOK_RULES {
        match fields.get(rule.name) {
            Some(value) => check_field(rule, value, &mut violations),
            None if kind == SchemaKind::Full => {
                violations.push(format!("{}: is required", rule.name));
            }
            None => {}
        }
    }

    for name in fields.keys() {
        if !BOOK_RULES.iter().any(|rule| rule.name == name.as_str()) {
            violations.push(format!("{name}: is not an allowed field"));
        }
    }

    if violations.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid(violations)
    }
}

fn check_field(rule: &FieldRule, value: &Value, violations: &mut Vec<String>) {
    let name = rule.name;
    match rule.field_type {
        FieldType::Text | FieldType::Url => {
            let Some(text) = value.as_str() else {
                violations.push(format!("{name}: must be a string, got {}", type_name(value)));
                return;
            };
            if text.is_empty() {
                violations.push(format!("{name}: must not be empty"));
            } else if rule.field_type == FieldType::Url && Url::parse(text).is_err() {
                violations.push(format!("{name}: must be an absolute URL, got \"{text}\""));
            }
        }
        FieldType::Integer { min } => {
            let number = match integer_value(value) {
                Ok(number) => number,
                Err(message) => {
                    violations.push(format!("{name}: {message}"));
                    return;
                }
            };
            if let Some(min) = min {
                if number < min {
                    violations.push(format!("{name}: must be at least {min}, got {number}"));
                }
            }
        }
    }
}

fn integer_value(value: &Value) -> Result<i64, String> {
    if let Some(number) = value.as_i64() {
        return Ok(number);
    }
    match value.as_f64() {
        Some(float) if float.fract() == 0.0 => {
            if float >= i64::MIN as f64 && float < -(i64::MIN as f64) {
                Ok(float as i64)
            } else {
                Err("is out of range".to_string())
            }
        }
        _ => Err(format!("must be an integer, got {}", type_name(value))),
    }
}

/// Rewrite integral floats (`264.0`) in integer fields as JSON integers so the
/// payload deserializes into `i64` fields. Run after a successful `validate`.
pub fn normalize_integers(payload: &mut Value) {
    let Some(fields) = payload.as_object_mut() else {
        return;
    };
    for rule in BOOK_RULES {
        if !matches!(rule.field_type, FieldType::Integer { .. }) {
            continue;
        }
        if let Some(value) = fields.get_mut(rule.name) {
            if let Ok(number) = integer_value(value) {
                *value = Value::from(number);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
