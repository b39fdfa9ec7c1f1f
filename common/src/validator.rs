use crate::types::{FieldName, FieldValue};

/// Current values of the two moisture bounds, as held by the form when a
/// field is validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Siblings {
    pub upper: f64,
    pub lower: f64,
}

/// Coerces raw input and decides its validity. Pure and deterministic.
pub fn validate(field: FieldName, raw: &str, siblings: &Siblings) -> (FieldValue, bool) {
    let value = coerce(field, raw);
    let valid = is_valid(field, &value, siblings);
    (value, valid)
}

pub fn coerce(field: FieldName, raw: &str) -> FieldValue {
    if field.is_numeric() {
        FieldValue::Number(coerce_number(raw))
    } else {
        FieldValue::Text(raw.to_string())
    }
}

pub fn is_valid(field: FieldName, value: &FieldValue, siblings: &Siblings) -> bool {
    match field {
        FieldName::Name => valid_name(value.as_text()),
        FieldName::Upper => valid_upper(value.as_number(), siblings.lower),
        FieldName::Lower => valid_lower(value.as_number(), siblings.upper),
        FieldName::Interval => valid_interval(value.as_number()),
    }
}

pub fn valid_name(name: &str) -> bool {
    !name.is_empty()
}

pub fn valid_upper(upper: f64, lower: f64) -> bool {
    is_integral(upper) && upper > 0.0 && upper <= 100.0 && upper > lower
}

pub fn valid_lower(lower: f64, upper: f64) -> bool {
    is_integral(lower) && lower >= 0.0 && lower < 100.0 && lower < upper
}

pub fn valid_interval(interval: f64) -> bool {
    is_integral(interval) && interval > 0.0
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

// Blank input reads as zero, anything unparseable as NaN.
fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
