//! Type inference and per-cell coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tabula_api::error::ShapeError;
use tabula_api::schema::{ColumnType, FieldType};
use tabula_api::value::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Decimal or exponent literal. `inf`, `NaN` and friends are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Case-insensitive `true` / `false`.
pub fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => parse_number(s).is_some(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => parse_bool(s).is_some(),
        _ => false,
    }
}

/// Column-global type inference over every present value.
///
/// Blank strings count as absent. A column with nothing present is `String`.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
    let present: Vec<&Value> = values.into_iter().filter(|v| !is_absent(v)).collect();
    if present.is_empty() {
        return ColumnType::String;
    }
    if present.iter().all(|v| is_numeric(v)) {
        ColumnType::Number
    } else if present.iter().all(|v| is_boolean(v)) {
        ColumnType::Boolean
    } else if present.iter().all(|v| matches!(v, Value::Timestamp(_))) {
        ColumnType::Time
    } else {
        ColumnType::String
    }
}

/// Coerce one value to `field_type`. `Null` stays `Null`.
///
/// `time_format` only applies to `Timestamp` and accepts a strftime
/// pattern or a reference layout such as `2006-01-02 15:04:05`.
pub fn coerce(value: &Value, field_type: FieldType, time_format: &str) -> Result<Value, ShapeError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let coerced = match field_type {
        FieldType::String => Some(Value::String(value.to_string())),
        FieldType::Number => match value {
            Value::Number(n) => Some(Value::Number(*n)),
            Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
            Value::String(s) => parse_number(s).map(Value::Number),
            Value::Timestamp(t) => Some(Value::Number(t.timestamp_millis() as f64)),
            _ => None,
        },
        FieldType::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
            Value::String(s) => parse_bool(s).map(Value::Bool),
            _ => None,
        },
        FieldType::Timestamp => match value {
            Value::Timestamp(t) => Some(Value::Timestamp(*t)),
            Value::Number(ms) => from_millis(*ms),
            Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
            Value::String(s) if !time_format.is_empty() => parse_with_format(s, time_format),
            Value::String(s) => parse_timestamp(s),
            _ => None,
        },
        FieldType::TimestampEpoch => epoch(value).and_then(from_millis),
        FieldType::TimestampEpochS => epoch(value).and_then(|s| from_millis(s * 1000.0)),
    };

    coerced.ok_or_else(|| {
        ShapeError::coercion(format!(
            "cannot read {} {value:?} as {field_type}",
            value.type_name()
        ))
    })
}

fn epoch(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_number(s),
        Value::Timestamp(t) => Some(t.timestamp_millis() as f64),
        _ => None,
    }
}

fn from_millis(ms: f64) -> Option<Value> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.round() as i64).map(Value::Timestamp)
}

/// RFC 3339, common date-time layouts, plain dates, or an epoch-millisecond number.
pub fn parse_timestamp(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::Timestamp(t.with_timezone(&Utc)));
    }
    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Value::Timestamp(Utc.from_utc_datetime(&t)));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|t| Value::Timestamp(Utc.from_utc_datetime(&t)));
    }
    parse_number(s).and_then(from_millis)
}

fn parse_with_format(s: &str, time_format: &str) -> Option<Value> {
    let format = if time_format.contains('%') {
        time_format.to_string()
    } else {
        translate_layout(time_format)
    };
    let s = s.trim();

    if let Ok(t) = DateTime::parse_from_str(s, &format) {
        return Some(Value::Timestamp(t.with_timezone(&Utc)));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, &format) {
        return Some(Value::Timestamp(Utc.from_utc_datetime(&t)));
    }
    NaiveDate::parse_from_str(s, &format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Value::Timestamp(Utc.from_utc_datetime(&t)))
}

// Longest tokens first so `2006` wins over `2` and `15` over `1`.
const LAYOUT_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    (".000000000", "%.9f"),
    (".999999999", "%.f"),
    ("-0700", "%z"),
    (".000000", "%.6f"),
    (".999999", "%.f"),
    ("2006", "%Y"),
    (".000", "%.3f"),
    (".999", "%.f"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
];

/// Translate a reference-time layout (`2006-01-02T15:04:05Z07:00`) into a
/// strftime pattern.
pub fn translate_layout(layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while let Some(c) = rest.chars().next() {
        for (token, spec) in LAYOUT_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
