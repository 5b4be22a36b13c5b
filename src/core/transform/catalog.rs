//! Pure value conversions reachable by step identifier.

use crate::core::dates::{parse_instant, reformat_date, DateLayout};
use serde_json::{json, Map, Value};

pub const EMPLOYMENT_CODES: &[(&str, &str)] = &[
    ("Employed", "FT"),
    ("Self-employed", "SE"),
    ("Unemployed", "UE"),
    ("Retired", "RT"),
    ("Student", "ST"),
];

pub const INCOME_NUMBERS: &[(&str, i64)] = &[
    ("$0-$25k", 0),
    ("$25k-$50k", 25_000),
    ("$50k-$75k", 50_000),
    ("$75k-$100k", 75_000),
    ("$100k+", 100_000),
];

pub const PRIORITY_NUMBERS: &[(&str, i64)] =
    &[("Low", 1), ("Medium", 2), ("High", 3), ("Urgent", 4)];

pub const APPROVAL_NUMBERS: &[(&str, i64)] = &[
    ("Pending", 0),
    ("Approved", 1),
    ("Rejected", 2),
    ("Under Review", 3),
];

pub const CONTACT_CODES: &[(&str, &str)] =
    &[("Email", "E"), ("Phone", "P"), ("Mail", "M"), ("SMS", "S")];

pub const ACCOUNT_CODES: &[(&str, i64)] =
    &[("Personal", 1), ("Business", 2), ("Joint", 3), ("Trust", 4)];

pub const DOCUMENT_CODES: &[(&str, &str)] = &[
    ("Application", "A"),
    ("Verification", "V"),
    ("Statement", "S"),
    ("Contract", "C"),
];

pub const DEVICE_CODES: &[(&str, &str)] =
    &[("Desktop", "D"), ("Mobile", "M"), ("Tablet", "T"), ("Other", "O")];

pub const PRODUCT_CODES: &[(&str, &str)] = &[
    ("Loans", "LN"),
    ("Insurance", "IN"),
    ("Investments", "IV"),
    ("Banking", "BK"),
    ("Credit Cards", "CC"),
];

/// Look up a string-keyed code, falling back to `default` for anything unrecognized.
pub fn lookup_code<T>(table: &[(&str, T)], value: &Value, default: T) -> Value
where
    T: Copy + Into<Value>,
{
    value
        .as_str()
        .and_then(|key| table.iter().find(|(name, _)| *name == key))
        .map(|(_, code)| *code)
        .unwrap_or(default)
        .into()
}

/// Split a full name into `{firstName, lastName}`.
pub fn split_name(value: &Value) -> Result<Value, String> {
    let name = value
        .as_str()
        .ok_or_else(|| format!("expected a name string, got {}", value))?;
    let mut parts = name.trim().split(' ');
    let first = parts.next().unwrap_or_default();
    let last = parts.collect::<Vec<_>>().join(" ");
    let mut composite = Map::new();
    composite.insert("firstName".to_string(), Value::from(first));
    composite.insert("lastName".to_string(), Value::from(last));
    Ok(Value::Object(composite))
}

pub fn reformat(value: &Value, layout: DateLayout) -> Result<Value, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected a date string, got {}", value))?;
    reformat_date(text, layout).map(Value::from)
}

/// Epoch seconds for a date or date-time.
pub fn to_timestamp(value: &Value) -> Result<Value, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected a date string, got {}", value))?;
    parse_instant(text).map(|instant| json!(instant.timestamp()))
}

/// ISO-8601 with millisecond precision, e.g. `2020-01-01T00:00:00.000Z`.
pub fn to_iso8601(value: &Value) -> Result<Value, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected a date string, got {}", value))?;
    parse_instant(text)
        .map(|instant| Value::from(instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()))
}

/// Bucket a numeric credit score.
pub fn credit_category(value: &Value) -> Result<Value, String> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or_else(|| format!("expected a numeric credit score, got {}", value))?;

    let category = if score < 580.0 {
        "Poor"
    } else if score < 670.0 {
        "Fair"
    } else if score < 740.0 {
        "Good"
    } else {
        "Excellent"
    };
    Ok(Value::from(category))
}

/// Loose boolean reading used by `boolYN` and `boolStr`.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => !matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "n" | "0"
        ),
        Value::Array(_) | Value::Object(_) => true,
    }
}
