//! Numeric-safe conversion between DuckDB values and strict JSON.
//!
//! Whatever the synthesized SQL produced, the turn response must serialize:
//! non-finite floats and integers wider than JSON can carry become their
//! string form, nested or exotic values fall back to a textual rendering.

use duckdb::types::{TimeUnit, Value as DuckValue};
use serde_json::{Number, Value};

pub fn json_from_duck(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(v) => Value::Number(v.into()),
        DuckValue::SmallInt(v) => Value::Number(v.into()),
        DuckValue::Int(v) => Value::Number(v.into()),
        DuckValue::BigInt(v) => Value::Number(v.into()),
        DuckValue::UTinyInt(v) => Value::Number(v.into()),
        DuckValue::USmallInt(v) => Value::Number(v.into()),
        DuckValue::UInt(v) => Value::Number(v.into()),
        DuckValue::UBigInt(v) => Value::Number(v.into()),
        DuckValue::HugeInt(v) => {
            if let Ok(narrow) = i64::try_from(v) {
                Value::Number(narrow.into())
            } else {
                Value::String(v.to_string())
            }
        }
        DuckValue::Float(f) => json_from_f64(f as f64),
        DuckValue::Double(f) => json_from_f64(f),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Enum(s) => Value::String(s),
        DuckValue::Timestamp(unit, raw) => Value::String(render_timestamp(unit, raw)),
        DuckValue::Date32(days) => Value::String(render_date(days)),
        // Lists, structs, blobs, intervals and anything else DuckDB may hand
        // back get their textual form as a last resort.
        other => Value::String(format!("{:?}", other)),
    }
}

/// Non-finite floats cannot exist in strict JSON; they become recognizable
/// string markers ("NaN", "inf", "-inf") instead of failing serialization.
pub fn json_from_f64(f: f64) -> Value {
    if f.is_finite() {
        Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string()))
    } else {
        Value::String(f.to_string())
    }
}

pub fn duck_from_json(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DuckValue::BigInt(i)
            } else if let Some(f) = n.as_f64() {
                DuckValue::Double(f)
            } else {
                DuckValue::Text(n.to_string())
            }
        }
        Value::String(s) => DuckValue::Text(s.clone()),
        // Nested containers travel as their JSON text.
        other => DuckValue::Text(other.to_string()),
    }
}

fn render_timestamp(unit: TimeUnit, raw: i64) -> String {
    let (secs, nanos) = match unit {
        TimeUnit::Second => (raw, 0u32),
        TimeUnit::Millisecond => (raw.div_euclid(1_000), (raw.rem_euclid(1_000) * 1_000_000) as u32),
        TimeUnit::Microsecond => (raw.div_euclid(1_000_000), (raw.rem_euclid(1_000_000) * 1_000) as u32),
        TimeUnit::Nanosecond => (raw.div_euclid(1_000_000_000), raw.rem_euclid(1_000_000_000) as u32),
    };
    match chrono::DateTime::from_timestamp(secs, nanos) {
        Some(dt) => dt.naive_utc().to_string(),
        None => raw.to_string(),
    }
}

fn render_date(days: i32) -> String {
    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    match epoch.checked_add_signed(chrono::Duration::days(days as i64)) {
        Some(date) => date.to_string(),
        None => days.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(json_from_f64(f64::NAN), json!("NaN"));
        assert_eq!(json_from_f64(f64::INFINITY), json!("inf"));
        assert_eq!(json_from_f64(f64::NEG_INFINITY), json!("-inf"));
        assert_eq!(json_from_f64(1.5), json!(1.5));
    }

    #[test]
    fn huge_integers_become_strings() {
        let wide = i128::from(i64::MAX) + 1;
        assert_eq!(json_from_duck(DuckValue::HugeInt(wide)), json!(wide.to_string()));
        assert_eq!(json_from_duck(DuckValue::HugeInt(42)), json!(42));
    }

    #[test]
    fn safe_values_survive_a_strict_json_round_trip() {
        let row = vec![
            json_from_duck(DuckValue::Null),
            json_from_duck(DuckValue::Double(f64::NAN)),
            json_from_duck(DuckValue::Double(f64::INFINITY)),
            json_from_duck(DuckValue::BigInt(7)),
        ];
        let text = serde_json::to_string(&row).unwrap();
        let back: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(back[0], Value::Null);
        assert_eq!(back[1], json!("NaN"));
        assert_eq!(back[2], json!("inf"));
        assert_eq!(back[3], json!(7));
    }

    #[test]
    fn json_to_duck_maps_scalars() {
        assert_eq!(duck_from_json(&json!(3)), DuckValue::BigInt(3));
        assert_eq!(duck_from_json(&json!(2.5)), DuckValue::Double(2.5));
        assert_eq!(duck_from_json(&json!("x")), DuckValue::Text("x".into()));
        assert_eq!(duck_from_json(&Value::Null), DuckValue::Null);
        assert_eq!(
            duck_from_json(&json!({"a": 1})),
            DuckValue::Text("{\"a\":1}".into())
        );
    }

    #[test]
    fn timestamps_render_readably() {
        let rendered = render_timestamp(TimeUnit::Microsecond, 0);
        assert!(rendered.starts_with("1970-01-01"));
        assert_eq!(render_date(0), "1970-01-01");
    }
}
