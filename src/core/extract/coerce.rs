//! Type coercion and fill policy
//!
//! Documents arrive as loosely typed JSON. Each value is converted to the
//! column's declared type; a value is *masked* when it is absent, `null`,
//! or cannot be converted, and masked values take the fill value of the
//! column type:
//!
//! | type   | fill         |
//! |--------|--------------|
//! | string | `""`         |
//! | bool   | none         |
//! | int    | `0`          |
//! | float  | NaN          |

use serde_json::Value;

/// Fill value of masked text
pub const TEXT_FILL: &str = "";

/// Fill value of masked integers, at every width
pub const INT_FILL: i64 = 0;

/// Fill value of masked floats
pub const FLOAT_FILL: f64 = f64::NAN;

/// Separator used when a multi-valued field is read as text
const MULTI_VALUE_SEPARATOR: &str = ";";

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Integral value of a JSON number or numeric string
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Text value, truncated to `width` characters when declared
pub fn to_text(value: Option<&Value>, width: Option<usize>) -> String {
    let text = match present(value) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR),
        Some(value) => scalar_text(value).unwrap_or_default(),
        None => TEXT_FILL.to_string(),
    };

    match width {
        Some(width) => match text.char_indices().nth(width) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text,
        },
        None => text,
    }
}

/// 32-bit integer; values outside the `i32` range are masked
pub fn to_i32(value: Option<&Value>) -> i32 {
    present(value)
        .and_then(as_integer)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(INT_FILL as i32)
}

/// 64-bit integer
pub fn to_i64(value: Option<&Value>) -> i64 {
    present(value).and_then(as_integer).unwrap_or(INT_FILL)
}

/// Double precision float
pub fn to_f64(value: Option<&Value>) -> f64 {
    match present(value) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(FLOAT_FILL),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(FLOAT_FILL),
        _ => FLOAT_FILL,
    }
}

/// Boolean, or none when masked
pub fn to_bool(value: Option<&Value>) -> Option<bool> {
    match present(value)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(42) => 42; "number")]
    #[test_case(json!("17") => 17; "numeric string")]
    #[test_case(json!(3.0) => 3; "integral float")]
    #[test_case(json!(3.5) => 0; "fractional float is masked")]
    #[test_case(json!(5_000_000_000_i64) => 0; "out of i32 range is masked")]
    #[test_case(json!("abc") => 0; "text is masked")]
    #[test_case(json!(null) => 0; "null is masked")]
    fn test_to_i32(value: Value) -> i32 {
        to_i32(Some(&value))
    }

    #[test]
    fn test_to_i64_keeps_wide_values() {
        assert_eq!(to_i64(Some(&json!(5_000_000_000_i64))), 5_000_000_000);
        assert_eq!(to_i64(None), 0);
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(Some(&json!(51.5))), 51.5);
        assert_eq!(to_f64(Some(&json!(" -0.25 "))), -0.25);
        assert!(to_f64(None).is_nan());
        assert!(to_f64(Some(&json!("north"))).is_nan());
    }

    #[test_case(json!(true) => Some(true); "bool")]
    #[test_case(json!("Yes") => Some(true); "yes")]
    #[test_case(json!("n") => Some(false); "n")]
    #[test_case(json!(0) => Some(false); "zero")]
    #[test_case(json!("maybe") => None; "unknown text")]
    #[test_case(json!(null) => None; "null")]
    fn test_to_bool(value: Value) -> Option<bool> {
        to_bool(Some(&value))
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(None, None), "");
        assert_eq!(to_text(Some(&json!("Aves")), None), "Aves");
        assert_eq!(to_text(Some(&json!(12)), None), "12");
        assert_eq!(to_text(Some(&json!([1, 2, null, 3])), None), "1;2;3");
    }

    #[test]
    fn test_to_text_truncates_to_width() {
        assert_eq!(to_text(Some(&json!("Lepidoptera")), Some(4)), "Lepi");
        assert_eq!(to_text(Some(&json!("Ämter")), Some(2)), "Äm");
        assert_eq!(to_text(Some(&json!("ab")), Some(4)), "ab");
    }
}
