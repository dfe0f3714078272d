//! MySQL value to JSON mapping.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's MySQL type name
//! 2. a category-specific decoder extracts the value
//!
//! Statements run over the text protocol, so when a typed decode fails (zero
//! dates, out-of-range TIME values, unusual types) the raw text the server
//! sent is returned instead of dropping the value.

use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Text,
    Binary,
    Json,
    DateTime,
    Date,
    Time,
}

/// Classify a MySQL type name (as reported by the driver) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    // "BIGINT UNSIGNED" -> "bigint"
    let base = lower.split_whitespace().next().unwrap_or("");

    match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            TypeCategory::Integer
        }
        // TINYINT(1) is reported as BOOLEAN; keep the stored number
        "boolean" | "bool" => TypeCategory::Integer,
        "float" | "double" | "real" => TypeCategory::Float,
        "decimal" | "numeric" => TypeCategory::Decimal,
        "json" => TypeCategory::Json,
        "datetime" | "timestamp" => TypeCategory::DateTime,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" | "bit"
        | "geometry" => TypeCategory::Binary,
        _ => TypeCategory::Text,
    }
}

/// Wrapper type for raw DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Decode binary data to JSON: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Convert a row into a JSON object keyed by column name, in result-set order.
pub fn row_to_json(row: &MySqlRow) -> serde_json::Map<String, JsonValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name());
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect()
}

/// Decode a single column value.
pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    // NULL is NULL whatever the type
    if row
        .try_get_raw(idx)
        .map(|v| v.is_null())
        .unwrap_or(true)
    {
        return JsonValue::Null;
    }

    let decoded = match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::DateTime => decode_datetime(row, idx),
        TypeCategory::Date => decode_date(row, idx),
        TypeCategory::Time => decode_time(row, idx),
        TypeCategory::Binary => decode_binary_col(row, idx),
        TypeCategory::Text => decode_text(row, idx),
    };

    decoded.unwrap_or_else(|| decode_fallback(row, idx))
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    if let Ok(v) = row.try_get::<u16, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    None
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Some(float_to_json(v));
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return Some(float_to_json(v as f64));
    }
    None
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<RawDecimal, _>(idx) {
        Ok(v) => Some(JsonValue::String(v.0)),
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            None
        }
    }
}

fn decode_json(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<JsonValue, _>(idx).ok()
}

fn decode_datetime(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<chrono::NaiveDateTime, _>(idx)
        .ok()
        .and_then(|v| serde_json::to_value(v).ok())
}

fn decode_date(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<chrono::NaiveDate, _>(idx)
        .ok()
        .and_then(|v| serde_json::to_value(v).ok())
}

fn decode_time(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<chrono::NaiveTime, _>(idx)
        .ok()
        .and_then(|v| serde_json::to_value(v).ok())
}

fn decode_binary_col(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Vec<u8>, _>(idx)
        .ok()
        .map(|v| decode_binary_value(&v))
}

fn decode_text(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<String, _>(idx).ok().map(JsonValue::String)
}

/// Last resort: the raw bytes the server sent, without a type check.
fn decode_fallback(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get_unchecked::<Vec<u8>, _>(idx)
        .map(|v| decode_binary_value(&v))
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integer_types() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Integer);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_numeric_types() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("FLOAT"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_temporal_types() {
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::DateTime);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_binary_and_text() {
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("BLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        // "POINT" must not be taken for an integer type
        assert_eq!(categorize_type("POINT"), TypeCategory::Text);
    }

    #[test]
    fn test_decode_binary_value_with_valid_utf8() {
        let result = decode_binary_value(b"varchar(255)");
        assert_eq!(result, JsonValue::String("varchar(255)".to_string()));
    }

    #[test]
    fn test_decode_binary_value_with_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        assert_eq!(
            decode_binary_value(bytes),
            JsonValue::String("//4AAQ==".to_string())
        );
    }

    #[test]
    fn test_decode_binary_value_empty() {
        assert_eq!(decode_binary_value(&[]), JsonValue::String(String::new()));
    }
}
