//! Database-agnostic type mappings.
//!
//! Rows come back from each driver with its own type system. Decoding works
//! in two phases:
//! 1. `TypeCategory` classifies the column's declared type name
//! 2. a backend-specific decoder extracts the value as a [`Value`]
//!
//! A non-null column that cannot be decoded is logged and mapped to `Null`;
//! the record mapping then decides whether NULL is acceptable for the field.

use crate::models::{DatabaseType, ResultRow, Value};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.starts_with("timestamp") || lower == "datetime" {
        return TypeCategory::Timestamp;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL/NUMERIC value as its exact database text.
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

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Trait for converting driver rows into [`ResultRow`]s.
pub trait DecodeRow {
    fn to_result_row(&self) -> ResultRow;
}

impl DecodeRow for MySqlRow {
    fn to_result_row(&self) -> ResultRow {
        decode_with(self, DatabaseType::MySQL, mysql::decode_column)
    }
}

impl DecodeRow for PgRow {
    fn to_result_row(&self) -> ResultRow {
        decode_with(self, DatabaseType::PostgreSQL, postgres::decode_column)
    }
}

impl DecodeRow for SqliteRow {
    fn to_result_row(&self) -> ResultRow {
        decode_with(self, DatabaseType::SQLite, sqlite::decode_column)
    }
}

fn decode_with<R: Row>(
    row: &R,
    db: DatabaseType,
    decode: fn(&R, usize, TypeCategory) -> Option<Value>,
) -> ResultRow {
    let columns = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let type_name = col.type_info().name();
            let category = categorize_type(type_name, db);
            let value = decode(row, idx, category).unwrap_or_else(|| {
                tracing::warn!(
                    column = %col.name(),
                    type_name = %type_name,
                    "Column value could not be decoded, mapping to NULL"
                );
                Value::Null
            });
            (col.name().to_string(), value)
        })
        .collect();
    ResultRow::new(columns)
}

/// Decode an optional column, treating a decode failure as `None`.
fn get<'r, R, T>(row: &'r R, idx: usize) -> Option<Option<T>>
where
    R: Row,
    T: Decode<'r, R::Database> + Type<R::Database>,
    usize: sqlx::ColumnIndex<R>,
{
    row.try_get::<Option<T>, _>(idx).ok()
}

fn float_value(v: f64) -> Value {
    Value::Float(v)
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================
//
// Each decoder returns `None` when the column could not be read and
// `Some(Value::Null)` for SQL NULL.

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Option<Value> {
        match category {
            TypeCategory::Decimal => get::<_, RawDecimal>(row, idx)
                .map(|v| v.map(|d| Value::Text(d.0)).unwrap_or(Value::Null)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => {
                get::<_, bool>(row, idx).map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            }
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => {
                get::<_, Vec<u8>>(row, idx).map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
            }
            TypeCategory::Json => get::<_, serde_json::Value>(row, idx)
                .map(|v| v.map(|j| Value::Text(j.to_string())).unwrap_or(Value::Null)),
            TypeCategory::Timestamp => decode_timestamp(row, idx),
            _ => get::<_, String>(row, idx).map(|v| v.map(Value::Text).unwrap_or(Value::Null)),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, i64>(row, idx) {
            return Some(v.map(Value::Int).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, i32>(row, idx) {
            return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, i16>(row, idx) {
            return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, i8>(row, idx) {
            return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, u32>(row, idx) {
            return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, u64>(row, idx) {
            // Values above i64::MAX do not fit the integer variant
            return Some(match v {
                Some(n) => i64::try_from(n)
                    .map(Value::Int)
                    .unwrap_or_else(|_| Value::Text(n.to_string())),
                None => Value::Null,
            });
        }
        None
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, f64>(row, idx) {
            return Some(v.map(float_value).unwrap_or(Value::Null));
        }
        get::<_, f32>(row, idx).map(|v| v.map(|f| float_value(f.into())).unwrap_or(Value::Null))
    }

    fn decode_timestamp(row: &MySqlRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, chrono::DateTime<chrono::Utc>>(row, idx) {
            return Some(v.map(Value::Timestamp).unwrap_or(Value::Null));
        }
        get::<_, chrono::NaiveDateTime>(row, idx)
            .map(|v| v.map(|t| Value::Timestamp(t.and_utc())).unwrap_or(Value::Null))
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> Option<Value> {
        match category {
            TypeCategory::Decimal => get::<_, RawDecimal>(row, idx)
                .map(|v| v.map(|d| Value::Text(d.0)).unwrap_or(Value::Null)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => {
                get::<_, bool>(row, idx).map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            }
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => {
                get::<_, Vec<u8>>(row, idx).map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
            }
            TypeCategory::Json => get::<_, serde_json::Value>(row, idx)
                .map(|v| v.map(|j| Value::Text(j.to_string())).unwrap_or(Value::Null)),
            TypeCategory::Uuid => {
                get::<_, uuid::Uuid>(row, idx).map(|v| v.map(Value::Uuid).unwrap_or(Value::Null))
            }
            TypeCategory::Timestamp => decode_timestamp(row, idx),
            _ => get::<_, String>(row, idx).map(|v| v.map(Value::Text).unwrap_or(Value::Null)),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, i64>(row, idx) {
            return Some(v.map(Value::Int).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, i32>(row, idx) {
            return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
        }
        get::<_, i16>(row, idx).map(|v| v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null))
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, f64>(row, idx) {
            return Some(v.map(float_value).unwrap_or(Value::Null));
        }
        get::<_, f32>(row, idx).map(|v| v.map(|f| float_value(f.into())).unwrap_or(Value::Null))
    }

    fn decode_timestamp(row: &PgRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, chrono::DateTime<chrono::Utc>>(row, idx) {
            return Some(v.map(Value::Timestamp).unwrap_or(Value::Null));
        }
        get::<_, chrono::NaiveDateTime>(row, idx)
            .map(|v| v.map(|t| Value::Timestamp(t.and_utc())).unwrap_or(Value::Null))
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> Option<Value> {
        match category {
            TypeCategory::Integer => {
                get::<_, i64>(row, idx).map(|v| v.map(Value::Int).unwrap_or(Value::Null))
            }
            TypeCategory::Boolean => {
                get::<_, bool>(row, idx).map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            }
            TypeCategory::Float | TypeCategory::Decimal => {
                get::<_, f64>(row, idx).map(|v| v.map(float_value).unwrap_or(Value::Null))
            }
            TypeCategory::Binary => {
                get::<_, Vec<u8>>(row, idx).map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
            }
            // SQLite is dynamically typed: a column declared one way can hold
            // another storage class, so fall back through the common ones.
            _ => decode_dynamic(row, idx),
        }
    }

    fn decode_dynamic(row: &SqliteRow, idx: usize) -> Option<Value> {
        if let Some(v) = get::<_, String>(row, idx) {
            return Some(v.map(Value::Text).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, i64>(row, idx) {
            return Some(v.map(Value::Int).unwrap_or(Value::Null));
        }
        if let Some(v) = get::<_, f64>(row, idx) {
            return Some(v.map(float_value).unwrap_or(Value::Null));
        }
        get::<_, Vec<u8>>(row, idx).map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
    }
}
