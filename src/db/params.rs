//! Parameter binding utilities for procedure calls.
//!
//! Binds [`Value`]s to database-specific query objects. Numbers bind at the
//! width they were given, so PostgreSQL resolves `integer` and `real`
//! function arguments. UUIDs and timestamps bind natively where the driver
//! has a matching column type and as text otherwise.

use crate::models::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Int32(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v),
        // CHAR(36) is the usual MySQL column for UUIDs
        Value::Uuid(v) => query.bind(v.hyphenated().to_string()),
        Value::Timestamp(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Int32(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v),
        Value::Uuid(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Int32(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v),
        // SQLite has no UUID or timestamp storage class, store as text
        Value::Uuid(v) => query.bind(v.hyphenated().to_string()),
        Value::Timestamp(v) => query.bind(v.to_rfc3339()),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}
