//! Procedure execution engine.
//!
//! Turns a procedure name plus a [`ParamSet`] into a backend call:
//! - `mysql`: `CALL name(?, ...)` with positional binding
//! - `postgres`: `SELECT * FROM name(p => $1, ...)` for reads and
//!   `SELECT name(p => $1, ...)` for writes
//! - `sqlite`: a statement looked up in the [`ProcedureCatalog`]
//!
//! Every call acquires one pooled connection for its own duration only. The
//! connection is released when the call returns or its future is dropped.
//! Rows are streamed and reading stops once the requested limit is reached.

use crate::db::catalog::ProcedureCatalog;
use crate::db::params::{bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use crate::db::pool::DbPool;
use crate::db::types::DecodeRow;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ParamSet, ResultRow};
use futures_util::{Stream, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Executes named procedures against a pool.
#[derive(Debug, Clone, Default)]
pub struct ProcedureExecutor {
    catalog: Arc<ProcedureCatalog>,
}

impl ProcedureExecutor {
    pub fn new(catalog: ProcedureCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Run a procedure for its side effect and return the affected row count.
    pub async fn execute(
        &self,
        pool: &DbPool,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<u64> {
        validate_call(procedure, params)?;
        let start = Instant::now();

        debug!(
            procedure,
            backend = %pool.db_type(),
            params = params.len(),
            "Executing procedure"
        );

        let rows_affected = match pool {
            DbPool::MySql(p) => mysql::execute(p, procedure, params).await?,
            DbPool::Postgres(p) => postgres::execute(p, procedure, params).await?,
            DbPool::SQLite(p) => sqlite::execute(p, &self.catalog, procedure, params).await?,
        };

        debug!(
            procedure,
            rows_affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Procedure completed"
        );
        Ok(rows_affected)
    }

    /// Run a procedure and collect its result rows, reading at most `limit`
    /// rows when one is given.
    pub async fn fetch(
        &self,
        pool: &DbPool,
        procedure: &str,
        params: &ParamSet,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<ResultRow>> {
        validate_call(procedure, params)?;
        let start = Instant::now();

        debug!(
            procedure,
            backend = %pool.db_type(),
            params = params.len(),
            limit = ?limit,
            "Querying procedure"
        );

        let rows = match pool {
            DbPool::MySql(p) => mysql::fetch_rows(p, procedure, params, limit).await?,
            DbPool::Postgres(p) => postgres::fetch_rows(p, procedure, params, limit).await?,
            DbPool::SQLite(p) => {
                sqlite::fetch_rows(p, &self.catalog, procedure, params, limit).await?
            }
        };

        debug!(
            procedure,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Procedure completed"
        );
        Ok(rows)
    }

    /// Run the catalog's setup statements. Only SQLite pools have any.
    pub async fn run_setup(&self, pool: &DbPool) -> GatewayResult<()> {
        let DbPool::SQLite(p) = pool else {
            return Ok(());
        };
        if self.catalog.setup_statements().is_empty() {
            return Ok(());
        }

        debug!(
            statements = self.catalog.setup_statements().len(),
            "Running catalog setup"
        );
        sqlite::run_setup(p, self.catalog.setup_statements()).await
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn validate_call(procedure: &str, params: &ParamSet) -> GatewayResult<()> {
    validate_identifier("procedure", procedure, true)?;
    for name in params.names() {
        validate_identifier("parameter", name, false)?;
    }
    Ok(())
}

/// Check that `name` is a plain identifier, optionally `schema.name`.
pub(crate) fn validate_identifier(
    kind: &str,
    name: &str,
    allow_schema: bool,
) -> GatewayResult<()> {
    fn is_plain(part: &str) -> bool {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    }

    let valid = match name.split_once('.') {
        Some((schema, rest)) if allow_schema => is_plain(schema) && is_plain(rest),
        Some(_) => false,
        None => is_plain(name),
    };

    if valid {
        Ok(())
    } else {
        Err(GatewayError::invalid_input(format!(
            "Invalid {} name '{}'",
            kind, name
        )))
    }
}

async fn collect_rows<R, S>(
    mut stream: S,
    procedure: &str,
    limit: Option<usize>,
) -> GatewayResult<Vec<ResultRow>>
where
    R: DecodeRow,
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut rows = Vec::new();
    if limit == Some(0) {
        return Ok(rows);
    }

    while let Some(row) = stream
        .try_next()
        .await
        .map_err(|e| GatewayError::from_sqlx(procedure, e))?
    {
        rows.push(row.to_result_row());
        if limit.is_some_and(|l| rows.len() >= l) {
            break;
        }
    }
    Ok(rows)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    pub fn call_statement(procedure: &str, param_count: usize) -> String {
        let markers = vec!["?"; param_count].join(", ");
        format!("CALL {}({})", procedure, markers)
    }

    pub async fn execute(
        pool: &MySqlPool,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<u64> {
        let sql = call_statement(procedure, params.len());
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        // Without parameters the call goes over the text protocol
        let result = if params.is_empty() {
            use sqlx::Executor;
            (&mut *conn).execute(sql.as_str()).await
        } else {
            let mut query = sqlx::query(&sql);
            for value in params.values() {
                query = bind_mysql_param(query, value);
            }
            query.execute(&mut *conn).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| GatewayError::from_sqlx(procedure, e))
    }

    pub async fn fetch_rows(
        pool: &MySqlPool,
        procedure: &str,
        params: &ParamSet,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<ResultRow>> {
        let sql = call_statement(procedure, params.len());
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        if params.is_empty() {
            use sqlx::Executor;
            let stream = (&mut *conn).fetch(sql.as_str());
            collect_rows(stream, procedure, limit).await
        } else {
            let mut query = sqlx::query(&sql);
            for value in params.values() {
                query = bind_mysql_param(query, value);
            }
            let stream = query.fetch(&mut *conn);
            collect_rows(stream, procedure, limit).await
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{PgPool, Row};

    fn named_arguments(params: &ParamSet) -> String {
        params
            .names()
            .enumerate()
            .map(|(i, name)| format!("{} => ${}", name, i + 1))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn select_statement(procedure: &str, params: &ParamSet) -> String {
        format!("SELECT * FROM {}({})", procedure, named_arguments(params))
    }

    pub fn scalar_statement(procedure: &str, params: &ParamSet) -> String {
        format!("SELECT {}({})", procedure, named_arguments(params))
    }

    /// Affected count returned by a write function; NULL or void is 0.
    fn affected_count(row: &PgRow) -> u64 {
        let count = row
            .try_get::<Option<i64>, _>(0)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<i32>, _>(0)
                    .ok()
                    .flatten()
                    .map(i64::from)
            });
        count.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
    }

    pub async fn execute(pool: &PgPool, procedure: &str, params: &ParamSet) -> GatewayResult<u64> {
        let sql = scalar_statement(procedure, params);
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        let mut query = sqlx::query(&sql);
        for value in params.values() {
            query = bind_postgres_param(query, value);
        }
        let row = query
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        Ok(row.as_ref().map(affected_count).unwrap_or(0))
    }

    pub async fn fetch_rows(
        pool: &PgPool,
        procedure: &str,
        params: &ParamSet,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<ResultRow>> {
        let sql = select_statement(procedure, params);
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        let mut query = sqlx::query(&sql);
        for value in params.values() {
            query = bind_postgres_param(query, value);
        }
        let stream = query.fetch(&mut *conn);
        collect_rows(stream, procedure, limit).await
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;

    pub async fn execute(
        pool: &SqlitePool,
        catalog: &ProcedureCatalog,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<u64> {
        let definition = catalog.get(procedure)?;
        let arguments = definition.bind_arguments(params)?;
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        let mut query = sqlx::query(&definition.sql);
        for value in arguments {
            query = bind_sqlite_param(query, value);
        }
        query
            .execute(&mut *conn)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| GatewayError::from_sqlx(procedure, e))
    }

    pub async fn fetch_rows(
        pool: &SqlitePool,
        catalog: &ProcedureCatalog,
        procedure: &str,
        params: &ParamSet,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<ResultRow>> {
        let definition = catalog.get(procedure)?;
        let arguments = definition.bind_arguments(params)?;
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx(procedure, e))?;

        let mut query = sqlx::query(&definition.sql);
        for value in arguments {
            query = bind_sqlite_param(query, value);
        }
        let stream = query.fetch(&mut *conn);
        collect_rows(stream, procedure, limit).await
    }

    pub async fn run_setup(pool: &SqlitePool, statements: &[String]) -> GatewayResult<()> {
        use sqlx::Executor;

        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| GatewayError::from_sqlx("setup", e))?;
        for statement in statements {
            (&mut *conn)
                .execute(statement.as_str())
                .await
                .map_err(|e| GatewayError::from_sqlx("setup", e))?;
        }
        Ok(())
    }
}
