//! Generic record gateway.
//!
//! [`RecordGateway`] runs create / list / update / delete / lookup operations
//! for any record type that implements [`ToParams`] and [`FromResultRow`],
//! delegating each one to a named stored procedure. The gateway holds no
//! per-call state; clones share the same pool.

use crate::db::{DbPool, ProcedureCatalog, ProcedureExecutor};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    ConnectionConfig, DatabaseType, FromResultRow, ParamSet, ResultRow, ToParams, Value,
};
use tracing::info;
use uuid::Uuid;

/// Parameter name used by the id-keyed operations.
pub const ID_PARAM: &str = "Id";

#[derive(Debug, Clone)]
pub struct RecordGateway {
    pool: DbPool,
    executor: ProcedureExecutor,
}

impl RecordGateway {
    /// Open a pool and prepare the gateway.
    ///
    /// On SQLite the catalog's setup statements run before this returns.
    pub async fn connect(
        config: &ConnectionConfig,
        catalog: ProcedureCatalog,
    ) -> GatewayResult<Self> {
        let pool = DbPool::connect(config).await?;
        let gateway = Self::new(pool, catalog);
        gateway.executor.run_setup(&gateway.pool).await?;
        Ok(gateway)
    }

    /// Wrap an existing pool. Catalog setup statements are not run.
    pub fn new(pool: DbPool, catalog: ProcedureCatalog) -> Self {
        Self {
            pool,
            executor: ProcedureExecutor::new(catalog),
        }
    }

    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// Close the underlying pool; later calls fail with a connectivity error.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(db_type = %self.db_type(), "Gateway closed");
    }

    // -------------------------------------------------------------------------
    // Record operations
    // -------------------------------------------------------------------------

    /// Insert a record; every field binds as a named parameter.
    pub async fn create_record<T: ToParams>(
        &self,
        procedure: &str,
        entity: &T,
    ) -> GatewayResult<u64> {
        self.execute(procedure, &entity.to_params()).await
    }

    /// Every row the procedure returns, in store order.
    pub async fn list_all<T: FromResultRow>(&self, procedure: &str) -> GatewayResult<Vec<T>> {
        self.query_records(procedure, &ParamSet::new()).await
    }

    /// Update a record. Whether a missing id inserts is up to the procedure.
    pub async fn update_record<T: ToParams>(
        &self,
        procedure: &str,
        entity: &T,
    ) -> GatewayResult<u64> {
        self.execute(procedure, &entity.to_params()).await
    }

    /// Delete by id. Returns 0 when nothing matched.
    pub async fn delete_record(&self, procedure: &str, id: Uuid) -> GatewayResult<u64> {
        self.execute(procedure, &ParamSet::new().with(ID_PARAM, id))
            .await
    }

    pub async fn get_by_id<T: FromResultRow>(
        &self,
        procedure: &str,
        id: Uuid,
    ) -> GatewayResult<Option<T>> {
        self.query_record(procedure, &ParamSet::new().with(ID_PARAM, id))
            .await
    }

    /// All records matching one named parameter.
    pub async fn list_by_field<T: FromResultRow>(
        &self,
        procedure: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> GatewayResult<Vec<T>> {
        self.query_records(procedure, &ParamSet::new().with(field, value))
            .await
    }

    /// The single record matching one named parameter.
    ///
    /// `None` when nothing matches; [`GatewayError::MultipleRows`] when more
    /// than one row does.
    pub async fn get_one_by_field<T: FromResultRow>(
        &self,
        procedure: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> GatewayResult<Option<T>> {
        self.query_record(procedure, &ParamSet::new().with(field, value))
            .await
    }

    // -------------------------------------------------------------------------
    // Untyped operations
    // -------------------------------------------------------------------------

    pub async fn execute(&self, procedure: &str, params: &ParamSet) -> GatewayResult<u64> {
        self.executor.execute(&self.pool, procedure, params).await
    }

    pub async fn query(
        &self,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<Vec<ResultRow>> {
        self.executor.fetch(&self.pool, procedure, params, None).await
    }

    /// At most one row. Reads no more than two rows from the store.
    pub async fn query_single(
        &self,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<Option<ResultRow>> {
        let mut rows = self
            .executor
            .fetch(&self.pool, procedure, params, Some(2))
            .await?;
        single_row(procedure, &mut rows)
    }

    async fn query_records<T: FromResultRow>(
        &self,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<Vec<T>> {
        let rows = self.query(procedure, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    async fn query_record<T: FromResultRow>(
        &self,
        procedure: &str,
        params: &ParamSet,
    ) -> GatewayResult<Option<T>> {
        match self.query_single(procedure, params).await? {
            Some(row) => T::from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}

fn single_row(procedure: &str, rows: &mut Vec<ResultRow>) -> GatewayResult<Option<ResultRow>> {
    if rows.len() > 1 {
        return Err(GatewayError::multiple_rows(procedure));
    }
    Ok(rows.pop())
}
