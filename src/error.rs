//! Error types for the record gateway.
//!
//! Every failure surfaces to the caller unchanged; nothing here is retried.
//! "Not found" is never an error: single-row lookups return `None` and
//! multi-row lookups return an empty vector.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection failed: {message}")]
    Connectivity { message: String, suggestion: String },

    #[error("Procedure '{procedure}' failed: {message}")]
    RemoteExecution {
        procedure: String,
        message: String,
        /// Driver error code, e.g. "23505" on PostgreSQL or "2067" on SQLite
        sql_state: Option<String>,
    },

    #[error("Procedure '{procedure}' returned more than one row for a single-row lookup")]
    MultipleRows { procedure: String },

    #[error("Cannot map column '{column}': {message}")]
    Mapping { column: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    /// Create a connectivity error with a helpful suggestion.
    pub fn connectivity(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a remote execution error with optional driver code.
    pub fn remote(
        procedure: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self::RemoteExecution {
            procedure: procedure.into(),
            message: message.into(),
            sql_state,
        }
    }

    pub fn multiple_rows(procedure: impl Into<String>) -> Self {
        Self::MultipleRows {
            procedure: procedure.into(),
        }
    }

    /// Create a mapping error for a result column.
    pub fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connectivity { suggestion, .. } => Some(suggestion),
            Self::MultipleRows { .. } => {
                Some("The procedure must return at most one row for this lookup")
            }
            _ => None,
        }
    }

    /// Check if this error means the store could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Classify a sqlx error raised while running `procedure`.
    pub fn from_sqlx(procedure: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => GatewayError::connectivity(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                GatewayError::remote(procedure, db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => GatewayError::connectivity(
                "Timed out acquiring a connection from the pool",
                "Check that the database server is reachable or raise acquire_timeout",
            ),
            sqlx::Error::PoolClosed => {
                GatewayError::connectivity("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => GatewayError::connectivity(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => GatewayError::connectivity(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => GatewayError::connectivity(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::WorkerCrashed => GatewayError::connectivity(
                "Database worker crashed",
                "Reconnect to the database",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                GatewayError::mapping(col.clone(), format!("column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => GatewayError::mapping(
                index.to_string(),
                format!("column index {} out of bounds (len: {})", index, len),
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                GatewayError::mapping(index, format!("failed to decode: {}", source))
            }
            sqlx::Error::Decode(source) => {
                GatewayError::mapping("?", format!("decode error: {}", source))
            }
            sqlx::Error::TypeNotFound { type_name } => {
                GatewayError::remote(procedure, format!("type not found: {}", type_name), None)
            }
            other => GatewayError::remote(procedure, other.to_string(), None),
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
