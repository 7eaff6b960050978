use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{DataKind, Expr, RowSet};

/// Supported backend engines. The variant decides which adapter a
/// configured database connects through and which SQL dialect it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[serde(alias = "postgresql")]
    Postgres,
    MySql,
    Sqlite,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Postgres => write!(f, "postgres"),
            EngineKind::MySql => write!(f, "mysql"),
            EngineKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl EngineKind {
    pub fn default_port(self) -> u16 {
        match self {
            EngineKind::Postgres => 5432,
            EngineKind::MySql => 3306,
            EngineKind::Sqlite => 0,
        }
    }
}

/// Raw column metadata as read from an engine's catalog, before the
/// resolver folds it into a [`Table`](crate::model::Table) descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataKind,
    pub nullable: bool,
    pub max_length: Option<i64>,
    pub primary_key: bool,
}

/// Read-side description of a SELECT against one table. Everything is
/// optional; the zero value means `SELECT * FROM t` with no trimmings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub fields: Option<Vec<String>>,
    pub filter: Option<Expr>,
    pub order_by: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// One connected backend database. Implementations own a connection pool
/// and translate the engine-neutral query model into their own dialect.
#[async_trait::async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Which engine this client speaks.
    fn engine(&self) -> EngineKind;

    /// Run a SELECT described by `query` against `table`.
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RowSet>;

    /// Names of the user tables visible to the connection.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Catalog metadata for one table, empty when the table does not exist.
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>>;
}
