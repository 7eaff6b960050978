use anyhow::Result;

use crate::db::{ColumnInfo, DatabaseClient, EngineKind, SelectQuery};
use crate::model::{DataKind, RowSet};

/// In-memory stand-in for a connected backend, used by unit tests that
/// exercise registry and resolver behavior without a live engine.
pub(crate) struct StubClient {
    tables: Vec<(String, Vec<ColumnInfo>)>,
}

impl StubClient {
    pub fn empty() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn with_tables(tables: Vec<(String, Vec<ColumnInfo>)>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl DatabaseClient for StubClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    async fn select(&self, _table: &str, _query: &SelectQuery) -> Result<RowSet> {
        Ok(RowSet::default())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }
}

pub(crate) fn stub_column(name: &str, data_type: DataKind, primary_key: bool) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type,
        nullable: !primary_key,
        max_length: None,
        primary_key,
    }
}
