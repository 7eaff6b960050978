use std::sync::Arc;

use anyhow::Result;

use crate::db::{ColumnInfo, DatabaseRegistry};
use crate::model::{Column, Table};

/// Resolves table descriptors by querying engine catalogs on demand.
///
/// Nothing is cached: schema changes in a backend show up on the next
/// request. `Ok(None)` means the database or table does not exist, which
/// callers map to 404; errors are real backend failures.
pub struct TableResolver {
    registry: Arc<DatabaseRegistry>,
}

impl TableResolver {
    pub fn new(registry: Arc<DatabaseRegistry>) -> Self {
        Self { registry }
    }

    /// Descriptor for one table, or `None` when the database is unknown or
    /// the table has no columns in the catalog.
    pub async fn resolve(&self, database: &str, table: &str) -> Result<Option<Table>> {
        let Some(client) = self.registry.get(database) else {
            log::warn!("lookup against unknown database {database}");
            return Ok(None);
        };
        let columns = client.describe_table(table).await?;
        if columns.is_empty() {
            log::warn!("table {table} not found in database {database}");
            return Ok(None);
        }
        Ok(Some(table_from_columns(table, columns)))
    }

    /// Every table in one database, or `None` when the database is unknown
    /// or has no tables. With `describe` set each descriptor carries full
    /// column metadata, otherwise names only.
    pub async fn resolve_all(&self, database: &str, describe: bool) -> Result<Option<Vec<Table>>> {
        let Some(client) = self.registry.get(database) else {
            log::warn!("lookup against unknown database {database}");
            return Ok(None);
        };
        let names = client.list_tables().await?;
        if names.is_empty() {
            log::warn!("no tables found in database {database}");
            return Ok(None);
        }
        if !describe {
            return Ok(Some(names.into_iter().map(Table::name_only).collect()));
        }
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = client.describe_table(&name).await?;
            if columns.is_empty() {
                // Listed but not describable, likely dropped in between.
                log::warn!("table {name} in database {database} has no columns");
                tables.push(Table::name_only(name));
                continue;
            }
            tables.push(table_from_columns(&name, columns));
        }
        Ok(Some(tables))
    }
}

/// Fold catalog columns into a table descriptor. When the engine reports a
/// composite primary key, the first flagged column wins and the rest are
/// logged; id routing only ever equates against a single column.
fn table_from_columns(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Table {
    let name = name.into();
    let mut primary_key: Option<String> = None;
    let mut folded = Vec::with_capacity(columns.len());
    for info in columns {
        if info.primary_key {
            match &primary_key {
                None => primary_key = Some(info.name.clone()),
                Some(first) => log::warn!(
                    "table {name} has a composite primary key, using {first} and ignoring {}",
                    info.name
                ),
            }
        }
        folded.push(Column {
            name: info.name,
            data_type: info.data_type,
            nullable: info.nullable,
            max_length: info.max_length,
        });
    }
    Table {
        name,
        columns: folded,
        primary_key,
    }
}
