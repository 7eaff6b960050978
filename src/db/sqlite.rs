use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteColumn, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::db::sql::render_select;
use crate::db::{ColumnInfo, DatabaseClient, EngineKind, SelectQuery};
use crate::model::{CellValue, DataKind, RowSet};

const LIST_TABLES: &str = "\
SELECT name FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
ORDER BY name";

// pragma_table_info is the table-valued form, which accepts a bound name.
const DESCRIBE_TABLE: &str = "\
SELECT name AS name, type AS data_type, \"notnull\" AS not_null, pk AS pk
FROM pragma_table_info(?)
ORDER BY cid";

pub struct SqliteClient {
    pool: SqlitePool,
    debug: bool,
}

impl SqliteClient {
    /// For SQLite the configured database is the file path; host, port and
    /// credentials are ignored.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(&config.database);
        let pool = SqlitePoolOptions::new()
            .max_connections(20)
            .connect_with(options)
            .await
            .context("Failed to create SQLite connection pool")?;
        Ok(Self {
            pool,
            debug: config.debug,
        })
    }
}

#[async_trait::async_trait]
impl DatabaseClient for SqliteClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RowSet> {
        let rendered = render_select(EngineKind::Sqlite, table, query);
        if self.debug {
            log::debug!("sqlite query: {}", rendered.sql);
        }
        let mut q = sqlx::query(&rendered.sql);
        for value in &rendered.binds {
            q = bind_cell(q, value);
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Query against table {table} failed"))?;

        let mut set = match rows.first() {
            Some(row) => RowSet::new(row.columns().iter().map(|c| c.name().to_string()).collect()),
            None => RowSet::default(),
        };
        for row in &rows {
            let mut cells = Vec::with_capacity(row.columns().len());
            for column in row.columns() {
                cells.push(decode_cell(row, column)?);
            }
            set.push_row(cells);
        }
        Ok(set)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(LIST_TABLES)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tables")?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query(DESCRIBE_TABLE)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to describe table {table}"))?;
        rows.iter()
            .map(|row| {
                let declared: String = row.try_get("data_type")?;
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: kind_from_declared(&declared),
                    nullable: row.try_get::<i64, _>("not_null")? == 0,
                    max_length: declared_length(&declared),
                    primary_key: row.try_get::<i64, _>("pk")? > 0,
                })
            })
            .collect()
    }
}

fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &CellValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Int(n) => query.bind(*n),
        CellValue::Float(f) => query.bind(*f),
        CellValue::Text(s) => query.bind(s.clone()),
        CellValue::Timestamp(ts) => query.bind(*ts),
    }
}

fn decode_cell(row: &SqliteRow, column: &SqliteColumn) -> Result<CellValue> {
    let index = column.ordinal();
    if row.try_get_raw(index)?.is_null() {
        return Ok(CellValue::Null);
    }
    let cell = match column.type_info().name() {
        "BOOLEAN" => CellValue::Bool(row.try_get(index)?),
        "INTEGER" => CellValue::Int(row.try_get(index)?),
        "REAL" => CellValue::Float(row.try_get(index)?),
        "TEXT" => CellValue::Text(row.try_get(index)?),
        "BLOB" => CellValue::Text(BASE64.encode(row.try_get::<Vec<u8>, _>(index)?)),
        // Declared date and time kinds store as text or numbers; fall back
        // to the raw text when the value does not parse.
        "DATETIME" => match row.try_get::<NaiveDateTime, _>(index) {
            Ok(ts) => CellValue::Timestamp(ts.and_utc()),
            Err(_) => CellValue::Text(row.try_get(index)?),
        },
        "DATE" => match row.try_get::<NaiveDate, _>(index) {
            Ok(date) => CellValue::Text(date.to_string()),
            Err(_) => CellValue::Text(row.try_get(index)?),
        },
        "TIME" => match row.try_get::<NaiveTime, _>(index) {
            Ok(time) => CellValue::Text(time.to_string()),
            Err(_) => CellValue::Text(row.try_get(index)?),
        },
        "NUMERIC" => match row.try_get::<f64, _>(index) {
            Ok(f) => CellValue::Float(f),
            Err(_) => CellValue::Text(row.try_get(index)?),
        },
        other => match row.try_get::<String, _>(index) {
            Ok(text) => CellValue::Text(text),
            Err(_) => {
                log::warn!(
                    "unhandled sqlite type {other} for column {}, returning null",
                    column.name()
                );
                CellValue::Null
            }
        },
    };
    Ok(cell)
}

/// Fold a declared column type to a kind following SQLite's affinity rules,
/// with extra cases for the date and boolean spellings ORMs leave behind.
fn kind_from_declared(declared: &str) -> DataKind {
    let upper = declared.to_ascii_uppercase();
    if upper.is_empty() || upper.contains("BLOB") {
        DataKind::Bytes
    } else if upper.contains("BOOL") {
        DataKind::Boolean
    } else if upper.contains("DATE") || upper.contains("TIME") {
        DataKind::DateTime
    } else if upper.contains("INT") {
        DataKind::Integer
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        DataKind::Text
    } else if upper.contains("REAL")
        || upper.contains("FLOA")
        || upper.contains("DOUB")
        || upper.contains("DEC")
        || upper.contains("NUMERIC")
    {
        DataKind::Float
    } else {
        DataKind::Other
    }
}

/// Length out of a declared type like `VARCHAR(100)` or `DECIMAL(10,2)`.
fn declared_length(declared: &str) -> Option<i64> {
    let open = declared.find('(')?;
    let rest = &declared[open + 1..];
    let end = rest.find([',', ')'])?;
    rest[..end].trim().parse().ok()
}
