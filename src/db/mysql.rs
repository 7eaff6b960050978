use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::db::sql::render_select;
use crate::db::{ColumnInfo, DatabaseClient, EngineKind, SelectQuery};
use crate::model::{CellValue, DataKind, RowSet};

const LIST_TABLES: &str = "\
SELECT table_name AS name
FROM information_schema.tables
WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
ORDER BY table_name";

// character_maximum_length is unsigned in MySQL 8, cast so it decodes as i64.
const DESCRIBE_TABLE: &str = "\
SELECT column_name AS name,
       data_type AS data_type,
       (is_nullable = 'YES') AS nullable,
       CAST(character_maximum_length AS SIGNED) AS max_length,
       (column_key = 'PRI') AS primary_key
FROM information_schema.columns
WHERE table_schema = DATABASE() AND table_name = ?
ORDER BY ordinal_position";

pub struct MySqlClient {
    pool: MySqlPool,
    debug: bool,
}

impl MySqlClient {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port.unwrap_or(EngineKind::MySql.default_port()))
            .username(&config.username)
            .database(&config.database);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        let pool = MySqlPoolOptions::new()
            .max_connections(20)
            .connect_with(options)
            .await
            .context("Failed to create MySQL connection pool")?;
        Ok(Self {
            pool,
            debug: config.debug,
        })
    }
}

#[async_trait::async_trait]
impl DatabaseClient for MySqlClient {
    fn engine(&self) -> EngineKind {
        EngineKind::MySql
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RowSet> {
        let rendered = render_select(EngineKind::MySql, table, query);
        if self.debug {
            log::debug!("mysql query: {}", rendered.sql);
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
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: kind_from_mysql(row.try_get::<String, _>("data_type")?.as_str()),
                    nullable: row.try_get::<i64, _>("nullable")? != 0,
                    max_length: row.try_get("max_length")?,
                    primary_key: row.try_get::<i64, _>("primary_key")? != 0,
                })
            })
            .collect()
    }
}

fn bind_cell<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &CellValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Int(n) => query.bind(*n),
        CellValue::Float(f) => query.bind(*f),
        CellValue::Text(s) => query.bind(s.clone()),
        CellValue::Timestamp(ts) => query.bind(*ts),
    }
}

fn decode_cell(row: &MySqlRow, column: &MySqlColumn) -> Result<CellValue> {
    let index = column.ordinal();
    if row.try_get_raw(index)?.is_null() {
        return Ok(CellValue::Null);
    }
    let cell = match column.type_info().name() {
        "BOOLEAN" => CellValue::Bool(row.try_get(index)?),
        "TINYINT" => CellValue::Int(row.try_get::<i8, _>(index)? as i64),
        "SMALLINT" => CellValue::Int(row.try_get::<i16, _>(index)? as i64),
        "MEDIUMINT" | "INT" => CellValue::Int(row.try_get::<i32, _>(index)? as i64),
        "BIGINT" => CellValue::Int(row.try_get(index)?),
        "TINYINT UNSIGNED" => CellValue::Int(row.try_get::<u8, _>(index)? as i64),
        "SMALLINT UNSIGNED" => CellValue::Int(row.try_get::<u16, _>(index)? as i64),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => {
            CellValue::Int(row.try_get::<u32, _>(index)? as i64)
        }
        "BIGINT UNSIGNED" => {
            let value: u64 = row.try_get(index)?;
            match i64::try_from(value) {
                Ok(n) => CellValue::Int(n),
                Err(_) => CellValue::Text(value.to_string()),
            }
        }
        "YEAR" => CellValue::Int(row.try_get::<u16, _>(index)? as i64),
        "FLOAT" => CellValue::Float(row.try_get::<f32, _>(index)? as f64),
        "DOUBLE" => CellValue::Float(row.try_get(index)?),
        "DECIMAL" => {
            let value: Decimal = row.try_get(index)?;
            match value.to_f64() {
                Some(f) => CellValue::Float(f),
                None => CellValue::Text(value.to_string()),
            }
        }
        "TIMESTAMP" => CellValue::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?),
        "DATETIME" => CellValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?.and_utc()),
        "DATE" => CellValue::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => CellValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "JSON" => CellValue::Text(row.try_get::<serde_json::Value, _>(index)?.to_string()),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            CellValue::Text(BASE64.encode(row.try_get::<Vec<u8>, _>(index)?))
        }
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            CellValue::Text(row.try_get(index)?)
        }
        other => match row.try_get::<String, _>(index) {
            Ok(text) => CellValue::Text(text),
            Err(_) => {
                log::warn!(
                    "unhandled mysql type {other} for column {}, returning null",
                    column.name()
                );
                CellValue::Null
            }
        },
    };
    Ok(cell)
}

fn kind_from_mysql(data_type: &str) -> DataKind {
    match data_type {
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" | "year" => DataKind::Integer,
        "decimal" | "float" | "double" => DataKind::Float,
        "char" | "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set" => {
            DataKind::Text
        }
        "datetime" | "timestamp" | "date" => DataKind::DateTime,
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => DataKind::Bytes,
        _ => DataKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_types_fold_to_kinds() {
        assert_eq!(kind_from_mysql("bigint"), DataKind::Integer);
        assert_eq!(kind_from_mysql("varchar"), DataKind::Text);
        assert_eq!(kind_from_mysql("datetime"), DataKind::DateTime);
        assert_eq!(kind_from_mysql("longblob"), DataKind::Bytes);
        assert_eq!(kind_from_mysql("json"), DataKind::Other);
    }
}
