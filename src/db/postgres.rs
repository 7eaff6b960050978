use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgColumn, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::db::sql::render_select;
use crate::db::{ColumnInfo, DatabaseClient, EngineKind, SelectQuery};
use crate::model::{CellValue, DataKind, RowSet};

const LIST_TABLES: &str = "\
SELECT table_name::text AS name
FROM information_schema.tables
WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
ORDER BY table_name";

// Casts keep sqlx away from the information_schema domain types, which it
// refuses to decode directly.
const DESCRIBE_TABLE: &str = "\
SELECT c.column_name::text AS name,
       c.data_type::text AS data_type,
       (c.is_nullable = 'YES') AS nullable,
       c.character_maximum_length::bigint AS max_length,
       EXISTS (
           SELECT 1
           FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage kcu
             ON kcu.constraint_name = tc.constraint_name
            AND kcu.table_schema = tc.table_schema
           WHERE tc.constraint_type = 'PRIMARY KEY'
             AND tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND kcu.column_name = c.column_name
       ) AS primary_key
FROM information_schema.columns c
WHERE c.table_schema = 'public' AND c.table_name = $1
ORDER BY c.ordinal_position";

pub struct PostgresClient {
    pool: PgPool,
    debug: bool,
}

impl PostgresClient {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port.unwrap_or(EngineKind::Postgres.default_port()))
            .username(&config.username)
            .database(&config.database);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_with(options)
            .await
            .context("Failed to create PostgreSQL connection pool")?;
        Ok(Self {
            pool,
            debug: config.debug,
        })
    }
}

#[async_trait::async_trait]
impl DatabaseClient for PostgresClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RowSet> {
        let rendered = render_select(EngineKind::Postgres, table, query);
        if self.debug {
            log::debug!("postgres query: {}", rendered.sql);
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
                    data_type: kind_from_pg(row.try_get::<String, _>("data_type")?.as_str()),
                    nullable: row.try_get("nullable")?,
                    max_length: row.try_get("max_length")?,
                    primary_key: row.try_get("primary_key")?,
                })
            })
            .collect()
    }
}

fn bind_cell<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &CellValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Int(n) => query.bind(*n),
        CellValue::Float(f) => query.bind(*f),
        CellValue::Text(s) => query.bind(s.clone()),
        CellValue::Timestamp(ts) => query.bind(*ts),
    }
}

fn decode_cell(row: &PgRow, column: &PgColumn) -> Result<CellValue> {
    let index = column.ordinal();
    if row.try_get_raw(index)?.is_null() {
        return Ok(CellValue::Null);
    }
    let cell = match column.type_info().name() {
        "BOOL" => CellValue::Bool(row.try_get(index)?),
        "INT2" => CellValue::Int(row.try_get::<i16, _>(index)? as i64),
        "INT4" => CellValue::Int(row.try_get::<i32, _>(index)? as i64),
        "INT8" => CellValue::Int(row.try_get(index)?),
        "FLOAT4" => CellValue::Float(row.try_get::<f32, _>(index)? as f64),
        "FLOAT8" => CellValue::Float(row.try_get(index)?),
        "NUMERIC" => {
            let value: Decimal = row.try_get(index)?;
            match value.to_f64() {
                Some(f) => CellValue::Float(f),
                None => CellValue::Text(value.to_string()),
            }
        }
        "TIMESTAMPTZ" => CellValue::Timestamp(row.try_get(index)?),
        "TIMESTAMP" => CellValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?.and_utc()),
        "DATE" => CellValue::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => CellValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "UUID" => CellValue::Text(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => {
            CellValue::Text(row.try_get::<serde_json::Value, _>(index)?.to_string())
        }
        "BYTEA" => CellValue::Text(BASE64.encode(row.try_get::<Vec<u8>, _>(index)?)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => CellValue::Text(row.try_get(index)?),
        other => match row.try_get::<String, _>(index) {
            Ok(text) => CellValue::Text(text),
            Err(_) => {
                log::warn!(
                    "unhandled postgres type {other} for column {}, returning null",
                    column.name()
                );
                CellValue::Null
            }
        },
    };
    Ok(cell)
}

fn kind_from_pg(data_type: &str) -> DataKind {
    match data_type {
        "smallint" | "integer" | "bigint" => DataKind::Integer,
        "real" | "double precision" | "numeric" => DataKind::Float,
        "boolean" => DataKind::Boolean,
        "character varying" | "character" | "text" | "name" | "citext" => DataKind::Text,
        "timestamp with time zone" | "timestamp without time zone" | "date" => DataKind::DateTime,
        "bytea" => DataKind::Bytes,
        _ => DataKind::Other,
    }
}
