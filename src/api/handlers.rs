use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::params::{RowQuery, DESCRIBE};
use crate::db::{DatabaseRegistry, SelectQuery, TableResolver};
use crate::model::{CellValue, Expr, Table};

/// Shared by every handler: the frozen registry plus the resolver that
/// reads catalogs through it.
pub struct ServerState {
    pub registry: Arc<DatabaseRegistry>,
    pub resolver: TableResolver,
}

impl ServerState {
    pub fn new(registry: DatabaseRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            resolver: TableResolver::new(registry.clone()),
            registry,
        }
    }
}

pub type AppState = Arc<ServerState>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET / — names of every configured database, in configuration order.
pub async fn list_databases(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.names().to_vec())
}

/// GET /:database — table names, or full descriptors with `?_describe`.
pub async fn list_tables(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let describe = params.contains_key(DESCRIBE);
    let Some(tables) = state.resolver.resolve_all(&database, describe).await? else {
        return Err(ApiError::NotFound);
    };
    if describe {
        Ok(Json(tables).into_response())
    } else {
        let names: Vec<String> = tables.into_iter().map(|t| t.name).collect();
        Ok(Json(names).into_response())
    }
}

/// GET /:database/:table — rows, or the table descriptor with `?_describe`.
pub async fn get_rows(
    State(state): State<AppState>,
    Path((database, table)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    fetch_rows(&state, &database, &table, None, &params).await
}

/// GET /:database/:table/:id — rows keyed by primary key.
///
/// The id segment only filters when it parses as a positive integer;
/// anything else falls through to an unkeyed read, same as the
/// querystring-only route.
pub async fn get_rows_by_id(
    State(state): State<AppState>,
    Path((database, table, id)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    fetch_rows(&state, &database, &table, Some(id.as_str()), &params).await
}

async fn fetch_rows(
    state: &ServerState,
    database: &str,
    table_name: &str,
    id_segment: Option<&str>,
    params: &HashMap<String, String>,
) -> ApiResult<Response> {
    let Some(table) = state.resolver.resolve(database, table_name).await? else {
        return Err(ApiError::NotFound);
    };
    // The resolver just found the table, so the client must exist.
    let Some(client) = state.registry.get(database) else {
        return Err(ApiError::NotFound);
    };

    let query = RowQuery::from_pairs(params)?;
    if query.describe {
        return Ok(Json(table).into_response());
    }

    let mut filter: Option<Expr> = None;
    if let Some(raw) = id_segment {
        let id = raw.parse::<i64>().unwrap_or(0);
        if id > 0 {
            let Some(key) = table.primary_key.as_deref() else {
                log::warn!("no primary key defined for table {table_name} in database {database}");
                return Err(ApiError::BadRequest(format!(
                    "No primary key for table {table_name}"
                )));
            };
            filter = Some(Expr::equals(key, CellValue::Int(id)));
        }
    }

    for (key, value) in &query.filters {
        let clause = equality_clause(&table, key, value);
        filter = Some(match filter {
            None => clause,
            Some(existing) => Expr::prepend_and(clause, existing),
        });
    }

    let select = SelectQuery {
        fields: query.return_fields,
        filter,
        order_by: query.order_by,
        offset: query.index_start,
        limit: query.max_results,
    };
    let rows = client.select(&table.name, &select).await?;
    Ok(Json(rows.into_objects()).into_response())
}

/// One querystring pair as a column-equality clause. A known column gives
/// its canonical name and a value coerced to its kind; an unknown column
/// passes through as text and lets the engine complain.
fn equality_clause(table: &Table, key: &str, value: &str) -> Expr {
    match table.column(key) {
        Some(column) => Expr::equals(
            column.name.clone(),
            CellValue::coerce(value, column.data_type),
        ),
        None => Expr::equals(key, CellValue::Text(value.to_string())),
    }
}
