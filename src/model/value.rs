use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::DataKind;

/// A single cell as it travels from an engine row to the JSON response.
///
/// Untagged so rows serialize as plain JSON scalars. Binary cells are
/// base64-encoded into `Text` by the engine adapters before they get here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Coerce a raw querystring value to the kind of the column it filters.
    ///
    /// Bound parameters are typed, so "42" must become an integer before it
    /// can be compared against an integer column. Values that do not parse
    /// stay text and surface as an engine type error downstream.
    pub fn coerce(raw: &str, kind: DataKind) -> CellValue {
        match kind {
            DataKind::Integer => match raw.parse::<i64>() {
                Ok(n) => CellValue::Int(n),
                Err(_) => CellValue::Text(raw.to_string()),
            },
            DataKind::Float => match raw.parse::<f64>() {
                Ok(f) => CellValue::Float(f),
                Err(_) => CellValue::Text(raw.to_string()),
            },
            DataKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => CellValue::Bool(true),
                "false" | "0" => CellValue::Bool(false),
                _ => CellValue::Text(raw.to_string()),
            },
            DataKind::DateTime => match parse_timestamp(raw) {
                Some(ts) => CellValue::Timestamp(ts),
                None => CellValue::Text(raw.to_string()),
            },
            DataKind::Text | DataKind::Bytes | DataKind::Other => {
                CellValue::Text(raw.to_string())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Accept RFC 3339 plus the bare date and datetime spellings clients
/// actually send. Naive values are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Some(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = raw.parse::<chrono::NaiveDate>() {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Value {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Int(n) => Value::Number(n.into()),
            CellValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s),
            CellValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        }
    }
}

/// Column-ordered result of a SELECT, before serialization to JSON objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One JSON object per row, keyed by column name. An empty result
    /// becomes an empty array, never null.
    pub fn into_objects(self) -> Vec<Value> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                let mut object = Map::new();
                for (name, cell) in columns.iter().zip(row) {
                    object.insert(name.clone(), cell.into());
                }
                Value::Object(object)
            })
            .collect()
    }
}
