use serde::{Deserialize, Serialize};

/// Logical column type, folded down from each engine's native type names.
///
/// Engines report dozens of native types; clients only need to know which
/// JSON shape a column produces and how to coerce filter values against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Bytes,
    Other,
}

/// Column descriptor as returned by `_describe` and used for filter coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataKind,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
}

/// Table descriptor: name, columns, and at most one primary-key column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl Table {
    /// Descriptor with no column metadata, used when listing tables by name.
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    /// Case-insensitive column lookup. Engines differ on identifier case
    /// folding, so filter keys match columns without regard to case.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
