use std::collections::HashMap;

use crate::api::error::ApiError;

/// Reserved querystring keys. Matching is exact: `_DESCRIBE` is an
/// ordinary filter key, only the lowercase spellings are control
/// parameters.
pub const DESCRIBE: &str = "_describe";
pub const INDEX_START: &str = "_index_start";
pub const MAX_RESULTS: &str = "_max_results";
pub const ORDER_BY: &str = "_order_by";
pub const RETURN_FIELDS: &str = "_return_fields";

/// Parsed querystring of a row request: control parameters split out,
/// everything else kept as column-equality filter pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    pub describe: bool,
    pub index_start: Option<i64>,
    pub max_results: Option<i64>,
    pub order_by: Option<String>,
    pub return_fields: Option<Vec<String>>,
    pub filters: Vec<(String, String)>,
}

impl RowQuery {
    /// Split a querystring into control parameters and filters.
    ///
    /// `_describe` takes precedence over everything: when present the rest
    /// of the querystring is not even parsed, so a malformed `_max_results`
    /// next to `_describe` still describes.
    pub fn from_pairs(params: &HashMap<String, String>) -> Result<RowQuery, ApiError> {
        if params.contains_key(DESCRIBE) {
            return Ok(RowQuery {
                describe: true,
                ..RowQuery::default()
            });
        }
        let mut query = RowQuery::default();
        for (key, value) in params {
            match key.as_str() {
                INDEX_START => query.index_start = Some(parse_count(key, value)?),
                MAX_RESULTS => query.max_results = Some(parse_count(key, value)?),
                ORDER_BY => query.order_by = Some(value.clone()),
                RETURN_FIELDS => query.return_fields = parse_field_list(value),
                _ => query.filters.push((key.clone(), value.clone())),
            }
        }
        Ok(query)
    }
}

fn parse_count(key: &str, value: &str) -> Result<i64, ApiError> {
    match value.parse::<i64>() {
        Ok(count) if count >= 0 => Ok(count),
        _ => Err(ApiError::BadRequest(format!(
            "{key} must be a non-negative integer"
        ))),
    }
}

/// Comma-separated column names, trimmed; an empty list means no
/// projection was requested.
fn parse_field_list(value: &str) -> Option<Vec<String>> {
    let fields: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn splits_control_parameters_from_filters() {
        let query = RowQuery::from_pairs(&pairs(&[
            ("_index_start", "5"),
            ("_max_results", "10"),
            ("_order_by", "order_id desc"),
            ("_return_fields", "order_id, status"),
            ("status", "shipped"),
        ]))
        .unwrap();

        assert_eq!(query.index_start, Some(5));
        assert_eq!(query.max_results, Some(10));
        assert_eq!(query.order_by.as_deref(), Some("order_id desc"));
        assert_eq!(
            query.return_fields,
            Some(vec!["order_id".to_string(), "status".to_string()])
        );
        assert_eq!(query.filters, vec![("status".to_string(), "shipped".to_string())]);
        assert!(!query.describe);
    }

    #[test]
    fn describe_wins_and_skips_everything_else() {
        let query = RowQuery::from_pairs(&pairs(&[
            ("_describe", ""),
            ("_max_results", "not-a-number"),
            ("status", "shipped"),
        ]))
        .unwrap();
        assert!(query.describe);
        assert!(query.filters.is_empty());
        assert!(query.max_results.is_none());
    }

    #[test]
    fn reserved_keys_are_case_sensitive() {
        let query = RowQuery::from_pairs(&pairs(&[("_DESCRIBE", "1"), ("_Max_Results", "3")])).unwrap();
        assert!(!query.describe);
        assert_eq!(query.filters.len(), 2);
    }

    #[test]
    fn malformed_counts_are_rejected() {
        assert!(RowQuery::from_pairs(&pairs(&[("_max_results", "abc")])).is_err());
        assert!(RowQuery::from_pairs(&pairs(&[("_index_start", "-1")])).is_err());
        assert!(RowQuery::from_pairs(&pairs(&[("_index_start", "2.5")])).is_err());
    }

    #[test]
    fn empty_field_list_means_no_projection() {
        let query = RowQuery::from_pairs(&pairs(&[("_return_fields", " , ,")])).unwrap();
        assert!(query.return_fields.is_none());
    }

    #[test]
    fn bare_querystring_parses_to_default() {
        let query = RowQuery::from_pairs(&HashMap::new()).unwrap();
        assert_eq!(query, RowQuery::default());
    }
}
