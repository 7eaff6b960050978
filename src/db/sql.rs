use itertools::Itertools;

use crate::db::{EngineKind, SelectQuery};
use crate::model::{CellValue, Expr, Operator};

/// SQL text plus the values to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSelect {
    pub sql: String,
    pub binds: Vec<CellValue>,
}

/// Render an engine-neutral query into one engine's dialect.
///
/// Filters always go through bound parameters. `order_by` is interpolated
/// verbatim, which is part of the query contract for that parameter.
pub fn render_select(engine: EngineKind, table: &str, query: &SelectQuery) -> RenderedSelect {
    let mut sql = String::from("SELECT ");
    match query.fields.as_deref() {
        Some(fields) if !fields.is_empty() => {
            let list = fields.iter().map(|f| quote_ident(engine, f)).join(", ");
            sql.push_str(&list);
        }
        _ => sql.push('*'),
    }
    sql.push_str(" FROM ");
    sql.push_str(&quote_ident(engine, table));

    let mut binds = Vec::new();
    if let Some(filter) = &query.filter {
        sql.push_str(" WHERE ");
        render_expr(engine, filter, &mut sql, &mut binds);
    }

    if let Some(order_by) = query.order_by.as_deref() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    match (query.limit, query.offset) {
        (Some(limit), Some(offset)) => {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        (Some(limit), None) => {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        // MySQL and SQLite have no standalone OFFSET clause, so an
        // offset without a limit needs the engine's "unbounded" limit.
        (None, Some(offset)) => match engine {
            EngineKind::Postgres => sql.push_str(&format!(" OFFSET {offset}")),
            EngineKind::MySql => {
                sql.push_str(&format!(" LIMIT 18446744073709551615 OFFSET {offset}"));
            }
            EngineKind::Sqlite => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        },
        (None, None) => {}
    }

    RenderedSelect { sql, binds }
}

/// Quote an identifier for the engine, doubling any embedded quote chars.
pub fn quote_ident(engine: EngineKind, ident: &str) -> String {
    match engine {
        EngineKind::Postgres | EngineKind::Sqlite => {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
        EngineKind::MySql => format!("`{}`", ident.replace('`', "``")),
    }
}

fn render_expr(engine: EngineKind, expr: &Expr, sql: &mut String, binds: &mut Vec<CellValue>) {
    match expr {
        Expr::And { left, right } => {
            sql.push('(');
            render_expr(engine, left, sql, binds);
            sql.push_str(" AND ");
            render_expr(engine, right, sql, binds);
            sql.push(')');
        }
        Expr::Or { left, right } => {
            sql.push('(');
            render_expr(engine, left, sql, binds);
            sql.push_str(" OR ");
            render_expr(engine, right, sql, binds);
            sql.push(')');
        }
        Expr::Compare { field, op, value } => {
            render_compare(engine, field, *op, value, sql, binds);
        }
    }
}

fn render_compare(
    engine: EngineKind,
    field: &str,
    op: Operator,
    value: &CellValue,
    sql: &mut String,
    binds: &mut Vec<CellValue>,
) {
    let column = quote_ident(engine, field);
    match op {
        Operator::IsNull => {
            sql.push_str(&format!("{column} IS NULL"));
        }
        Operator::Equals if value.is_null() => {
            sql.push_str(&format!("{column} IS NULL"));
        }
        Operator::NotEquals if value.is_null() => {
            sql.push_str(&format!("{column} IS NOT NULL"));
        }
        Operator::Equals
        | Operator::NotEquals
        | Operator::GreaterThan
        | Operator::GreaterThanOrEqualTo
        | Operator::LessThan
        | Operator::LessThanOrEqualTo => {
            binds.push(value.clone());
            let symbol = comparison_symbol(op);
            let ph = placeholder(engine, binds.len());
            sql.push_str(&format!("{column} {symbol} {ph}"));
        }
        Operator::Contains => {
            binds.push(value.clone());
            let ph = placeholder(engine, binds.len());
            sql.push_str(&format!(
                "{column} LIKE {}",
                like_pattern(engine, &ph, true, true)
            ));
        }
        Operator::StartsWith => {
            binds.push(value.clone());
            let ph = placeholder(engine, binds.len());
            sql.push_str(&format!(
                "{column} LIKE {}",
                like_pattern(engine, &ph, false, true)
            ));
        }
        Operator::EndsWith => {
            binds.push(value.clone());
            let ph = placeholder(engine, binds.len());
            sql.push_str(&format!(
                "{column} LIKE {}",
                like_pattern(engine, &ph, true, false)
            ));
        }
    }
}

fn comparison_symbol(op: Operator) -> &'static str {
    match op {
        Operator::Equals => "=",
        Operator::NotEquals => "<>",
        Operator::GreaterThan => ">",
        Operator::GreaterThanOrEqualTo => ">=",
        Operator::LessThan => "<",
        Operator::LessThanOrEqualTo => "<=",
        Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::IsNull => {
            unreachable!("pattern operators render through LIKE")
        }
    }
}

/// The LIKE operand around a bound placeholder. MySQL builds the pattern
/// with CONCAT, the others use the standard `||` concatenation.
fn like_pattern(engine: EngineKind, ph: &str, leading: bool, trailing: bool) -> String {
    match engine {
        EngineKind::MySql => match (leading, trailing) {
            (true, true) => format!("CONCAT('%', {ph}, '%')"),
            (false, true) => format!("CONCAT({ph}, '%')"),
            (true, false) => format!("CONCAT('%', {ph})"),
            (false, false) => ph.to_string(),
        },
        EngineKind::Postgres | EngineKind::Sqlite => match (leading, trailing) {
            (true, true) => format!("'%' || {ph} || '%'"),
            (false, true) => format!("{ph} || '%'"),
            (true, false) => format!("'%' || {ph}"),
            (false, false) => ph.to_string(),
        },
    }
}

fn placeholder(engine: EngineKind, position: usize) -> String {
    match engine {
        EngineKind::Postgres => format!("${position}"),
        EngineKind::MySql | EngineKind::Sqlite => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> SelectQuery {
        SelectQuery::default()
    }

    #[test]
    fn bare_select_renders_star() {
        let rendered = render_select(EngineKind::Postgres, "orders", &query());
        assert_eq!(rendered.sql, "SELECT * FROM \"orders\"");
        assert!(rendered.binds.is_empty());
    }

    #[test]
    fn projection_filter_order_and_paging_compose() {
        let q = SelectQuery {
            fields: Some(vec!["order_id".into(), "status".into()]),
            filter: Some(Expr::prepend_and(
                Expr::equals("status", CellValue::Text("shipped".into())),
                Expr::equals("customer_id", CellValue::Int(9)),
            )),
            order_by: Some("order_id desc".into()),
            offset: Some(5),
            limit: Some(10),
        };
        let rendered = render_select(EngineKind::Postgres, "orders", &q);
        assert_eq!(
            rendered.sql,
            "SELECT \"order_id\", \"status\" FROM \"orders\" \
             WHERE (\"status\" = $1 AND \"customer_id\" = $2) \
             ORDER BY order_id desc LIMIT 10 OFFSET 5"
        );
        assert_eq!(
            rendered.binds,
            vec![CellValue::Text("shipped".into()), CellValue::Int(9)]
        );
    }

    #[test]
    fn mysql_quotes_with_backticks_and_uses_question_marks() {
        let q = SelectQuery {
            filter: Some(Expr::equals("status", CellValue::Text("shipped".into()))),
            ..query()
        };
        let rendered = render_select(EngineKind::MySql, "orders", &q);
        assert_eq!(rendered.sql, "SELECT * FROM `orders` WHERE `status` = ?");
    }

    #[test]
    fn offset_without_limit_per_engine() {
        let q = SelectQuery {
            offset: Some(20),
            ..query()
        };
        assert_eq!(
            render_select(EngineKind::Postgres, "t", &q).sql,
            "SELECT * FROM \"t\" OFFSET 20"
        );
        assert_eq!(
            render_select(EngineKind::MySql, "t", &q).sql,
            "SELECT * FROM `t` LIMIT 18446744073709551615 OFFSET 20"
        );
        assert_eq!(
            render_select(EngineKind::Sqlite, "t", &q).sql,
            "SELECT * FROM \"t\" LIMIT -1 OFFSET 20"
        );
    }

    #[test]
    fn contains_renders_engine_specific_like() {
        let q = SelectQuery {
            filter: Some(Expr::compare(
                "name",
                Operator::Contains,
                CellValue::Text("bolt".into()),
            )),
            ..query()
        };
        assert_eq!(
            render_select(EngineKind::Postgres, "parts", &q).sql,
            "SELECT * FROM \"parts\" WHERE \"name\" LIKE '%' || $1 || '%'"
        );
        assert_eq!(
            render_select(EngineKind::MySql, "parts", &q).sql,
            "SELECT * FROM `parts` WHERE `name` LIKE CONCAT('%', ?, '%')"
        );
    }

    #[test]
    fn null_comparisons_use_is_null() {
        let q = SelectQuery {
            filter: Some(Expr::equals("deleted_at", CellValue::Null)),
            ..query()
        };
        assert_eq!(
            render_select(EngineKind::Postgres, "t", &q).sql,
            "SELECT * FROM \"t\" WHERE \"deleted_at\" IS NULL"
        );
        let q = SelectQuery {
            filter: Some(Expr::compare(
                "deleted_at",
                Operator::NotEquals,
                CellValue::Null,
            )),
            ..query()
        };
        assert_eq!(
            render_select(EngineKind::Postgres, "t", &q).sql,
            "SELECT * FROM \"t\" WHERE \"deleted_at\" IS NOT NULL"
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote_ident(EngineKind::Postgres, "od\"d"), "\"od\"\"d\"");
        assert_eq!(quote_ident(EngineKind::MySql, "od`d"), "`od``d`");
    }

    #[test]
    fn empty_projection_falls_back_to_star() {
        let q = SelectQuery {
            fields: Some(vec![]),
            ..query()
        };
        assert_eq!(
            render_select(EngineKind::Sqlite, "t", &q).sql,
            "SELECT * FROM \"t\""
        );
    }
}
