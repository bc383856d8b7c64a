//! Statement text for the warm-up query and every cache mutation.
//!
//! Literals are quoted from the column metadata captured at load time.

use std::collections::HashMap;

use crate::config::TableConfig;
use crate::store::ColumnMetadata;

use super::entry::NULL_SENTINEL;

pub type ColumnTypes = HashMap<String, ColumnMetadata>;

/// `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..]`
pub fn select(table: &TableConfig) -> String {
    let mut sql = format!("SELECT {} FROM {}", table.columns.join(", "), table.table_name);
    if let Some(filter) = table.where_clause.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    if let Some(order) = table.order_by.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
        sql.push(' ');
        sql.push_str(order);
    }
    sql
}

/// Renders `value` as a literal for `column`.
///
/// Numeric columns take finite numbers unquoted and map an empty value or the NULL
/// sentinel to `NULL`; anything else is quoted with `'` doubled.
pub fn literal(types: &ColumnTypes, column: &str, value: &str) -> String {
    let numeric = types.get(column).is_some_and(ColumnMetadata::is_numeric);
    if numeric {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == NULL_SENTINEL {
            return "NULL".to_string();
        }
        if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
            return trimmed.to_string();
        }
    }
    quote(value)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `INSERT INTO <table> (a, b) VALUES (..)`
pub fn insert(table: &str, types: &ColumnTypes, pairs: &[(String, String)]) -> String {
    let columns: Vec<&str> = pairs.iter().map(|(c, _)| c.as_str()).collect();
    let values: Vec<String> = pairs.iter().map(|(c, v)| literal(types, c, v)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values.join(", ")
    )
}

/// `UPDATE <table> SET a=.., b=.. WHERE <pkey>=..`
pub fn update(
    table: &str,
    types: &ColumnTypes,
    pkey: &str,
    pkey_value: &str,
    pairs: &[(String, String)],
) -> String {
    let assignments: Vec<String> = pairs
        .iter()
        .map(|(c, v)| format!("{}={}", c, literal(types, c, v)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {}={}",
        table,
        assignments.join(", "),
        pkey,
        literal(types, pkey, pkey_value)
    )
}

/// `DELETE FROM <table> WHERE <pkey>=..`
pub fn delete(table: &str, types: &ColumnTypes, pkey: &str, pkey_value: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {}={}",
        table,
        pkey,
        literal(types, pkey, pkey_value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> ColumnTypes {
        let meta = |name: &str, ty: &str| ColumnMetadata {
            name: name.to_string(),
            type_name: ty.to_string(),
            nullable: Some(true),
            length: None,
        };
        HashMap::from([
            ("id".to_string(), meta("id", "INTEGER")),
            ("name".to_string(), meta("name", "VARCHAR(20)")),
        ])
    }

    #[test]
    fn test_select() {
        let mut table = TableConfig::new("users", "id", &["id", "name"]);
        assert_eq!(select(&table), "SELECT id, name FROM users");

        table.where_clause = Some("id > 3".to_string());
        table.order_by = Some("order by name desc".to_string());
        assert_eq!(
            select(&table),
            "SELECT id, name FROM users WHERE id > 3 order by name desc"
        );
    }

    #[test]
    fn test_literals() {
        let types = types();
        assert_eq!(literal(&types, "id", "42"), "42");
        assert_eq!(literal(&types, "id", ""), "NULL");
        assert_eq!(literal(&types, "id", "NULL"), "NULL");
        assert_eq!(literal(&types, "id", "4; DROP"), "'4; DROP'");
        assert_eq!(literal(&types, "name", "O'Hara"), "'O''Hara'");
        assert_eq!(literal(&types, "name", "NULL"), "'NULL'");
        assert_eq!(literal(&types, "unknown", "7"), "'7'");
        assert_eq!(literal(&types, "id", "-1.5e3"), "-1.5e3");
        assert_eq!(literal(&types, "id", "inf"), "'inf'");
        assert_eq!(literal(&types, "id", "-Infinity"), "'-Infinity'");
        assert_eq!(literal(&types, "id", "NaN"), "'NaN'");
    }

    #[test]
    fn test_statements() {
        let types = types();
        let pairs = vec![
            ("id".to_string(), "1".to_string()),
            ("name".to_string(), "ann".to_string()),
        ];
        assert_eq!(
            insert("users", &types, &pairs),
            "INSERT INTO users (id, name) VALUES (1, 'ann')"
        );
        assert_eq!(
            update("users", &types, "id", "1", &pairs[1..]),
            "UPDATE users SET name='ann' WHERE id=1"
        );
        assert_eq!(delete("users", &types, "id", "1"), "DELETE FROM users WHERE id=1");
    }
}
