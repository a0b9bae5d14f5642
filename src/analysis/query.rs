//! Parameterized queries against the fact table.

use rusqlite::types::Value;
use tracing::debug;

use crate::reading::{Point, Reading};
use crate::store::{FactStore, StoreError};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Which nodes a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeFilter {
    #[default]
    All,
    Only(Vec<u32>),
}

/// Typed filter over the fact table; never built from free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FactQuery {
    /// Only rows with `t` strictly after this epoch second.
    pub since: Option<i64>,
    pub nodes: NodeFilter,
    pub point: Option<Point>,
}

impl FactQuery {
    /// Everything in the table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Start of a window of `days` 24-hour periods ending at `now`; 0 means all history.
    pub fn window_start(days: u32, now: i64) -> Option<i64> {
        (days > 0).then(|| now - i64::from(days) * SECONDS_PER_DAY)
    }

    /// SQL text and its bound parameters.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(since) = self.since {
            clauses.push("t > ?".to_string());
            params.push(Value::Integer(since));
        }
        if let NodeFilter::Only(nodes) = &self.nodes {
            if nodes.is_empty() {
                clauses.push("0 = 1".to_string());
            } else {
                let marks = vec!["?"; nodes.len()].join(", ");
                clauses.push(format!("node IN ({})", marks));
                params.extend(nodes.iter().map(|n| Value::Integer(i64::from(*n))));
            }
        }
        if let Some(point) = self.point {
            clauses.push("point = ?".to_string());
            params.push(Value::Text(point.code().to_string()));
        }

        let mut sql = String::from("SELECT t, node, point, value FROM facts");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY t ASC, node ASC");
        (sql, params)
    }

    /// Run the query, returning readings ordered by `(t, node)`.
    pub fn fetch(&self, store: &FactStore) -> Result<Vec<Reading>, StoreError> {
        let (sql, params) = self.to_sql();
        debug!(sql = %sql, params = params.len(), "Querying facts");

        let mut stmt = store.connection().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok(Reading {
                t: row.get(0)?,
                node: row.get(1)?,
                point: row.get(2)?,
                value: row.get(3)?,
            })
        })?;
        let readings = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(rows = readings.len(), "Facts read");
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_no_where_clause() {
        let (sql, params) = FactQuery::all().to_sql();
        assert_eq!(sql, "SELECT t, node, point, value FROM facts ORDER BY t ASC, node ASC");
        assert!(params.is_empty());
    }

    #[test]
    fn test_clauses_are_parameterized() {
        let q = FactQuery {
            since: Some(1000),
            nodes: NodeFilter::Only(vec![1, 50]),
            point: Some(Point::Total),
        };
        let (sql, params) = q.to_sql();
        assert_eq!(
            sql,
            "SELECT t, node, point, value FROM facts \
             WHERE t > ? AND node IN (?, ?) AND point = ? ORDER BY t ASC, node ASC"
        );
        assert_eq!(
            params,
            vec![
                Value::Integer(1000),
                Value::Integer(1),
                Value::Integer(50),
                Value::Text("t".into())
            ]
        );
    }

    #[test]
    fn test_window_start() {
        assert_eq!(FactQuery::window_start(0, 200_000), None);
        assert_eq!(FactQuery::window_start(1, 200_000), Some(200_000 - 86_400));
        assert_eq!(FactQuery::window_start(2, 200_000), Some(200_000 - 172_800));
    }
}
