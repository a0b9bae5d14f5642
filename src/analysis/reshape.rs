//! Long-form fact rows → report table.
//!
//! With a point filter, the pivot flag and more than one node, readings are
//! spread into one column per node indexed by timestamp, then optionally
//! tared, totalled and expressed as a percentage of rated capacity (in that
//! order). Otherwise the rows stay in long form and only the point codes are
//! expanded to words.

use ahash::AHashMap as HashMap;
use tracing::debug;

use crate::analysis::table::{Column, ColumnData, Index, Table};
use crate::analysis::tare::TareTable;
use crate::analysis::ReshapeError;
use crate::reading::{Point, Reading};

/// Name of the cluster-total column.
pub const CLUSTER_COLUMN: &str = "cluster";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReshapeOptions {
    pub pivot: bool,
    /// Subtract each node's idle baseline, clipping at zero.
    pub bias: bool,
    /// Append a column with the sum across nodes.
    pub cluster_total: bool,
    /// Divide by half the summed ceilings (percent of capacity).
    pub percent: bool,
}

/// Whether [`reshape`] produces the wide form for these arguments.
pub fn will_pivot(point: Option<Point>, opts: &ReshapeOptions, nodes: &[u32]) -> bool {
    point.is_some() && opts.pivot && nodes.len() > 1
}

pub fn reshape(
    rows: &[Reading],
    nodes: &[u32],
    point: Option<Point>,
    opts: &ReshapeOptions,
    tare: &TareTable,
) -> Result<Table, ReshapeError> {
    if will_pivot(point, opts, nodes) {
        pivot(rows, nodes, opts, tare)
    } else {
        Ok(long_form(rows))
    }
}

/// `c → cpu`, then `m → mem`, then `t → total`, each as a plain substring
/// replacement over the whole code.
pub fn expand_point(code: &str) -> String {
    code.replace('c', "cpu")
        .replace('m', "mem")
        .replace('t', "total")
}

fn long_form(rows: &[Reading]) -> Table {
    let columns = vec![
        Column::new("t", ColumnData::Timestamp(rows.iter().map(|r| r.t).collect())),
        Column::new(
            "node",
            ColumnData::Int(rows.iter().map(|r| Some(i64::from(r.node))).collect()),
        ),
        Column::new(
            "point",
            ColumnData::Text(rows.iter().map(|r| Some(expand_point(&r.point))).collect()),
        ),
        Column::new(
            "value",
            ColumnData::Float(rows.iter().map(|r| Some(r.value)).collect()),
        ),
    ];
    Table::new(Index::Range(rows.len()), columns)
}

fn pivot(
    rows: &[Reading],
    nodes: &[u32],
    opts: &ReshapeOptions,
    tare: &TareTable,
) -> Result<Table, ReshapeError> {
    let position: HashMap<u32, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut index: Vec<i64> = rows
        .iter()
        .filter(|r| position.contains_key(&r.node))
        .map(|r| r.t)
        .collect();
    index.sort_unstable();
    index.dedup();

    // A repeated (t, node) keeps the last reading.
    let mut cells: Vec<Vec<Option<f64>>> = vec![vec![None; index.len()]; nodes.len()];
    for r in rows {
        let Some(&col) = position.get(&r.node) else {
            continue;
        };
        if let Ok(row) = index.binary_search(&r.t) {
            cells[col][row] = Some(r.value);
        }
    }

    if opts.bias {
        for (col, node) in cells.iter_mut().zip(nodes) {
            let idle = tare.idle(*node);
            for v in col.iter_mut().flatten() {
                let tared = *v - idle;
                *v = if tared <= 0.0 { 0.0 } else { tared };
            }
        }
    }

    let mut columns: Vec<Column> = nodes
        .iter()
        .zip(cells)
        .map(|(node, data)| Column::new(node.to_string(), ColumnData::Float(data)))
        .collect();

    if opts.cluster_total {
        let totals: Vec<Option<f64>> = (0..index.len())
            .map(|row| {
                Some(
                    columns
                        .iter()
                        .filter_map(|c| match &c.data {
                            ColumnData::Float(v) => v[row],
                            _ => None,
                        })
                        .sum::<f64>(),
                )
            })
            .collect();
        columns.push(Column::new(CLUSTER_COLUMN, ColumnData::Float(totals)));
    }

    if opts.percent {
        let cluster_max = tare.cluster_max(nodes)?;
        let scale = cluster_max / 200.0;
        if scale <= 0.0 {
            return Err(ReshapeError::NonPositiveCeiling(cluster_max));
        }
        for column in &mut columns {
            if let ColumnData::Float(v) = &mut column.data {
                for x in v.iter_mut().flatten() {
                    *x /= scale;
                }
            }
        }
    }

    debug!(
        rows = index.len(),
        columns = columns.len(),
        bias = opts.bias,
        cluster = opts.cluster_total,
        percent = opts.percent,
        "Pivoted"
    );
    Ok(Table::new(Index::Timestamp(index), columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tare::TareEntry;

    fn tare() -> TareTable {
        TareTable::from_entries([
            TareEntry {
                node: 1,
                idle_watts: 115.0,
                max_watts: Some(600.0),
            },
            TareEntry {
                node: 2,
                idle_watts: 120.0,
                max_watts: Some(700.0),
            },
        ])
    }

    #[test]
    fn test_expand_point_is_substring_based() {
        assert_eq!(expand_point("c"), "cpu");
        assert_eq!(expand_point("m"), "mem");
        assert_eq!(expand_point("t"), "total");
        assert_eq!(expand_point("ai"), "ai");
        assert_eq!(expand_point("tc"), "totalcpu");
    }

    #[test]
    fn test_no_pivot_for_single_node() {
        let opts = ReshapeOptions {
            pivot: true,
            ..Default::default()
        };
        assert!(!will_pivot(Some(Point::Total), &opts, &[1]));
        assert!(!will_pivot(None, &opts, &[1, 2]));
        assert!(will_pivot(Some(Point::Total), &opts, &[1, 2]));
    }

    #[test]
    fn test_long_form_expands_codes() {
        let rows = vec![Reading::new(10, 1, "c", 1.0), Reading::new(10, 1, "m", 2.0)];
        let table = reshape(&rows, &[1], None, &ReshapeOptions::default(), &tare()).unwrap();
        assert_eq!(table.index, Index::Range(2));
        assert_eq!(
            table.column("point").unwrap().data,
            ColumnData::Text(vec![Some("cpu".into()), Some("mem".into())])
        );
    }

    #[test]
    fn test_missing_cells_stay_absent() {
        let rows = vec![
            Reading::new(100, 1, "t", 500.0),
            Reading::new(200, 2, "t", 100.0),
        ];
        let opts = ReshapeOptions {
            pivot: true,
            bias: true,
            ..Default::default()
        };
        let table = reshape(&rows, &[1, 2], Some(Point::Total), &opts, &tare()).unwrap();
        assert_eq!(table.index, Index::Timestamp(vec![100, 200]));
        assert_eq!(table.float_at("1", 0), Some(385.0));
        assert_eq!(table.float_at("1", 1), None);
        assert_eq!(table.float_at("2", 0), None);
        // 100 - 120 clips to zero.
        assert_eq!(table.float_at("2", 1), Some(0.0));
    }

    #[test]
    fn test_percent_without_ceiling_fails() {
        let rows = vec![Reading::new(1, 1, "t", 1.0), Reading::new(1, 3, "t", 1.0)];
        let opts = ReshapeOptions {
            pivot: true,
            percent: true,
            ..Default::default()
        };
        assert!(matches!(
            reshape(&rows, &[1, 3], Some(Point::Total), &opts, &tare()),
            Err(ReshapeError::MissingCeiling { node: 3 })
        ));
    }
}
