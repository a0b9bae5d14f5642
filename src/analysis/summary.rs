//! Descriptive statistics of the numeric report columns.

use std::fmt::Write as FmtWrite;

use crate::analysis::table::Table;

/// count/mean/std/min/max of one column, over present cells only.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); needs two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns
        .iter()
        .filter_map(|c| Some((c.name.clone(), c.data.numeric()?)))
        .map(|(column, values)| describe(column, &values))
        .collect()
}

fn describe(column: String, values: &[Option<f64>]) -> ColumnSummary {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let count = present.len();
    if count == 0 {
        return ColumnSummary {
            column,
            count,
            mean: None,
            std: None,
            min: None,
            max: None,
        };
    }

    let mean = present.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    ColumnSummary {
        column,
        count,
        mean: Some(mean),
        std,
        min: Some(min),
        max: Some(max),
    }
}

/// Plain-text rendering, one column per line.
pub fn render(summaries: &[ColumnSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.column.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{:.2}", x));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>8} {:>12} {:>12} {:>12} {:>12}",
        "column", "count", "mean", "std", "min", "max"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<width$} {:>8} {:>12} {:>12} {:>12} {:>12}",
            s.column,
            s.count,
            cell(s.mean),
            cell(s.std),
            cell(s.min),
            cell(s.max)
        );
    }
    out
}
