use std::path::Path;

use chrono::DateTime;

use crate::analysis::export::{io_error, ExportError};
use crate::analysis::table::{ColumnData, Index, Table};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(super) fn write_csv(table: &Table, path: &Path) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec![table.index_name.as_str()];
    header.extend(table.column_names());
    wtr.write_record(&header)?;

    for row in 0..table.len() {
        let mut record = Vec::with_capacity(table.columns.len() + 1);
        record.push(match &table.index {
            Index::Timestamp(ts) => format_datetime(ts[row]),
            Index::Range(_) => row.to_string(),
        });
        for column in &table.columns {
            record.push(format_cell(&column.data, row));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(io_error(path))?;
    Ok(())
}

/// Cell text; absent cells are empty.
fn format_cell(data: &ColumnData, row: usize) -> String {
    match data {
        ColumnData::Timestamp(v) => format_datetime(v[row]),
        ColumnData::Int(v) => v[row].map(|i| i.to_string()).unwrap_or_default(),
        ColumnData::Float(v) => v[row].map(format_float).unwrap_or_default(),
        ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
    }
}

pub(super) fn format_datetime(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Integral values keep one decimal so the column reads back as float.
pub(super) fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}
