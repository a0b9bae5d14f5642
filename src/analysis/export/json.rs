//! JSON in "split" orientation: `{"columns": [...], "index": [...], "data": [[...], ...]}`.
//!
//! Timestamps are epoch milliseconds; absent cells are `null`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::analysis::export::{io_error, ExportError};
use crate::analysis::table::{ColumnData, Index, Table};

#[derive(Serialize)]
struct Split<'a> {
    columns: Vec<&'a str>,
    index: Vec<Value>,
    data: Vec<Vec<Value>>,
}

fn split(table: &Table) -> Split<'_> {
    let index = match &table.index {
        Index::Timestamp(ts) => ts.iter().map(|t| Value::from(t * 1000)).collect(),
        Index::Range(n) => (0..*n).map(Value::from).collect(),
    };
    let data = (0..table.len())
        .map(|row| table.columns.iter().map(|c| cell(&c.data, row)).collect())
        .collect();
    Split {
        columns: table.column_names(),
        index,
        data,
    }
}

fn cell(data: &ColumnData, row: usize) -> Value {
    match data {
        ColumnData::Timestamp(v) => Value::from(v[row] * 1000),
        ColumnData::Int(v) => v[row].map_or(Value::Null, Value::from),
        // NaN and infinities have no JSON form and become null.
        ColumnData::Float(v) => v[row].map_or(Value::Null, Value::from),
        ColumnData::Text(v) => v[row].clone().map_or(Value::Null, Value::from),
    }
}

pub(super) fn write_json(table: &Table, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, &split(table))?;
    out.flush().map_err(io_error(path))?;
    Ok(())
}
