//! Arrow-backed writers: Arrow IPC ("feather") and Parquet.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::analysis::export::{io_error, ExportError};
use crate::analysis::table::{ColumnData, Index, Table};

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, None)
}

fn timestamps(secs: &[i64]) -> ArrayRef {
    let mut builder = TimestampMillisecondBuilder::with_capacity(secs.len());
    for s in secs {
        builder.append_value(s * 1000);
    }
    Arc::new(builder.finish())
}

/// One record batch holding the index as its first column.
pub fn record_batch(table: &Table) -> Result<RecordBatch, ExportError> {
    let mut fields = Vec::with_capacity(table.columns.len() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len() + 1);

    match &table.index {
        Index::Timestamp(ts) => {
            fields.push(Field::new(&table.index_name, timestamp_type(), false));
            arrays.push(timestamps(ts));
        }
        Index::Range(n) => {
            let mut builder = Int64Builder::with_capacity(*n);
            for i in 0..*n {
                builder.append_value(i as i64);
            }
            fields.push(Field::new(&table.index_name, DataType::Int64, false));
            arrays.push(Arc::new(builder.finish()));
        }
    }

    for column in &table.columns {
        let (data_type, array): (DataType, ArrayRef) = match &column.data {
            ColumnData::Timestamp(v) => (timestamp_type(), timestamps(v)),
            ColumnData::Int(v) => {
                let mut builder = Int64Builder::with_capacity(v.len());
                for x in v {
                    builder.append_option(*x);
                }
                (DataType::Int64, Arc::new(builder.finish()))
            }
            ColumnData::Float(v) => {
                let mut builder = Float64Builder::with_capacity(v.len());
                for x in v {
                    builder.append_option(*x);
                }
                (DataType::Float64, Arc::new(builder.finish()))
            }
            ColumnData::Text(v) => {
                let mut builder = StringBuilder::with_capacity(v.len(), v.len() * 8);
                for x in v {
                    builder.append_option(x.as_deref());
                }
                (DataType::Utf8, Arc::new(builder.finish()))
            }
        };
        fields.push(Field::new(&column.name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, arrays)?)
}

#[cfg(feature = "feather")]
pub(super) fn write_feather(table: &Table, path: &Path) -> Result<(), ExportError> {
    use arrow::ipc::writer::FileWriter;

    let batch = record_batch(table)?;
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = FileWriter::try_new(file, &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

#[cfg(not(feature = "feather"))]
pub(super) fn write_feather(_table: &Table, _path: &Path) -> Result<(), ExportError> {
    Err(ExportError::Unavailable("feather"))
}

pub(super) fn write_parquet(table: &Table, path: &Path) -> Result<(), ExportError> {
    let batch = record_batch(table)?;
    let file = File::create(path).map_err(io_error(path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
