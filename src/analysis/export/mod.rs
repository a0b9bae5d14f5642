//! Table writers, one per output format.
//!
//! The format → writer mapping is a plain match; a format whose backing
//! library is compiled out is not offered on the command line at all.

mod columnar;
mod delimited;
mod json;
mod stata;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::table::Table;

pub use self::columnar::record_batch;
pub use self::stata::sanitize_name;

/// Errors raised while writing a report file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Stata export: {0}")]
    Stata(String),

    #[error("format '{0}' is not available in this build")]
    Unavailable(&'static str),
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Output formats of the report command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Arrow IPC file
    #[cfg_attr(not(feature = "feather"), value(skip))]
    Feather,
    /// JSON in split orientation (columns, index, data)
    Json,
    /// Stata 114 dataset
    Stata,
    /// Snappy-compressed Parquet
    Parquet,
}

/// Signature shared by all writers.
pub type WriterFn = fn(&Table, &Path) -> Result<(), ExportError>;

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Feather => "feather",
            ExportFormat::Json => "json",
            ExportFormat::Stata => "stata",
            ExportFormat::Parquet => "parquet",
        }
    }

    /// File suffix, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Feather => "feather",
            ExportFormat::Json => "json",
            ExportFormat::Stata => "dta",
            ExportFormat::Parquet => "parquet",
        }
    }

    /// Whether this build can write the format.
    pub fn available(self) -> bool {
        match self {
            ExportFormat::Feather => cfg!(feature = "feather"),
            _ => true,
        }
    }

    /// Formats this build can write.
    pub fn available_formats() -> Vec<ExportFormat> {
        Self::value_variants()
            .iter()
            .copied()
            .filter(|f| f.available())
            .collect()
    }

    /// `stem` plus the format suffix.
    pub fn output_path(self, stem: &Path) -> PathBuf {
        let mut name = stem.as_os_str().to_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }

    pub fn writer(self) -> Result<WriterFn, ExportError> {
        if !self.available() {
            return Err(ExportError::Unavailable(self.name()));
        }
        let writer: WriterFn = match self {
            ExportFormat::Csv => delimited::write_csv,
            ExportFormat::Feather => columnar::write_feather,
            ExportFormat::Json => json::write_json,
            ExportFormat::Stata => stata::write_stata,
            ExportFormat::Parquet => columnar::write_parquet,
        };
        Ok(writer)
    }
}

/// Write `table` to `stem.<suffix>` and return the path written.
pub fn export(table: &Table, format: ExportFormat, stem: &Path) -> Result<PathBuf, ExportError> {
    let writer = format.writer()?;
    let path = format.output_path(stem);
    writer(table, &path)?;
    info!(
        path = %path.display(),
        format = format.name(),
        rows = table.len(),
        columns = table.columns.len() + 1,
        "Report written"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_suffix() {
        let stem = Path::new("/tmp/facts");
        assert_eq!(
            ExportFormat::Csv.output_path(stem),
            PathBuf::from("/tmp/facts.csv")
        );
        assert_eq!(
            ExportFormat::Stata.output_path(Path::new("power.v1")),
            PathBuf::from("power.v1.dta")
        );
    }

    #[test]
    fn test_available_formats() {
        let formats = ExportFormat::available_formats();
        assert!(formats.contains(&ExportFormat::Csv));
        assert!(formats.contains(&ExportFormat::Parquet));
        assert_eq!(
            formats.contains(&ExportFormat::Feather),
            cfg!(feature = "feather")
        );
    }
}
