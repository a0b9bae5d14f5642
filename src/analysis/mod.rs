//! Report pipeline: read facts, reshape them, export the table.

pub mod export;
pub mod query;
pub mod reshape;
pub mod summary;
pub mod table;
pub mod tare;

pub use export::{export, ExportError, ExportFormat};
pub use query::{FactQuery, NodeFilter};
pub use reshape::{expand_point, reshape, will_pivot, ReshapeOptions, CLUSTER_COLUMN};
pub use summary::{summarize, ColumnSummary};
pub use table::{Column, ColumnData, Index, Table, INDEX_NAME};
pub use tare::{TareEntry, TareTable};

/// Errors from the reshaping step.
#[derive(Debug, thiserror::Error)]
pub enum ReshapeError {
    #[error("node {node} has no maximum power ceiling; percent needs one for every node")]
    MissingCeiling { node: u32 },

    #[error("summed power ceiling {0} is not positive")]
    NonPositiveCeiling(f64),
}
