//! clusterwatch library
//!
//! Polling collectors that turn a cluster's power, temperature and load
//! telemetry into rows of a sqlite fact store, plus the report pipeline that
//! reads those rows back, reshapes them and exports a table.
//!
//! # Usage
//!
//! ```rust
//! use clusterwatch::analysis::{reshape, ReshapeOptions, TareTable};
//! use clusterwatch::reading::{Point, Reading};
//!
//! let rows = vec![
//!     Reading::new(100, 1, "t", 500.0),
//!     Reading::new(100, 2, "t", 600.0),
//! ];
//! let opts = ReshapeOptions { pivot: true, cluster_total: true, ..Default::default() };
//! let table = reshape(&rows, &[1, 2], Some(Point::Total), &opts, &TareTable::builtin()).unwrap();
//! assert_eq!(table.column_names(), vec!["1", "2", "cluster"]);
//! ```
//!
//! # Feature Flags
//!
//! - `feather` (default): Arrow IPC file export.

pub mod analysis;
pub mod collectors;
pub mod error;
pub mod reading;
pub mod sampler;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod sysexits;

pub use error::{CollectError, FetchError};
