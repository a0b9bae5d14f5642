//! SQLite fact store used by the collectors (append) and the report (read).
//!
//! The collectors never create tables; `ensure_schema` exists for the
//! `init-db` command and for tests. Each poll cycle is written inside one
//! transaction, so durability granularity is one commit per cycle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::collectors::Family;
use crate::reading::{AirRow, Batch, LoadSample, Reading};

/// DDL for the per-reading fact table.
pub const FACTS_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS facts (
    t       INTEGER NOT NULL,
    node    INTEGER NOT NULL,
    point   VARCHAR(4) NOT NULL,
    value   REAL NOT NULL
);
";

/// DDL for paired air temperatures.
pub const AIR_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS air (
    t       INTEGER NOT NULL,
    node    INTEGER NOT NULL,
    air_in  REAL,
    air_out REAL
);
";

/// DDL for load averages.
pub const LOAD_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS w_facts (
    t               INTEGER NOT NULL,
    one_minute      REAL,
    five_minutes    REAL,
    fifteen_minutes REAL
);
";

const INSERT_FACT: &str = "INSERT INTO facts (t, node, point, value) VALUES (?1, ?2, ?3, ?4)";
const INSERT_AIR: &str = "INSERT INTO air (t, node, air_in, air_out) VALUES (?1, ?2, ?3, ?4)";
const INSERT_LOAD: &str =
    "INSERT INTO w_facts (t, one_minute, five_minutes, fifteen_minutes) VALUES (?1, ?2, ?3, ?4)";

/// Errors from [`FactStore`] and [`SharedStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store is already closed")]
    Closed,

    #[error("store lock poisoned by a panicking writer")]
    Poisoned,
}

/// An open SQLite database holding one collector family's tables.
pub struct FactStore {
    conn: Connection,
    path: PathBuf,
}

impl FactStore {
    /// Open (or create) a store for appending.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Fact store opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store without write access.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        debug!(path = %path.display(), "Fact store opened read-only");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the tables a collector family writes to.
    pub fn ensure_schema(&self, family: Family) -> Result<(), StoreError> {
        match family {
            Family::Power => self.conn.execute_batch(FACTS_SCHEMA)?,
            Family::Heat => {
                self.conn.execute_batch(FACTS_SCHEMA)?;
                self.conn.execute_batch(AIR_SCHEMA)?;
            }
            Family::Load => self.conn.execute_batch(LOAD_SCHEMA)?,
        }
        info!(path = %self.path.display(), family = ?family, "Schema ensured");
        Ok(())
    }

    /// Whether a table exists in the store.
    pub fn has_table(&self, name: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert every row of a batch and commit once. Returns the row count.
    pub fn write_batch(&mut self, batch: &Batch) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        match batch {
            Batch::Facts(facts) => insert_facts(&tx, facts)?,
            Batch::Thermal { facts, air } => {
                insert_facts(&tx, facts)?;
                insert_air(&tx, air)?;
            }
            Batch::Load(sample) => insert_load(&tx, sample)?,
        }
        tx.commit()?;
        Ok(batch.row_count())
    }

    /// Number of rows in the fact table.
    pub fn fact_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<(), StoreError> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        debug!(path = %path.display(), "Fact store closed");
        Ok(())
    }
}

impl std::fmt::Debug for FactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn insert_facts(conn: &Connection, facts: &[Reading]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(INSERT_FACT)?;
    for r in facts {
        stmt.execute(params![r.t, r.node, r.point, r.value])?;
    }
    Ok(())
}

fn insert_air(conn: &Connection, rows: &[AirRow]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(INSERT_AIR)?;
    for r in rows {
        stmt.execute(params![r.t, r.node, r.air_in, r.air_out])?;
    }
    Ok(())
}

fn insert_load(conn: &Connection, s: &LoadSample) -> Result<(), StoreError> {
    conn.execute(
        INSERT_LOAD,
        params![s.t, s.one_minute, s.five_minutes, s.fifteen_minutes],
    )?;
    Ok(())
}

/// Store handle shared between the sampler loop and the shutdown path.
///
/// All access goes through one mutex, so closing waits for an in-flight
/// batch to commit and a batch can never start on a closed connection.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Option<FactStore>>>,
}

impl SharedStore {
    pub fn new(store: FactStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(store))),
        }
    }

    /// Run `f` against the open store while holding the lock.
    pub fn with_store<R>(
        &self,
        f: impl FnOnce(&mut FactStore) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        match guard.as_mut() {
            Some(store) => f(store),
            None => Err(StoreError::Closed),
        }
    }

    pub fn write_batch(&self, batch: &Batch) -> Result<usize, StoreError> {
        self.with_store(|store| store.write_batch(batch))
    }

    /// Close the store. Closing an already closed store is a no-op.
    pub fn close(&self) -> Result<(), StoreError> {
        let taken = {
            let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
            guard.take()
        };
        match taken {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|g| g.is_none()).unwrap_or(true)
    }
}
