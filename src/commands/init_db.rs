//! init-db command: create the tables a collector appends to.

use std::path::PathBuf;

use clusterwatch::collectors::Family;
use clusterwatch::store::FactStore;

use crate::config::Config;

pub fn command_init_db(
    family: Family,
    db: Option<PathBuf>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db.unwrap_or_else(|| config.db_for(family));
    let store = FactStore::open(&db)?;
    store.ensure_schema(family)?;
    store.close()?;

    println!(
        "✅ {} store ready: {} (tables: {})",
        family.name(),
        db.display(),
        family.tables().join(", ")
    );
    Ok(())
}
