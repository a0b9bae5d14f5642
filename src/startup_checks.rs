//! Startup requirement validation for the collectors.
//!
//! The collectors never create tables, so a store without its schema is
//! reported here instead of failing on the first insert.

use std::path::Path;

use tracing::{debug, error, info};

use clusterwatch::collectors::{CommandTemplate, Family};
use clusterwatch::store::FactStore;
use clusterwatch::sysexits;

/// Check that a command's program can be found on `PATH`.
pub fn check_command(command: &CommandTemplate) -> Result<(), ValidationError> {
    match command.resolve() {
        Some(path) => {
            debug!(program = command.program(), path = %path.display(), "Command resolved");
            Ok(())
        }
        None => {
            error!("❌ '{}' not found on PATH", command.program());
            Err(ValidationError::CommandNotFound(command.program().to_string()))
        }
    }
}

/// Check that `db` exists and holds every table `family` appends to.
pub fn check_store(db: &Path, family: Family) -> Result<(), ValidationError> {
    if !db.exists() {
        error!("❌ Store {} does not exist", db.display());
        error!("   Solution: clusterwatch init-db {} --db {}", family.name(), db.display());
        return Err(ValidationError::StoreMissing(db.display().to_string()));
    }

    let store = FactStore::open_read_only(db)
        .map_err(|e| ValidationError::StoreUnreadable(format!("{}: {}", db.display(), e)))?;
    for table in family.tables() {
        let present = store
            .has_table(table)
            .map_err(|e| ValidationError::StoreUnreadable(format!("{}: {}", db.display(), e)))?;
        if !present {
            error!("❌ Store {} has no '{}' table", db.display(), table);
            error!("   Solution: clusterwatch init-db {} --db {}", family.name(), db.display());
            return Err(ValidationError::TableMissing {
                db: db.display().to_string(),
                table: (*table).to_string(),
            });
        }
    }
    Ok(())
}

/// Validate everything a collector needs before its first cycle.
pub fn validate_requirements(
    family: Family,
    db: &Path,
    commands: &[&CommandTemplate],
) -> Result<(), ValidationError> {
    info!(family = family.name(), "🔍 Validating runtime requirements...");

    for command in commands {
        check_command(command)?;
    }
    check_store(db, family)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("command '{0}' not found on PATH")]
    CommandNotFound(String),

    #[error("store {0} does not exist")]
    StoreMissing(String),

    #[error("store {db} has no '{table}' table")]
    TableMissing { db: String, table: String },

    #[error("store unreadable: {0}")]
    StoreUnreadable(String),
}

impl ValidationError {
    /// Process exit status for a failed check.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidationError::CommandNotFound(_) => sysexits::EX_UNAVAILABLE,
            ValidationError::StoreMissing(_) | ValidationError::StoreUnreadable(_) => {
                sysexits::EX_IOERR
            }
            ValidationError::TableMissing { .. } => sysexits::EX_DATAERR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_store_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_store(&dir.path().join("none.db"), Family::Power).unwrap_err();
        assert!(matches!(err, ValidationError::StoreMissing(_)));
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn test_store_without_air_table() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("temps.db");
        let store = FactStore::open(&db).unwrap();
        store.ensure_schema(Family::Power).unwrap();
        store.close().unwrap();

        assert!(check_store(&db, Family::Power).is_ok());
        assert!(matches!(
            check_store(&db, Family::Heat),
            Err(ValidationError::TableMissing { .. })
        ));
    }

    #[test]
    fn test_check_command() {
        let sh = CommandTemplate::from_argv(&["sh"]).unwrap();
        assert!(check_command(&sh).is_ok());
        let missing = CommandTemplate::from_argv(&["clusterwatch-no-such-tool"]).unwrap();
        assert!(matches!(
            check_command(&missing),
            Err(ValidationError::CommandNotFound(_))
        ));
    }
}
