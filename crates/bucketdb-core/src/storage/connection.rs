//! Opening a configured SQLite connection.

use std::fs;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::{Location, RepositoryConfig};
use crate::error::{Error, StorageError};

/// Open the connection described by `config` and apply its pragmas.
pub fn open(config: &RepositoryConfig) -> Result<Connection, Error> {
    let conn = match &config.location {
        Location::Memory => Connection::open_in_memory()?,
        Location::File(path) => {
            if config.create_parent_dirs {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(StorageError::Io)?;
                }
            }
            Connection::open(path)?
        }
    };

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;

    if let Location::File(path) = &config.location {
        let wanted = config.journal_mode.pragma_value();
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", wanted, |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case(wanted) {
            warn!(db = %path.display(), wanted, actual = %mode, "journal mode not applied");
        }
    }

    debug!(sync = config.sync_mode.pragma_value(), "connection configured");
    Ok(conn)
}
