// src/db/mod.rs

//! Catalog persistence layer
//!
//! A single SQLite file holds the two catalog tables. `open` is
//! idempotent: it creates the file, parent directories, and schema when
//! absent. `transaction` wraps one batch of catalog mutations; any error
//! out of the closure rolls everything back.

pub mod models;
pub mod schema;

use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::error::Result;

/// Open the catalog at the given path, creating it (and its parent
/// directories and schema) when absent.
pub fn open(db_path: &Path) -> Result<Connection> {
    debug!("opening catalog at {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;

    Ok(conn)
}

/// Run a closure inside a transaction. Commits on `Ok`, rolls back on
/// `Err`; an early exit between begin and commit leaves the catalog
/// untouched.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            tx.rollback()?;
            Err(e)
        }
    }
}
