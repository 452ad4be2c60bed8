// src/db/schema.rs

//! Catalog schema definition
//!
//! Two tables: `packages` (one row per installed package, serialized
//! version and dependency strings) and `files` (one row per owned path).
//! The UNIQUE constraint on `files.path` is the sole cross-package
//! file-conflict mechanism. Version 1 is the only schema; the
//! `schema_version` table pins it in-band.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Bring the catalog schema up to `SCHEMA_VERSION`. Called on every open:
/// a fresh file gets the whole schema, an up-to-date one is left alone.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    while let Some(pending) = next_migration(conn)? {
        debug!("applying catalog migration {}", pending);
        match pending {
            1 => migrate_v1(conn)?,
            other => panic!("no migration registered for version {}", other),
        }
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [pending],
        )?;
        info!("catalog schema now at version {}", pending);
    }

    Ok(())
}

/// The next migration to apply, or `None` once the catalog is current.
fn next_migration(conn: &Connection) -> Result<Option<i32>> {
    let applied = current_version(conn)?;
    if applied < SCHEMA_VERSION {
        Ok(Some(applied + 1))
    } else {
        Ok(None)
    }
}

/// Highest migration recorded in the catalog; 0 for a fresh file. The
/// tracking table must already exist (`migrate` creates it).
pub fn current_version(conn: &Connection) -> Result<i32> {
    // MAX over an empty table yields one NULL row.
    let highest: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(highest.unwrap_or(0))
}

/// Initial schema - Version 1
///
/// - packages: installed package manifests, name is the primary key so a
///   package can never be cataloged twice
/// - files: owned paths; regular files carry a 32-hex MD5 digest,
///   directories an empty hash
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE packages (
            name TEXT NOT NULL PRIMARY KEY,
            version TEXT NOT NULL,
            maintainer TEXT NOT NULL,
            deps TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            hash TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK(kind IN ('file', 'dir')),
            mode INTEGER,
            FOREIGN KEY (owner) REFERENCES packages(name) ON DELETE CASCADE
        );

        CREATE INDEX idx_files_owner ON files(owner);
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_migrate_records_current_version() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);

        // Every applied migration leaves a row behind.
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, SCHEMA_VERSION as i64);
    }

    #[test]
    fn test_migrate_creates_all_tables() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"packages".to_string()));
        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, SCHEMA_VERSION as i64);
    }

    #[test]
    fn test_path_unique_constraint() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO packages (name, version, maintainer) VALUES ('a', '1', 'me')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO packages (name, version, maintainer) VALUES ('b', '1', 'me')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO files (owner, hash, path, kind) VALUES ('a', 'aa', 'shared', 'file')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO files (owner, hash, path, kind) VALUES ('b', 'bb', 'shared', 'file')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_owner_foreign_key() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        // A file row needs an existing package row behind it.
        let result = conn.execute(
            "INSERT INTO files (owner, hash, path, kind) VALUES ('ghost', 'aa', 'f', 'file')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_package_cascades_to_files() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO packages (name, version, maintainer) VALUES ('a', '1', 'me')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO files (owner, hash, path, kind) VALUES ('a', 'aa', 'f', 'file')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM packages WHERE name = 'a'", [])
            .unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
