// src/db/models.rs

//! Row types for the catalog tables
//!
//! `CatalogPackage` and `CatalogFile` mirror the two tables and carry the
//! CRUD the coordinators need. Version and dependency strings are stored
//! serialized and parsed on read.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::version::{parse_deps, Dependency, Version};

/// Whether a catalog row tracks a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
}

impl FileKind {
    pub fn as_str(&self) -> &str {
        match self {
            FileKind::File => "file",
            FileKind::Dir => "dir",
        }
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "file" => Ok(FileKind::File),
            "dir" => Ok(FileKind::Dir),
            _ => Err(format!("Invalid file kind: {}", s)),
        }
    }
}

/// One installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPackage {
    pub name: String,
    pub version: String,
    pub maintainer: String,
    pub deps: String,
}

impl CatalogPackage {
    /// Insert this package into the catalog
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO packages (name, version, maintainer, deps)
             VALUES (?1, ?2, ?3, ?4)",
            params![&self.name, &self.version, &self.maintainer, &self.deps],
        )?;
        Ok(())
    }

    /// Look up a package by exact name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, maintainer, deps FROM packages WHERE name = ?1",
        )?;

        let package = stmt.query_row([name], Self::from_row).optional()?;

        Ok(package)
    }

    /// List packages whose name matches an SQL LIKE pattern
    pub fn list(conn: &Connection, pattern: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, maintainer, deps FROM packages
             WHERE name LIKE ?1 ORDER BY name",
        )?;

        let packages = stmt
            .query_map([pattern], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// List every installed package
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        Self::list(conn, "%")
    }

    /// Delete a package row; its file rows go with it (ON DELETE CASCADE),
    /// so one statement removes the whole package atomically.
    pub fn delete(conn: &Connection, name: &str) -> Result<()> {
        conn.execute("DELETE FROM packages WHERE name = ?1", [name])?;
        Ok(())
    }

    /// Parsed form of the stored version string
    pub fn parsed_version(&self) -> Result<Version> {
        Version::parse(&self.version)
    }

    /// Parsed form of the stored dependency string
    pub fn parsed_deps(&self) -> Result<Vec<Dependency>> {
        parse_deps(&self.deps)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            version: row.get(1)?,
            maintainer: row.get(2)?,
            deps: row.get(3)?,
        })
    }
}

/// One owned path. Regular files carry a 32-hex MD5 digest; directories an
/// empty hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFile {
    pub owner: String,
    pub hash: String,
    pub path: String,
    pub kind: FileKind,
    pub mode: Option<u32>,
}

impl CatalogFile {
    /// Insert this file row. A UNIQUE violation on `path` surfaces as
    /// `Error::PathConflict` for the install coordinator to handle.
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        let result = conn.execute(
            "INSERT INTO files (owner, hash, path, kind, mode)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.owner,
                &self.hash,
                &self.path,
                self.kind.as_str(),
                self.mode.map(|m| m as i64),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::PathConflict(self.path.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Which package owns a path, if any
    pub fn owner_of(conn: &Connection, path: &str) -> Result<Option<String>> {
        let owner = conn
            .query_row("SELECT owner FROM files WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(owner)
    }

    /// All file rows owned by a package
    pub fn find_by_owner(conn: &Connection, owner: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT owner, hash, path, kind, mode FROM files
             WHERE owner = ?1 ORDER BY path",
        )?;

        let files = stmt
            .query_map([owner], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind_str: String = row.get(3)?;
        let kind = kind_str.parse::<FileKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        let mode: Option<i64> = row.get(4)?;

        Ok(Self {
            owner: row.get(0)?,
            hash: row.get(1)?,
            path: row.get(2)?,
            kind,
            mode: mode.map(|m| m as u32),
        })
    }
}

/// UNIQUE and PRIMARY KEY violations, as raised by the path and name
/// constraints.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn test_catalog() -> (TempDir, Connection) {
        let dir = TempDir::new().unwrap();
        let conn = db::open(&dir.path().join("catalog.db")).unwrap();
        (dir, conn)
    }

    fn sample_package(name: &str, deps: &str) -> CatalogPackage {
        CatalogPackage {
            name: name.to_string(),
            version: "1.0".to_string(),
            maintainer: "test".to_string(),
            deps: deps.to_string(),
        }
    }

    #[test]
    fn test_package_round_trip() {
        let (_dir, conn) = test_catalog();

        sample_package("nginx", "pcre zlib>=1.2").insert(&conn).unwrap();

        let found = CatalogPackage::find_by_name(&conn, "nginx").unwrap().unwrap();
        assert_eq!(found.version, "1.0");
        assert_eq!(found.maintainer, "test");
        assert_eq!(found.parsed_deps().unwrap().len(), 2);
        assert_eq!(
            found.parsed_version().unwrap(),
            Version::parse("1.0").unwrap()
        );

        assert!(CatalogPackage::find_by_name(&conn, "absent").unwrap().is_none());
    }

    #[test]
    fn test_package_name_is_unique() {
        let (_dir, conn) = test_catalog();

        sample_package("dup", "").insert(&conn).unwrap();
        assert!(sample_package("dup", "").insert(&conn).is_err());
    }

    #[test]
    fn test_list_with_like_pattern() {
        let (_dir, conn) = test_catalog();

        for name in ["testpkg", "testpkgtwo", "other"] {
            sample_package(name, "").insert(&conn).unwrap();
        }

        let matched = CatalogPackage::list(&conn, "test%").unwrap();
        let names: Vec<_> = matched.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["testpkg", "testpkgtwo"]);

        assert_eq!(CatalogPackage::list_all(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_file_insert_and_owner_lookup() {
        let (_dir, conn) = test_catalog();

        sample_package("a", "").insert(&conn).unwrap();
        let row = CatalogFile {
            owner: "a".to_string(),
            hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            path: "etc/a.conf".to_string(),
            kind: FileKind::File,
            mode: Some(0o644),
        };
        row.insert(&conn).unwrap();

        assert_eq!(
            CatalogFile::owner_of(&conn, "etc/a.conf").unwrap(),
            Some("a".to_string())
        );
        assert_eq!(CatalogFile::owner_of(&conn, "etc/other").unwrap(), None);

        let files = CatalogFile::find_by_owner(&conn, "a").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].kind, FileKind::File);
        assert_eq!(files[0].mode, Some(0o644));
    }

    #[test]
    fn test_duplicate_path_is_path_conflict() {
        let (_dir, conn) = test_catalog();

        sample_package("a", "").insert(&conn).unwrap();
        sample_package("b", "").insert(&conn).unwrap();

        let mine = CatalogFile {
            owner: "a".to_string(),
            hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            path: "shared".to_string(),
            kind: FileKind::File,
            mode: None,
        };
        mine.insert(&conn).unwrap();

        let theirs = CatalogFile {
            owner: "b".to_string(),
            ..mine.clone()
        };
        match theirs.insert(&conn) {
            Err(Error::PathConflict(path)) => assert_eq!(path, "shared"),
            other => panic!("expected PathConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_removes_file_rows() {
        let (_dir, conn) = test_catalog();

        sample_package("a", "").insert(&conn).unwrap();
        CatalogFile {
            owner: "a".to_string(),
            hash: String::new(),
            path: "dir".to_string(),
            kind: FileKind::Dir,
            mode: None,
        }
        .insert(&conn)
        .unwrap();

        CatalogPackage::delete(&conn, "a").unwrap();

        assert!(CatalogPackage::find_by_name(&conn, "a").unwrap().is_none());
        assert!(CatalogFile::find_by_owner(&conn, "a").unwrap().is_empty());
        assert_eq!(CatalogFile::owner_of(&conn, "dir").unwrap(), None);
    }
}
