// src/remove.rs

//! Uninstall coordinator
//!
//! Removes packages: a dependency check over what would remain, an atomic
//! catalog delete per package, then hash-guarded file removal. A file
//! whose content drifted from the recorded digest is retained (or, under
//! the hard-remove policy, renamed to a backup) rather than destroyed.

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db;
use crate::db::models::{CatalogFile, CatalogPackage, FileKind};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::resolver;

/// Remove the named packages from the catalog and the installation root.
pub fn remove(
    conn: &mut Connection,
    config: &Config,
    names: &[String],
    root: &Path,
) -> Result<()> {
    // Absent targets are fatal unless the no-deps policy asks for a
    // best-effort run, in which case they are skipped.
    let mut targets = Vec::new();
    for name in names {
        if CatalogPackage::find_by_name(conn, name)?.is_some() {
            targets.push(name.clone());
        } else if config.no_deps {
            warn!("{} is not installed; skipping", name);
        } else {
            return Err(Error::NotInstalled(name.clone()));
        }
    }

    // Dependency check over the installed set minus the targets.
    let mut view = resolver::installed_view(conn)?;
    for name in &targets {
        view.remove(name);
    }
    let failures = resolver::check_all(&view);
    if !failures.is_empty() {
        for (offender, dep) in &failures {
            warn!("removal would break {}: requires {}", offender, dep);
        }
        if !config.no_deps {
            return Err(Error::UnmetDependencies(failures.len()));
        }
        warn!(
            "continuing despite {} unmet dependency(ies)",
            failures.len()
        );
    }

    for name in &targets {
        let files = CatalogFile::find_by_owner(conn, name)?;

        // The package row and all its file rows go in one atomic step;
        // from here on the files are untracked.
        db::transaction(conn, |tx| CatalogPackage::delete(tx, name))?;

        remove_payload(&files, config, root);
        info!("removed {} ({} catalog rows)", name, files.len());
    }

    Ok(())
}

/// Delete one package's payload from the root: files first, then
/// directories, both deepest-first. Every path handed to the filesystem
/// is the join of the root and the catalog-relative path.
fn remove_payload(files: &[CatalogFile], config: &Config, root: &Path) {
    let mut file_rows: Vec<&CatalogFile> =
        files.iter().filter(|f| f.kind == FileKind::File).collect();
    file_rows.sort_by(|a, b| b.path.cmp(&a.path));

    for row in file_rows {
        let on_disk = root.join(&row.path);
        match filesystem::hash_file(&on_disk) {
            Ok(actual) if actual == row.hash => {
                if let Err(e) = fs::remove_file(&on_disk) {
                    warn!("could not remove {}: {}", row.path, e);
                } else {
                    debug!("removed {}", row.path);
                }
            }
            Ok(_) if config.hard_remove => {
                let backup = filesystem::backup_path(&on_disk);
                match fs::rename(&on_disk, &backup) {
                    Ok(()) => warn!(
                        "{} was modified since install; saved as {}",
                        row.path,
                        backup.display()
                    ),
                    Err(e) => warn!("could not back up {}: {}; leaving in place", row.path, e),
                }
            }
            Ok(_) => {
                warn!(
                    "{} was modified since install; refusing to remove it",
                    row.path
                );
            }
            Err(e) => {
                warn!("could not verify {}: {}; leaving in place", row.path, e);
            }
        }
    }

    let mut dir_rows: Vec<&CatalogFile> =
        files.iter().filter(|f| f.kind == FileKind::Dir).collect();
    dir_rows.sort_by(|a, b| b.path.cmp(&a.path));

    for row in dir_rows {
        let on_disk = root.join(&row.path);
        if let Err(e) = fs::remove_dir(&on_disk) {
            // Shared with another package or holding untracked content.
            debug!("leaving directory {}: {}", row.path, e);
        } else {
            debug!("removed directory {}", row.path);
        }
    }
}
