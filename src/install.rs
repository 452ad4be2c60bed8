// src/install.rs

//! Install coordinator
//!
//! Installs a batch of built packages: one dependency check over the
//! installed set plus the whole batch, one catalog transaction for every
//! row the batch adds, then materialization into the installation root.
//! The conflict check runs purely against catalog state, so the
//! transaction commits before any byte lands in the root; copy failures
//! after commit are logged per-file and never roll back.

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db;
use crate::db::models::{CatalogFile, CatalogPackage, FileKind};
use crate::error::{Error, Result};
use crate::filesystem::{self, EntryKind, FileEntry};
use crate::recipe::BuildProduct;
use crate::resolver::{self, PackageSpec};
use crate::version::format_deps;

/// Install every package in `batch` into `root`, registering them in the
/// catalog behind `conn`. The batch form lets a package and its fresh
/// dependencies land together without failing the dependency check.
pub fn install(
    conn: &mut Connection,
    config: &Config,
    batch: &[BuildProduct],
    root: &Path,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    // Dependency check over the installed set plus the whole batch; the
    // batch overrides by name.
    let mut view = resolver::installed_view(conn)?;
    for product in batch {
        view.insert(
            product.manifest.name.clone(),
            PackageSpec {
                version: product.manifest.version.clone(),
                deps: product.manifest.deps.clone(),
            },
        );
    }

    let failures = resolver::check_all(&view);
    if !failures.is_empty() {
        for (offender, dep) in &failures {
            warn!("unmet dependency: {} requires {}", offender, dep);
        }
        if !config.no_deps {
            return Err(Error::UnmetDependencies(failures.len()));
        }
        warn!(
            "continuing despite {} unmet dependency(ies)",
            failures.len()
        );
    }

    // One transaction covers every catalog row the batch adds. Any FILE
    // conflict rolls the whole batch back before a single byte is copied.
    db::transaction(conn, |tx| {
        let mut conflicts: Vec<(String, String)> = Vec::new();

        for product in batch {
            let name = &product.manifest.name;

            if CatalogPackage::find_by_name(tx, name)?.is_some() {
                warn!("{} is already installed; replacing its catalog entry", name);
                CatalogPackage::delete(tx, name)?;
            }

            CatalogPackage {
                name: name.clone(),
                version: product.manifest.version.to_string(),
                maintainer: product.manifest.maintainer.clone(),
                deps: format_deps(&product.manifest.deps),
            }
            .insert(tx)?;

            for entry in &product.entries {
                let (kind, hash) = match entry.kind {
                    EntryKind::Dir => (FileKind::Dir, String::new()),
                    EntryKind::File => {
                        let on_scratch = product.scratch.path().join(&entry.path);
                        (FileKind::File, filesystem::hash_file(&on_scratch)?)
                    }
                };

                let row = CatalogFile {
                    owner: name.clone(),
                    hash,
                    path: entry.path.clone(),
                    kind,
                    mode: entry.mode,
                };

                match row.insert(tx) {
                    Ok(()) => {}
                    Err(Error::PathConflict(path)) => match entry.kind {
                        EntryKind::File => conflicts.push((name.clone(), path)),
                        EntryKind::Dir => {
                            debug!("directory {} is already cataloged; sharing it", path)
                        }
                    },
                    Err(e) => return Err(e),
                }
            }
        }

        if !conflicts.is_empty() {
            for (package, path) in &conflicts {
                let owner = CatalogFile::owner_of(tx, path)?
                    .unwrap_or_else(|| "an unknown package".to_string());
                error!("file conflict: {} from {} is owned by {}", path, package, owner);
            }
            return Err(Error::FileConflict(conflicts.len()));
        }

        Ok(())
    })?;

    for product in batch {
        materialize(product, root);
        info!(
            "installed {} {}",
            product.manifest.name, product.manifest.version
        );
    }

    Ok(())
}

/// Copy one package's payload from its scratch directory into the root:
/// directories first in ascending path order, then files in ascending
/// path order, truncating whatever was there before.
fn materialize(product: &BuildProduct, root: &Path) {
    let mut dirs: Vec<&FileEntry> = product
        .entries
        .iter()
        .filter(|e| e.kind == EntryKind::Dir)
        .collect();
    dirs.sort_by(|a, b| a.path.cmp(&b.path));

    for dir in dirs {
        let target = root.join(&dir.path);
        if let Err(e) = fs::create_dir_all(&target) {
            warn!("could not create {}: {}", dir.path, e);
            continue;
        }
        if let Some(mode) = dir.mode {
            if let Err(e) = filesystem::set_mode(&target, mode) {
                warn!("could not set mode on {}: {}", dir.path, e);
            }
        }
    }

    let mut files: Vec<&FileEntry> = product
        .entries
        .iter()
        .filter(|e| e.kind == EntryKind::File)
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    for file in files {
        let src = product.scratch.path().join(&file.path);
        let dst = root.join(&file.path);
        match filesystem::copy_file(&src, &dst, file.mode) {
            Ok(()) => debug!("materialized {}", file.path),
            Err(e) => warn!("could not copy {}: {}; catalog row kept", file.path, e),
        }
    }
}
