// src/filesystem.rs

//! Filesystem side of the engine
//!
//! Snapshotting a directory tree into relative entries, MD5 content
//! fingerprints, and the copy/backup primitives used at materialization
//! and removal time. The MD5 digest is tamper evidence against accidental
//! local modification, not a security primitive.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Kind of a snapshotted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry below a snapshot root: path relative to the root, kind, and
/// POSIX mode where the platform has one.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    pub kind: EntryKind,
    pub mode: Option<u32>,
}

/// Recursively enumerate everything below `root`. Paths come out relative
/// to `root` with no leading `./`. Traversal order is not part of the
/// contract.
pub fn snapshot(root: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let path = relative
            .to_str()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non-UTF-8 path below {}", root.display()),
                )
            })?
            .to_string();

        let kind = if entry.file_type().is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        let mode = entry.metadata().ok().and_then(|md| mode_of(&md));

        entries.push(FileEntry { path, kind, mode });
    }

    Ok(entries)
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_of(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

/// MD5 of the full file content as 32 lowercase hex characters.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Whether the file at `path` still hashes to `expected`.
pub fn hash_matches(path: &Path, expected: &str) -> Result<bool> {
    Ok(hash_file(path)? == expected)
}

/// Apply a POSIX mode where the platform supports it.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Copy `src` over `dst` byte-for-byte, truncating any prior content, and
/// apply `mode` when recorded. The destination's parent directory is
/// created when missing.
pub fn copy_file(src: &Path, dst: &Path, mode: Option<u32>) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("creating missing parent {}", parent.display());
            fs::create_dir_all(parent)?;
        }
    }

    fs::copy(src, dst)?;

    if let Some(mode) = mode {
        set_mode(dst, mode)?;
    }

    Ok(())
}

/// A fresh sibling name for backing up a modified file before hard
/// removal: `<path>.saved-<n>` for the first free `n`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut n = 0u32;
    loop {
        let candidate = PathBuf::from(format!("{}.saved-{}", path.display(), n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
