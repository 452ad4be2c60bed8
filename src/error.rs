// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for Satchel
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog (SQLite) errors
    #[error("catalog error: {0}")]
    Db(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed version string
    #[error("invalid version {input:?}: {reason}")]
    Version { input: String, reason: String },

    /// Malformed dependency token
    #[error("invalid dependency {input:?}: {reason}")]
    Dependency { input: String, reason: String },

    /// One or more bad tokens in a dependency string, reported together
    #[error("invalid dependency string: {}", .0.join("; "))]
    DependencyList(Vec<String>),

    /// A recipe's manifest is missing a field or carries an ill-typed one
    #[error("invalid manifest in {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// A recipe could not be evaluated into a payload
    #[error("recipe {} failed: {reason}", .path.display())]
    RecipeFailed { path: PathBuf, reason: String },

    /// Dependency check failed and the no-deps policy is not set
    #[error("{0} unmet dependency(ies)")]
    UnmetDependencies(usize),

    /// One or more files in an install batch are owned by another package
    #[error("{0} file conflict(s)")]
    FileConflict(usize),

    /// UNIQUE(path) violation from a catalog file insert. The install
    /// coordinator converts this into `FileConflict`; it never escapes.
    #[error("path already owned: {0}")]
    PathConflict(String),

    /// Uninstall target is not in the catalog
    #[error("package '{0}' is not installed")]
    NotInstalled(String),
}

/// Result type alias using Satchel's Error type
pub type Result<T> = std::result::Result<T, Error>;
