// src/config.rs

//! Process-wide policy configuration
//!
//! One record of flags steering conflict, dependency, and removal
//! behavior. The frontend fills it in once at startup; the core only ever
//! reads it.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Downgrade failed dependency checks from fatal to warnings.
    pub no_deps: bool,
    /// At uninstall, remove modified files after renaming them to a
    /// backup name instead of refusing.
    pub hard_remove: bool,
    /// Reserved: bypass file conflicts. Accepted but not implemented;
    /// conflicts stay fatal.
    pub force: bool,
    /// Verbose error reporting.
    pub debug: bool,
    /// Path to the catalog store.
    pub db: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            no_deps: false,
            hard_remove: false,
            force: false,
            debug: false,
            db: PathBuf::from("/var/lib/satchel/satchel.db"),
        }
    }
}
