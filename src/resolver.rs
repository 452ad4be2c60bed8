// src/resolver.rs

//! Dependency checks across the installed set
//!
//! The resolver works on a *view*: a map from package name to its version
//! and declared dependencies. Coordinators build the view they need (the
//! installed set, plus a proposed batch, or minus removal targets) and ask
//! for every unmet edge. Only per-edge satisfaction is checked; dependency
//! cycles are accepted.

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::db::models::CatalogPackage;
use crate::error::Result;
use crate::version::{parse_deps, Dependency, Version};

/// A package as the dependency checker sees it.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub version: Version,
    pub deps: Vec<Dependency>,
}

/// A failed edge: the package declaring the dependency, and the dependency
/// the view does not meet.
pub type Failure = (String, Dependency);

/// Walk every dependency of every package in the view and collect the
/// unmet ones. A dependency fails when its target is absent from the view
/// or present at a version the relation rejects.
///
/// Failures come out in package-name order, then in each package's
/// declaration order.
pub fn check_all(view: &BTreeMap<String, PackageSpec>) -> Vec<Failure> {
    let mut failures = Vec::new();
    for (name, spec) in view {
        for dep in &spec.deps {
            let met = match view.get(&dep.name) {
                Some(target) => dep.matched_by(&target.version),
                None => false,
            };
            if !met {
                failures.push((name.clone(), dep.clone()));
            }
        }
    }
    failures
}

/// Build the view of everything currently installed. Stored version and
/// dependency strings are parsed on read.
pub fn installed_view(conn: &Connection) -> Result<BTreeMap<String, PackageSpec>> {
    let mut view = BTreeMap::new();
    for package in CatalogPackage::list_all(conn)? {
        let spec = PackageSpec {
            version: Version::parse(&package.version)?,
            deps: parse_deps(&package.deps)?,
        };
        view.insert(package.name, spec);
    }
    Ok(view)
}
