// src/recipe.rs

//! Declarative package recipes
//!
//! A recipe is a TOML file with the four manifest fields (`name`,
//! `version`, `maintainer`, `deps`) and the payload to produce: `[[dir]]`
//! and `[[file]]` tables with a relative `path`, an optional POSIX `mode`,
//! and inline `content` for files. Building a recipe evaluates it into a
//! fresh scratch directory and snapshots the result; the scratch directory
//! is removed when the product is dropped.
//!
//! ```toml
//! name = "testpkg"
//! version = "0.1"
//! maintainer = "Morn"
//! deps = "testpkgtwo"
//!
//! [[dir]]
//! path = "testdir"
//!
//! [[file]]
//! path = "testdir/file2"
//! content = "hello\n"
//! mode = 0o644
//! ```

use std::fs;
use std::path::{Component, Path};

use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filesystem::{self, FileEntry};
use crate::version::{self, parse_deps, Dependency, Version};

/// Validated package metadata out of a recipe.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    pub maintainer: String,
    pub deps: Vec<Dependency>,
}

/// Everything the install coordinator needs for one package: the
/// manifest, the scratch directory holding the payload, and its snapshot.
#[derive(Debug)]
pub struct BuildProduct {
    pub manifest: Manifest,
    pub scratch: TempDir,
    pub entries: Vec<FileEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Recipe {
    name: String,
    version: String,
    maintainer: String,
    // Required even when empty: a package with no dependencies says so.
    deps: String,
    #[serde(default, rename = "dir")]
    dirs: Vec<DirSpec>,
    #[serde(default, rename = "file")]
    files: Vec<FileSpec>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct DirSpec {
    path: String,
    mode: Option<u32>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FileSpec {
    path: String,
    content: String,
    mode: Option<u32>,
}

/// Evaluate a recipe into a fresh scratch directory.
///
/// Syntax errors in the recipe surface as `RecipeFailed`; a missing or
/// ill-typed manifest field as `InvalidManifest`; malformed version or
/// dependency strings as the algebra's parse errors.
pub fn build(recipe_path: &Path) -> Result<BuildProduct> {
    let failed = |reason: String| Error::RecipeFailed {
        path: recipe_path.to_path_buf(),
        reason,
    };
    let invalid = |reason: String| Error::InvalidManifest {
        path: recipe_path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(recipe_path).map_err(|e| failed(e.to_string()))?;
    let value: toml::Value = text.parse().map_err(|e: toml::de::Error| failed(e.to_string()))?;
    let recipe: Recipe = value
        .try_into()
        .map_err(|e: toml::de::Error| invalid(e.to_string()))?;

    if !version::is_valid_name(&recipe.name) {
        return Err(invalid(format!("invalid package name {:?}", recipe.name)));
    }

    let manifest = Manifest {
        name: recipe.name,
        version: Version::parse(&recipe.version)?,
        maintainer: recipe.maintainer,
        deps: parse_deps(&recipe.deps)?,
    };

    let scratch = tempfile::Builder::new().prefix("satchel-build-").tempdir()?;
    debug!(
        "evaluating recipe {} in {}",
        recipe_path.display(),
        scratch.path().display()
    );

    for dir in &recipe.dirs {
        let relative = confined(&dir.path).ok_or_else(|| {
            failed(format!("payload path {:?} escapes the scratch directory", dir.path))
        })?;
        let target = scratch.path().join(relative);
        fs::create_dir_all(&target)?;
        if let Some(mode) = dir.mode {
            filesystem::set_mode(&target, mode)?;
        }
    }

    for file in &recipe.files {
        let relative = confined(&file.path).ok_or_else(|| {
            failed(format!("payload path {:?} escapes the scratch directory", file.path))
        })?;
        let target = scratch.path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, file.content.as_bytes())?;
        if let Some(mode) = file.mode {
            filesystem::set_mode(&target, mode)?;
        }
    }

    let entries = filesystem::snapshot(scratch.path())?;

    info!(
        "built {} {} ({} entries)",
        manifest.name,
        manifest.version,
        entries.len()
    );

    Ok(BuildProduct {
        manifest,
        scratch,
        entries,
    })
}

/// A payload path must stay below the scratch directory: relative, and
/// made of plain components only.
fn confined(path: &str) -> Option<&Path> {
    let p = Path::new(path);
    let plain = !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Some(p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::EntryKind;
    use tempfile::TempDir;

    fn write_recipe(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("pkg.toml");
        fs::write(&path, body).unwrap();
        path
    }

    const OK_RECIPE: &str = r#"
name = "testpkg"
version = "0.1"
maintainer = "Morn"
deps = "testpkgtwo"

[[dir]]
path = "testdir"

[[file]]
path = "file"
content = "alpha\n"

[[file]]
path = "testdir/file2"
content = "beta\n"
"#;

    #[test]
    fn test_build_produces_manifest_and_payload() {
        let dir = TempDir::new().unwrap();
        let product = build(&write_recipe(&dir, OK_RECIPE)).unwrap();

        assert_eq!(product.manifest.name, "testpkg");
        assert_eq!(product.manifest.version, Version::parse("0.1").unwrap());
        assert_eq!(product.manifest.maintainer, "Morn");
        assert_eq!(product.manifest.deps, parse_deps("testpkgtwo").unwrap());

        let mut paths: Vec<_> = product
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.kind))
            .collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));
        assert_eq!(
            paths,
            vec![
                ("file", EntryKind::File),
                ("testdir", EntryKind::Dir),
                ("testdir/file2", EntryKind::File),
            ]
        );

        let payload = fs::read_to_string(product.scratch.path().join("testdir/file2")).unwrap();
        assert_eq!(payload, "beta\n");
    }

    #[test]
    fn test_scratch_is_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let product = build(&write_recipe(&dir, OK_RECIPE)).unwrap();
        let scratch_path = product.scratch.path().to_path_buf();
        assert!(scratch_path.exists());

        drop(product);
        assert!(!scratch_path.exists());
    }

    #[test]
    fn test_missing_manifest_field() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            r#"
name = "nodeps"
version = "1.0"
maintainer = "x"
"#,
        );

        match build(&path) {
            Err(Error::InvalidManifest { reason, .. }) => assert!(reason.contains("deps")),
            other => panic!("expected InvalidManifest, got {:?}", other),
        }
    }

    #[test]
    fn test_ill_typed_manifest_field() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            r#"
name = "badtype"
version = "1.0"
maintainer = "x"
deps = 3
"#,
        );

        assert!(matches!(build(&path), Err(Error::InvalidManifest { .. })));
    }

    #[test]
    fn test_toml_syntax_error_is_recipe_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(&dir, "name = \"unterminated");

        assert!(matches!(build(&path), Err(Error::RecipeFailed { .. })));
    }

    #[test]
    fn test_missing_recipe_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            build(&dir.path().join("absent.toml")),
            Err(Error::RecipeFailed { .. })
        ));
    }

    #[test]
    fn test_payload_escape_is_rejected() {
        let dir = TempDir::new().unwrap();
        for bad in ["../outside", "/etc/passwd"] {
            let path = write_recipe(
                &dir,
                &format!(
                    r#"
name = "evil"
version = "1"
maintainer = "x"
deps = ""

[[file]]
path = "{}"
content = "nope"
"#,
                    bad
                ),
            );
            assert!(
                matches!(build(&path), Err(Error::RecipeFailed { .. })),
                "path {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_bad_version_propagates_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            r#"
name = "badver"
version = "1.6.3a"
maintainer = "x"
deps = ""
"#,
        );

        assert!(matches!(build(&path), Err(Error::Version { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_is_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            r##"
name = "modes"
version = "1"
maintainer = "x"
deps = ""

[[file]]
path = "bin/run"
content = "#!/bin/sh\n"
mode = 0o755
"##,
        );

        let product = build(&path).unwrap();
        let entry = product
            .entries
            .iter()
            .find(|e| e.path == "bin/run")
            .unwrap();
        assert_eq!(entry.mode, Some(0o755));
    }
}
