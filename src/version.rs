// src/version.rs

//! Version and dependency algebra
//!
//! Versions are finite sequences of non-negative integers compared
//! lexicographically; a longer sequence is greater than its own prefix.
//! A dependency token names a package and optionally constrains its
//! installed version with a suffix operator (`@`, `=`, `>=`, `<=`, `>`,
//! `<`). The algebra is pure: no I/O happens here.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An ordered sequence of non-negative integers, e.g. `1.2.3`.
///
/// The derived `Ord` is lexicographic over the components, which gives
/// exactly the required ordering: `1.2 < 1.2.0 < 1.10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// Parse a dotted version string. Every token must be a plain
    /// non-negative integer; empty tokens are rejected, so `"1..2"` and
    /// `"1.2."` are errors, as are `"1.6.3a"` and `"1.2.-5"`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Version {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty version string"));
        }

        let mut components = Vec::new();
        for token in s.split('.') {
            if token.is_empty() {
                return Err(invalid("empty component"));
            }
            if !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("components must be non-negative integers"));
            }
            let value = token
                .parse::<u64>()
                .map_err(|_| invalid("component out of range"))?;
            components.push(value);
        }

        Ok(Version(components))
    }

    /// The version `0`, the floor every bare-name dependency compares
    /// against.
    pub fn zero() -> Self {
        Version(vec![0])
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", c)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Relation constraining the installed version of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
            Relation::Lt => "<",
            Relation::Le => "<=",
        }
    }
}

/// `true` when `existing` stands in `relation` to `required`.
///
/// The installed version is on the left of the relation: `b>=0.1.0` means
/// "the installed `b` must be at 0.1.0 or newer".
pub fn satisfies(required: &Version, existing: &Version, relation: Relation) -> bool {
    match relation {
        Relation::Eq => existing == required,
        Relation::Gt => existing > required,
        Relation::Ge => existing >= required,
        Relation::Lt => existing < required,
        Relation::Le => existing <= required,
    }
}

/// A single dependency edge: package name, relation, required version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub relation: Relation,
    pub version: Version,
}

/// Suffix operators in match order. Two-character operators come first so
/// that `>=`/`<=` win over `>`/`<` at the same split point.
const OPERATORS: [(&str, Relation); 6] = [
    (">=", Relation::Ge),
    ("<=", Relation::Le),
    ("@", Relation::Eq),
    ("=", Relation::Eq),
    (">", Relation::Gt),
    ("<", Relation::Lt),
];

/// Package names are alphanumerics plus hyphen and underscore.
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl Dependency {
    /// A bare-name dependency: any installed version newer than 0.
    pub fn bare(name: &str) -> Self {
        Dependency {
            name: name.to_string(),
            relation: Relation::Gt,
            version: Version::zero(),
        }
    }

    /// Parse one dependency token. The earliest operator occurrence in the
    /// token consumes the split point; a token with no operator is a bare
    /// name equivalent to `name>0`.
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |reason: String| Error::Dependency {
            input: token.to_string(),
            reason,
        };

        let mut split: Option<(usize, &str, Relation)> = None;
        'scan: for (i, _) in token.char_indices() {
            for (surface, relation) in OPERATORS {
                if token[i..].starts_with(surface) {
                    split = Some((i, surface, relation));
                    break 'scan;
                }
            }
        }

        let (name, relation, version) = match split {
            Some((at, surface, relation)) => {
                let name = &token[..at];
                let version_str = &token[at + surface.len()..];
                let version = Version::parse(version_str)?;
                (name, relation, version)
            }
            None => (token, Relation::Gt, Version::zero()),
        };

        if !is_valid_name(name) {
            return Err(invalid(format!("invalid package name {:?}", name)));
        }

        Ok(Dependency {
            name: name.to_string(),
            relation,
            version,
        })
    }

    /// `true` when the given installed version meets this dependency.
    pub fn matched_by(&self, installed: &Version) -> bool {
        satisfies(&self.version, installed, self.relation)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relation == Relation::Gt && self.version == Version::zero() {
            // The canonical surface form of a bare-name dependency.
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.name, self.relation.as_str(), self.version)
        }
    }
}

impl FromStr for Dependency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dependency::parse(s)
    }
}

/// Parse a whitespace-separated dependency string. Bad tokens do not stop
/// the scan; all of them are reported in one aggregate error.
pub fn parse_deps(s: &str) -> Result<Vec<Dependency>> {
    let mut deps = Vec::new();
    let mut errors = Vec::new();
    for token in s.split_whitespace() {
        match Dependency::parse(token) {
            Ok(dep) => deps.push(dep),
            Err(e) => errors.push(e.to_string()),
        }
    }
    if errors.is_empty() {
        Ok(deps)
    } else {
        Err(Error::DependencyList(errors))
    }
}

/// Serialize a dependency list back to its string form.
pub fn format_deps(deps: &[Dependency]) -> String {
    deps.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
