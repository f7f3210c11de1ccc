//! Dependency snapshots: declared requirements and locked versions.
//!
//! The toolchain verifier needs to know which version of a library the
//! project asks for and which version the lockfile actually resolved. The
//! snapshot is rebuilt from disk on every call and never cached.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use serde::Deserialize;
use thiserror::Error;

use crate::core::version::requirement_floor;

/// Declared and locked versions of a project's direct dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    package: Option<String>,
    locked: BTreeMap<String, Version>,
    declared: BTreeMap<String, VersionReq>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Set the name of the package the snapshot was read for.
    pub fn set_package(&mut self, name: impl Into<String>) -> &mut Self {
        self.package = Some(name.into());
        self
    }

    /// Name of the package the snapshot was read for.
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Record a locked version. The highest version wins when a library is
    /// locked more than once.
    pub fn lock(&mut self, name: impl Into<String>, version: Version) -> &mut Self {
        let entry = self.locked.entry(name.into()).or_insert_with(|| version.clone());
        if version > *entry {
            *entry = version;
        }
        self
    }

    /// Record a declared requirement.
    pub fn declare(&mut self, name: impl Into<String>, req: VersionReq) -> &mut Self {
        self.declared.insert(name.into(), req);
        self
    }

    /// The locked version of a library, if the lockfile has it.
    pub fn locked(&self, name: &str) -> Option<&Version> {
        self.locked.get(name)
    }

    /// The declared requirement for a library.
    pub fn declared(&self, name: &str) -> Option<&VersionReq> {
        self.declared.get(name)
    }

    /// The lowest version the declared requirement admits.
    pub fn declared_floor(&self, name: &str) -> Option<Version> {
        self.declared(name).and_then(requirement_floor)
    }
}

/// Why a snapshot couldn't be read.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("{reason}")]
    Unreadable { path: PathBuf, reason: String },
}

impl SnapshotError {
    /// The file the error relates to.
    pub fn path(&self) -> &Path {
        match self {
            SnapshotError::NotFound { path } | SnapshotError::Unreadable { path, .. } => path,
        }
    }
}

/// Source of dependency metadata for a project.
pub trait DependencySnapshot {
    fn read(&self, project_root: &Path) -> Result<DependencyGraph, SnapshotError>;
}

/// Reads `Cargo.toml` and `Cargo.lock`.
///
/// A `Cargo.toml` without a package name and version is rejected the same way
/// `cargo metadata` would reject it. A missing `Cargo.lock` is not an error:
/// it just yields no locked versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoSnapshot;

#[derive(Deserialize)]
struct CargoToml {
    package: Option<CargoPackage>,
    #[serde(default)]
    dependencies: BTreeMap<String, DependencyDecl>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: Option<String>,
    version: Option<toml::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyDecl {
    Simple(String),
    Detailed { version: Option<String> },
}

#[derive(Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
}

impl DependencySnapshot for CargoSnapshot {
    fn read(&self, project_root: &Path) -> Result<DependencyGraph, SnapshotError> {
        let manifest_path = project_root.join("Cargo.toml");
        let unreadable = |path: &Path, reason: String| SnapshotError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        if !manifest_path.is_file() {
            return Err(SnapshotError::NotFound {
                path: manifest_path,
            });
        }

        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| unreadable(&manifest_path, e.to_string()))?;
        let cargo: CargoToml = toml::from_str(&content)
            .map_err(|e| unreadable(&manifest_path, e.message().to_string()))?;

        let package_name = match cargo.package {
            Some(CargoPackage {
                name: Some(name),
                version: Some(_),
            }) => name,
            Some(_) => {
                return Err(unreadable(
                    &manifest_path,
                    "[package] is missing a name or version".to_string(),
                ))
            }
            None => {
                return Err(unreadable(
                    &manifest_path,
                    "no [package] section".to_string(),
                ))
            }
        };

        let mut graph = DependencyGraph::new();
        graph.set_package(package_name);

        for (name, decl) in cargo.dependencies {
            let raw = match decl {
                DependencyDecl::Simple(v) => v,
                DependencyDecl::Detailed { version: Some(v) } => v,
                DependencyDecl::Detailed { version: None } => continue,
            };
            let req = VersionReq::parse(&raw).map_err(|e| {
                unreadable(
                    &manifest_path,
                    format!("invalid version requirement for {}: {}", name, e),
                )
            })?;
            graph.declare(name, req);
        }

        let lock_path = project_root.join("Cargo.lock");
        if !lock_path.is_file() {
            tracing::debug!(path = %lock_path.display(), "no lockfile, no locked versions");
            return Ok(graph);
        }

        let content = std::fs::read_to_string(&lock_path)
            .map_err(|e| unreadable(&lock_path, e.to_string()))?;
        let lock: CargoLock = toml::from_str(&content)
            .map_err(|e| unreadable(&lock_path, e.message().to_string()))?;

        for package in lock.package {
            let version = Version::parse(&package.version).map_err(|e| {
                unreadable(
                    &lock_path,
                    format!("invalid version for {}: {}", package.name, e),
                )
            })?;
            graph.lock(package.name, version);
        }

        Ok(graph)
    }
}
