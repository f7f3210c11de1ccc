//! fastedge.toml manifest parsing and schema.
//!
//! The manifest names the package, declares its language and optionally the
//! service it deploys to and the resources a new service needs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use toml_edit::{value, DocumentMut};

use crate::core::errors::{Error, Result};
use crate::util::fs;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "fastedge.toml";

/// The parsed fastedge.toml manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestFile {
    pub manifest_version: Option<u32>,
    pub name: String,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub language: String,
    pub service_id: String,
    pub scripts: Scripts,
    pub setup: Setup,
}

/// `[scripts]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scripts {
    /// Custom build command, replacing the language default
    pub build: Option<String>,
}

/// `[setup]` table: resources to create alongside a new service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setup {
    pub backends: BTreeMap<String, BackendSetup>,
    pub dictionaries: BTreeMap<String, DictionarySetup>,
    pub log_endpoints: BTreeMap<String, LoggerSetup>,
}

/// `[setup.backends.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSetup {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub description: Option<String>,
}

/// `[setup.dictionaries.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionarySetup {
    pub description: Option<String>,
    pub items: BTreeMap<String, DictionaryItemSetup>,
}

/// `[setup.dictionaries.<name>.items.<key>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryItemSetup {
    pub value: Option<String>,
    pub description: Option<String>,
}

/// `[setup.log_endpoints.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSetup {
    pub provider: Option<String>,
}

impl ManifestFile {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ManifestUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest content. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ManifestUnreadable {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })
    }

    /// Check the fields every build needs.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_manifest(
                "name cannot be empty, please provide a name",
            ));
        }
        if self.language.trim().is_empty() {
            return Err(Error::invalid_manifest(
                "language cannot be empty, please provide a language",
            ));
        }
        Ok(())
    }
}

/// Set or clear `service_id` in a manifest file, preserving its formatting.
///
/// An empty `service_id` removes the key.
pub fn write_service_id(path: &Path, service_id: &str) -> anyhow::Result<()> {
    let content = fs::read_to_string(path)?;
    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if service_id.is_empty() {
        doc.remove("service_id");
    } else {
        doc["service_id"] = value(service_id);
    }

    fs::write_string(path, &doc.to_string())
}

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Undefined,
    Manifest,
    Flag,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Undefined => write!(f, "undefined"),
            Source::Manifest => write!(f, "{}", MANIFEST_NAME),
            Source::Flag => write!(f, "flag"),
        }
    }
}

/// Why the project manifest couldn't be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestReadError {
    NotFound,
    Invalid(String),
}

impl fmt::Display for ManifestReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestReadError::NotFound => write!(f, "{} not found", MANIFEST_NAME),
            ManifestReadError::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

/// Manifest content combined with command-line overrides.
#[derive(Debug, Clone)]
pub struct ManifestData {
    pub file: ManifestFile,
    path: PathBuf,
    read_error: Option<ManifestReadError>,
    name_flag: Option<String>,
    service_id_flag: Option<String>,
}

impl ManifestData {
    /// Read `fastedge.toml` from a project root, remembering any read error.
    pub fn load(project_root: &Path) -> Self {
        let path = project_root.join(MANIFEST_NAME);
        let (file, read_error) = if !path.is_file() {
            (ManifestFile::default(), Some(ManifestReadError::NotFound))
        } else {
            match ManifestFile::load(&path) {
                Ok(file) => (file, None),
                Err(e) => {
                    tracing::debug!(path = %path.display(), "manifest unreadable: {}", e);
                    let reason = match e {
                        Error::ManifestUnreadable { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    (ManifestFile::default(), Some(ManifestReadError::Invalid(reason)))
                }
            }
        };

        ManifestData {
            file,
            path,
            read_error,
            name_flag: None,
            service_id_flag: None,
        }
    }

    /// Wrap an already parsed manifest.
    pub fn from_file(file: ManifestFile, path: PathBuf) -> Self {
        ManifestData {
            file,
            path,
            read_error: None,
            name_flag: None,
            service_id_flag: None,
        }
    }

    /// Override the package name from the command line.
    pub fn with_name_flag(mut self, name: Option<String>) -> Self {
        self.name_flag = name.filter(|n| !n.is_empty());
        self
    }

    /// Override the service ID from the command line.
    pub fn with_service_id_flag(mut self, service_id: Option<String>) -> Self {
        self.service_id_flag = service_id.filter(|s| !s.is_empty());
        self
    }

    /// Replace the manifest content, clearing any read error.
    pub fn replace_file(&mut self, file: ManifestFile, path: PathBuf) {
        self.file = file;
        self.path = path;
        self.read_error = None;
    }

    /// Path the manifest was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The error hit while reading the manifest, if any.
    pub fn read_error(&self) -> Option<&ManifestReadError> {
        self.read_error.as_ref()
    }

    /// Package name and where it came from.
    pub fn name(&self) -> (String, Source) {
        resolve(&self.name_flag, &self.file.name)
    }

    /// Service ID and where it came from.
    pub fn service_id(&self) -> (String, Source) {
        resolve(&self.service_id_flag, &self.file.service_id)
    }

    /// The read error, if any, as an `Error`.
    pub fn read_failure(&self) -> Option<Error> {
        self.read_error.as_ref().map(|e| Error::ManifestUnreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Fail if the manifest couldn't be read.
    pub fn check_readable(&self) -> Result<()> {
        match self.read_failure() {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

fn resolve(flag: &Option<String>, manifest: &str) -> (String, Source) {
    if let Some(flag) = flag {
        return (flag.clone(), Source::Flag);
    }
    if !manifest.is_empty() {
        return (manifest.to_string(), Source::Manifest);
    }
    (String::new(), Source::Undefined)
}
