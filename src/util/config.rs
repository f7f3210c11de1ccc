//! Configuration file support for fastedge.
//!
//! fastedge reads two configuration file locations:
//! - Global: `~/.fastedge/config.toml` - User-wide defaults
//! - Project: `.fastedge/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.fastly.com";

/// fastedge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,

    /// Per-language toolchain settings
    pub language: LanguageConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API endpoint (e.g., https://api.fastly.com)
    pub endpoint: Option<String>,

    /// API token
    pub token: Option<String>,
}

/// Toolchain settings for each supported language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub rust: RustConfig,
    pub go: GoConfig,
    pub javascript: JavaScriptConfig,
}

/// Rust toolchain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RustConfig {
    /// Constraint the installed `rustc` must satisfy
    pub toolchain_constraint: Option<String>,

    /// Constraint the locked `fastly-sys` version must satisfy
    pub companion_constraint: Option<String>,

    /// `fastly` version recommended when crates.io can't be reached
    pub fallback_library_version: Option<String>,
}

/// Go toolchain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Constraint the installed `go` must satisfy
    pub toolchain_constraint: Option<String>,

    /// Constraint the installed `tinygo` must satisfy
    pub tinygo_constraint: Option<String>,
}

/// JavaScript / AssemblyScript toolchain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaScriptConfig {
    /// Constraint the installed `node` must satisfy
    pub toolchain_constraint: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        merge_opt(&mut self.api.endpoint, other.api.endpoint);
        merge_opt(&mut self.api.token, other.api.token);

        let (rust, other_rust) = (&mut self.language.rust, other.language.rust);
        merge_opt(&mut rust.toolchain_constraint, other_rust.toolchain_constraint);
        merge_opt(&mut rust.companion_constraint, other_rust.companion_constraint);
        merge_opt(
            &mut rust.fallback_library_version,
            other_rust.fallback_library_version,
        );

        let (go, other_go) = (&mut self.language.go, other.language.go);
        merge_opt(&mut go.toolchain_constraint, other_go.toolchain_constraint);
        merge_opt(&mut go.tinygo_constraint, other_go.tinygo_constraint);

        merge_opt(
            &mut self.language.javascript.toolchain_constraint,
            other.language.javascript.toolchain_constraint,
        );
    }

    /// The configured API endpoint, or the default.
    pub fn endpoint(&self) -> &str {
        self.api.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.fastedge/config.toml)
/// 2. Global config (~/.fastedge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global fastedge config directory (~/.fastedge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".fastedge"))
}

/// Get the global config path (~/.fastedge/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.fastedge/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".fastedge").join("config.toml")
}
