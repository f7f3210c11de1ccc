//! Global context for fastedge operations.
//!
//! Provides centralized access to the project root, configuration, output
//! shell and the interaction flags shared by every command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::errors::{Error, Result};
use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::shell::Shell;

/// Flags that control how much the operator is asked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Answer yes to every confirmation.
    pub auto_yes: bool,
    /// Never ask anything; use defaults.
    pub non_interactive: bool,
    /// Take default values instead of prompting for them.
    pub accept_defaults: bool,
    pub verbose: bool,
}

impl Flags {
    /// Whether yes/no confirmations may be asked.
    pub fn confirmations_allowed(&self) -> bool {
        !self.auto_yes && !self.non_interactive
    }

    /// Whether values may be prompted for.
    pub fn prompts_allowed(&self) -> bool {
        !self.auto_yes && !self.non_interactive && !self.accept_defaults
    }
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Project root; every path is resolved against it
    root: PathBuf,

    shell: Arc<Shell>,

    /// Merged global and project configuration
    config: Config,

    flags: Flags,

    /// API token from `--token` or the environment
    token: Option<String>,

    /// API endpoint from `--endpoint` or the environment
    endpoint: Option<String>,
}

impl GlobalContext {
    /// Create a context for a project root, loading its configuration.
    pub fn new(root: PathBuf, shell: Arc<Shell>) -> Self {
        let global = global_config_path();
        let config = load_config(global.as_deref(), &project_config_path(&root));
        Self::with_config(root, shell, config)
    }

    /// Create a context with an explicit configuration.
    pub fn with_config(root: PathBuf, shell: Arc<Shell>, config: Config) -> Self {
        GlobalContext {
            root,
            shell,
            config,
            flags: Flags::default(),
            token: None,
            endpoint: None,
        }
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Override the configured API token.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    /// Override the configured API endpoint.
    pub fn set_endpoint(&mut self, endpoint: Option<String>) {
        self.endpoint = endpoint.filter(|e| !e.is_empty());
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The API token: flag or environment first, then configuration.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.config.api.token.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// The API token, or a configuration error when none is set.
    pub fn require_token(&self) -> Result<&str> {
        self.token().ok_or(Error::MissingToken)
    }

    /// The API endpoint: flag or environment first, then configuration.
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.config.endpoint())
    }

    /// Path of the project manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }
}
