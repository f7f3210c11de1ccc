//! Toolchain version probing.
//!
//! A probe runs `<tool> <args>` and pulls the first version-looking token out
//! of its output.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use thiserror::Error;

use crate::core::version::parse_version_lenient;
use crate::util::process::{find_executable, ProcessBuilder};

static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.\d+(?:\.\d+)?)(-[0-9A-Za-z][0-9A-Za-z.-]*)?").unwrap()
});

/// How to ask a tool for its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Binary name, looked up on PATH.
    pub binary: String,
    /// Arguments that make the tool print its version.
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(binary: impl Into<String>, args: &[&str]) -> Self {
        ToolSpec {
            binary: binary.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Why a version couldn't be probed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("could not determine version from `{command}` output: {output}")]
    Unparsable { command: String, output: String },

    #[error(transparent)]
    Exec(#[from] anyhow::Error),
}

/// Detects installed toolchain versions.
pub trait ToolchainProbe {
    fn version(&self, tool: &ToolSpec) -> Result<Version, ProbeError>;
}

/// Probes by running the tool as a subprocess.
///
/// The tool runs inside the project root so directory overrides such as a
/// `rust-toolchain` file are honoured.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    cwd: PathBuf,
}

impl CommandProbe {
    pub fn new(project_root: &Path) -> Self {
        CommandProbe {
            cwd: project_root.to_path_buf(),
        }
    }
}

impl ToolchainProbe for CommandProbe {
    fn version(&self, tool: &ToolSpec) -> Result<Version, ProbeError> {
        let program =
            find_executable(&tool.binary).ok_or_else(|| ProbeError::NotFound(tool.binary.clone()))?;

        let process = ProcessBuilder::new(&program)
            .args(&tool.args)
            .cwd(&self.cwd);
        let output = process.exec_and_check()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(tool = %tool.binary, output = %stdout.trim(), "probed toolchain");

        extract_version(&stdout).ok_or_else(|| ProbeError::Unparsable {
            command: process.display_command(),
            output: stdout.trim().to_string(),
        })
    }
}

/// Extract the first semantic-version-looking token from tool output.
///
/// Handles `rustc 1.54.0 (a178d0322 2021-07-26)`, `go version go1.18.3
/// linux/amd64` and `v16.13.0`.
pub fn extract_version(output: &str) -> Option<Version> {
    let caps = VERSION_TOKEN.captures(output)?;
    let numeric = caps.get(1)?.as_str();
    let with_pre = caps.get(2).map(|pre| format!("{}{}", numeric, pre.as_str()));

    with_pre
        .as_deref()
        .and_then(parse_version_lenient)
        .or_else(|| parse_version_lenient(numeric))
}
