//! Supported languages and what each needs to build.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::builder::toolchain::ToolSpec;
use crate::core::constraint::VersionConstraint;
use crate::core::errors::{Error, Result};
use crate::util::config::Config;

pub const RUST_TOOLCHAIN_CONSTRAINT: &str = ">= 1.54.0";
pub const RUST_COMPANION_CONSTRAINT: &str = ">= 0.3.0 <= 0.6.0";
pub const RUST_FALLBACK_LIBRARY_VERSION: &str = "0.9.0";
pub const GO_TOOLCHAIN_CONSTRAINT: &str = ">= 1.17 < 1.19";
pub const TINYGO_TOOLCHAIN_CONSTRAINT: &str = ">= 0.24.0-0";
pub const NODE_TOOLCHAIN_CONSTRAINT: &str = ">= 16.0.0";

/// Version of `fastly` from which `fastly-sys` is pulled in.
const FASTLY_SYS_INTRODUCED: Version = Version::new(0, 3, 3);

/// Rust build target for edge-compute packages.
pub const RUST_WASM_TARGET: &str = "wasm32-wasi";

/// A project language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Go,
    JavaScript,
    AssemblyScript,
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::AssemblyScript => "assemblyscript",
            Language::Other => "other",
        }
    }

    /// Command that builds `bin/main.wasm` (or, for Rust, the cargo target).
    pub fn default_build_command(&self) -> Option<&'static str> {
        match self {
            Language::Rust => Some("cargo build --release --target wasm32-wasi"),
            Language::Go => Some("tinygo build -target=wasi -gc=conservative -o bin/main.wasm ./"),
            Language::JavaScript => Some("npm exec js-compute-runtime ./src/index.js ./bin/main.wasm"),
            Language::AssemblyScript => Some(
                "npm exec -- asc assembly/index.ts --outFile bin/main.wasm --optimize --noAssert",
            ),
            Language::Other => None,
        }
    }

    /// Toolchain requirements for this language, with config overrides applied.
    pub fn toolchain(&self, config: &Config) -> Result<LanguageToolchain> {
        let lang = &config.language;
        let (tools, companion) = match self {
            Language::Rust => {
                let rust = &lang.rust;
                let rustc = ToolRequirement {
                    name: "rustc".to_string(),
                    spec: ToolSpec::new("rustc", &["--version"]),
                    constraint: constraint_or(&rust.toolchain_constraint, RUST_TOOLCHAIN_CONSTRAINT)?,
                    not_found_remediation:
                        "Install Rust with rustup (https://rustup.rs), then run `rustup target add wasm32-wasi`."
                            .to_string(),
                    constraint_remediation:
                        "Run `rustup update stable`, or ensure your `rust-toolchain` file specifies a version matching the constraint (e.g. `channel = \"stable\"`)."
                            .to_string(),
                };

                let fallback_raw = rust
                    .fallback_library_version
                    .as_deref()
                    .unwrap_or(RUST_FALLBACK_LIBRARY_VERSION);
                let fallback_version =
                    Version::parse(fallback_raw).map_err(|e| Error::MalformedConstraint {
                        constraint: fallback_raw.to_string(),
                        reason: format!("invalid fallback library version: {}", e),
                    })?;

                let companion = CompanionRule {
                    library: "fastly".to_string(),
                    companion: "fastly-sys".to_string(),
                    introduced: FASTLY_SYS_INTRODUCED,
                    constraint: constraint_or(&rust.companion_constraint, RUST_COMPANION_CONSTRAINT)?,
                    fallback_version,
                };

                (vec![rustc], Some(companion))
            }
            Language::Go => {
                let go = ToolRequirement {
                    name: "go".to_string(),
                    spec: ToolSpec::new("go", &["version"]),
                    constraint: constraint_or(&lang.go.toolchain_constraint, GO_TOOLCHAIN_CONSTRAINT)?,
                    not_found_remediation: "Install Go (https://go.dev/dl/).".to_string(),
                    constraint_remediation:
                        "Install a Go release matching the constraint (https://go.dev/dl/)."
                            .to_string(),
                };
                let tinygo = ToolRequirement {
                    name: "tinygo".to_string(),
                    spec: ToolSpec::new("tinygo", &["version"]),
                    constraint: constraint_or(&lang.go.tinygo_constraint, TINYGO_TOOLCHAIN_CONSTRAINT)?,
                    not_found_remediation:
                        "Install TinyGo (https://tinygo.org/getting-started/install/).".to_string(),
                    constraint_remediation:
                        "Upgrade TinyGo to a release matching the constraint (https://tinygo.org/getting-started/install/)."
                            .to_string(),
                };
                (vec![go, tinygo], None)
            }
            Language::JavaScript | Language::AssemblyScript => {
                let node = ToolRequirement {
                    name: "node".to_string(),
                    spec: ToolSpec::new("node", &["--version"]),
                    constraint: constraint_or(
                        &lang.javascript.toolchain_constraint,
                        NODE_TOOLCHAIN_CONSTRAINT,
                    )?,
                    not_found_remediation: "Install Node.js (https://nodejs.org/).".to_string(),
                    constraint_remediation:
                        "Switch to a Node.js release matching the constraint, e.g. with `nvm install --lts`."
                            .to_string(),
                };
                (vec![node], None)
            }
            Language::Other => (Vec::new(), None),
        };

        Ok(LanguageToolchain {
            language: *self,
            tools,
            companion,
        })
    }
}

fn constraint_or(configured: &Option<String>, default: &str) -> Result<VersionConstraint> {
    VersionConstraint::parse(configured.as_deref().unwrap_or(default))
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rust" => Ok(Language::Rust),
            "go" => Ok(Language::Go),
            "javascript" => Ok(Language::JavaScript),
            "assemblyscript" => Ok(Language::AssemblyScript),
            "other" => Ok(Language::Other),
            _ => Err(Error::UnsupportedLanguage {
                language: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool that must be installed at a constrained version.
#[derive(Debug, Clone)]
pub struct ToolRequirement {
    pub name: String,
    pub spec: ToolSpec,
    pub constraint: VersionConstraint,
    pub not_found_remediation: String,
    pub constraint_remediation: String,
}

/// A library that silently depends on a companion library from some version on.
#[derive(Debug, Clone)]
pub struct CompanionRule {
    /// High-level library the project declares (`fastly`).
    pub library: String,
    /// Low-level library it pulls in (`fastly-sys`).
    pub companion: String,
    /// First `library` version that depends on `companion`.
    pub introduced: Version,
    /// Constraint the locked `companion` version must satisfy.
    pub constraint: VersionConstraint,
    /// `library` version to recommend when no release index is reachable.
    pub fallback_version: Version,
}

/// Everything verification needs for one language.
#[derive(Debug, Clone)]
pub struct LanguageToolchain {
    pub language: Language,
    pub tools: Vec<ToolRequirement>,
    pub companion: Option<CompanionRule>,
}
