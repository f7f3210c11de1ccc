//! Build environment checks and packaging.
//!
//! This module knows what each supported language needs installed, verifies
//! a project against those requirements and writes package archives.

pub mod language;
pub mod package;
pub mod toolchain;
pub mod verify;

pub use language::{CompanionRule, Language, LanguageToolchain, ToolRequirement};
pub use package::{package_path, write_package, WASM_BINARY_PATH};
pub use toolchain::{CommandProbe, ProbeError, ToolSpec, ToolchainProbe};
pub use verify::{ToolchainReport, ToolchainVerifier};
