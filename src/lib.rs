//! fastedge - build and deploy edge-compute Wasm packages
//!
//! This crate provides the library behind the `fastedge` CLI: toolchain
//! verification against version constraints, package validation and
//! fingerprinting, and a deploy state machine that provisions remote
//! resources and rolls them back if a later step fails.

pub mod api;
pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and fakes for fastedge unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a recording remote API, scripted prompts, static toolchain
/// probes and tarball fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    constraint::VersionConstraint,
    errors::{Error, ErrorKind, Result},
    manifest::{ManifestData, ManifestFile},
};

pub use ops::deploy::{DeployOrchestrator, DeployOutcome};
pub use util::context::GlobalContext;
