//! High-level operations.
//!
//! This module contains the implementation of fastedge commands.

pub mod build;
pub mod deploy;
pub mod setup;
pub mod undo;
pub mod validate;

pub use build::{build, BuildOptions};
pub use deploy::{DeployOrchestrator, DeployOutcome, DeployRequest, DeployState, VersionSelector};
pub use undo::{UndoFailure, UndoStack};
pub use validate::{validate_package, ValidatedPackage, PACKAGE_SIZE_LIMIT};
