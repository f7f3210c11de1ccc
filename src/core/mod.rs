//! Core data structures for fastedge.
//!
//! This module contains the foundational types used throughout fastedge:
//! - Version constraints and lenient version parsing
//! - The project manifest
//! - Dependency snapshots
//! - The error taxonomy

pub mod constraint;
pub mod errors;
pub mod lockfile;
pub mod manifest;
pub mod version;

pub use constraint::VersionConstraint;
pub use lockfile::{CargoSnapshot, DependencyGraph, DependencySnapshot, SnapshotError};
pub use manifest::{ManifestData, ManifestFile, Source, MANIFEST_NAME};
