//! Command implementations

pub mod build;
pub mod completions;
pub mod deploy;
pub mod toolchain;
