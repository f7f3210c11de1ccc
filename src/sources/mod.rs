//! Release sources.
//!
//! Sources answer questions about published library releases, used to
//! recommend a known-good version in remediation text.

pub mod crates_io;

pub use crates_io::{CratesIo, FixedRelease, ReleaseIndex};
