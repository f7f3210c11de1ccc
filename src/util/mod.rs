//! Shared utilities

pub mod archive;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;
pub mod prompt;
pub mod shell;

pub use config::Config;
pub use context::{Flags, GlobalContext};
pub use diagnostic::Diagnostic;
pub use prompt::{stdio_prompt, Prompt, StreamPrompt, TermPrompt};
pub use shell::{Shell, Status};
