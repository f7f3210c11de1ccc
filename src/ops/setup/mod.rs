//! Remote resources a service needs before its package can go live.
//!
//! Each provisioner works in two phases. `configure` settles what should
//! exist, asking the operator where the flags allow it. `create` makes the
//! remote calls and registers a compensating action for every resource it
//! creates, so a later failure can tear them down again.

pub mod backends;
pub mod dictionaries;
pub mod domains;
pub mod loggers;

use crate::api::RemoteApi;
use crate::core::errors::{Error, Result};
use crate::ops::undo::UndoStack;
use crate::util::prompt::Prompt;
use crate::util::shell::Shell;

pub use backends::Backends;
pub use dictionaries::Dictionaries;
pub use domains::{default_domain, Domains};
pub use loggers::Loggers;

/// The service version resources are provisioned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub service_id: String,
    pub version: u32,
}

impl Target {
    pub fn new(service_id: impl Into<String>, version: u32) -> Self {
        Target {
            service_id: service_id.into(),
            version,
        }
    }
}

/// A kind of remote resource that can be set up for a service.
pub trait Provisioner {
    /// Resource name used in messages, e.g. `"backend"`.
    fn resource(&self) -> &'static str;

    /// Whether the manifest or flags fully declare this resource.
    fn predefined(&self) -> bool;

    /// Whether the target version still lacks this resource.
    fn missing(&self) -> bool;

    /// Settle what to create, prompting where allowed.
    fn configure(&mut self, prompt: &mut dyn Prompt, shell: &Shell) -> Result<()>;

    /// Create the configured resources, registering their reversals.
    fn create<'a>(
        &self,
        api: &'a dyn RemoteApi,
        shell: &Shell,
        undo: &mut UndoStack<'a>,
    ) -> Result<()>;
}

/// Parse a port answer.
pub(crate) fn parse_port(resource: &'static str, input: &str) -> Result<u16> {
    input
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| Error::InvalidInput {
            resource,
            message: format!("'{}' is not a valid port number", input.trim()),
        })
}
