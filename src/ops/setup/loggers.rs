//! Log endpoints declared in `[setup.log_endpoints]`.
//!
//! Provider settings vary too much to collect interactively, so this only
//! tells the operator which endpoints the package expects.

use std::collections::BTreeMap;

use crate::api::RemoteApi;
use crate::core::errors::Result;
use crate::core::manifest::LoggerSetup;
use crate::ops::setup::Provisioner;
use crate::ops::undo::UndoStack;
use crate::util::prompt::Prompt;
use crate::util::shell::Shell;

#[derive(Debug)]
pub struct Loggers {
    setup: BTreeMap<String, LoggerSetup>,
}

impl Loggers {
    pub fn new(setup: BTreeMap<String, LoggerSetup>) -> Self {
        Loggers { setup }
    }

    /// Guidance lines, one per endpoint.
    pub fn guidance(&self) -> Vec<String> {
        self.setup
            .iter()
            .map(|(name, setup)| match &setup.provider {
                Some(provider) => format!(
                    "The package expects a {} log endpoint named '{}'",
                    provider, name
                ),
                None => format!("The package expects a log endpoint named '{}'", name),
            })
            .collect()
    }
}

impl Provisioner for Loggers {
    fn resource(&self) -> &'static str {
        "log endpoint"
    }

    fn predefined(&self) -> bool {
        !self.setup.is_empty()
    }

    fn missing(&self) -> bool {
        self.predefined()
    }

    fn configure(&mut self, _prompt: &mut dyn Prompt, shell: &Shell) -> Result<()> {
        for line in self.guidance() {
            shell.note(line);
        }
        if self.predefined() {
            shell.note("Create these log endpoints on the service before sending traffic to it");
        }
        Ok(())
    }

    fn create<'a>(
        &self,
        _api: &'a dyn RemoteApi,
        _shell: &Shell,
        _undo: &mut UndoStack<'a>,
    ) -> Result<()> {
        Ok(())
    }
}
