//! Service backends.
//!
//! A service can't be activated without at least one backend, so backends
//! are always configured for a new service: from `[setup.backends]`, from
//! operator input, or as a single placeholder when neither gives any.

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::api::{NewBackend, RemoteApi};
use crate::core::errors::{Error, Result};
use crate::core::manifest::BackendSetup;
use crate::ops::setup::{parse_port, Provisioner, Target};
use crate::ops::undo::UndoStack;
use crate::util::context::Flags;
use crate::util::prompt::Prompt;
use crate::util::shell::{Shell, Status};

/// Placeholder used when a package needs no origin.
pub const ORIGINLESS_NAME: &str = "originless";
pub const ORIGINLESS_ADDRESS: &str = "127.0.0.1";
pub const ORIGINLESS_PORT: u16 = 80;

const DEFAULT_PORT: u16 = 443;

/// Sets up the backends of a new service.
#[derive(Debug)]
pub struct Backends {
    target: Target,
    setup: BTreeMap<String, BackendSetup>,
    flags: Flags,
    required: Vec<NewBackend>,
}

impl Backends {
    pub fn new(target: Target, setup: BTreeMap<String, BackendSetup>, flags: Flags) -> Self {
        Backends {
            target,
            setup,
            flags,
            required: Vec::new(),
        }
    }

    /// Backends `create` will add.
    pub fn required(&self) -> &[NewBackend] {
        &self.required
    }

    fn configure_predefined(&mut self, prompt: &mut dyn Prompt, shell: &Shell) -> Result<()> {
        let interactive = self.flags.prompts_allowed();
        for (name, setup) in &self.setup {
            if interactive {
                if let Some(description) = &setup.description {
                    shell.note(description);
                }
            }

            let mut address = setup.address.clone().unwrap_or_default();
            let mut port = setup.port.unwrap_or(DEFAULT_PORT);
            if interactive {
                address = prompt
                    .input(&format!("Hostname or IP address for '{}'", name), Some(&address))?
                    .trim()
                    .to_string();
                let answer = prompt.input("Port number", Some(&port.to_string()))?;
                port = parse_port("backend", &answer)?;
            }

            if address.is_empty() {
                return Err(Error::InvalidInput {
                    resource: "backend",
                    message: format!("an address is required for '{}'", name),
                });
            }
            self.required.push(new_backend(name, &address, port));
        }
        Ok(())
    }

    fn configure_interactive(&mut self, prompt: &mut dyn Prompt) -> Result<()> {
        loop {
            let address = prompt
                .input(
                    "Backend (hostname or IP address, or leave blank to stop adding backends)",
                    None,
                )?
                .trim()
                .to_string();
            if address.is_empty() {
                return Ok(());
            }

            let answer = prompt.input("Backend port number", Some(&DEFAULT_PORT.to_string()))?;
            let port = parse_port("backend", &answer)?;

            let default_name = format!("backend_{}", self.required.len() + 1);
            let name = prompt.input("Backend name", Some(&default_name))?;
            let name = match name.trim() {
                "" => default_name,
                name => name.to_string(),
            };
            self.required.push(new_backend(&name, &address, port));
        }
    }
}

fn new_backend(name: &str, address: &str, port: u16) -> NewBackend {
    // TLS origins addressed by hostname need the Host header to match.
    let override_host =
        (port == DEFAULT_PORT && address.parse::<IpAddr>().is_err()).then(|| address.to_string());
    NewBackend {
        name: name.to_string(),
        address: address.to_string(),
        port,
        override_host,
    }
}

impl Provisioner for Backends {
    fn resource(&self) -> &'static str {
        "backend"
    }

    fn predefined(&self) -> bool {
        !self.setup.is_empty()
    }

    /// New services start without backends.
    fn missing(&self) -> bool {
        true
    }

    fn configure(&mut self, prompt: &mut dyn Prompt, shell: &Shell) -> Result<()> {
        self.required.clear();
        if self.predefined() {
            self.configure_predefined(prompt, shell)?;
        } else if self.flags.prompts_allowed() {
            self.configure_interactive(prompt)?;
        }

        if self.required.is_empty() {
            tracing::debug!("no backends given, using {}", ORIGINLESS_NAME);
            self.required
                .push(new_backend(ORIGINLESS_NAME, ORIGINLESS_ADDRESS, ORIGINLESS_PORT));
        }
        Ok(())
    }

    fn create<'a>(
        &self,
        api: &'a dyn RemoteApi,
        shell: &Shell,
        undo: &mut UndoStack<'a>,
    ) -> Result<()> {
        for backend in &self.required {
            let spinner = shell.spinner(
                Status::Creating,
                format!("backend '{}' ({}:{})...", backend.name, backend.address, backend.port),
            );
            api.create_backend(&self.target.service_id, self.target.version, backend)
                .map_err(|e| Error::remote(format!("error creating backend '{}'", backend.name), e))?;
            spinner.finish();

            let service_id = self.target.service_id.clone();
            let version = self.target.version;
            let name = backend.name.clone();
            undo.push(format!("delete backend {}", backend.name), move || {
                api.delete_backend(&service_id, version, &name)?;
                Ok(())
            });
            shell.status(Status::Created, format!("backend '{}'", backend.name));
        }
        Ok(())
    }
}
