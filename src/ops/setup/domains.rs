//! Service domains.

use crate::api::{Domain, RemoteApi};
use crate::core::errors::{Error, Result};
use crate::ops::setup::{Provisioner, Target};
use crate::ops::undo::UndoStack;
use crate::util::context::Flags;
use crate::util::fs::sanitize_file_name;
use crate::util::hash::sha256_str;
use crate::util::prompt::Prompt;
use crate::util::shell::{Shell, Status};

/// Suffix of generated domains.
pub const DOMAIN_SUFFIX: &str = "edgecompute.app";

/// Derive the default domain for a package deployed to a service.
///
/// The same name and service always produce the same domain.
pub fn default_domain(package_name: &str, service_id: &str) -> String {
    let label = sanitize_file_name(package_name).to_lowercase();
    let label = label.trim_matches('-');
    let label = if label.is_empty() { "edge" } else { label };
    let hash = sha256_str(&format!("{}{}", package_name, service_id));
    format!("{}-{}.{}", label, &hash[..8], DOMAIN_SUFFIX)
}

/// Ensures the service version has a domain.
#[derive(Debug)]
pub struct Domains {
    target: Target,
    package_name: String,
    /// Value of `--domain`
    flag: Option<String>,
    flags: Flags,
    existing: Vec<Domain>,
    required: Vec<String>,
}

impl Domains {
    pub fn new(target: Target, package_name: &str, flag: Option<String>, flags: Flags) -> Self {
        Domains {
            target,
            package_name: package_name.to_string(),
            flag: flag.filter(|d| !d.trim().is_empty()),
            flags,
            existing: Vec::new(),
            required: Vec::new(),
        }
    }

    /// Fetch the domains already on the target version.
    pub fn load(&mut self, api: &dyn RemoteApi) -> Result<()> {
        self.existing = api
            .list_domains(&self.target.service_id, self.target.version)
            .map_err(|e| Error::remote("error fetching service domains", e))?;
        tracing::debug!(
            service_id = %self.target.service_id,
            version = self.target.version,
            count = self.existing.len(),
            "loaded domains"
        );
        Ok(())
    }

    /// Domains on the target version when [`Domains::load`] ran.
    pub fn existing(&self) -> &[Domain] {
        &self.existing
    }

    /// Domains `create` will add.
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Provisioner for Domains {
    fn resource(&self) -> &'static str {
        "domain"
    }

    fn predefined(&self) -> bool {
        self.flag.is_some()
    }

    fn missing(&self) -> bool {
        self.existing.is_empty()
    }

    fn configure(&mut self, prompt: &mut dyn Prompt, _shell: &Shell) -> Result<()> {
        let domain = match &self.flag {
            Some(domain) => domain.trim().to_string(),
            None => {
                let default = default_domain(&self.package_name, &self.target.service_id);
                if self.flags.prompts_allowed() {
                    prompt.input("Domain", Some(&default))?.trim().to_string()
                } else {
                    default
                }
            }
        };

        if domain.is_empty() {
            return Err(Error::InvalidInput {
                resource: "domain",
                message: "a domain name is required".to_string(),
            });
        }
        if domain.contains(char::is_whitespace) {
            return Err(Error::InvalidInput {
                resource: "domain",
                message: format!("'{}' contains whitespace", domain),
            });
        }

        self.required = vec![domain];
        Ok(())
    }

    fn create<'a>(
        &self,
        api: &'a dyn RemoteApi,
        shell: &Shell,
        undo: &mut UndoStack<'a>,
    ) -> Result<()> {
        for name in &self.required {
            let spinner = shell.spinner(Status::Creating, format!("domain '{}'...", name));
            api.create_domain(&self.target.service_id, self.target.version, name)
                .map_err(|e| Error::remote(format!("error creating domain '{}'", name), e))?;
            spinner.finish();

            let service_id = self.target.service_id.clone();
            let version = self.target.version;
            let domain = name.clone();
            undo.push(format!("delete domain {}", name), move || {
                api.delete_domain(&service_id, version, &domain)?;
                Ok(())
            });
            shell.status(Status::Created, format!("domain '{}'", name));
        }
        Ok(())
    }
}
