//! Deploying a validated package to a service.
//!
//! The orchestrator walks a fixed sequence of states:
//!
//! ```text
//! SelectService -> ValidateResources -> ConfigureResources
//!     -> CompareArtifact -> Upload -> Activate -> Done
//! ```
//!
//! Any failure enters `RollingBack`, which runs the compensating actions
//! registered so far (newest first) and then returns the original error.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use crate::api::{
    ApiError, RemoteApi, Service, ServiceVersion, TrialActivator, TRIAL_NOT_ACTIVATED,
    WASM_SERVICE_TYPE,
};
use crate::core::errors::{Error, Result};
use crate::core::manifest::{write_service_id, Setup};
use crate::ops::setup::{Backends, Dictionaries, Domains, Loggers, Provisioner, Target};
use crate::ops::undo::{UndoFailure, UndoStack};
use crate::ops::validate::ValidatedPackage;
use crate::util::context::Flags;
use crate::util::diagnostic::suggestions;
use crate::util::prompt::Prompt;
use crate::util::shell::{Shell, Status};

/// Web console page for a service, followed by its ID.
pub const MANAGE_SERVICE_BASE_URL: &str = "https://manage.fastly.com/configure/services/";

const NO_SERVICE_EXPLANATION: &str = "There is no service associated with this package. \
To connect to an existing service add the service ID to the fastedge.toml file, \
otherwise follow the prompts to create a service now.\n\nPress ^C at any time to quit.\n";

/// Which version of an existing service to deploy to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSelector {
    /// The highest numbered version.
    #[default]
    Latest,
    /// The currently active version.
    Active,
    Number(u32),
}

impl FromStr for VersionSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(VersionSelector::Latest),
            "active" => Ok(VersionSelector::Active),
            other => other.parse::<u32>().map(VersionSelector::Number).map_err(|_| {
                format!(
                    "invalid version '{}'; expected 'latest', 'active' or a version number",
                    s
                )
            }),
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => write!(f, "latest"),
            VersionSelector::Active => write!(f, "active"),
            VersionSelector::Number(n) => write!(f, "{}", n),
        }
    }
}

impl VersionSelector {
    /// Pick the matching version from a service's versions.
    pub fn resolve<'v>(&self, versions: &'v [ServiceVersion]) -> Option<&'v ServiceVersion> {
        match self {
            VersionSelector::Latest => versions.iter().max_by_key(|v| v.number),
            VersionSelector::Active => versions.iter().find(|v| v.active),
            VersionSelector::Number(n) => versions.iter().find(|v| v.number == *n),
        }
    }
}

/// Everything a deploy needs to know.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub package: ValidatedPackage,
    /// Target service; `None` creates a new one.
    pub service_id: Option<String>,
    pub version: VersionSelector,
    pub comment: Option<String>,
    /// Value of `--domain`.
    pub domain: Option<String>,
    /// Manifest to record a newly created service in. `None` when the
    /// package was given explicitly and may not belong to a project.
    pub manifest_path: Option<PathBuf>,
    pub setup: Setup,
}

/// How a deploy ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed { service_id: String, version: u32 },
    /// The service already runs this exact package.
    Unchanged { service_id: String, version: u32 },
    /// The operator chose not to create a service.
    Declined,
}

/// Deploy steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    SelectService,
    ValidateResources,
    ConfigureResources,
    CompareArtifact,
    Upload,
    Activate,
    Done,
    RollingBack,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::SelectService => "select-service",
            DeployState::ValidateResources => "validate-resources",
            DeployState::ConfigureResources => "configure-resources",
            DeployState::CompareArtifact => "compare-artifact",
            DeployState::Upload => "upload",
            DeployState::Activate => "activate",
            DeployState::Done => "done",
            DeployState::RollingBack => "rolling-back",
        };
        f.write_str(name)
    }
}

/// The service version a deploy operates on.
#[derive(Debug)]
struct Selected {
    service_id: String,
    version: u32,
    new_service: bool,
}

/// Runs deploys against a remote API.
pub struct DeployOrchestrator<'a> {
    api: &'a dyn RemoteApi,
    trial: &'a dyn TrialActivator,
    shell: &'a Shell,
    flags: Flags,
    states: Vec<DeployState>,
    rollback_failures: Vec<UndoFailure>,
}

impl<'a> DeployOrchestrator<'a> {
    pub fn new(
        api: &'a dyn RemoteApi,
        trial: &'a dyn TrialActivator,
        shell: &'a Shell,
        flags: Flags,
    ) -> Self {
        DeployOrchestrator {
            api,
            trial,
            shell,
            flags,
            states: Vec::new(),
            rollback_failures: Vec::new(),
        }
    }

    /// States entered by the last deploy, in order.
    pub fn states(&self) -> &[DeployState] {
        &self.states
    }

    /// Compensating actions that failed during the last rollback.
    pub fn rollback_failures(&self) -> &[UndoFailure] {
        &self.rollback_failures
    }

    /// Deploy a package, rolling back created resources on failure.
    pub fn deploy(
        &mut self,
        request: &DeployRequest,
        prompt: &mut dyn Prompt,
    ) -> Result<DeployOutcome> {
        self.states.clear();
        self.rollback_failures.clear();

        let mut undo = UndoStack::new();
        match self.run(request, prompt, &mut undo) {
            Ok(outcome) => {
                undo.clear();
                Ok(outcome)
            }
            Err(err) => {
                self.enter(DeployState::RollingBack);
                if !undo.is_empty() {
                    self.shell
                        .warn(format!("Deploy failed, undoing {} change(s)", undo.len()));
                }
                for failure in undo.unwind() {
                    self.shell.warn(format!("Failed to {}", failure));
                    self.rollback_failures.push(failure);
                }
                Err(err)
            }
        }
    }

    fn enter(&mut self, state: DeployState) {
        tracing::debug!(%state, "deploy state");
        self.states.push(state);
    }

    fn run(
        &mut self,
        request: &DeployRequest,
        prompt: &mut dyn Prompt,
        undo: &mut UndoStack<'a>,
    ) -> Result<DeployOutcome> {
        self.enter(DeployState::SelectService);
        let selected = match &request.service_id {
            Some(id) if !id.is_empty() => self.existing_service(id, request.version)?,
            _ => match self.new_service(request, prompt, undo)? {
                Some(selected) => selected,
                None => return Ok(DeployOutcome::Declined),
            },
        };
        let target = Target::new(selected.service_id.clone(), selected.version);
        tracing::info!(
            service_id = %target.service_id,
            version = target.version,
            new_service = selected.new_service,
            "deploying"
        );

        self.enter(DeployState::ValidateResources);
        if !selected.new_service {
            self.api
                .get_service(&target.service_id)
                .map_err(|source| Error::ServiceNotFound {
                    service_id: target.service_id.clone(),
                    source,
                })?;
        }
        let mut domains = Domains::new(
            target.clone(),
            &request.package.name,
            request.domain.clone(),
            self.flags,
        );
        domains.load(self.api)?;

        self.enter(DeployState::ConfigureResources);
        let mut provisioners: Vec<Box<dyn Provisioner>> = vec![Box::new(domains)];
        if selected.new_service {
            let setup = &request.setup;
            provisioners.push(Box::new(Backends::new(
                target.clone(),
                setup.backends.clone(),
                self.flags,
            )));
            provisioners.push(Box::new(Dictionaries::new(
                target.clone(),
                setup.dictionaries.clone(),
                self.flags,
            )));
            provisioners.push(Box::new(Loggers::new(setup.log_endpoints.clone())));
        }

        for provisioner in provisioners.iter_mut().filter(|p| p.missing()) {
            tracing::debug!(resource = provisioner.resource(), "configuring");
            provisioner.configure(prompt, self.shell)?;
        }
        for provisioner in provisioners.iter().filter(|p| p.missing()) {
            provisioner.create(self.api, self.shell, undo)?;
        }

        self.enter(DeployState::CompareArtifact);
        match self.api.get_package(&target.service_id, target.version) {
            Ok(package) if package.metadata.hash_sum == request.package.fingerprint => {
                self.shell.note(format!(
                    "Skipping package deployment, local and service version are identical. (service {}, version {})",
                    target.service_id, target.version
                ));
                return Ok(DeployOutcome::Unchanged {
                    service_id: target.service_id,
                    version: target.version,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("no stored package to compare: {}", e),
        }

        self.enter(DeployState::Upload);
        let spinner = self.shell.spinner(Status::Uploading, "package...");
        self.api
            .upload_package(&target.service_id, target.version, &request.package.path)
            .map_err(|e| Error::remote("error uploading package", e))?;
        spinner.finish();
        tracing::info!(package_path = %request.package.path.display(), "uploaded package");

        if let Some(comment) = &request.comment {
            self.api
                .update_version_comment(&target.service_id, target.version, comment)
                .map_err(|e| {
                    Error::remote(
                        format!("error setting comment for service version {}", target.version),
                        e,
                    )
                })?;
        }

        self.enter(DeployState::Activate);
        let spinner = self
            .shell
            .spinner(Status::Activating, format!("version {}...", target.version));
        self.api
            .activate_version(&target.service_id, target.version)
            .map_err(|e| Error::remote("error activating version", e))?;
        spinner.finish();

        self.enter(DeployState::Done);
        self.display(&target);

        Ok(DeployOutcome::Deployed {
            service_id: target.service_id,
            version: target.version,
        })
    }

    fn new_service(
        &mut self,
        request: &DeployRequest,
        prompt: &mut dyn Prompt,
        undo: &mut UndoStack<'a>,
    ) -> Result<Option<Selected>> {
        if self.flags.confirmations_allowed() {
            self.shell.out(NO_SERVICE_EXPLANATION);
            if !prompt.confirm("Create new service:", false)? {
                tracing::debug!("service creation declined");
                return Ok(None);
            }
        }

        let name = &request.package.name;
        let spinner = self.shell.spinner(Status::Creating, format!("service '{}'...", name));
        let service = self.create_service(name)?;
        spinner.finish();

        let api = self.api;
        let service_id = service.id.clone();
        undo.push(format!("delete service {}", service.id), move || {
            api.delete_service(&service_id)?;
            Ok(())
        });
        self.shell
            .status(Status::Created, format!("service '{}' ({})", name, service.id));

        if let Some(path) = &request.manifest_path {
            write_service_id(path, &service.id)
                .with_context(|| format!("error saving package manifest: {}", path.display()))?;
            let path = path.clone();
            undo.push(
                format!("clear service_id in {}", path.display()),
                move || write_service_id(&path, ""),
            );
        }

        Ok(Some(Selected {
            service_id: service.id,
            version: 1,
            new_service: true,
        }))
    }

    /// Create a service, activating the trial and retrying once if the
    /// account doesn't have it yet.
    fn create_service(&self, name: &str) -> Result<Service> {
        match self.api.create_service(name, WASM_SERVICE_TYPE) {
            Ok(service) => return Ok(service),
            Err(e) if !is_trial_error(&e) => {
                return Err(Error::remote("error creating service", e));
            }
            Err(_) => {}
        }

        let user = self.api.current_user().map_err(|source| Error::Remote {
            context: "unable to identify user associated with the given token".to_string(),
            source,
            remediation: Some(format!(
                "To ensure you have access to the edge-compute platform we need your customer ID. {}",
                suggestions::AUTH
            )),
        })?;

        tracing::info!(customer_id = %user.customer_id, "activating edge-compute trial");
        self.trial.activate_trial(&user.customer_id).map_err(|e| {
            tracing::debug!("trial activation failed: {}", e);
            Error::TrialNotEnabled
        })?;

        match self.api.create_service(name, WASM_SERVICE_TYPE) {
            Ok(service) => Ok(service),
            Err(e) if is_trial_error(&e) => Err(Error::TrialNotEnabled),
            Err(e) => Err(Error::remote("error creating service", e)),
        }
    }

    fn existing_service(&self, service_id: &str, selector: VersionSelector) -> Result<Selected> {
        let versions = self
            .api
            .list_versions(service_id)
            .map_err(|e| service_error(service_id, "error listing service versions", e))?;
        let version = selector
            .resolve(&versions)
            .cloned()
            .ok_or_else(|| Error::UnknownVersion {
                service_id: service_id.to_string(),
                version: selector.to_string(),
            })?;

        let details = self
            .api
            .service_details(service_id)
            .map_err(|e| service_error(service_id, "error fetching service details", e))?;
        if details.service_type != WASM_SERVICE_TYPE {
            return Err(Error::WrongServiceType {
                service_id: service_id.to_string(),
                service_type: details.service_type,
            });
        }

        if !version.is_frozen() {
            return Ok(Selected {
                service_id: service_id.to_string(),
                version: version.number,
                new_service: false,
            });
        }

        let cloned = self
            .api
            .clone_version(service_id, version.number)
            .map_err(|e| Error::remote("error cloning service version", e))?;
        if self.shell.is_verbose() {
            self.shell.note(format!(
                "Service version {} is not editable, so it was automatically cloned. Now operating on version {}.",
                version.number, cloned.number
            ));
        }
        tracing::debug!(from = version.number, to = cloned.number, "cloned version");

        Ok(Selected {
            service_id: service_id.to_string(),
            version: cloned.number,
            new_service: false,
        })
    }

    fn display(&self, target: &Target) {
        self.shell.describe(
            "Manage this service at",
            format!("{}{}", MANAGE_SERVICE_BASE_URL, target.service_id),
        );

        if let Ok(domains) = self.api.list_domains(&target.service_id, target.version) {
            if let Some(domain) = domains.first() {
                let name = domain.name.strip_prefix("*.").unwrap_or(&domain.name);
                self.shell
                    .describe("View this service at", format!("https://{}", name));
            }
        }

        self.shell.status(
            Status::Deployed,
            format!(
                "package (service {}, version {})",
                target.service_id, target.version
            ),
        );
    }
}

fn is_trial_error(e: &ApiError) -> bool {
    e.to_string().contains(TRIAL_NOT_ACTIVATED)
}

fn service_error(service_id: &str, context: &str, e: ApiError) -> Error {
    if e.status() == Some(404) {
        Error::ServiceNotFound {
            service_id: service_id.to_string(),
            source: e,
        }
    } else {
        Error::remote(context, e)
    }
}
