//! Test utilities and fakes for fastedge unit tests.
//!
//! This module provides in-memory stand-ins for the seams that would
//! otherwise need a network, a terminal or an installed toolchain: the
//! remote API, operator prompts, toolchain probes and the release index.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{FakeApi, ScriptedPrompt};
//!
//! #[test]
//! fn test_example() {
//!     let api = FakeApi::new().with_service("SVC1", "wasm", &[1]);
//!     let mut prompt = ScriptedPrompt::new().answer("y");
//!
//!     // Drive the deploy orchestrator with `&api` and `&mut prompt`...
//!     assert_eq!(api.count("upload_package"), 1);
//! }
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

use anyhow::{bail, Result};
use semver::Version;

use crate::api::{
    ApiError, Backend, Dictionary, Domain, NewBackend, Package, PackageMetadata, RemoteApi,
    Service, ServiceDetails, ServiceVersion, TrialActivator, User, TRIAL_NOT_ACTIVATED,
};
use crate::builder::toolchain::{ProbeError, ToolSpec, ToolchainProbe};
use crate::ops::validate::fingerprint_package;
use crate::sources::ReleaseIndex;
use crate::util::prompt::Prompt;

pub use fixtures::*;

/// Customer the fake API's current user belongs to.
pub const FAKE_CUSTOMER_ID: &str = "CUST1";

#[derive(Debug, Clone)]
struct FakeService {
    name: String,
    service_type: String,
    versions: Vec<ServiceVersion>,
}

type VersionKey = (String, u32);

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<ApiError>>,
    next_id: u32,
    services: BTreeMap<String, FakeService>,
    domains: BTreeMap<VersionKey, Vec<Domain>>,
    backends: BTreeMap<VersionKey, Vec<Backend>>,
    dictionaries: BTreeMap<VersionKey, Vec<Dictionary>>,
    items: Vec<(String, String, String)>,
    packages: BTreeMap<VersionKey, String>,
    trial_activated: bool,
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{} not found", what),
    }
}

/// In-memory remote API that records every call.
///
/// Calls are recorded as `"<method> <args>"`. A failure queued with
/// [`FakeApi::fail`] is returned by the next call of that method instead of
/// touching the state.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: RefCell<FakeState>,
}

impl FakeApi {
    /// Create an empty fake with no services.
    pub fn new() -> Self {
        FakeApi::default()
    }

    /// Add a service with editable versions numbered as given.
    pub fn with_service(self, id: &str, service_type: &str, versions: &[u32]) -> Self {
        self.state.borrow_mut().services.insert(
            id.to_string(),
            FakeService {
                name: format!("{}-name", id),
                service_type: service_type.to_string(),
                versions: versions
                    .iter()
                    .map(|&number| ServiceVersion {
                        number,
                        active: false,
                        locked: false,
                    })
                    .collect(),
            },
        );
        self
    }

    /// Mark a version active.
    pub fn with_active(self, id: &str, version: u32) -> Self {
        self.set_version_flags(id, version, true, false);
        self
    }

    /// Mark a version locked.
    pub fn with_locked(self, id: &str, version: u32) -> Self {
        self.set_version_flags(id, version, false, true);
        self
    }

    pub fn with_domain(self, id: &str, version: u32, name: &str) -> Self {
        self.state
            .borrow_mut()
            .domains
            .entry((id.to_string(), version))
            .or_default()
            .push(Domain {
                name: name.to_string(),
            });
        self
    }

    /// Store a package fingerprint for a version.
    pub fn with_package(self, id: &str, version: u32, hash: &str) -> Self {
        self.state
            .borrow_mut()
            .packages
            .insert((id.to_string(), version), hash.to_string());
        self
    }

    /// Make the next call of `method` fail with `error`.
    pub fn fail(&self, method: &str, error: ApiError) -> &Self {
        self.state
            .borrow_mut()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(error);
        self
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Method names of every recorded call, in order.
    pub fn methods(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    /// How many times `method` was called.
    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    /// Whether the service currently exists.
    pub fn has_service(&self, id: &str) -> bool {
        self.state.borrow().services.contains_key(id)
    }

    /// Version metadata of a service.
    pub fn versions(&self, id: &str) -> Vec<ServiceVersion> {
        self.state
            .borrow()
            .services
            .get(id)
            .map(|s| s.versions.clone())
            .unwrap_or_default()
    }

    pub fn domains(&self, id: &str, version: u32) -> Vec<String> {
        self.state
            .borrow()
            .domains
            .get(&(id.to_string(), version))
            .map(|d| d.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn backends(&self, id: &str, version: u32) -> Vec<Backend> {
        self.state
            .borrow()
            .backends
            .get(&(id.to_string(), version))
            .cloned()
            .unwrap_or_default()
    }

    pub fn dictionaries(&self, id: &str, version: u32) -> Vec<String> {
        self.state
            .borrow()
            .dictionaries
            .get(&(id.to_string(), version))
            .map(|d| d.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Dictionary items as `(dictionary_id, key, value)`.
    pub fn items(&self) -> Vec<(String, String, String)> {
        self.state.borrow().items.clone()
    }

    pub fn trial_activated(&self) -> bool {
        self.state.borrow().trial_activated
    }

    fn set_version_flags(&self, id: &str, version: u32, active: bool, locked: bool) {
        let mut state = self.state.borrow_mut();
        if let Some(service) = state.services.get_mut(id) {
            for v in service.versions.iter_mut().filter(|v| v.number == version) {
                v.active |= active;
                v.locked |= locked;
            }
        }
    }

    fn record(&self, method: &str, args: String) -> Result<(), ApiError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("{} {}", method, args).trim_end().to_string());
        match state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn require_service(&self, id: &str) -> Result<(), ApiError> {
        if self.state.borrow().services.contains_key(id) {
            Ok(())
        } else {
            Err(not_found("service"))
        }
    }
}

impl RemoteApi for FakeApi {
    fn create_service(&self, name: &str, service_type: &str) -> Result<Service, ApiError> {
        self.record("create_service", format!("{} {}", name, service_type))?;
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("NEWSVC{}", state.next_id);
        state.services.insert(
            id.clone(),
            FakeService {
                name: name.to_string(),
                service_type: service_type.to_string(),
                versions: vec![ServiceVersion {
                    number: 1,
                    active: false,
                    locked: false,
                }],
            },
        );
        Ok(Service {
            id,
            name: name.to_string(),
            service_type: service_type.to_string(),
        })
    }

    fn get_service(&self, service_id: &str) -> Result<Service, ApiError> {
        self.record("get_service", service_id.to_string())?;
        let state = self.state.borrow();
        let service = state.services.get(service_id).ok_or_else(|| not_found("service"))?;
        Ok(Service {
            id: service_id.to_string(),
            name: service.name.clone(),
            service_type: service.service_type.clone(),
        })
    }

    fn service_details(&self, service_id: &str) -> Result<ServiceDetails, ApiError> {
        self.record("service_details", service_id.to_string())?;
        let state = self.state.borrow();
        let service = state.services.get(service_id).ok_or_else(|| not_found("service"))?;
        Ok(ServiceDetails {
            id: service_id.to_string(),
            name: service.name.clone(),
            service_type: service.service_type.clone(),
            versions: service.versions.clone(),
        })
    }

    fn delete_service(&self, service_id: &str) -> Result<(), ApiError> {
        self.record("delete_service", service_id.to_string())?;
        self.state
            .borrow_mut()
            .services
            .remove(service_id)
            .map(|_| ())
            .ok_or_else(|| not_found("service"))
    }

    fn list_versions(&self, service_id: &str) -> Result<Vec<ServiceVersion>, ApiError> {
        self.record("list_versions", service_id.to_string())?;
        self.require_service(service_id)?;
        Ok(self.versions(service_id))
    }

    fn clone_version(&self, service_id: &str, version: u32) -> Result<ServiceVersion, ApiError> {
        self.record("clone_version", format!("{} {}", service_id, version))?;
        let mut state = self.state.borrow_mut();
        let service = state
            .services
            .get_mut(service_id)
            .ok_or_else(|| not_found("service"))?;
        let number = service.versions.iter().map(|v| v.number).max().unwrap_or(0) + 1;
        let cloned = ServiceVersion {
            number,
            active: false,
            locked: false,
        };
        service.versions.push(cloned.clone());

        let from = (service_id.to_string(), version);
        let to = (service_id.to_string(), number);
        if let Some(domains) = state.domains.get(&from).cloned() {
            state.domains.insert(to.clone(), domains);
        }
        if let Some(backends) = state.backends.get(&from).cloned() {
            state.backends.insert(to.clone(), backends);
        }
        if let Some(dictionaries) = state.dictionaries.get(&from).cloned() {
            state.dictionaries.insert(to.clone(), dictionaries);
        }
        if let Some(package) = state.packages.get(&from).cloned() {
            state.packages.insert(to, package);
        }
        Ok(cloned)
    }

    fn activate_version(&self, service_id: &str, version: u32) -> Result<ServiceVersion, ApiError> {
        self.record("activate_version", format!("{} {}", service_id, version))?;
        let mut state = self.state.borrow_mut();
        let service = state
            .services
            .get_mut(service_id)
            .ok_or_else(|| not_found("service"))?;
        let mut activated = None;
        for v in service.versions.iter_mut() {
            v.active = v.number == version;
            if v.active {
                activated = Some(v.clone());
            }
        }
        activated.ok_or_else(|| not_found("version"))
    }

    fn update_version_comment(
        &self,
        service_id: &str,
        version: u32,
        comment: &str,
    ) -> Result<(), ApiError> {
        self.record(
            "update_version_comment",
            format!("{} {} {}", service_id, version, comment),
        )
    }

    fn list_domains(&self, service_id: &str, version: u32) -> Result<Vec<Domain>, ApiError> {
        self.record("list_domains", format!("{} {}", service_id, version))?;
        Ok(self
            .state
            .borrow()
            .domains
            .get(&(service_id.to_string(), version))
            .cloned()
            .unwrap_or_default())
    }

    fn create_domain(&self, service_id: &str, version: u32, name: &str) -> Result<Domain, ApiError> {
        self.record("create_domain", format!("{} {} {}", service_id, version, name))?;
        let domain = Domain {
            name: name.to_string(),
        };
        self.state
            .borrow_mut()
            .domains
            .entry((service_id.to_string(), version))
            .or_default()
            .push(domain.clone());
        Ok(domain)
    }

    fn delete_domain(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError> {
        self.record("delete_domain", format!("{} {} {}", service_id, version, name))?;
        if let Some(domains) = self
            .state
            .borrow_mut()
            .domains
            .get_mut(&(service_id.to_string(), version))
        {
            domains.retain(|d| d.name != name);
        }
        Ok(())
    }

    fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>, ApiError> {
        self.record("list_backends", format!("{} {}", service_id, version))?;
        Ok(self.backends(service_id, version))
    }

    fn create_backend(
        &self,
        service_id: &str,
        version: u32,
        backend: &NewBackend,
    ) -> Result<Backend, ApiError> {
        self.record(
            "create_backend",
            format!(
                "{} {} {} {}:{}",
                service_id, version, backend.name, backend.address, backend.port
            ),
        )?;
        let created = Backend {
            name: backend.name.clone(),
            address: backend.address.clone(),
            port: backend.port,
        };
        self.state
            .borrow_mut()
            .backends
            .entry((service_id.to_string(), version))
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    fn delete_backend(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError> {
        self.record("delete_backend", format!("{} {} {}", service_id, version, name))?;
        if let Some(backends) = self
            .state
            .borrow_mut()
            .backends
            .get_mut(&(service_id.to_string(), version))
        {
            backends.retain(|b| b.name != name);
        }
        Ok(())
    }

    fn list_dictionaries(&self, service_id: &str, version: u32) -> Result<Vec<Dictionary>, ApiError> {
        self.record("list_dictionaries", format!("{} {}", service_id, version))?;
        Ok(self
            .state
            .borrow()
            .dictionaries
            .get(&(service_id.to_string(), version))
            .cloned()
            .unwrap_or_default())
    }

    fn create_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, ApiError> {
        self.record(
            "create_dictionary",
            format!("{} {} {}", service_id, version, name),
        )?;
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let dictionary = Dictionary {
            id: format!("DICT{}", state.next_id),
            name: name.to_string(),
        };
        state
            .dictionaries
            .entry((service_id.to_string(), version))
            .or_default()
            .push(dictionary.clone());
        Ok(dictionary)
    }

    fn delete_dictionary(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError> {
        self.record(
            "delete_dictionary",
            format!("{} {} {}", service_id, version, name),
        )?;
        if let Some(dictionaries) = self
            .state
            .borrow_mut()
            .dictionaries
            .get_mut(&(service_id.to_string(), version))
        {
            dictionaries.retain(|d| d.name != name);
        }
        Ok(())
    }

    fn create_dictionary_item(
        &self,
        service_id: &str,
        dictionary_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        self.record(
            "create_dictionary_item",
            format!("{} {} {}", service_id, dictionary_id, key),
        )?;
        self.state.borrow_mut().items.push((
            dictionary_id.to_string(),
            key.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    fn get_package(&self, service_id: &str, version: u32) -> Result<Package, ApiError> {
        self.record("get_package", format!("{} {}", service_id, version))?;
        let state = self.state.borrow();
        let hash = state
            .packages
            .get(&(service_id.to_string(), version))
            .ok_or_else(|| not_found("package"))?;
        Ok(Package {
            metadata: PackageMetadata {
                hash_sum: hash.clone(),
                size: 0,
            },
        })
    }

    fn upload_package(&self, service_id: &str, version: u32, path: &Path) -> Result<Package, ApiError> {
        self.record("upload_package", format!("{} {}", service_id, version))?;
        let hash = fingerprint_package(path).map_err(|e| ApiError::Status {
            status: 400,
            message: e.to_string(),
        })?;
        self.state
            .borrow_mut()
            .packages
            .insert((service_id.to_string(), version), hash.clone());
        Ok(Package {
            metadata: PackageMetadata {
                hash_sum: hash,
                size: 0,
            },
        })
    }

    fn current_user(&self) -> Result<User, ApiError> {
        self.record("current_user", String::new())?;
        Ok(User {
            id: "USER1".to_string(),
            customer_id: FAKE_CUSTOMER_ID.to_string(),
        })
    }
}

impl TrialActivator for FakeApi {
    fn activate_trial(&self, customer_id: &str) -> Result<(), ApiError> {
        self.record("activate_trial", customer_id.to_string())?;
        self.state.borrow_mut().trial_activated = true;
        Ok(())
    }
}

/// The create-service error returned before the trial is active.
pub fn trial_error() -> ApiError {
    ApiError::Status {
        status: 400,
        message: format!("Bad request: {}", TRIAL_NOT_ACTIVATED),
    }
}

/// A plain server error.
pub fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "internal server error".to_string(),
    }
}

/// Prompt that replays queued answers and records every question.
///
/// An empty answer, or running out of answers, takes the question's
/// default.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        ScriptedPrompt::default()
    }

    /// Queue the next answer.
    pub fn answer(mut self, answer: &str) -> Self {
        self.answers.push_back(answer.to_string());
        self
    }

    /// Every question asked, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    fn next(&mut self, question: &str) -> String {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or_default()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let answer = self.next(question);
        Ok(match answer.to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next(question);
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }
}

/// Prompt that fails the test if anything is asked.
#[derive(Debug, Default)]
pub struct SilentPrompt;

impl Prompt for SilentPrompt {
    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool> {
        bail!("unexpected confirmation: {}", question)
    }

    fn input(&mut self, question: &str, _default: Option<&str>) -> Result<String> {
        bail!("unexpected prompt: {}", question)
    }
}

/// Toolchain probe answering from a fixed table.
///
/// Binaries missing from the table are reported as not installed.
#[derive(Debug, Default)]
pub struct StaticProbe {
    versions: HashMap<String, Version>,
    calls: RefCell<Vec<String>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        StaticProbe::default()
    }

    /// Report `version` for `binary`.
    pub fn with(mut self, binary: &str, version: &str) -> Self {
        let version = crate::core::version::parse_version_lenient(version)
            .unwrap_or_else(|| panic!("invalid test version: {}", version));
        self.versions.insert(binary.to_string(), version);
        self
    }

    /// Binaries probed, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ToolchainProbe for StaticProbe {
    fn version(&self, tool: &ToolSpec) -> Result<Version, ProbeError> {
        self.calls.borrow_mut().push(tool.binary.clone());
        self.versions
            .get(&tool.binary)
            .cloned()
            .ok_or_else(|| ProbeError::NotFound(tool.binary.clone()))
    }
}

/// Release index that is always unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRelease;

impl ReleaseIndex for FailingRelease {
    fn latest_stable(&self, library: &str) -> Result<Version> {
        bail!("release index unavailable for {}", library)
    }
}
