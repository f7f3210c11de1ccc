//! Remote service API.
//!
//! The deploy orchestrator only talks to the [`RemoteApi`] and
//! [`TrialActivator`] traits. [`http::HttpClient`] implements both against
//! the real HTTP API.

pub mod http;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpClient;

/// Service type for Wasm packages.
pub const WASM_SERVICE_TYPE: &str = "wasm";

/// Substring of the create-service error returned when the edge-compute
/// trial hasn't been activated on the account.
pub const TRIAL_NOT_ACTIVATED: &str = "Valid values for 'type' are: 'vcl'";

/// Errors returned by the remote API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{status} {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("error decoding response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A hosted service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

/// A service plus its versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub versions: Vec<ServiceVersion>,
}

/// One configuration version of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVersion {
    pub number: u32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
}

impl ServiceVersion {
    /// A version that can't be modified in place.
    pub fn is_frozen(&self) -> bool {
        self.active || self.locked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// Input for creating a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBackend {
    pub name: String,
    pub address: String,
    pub port: u16,
    /// Host header override, used for TLS origins.
    pub override_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: String,
    pub name: String,
}

/// Metadata of an uploaded package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(rename = "hashsum", default)]
    pub hash_sum: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub metadata: PackageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub customer_id: String,
}

/// Blocking client for the remote resource API.
pub trait RemoteApi {
    fn create_service(&self, name: &str, service_type: &str) -> Result<Service, ApiError>;
    fn get_service(&self, service_id: &str) -> Result<Service, ApiError>;
    fn service_details(&self, service_id: &str) -> Result<ServiceDetails, ApiError>;
    fn delete_service(&self, service_id: &str) -> Result<(), ApiError>;

    fn list_versions(&self, service_id: &str) -> Result<Vec<ServiceVersion>, ApiError>;
    fn clone_version(&self, service_id: &str, version: u32) -> Result<ServiceVersion, ApiError>;
    fn activate_version(&self, service_id: &str, version: u32)
        -> Result<ServiceVersion, ApiError>;
    fn update_version_comment(
        &self,
        service_id: &str,
        version: u32,
        comment: &str,
    ) -> Result<(), ApiError>;

    fn list_domains(&self, service_id: &str, version: u32) -> Result<Vec<Domain>, ApiError>;
    fn create_domain(&self, service_id: &str, version: u32, name: &str)
        -> Result<Domain, ApiError>;
    fn delete_domain(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError>;

    fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>, ApiError>;
    fn create_backend(
        &self,
        service_id: &str,
        version: u32,
        backend: &NewBackend,
    ) -> Result<Backend, ApiError>;
    fn delete_backend(&self, service_id: &str, version: u32, name: &str)
        -> Result<(), ApiError>;

    fn list_dictionaries(&self, service_id: &str, version: u32)
        -> Result<Vec<Dictionary>, ApiError>;
    fn create_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, ApiError>;
    fn delete_dictionary(&self, service_id: &str, version: u32, name: &str)
        -> Result<(), ApiError>;
    fn create_dictionary_item(
        &self,
        service_id: &str,
        dictionary_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError>;

    fn get_package(&self, service_id: &str, version: u32) -> Result<Package, ApiError>;
    fn upload_package(&self, service_id: &str, version: u32, path: &Path)
        -> Result<Package, ApiError>;

    fn current_user(&self) -> Result<User, ApiError>;
}

/// Activates the edge-compute trial on a customer account.
pub trait TrialActivator {
    fn activate_trial(&self, customer_id: &str) -> Result<(), ApiError>;
}
