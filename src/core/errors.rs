//! Error taxonomy for build verification, packaging and deployment.
//!
//! Every error carries an optional remediation string that is kept separate
//! from the message. Remediation is display-only guidance and is never
//! parsed.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use semver::Version;
use thiserror::Error;

use crate::api::ApiError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of an error, telling the user what they need to fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Project files need fixing (constraints, manifests, dependency metadata).
    Configuration,
    /// The local toolchain or dependency set needs fixing.
    Environment,
    /// Remote configuration or identifiers need fixing.
    Resource,
    /// Any other remote failure, surfaced as-is.
    TransientRemote,
    /// The package artifact exceeds the size ceiling.
    SizeLimit,
    /// Local I/O or parsing plumbing failed outside any of the above.
    Local,
}

/// Errors surfaced by fastedge operations.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum Error {
    #[error("malformed version constraint '{constraint}': {reason}")]
    #[diagnostic(code(fastedge::config::malformed_constraint))]
    MalformedConstraint { constraint: String, reason: String },

    #[error("error reading package manifest")]
    #[diagnostic(code(fastedge::config::manifest_unreadable))]
    ManifestUnreadable { path: PathBuf, reason: String },

    #[error("{message}")]
    #[diagnostic(code(fastedge::config::invalid_manifest))]
    InvalidManifest { message: String },

    #[error("unsupported language {language}")]
    #[diagnostic(code(fastedge::config::unsupported_language))]
    UnsupportedLanguage { language: String },

    #[error("error reading cargo metadata in {}: {reason}", path.display())]
    #[diagnostic(code(fastedge::config::dependency_metadata))]
    DependencyMetadataUnreadable { path: PathBuf, reason: String },

    #[error("package not found: {}", path.display())]
    #[diagnostic(code(fastedge::config::package_not_found))]
    PackageNotFound { path: PathBuf },

    #[error("build process stopped by user")]
    #[diagnostic(code(fastedge::config::build_stopped))]
    BuildStopped,

    #[error("no API token found")]
    #[diagnostic(code(fastedge::config::no_token))]
    MissingToken,

    #[error("{tool} not found")]
    #[diagnostic(code(fastedge::env::toolchain_not_found))]
    ToolchainNotFound { tool: String, remediation: String },

    #[error("{tool} constraint '{constraint}' not met: {found}")]
    #[diagnostic(code(fastedge::env::constraint_not_met))]
    ConstraintNotMet {
        tool: String,
        constraint: String,
        found: Version,
        remediation: String,
    },

    #[error("{companion} crate not found")]
    #[diagnostic(code(fastedge::env::companion_missing))]
    CompanionLibraryMissing {
        library: String,
        companion: String,
        remediation: String,
    },

    #[error("{library} crate not up-to-date ({companion} {found} does not satisfy '{constraint}')")]
    #[diagnostic(code(fastedge::env::companion_outdated))]
    CompanionLibraryOutdated {
        library: String,
        companion: String,
        found: Version,
        constraint: String,
        remediation: String,
    },

    #[error("error during execution process: `{command}` {status}")]
    #[diagnostic(code(fastedge::env::build_failed))]
    BuildFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("invalid service type: {service_type}")]
    #[diagnostic(code(fastedge::resource::wrong_service_type))]
    WrongServiceType {
        service_id: String,
        service_type: String,
    },

    #[error("error fetching service details: {source}")]
    #[diagnostic(code(fastedge::resource::service_not_found))]
    ServiceNotFound {
        service_id: String,
        #[source]
        source: ApiError,
    },

    #[error("version {version} not found for service {service_id}")]
    #[diagnostic(code(fastedge::resource::unknown_version))]
    UnknownVersion { service_id: String, version: String },

    #[error("invalid {resource} input: {message}")]
    #[diagnostic(code(fastedge::resource::invalid_input))]
    InvalidInput {
        resource: &'static str,
        message: String,
    },

    #[error("error creating service: you do not have the edge-compute trial enabled on your account")]
    #[diagnostic(code(fastedge::resource::trial_not_enabled))]
    TrialNotEnabled,

    #[error("{context}: {source}")]
    #[diagnostic(code(fastedge::remote))]
    Remote {
        context: String,
        #[source]
        source: ApiError,
        remediation: Option<String>,
    },

    #[error("package size is too large ({size} bytes)")]
    #[diagnostic(code(fastedge::package::too_large))]
    PackageTooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a remote API failure with a short description of what was attempted.
    pub fn remote(context: impl Into<String>, source: ApiError) -> Self {
        Error::Remote {
            context: context.into(),
            source,
            remediation: None,
        }
    }

    /// Build an invalid-manifest error from a message.
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Error::InvalidManifest {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedConstraint { .. }
            | Error::ManifestUnreadable { .. }
            | Error::InvalidManifest { .. }
            | Error::UnsupportedLanguage { .. }
            | Error::DependencyMetadataUnreadable { .. }
            | Error::PackageNotFound { .. }
            | Error::BuildStopped
            | Error::MissingToken => ErrorKind::Configuration,

            Error::ToolchainNotFound { .. }
            | Error::ConstraintNotMet { .. }
            | Error::CompanionLibraryMissing { .. }
            | Error::CompanionLibraryOutdated { .. }
            | Error::BuildFailed { .. } => ErrorKind::Environment,

            Error::WrongServiceType { .. }
            | Error::ServiceNotFound { .. }
            | Error::UnknownVersion { .. }
            | Error::InvalidInput { .. }
            | Error::TrialNotEnabled => ErrorKind::Resource,

            Error::Remote { .. } => ErrorKind::TransientRemote,

            Error::PackageTooLarge { .. } => ErrorKind::SizeLimit,

            Error::Other(_) => ErrorKind::Local,
        }
    }

    /// Guidance for fixing the error, if any.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Error::ManifestUnreadable { .. } => Some(suggestions::NO_MANIFEST),
            Error::MalformedConstraint { .. } => Some(suggestions::MALFORMED_CONSTRAINT),
            Error::DependencyMetadataUnreadable { .. } => Some(suggestions::CARGO_METADATA),
            Error::PackageNotFound { .. } => Some(suggestions::BUILD_FIRST),
            Error::BuildStopped => Some(suggestions::CUSTOM_BUILD),
            Error::MissingToken => Some(suggestions::AUTH),
            Error::ToolchainNotFound { remediation, .. }
            | Error::ConstraintNotMet { remediation, .. }
            | Error::CompanionLibraryMissing { remediation, .. }
            | Error::CompanionLibraryOutdated { remediation, .. } => Some(remediation),
            Error::BuildFailed { .. } => Some(suggestions::BUILD_FAILED),
            Error::WrongServiceType { .. } => Some(suggestions::WRONG_SERVICE_TYPE),
            Error::ServiceNotFound { .. } | Error::UnknownVersion { .. } => {
                Some(suggestions::SERVICE_ID)
            }
            Error::TrialNotEnabled => Some(suggestions::COMPUTE_TRIAL),
            Error::Remote { remediation, .. } => remediation.as_deref(),
            Error::PackageTooLarge { .. } => Some(suggestions::PACKAGE_SIZE),
            Error::InvalidManifest { .. }
            | Error::UnsupportedLanguage { .. }
            | Error::InvalidInput { .. }
            | Error::Other(_) => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());

        match self {
            Error::ManifestUnreadable { path, reason } => {
                diag = diag
                    .with_location(path.clone())
                    .with_context(reason.clone());
            }
            Error::DependencyMetadataUnreadable { path, .. } => {
                diag = diag.with_location(path.clone());
            }
            Error::BuildFailed { stderr, .. } => {
                // Tail of stderr only; compiler output can be very long.
                let lines: Vec<&str> = stderr.lines().collect();
                for line in &lines[lines.len().saturating_sub(10)..] {
                    diag = diag.with_context(line.to_string());
                }
            }
            Error::WrongServiceType { service_id, .. }
            | Error::ServiceNotFound { service_id, .. }
            | Error::UnknownVersion { service_id, .. } => {
                diag = diag.with_context(format!("service ID: {}", service_id));
            }
            Error::PackageTooLarge { limit, .. } => {
                diag = diag.with_context(format!("limit is {} bytes", limit));
            }
            _ => {}
        }

        if let Some(code) = MietteDiagnostic::code(self) {
            diag = diag.with_context(format!("code: {}", code));
        }

        if let Some(remediation) = self.remediation() {
            diag = diag.with_suggestion(remediation);
        }

        diag
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.into())
    }
}
