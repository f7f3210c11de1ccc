//! Latest stable releases from crates.io.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use semver::Version;
use serde::Deserialize;
use url::Url;

/// Default crates.io API base.
pub const CRATES_IO_API: &str = "https://crates.io/api/v1/";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// An index of published library releases.
pub trait ReleaseIndex {
    /// The latest stable version of a library.
    fn latest_stable(&self, library: &str) -> Result<Version>;
}

/// Queries `GET /api/v1/crates/<name>` for `crate.max_stable_version`.
#[derive(Debug, Clone)]
pub struct CratesIo {
    base: Url,
}

#[derive(Deserialize)]
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
}

#[derive(Deserialize)]
struct CrateInfo {
    max_stable_version: Option<String>,
    max_version: String,
}

impl CratesIo {
    /// Create an index against the public crates.io API.
    pub fn new() -> Result<Self> {
        Self::with_base(CRATES_IO_API)
    }

    /// Create an index against a custom API base (must end in `/`).
    pub fn with_base(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid crates.io API: {}", base))?;
        Ok(CratesIo { base })
    }
}

impl ReleaseIndex for CratesIo {
    fn latest_stable(&self, library: &str) -> Result<Version> {
        let url = self
            .base
            .join(&format!("crates/{}", library))
            .with_context(|| format!("invalid crate name: {}", library))?;

        tracing::debug!(%url, "querying latest release");

        let client = Client::builder()
            .user_agent(concat!("fastedge/", env!("CARGO_PKG_VERSION")))
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("failed to create HTTP client")?;

        let response = client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to query {}", url))?;

        if !response.status().is_success() {
            bail!("failed to query {}: HTTP {}", url, response.status());
        }

        let body: CrateResponse = response
            .json()
            .with_context(|| format!("failed to decode response from {}", url))?;

        let raw = body
            .krate
            .max_stable_version
            .unwrap_or(body.krate.max_version);
        Version::parse(&raw).with_context(|| format!("invalid version '{}' for {}", raw, library))
    }
}

/// A release index that always answers with the same version.
///
/// Used when network lookups are unwanted.
#[derive(Debug, Clone)]
pub struct FixedRelease(pub Version);

impl ReleaseIndex for FixedRelease {
    fn latest_stable(&self, _library: &str) -> Result<Version> {
        Ok(self.0.clone())
    }
}
