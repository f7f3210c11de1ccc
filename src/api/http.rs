//! Blocking HTTP implementation of the remote API.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{
    ApiError, Backend, Dictionary, Domain, NewBackend, Package, RemoteApi, Service,
    ServiceDetails, ServiceVersion, TrialActivator, User,
};

const TOKEN_HEADER: &str = "Fastly-Key";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Error body returned by the API.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    detail: Option<String>,
}

/// API client authenticated with a user token.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: Url,
    token: String,
}

impl HttpClient {
    /// Create a client for `endpoint` (e.g. `https://api.fastly.com`).
    pub fn new(endpoint: &str, token: impl Into<String>) -> anyhow::Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid API endpoint: {}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            bail!("invalid API endpoint: {}", endpoint);
        }

        let client = Client::builder()
            .user_agent(concat!("fastedge/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create HTTP client")?;

        Ok(HttpClient {
            client,
            endpoint,
            token: token.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("invalid API endpoint: {}", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "api request");
        Ok(self
            .client
            .request(method, url)
            .header(TOKEN_HEADER, &self.token)
            .header(ACCEPT, "application/json"))
    }

    fn get(&self, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        self.request(reqwest::Method::GET, segments)
    }

    fn delete(&self, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        self.request(reqwest::Method::DELETE, segments)
    }

    fn with_form(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        pairs: &[(&str, &str)],
    ) -> Result<RequestBuilder, ApiError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Ok(self
            .request(method, segments)?
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body))
    }

    fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                msg,
                detail: Some(detail),
            }) if !detail.is_empty() => format!("{}: {}", msg, detail),
            Ok(ErrorBody { msg, .. }) if !msg.is_empty() => msg,
            _ => status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        };

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.execute(request)?
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute(request).map(|_| ())
    }
}

fn version_segment(version: u32) -> String {
    version.to_string()
}

impl RemoteApi for HttpClient {
    fn create_service(&self, name: &str, service_type: &str) -> Result<Service, ApiError> {
        let request = self.with_form(
            reqwest::Method::POST,
            &["service"],
            &[("name", name), ("type", service_type)],
        )?;
        self.json(request)
    }

    fn get_service(&self, service_id: &str) -> Result<Service, ApiError> {
        self.json(self.get(&["service", service_id])?)
    }

    fn service_details(&self, service_id: &str) -> Result<ServiceDetails, ApiError> {
        self.json(self.get(&["service", service_id, "details"])?)
    }

    fn delete_service(&self, service_id: &str) -> Result<(), ApiError> {
        self.empty(self.delete(&["service", service_id])?)
    }

    fn list_versions(&self, service_id: &str) -> Result<Vec<ServiceVersion>, ApiError> {
        self.json(self.get(&["service", service_id, "version"])?)
    }

    fn clone_version(&self, service_id: &str, version: u32) -> Result<ServiceVersion, ApiError> {
        let v = version_segment(version);
        let request = self.request(
            reqwest::Method::PUT,
            &["service", service_id, "version", &v, "clone"],
        )?;
        self.json(request)
    }

    fn activate_version(
        &self,
        service_id: &str,
        version: u32,
    ) -> Result<ServiceVersion, ApiError> {
        let v = version_segment(version);
        let request = self.request(
            reqwest::Method::PUT,
            &["service", service_id, "version", &v, "activate"],
        )?;
        self.json(request)
    }

    fn update_version_comment(
        &self,
        service_id: &str,
        version: u32,
        comment: &str,
    ) -> Result<(), ApiError> {
        let v = version_segment(version);
        let request = self.with_form(
            reqwest::Method::PUT,
            &["service", service_id, "version", &v],
            &[("comment", comment)],
        )?;
        self.empty(request)
    }

    fn list_domains(&self, service_id: &str, version: u32) -> Result<Vec<Domain>, ApiError> {
        let v = version_segment(version);
        self.json(self.get(&["service", service_id, "version", &v, "domain"])?)
    }

    fn create_domain(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Domain, ApiError> {
        let v = version_segment(version);
        let request = self.with_form(
            reqwest::Method::POST,
            &["service", service_id, "version", &v, "domain"],
            &[("name", name)],
        )?;
        self.json(request)
    }

    fn delete_domain(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError> {
        let v = version_segment(version);
        self.empty(self.delete(&["service", service_id, "version", &v, "domain", name])?)
    }

    fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>, ApiError> {
        let v = version_segment(version);
        self.json(self.get(&["service", service_id, "version", &v, "backend"])?)
    }

    fn create_backend(
        &self,
        service_id: &str,
        version: u32,
        backend: &NewBackend,
    ) -> Result<Backend, ApiError> {
        let v = version_segment(version);
        let port = backend.port.to_string();
        let mut pairs = vec![
            ("name", backend.name.as_str()),
            ("address", backend.address.as_str()),
            ("port", port.as_str()),
        ];
        if let Some(host) = &backend.override_host {
            pairs.push(("override_host", host.as_str()));
            pairs.push(("ssl_cert_hostname", host.as_str()));
            pairs.push(("ssl_sni_hostname", host.as_str()));
            pairs.push(("use_ssl", "true"));
        }
        let request = self.with_form(
            reqwest::Method::POST,
            &["service", service_id, "version", &v, "backend"],
            &pairs,
        )?;
        self.json(request)
    }

    fn delete_backend(&self, service_id: &str, version: u32, name: &str) -> Result<(), ApiError> {
        let v = version_segment(version);
        self.empty(self.delete(&["service", service_id, "version", &v, "backend", name])?)
    }

    fn list_dictionaries(
        &self,
        service_id: &str,
        version: u32,
    ) -> Result<Vec<Dictionary>, ApiError> {
        let v = version_segment(version);
        self.json(self.get(&["service", service_id, "version", &v, "dictionary"])?)
    }

    fn create_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, ApiError> {
        let v = version_segment(version);
        let request = self.with_form(
            reqwest::Method::POST,
            &["service", service_id, "version", &v, "dictionary"],
            &[("name", name)],
        )?;
        self.json(request)
    }

    fn delete_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<(), ApiError> {
        let v = version_segment(version);
        self.empty(self.delete(&["service", service_id, "version", &v, "dictionary", name])?)
    }

    fn create_dictionary_item(
        &self,
        service_id: &str,
        dictionary_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let request = self.with_form(
            reqwest::Method::POST,
            &["service", service_id, "dictionary", dictionary_id, "item"],
            &[("item_key", key), ("item_value", value)],
        )?;
        self.empty(request)
    }

    fn get_package(&self, service_id: &str, version: u32) -> Result<Package, ApiError> {
        let v = version_segment(version);
        self.json(self.get(&["service", service_id, "version", &v, "package"])?)
    }

    fn upload_package(
        &self,
        service_id: &str,
        version: u32,
        path: &Path,
    ) -> Result<Package, ApiError> {
        let v = version_segment(version);
        let form = multipart::Form::new()
            .file("package", path)
            .map_err(|e| ApiError::Transport(format!("{}: {}", path.display(), e)))?;
        let request = self
            .request(
                reqwest::Method::PUT,
                &["service", service_id, "version", &v, "package"],
            )?
            .multipart(form);
        self.json(request)
    }

    fn current_user(&self) -> Result<User, ApiError> {
        self.json(self.get(&["current_user"])?)
    }
}

impl TrialActivator for HttpClient {
    fn activate_trial(&self, customer_id: &str) -> Result<(), ApiError> {
        let request = self.get(&["customer", customer_id, "edge-compute-trial"])?;
        match self.empty(request) {
            Ok(()) => Ok(()),
            // The trial has already been created.
            Err(ApiError::Status { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
