//! Release lookup against the PyPI JSON API.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Deserialize;
use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::debug;
use ureq::Agent;

use crate::version::normalize;

/// Default registry base URL.
pub const DEFAULT_REGISTRY: &str = "https://pypi.org";

/// Default timeout for the registry request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// The JSON for projects with many releases is well past ureq's 10 MiB default.
const MAX_BODY_SIZE: u64 = 64 * 1024 * 1024;

/// Errors from querying the registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The registry has no package with this name.
    #[error("package \"{0}\" was not found on the registry")]
    NotFound(String),

    /// The request failed: transport error or a non-success status.
    #[error("registry request failed: {0}")]
    Http(#[source] Box<ureq::Error>),

    /// The response body is not the expected JSON document.
    #[error("invalid registry response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl From<ureq::Error> for RegistryError {
    fn from(e: ureq::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    releases: BTreeMap<String, IgnoredAny>,
}

/// The set of version strings published for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    versions: BTreeSet<String>,
}

impl ReleaseSet {
    /// Parse a `/pypi/<name>/json` response body.
    ///
    /// Only the keys of the `releases` object are kept; everything else in
    /// the document is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidResponse`] if the body is not JSON or
    /// has no `releases` object.
    pub fn from_json(body: &str) -> Result<Self, RegistryError> {
        let package: PackageJson = serde_json::from_str(body)?;
        Ok(package.releases.into_keys().collect())
    }

    /// Published version strings, as the registry spells them.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(String::as_str)
    }

    /// Number of published versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Whether `target` is already published, comparing normalized forms.
    ///
    /// ```
    /// use cv::registry::ReleaseSet;
    ///
    /// let releases: ReleaseSet = ["1.0.0.dev8", "1.0.0b1"].into_iter().collect();
    /// assert!(releases.contains_version("1.0.0-DEV8"));
    /// assert!(releases.contains_version("1.0.0.beta1"));
    /// assert!(!releases.contains_version("1.0.0"));
    /// ```
    #[must_use]
    pub fn contains_version(&self, target: &str) -> bool {
        let target = normalize(target);
        self.versions.iter().any(|v| normalize(v) == target)
    }
}

impl<S: Into<String>> FromIterator<S> for ReleaseSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            versions: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// An HTTP client for the registry's JSON API.
///
/// # Example
///
/// ```no_run
/// use cv::registry::Client;
///
/// let client = Client::new();
/// let releases = client.fetch("requests")?;
/// println!("{} releases", releases.len());
/// # Ok::<(), cv::registry::RegistryError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
    base_url: String,
}

impl Client {
    /// Create a client for pypi.org with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(DEFAULT_REGISTRY, DEFAULT_TIMEOUT)
    }

    /// Create a client for another registry base URL, e.g. a mirror or a
    /// local test server.
    #[must_use]
    pub fn with_registry(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION"),
                " (",
                env!("CARGO_PKG_REPOSITORY"),
                ")"
            ))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The registry base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the versions published for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] on a 404,
    /// [`RegistryError::Http`] for any other failed request and
    /// [`RegistryError::InvalidResponse`] if the body cannot be parsed.
    pub fn fetch(&self, name: &str) -> Result<ReleaseSet, RegistryError> {
        let url = format!("{}/pypi/{}/json", self.base_url, name);
        debug!("fetching releases: {url}");

        let mut response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_string()?;
        let releases = ReleaseSet::from_json(&body)?;

        debug!("found {} releases for {name}", releases.len());
        Ok(releases)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
