//! The pre-publish checks and the pipeline that runs them.

use std::path::PathBuf;
use std::time::Duration;

use pep508_rs::pep440_rs::Version;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{ProviderError, VersionProvider};
use crate::registry::{self, Client, RegistryError};
use crate::version::{self, ReleaseType};

/// Exit code for a failed check (duplicate, malformed or mistyped version).
pub const EXIT_CHECK_FAILED: u8 = 1;
/// Exit code for unusable input: conflicting flags or no declared version.
pub const EXIT_USAGE: u8 = 2;
/// Exit code when the registry could not answer.
pub const EXIT_REGISTRY: u8 = 3;

/// Why a version may not be published.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The registry could not be queried.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The version is not in canonical PEP 440 form.
    #[error(
        "version \"{version}\" of \"{name}\" is not a valid PEP 440 version{}",
        suggestion_hint(.suggestion)
    )]
    InvalidVersionFormat {
        /// Package name.
        name: String,
        /// The version as declared.
        version: String,
        /// The canonical form, if the version parses at all.
        suggestion: Option<String>,
    },

    /// The version is already published.
    #[error(
        "package \"{name}\" with version \"{version}\" already exists on PyPI; \
         bump the declared version before publishing"
    )]
    VersionExists {
        /// Package name.
        name: String,
        /// The version as declared.
        version: String,
    },

    /// More than one release type was asserted.
    #[error("release type flags are mutually exclusive, got {}", join_flags(.asserted))]
    InvalidRequirements {
        /// Every asserted release type.
        asserted: Vec<ReleaseType>,
    },

    /// The version does not have the asserted release type.
    #[error("version \"{version}\" is {actual}, but {expected} was required")]
    VersionTypeMismatch {
        /// The version as declared.
        version: String,
        /// Asserted release type.
        expected: ReleaseType,
        /// What the version actually is.
        actual: ReleaseType,
    },

    /// The declared version could not be resolved.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl CheckError {
    /// The process exit code reporting this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Registry(_) => EXIT_REGISTRY,
            Self::InvalidRequirements { .. } | Self::Provider(_) => EXIT_USAGE,
            Self::InvalidVersionFormat { .. }
            | Self::VersionExists { .. }
            | Self::VersionTypeMismatch { .. } => EXIT_CHECK_FAILED,
        }
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(canonical) => format!(", did you mean \"{canonical}\"?"),
        None => String::new(),
    }
}

fn join_flags(asserted: &[ReleaseType]) -> String {
    asserted
        .iter()
        .map(|t| t.flag())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-invocation settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dotted module path whose declared version is checked.
    pub module: String,
    /// Registry package name, when it differs from the module name.
    pub package: Option<String>,
    /// Every release type asserted on the command line.
    pub release_types: Vec<ReleaseType>,
    /// Validate only; failures keep their exit codes.
    pub dry: bool,
    /// Registry base URL.
    pub registry_url: String,
    /// Timeout for the registry request.
    pub timeout: Duration,
    /// Directory the module is looked up in.
    pub root: PathBuf,
}

impl Config {
    /// Settings for `module` with the defaults of the command line.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            package: None,
            release_types: Vec::new(),
            dry: false,
            registry_url: registry::DEFAULT_REGISTRY.to_string(),
            timeout: registry::DEFAULT_TIMEOUT,
            root: PathBuf::from("."),
        }
    }

    /// The name the package is published under.
    #[must_use]
    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.module)
    }
}

/// A version that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// Package name.
    pub name: String,
    /// The version as declared.
    pub version: String,
}

/// Check that `version` is already in canonical PEP 440 form.
///
/// # Errors
///
/// Returns [`CheckError::InvalidVersionFormat`] if the version does not
/// parse, or parses but normalizes to something else.
///
/// ```
/// use cv::check::{check_version_format, CheckError};
///
/// assert!(check_version_format("cv", "1.0.0b1").is_ok());
/// match check_version_format("cv", "1.0.0.beta1") {
///     Err(CheckError::InvalidVersionFormat { suggestion, .. }) => {
///         assert_eq!(suggestion.as_deref(), Some("1.0.0b1"));
///     }
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub fn check_version_format(name: &str, version: &str) -> Result<Version, CheckError> {
    let invalid = |suggestion| CheckError::InvalidVersionFormat {
        name: name.to_string(),
        version: version.to_string(),
        suggestion,
    };

    let parsed = version::parse(version).ok_or_else(|| invalid(None))?;
    let canonical = parsed.to_string();
    if canonical != version {
        return Err(invalid(Some(canonical)));
    }
    Ok(parsed)
}

/// Reduce the asserted release types to at most one.
///
/// # Errors
///
/// Returns [`CheckError::InvalidRequirements`] if more than one distinct
/// release type is asserted.
pub fn requirement(asserted: &[ReleaseType]) -> Result<Option<ReleaseType>, CheckError> {
    let mut distinct: Vec<ReleaseType> = Vec::with_capacity(asserted.len());
    for release_type in asserted {
        if !distinct.contains(release_type) {
            distinct.push(*release_type);
        }
    }

    match distinct.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(CheckError::InvalidRequirements { asserted: distinct }),
    }
}

/// Check that `version` has the asserted release type.
///
/// # Errors
///
/// Returns [`CheckError::VersionTypeMismatch`] if it does not.
pub fn check_release_type(version: &Version, expected: ReleaseType) -> Result<(), CheckError> {
    if expected.matches(version) {
        return Ok(());
    }
    Err(CheckError::VersionTypeMismatch {
        version: version.to_string(),
        expected,
        actual: ReleaseType::classify(version),
    })
}

/// Check that `version` of `name` is not published yet.
///
/// # Errors
///
/// Returns [`CheckError::VersionExists`] if it is, or
/// [`CheckError::Registry`] if the registry cannot be queried.
pub fn check_unique(client: &Client, name: &str, version: &str) -> Result<(), CheckError> {
    let releases = client.fetch(name)?;
    if releases.contains_version(version) {
        return Err(CheckError::VersionExists {
            name: name.to_string(),
            version: version.to_string(),
        });
    }
    debug!("{name} {version} is not among {} releases", releases.len());
    Ok(())
}

/// Run every check for `config`, stopping at the first failure.
///
/// The order is: release type flags, declared version, format, release
/// type, and finally the registry lookup. Only the last step touches the
/// network.
///
/// # Errors
///
/// Returns the [`CheckError`] of the first failing step.
pub fn run(
    config: &Config,
    provider: &dyn VersionProvider,
    client: &Client,
) -> Result<Verified, CheckError> {
    let expected = requirement(&config.release_types)?;

    let declared = provider.declared_version(&config.module)?;
    let name = config.package_name();
    info!("checking {name} {declared}");

    let parsed = check_version_format(name, &declared)?;
    if let Some(expected) = expected {
        check_release_type(&parsed, expected)?;
    }
    check_unique(client, name, &declared)?;

    Ok(Verified {
        name: name.to_string(),
        version: declared,
    })
}
