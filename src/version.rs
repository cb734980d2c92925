//! PEP 440 version normalization and release-type classification.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use pep508_rs::pep440_rs::{PrereleaseKind, Version};
use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9.]+").expect("character class is a valid regex")
});

/// Parse a version string, ignoring surrounding whitespace.
///
/// Returns `None` if the string is not a valid PEP 440 version. Numeric
/// segments must fit in a `u64`, so `1.0.18446744073709551616` is rejected
/// even though PEP 440 itself puts no bound on them.
#[must_use]
pub fn parse(version: &str) -> Option<Version> {
    Version::from_str(version.trim()).ok()
}

/// Normalize a version string for comparison.
///
/// Valid PEP 440 versions are rendered in their canonical form, so
/// `1.0.0.BETA1`, `v1.0.0-b1` and `01.0.0b01` all become `1.0.0b1`.
/// Anything else gets the "safe version" treatment: spaces become dots and
/// every other run of characters outside `[A-Za-z0-9.]` becomes a single `-`.
///
/// ```
/// use cv::version::normalize;
/// assert_eq!(normalize("1.0.0.beta1"), "1.0.0b1");
/// assert_eq!(normalize("not a version!"), "not.a.version-");
/// ```
#[must_use]
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim();
    match Version::from_str(trimmed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => UNSAFE_CHARS
            .replace_all(&trimmed.replace(' ', "."), "-")
            .into_owned(),
    }
}

/// The shape of a release, as asserted by the `--alpha`, `--beta`, `--rc`,
/// `--dev` and `--release` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseType {
    /// Alpha pre-release (`1.0a1`).
    Alpha,
    /// Beta pre-release (`1.0b1`).
    Beta,
    /// Release candidate (`1.0rc1`).
    Rc,
    /// Development release (`1.0.dev1`).
    Dev,
    /// Final release: no pre-release and no dev segment.
    Release,
}

impl ReleaseType {
    /// All release types, in flag order.
    pub const ALL: [ReleaseType; 5] = [
        ReleaseType::Alpha,
        ReleaseType::Beta,
        ReleaseType::Rc,
        ReleaseType::Dev,
        ReleaseType::Release,
    ];

    /// Whether `version` has the shape this release type asserts.
    ///
    /// A pre-release carrying a dev segment (`1.0a1.dev2`) matches both its
    /// pre-release kind and [`ReleaseType::Dev`]. Post-releases and local
    /// labels do not affect the match.
    #[must_use]
    pub fn matches(self, version: &Version) -> bool {
        let pre = version.pre().map(|pre| pre.kind);
        match self {
            Self::Alpha => pre == Some(PrereleaseKind::Alpha),
            Self::Beta => pre == Some(PrereleaseKind::Beta),
            Self::Rc => pre == Some(PrereleaseKind::Rc),
            Self::Dev => version.dev().is_some(),
            Self::Release => pre.is_none() && version.dev().is_none(),
        }
    }

    /// The release type that best describes `version`: its pre-release kind
    /// if any, then dev, otherwise a final release.
    #[must_use]
    pub fn classify(version: &Version) -> Self {
        match version.pre().map(|pre| pre.kind) {
            Some(PrereleaseKind::Alpha) => Self::Alpha,
            Some(PrereleaseKind::Beta) => Self::Beta,
            Some(PrereleaseKind::Rc) => Self::Rc,
            None if version.dev().is_some() => Self::Dev,
            None => Self::Release,
        }
    }

    /// The command-line flag asserting this release type.
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::Alpha => "--alpha",
            Self::Beta => "--beta",
            Self::Rc => "--rc",
            Self::Dev => "--dev",
            Self::Release => "--release",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha => write!(f, "an alpha release"),
            Self::Beta => write!(f, "a beta release"),
            Self::Rc => write!(f, "a release candidate"),
            Self::Dev => write!(f, "a dev release"),
            Self::Release => write!(f, "a final release"),
        }
    }
}
