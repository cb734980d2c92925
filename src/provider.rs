//! Where the declared version of a module comes from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

static VERSION_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^__version__\s*(?::\s*str\s*)?=\s*(?:"([^"\r\n]*)"|'([^'\r\n]*)')"#)
        .expect("version assignment pattern is a valid regex")
});

// Files a package commonly keeps its version in when `__init__.py` only
// re-exports it.
const PACKAGE_VERSION_FILES: &[&str] = &["__version__.py", "_version.py", "version.py"];

/// Errors from resolving a module's declared version.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// No source file exists for the module.
    #[error("module \"{module}\" not found under {}", .root.display())]
    ModuleNotFound {
        /// Dotted module path.
        module: String,
        /// Source root that was searched.
        root: PathBuf,
    },

    /// The module exists but does not assign `__version__`.
    #[error("module \"{module}\" does not declare __version__ ({})", .path.display())]
    VersionNotDeclared {
        /// Dotted module path.
        module: String,
        /// File that was read.
        path: PathBuf,
    },

    /// A source file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

/// Supplies the version a module declares.
pub trait VersionProvider {
    /// Return the declared version string of `module`, unmodified.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the module or its version cannot be
    /// found.
    fn declared_version(&self, module: &str) -> Result<String, ProviderError>;
}

/// A version given explicitly, e.g. on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVersion(pub String);

impl VersionProvider for FixedVersion {
    fn declared_version(&self, _module: &str) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Reads `__version__` from Python sources below a root directory.
///
/// A dotted module path `a.b.c` resolves to `a/b/c.py` or
/// `a/b/c/__init__.py`, looked up under the root and under `<root>/src`.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, module: &str) -> Option<PathBuf> {
        let relative: PathBuf = module.split('.').collect();
        [self.root.clone(), self.root.join("src")]
            .into_iter()
            .flat_map(|base| {
                [
                    base.join(&relative).with_extension("py"),
                    base.join(&relative).join("__init__.py"),
                ]
            })
            .find(|candidate| candidate.is_file())
    }
}

impl VersionProvider for SourceTree {
    fn declared_version(&self, module: &str) -> Result<String, ProviderError> {
        let malformed = |part: &str| part.trim().is_empty() || part.contains(['/', '\\']);
        if module.is_empty() || module.split('.').any(malformed) {
            return Err(ProviderError::ModuleNotFound {
                module: module.to_string(),
                root: self.root.clone(),
            });
        }

        let path = self
            .locate(module)
            .ok_or_else(|| ProviderError::ModuleNotFound {
                module: module.to_string(),
                root: self.root.clone(),
            })?;
        debug!("reading version of {module} from {}", path.display());

        if let Some(version) = read_version(&path)? {
            return Ok(version);
        }

        // A package may keep its version in a sibling module.
        if path.file_name().is_some_and(|name| name == "__init__.py") {
            let package_dir = path.parent().unwrap_or(Path::new("."));
            for file in PACKAGE_VERSION_FILES {
                let candidate = package_dir.join(file);
                if candidate.is_file() {
                    debug!("trying {}", candidate.display());
                    if let Some(version) = read_version(&candidate)? {
                        return Ok(version);
                    }
                }
            }
        }

        Err(ProviderError::VersionNotDeclared {
            module: module.to_string(),
            path,
        })
    }
}

fn read_version(path: &Path) -> Result<Option<String>, ProviderError> {
    let source = fs::read_to_string(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(find_version(&source))
}

/// Extract the value of the first module-level `__version__` assignment.
fn find_version(source: &str) -> Option<String> {
    let captures = VERSION_ASSIGNMENT.captures(source)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string())
}
