#![warn(missing_docs, missing_debug_implementations)]

//! Check that a Python package version is ready to be published.
//!
//! Before a release, this library verifies that the declared version is in
//! canonical PEP 440 form, has the asserted release type (alpha, beta,
//! release candidate, dev or final), and is not already on PyPI. Versions
//! are compared in normalized form, so `1.0.0.BETA1` collides with a
//! published `1.0.0b1`.
//!
//! # Example
//!
//! ```no_run
//! use cv::check::{check_unique, check_version_format, CheckError};
//! use cv::registry::Client;
//!
//! let client = Client::new();
//! check_version_format("cv", "1.0.0b1")?;
//! match check_unique(&client, "cv", "1.0.0b1") {
//!     Ok(()) => println!("ready to publish"),
//!     Err(CheckError::VersionExists { .. }) => println!("bump the version"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! # Ok::<(), CheckError>(())
//! ```

pub mod check;
pub mod provider;
pub mod registry;
pub mod version;
