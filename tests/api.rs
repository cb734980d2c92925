use std::time::Duration;

use mockito::{Mock, Server};

use cv::check::{CheckError, Config, check_unique, check_version_format, run};
use cv::provider::FixedVersion;
use cv::registry::{Client, RegistryError, ReleaseSet};
use cv::version::{ReleaseType, normalize};

const RELEASES: &str = r#"{
    "info": {"name": "pkg", "version": "1.0.0.dev8"},
    "releases": {
        "1.0.0.dev7": [],
        "1.0.0.dev8": [{"filename": "pkg-1.0.0.dev8.tar.gz", "packagetype": "sdist"}]
    }
}"#;

// Mocks are removed from the server when dropped, so callers keep them bound.
fn registry(server: &mut Server, name: &str) -> Mock {
    server
        .mock("GET", format!("/pypi/{name}/json").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(RELEASES)
}

fn client(server: &Server) -> Client {
    Client::with_registry(&server.url(), Duration::from_secs(5))
}

#[test]
fn public_api_normalize() {
    assert_eq!(normalize("1.0.0.beta1"), "1.0.0b1");
    assert_eq!(normalize("1.0.0b1"), "1.0.0b1");
}

#[test]
fn public_api_valid_format() {
    assert!(check_version_format("cv", "1.0.0b1").is_ok());
}

#[test]
fn public_api_invalid_format_suggests_canonical() {
    match check_version_format("cv", "1.0.0.beta1") {
        Err(CheckError::InvalidVersionFormat { suggestion, .. }) => {
            assert_eq!(suggestion.as_deref(), Some("1.0.0b1"));
        }
        other => panic!("expected InvalidVersionFormat, got {other:?}"),
    }
}

#[test]
fn published_version_exists() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg").create();

    match check_unique(&client(&server), "pkg", "1.0.0.dev8") {
        Err(CheckError::VersionExists { name, version }) => {
            assert_eq!(name, "pkg");
            assert_eq!(version, "1.0.0.dev8");
        }
        other => panic!("expected VersionExists, got {other:?}"),
    }
    mock.assert();
}

#[test]
fn spelling_variant_of_published_version_exists() {
    let mut server = Server::new();
    let _mock = registry(&mut server, "pkg").create();

    assert!(matches!(
        check_unique(&client(&server), "pkg", "1.0.0-DEV8"),
        Err(CheckError::VersionExists { .. })
    ));
}

#[test]
fn unpublished_version_is_unique() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg").create();

    assert!(check_unique(&client(&server), "pkg", "99.0.0").is_ok());
    mock.assert();
}

#[test]
fn unknown_package_is_registry_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/pypi/no-such-package/json")
        .with_status(404)
        .create();

    match check_unique(&client(&server), "no-such-package", "1.0.0") {
        Err(CheckError::Registry(RegistryError::NotFound(name))) => {
            assert_eq!(name, "no-such-package");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn package_with_no_releases_contains_nothing() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/pypi/fresh/json")
        .with_status(200)
        .with_body(r#"{"releases": {}}"#)
        .create();

    let releases = client(&server).fetch("fresh").unwrap();
    assert_eq!(releases, ReleaseSet::default());
    assert!(check_unique(&client(&server), "fresh", "0.1.0").is_ok());
}

#[test]
fn run_passes_matching_release_type() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg").create();

    let mut config = Config::new("pkg");
    config.release_types = vec![ReleaseType::Alpha];
    let provider = FixedVersion("2.0.0a1".to_string());

    let verified = run(&config, &provider, &client(&server)).unwrap();
    assert_eq!(verified.name, "pkg");
    assert_eq!(verified.version, "2.0.0a1");
    mock.assert();
}

#[test]
fn run_rejects_mismatched_release_type_without_fetching() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg").expect(0).create();

    let mut config = Config::new("pkg");
    config.release_types = vec![ReleaseType::Release];
    let provider = FixedVersion("2.0.0a1".to_string());

    match run(&config, &provider, &client(&server)) {
        Err(CheckError::VersionTypeMismatch { actual, .. }) => {
            assert_eq!(actual, ReleaseType::Alpha);
        }
        other => panic!("expected VersionTypeMismatch, got {other:?}"),
    }
    mock.assert();
}

#[test]
fn run_rejects_conflicting_flags_without_fetching() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg").expect(0).create();

    let mut config = Config::new("pkg");
    config.release_types = vec![ReleaseType::Release, ReleaseType::Dev];
    let provider = FixedVersion("1.0.0".to_string());

    assert!(matches!(
        run(&config, &provider, &client(&server)),
        Err(CheckError::InvalidRequirements { .. })
    ));
    mock.assert();
}

#[test]
fn run_uses_package_override_for_lookup() {
    let mut server = Server::new();
    let mock = registry(&mut server, "pkg-dist").create();

    let mut config = Config::new("pkg_module");
    config.package = Some("pkg-dist".to_string());
    let provider = FixedVersion("1.0.0.dev8".to_string());

    match run(&config, &provider, &client(&server)) {
        Err(CheckError::VersionExists { name, .. }) => assert_eq!(name, "pkg-dist"),
        other => panic!("expected VersionExists, got {other:?}"),
    }
    mock.assert();
}

#[test]
fn client_default_equals_new() {
    let client: Client = Client::default();
    assert_eq!(client.base_url(), "https://pypi.org");
}

#[test]
#[ignore] // requires network access
fn public_api_real_registry() {
    assert!(check_unique(&Client::new(), "cv", "99.0.0").is_ok());
}
