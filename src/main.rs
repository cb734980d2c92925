use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cv::check::{Config, run};
use cv::provider::{FixedVersion, SourceTree, VersionProvider};
use cv::registry::{Client, DEFAULT_REGISTRY};
use cv::version::ReleaseType;

#[derive(Parser)]
#[command(
    name = "cv",
    version,
    about = "Check that a Python package version is valid and not yet on PyPI",
    after_help = "Reads __version__ from the module's source, checks that it is in \
                  canonical PEP 440 form and of the asserted release type, then \
                  queries the registry for already published versions.\n\n\
                  Exit codes: 0 ok, 1 check failed, 2 usage error, 3 registry error."
)]
struct Cli {
    /// Dotted path of the module declaring __version__
    module: String,

    /// Require an alpha pre-release
    #[arg(long)]
    alpha: bool,

    /// Require a beta pre-release
    #[arg(long)]
    beta: bool,

    /// Require a release candidate
    #[arg(long)]
    rc: bool,

    /// Require a dev release
    #[arg(long)]
    dev: bool,

    /// Require a final release
    #[arg(long)]
    release: bool,

    /// Validate only; the check never writes anything either way
    #[arg(long)]
    dry: bool,

    /// Package name on the registry (defaults to the module name)
    #[arg(long, value_name = "NAME")]
    package: Option<String>,

    /// Check this version instead of reading it from the module
    #[arg(long, value_name = "VERSION")]
    declared: Option<String>,

    /// Directory containing the module sources
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Registry base URL
    #[arg(long, value_name = "URL", env = "CV_REGISTRY_URL", default_value = DEFAULT_REGISTRY)]
    registry: String,

    /// Registry request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    timeout: u64,

    /// Suppress output, exit code only
    #[arg(short, long)]
    quiet: bool,

    /// Log what is being checked (CV_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let flags = [self.alpha, self.beta, self.rc, self.dev, self.release];
        let release_types = ReleaseType::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(release_type, set)| set.then_some(release_type))
            .collect();

        Config {
            module: self.module.clone(),
            package: self.package.clone(),
            release_types,
            dry: self.dry,
            registry_url: self.registry.clone(),
            timeout: Duration::from_secs(self.timeout),
            root: self.root.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "cv=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CV_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config();
    let provider: Box<dyn VersionProvider> = match &cli.declared {
        Some(version) => Box::new(FixedVersion(version.clone())),
        None => Box::new(SourceTree::new(config.root.clone())),
    };
    let client = Client::with_registry(&config.registry_url, config.timeout);
    if config.dry {
        info!("dry run");
    }

    match run(&config, provider.as_ref(), &client) {
        Ok(verified) => {
            if !cli.quiet {
                println!(
                    "OK: {} {} is not present on PyPI.",
                    verified.name, verified.version
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
