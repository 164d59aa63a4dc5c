//! Process-wide startup configuration, built once at entry.

use camino::{Utf8Path, Utf8PathBuf};

use crate::cli::Cli;
use crate::defaults::{DEFAULT_LOG_FILTER, VERBOSE_LOG_FILTER};
use crate::document::{ConfigDocument, ConfigError, resolve_config_path};
use crate::logging::LogFormat;
use crate::platform::Platform;
use crate::runtime::RuntimePaths;

/// Everything the bootstrap decided before handing over to the supervisor.
///
/// The value is constructed once and passed by reference to the supervisor
/// and the service entry point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartupConfig {
    /// Resolved configuration file path.
    pub config_path: Utf8PathBuf,
    /// Parsed configuration file.
    pub document: ConfigDocument,
    /// Whether background execution was requested.
    pub daemonize: bool,
    /// Whether debug logging was requested.
    pub verbose: bool,
    /// Log rendering format.
    pub log_format: LogFormat,
    /// Platform family, detected or overridden.
    pub platform: Platform,
    /// Locations of runtime artefacts.
    pub paths: RuntimePaths,
}

impl StartupConfig {
    /// Resolves and loads the configuration described by `cli`.
    ///
    /// `cwd` is the directory searched for a local `config.json`; `os_release`
    /// holds the host's os-release contents when readable.
    pub fn resolve(
        cli: &Cli,
        cwd: &Utf8Path,
        os_release: Option<&str>,
        paths: RuntimePaths,
    ) -> Result<Self, ConfigError> {
        let config_path = resolve_config_path(&cli.config, cwd);
        let document = ConfigDocument::load(&config_path)?;
        Ok(Self {
            config_path,
            document,
            daemonize: cli.daemonize,
            verbose: cli.verbose,
            log_format: cli.log_format,
            platform: Platform::resolve(cli.platform.as_deref(), os_release),
            paths,
        })
    }

    /// Log filter derived from the verbose flag.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        log_filter_for(self.verbose)
    }
}

/// Log filter for the given verbosity.
#[must_use]
pub fn log_filter_for(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}
