//! Process entry: flag parsing, telemetry, config resolution, then launch.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

use ajenti_config::{
    Cli, ConfigError, OS_RELEASE_PATH, RuntimePaths, StartupConfig, log_filter_for,
};

use crate::process::{LaunchError, run_daemon};
use crate::telemetry::{self, TelemetryError};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Builds the startup configuration for the parsed flags.
    fn load(&self, cli: &Cli) -> Result<StartupConfig, BootstrapError>;
}

/// Loader that reads the host: working directory, os-release and system paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self, cli: &Cli) -> Result<StartupConfig, BootstrapError> {
        let cwd =
            env::current_dir().map_err(|source| BootstrapError::WorkingDirectory { source })?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| BootstrapError::WorkingDirectory {
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("working directory {} is not valid UTF-8", path.display()),
            ),
        })?;
        let os_release = fs::read_to_string(OS_RELEASE_PATH).ok();
        StartupConfig::resolve(cli, &cwd, os_release.as_deref(), RuntimePaths::default())
            .map_err(|source| BootstrapError::Configuration { source })
    }
}

/// Errors surfaced before the supervisor takes over.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to resolve or load.
    #[error("{source}")]
    Configuration {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// The working directory could not be determined.
    #[error("failed to read working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The supervisor refused to start or failed while detaching.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Runs the daemon binary against the supplied arguments and streams.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &SystemConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &dyn ConfigLoader,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match bootstrap(&cli, loader) {
        Ok(exit) => exit,
        Err(error) => {
            tracing::error!(target: BOOTSTRAP_TARGET, error = %error, "startup aborted");
            if let Err(write_error) = writeln!(stderr, "{error}") {
                tracing::warn!(
                    target: BOOTSTRAP_TARGET,
                    error = %write_error,
                    "failed to print startup error"
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn bootstrap(cli: &Cli, loader: &dyn ConfigLoader) -> Result<ExitCode, BootstrapError> {
    let telemetry = telemetry::initialise(cli.log_format, log_filter_for(cli.verbose))
        .map_err(|source| BootstrapError::Telemetry { source })?;
    let config = loader.load(cli)?;
    let outcome = run_daemon(&config, Some(telemetry))?;
    Ok(outcome.exit_code())
}

fn report_usage<W, E>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    W: Write,
    E: Write,
{
    let rendered = error.render();
    let written = if error.use_stderr() {
        write!(stderr, "{rendered}")
    } else {
        write!(stdout, "{rendered}")
    };
    if let Err(write_error) = written {
        tracing::warn!(
            target: BOOTSTRAP_TARGET,
            error = %write_error,
            "failed to print usage"
        );
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}
