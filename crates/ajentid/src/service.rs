//! The service entry point handed control once startup completes.

use std::error::Error as StdError;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use ajenti_config::StartupConfig;

use crate::process::RunMode;

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Boxed error type carried by failing services.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// What the entry point sees of the bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct ServiceContext<'a> {
    /// Startup configuration built once at process entry.
    pub config: &'a StartupConfig,
    /// Mode the supervisor selected.
    pub mode: RunMode,
}

/// Ways a service run can end other than success.
#[derive(Debug, Error)]
pub enum ServiceFailure {
    /// The operator interrupted the service from the terminal.
    #[error("interrupted by user")]
    Interrupted,
    /// The service failed.
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl ServiceFailure {
    /// Wraps an arbitrary error as a service failure.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }
}

/// Runs the actual service workload. Invoked once per process.
pub trait EntryPoint {
    /// Runs the service until it stops.
    fn run(&self, context: &ServiceContext<'_>) -> Result<(), ServiceFailure>;
}

impl<F> EntryPoint for F
where
    F: Fn(&ServiceContext<'_>) -> Result<(), ServiceFailure>,
{
    fn run(&self, context: &ServiceContext<'_>) -> Result<(), ServiceFailure> {
        self(context)
    }
}

/// Default entry point: idles until a termination signal arrives.
///
/// `SIGINT` in the foreground is reported as a user interrupt. Every other
/// termination signal, and `SIGINT` in the background, stops cleanly.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalService;

impl EntryPoint for SignalService {
    fn run(&self, context: &ServiceContext<'_>) -> Result<(), ServiceFailure> {
        let mut signals =
            Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP]).map_err(ServiceFailure::failed)?;
        info!(
            target: SERVICE_TARGET,
            mode = ?context.mode,
            platform = %context.config.platform,
            config = %context.config.config_path,
            "service running"
        );
        let Some(signal) = signals.forever().next() else {
            return Ok(());
        };
        info!(target: SERVICE_TARGET, signal, "termination signal received");
        if signal == SIGINT && context.mode == RunMode::Foreground {
            return Err(ServiceFailure::Interrupted);
        }
        Ok(())
    }
}
