//! Supervises daemon launch sequencing and the single entry point call.

use std::fs::OpenOptions;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8Path;
use tracing::info;

use ajenti_config::StartupConfig;

use crate::crash::{CrashHandler, CrashReporter, EntryPointFailure};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::logs::{LogSink, RotatingLogSink};
use crate::service::{EntryPoint, ServiceContext, ServiceFailure, SignalService};
use crate::telemetry::TelemetryHandle;

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, RedirectStreams, SystemDaemonizer};
use super::errors::LaunchError;
use super::lock::{Acquisition, SingletonLock};

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Remain attached to the terminal.
    Foreground,
    /// Fork into the background and detach from the controlling terminal.
    Background,
}

/// Picks the run mode from the daemonize flag.
#[must_use]
pub fn select_mode(daemonize: bool) -> RunMode {
    if daemonize {
        RunMode::Background
    } else {
        RunMode::Foreground
    }
}

/// How a supervised run ended.
#[derive(Debug)]
pub enum StartupOutcome {
    /// The entry point returned normally.
    Success,
    /// The operator interrupted a foreground run.
    Interrupted,
    /// The entry point failed and the crash handler has recorded it.
    Crashed(EntryPointFailure),
}

impl StartupOutcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Success | Self::Interrupted => ExitCode::SUCCESS,
            Self::Crashed(_) => ExitCode::FAILURE,
        }
    }
}

/// Process-level collaborators needed to detach.
pub(crate) struct ProcessControl<D, L> {
    pub(crate) daemonizer: D,
    pub(crate) log: L,
}

/// Service-side collaborators: the entry point and its observers.
pub(crate) struct ServiceDeps<E> {
    pub(crate) entry: E,
    pub(crate) crash: Arc<dyn CrashHandler>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<D, L, E> {
    pub(crate) process: ProcessControl<D, L>,
    pub(crate) services: ServiceDeps<E>,
}

/// Runs the default signal-driven service with the production collaborators.
pub fn run_daemon(
    config: &StartupConfig,
    telemetry: Option<TelemetryHandle>,
) -> Result<StartupOutcome, LaunchError> {
    run_service(config, telemetry, SignalService)
}

/// Runs `entry` under supervision with the production collaborators.
pub fn run_service<E>(
    config: &StartupConfig,
    telemetry: Option<TelemetryHandle>,
    entry: E,
) -> Result<StartupOutcome, LaunchError>
where
    E: EntryPoint,
{
    let log = RotatingLogSink::new(config.paths.log_path(), config.paths.log_backups())
        .with_telemetry(telemetry);
    let plan = LaunchPlan {
        process: ProcessControl {
            daemonizer: SystemDaemonizer::new(),
            log,
        },
        services: ServiceDeps {
            entry,
            crash: Arc::new(CrashReporter::new(config)),
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_daemon_with(config, plan)
}

/// Runs the supervisor with injected collaborators.
pub(crate) fn run_daemon_with<D, L, E>(
    config: &StartupConfig,
    plan: LaunchPlan<D, L, E>,
) -> Result<StartupOutcome, LaunchError>
where
    D: Daemonizer,
    L: LogSink,
    E: EntryPoint,
{
    let LaunchPlan { process, services } = plan;
    let mode = select_mode(config.daemonize);
    services.reporter.mode_selected(mode);
    info!(
        target: PROCESS_TARGET,
        ?mode,
        platform = %config.platform,
        config = %config.config_path,
        "starting daemon runtime"
    );
    match mode {
        RunMode::Foreground => Ok(supervise(config, mode, &services)),
        RunMode::Background => run_background(config, process, &services),
    }
}

fn run_background<D, L, E>(
    config: &StartupConfig,
    process: ProcessControl<D, L>,
    services: &ServiceDeps<E>,
) -> Result<StartupOutcome, LaunchError>
where
    D: Daemonizer,
    L: LogSink,
    E: EntryPoint,
{
    let ProcessControl { daemonizer, log } = process;
    let paths = &config.paths;
    // The lock comes first so a refused launch leaves the running
    // instance's logs untouched.
    let mut handle = match SingletonLock::acquire(paths.lock_path())? {
        Acquisition::Acquired(handle) => handle,
        Acquisition::AlreadyRunning(contention) => {
            services.reporter.lock_contended(&contention);
            return Err(LaunchError::AlreadyRunning {
                path: contention.path,
                pid: contention.pid,
            });
        }
    };
    services
        .reporter
        .lock_acquired(handle.path(), handle.held_pid());

    log.prepare()?;
    let streams = open_log_streams(paths.log_path())?;
    services.reporter.detaching(paths.log_path());
    daemonizer.daemonize(paths.work_dir(), streams)?;
    let pid = std::process::id();
    handle.record_pid(pid)?;
    log.reinitialise()?;
    services.reporter.detached(pid);

    let outcome = supervise(config, RunMode::Background, services);
    let path = handle.path().to_path_buf();
    handle.release()?;
    services.reporter.lock_released(&path);
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(outcome)
}

/// Calls the entry point once and routes any failure to the crash handler.
fn supervise<E>(config: &StartupConfig, mode: RunMode, services: &ServiceDeps<E>) -> StartupOutcome
where
    E: EntryPoint,
{
    services.reporter.entry_started(mode);
    let context = ServiceContext { config, mode };
    let result = panic::catch_unwind(AssertUnwindSafe(|| services.entry.run(&context)));
    let outcome = match result {
        Ok(Ok(())) => StartupOutcome::Success,
        Ok(Err(ServiceFailure::Interrupted)) => match mode {
            RunMode::Foreground => StartupOutcome::Interrupted,
            RunMode::Background => StartupOutcome::Crashed(EntryPointFailure::DetachedInterrupt),
        },
        Ok(Err(ServiceFailure::Failed(source))) => {
            StartupOutcome::Crashed(EntryPointFailure::Error { source })
        }
        Err(payload) => StartupOutcome::Crashed(EntryPointFailure::from_panic(&*payload)),
    };
    services
        .reporter
        .entry_finished(mode, !matches!(outcome, StartupOutcome::Crashed(_)));
    match &outcome {
        StartupOutcome::Crashed(failure) => services.crash.handle(failure),
        StartupOutcome::Interrupted => {
            info!(target: PROCESS_TARGET, "interrupted by user");
        }
        StartupOutcome::Success => {}
    }
    outcome
}

fn open_log_streams(path: &Utf8Path) -> Result<RedirectStreams, LaunchError> {
    let open = || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LaunchError::LogStream {
                path: path.to_path_buf(),
                source,
            })
    };
    Ok(RedirectStreams {
        stdout: open()?,
        stderr: open()?,
    })
}
