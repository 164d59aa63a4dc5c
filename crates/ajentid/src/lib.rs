//! Single-instance bootstrap for the Ajenti daemon.
//!
//! The binary parses its flags, installs structured telemetry and resolves the
//! startup configuration before handing over to the supervisor. In the
//! foreground the supervisor simply calls the service entry point. In the
//! background it first takes an advisory lock on the pid file so only one
//! instance runs per host, rotates the log, detaches from the terminal and
//! re-initialises logging for the redirected streams.
//!
//! Whatever escapes the entry point, returned error or panic, is caught once
//! and handed to a [`CrashHandler`]. The default [`CrashReporter`] writes a
//! report file next to the logs so failures of a detached process are not
//! lost. The lock is released on every exit path through an explicit
//! [`LockHandle::release`] backed by a `Drop` guard.

mod bootstrap;
mod crash;
mod health;
mod logs;
mod process;
mod service;
mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, run};
pub use crash::{CrashHandler, CrashReporter, EntryPointFailure};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use logs::{LogSink, LogSinkError, RotatingLogSink};
pub use process::{
    Acquisition, Contention, DaemonizeError, Daemonizer, LaunchError, LockError, LockHandle,
    RedirectStreams, RunMode, SingletonLock, StartupOutcome, SystemDaemonizer, run_daemon,
    run_service, select_mode,
};
pub use service::{BoxError, EntryPoint, ServiceContext, ServiceFailure, SignalService};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
