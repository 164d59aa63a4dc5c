//! Daemon process supervision: singleton lock, detachment and launch sequencing.

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod files;
pub(crate) mod launch;
pub(crate) mod lock;

pub use daemonizer::{DaemonizeError, Daemonizer, RedirectStreams, SystemDaemonizer};
pub use errors::{LaunchError, LockError};
pub use launch::{RunMode, StartupOutcome, run_daemon, run_service, select_mode};
pub use lock::{Acquisition, Contention, LockHandle, SingletonLock};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
