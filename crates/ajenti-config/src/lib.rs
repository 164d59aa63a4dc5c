//! Startup configuration for the Ajenti daemon.
//!
//! The crate owns the pieces of startup that are plain data: command-line
//! flags, discovery and parsing of the JSON config file, platform detection,
//! and the locations of runtime artefacts. Everything is collected into a
//! single [`StartupConfig`] that the daemon crate threads through its
//! supervisor instead of relying on process-wide globals.

mod cli;
mod defaults;
mod document;
mod logging;
mod platform;
mod runtime;
mod startup;

pub use cli::Cli;
pub use defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_CRASH_DIR, DEFAULT_LOCK_PATH, DEFAULT_LOG_BACKUPS,
    DEFAULT_LOG_FILTER, DEFAULT_LOG_PATH, DEFAULT_WORK_DIR, LOCAL_CONFIG_NAME,
    VERBOSE_LOG_FILTER, default_config_path,
};
pub use document::{ConfigDocument, ConfigError, resolve_config_path};
pub use logging::{LogFormat, LogFormatParseError};
pub use platform::{OS_RELEASE_PATH, Platform};
pub use runtime::RuntimePaths;
pub use startup::{StartupConfig, log_filter_for};
