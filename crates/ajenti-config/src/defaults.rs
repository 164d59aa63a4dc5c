use camino::Utf8PathBuf;

/// System-wide configuration file consulted when `--config` is not supplied.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ajenti/config.json";

/// File name looked up in the working directory when the requested config is absent.
pub const LOCAL_CONFIG_NAME: &str = "config.json";

/// Lock file guarding the single background instance.
pub const DEFAULT_LOCK_PATH: &str = "/var/run/ajenti.pid";

/// Log file receiving redirected output while running in the background.
pub const DEFAULT_LOG_PATH: &str = "/var/log/ajenti/ajenti.log";

/// Directory receiving crash reports.
pub const DEFAULT_CRASH_DIR: &str = "/var/log/ajenti";

/// Working directory adopted after detaching.
pub const DEFAULT_WORK_DIR: &str = "/";

/// Number of rotated log files kept next to the active log.
pub const DEFAULT_LOG_BACKUPS: usize = 5;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter applied when `--verbose` is set.
pub const VERBOSE_LOG_FILTER: &str = "debug";

/// Default path of the system configuration file.
pub fn default_config_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_CONFIG_PATH)
}
