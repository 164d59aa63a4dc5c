//! Command-line flags consumed by the daemon bootstrap.

use camino::Utf8PathBuf;
use clap::Parser;

use crate::defaults::default_config_path;
use crate::logging::LogFormat;

/// Command-line interface for the Ajenti daemon.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "ajentid", version, about = "Ajenti panel daemon")]
pub struct Cli {
    /// Configuration file to load.
    #[arg(short = 'c', long = "config", value_name = "PATH", default_value_t = default_config_path())]
    pub config: Utf8PathBuf,
    /// Enables debug logging.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Detaches from the terminal and runs in the background.
    #[arg(short = 'd', long = "daemon")]
    pub daemonize: bool,
    /// Overrides the detected platform family.
    #[arg(long = "set-platform", value_name = "NAME")]
    pub platform: Option<String>,
    /// Controls how log lines are rendered.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
