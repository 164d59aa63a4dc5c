//! Daemon entrypoint for Ajenti.
//!
//! Delegates to [`ajentid::run`], which parses flags, loads the configuration
//! and supervises the service in the foreground or the background.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: service threads log to stderr while `run` is active.
    ajentid::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
