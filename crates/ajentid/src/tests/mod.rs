//! Test suites for the daemon bootstrap and supervisor.

mod support;
