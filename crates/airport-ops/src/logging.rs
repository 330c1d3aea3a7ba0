//! Tracing setup for the `airportctl` binary and the test suite.
//!
//! Control tower decisions are logged at `info` (accepted) and `warn`
//! (rejected). Ground crew ticks that find nothing to do log at `debug`.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate target used in the default filter directive.
const LOG_TARGET: &str = "airport_ops";

/// How much the binary reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Decisions and sweeps.
    #[default]
    Normal,
    /// Adds storage activity and idle sweeps.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Map the `-q` / `-v` command-line flags to a verbosity.
    ///
    /// `quiet` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Tracing level for this verbosity.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn directive(self) -> String {
        format!("{LOG_TARGET}={}", self.level())
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `verbosity` when set. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_logging(verbosity: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(verbosity != Verbosity::Normal)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Route warnings and errors to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
