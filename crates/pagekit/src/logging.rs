//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Binaries and test suites
//! call [`init`] once to see them; calling it again is harmless.

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Milestones
    #[default]
    Normal,
    /// Every locate and click
    Verbose,
    /// Every poll
    Trace,
}

impl Verbosity {
    /// Map `-q` / `-v` counts to a verbosity
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// Filter directive for this verbosity
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Build the filter: `RUST_LOG` wins when set, otherwise the verbosity
#[must_use]
pub fn filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Install a global subscriber writing to stderr.
///
/// Returns `false` when a subscriber was already installed.
pub fn init(verbosity: Verbosity) -> bool {
    tracing_subscriber::registry()
        .with(filter(verbosity))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber (one event per line) writing to stderr
pub fn init_json(verbosity: Verbosity) -> bool {
    tracing_subscriber::registry()
        .with(filter(verbosity))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}
