//! Pagekit CLI library
//!
//! Operator tooling around the pagekit framework: print the XPath a query
//! builds, probe a live page, show the effective configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, OutputFormatArg, ProbeArgs, XpathArgs};
pub use config::{CliConfig, ColorChoice};
pub use error::{CliError, CliResult};
pub use output::Reporter;
