//! Command handlers, kept out of main.rs for testability

pub mod config;
pub mod probe;
pub mod xpath;

pub use config::execute_config;
pub use probe::{execute_probe, probe_page, ProbeReport};
pub use xpath::execute_xpath;
