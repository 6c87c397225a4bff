//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use pagekit::locator::QueryOptions;
use pagekit::ElementKind;
use std::path::PathBuf;

use crate::error::CliResult;

/// Pagekit: page-object tooling for browser E2E suites
#[derive(Parser, Debug)]
#[command(name = "pagekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Framework configuration file (YAML)
    #[arg(short, long, global = true, env = "PAGEKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and print the XPath for an element query
    Xpath(XpathArgs),

    /// Open a live page and wait for text or an XPath to show up
    Probe(ProbeArgs),

    /// Print the effective framework configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the xpath command
#[derive(Parser, Debug, Default)]
pub struct XpathArgs {
    /// Element kind: button, icon, checkbox, radio, text, textarea, link, select, dropdown
    #[arg(short, long)]
    pub kind: String,

    /// Exact label
    #[arg(short, long)]
    pub name: Option<String>,

    /// Label with whitespace normalized
    #[arg(long)]
    pub normalize_space: Option<String>,

    /// Substring of the label
    #[arg(long)]
    pub contains: Option<String>,

    /// Parents to walk up from the label node
    #[arg(short, long)]
    pub ancestor_level: Option<u32>,

    /// Icon shape (icons only)
    #[arg(long)]
    pub icon_shape: Option<String>,

    /// 1-based position among all elements of the kind (no label)
    #[arg(long)]
    pub index: Option<u32>,

    /// XPath of the region to search within
    #[arg(short, long)]
    pub scope: Option<String>,
}

impl XpathArgs {
    /// Loose query options for the locator builder
    pub fn query_options(&self) -> CliResult<QueryOptions> {
        let kind: ElementKind = self.kind.parse()?;
        Ok(QueryOptions {
            kind: Some(kind),
            name: self.name.clone(),
            normalize_space: self.normalize_space.clone(),
            contains_text: self.contains.clone(),
            ancestor_level: self.ancestor_level,
            icon_shape: self.icon_shape.clone(),
            index: self.index,
        })
    }
}

/// Arguments for the probe command
#[derive(Parser, Debug, Default)]
pub struct ProbeArgs {
    /// Page to open
    pub url: String,

    /// Text that must show up on the page
    #[arg(short, long)]
    pub text: Option<String>,

    /// XPath that must become visible
    #[arg(short = 'x', long)]
    pub xpath: Option<String>,

    /// Wait timeout in milliseconds (defaults to the configured visible timeout)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Name used for failure artifacts
    #[arg(long, default_value = "probe")]
    pub name: String,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn test_parse_xpath_command() {
            let cli = Cli::try_parse_from([
                "pagekit",
                "xpath",
                "--kind",
                "checkbox",
                "--name",
                "Show all",
                "--ancestor-level",
                "2",
            ])
            .unwrap();
            let Commands::Xpath(args) = cli.command else {
                panic!("expected xpath command");
            };
            let opts = args.query_options().unwrap();
            assert_eq!(opts.kind, Some(ElementKind::Checkbox));
            assert_eq!(opts.name.as_deref(), Some("Show all"));
            assert_eq!(opts.ancestor_level, Some(2));
        }

        #[test]
        fn test_unknown_kind_is_rejected_by_options() {
            let args = XpathArgs {
                kind: "slider".to_string(),
                ..XpathArgs::default()
            };
            assert!(args.query_options().is_err());
        }

        #[test]
        fn test_parse_probe_command() {
            let cli = Cli::try_parse_from([
                "pagekit",
                "-vv",
                "probe",
                "http://localhost:4200/workspaces",
                "--text",
                "Workspaces",
                "--timeout",
                "5000",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            let Commands::Probe(args) = cli.command else {
                panic!("expected probe command");
            };
            assert_eq!(args.url, "http://localhost:4200/workspaces");
            assert_eq!(args.text.as_deref(), Some("Workspaces"));
            assert_eq!(args.timeout, Some(5000));
            assert_eq!(args.name, "probe");
            assert_eq!(args.format, OutputFormatArg::Text);
        }

        #[test]
        fn test_global_config_flag() {
            let cli =
                Cli::try_parse_from(["pagekit", "config", "--config", "e2e.yaml", "-q"]).unwrap();
            assert_eq!(cli.config, Some(PathBuf::from("e2e.yaml")));
            assert!(cli.quiet);
        }

        #[test]
        fn test_subcommand_is_required() {
            assert!(Cli::try_parse_from(["pagekit"]).is_err());
        }
    }
}
