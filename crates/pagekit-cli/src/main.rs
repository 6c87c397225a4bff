//! Pagekit CLI: locator and page tooling for browser E2E suites
//!
//! ## Usage
//!
//! ```bash
//! pagekit xpath --kind button --normalize-space "Create Workspace"
//! pagekit probe http://localhost:4200 --text "Workspaces"   # needs --features browser
//! pagekit config --config e2e.yaml
//! ```

use clap::Parser;
use pagekit::logging::{self, Verbosity};
use pagekit_cli::{
    handlers, Cli, CliConfig, CliResult, Commands, OutputFormatArg, ProbeArgs, Reporter,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.quiet, cli.verbose));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::from_cli(&cli)?;
    let reporter = Reporter::new(config.color.should_color(), config.verbosity == Verbosity::Quiet);

    match cli.command {
        Commands::Xpath(args) => {
            reporter.result(&handlers::execute_xpath(&args)?);
            Ok(())
        }
        Commands::Probe(args) => run_probe(&config, &args, &reporter).await,
        Commands::Config(args) => {
            reporter.result(&handlers::execute_config(&config, &args)?);
            Ok(())
        }
    }
}

async fn run_probe(config: &CliConfig, args: &ProbeArgs, reporter: &Reporter) -> CliResult<()> {
    reporter.info(&format!("probing {}", args.url));
    let report = match handlers::execute_probe(config, args).await {
        Ok(report) => report,
        Err(e) => {
            reporter.failure(&format!("{} did not pass", args.url));
            return Err(e);
        }
    };
    match args.format {
        OutputFormatArg::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| pagekit_cli::CliError::probe(e.to_string()))?;
            reporter.result(&json);
        }
        OutputFormatArg::Text => {
            reporter.result(&format!("url:   {}", report.url));
            reporter.result(&format!("title: {}", report.title));
        }
    }
    reporter.success(&format!("{} passed in {}ms", args.url, report.elapsed_ms));
    Ok(())
}
