//! CLI configuration

use crate::commands::{Cli, ColorArg};
use crate::error::{CliError, CliResult};
use pagekit::logging::Verbosity;
use pagekit::FrameworkConfig;
use std::path::Path;

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// CLI configuration: output settings plus the framework configuration
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Framework configuration the commands run with
    pub framework: FrameworkConfig,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set the framework configuration
    #[must_use]
    pub fn with_framework(mut self, framework: FrameworkConfig) -> Self {
        self.framework = framework;
        self
    }

    /// Build from parsed arguments.
    ///
    /// The framework configuration comes from `--config` when given,
    /// otherwise from the defaults; `PAGEKIT_*` overrides apply either way.
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let framework = match &cli.config {
            Some(path) => load_framework(path)?,
            None => {
                let mut framework = FrameworkConfig::default();
                framework
                    .apply_env_overrides()
                    .map_err(|e| CliError::config(e.to_string()))?;
                framework
            }
        };
        Ok(Self::new()
            .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
            .with_color(cli.color.into())
            .with_framework(framework))
    }
}

fn load_framework(path: &Path) -> CliResult<FrameworkConfig> {
    if !path.exists() {
        return Err(CliError::config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }
    FrameworkConfig::load(path).map_err(|e| CliError::config(e.to_string()))
}
