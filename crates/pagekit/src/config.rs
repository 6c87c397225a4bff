//! Framework configuration.
//!
//! Every value has a default tuned for the application under test; a YAML
//! file only needs to name what it changes. A few deployment concerns can be
//! overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `PAGEKIT_CHROMIUM_PATH` | `session.chromium_path` |
//! | `PAGEKIT_HEADLESS` | `session.headless` |
//! | `PAGEKIT_LOG_DIR` | `diagnostics.screenshot_dir` / `html_dir` (as `<dir>/screenshot`, `<dir>/html`) |

use crate::result::{PagekitError, PagekitResult};
use crate::wait::{
    LoadingOptions, WaitOptions, DEFAULT_APPEAR_GRACE_MS, DEFAULT_BUSY_INDICATORS,
    DEFAULT_LOADING_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RUNTIME_SPINNER,
    DEFAULT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the Chromium binary
pub const ENV_CHROMIUM_PATH: &str = "PAGEKIT_CHROMIUM_PATH";
/// Environment variable overriding headless mode
pub const ENV_HEADLESS: &str = "PAGEKIT_HEADLESS";
/// Environment variable overriding the diagnostics root directory
pub const ENV_LOG_DIR: &str = "PAGEKIT_LOG_DIR";

/// Desktop user agent the application is tested with
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_2) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.116 Safari/537.36";

// =============================================================================
// SECTIONS
// =============================================================================

/// Timeouts in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default for element operations
    pub default_ms: u64,
    /// Page navigation
    pub navigation_ms: u64,
    /// Container becoming visible
    pub visible_ms: u64,
    /// Container closing
    pub close_ms: u64,
    /// Boolean presence probes (`is_visible`, `exists`)
    pub probe_ms: u64,
    /// Loading indicators clearing
    pub loading_ms: u64,
    /// Polling interval shared by all waits
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_WAIT_TIMEOUT_MS,
            navigation_ms: 60_000,
            visible_ms: 60_000,
            close_ms: 120_000,
            probe_ms: 1_000,
            loading_ms: DEFAULT_LOADING_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TimeoutConfig {
    /// Wait options with the given timeout and the shared poll interval
    #[must_use]
    pub const fn wait(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions {
            timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Wait options for element operations
    #[must_use]
    pub const fn default_wait(&self) -> WaitOptions {
        self.wait(self.default_ms)
    }

    /// Navigation timeout as a Duration
    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }
}

/// Bounded retry policy for actions whose effect is applied asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed delay between an attempt and re-checking its effect
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy
    #[must_use]
    pub const fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Backoff as Duration
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Busy indicators watched by the loading wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// XPaths of spinners and blocking overlays
    pub indicators: Vec<String>,
    /// XPath of the runtime spinner
    pub runtime_spinner: String,
    /// Time allowed for an indicator to appear after an action
    pub appear_grace_ms: u64,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            indicators: DEFAULT_BUSY_INDICATORS.iter().map(ToString::to_string).collect(),
            runtime_spinner: DEFAULT_RUNTIME_SPINNER.to_string(),
            appear_grace_ms: DEFAULT_APPEAR_GRACE_MS,
        }
    }
}

/// Failure artifact output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Capture artifacts on failure
    pub enabled: bool,
    /// Directory for PNG screenshots
    pub screenshot_dir: PathBuf,
    /// Directory for HTML dumps
    pub html_dir: PathBuf,
    /// Capture the full scrollable page
    pub full_page: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            screenshot_dir: PathBuf::from("logs/screenshot"),
            html_dir: PathBuf::from("logs/html"),
            full_page: true,
        }
    }
}

impl DiagnosticsConfig {
    /// Both directories beneath `root`
    #[must_use]
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            screenshot_dir: root.join("screenshot"),
            html_dir: root.join("html"),
            ..Self::default()
        }
    }
}

/// Scenario runner policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Extra attempts after a failure
    pub retry_times: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { retry_times: 1 }
    }
}

/// Browser session setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// User agent override
    pub user_agent: Option<String>,
    /// Chromium binary (auto-detected when unset)
    pub chromium_path: Option<PathBuf>,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1300,
            viewport_height: 1000,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            chromium_path: None,
            sandbox: true,
        }
    }
}

/// Data table paging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTableConfig {
    /// Rows per page
    pub page_size: u32,
}

impl Default for DataTableConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

// =============================================================================
// FRAMEWORK CONFIG
// =============================================================================

/// Complete framework configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Timeouts
    pub timeouts: TimeoutConfig,
    /// Checkbox check/uncheck retries
    pub checkbox: RetryPolicy,
    /// Loading indicators
    pub loading: LoadingConfig,
    /// Failure artifacts
    pub diagnostics: DiagnosticsConfig,
    /// Scenario runner
    pub runner: RunnerConfig,
    /// Browser session
    pub session: SessionConfig,
    /// Data tables
    pub data_table: DataTableConfig,
}

impl FrameworkConfig {
    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> PagekitResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> PagekitResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| PagekitError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let mut config = Self::from_yaml_str(&yaml)?;
        config.apply_env_overrides()?;
        tracing::debug!(path = %path.display(), "loaded framework config");
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> PagekitResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `PAGEKIT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> PagekitResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PagekitResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|p| !p.is_empty()) {
            self.session.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.session.headless = parse_bool(&raw).ok_or_else(|| PagekitError::Config {
                message: format!("{ENV_HEADLESS} must be true or false, got {raw:?}"),
            })?;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|d| !d.is_empty()) {
            let rooted = DiagnosticsConfig::rooted_at(dir);
            self.diagnostics.screenshot_dir = rooted.screenshot_dir;
            self.diagnostics.html_dir = rooted.html_dir;
        }
        self.validate()
    }

    /// Reject values no wait or retry loop can work with
    pub fn validate(&self) -> PagekitResult<()> {
        let invalid = |message: &str| {
            Err(PagekitError::Config {
                message: message.to_string(),
            })
        };
        if self.timeouts.poll_interval_ms == 0 {
            return invalid("timeouts.poll_interval_ms must be greater than zero");
        }
        if self.checkbox.max_attempts == 0 {
            return invalid("checkbox.max_attempts must be at least 1");
        }
        if self.session.viewport_width == 0 || self.session.viewport_height == 0 {
            return invalid("session viewport must be non-empty");
        }
        if self.data_table.page_size == 0 {
            return invalid("data_table.page_size must be at least 1");
        }
        Ok(())
    }

    /// Loading wait options (runtime spinner included or not)
    #[must_use]
    pub fn loading_options(&self, include_runtime_spinner: bool) -> LoadingOptions {
        LoadingOptions {
            timeout_ms: self.timeouts.loading_ms,
            poll_interval_ms: self.timeouts.poll_interval_ms,
            appear_grace_ms: self.loading.appear_grace_ms,
            indicators: self.loading.indicators.clone(),
            include_runtime_spinner,
            runtime_spinner: self.loading.runtime_spinner.clone(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
