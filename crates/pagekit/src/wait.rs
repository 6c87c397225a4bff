//! Wait utilities.
//!
//! Every wait in pagekit is bounded. [`poll_until`] is the primitive the
//! other helpers are built on: it awaits the probe, checks the result and
//! sleeps, so probe invocations never overlap. A probe that is still running
//! when the deadline passes is cancelled, so no wait blocks for longer than
//! its timeout.

use crate::driver::{release_all, release_quietly, NodeRef, PageDriver};
use crate::locator::{text_xpath, TextMatch};
use crate::result::{PagekitError, PagekitResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default timeout for the loading wait (2 minutes)
pub const DEFAULT_LOADING_TIMEOUT_MS: u64 = 120_000;

/// How long the loading wait gives a busy indicator to show up
pub const DEFAULT_APPEAR_GRACE_MS: u64 = 2_000;

/// Busy indicators that block interaction with the application
pub const DEFAULT_BUSY_INDICATORS: [&str; 3] = [
    r#"//*[contains(concat(" ", normalize-space(@class), " "), " spinner ")]"#,
    r#"//*[contains(@style, "running-spinner")]"#,
    r#"//*[@aria-busy="true"]"#,
];

/// Spinner of the slow, separately loading compute runtime
pub const DEFAULT_RUNTIME_SPINNER: &str =
    r#"//*[@data-test-id="runtime-status-icon-container"]/*[@data-icon="sync-alt"]"#;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Timeout and polling policy of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration (never zero)
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            Duration::from_millis(1)
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
    /// Number of probe invocations
    pub polls: u32,
}

impl WaitResult {
    fn new(elapsed: Duration, waited_for: &str, polls: u32) -> Self {
        Self {
            elapsed,
            waited_for: waited_for.to_string(),
            polls,
        }
    }
}

// =============================================================================
// POLLING PRIMITIVES
// =============================================================================

/// Poll `probe` until it yields a value.
///
/// `probe` is awaited to completion before the next poll is scheduled. An
/// error from `probe` ends the wait immediately. On timeout the error
/// carries `description` and the elapsed time.
pub async fn poll_until<T, F, Fut>(
    description: &str,
    options: &WaitOptions,
    mut probe: F,
) -> PagekitResult<(T, WaitResult)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PagekitResult<Option<T>>>,
{
    let started = Instant::now();
    let deadline = started + options.timeout();
    let mut polls = 0u32;

    loop {
        polls += 1;
        match tokio::time::timeout_at(deadline, probe()).await {
            Ok(Ok(Some(value))) => {
                let result = WaitResult::new(started.elapsed(), description, polls);
                tracing::trace!(waited_for = description, polls, "wait satisfied");
                return Ok((value, result));
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(options.poll_interval().min(deadline - now)).await;
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(waited_for = description, elapsed_ms, polls, "wait timed out");
    Err(PagekitError::timeout(description, elapsed_ms))
}

/// Poll an async predicate until it returns `true`
pub async fn wait_for_fn<F, Fut>(
    description: &str,
    options: &WaitOptions,
    mut predicate: F,
) -> PagekitResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PagekitResult<bool>>,
{
    let (_, result) = poll_until(description, options, || {
        let fut = predicate();
        async move { Ok::<_, PagekitError>(fut.await?.then_some(())) }
    })
    .await?;
    Ok(result)
}

// =============================================================================
// DOM WAITS
// =============================================================================

/// State a located node should reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// At least one match is attached (may be invisible)
    Present,
    /// At least one match is displayed
    Visible,
    /// No match is displayed (absent counts as hidden)
    Hidden,
}

impl Visibility {
    const fn describe(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// First displayed node among `nodes`.
///
/// A node that detaches between the query and the check counts as not
/// displayed. Every node other than the one returned is released.
pub(crate) async fn first_displayed(
    driver: &dyn PageDriver,
    nodes: Vec<NodeRef>,
) -> PagekitResult<Option<NodeRef>> {
    let mut found = None;
    let mut failure = None;
    for node in nodes {
        if found.is_some() || failure.is_some() {
            release_quietly(driver, &node).await;
            continue;
        }
        match driver.is_displayed(&node).await {
            Ok(true) => found = Some(node),
            Ok(false) | Err(PagekitError::StaleElement { .. }) => {
                release_quietly(driver, &node).await;
            }
            Err(e) => {
                release_quietly(driver, &node).await;
                failure = Some(e);
            }
        }
    }
    match failure {
        Some(e) => {
            if let Some(node) = &found {
                release_quietly(driver, node).await;
            }
            Err(e)
        }
        None => Ok(found),
    }
}

async fn probe_node(
    driver: &dyn PageDriver,
    xpath: &str,
    require_visible: bool,
) -> PagekitResult<Option<NodeRef>> {
    let mut nodes = driver.query_xpath(xpath).await?;
    if require_visible {
        return first_displayed(driver, nodes).await;
    }
    if nodes.is_empty() {
        return Ok(None);
    }
    let first = nodes.remove(0);
    release_all(driver, &nodes).await;
    Ok(Some(first))
}

async fn probe_hidden(driver: &dyn PageDriver, xpath: &str) -> PagekitResult<Option<()>> {
    let nodes = driver.query_xpath(xpath).await?;
    match first_displayed(driver, nodes).await? {
        Some(node) => {
            release_quietly(driver, &node).await;
            Ok(None)
        }
        None => Ok(Some(())),
    }
}

/// Wait until `xpath` matches an attached node, displayed if
/// `require_visible` is set, and return it.
///
/// A timeout fails with `NotFound`.
pub async fn wait_for_node(
    driver: &dyn PageDriver,
    xpath: &str,
    require_visible: bool,
    options: &WaitOptions,
) -> PagekitResult<NodeRef> {
    let state = if require_visible {
        Visibility::Visible
    } else {
        Visibility::Present
    };
    let description = format!("{xpath} to be {}", state.describe());
    let outcome = poll_until(&description, options, || {
        probe_node(driver, xpath, require_visible)
    })
    .await;
    match outcome {
        Ok((node, _)) => Ok(node),
        Err(PagekitError::Timeout { elapsed_ms, .. }) => Err(PagekitError::NotFound {
            xpath: xpath.to_string(),
            elapsed_ms,
        }),
        Err(e) => Err(e),
    }
}

/// Wait until `xpath` reaches `state`.
///
/// Returns the matched node for `Present`/`Visible` and `None` for `Hidden`.
/// A `Present`/`Visible` wait that times out fails with `NotFound`.
pub async fn wait_for_xpath(
    driver: &dyn PageDriver,
    xpath: &str,
    state: Visibility,
    options: &WaitOptions,
) -> PagekitResult<Option<NodeRef>> {
    match state {
        Visibility::Present => wait_for_node(driver, xpath, false, options).await.map(Some),
        Visibility::Visible => wait_for_node(driver, xpath, true, options).await.map(Some),
        Visibility::Hidden => {
            let description = format!("{xpath} to be {}", state.describe());
            poll_until(&description, options, || probe_hidden(driver, xpath)).await?;
            Ok(None)
        }
    }
}

/// Wait until some node within `scope` displays `text`
pub async fn wait_for_text(
    driver: &dyn PageDriver,
    scope: Option<&str>,
    text: &TextMatch,
    options: &WaitOptions,
) -> PagekitResult<NodeRef> {
    let query = text_xpath(scope, text);
    let xpath = query.as_str();
    let description = format!("text {:?} within {}", text.text(), scope.unwrap_or("page"));
    let (node, _) = poll_until(&description, options, || async move {
        let nodes = driver.query_xpath(xpath).await?;
        first_displayed(driver, nodes).await
    })
    .await?;
    Ok(node)
}

/// Wait until `expression` evaluates to a truthy value in the page
pub async fn wait_for_script(
    driver: &dyn PageDriver,
    expression: &str,
    options: &WaitOptions,
) -> PagekitResult<serde_json::Value> {
    let description = format!("script `{expression}` to be truthy");
    let (value, _) = poll_until(&description, options, || async move {
        let value = driver.evaluate(expression).await?;
        Ok::<_, PagekitError>(is_truthy(&value).then_some(value))
    })
    .await?;
    Ok(value)
}

/// JavaScript truthiness of a JSON value
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// LOADING WAIT
// =============================================================================

/// Options of [`wait_while_loading`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingOptions {
    /// Overall timeout
    pub timeout_ms: u64,
    /// Polling interval
    pub poll_interval_ms: u64,
    /// Time allowed for a busy indicator to appear after an action
    pub appear_grace_ms: u64,
    /// XPaths of busy indicators
    pub indicators: Vec<String>,
    /// Also wait for the runtime spinner
    pub include_runtime_spinner: bool,
    /// XPath of the runtime spinner
    pub runtime_spinner: String,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_LOADING_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            appear_grace_ms: DEFAULT_APPEAR_GRACE_MS,
            indicators: DEFAULT_BUSY_INDICATORS.iter().map(ToString::to_string).collect(),
            include_runtime_spinner: true,
            runtime_spinner: DEFAULT_RUNTIME_SPINNER.to_string(),
        }
    }
}

impl LoadingOptions {
    /// Create loading options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overall timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the appear grace period
    #[must_use]
    pub const fn with_appear_grace(mut self, appear_grace_ms: u64) -> Self {
        self.appear_grace_ms = appear_grace_ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Include or skip the runtime spinner
    #[must_use]
    pub const fn with_runtime_spinner(mut self, include: bool) -> Self {
        self.include_runtime_spinner = include;
        self
    }

    /// Replace the busy indicator XPaths
    #[must_use]
    pub fn with_indicators<I, S>(mut self, indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indicators = indicators.into_iter().map(Into::into).collect();
        self
    }

    /// Indicator XPaths to watch, scoped beneath `scope`
    #[must_use]
    pub fn scoped_indicators(&self, scope: Option<&str>) -> Vec<String> {
        let scope = scope.unwrap_or("");
        self.indicators
            .iter()
            .chain(self.include_runtime_spinner.then_some(&self.runtime_spinner))
            .map(|xpath| format!("{scope}{xpath}"))
            .collect()
    }
}

async fn any_indicator_displayed(
    driver: &dyn PageDriver,
    indicators: &[String],
) -> PagekitResult<bool> {
    for xpath in indicators {
        let nodes = driver.query_xpath(xpath).await?;
        if let Some(node) = first_displayed(driver, nodes).await? {
            release_quietly(driver, &node).await;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Wait while any busy indicator under `scope` is displayed.
///
/// Gives an indicator up to the appear grace period to show up (an action
/// may not have rendered its spinner yet), then waits for all indicators
/// to clear. The whole wait is bounded by `timeout_ms`.
pub async fn wait_while_loading(
    driver: &dyn PageDriver,
    scope: Option<&str>,
    options: &LoadingOptions,
) -> PagekitResult<WaitResult> {
    let started = Instant::now();
    let scoped = options.scoped_indicators(scope);
    let indicators = scoped.as_slice();

    let grace = WaitOptions::new()
        .with_timeout(options.appear_grace_ms.min(options.timeout_ms))
        .with_poll_interval(options.poll_interval_ms);
    let appeared = wait_for_fn("busy indicator to appear", &grace, || {
        any_indicator_displayed(driver, indicators)
    })
    .await;
    match appeared {
        Ok(_) => tracing::debug!("busy indicator displayed, waiting for it to clear"),
        Err(PagekitError::Timeout { .. }) => {
            return Ok(WaitResult::new(started.elapsed(), "page idle", 1));
        }
        Err(e) => return Err(e),
    }

    let spent = started.elapsed().as_millis() as u64;
    let clear = WaitOptions::new()
        .with_timeout(options.timeout_ms.saturating_sub(spent))
        .with_poll_interval(options.poll_interval_ms);
    let mut result = wait_for_fn("busy indicators to clear", &clear, || async move {
        Ok::<_, PagekitError>(!any_indicator_displayed(driver, indicators).await?)
    })
    .await
    .map_err(|e| match e {
        PagekitError::Timeout { description, .. } => {
            PagekitError::timeout(description, started.elapsed().as_millis() as u64)
        }
        other => other,
    })?;
    result.elapsed = started.elapsed();
    Ok(result)
}

// =============================================================================
// TESTS
// =============================================================================
