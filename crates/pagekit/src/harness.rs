//! Scenario runner: retries and failure capture around test scenarios.

use crate::context::PageContext;
use crate::diagnostics::{DiagnosticsArtifact, FailureCapture};
use crate::result::PagekitResult;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the scenario passed
    pub passed: bool,
    /// Attempts made
    pub attempts: u32,
    /// Error of the last failed attempt
    pub error: Option<String>,
    /// Diagnostics written after the final failure
    pub artifact: Option<DiagnosticsArtifact>,
    /// Time spent over all attempts
    pub duration: Duration,
}

impl ScenarioResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(name: impl Into<String>, attempts: u32) -> Self {
        Self {
            name: name.into(),
            passed: true,
            attempts,
            error: None,
            artifact: None,
            duration: Duration::ZERO,
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(name: impl Into<String>, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            attempts,
            error: Some(error.into()),
            artifact: None,
            duration: Duration::ZERO,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Attach failure artifacts
    #[must_use]
    pub fn with_artifact(mut self, artifact: Option<DiagnosticsArtifact>) -> Self {
        self.artifact = artifact;
        self
    }
}

/// Results of several scenarios
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual results, in run order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Empty results for `suite_name`
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            ..Self::default()
        }
    }

    /// Record a result
    pub fn push(&mut self, result: ScenarioResult) {
        self.duration += result.duration;
        self.results.push(result);
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Runs scenarios against one page, retrying and capturing failures
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    ctx: PageContext,
    retry_times: u32,
    capture: FailureCapture,
}

impl ScenarioRunner {
    /// Runner using the page's runner and diagnostics configuration
    pub fn new(ctx: PageContext) -> Self {
        let retry_times = ctx.config().runner.retry_times;
        let capture = FailureCapture::new(ctx.config().diagnostics.clone());
        Self {
            ctx,
            retry_times,
            capture,
        }
    }

    /// Override the retry count
    #[must_use]
    pub const fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Override the failure capture
    #[must_use]
    pub fn with_capture(mut self, capture: FailureCapture) -> Self {
        self.capture = capture;
        self
    }

    /// Page the scenarios run against
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Run `scenario` up to `retry_times + 1` times.
    ///
    /// Diagnostics are captured once, after the last attempt failed.
    pub async fn run<F, Fut>(&self, name: &str, mut scenario: F) -> ScenarioResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PagekitResult<()>>,
    {
        let start = Instant::now();
        let max_attempts = self.retry_times.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::info!(scenario = name, attempt, "running scenario");
            match scenario().await {
                Ok(()) => {
                    tracing::info!(scenario = name, attempt, "scenario passed");
                    return ScenarioResult::pass(name, attempt).with_duration(start.elapsed());
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(scenario = name, attempt, error = %e, "scenario failed, retrying");
                }
                Err(e) => {
                    tracing::error!(scenario = name, attempt, error = %e, "failed scenario");
                    let artifact = self.capture.capture(self.ctx.driver(), name).await;
                    return ScenarioResult::fail(name, attempt, e.to_string())
                        .with_artifact(artifact)
                        .with_duration(start.elapsed());
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::{DiagnosticsConfig, FrameworkConfig};
    use crate::driver::MockDriver;
    use crate::result::PagekitError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn runner(dir: &TempDir) -> (Arc<MockDriver>, ScenarioRunner) {
        let driver = Arc::new(MockDriver::new());
        let config = FrameworkConfig {
            diagnostics: DiagnosticsConfig::rooted_at(dir.path()),
            ..FrameworkConfig::default()
        };
        let ctx = PageContext::new(driver.clone(), config);
        (driver, ScenarioRunner::new(ctx))
    }

    fn files_in(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    mod retry_tests {
        use super::*;

        #[tokio::test]
        async fn test_flaky_scenario_passes_on_retry() {
            let dir = TempDir::new().unwrap();
            let (_driver, runner) = runner(&dir);
            let calls = AtomicU32::new(0);
            let calls = &calls;
            let result = runner
                .run("flaky", move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(PagekitError::timeout("spinner", 10))
                    } else {
                        Ok(())
                    }
                })
                .await;
            assert!(result.passed);
            assert_eq!(result.attempts, 2);
            assert!(result.artifact.is_none());
            assert!(files_in(&dir.path().join("screenshot")).is_empty());
        }

        #[tokio::test]
        async fn test_no_retries() {
            let dir = TempDir::new().unwrap();
            let (_driver, runner) = runner(&dir);
            let runner = runner.with_retry_times(0);
            let result = runner
                .run("broken", || async { Err(PagekitError::driver("boom")) })
                .await;
            assert!(!result.passed);
            assert_eq!(result.attempts, 1);
            assert_eq!(result.error.as_deref(), Some("Driver error: boom"));
        }
    }

    mod diagnostics_tests {
        use super::*;

        #[tokio::test]
        async fn test_only_the_failing_scenario_leaves_artifacts() {
            let dir = TempDir::new().unwrap();
            let (driver, runner) = runner(&dir);
            let mut suite = SuiteResults::new("workspaces");

            suite.push(runner.run("opens workspace list", || async { Ok(()) }).await);
            suite.push(
                runner
                    .run("deletes workspace", || async {
                        Err(PagekitError::NotFound {
                            xpath: "//*[@data-test-id=\"workspace-card\"]".into(),
                            elapsed_ms: 30_000,
                        })
                    })
                    .await,
            );

            assert_eq!(suite.total(), 2);
            assert_eq!(suite.passed_count(), 1);
            assert_eq!(suite.failed_count(), 1);
            let failed = suite.failures()[0];
            assert_eq!(failed.attempts, 2);
            assert!(failed.error.as_ref().unwrap().contains("workspace-card"));

            let screenshots = files_in(&dir.path().join("screenshot"));
            let dumps = files_in(&dir.path().join("html"));
            assert_eq!(screenshots.len(), 1);
            assert_eq!(dumps.len(), 1);
            assert!(screenshots[0].starts_with("DeletesWorkspace_"));
            assert!(screenshots[0].ends_with(".png"));
            assert!(dumps[0].starts_with("DeletesWorkspace_"));
            assert_eq!(
                driver.history().iter().filter(|c| c.starts_with("screenshot")).count(),
                1
            );
        }
    }
}
