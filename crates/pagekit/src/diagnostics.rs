//! Failure capture: a screenshot and an HTML dump per failed scenario.
//!
//! Files are named `<TestName>_<epoch millis>.png` and `.html`, where
//! `TestName` is the scenario name start-cased with everything but ASCII
//! letters and digits removed. Artifacts are never cleaned up.

use crate::config::DiagnosticsConfig;
use crate::driver::PageDriver;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name used when a scenario name has no usable characters
const UNNAMED: &str = "UnnamedTest";

/// Files written for one failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsArtifact {
    /// Sanitized scenario name
    pub test_name: String,
    /// Capture time, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Screenshot, if it could be written
    pub screenshot_path: Option<PathBuf>,
    /// HTML dump, if it could be written
    pub html_path: Option<PathBuf>,
}

impl DiagnosticsArtifact {
    /// Whether nothing could be written
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.screenshot_path.is_none() && self.html_path.is_none()
    }
}

fn word_pattern() -> Option<&'static Regex> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    WORD.get_or_init(|| Regex::new("[A-Za-z0-9]+").ok()).as_ref()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_uppercase().to_string() + chars.as_str()
    })
}

/// File-name-safe form of a scenario name.
///
/// `"creates a workspace (smoke)"` becomes `"CreatesAWorkspaceSmoke"`.
#[must_use]
pub fn sanitize_test_name(name: &str) -> String {
    let sanitized: String = match word_pattern() {
        Some(words) => words.find_iter(name).map(|m| capitalize(m.as_str())).collect(),
        None => name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .map(capitalize)
            .collect(),
    };
    if sanitized.is_empty() {
        UNNAMED.to_string()
    } else {
        sanitized
    }
}

/// Screenshot and HTML paths for `test_name` at `timestamp`
#[must_use]
pub fn artifact_paths(config: &DiagnosticsConfig, test_name: &str, timestamp: i64) -> (PathBuf, PathBuf) {
    let stem = format!("{}_{timestamp}", sanitize_test_name(test_name));
    (
        config.screenshot_dir.join(format!("{stem}.png")),
        config.html_dir.join(format!("{stem}.html")),
    )
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Writes failure artifacts for a page
#[derive(Debug, Clone, Default)]
pub struct FailureCapture {
    config: DiagnosticsConfig,
}

impl FailureCapture {
    /// Capture with the given output settings
    #[must_use]
    pub const fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }

    /// Output settings
    #[must_use]
    pub const fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Capture a screenshot, then the HTML, for `test_name`.
    ///
    /// Never fails: problems are logged and the affected path is left
    /// unset. Returns `None` when capture is disabled.
    pub async fn capture(&self, driver: &dyn PageDriver, test_name: &str) -> Option<DiagnosticsArtifact> {
        if !self.config.enabled {
            tracing::debug!(test_name, "failure capture disabled");
            return None;
        }
        let timestamp = chrono::Utc::now().timestamp_millis();
        let (png, html) = artifact_paths(&self.config, test_name, timestamp);
        tracing::error!(test_name, "capturing failure diagnostics");

        let screenshot_path = match driver.screenshot(self.config.full_page).await {
            Ok(bytes) => match write_artifact(&png, &bytes).await {
                Ok(()) => {
                    tracing::error!(path = %png.display(), "saved screenshot");
                    Some(png)
                }
                Err(e) => {
                    tracing::error!(path = %png.display(), error = %e, "failed to save screenshot");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to take screenshot");
                None
            }
        };

        let html_path = match driver.content().await {
            Ok(content) => match write_artifact(&html, content.as_bytes()).await {
                Ok(()) => {
                    tracing::info!(path = %html.display(), "saved html file");
                    Some(html)
                }
                Err(e) => {
                    tracing::error!(path = %html.display(), error = %e, "failed to save html file");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to read page html");
                None
            }
        };

        Some(DiagnosticsArtifact {
            test_name: sanitize_test_name(test_name),
            timestamp,
            screenshot_path,
            html_path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use tempfile::TempDir;

    mod sanitize_tests {
        use super::*;

        #[test]
        fn test_start_case_and_strip() {
            assert_eq!(sanitize_test_name("creates a workspace (smoke)"), "CreatesAWorkspaceSmoke");
            assert_eq!(sanitize_test_name("dataset: save-as 2"), "DatasetSaveAs2");
            assert_eq!(sanitize_test_name("cohortBuilder"), "CohortBuilder");
        }

        #[test]
        fn test_nothing_usable() {
            assert_eq!(sanitize_test_name(""), UNNAMED);
            assert_eq!(sanitize_test_name("?!"), UNNAMED);
        }

        #[test]
        fn test_paths() {
            let config = DiagnosticsConfig::default();
            let (png, html) = artifact_paths(&config, "edit workspace", 1_600_000_000_000);
            assert_eq!(png, PathBuf::from("logs/screenshot/EditWorkspace_1600000000000.png"));
            assert_eq!(html, PathBuf::from("logs/html/EditWorkspace_1600000000000.html"));
        }
    }

    mod capture_tests {
        use super::*;

        #[tokio::test]
        async fn test_writes_both_files() {
            let dir = TempDir::new().unwrap();
            let capture = FailureCapture::new(DiagnosticsConfig::rooted_at(dir.path()));
            let driver = MockDriver::new();
            driver.set_content("<html><body>boom</body></html>");

            let artifact = capture.capture(&driver, "delete workspace").await.unwrap();
            assert_eq!(artifact.test_name, "DeleteWorkspace");
            let png = artifact.screenshot_path.unwrap();
            let html = artifact.html_path.unwrap();
            assert!(png.starts_with(dir.path().join("screenshot")));
            assert!(std::fs::read(&png).unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
            assert_eq!(std::fs::read_to_string(&html).unwrap(), "<html><body>boom</body></html>");
            assert!(driver.was_called("screenshot:full_page=true"));
        }

        #[tokio::test]
        async fn test_driver_failures_are_swallowed() {
            let dir = TempDir::new().unwrap();
            let capture = FailureCapture::new(DiagnosticsConfig::rooted_at(dir.path()));
            let driver = MockDriver::new();
            driver.set_screenshot(None);
            driver.fail_content(true);

            let artifact = capture.capture(&driver, "t").await.unwrap();
            assert!(artifact.is_empty());
        }

        #[tokio::test]
        async fn test_disabled() {
            let config = DiagnosticsConfig {
                enabled: false,
                ..DiagnosticsConfig::default()
            };
            let driver = MockDriver::new();
            assert!(FailureCapture::new(config).capture(&driver, "t").await.is_none());
            assert!(!driver.was_called("screenshot"));
        }
    }
}
