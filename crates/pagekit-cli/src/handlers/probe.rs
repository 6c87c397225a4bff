//! Probe command handler
//!
//! Opens a page, waits for loading to settle, then for the requested text
//! and XPath. A failed probe leaves a screenshot and HTML dump behind.

use crate::commands::ProbeArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use pagekit::{
    wait_for_node, wait_for_text, wait_while_loading, DiagnosticsArtifact, FailureCapture, NodeRef,
    PageContext, PagekitResult, TextMatch,
};
use serde::Serialize;
use std::path::PathBuf;

/// What a successful probe saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// URL after navigation
    pub url: String,
    /// Document title
    pub title: String,
    /// Text that showed up, if one was requested
    pub text: Option<String>,
    /// XPath that became visible, if one was requested
    pub xpath: Option<String>,
    /// Milliseconds from navigation start to the last satisfied wait
    pub elapsed_ms: u64,
}

/// Navigate and wait for everything `args` asks for
pub async fn probe_page(ctx: &PageContext, args: &ProbeArgs) -> PagekitResult<ProbeReport> {
    let started = std::time::Instant::now();
    let timeout_ms = args.timeout.unwrap_or(ctx.timeouts().visible_ms);
    let wait = ctx.timeouts().wait(timeout_ms);

    ctx.goto(&args.url).await?;
    wait_while_loading(ctx.driver(), None, &ctx.config().loading_options(false)).await?;

    if let Some(text) = &args.text {
        let node = wait_for_text(ctx.driver(), None, &TextMatch::contains(text), &wait).await?;
        release(ctx, &node).await;
        tracing::info!(%text, "text is displayed");
    }
    if let Some(xpath) = &args.xpath {
        let node = wait_for_node(ctx.driver(), xpath, true, &wait).await?;
        release(ctx, &node).await;
        tracing::info!(%xpath, "xpath is visible");
    }

    Ok(ProbeReport {
        url: ctx.current_url().await?,
        title: ctx.title().await?,
        text: args.text.clone(),
        xpath: args.xpath.clone(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

async fn release(ctx: &PageContext, node: &NodeRef) {
    if let Err(e) = ctx.driver().release(node).await {
        tracing::debug!(node = %node, error = %e, "release failed");
    }
}

/// Run [`probe_page`] and capture diagnostics when it fails
pub async fn probe_with_capture(ctx: &PageContext, args: &ProbeArgs) -> CliResult<ProbeReport> {
    match probe_page(ctx, args).await {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!(url = %args.url, error = %e, "probe failed");
            let artifact = FailureCapture::new(ctx.config().diagnostics.clone())
                .capture(ctx.driver(), &args.name)
                .await;
            Err(CliError::probe(failure_message(&e.to_string(), artifact.as_ref())))
        }
    }
}

fn failure_message(error: &str, artifact: Option<&DiagnosticsArtifact>) -> String {
    let paths: Vec<String> = artifact
        .into_iter()
        .flat_map(|a| [a.screenshot_path.clone(), a.html_path.clone()])
        .flatten()
        .map(|p: PathBuf| p.display().to_string())
        .collect();
    if paths.is_empty() {
        error.to_string()
    } else {
        format!("{error} (artifacts: {})", paths.join(", "))
    }
}

/// Launch Chromium and probe `args.url`
#[cfg(feature = "browser")]
pub async fn execute_probe(config: &CliConfig, args: &ProbeArgs) -> CliResult<ProbeReport> {
    use pagekit::ChromiumDriver;
    use std::sync::Arc;

    let mut session = config.framework.session.clone();
    if args.headed {
        session.headless = false;
    }
    let driver = Arc::new(ChromiumDriver::launch(&session).await?);
    let ctx = PageContext::new(driver.clone(), config.framework.clone());
    let outcome = probe_with_capture(&ctx, args).await;

    drop(ctx);
    if let Ok(driver) = Arc::try_unwrap(driver) {
        if let Err(e) = driver.close().await {
            tracing::warn!(error = %e, "could not close chromium");
        }
    }
    outcome
}

/// Probing needs a browser; this build has none
#[cfg(not(feature = "browser"))]
pub async fn execute_probe(_config: &CliConfig, _args: &ProbeArgs) -> CliResult<ProbeReport> {
    Err(CliError::probe(
        "browser support not enabled. Rebuild with --features browser",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pagekit::driver::{MockEffect, MockNode};
    use pagekit::locator::text_xpath;
    use pagekit::{DiagnosticsConfig, FrameworkConfig, MockDriver};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn page(dir: &TempDir) -> (Arc<MockDriver>, PageContext) {
        let driver = Arc::new(MockDriver::new());
        let config = FrameworkConfig {
            diagnostics: DiagnosticsConfig::rooted_at(dir.path()),
            ..FrameworkConfig::default()
        };
        (driver.clone(), PageContext::new(driver, config))
    }

    fn probe(url: &str) -> ProbeArgs {
        ProbeArgs {
            url: url.to_string(),
            name: "probe workspaces".to_string(),
            ..ProbeArgs::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_waits_for_text_and_xpath() {
        let dir = TempDir::new().unwrap();
        let (driver, ctx) = page(&dir);
        let heading = driver.add_node(
            text_xpath(None, &TextMatch::contains("Workspaces")),
            MockNode::new("h3").with_text("Workspaces").hidden(),
        );
        driver.schedule(Duration::from_millis(1_500), MockEffect::Show(heading));
        driver.add_node("//table", MockNode::new("table"));

        let args = ProbeArgs {
            text: Some("Workspaces".to_string()),
            xpath: Some("//table".to_string()),
            timeout: Some(5_000),
            ..probe("http://localhost:4200/workspaces")
        };
        let report = probe_with_capture(&ctx, &args).await.unwrap();
        assert_eq!(report.url, "http://localhost:4200/workspaces");
        assert_eq!(report.text.as_deref(), Some("Workspaces"));
        assert!(driver.was_called("goto"));
        assert!(!dir.path().join("screenshot").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_captures_artifacts() {
        let dir = TempDir::new().unwrap();
        let (_driver, ctx) = page(&dir);
        let args = ProbeArgs {
            xpath: Some("//table".to_string()),
            timeout: Some(1_000),
            ..probe("http://localhost:4200/workspaces")
        };

        let err = probe_with_capture(&ctx, &args).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Probe failed"));
        assert!(message.contains("//table"));
        assert!(message.contains("artifacts:"));
        let shots: Vec<_> = std::fs::read_dir(dir.path().join("html"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(shots.len(), 1);
        assert!(shots[0].starts_with("ProbeWorkspaces_"));
    }

    #[test]
    fn test_failure_message_without_artifacts() {
        assert_eq!(failure_message("boom", None), "boom");
    }
}
