//! Page objects.
//!
//! A page object is a [`Locatable`] region that knows which URLs it lives at
//! and how to tell that it finished loading. Everything else a page offers
//! (buttons, cards, tables) comes from composing containers and components.
//!
//! ```ignore
//! struct WorkspacesPage {
//!     container: Container,
//! }
//!
//! impl Locatable for WorkspacesPage {
//!     fn container(&self) -> &Container {
//!         &self.container
//!     }
//! }
//!
//! #[async_trait]
//! impl PageObject for WorkspacesPage {
//!     fn url_pattern(&self) -> &str {
//!         "/workspaces"
//!     }
//!
//!     async fn is_loaded(&self) -> PagekitResult<bool> {
//!         Ok(self.container.find_button("Create a New Workspace")?.is_visible(1_000).await)
//!     }
//! }
//! ```

use crate::container::Locatable;
use crate::diagnostics::FailureCapture;
use crate::result::{PagekitError, PagekitResult};
use crate::wait::{wait_for_fn, wait_while_loading};
use async_trait::async_trait;
use std::collections::HashMap;

/// A page (or page-sized component) of the application
#[async_trait]
pub trait PageObject: Locatable {
    /// URL path pattern of this page (e.g. "/workspaces/:ns/:id/data")
    fn url_pattern(&self) -> &str;

    /// Whether the page-specific elements are present
    async fn is_loaded(&self) -> PagekitResult<bool>;

    /// Time allowed for the page to load
    fn load_timeout_ms(&self) -> u64 {
        self.context().timeouts().visible_ms
    }

    /// Page name for logging and diagnostics
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether the tab's URL matches [`Self::url_pattern`]
    async fn url_matches(&self) -> PagekitResult<bool> {
        let url = self.context().current_url().await?;
        Ok(UrlMatcher::new(self.url_pattern()).matches(&url))
    }

    /// Wait until [`Self::is_loaded`] holds and loading has finished.
    ///
    /// On failure the page is captured before the error is returned.
    async fn wait_for_load(&self) -> PagekitResult<()> {
        let ctx = self.context();
        let timeout_ms = self.load_timeout_ms();
        let description = format!("{} to load", self.page_name());
        let outcome = async {
            let wait = ctx.timeouts().wait(timeout_ms);
            wait_for_fn(&description, &wait, move || self.is_loaded()).await?;
            let loading = ctx.config().loading_options(false).with_timeout(timeout_ms);
            wait_while_loading(ctx.driver(), None, &loading).await?;
            Ok::<_, PagekitError>(())
        }
        .await;

        if let Err(e) = &outcome {
            let title = ctx.title().await.unwrap_or_default();
            tracing::error!(page = self.page_name(), title = %title, error = %e, "page did not load");
            FailureCapture::new(ctx.config().diagnostics.clone())
                .capture(ctx.driver(), self.page_name())
                .await;
        } else {
            tracing::info!(page = self.page_name(), "page loaded");
        }
        outcome
    }
}

/// Path, without scheme, host, query or fragment
#[must_use]
pub fn url_path(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        after_scheme.find('/').map_or("/", |i| &after_scheme[i..])
    } else {
        after_scheme
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// URL pattern matcher for page routes.
///
/// Segments are literals, `*` (any one segment) or `:name` (any one
/// segment, captured). Full URLs are matched on their path.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

fn segments_of(url: &str) -> Vec<&str> {
    url_path(url).split('/').filter(|s| !s.is_empty()).collect()
}

impl UrlMatcher {
    /// Create a URL matcher
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments = segments_of(url);
        url_segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&url_segments)
                .all(|(segment, actual)| match segment {
                    UrlSegment::Literal(lit) => lit.as_str() == *actual,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Extract `:name` parameters from a URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(segments_of(url))
            .filter_map(|(segment, value)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    /// The pattern string
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_literal_and_params() {
            let matcher = UrlMatcher::new("/workspaces/:namespace/:id/data");
            assert!(matcher.matches("https://workbench.test/workspaces/aou-rw-1/ws1/data"));
            assert!(matcher.matches("/workspaces/aou-rw-1/ws1/data?tab=datasets#top"));
            assert!(!matcher.matches("/workspaces/aou-rw-1/ws1/notebooks"));
            assert!(!matcher.matches("/workspaces/aou-rw-1"));

            let params = matcher.extract_params("https://workbench.test/workspaces/aou-rw-1/ws1/data");
            assert_eq!(params.get("namespace").map(String::as_str), Some("aou-rw-1"));
            assert_eq!(params.get("id").map(String::as_str), Some("ws1"));
            assert_eq!(matcher.pattern(), "/workspaces/:namespace/:id/data");
        }

        #[test]
        fn test_wildcard() {
            let matcher = UrlMatcher::new("/workspaces/*");
            assert!(matcher.matches("/workspaces/build"));
            assert!(!matcher.matches("/workspaces"));
        }

        #[test]
        fn test_url_path() {
            assert_eq!(url_path("https://app.test"), "/");
            assert_eq!(url_path("https://app.test/a/b?x=1"), "/a/b");
            assert_eq!(url_path("/a#frag"), "/a");
        }
    }

    mod page_object_tests {
        use super::*;
        use crate::config::{DiagnosticsConfig, FrameworkConfig};
        use crate::container::Container;
        use crate::context::PageContext;
        use crate::driver::{MockDriver, MockEffect, MockNode};
        use crate::element::ElementWrapper;
        use std::sync::Arc;
        use std::time::Duration;
        use tempfile::TempDir;

        #[derive(Debug)]
        struct WorkspacesPage {
            container: Container,
        }

        impl Locatable for WorkspacesPage {
            fn container(&self) -> &Container {
                &self.container
            }
        }

        #[async_trait]
        impl PageObject for WorkspacesPage {
            fn url_pattern(&self) -> &str {
                "/workspaces"
            }

            fn load_timeout_ms(&self) -> u64 {
                2_000
            }

            fn page_name(&self) -> &str {
                "workspaces page"
            }

            async fn is_loaded(&self) -> PagekitResult<bool> {
                let create = self.container.find_button("Create a New Workspace")?;
                Ok(create.is_visible(100).await)
            }
        }

        fn page(dir: &TempDir) -> (Arc<MockDriver>, WorkspacesPage) {
            let driver = Arc::new(MockDriver::new());
            let config = FrameworkConfig {
                diagnostics: DiagnosticsConfig::rooted_at(dir.path()),
                ..FrameworkConfig::default()
            };
            let ctx = PageContext::new(driver.clone(), config);
            let container = Container::document(ctx);
            (driver, WorkspacesPage { container })
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_load() {
            let dir = TempDir::new().unwrap();
            let (driver, page) = page(&dir);
            let xpath = page
                .container
                .find_button("Create a New Workspace")
                .unwrap()
                .element()
                .xpath()
                .to_string();
            let button = driver.add_node(xpath, MockNode::new("button").hidden());
            driver.schedule(Duration::from_millis(300), MockEffect::Show(button));
            driver.set_url("https://workbench.test/workspaces");

            page.wait_for_load().await.unwrap();
            assert!(page.url_matches().await.unwrap());
            assert!(!dir.path().join("screenshot").exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_load_is_captured() {
            let dir = TempDir::new().unwrap();
            let (driver, page) = page(&dir);
            driver.set_title("Workbench");
            let err = page.wait_for_load().await.unwrap_err();
            assert!(
                matches!(err, PagekitError::Timeout { ref description, .. } if description == "workspaces page to load")
            );
            let shots: Vec<_> = std::fs::read_dir(dir.path().join("screenshot")).unwrap().collect();
            assert_eq!(shots.len(), 1);
        }
    }
}
