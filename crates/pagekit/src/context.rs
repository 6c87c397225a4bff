//! Page context: the browser tab plus the configuration every object shares.

use crate::config::{FrameworkConfig, TimeoutConfig};
use crate::driver::PageDriver;
use crate::result::PagekitResult;
use std::sync::Arc;

/// One browser tab and the configuration used to drive it.
///
/// Cheap to clone. Containers, elements and page objects of the same tab
/// all hold a clone; none of them is shared across tabs.
#[derive(Debug, Clone)]
pub struct PageContext {
    driver: Arc<dyn PageDriver>,
    config: Arc<FrameworkConfig>,
}

impl PageContext {
    /// Create a context
    pub fn new(driver: Arc<dyn PageDriver>, config: FrameworkConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
        }
    }

    /// Create a context with default configuration
    pub fn with_defaults(driver: Arc<dyn PageDriver>) -> Self {
        Self::new(driver, FrameworkConfig::default())
    }

    /// Driver of this tab
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Shared handle to the driver
    #[must_use]
    pub fn driver_arc(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.driver)
    }

    /// Framework configuration
    #[must_use]
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Timeout section of the configuration
    #[must_use]
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.config.timeouts
    }

    /// Navigate the tab
    pub async fn goto(&self, url: &str) -> PagekitResult<()> {
        tracing::info!(url, "navigating");
        self.driver.goto(url).await
    }

    /// Current URL of the tab
    pub async fn current_url(&self) -> PagekitResult<String> {
        self.driver.current_url().await
    }

    /// Current document title
    pub async fn title(&self) -> PagekitResult<String> {
        self.driver.title().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    #[tokio::test]
    async fn test_context_shares_driver() {
        let driver = Arc::new(MockDriver::new());
        let ctx = PageContext::with_defaults(driver.clone());
        let copy = ctx.clone();
        copy.goto("https://workbench.test/workspaces").await.unwrap();
        assert_eq!(ctx.current_url().await.unwrap(), "https://workbench.test/workspaces");
        assert!(driver.was_called("goto:"));
        assert_eq!(ctx.timeouts().default_ms, 30_000);
    }
}
