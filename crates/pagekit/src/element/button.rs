//! Button wrapper and click orchestration.

use super::{Element, ElementWrapper};
use crate::driver::ClickOptions;
use crate::locator::ElementKind;
use crate::result::PagekitResult;
use crate::wait::{wait_for_xpath, wait_while_loading, LoadingOptions, Visibility, WaitOptions};
use async_trait::async_trait;
use std::time::Duration;

/// Waits to run around a click.
///
/// Navigation and close waits are armed before the click is dispatched and
/// run concurrently with it, so a fast page cannot complete before anyone
/// listens. The loading wait starts only after those have finished, because
/// spinners of the previous page are meaningless once it navigated away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostClick {
    /// Wait for the next load event
    pub navigation: Option<Duration>,
    /// Wait for this XPath to stop being displayed
    pub close: Option<(String, WaitOptions)>,
    /// Wait while busy indicators are displayed, beneath an optional scope
    pub loading: Option<(Option<String>, LoadingOptions)>,
}

impl PostClick {
    /// No waits
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Also wait for navigation
    #[must_use]
    pub const fn with_navigation(mut self, timeout: Duration) -> Self {
        self.navigation = Some(timeout);
        self
    }

    /// Also wait for `xpath` to close
    #[must_use]
    pub fn with_close(mut self, xpath: impl Into<String>, options: WaitOptions) -> Self {
        self.close = Some((xpath.into(), options));
        self
    }

    /// Also wait while loading
    #[must_use]
    pub fn with_loading(mut self, scope: Option<String>, options: LoadingOptions) -> Self {
        self.loading = Some((scope, options));
        self
    }
}

/// A button (`<button>`, `role="button"` or a button-like `<input>`)
#[derive(Debug)]
pub struct Button {
    element: Element,
}

impl Button {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// Whether the button shows a `not-allowed` cursor
    pub async fn is_cursor_not_allowed(&self) -> PagekitResult<bool> {
        self.node().await?;
        let cursor = self.element.computed_style("cursor").await?;
        Ok(cursor.trim() == "not-allowed")
    }

    /// Label of the button
    pub async fn text(&self) -> PagekitResult<String> {
        self.node().await?;
        self.element.text().await
    }

    /// Simulated click
    pub async fn click(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        tracing::debug!(xpath = %self.element.xpath(), "click button");
        self.element.driver().click(&node, &ClickOptions::new()).await
    }

    /// Click and run the requested waits
    pub async fn click_and_wait(&self, post: &PostClick) -> PagekitResult<()> {
        let node = self.node().await?;
        let driver = self.element.driver();

        let navigation = async {
            match post.navigation {
                Some(timeout) => driver.wait_for_navigation(timeout).await,
                None => Ok(()),
            }
        };
        let close = async {
            match &post.close {
                Some((xpath, options)) => wait_for_xpath(driver, xpath, Visibility::Hidden, options)
                    .await
                    .map(|_| ()),
                None => Ok(()),
            }
        };
        let click = async {
            tracing::debug!(xpath = %self.element.xpath(), "click button and wait");
            driver.click(&node, &ClickOptions::new()).await
        };
        // polled in order: both waits are armed before the click is sent
        futures::try_join!(navigation, close, click)?;

        if let Some((scope, options)) = &post.loading {
            wait_while_loading(driver, scope.as_deref(), options).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ElementWrapper for Button {
    const KIND: ElementKind = ElementKind::Button;

    fn element(&self) -> &Element {
        &self.element
    }

    /// Enabled when neither a `disabled` attribute, `aria-disabled="true"`
    /// nor a `not-allowed` cursor is present
    async fn is_enabled(&self) -> PagekitResult<bool> {
        self.node().await?;
        if self.element.attribute("disabled").await?.is_some() {
            return Ok(false);
        }
        if self.element.attribute("aria-disabled").await?.as_deref() == Some("true") {
            return Ok(false);
        }
        Ok(!self.is_cursor_not_allowed().await?)
    }
}
