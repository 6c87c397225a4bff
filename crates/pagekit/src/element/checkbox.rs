//! Checkbox wrapper with bounded check/uncheck retries.

use super::{Element, ElementWrapper, LocateOptions};
use crate::config::RetryPolicy;
use crate::locator::ElementKind;
use crate::result::{PagekitError, PagekitResult};
use async_trait::async_trait;

/// A checkbox input.
///
/// Many checkbox widgets hide the real `<input>` behind a styled label, so
/// the checkbox is located as soon as it is attached and clicked by script.
#[derive(Debug)]
pub struct Checkbox {
    element: Element,
    retry: RetryPolicy,
}

impl Checkbox {
    /// Wrap a handle, retrying per the page configuration
    pub fn new(element: Element) -> Self {
        let retry = element.context().config().checkbox;
        Self { element, retry }
    }

    /// Override the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry policy in use
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Whether the box is checked.
    ///
    /// A checkbox that cannot be found reads as unchecked. A node of another
    /// kind is still an error.
    pub async fn is_checked(&self) -> PagekitResult<bool> {
        match self.node().await {
            Ok(_) => {}
            Err(e) if e.is_absence() => return Ok(false),
            Err(e) => return Err(e),
        }
        match self.element.property("checked").await {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(e) if e.is_absence() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check the box; no click when it is already checked
    pub async fn check(&self) -> PagekitResult<()> {
        self.set_checked(true).await
    }

    /// Uncheck the box; no click when it is already unchecked
    pub async fn uncheck(&self) -> PagekitResult<()> {
        self.set_checked(false).await
    }

    /// Flip the box, or force it to `state`
    pub async fn toggle(&self, state: Option<bool>) -> PagekitResult<()> {
        let target = match state {
            Some(target) => target,
            None => !self.is_checked().await?,
        };
        self.set_checked(target).await
    }

    async fn set_checked(&self, target: bool) -> PagekitResult<()> {
        if self.is_checked().await? == target {
            return Ok(());
        }
        let action = if target { "check" } else { "uncheck" };
        let attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=attempts {
            self.element.click_via_script().await?;
            if self.is_checked().await? == target {
                tracing::debug!(xpath = %self.element.xpath(), action, attempt, "checkbox settled");
                return Ok(());
            }
            if attempt < attempts {
                tracing::warn!(
                    xpath = %self.element.xpath(),
                    action,
                    attempt,
                    "checkbox did not change state, retrying"
                );
                tokio::time::sleep(self.retry.backoff()).await;
            }
        }
        Err(PagekitError::RetriesExhausted {
            action: action.to_string(),
            xpath: self.element.xpath().to_string(),
            attempts,
        })
    }
}

#[async_trait]
impl ElementWrapper for Checkbox {
    const KIND: ElementKind = ElementKind::Checkbox;

    fn element(&self) -> &Element {
        &self.element
    }

    fn locate_options(&self) -> LocateOptions {
        LocateOptions::present(self.element.context().timeouts().default_ms)
    }
}
