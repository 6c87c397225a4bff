//! Radio button wrapper.

use super::{Element, ElementWrapper, LocateOptions};
use crate::locator::ElementKind;
use crate::result::PagekitResult;
use crate::wait::wait_for_fn;
use async_trait::async_trait;

/// A radio input. Located once attached, like [`super::Checkbox`].
#[derive(Debug)]
pub struct RadioButton {
    element: Element,
}

impl RadioButton {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// Whether this option is selected
    pub async fn is_selected(&self) -> PagekitResult<bool> {
        self.node().await?;
        let checked = self.element.property("checked").await?;
        Ok(checked.as_bool().unwrap_or(false))
    }

    /// Select this option; no click when already selected
    pub async fn select(&self) -> PagekitResult<()> {
        if self.is_selected().await? {
            return Ok(());
        }
        self.element.click_via_script().await?;
        let description = format!("radio {} to be selected", self.element.xpath());
        let wait = self.element.context().timeouts().default_wait();
        wait_for_fn(&description, &wait, move || self.is_selected()).await?;
        Ok(())
    }
}

#[async_trait]
impl ElementWrapper for RadioButton {
    const KIND: ElementKind = ElementKind::RadioButton;

    fn element(&self) -> &Element {
        &self.element
    }

    fn locate_options(&self) -> LocateOptions {
        LocateOptions::present(self.element.context().timeouts().default_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{MockEffect, MockNode};
    use crate::element::tests::page;
    use serde_json::Value;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_select_waits_for_state() {
        let (driver, ctx) = page();
        let id = driver.add_node("//r", MockNode::input("radio"));
        driver.on_click_after(
            id,
            Duration::from_millis(150),
            MockEffect::SetProperty(id, "checked".into(), Value::Bool(true)),
        );
        let radio = RadioButton::new(Element::new(ctx, "//r"));
        assert!(!radio.is_selected().await.unwrap());
        radio.select().await.unwrap();
        assert!(radio.is_selected().await.unwrap());

        radio.select().await.unwrap();
        assert_eq!(driver.click_count(id), 1);
    }
}
