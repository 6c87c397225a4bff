//! Native selects and custom dropdown widgets.

use super::{Element, ElementWrapper};
use crate::driver::{release_quietly, ClickOptions};
use crate::locator::{xpath_literal, ElementKind};
use crate::result::{PagekitError, PagekitResult};
use crate::wait::{wait_for_fn, wait_for_node};
use async_trait::async_trait;

/// A native `<select>`
#[derive(Debug)]
pub struct Select {
    element: Element,
}

impl Select {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// Choose the option with `value`
    pub async fn select_by_value(&self, value: &str) -> PagekitResult<()> {
        let node = self.node().await?;
        tracing::debug!(xpath = %self.element.xpath(), value, "select option");
        self.element.driver().select_option(&node, value).await
    }

    /// Value of the selected option
    pub async fn selected_value(&self) -> PagekitResult<String> {
        self.node().await?;
        let value = self.element.property("value").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl ElementWrapper for Select {
    const KIND: ElementKind = ElementKind::Select;

    fn element(&self) -> &Element {
        &self.element
    }
}

/// XPath of a listbox option with the given label
#[must_use]
pub fn option_xpath(label: &str) -> String {
    format!(
        "//*[@role=\"option\" and normalize-space()={}]",
        xpath_literal(label)
    )
}

/// A custom dropdown: a trigger that opens a listbox of `role="option"` items
#[derive(Debug)]
pub struct Dropdown {
    element: Element,
}

impl Dropdown {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// Label currently shown on the trigger
    pub async fn selected_label(&self) -> PagekitResult<String> {
        self.node().await?;
        self.element.text().await
    }

    /// Open the dropdown, pick `label` and wait until the trigger shows it
    pub async fn choose(&self, label: &str) -> PagekitResult<()> {
        let trigger = self.node().await?;
        let driver = self.element.driver();
        let wait = self.element.context().timeouts().default_wait();

        driver.click(&trigger, &ClickOptions::new()).await?;
        let option = wait_for_node(driver, &option_xpath(label), true, &wait).await?;
        driver.click(&option, &ClickOptions::new()).await?;
        release_quietly(driver, &option).await;

        let description = format!("dropdown {} to show {label:?}", self.element.xpath());
        wait_for_fn(&description, &wait, move || async move {
            Ok::<_, PagekitError>(self.selected_label().await? == label)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ElementWrapper for Dropdown {
    const KIND: ElementKind = ElementKind::Dropdown;

    fn element(&self) -> &Element {
        &self.element
    }
}
