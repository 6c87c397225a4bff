//! Single-line and multi-line text inputs.

use super::{Element, ElementWrapper};
use crate::locator::ElementKind;
use crate::result::PagekitResult;
use async_trait::async_trait;

/// Editing operations shared by text inputs
#[async_trait]
pub trait Editable: ElementWrapper {
    /// Replace the current value with `text`
    async fn type_text(&self, text: &str) -> PagekitResult<()> {
        let node = self.node().await?;
        let driver = self.element().driver();
        driver.focus(&node).await?;
        driver.clear(&node).await?;
        tracing::debug!(xpath = %self.element().xpath(), len = text.len(), "type text");
        driver.type_text(&node, text).await
    }

    /// Append `text` to the current value
    async fn append_text(&self, text: &str) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element().driver().type_text(&node, text).await
    }

    /// Move focus away, committing the value
    async fn press_tab(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element().driver().press_key(&node, "Tab").await
    }

    /// Press a named key while focused
    async fn press_key(&self, key: &str) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element().driver().press_key(&node, key).await
    }

    /// Current value
    async fn value(&self) -> PagekitResult<String> {
        self.node().await?;
        let value = self.element().property("value").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Empty the input
    async fn clear(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element().driver().clear(&node).await
    }
}

/// An `<input>` taking text
#[derive(Debug)]
pub struct Textbox {
    element: Element,
}

impl Textbox {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// `placeholder` attribute
    pub async fn placeholder(&self) -> PagekitResult<Option<String>> {
        self.node().await?;
        self.element.attribute("placeholder").await
    }
}

#[async_trait]
impl ElementWrapper for Textbox {
    const KIND: ElementKind = ElementKind::Textbox;

    fn element(&self) -> &Element {
        &self.element
    }
}

impl Editable for Textbox {}

/// A `<textarea>`
#[derive(Debug)]
pub struct Textarea {
    element: Element,
}

impl Textarea {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }
}

#[async_trait]
impl ElementWrapper for Textarea {
    const KIND: ElementKind = ElementKind::Textarea;

    fn element(&self) -> &Element {
        &self.element
    }
}

impl Editable for Textarea {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::MockNode;
    use crate::element::tests::page;
    use crate::result::PagekitError;

    #[tokio::test(start_paused = true)]
    async fn test_type_text_replaces_value() {
        let (driver, ctx) = page();
        driver.add_node(
            "//input",
            MockNode::input("text")
                .with_value("old")
                .with_attribute("placeholder", "Workspace name"),
        );
        let textbox = Textbox::new(Element::new(ctx, "//input"));
        textbox.type_text("analysis-01").await.unwrap();
        assert_eq!(textbox.value().await.unwrap(), "analysis-01");
        assert_eq!(
            textbox.placeholder().await.unwrap().as_deref(),
            Some("Workspace name")
        );
        assert!(driver.was_called("focus:"));
        assert!(driver.was_called("clear:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_and_tab() {
        let (driver, ctx) = page();
        driver.add_node("//textarea", MockNode::new("textarea").with_value("line 1"));
        let textarea = Textarea::new(Element::new(ctx, "//textarea"));
        textarea.append_text("\nline 2").await.unwrap();
        textarea.press_tab().await.unwrap();
        assert_eq!(textarea.value().await.unwrap(), "line 1\nline 2");
        assert!(driver.was_called("press_key:mock-1:Tab"));

        Editable::clear(&textarea).await.unwrap();
        assert_eq!(textarea.value().await.unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_textarea_is_not_a_textbox() {
        let (driver, ctx) = page();
        driver.add_node("//t", MockNode::new("textarea"));
        let textbox = Textbox::new(Element::new(ctx, "//t"));
        assert!(matches!(
            textbox.type_text("x").await.unwrap_err(),
            PagekitError::WrongKind { .. }
        ));
    }
}
