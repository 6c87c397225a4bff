//! Links and icons.

use super::{Element, ElementWrapper};
use crate::driver::ClickOptions;
use crate::locator::ElementKind;
use crate::result::PagekitResult;
use async_trait::async_trait;

/// An anchor or `role="link"` node
#[derive(Debug)]
pub struct Link {
    element: Element,
}

impl Link {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// `href` attribute
    pub async fn href(&self) -> PagekitResult<Option<String>> {
        self.node().await?;
        self.element.attribute("href").await
    }

    /// Link text
    pub async fn text(&self) -> PagekitResult<String> {
        self.node().await?;
        self.element.text().await
    }

    /// Follow the link
    pub async fn click(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element.driver().click(&node, &ClickOptions::new()).await
    }
}

#[async_trait]
impl ElementWrapper for Link {
    const KIND: ElementKind = ElementKind::Link;

    fn element(&self) -> &Element {
        &self.element
    }
}

/// A clickable icon (`clr-icon`, `svg`, `img`)
#[derive(Debug)]
pub struct Icon {
    element: Element,
}

impl Icon {
    /// Wrap a handle
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// `shape` attribute
    pub async fn shape(&self) -> PagekitResult<Option<String>> {
        self.node().await?;
        self.element.attribute("shape").await
    }

    /// Click the icon
    pub async fn click(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        self.element.driver().click(&node, &ClickOptions::new()).await
    }
}

#[async_trait]
impl ElementWrapper for Icon {
    const KIND: ElementKind = ElementKind::Icon;

    fn element(&self) -> &Element {
        &self.element
    }
}
