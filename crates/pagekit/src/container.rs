//! Containers: scoped regions of a page.
//!
//! A [`Container`] owns an optional root XPath (`None` is the whole
//! document) and mints element wrappers scoped beneath it. It never keeps
//! the handles it mints; callers own and dispose them.

use crate::context::PageContext;
use crate::driver::{release_quietly, NodeRef, PageDriver};
use crate::element::{
    Button, Checkbox, Dropdown, Element, ElementWrapper, Icon, Link, PostClick, RadioButton, Select,
    Textarea, Textbox,
};
use crate::locator::{build, LocatorQuery, TextMatch};
use crate::result::PagekitResult;
use crate::wait::{wait_for_node, wait_for_xpath, wait_while_loading, Visibility};

/// XPath standing in for "the whole document"
pub const DOCUMENT_XPATH: &str = "/html";

/// Post-click waits for [`Container::click_button`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickButtonOptions {
    /// Wait for the navigation the click triggers
    pub wait_for_nav: bool,
    /// Wait for this container to close
    pub wait_for_close: bool,
    /// Wait while busy indicators are displayed after the click
    pub wait_for_loading_spinner: bool,
    /// Include the runtime spinner in the loading wait
    pub include_runtime_spinner: bool,
    /// Overrides the configured navigation and close timeouts
    pub timeout_ms: Option<u64>,
}

impl Default for ClickButtonOptions {
    fn default() -> Self {
        Self {
            wait_for_nav: false,
            wait_for_close: false,
            wait_for_loading_spinner: true,
            include_runtime_spinner: false,
            timeout_ms: None,
        }
    }
}

impl ClickButtonOptions {
    /// Default options: loading wait only
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also wait for navigation
    #[must_use]
    pub const fn wait_for_nav(mut self) -> Self {
        self.wait_for_nav = true;
        self
    }

    /// Also wait for the container to close
    #[must_use]
    pub const fn wait_for_close(mut self) -> Self {
        self.wait_for_close = true;
        self
    }

    /// Skip the loading wait
    #[must_use]
    pub const fn without_loading_spinner(mut self) -> Self {
        self.wait_for_loading_spinner = false;
        self
    }

    /// Include the runtime spinner in the loading wait
    #[must_use]
    pub const fn with_runtime_spinner(mut self) -> Self {
        self.include_runtime_spinner = true;
        self
    }

    /// Override the navigation and close timeouts
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Anything that owns a locatable region of the page
pub trait Locatable: Send + Sync {
    /// Region this object is scoped to
    fn container(&self) -> &Container;

    /// Root XPath, `None` for the whole document
    fn root(&self) -> Option<&str> {
        self.container().root()
    }

    /// Page context
    fn context(&self) -> &PageContext {
        self.container().context()
    }
}

/// A scoped region and the lookups beneath it
#[derive(Debug, Clone)]
pub struct Container {
    ctx: PageContext,
    root: Option<String>,
}

impl Locatable for Container {
    fn container(&self) -> &Container {
        self
    }
}

impl Container {
    /// Container rooted at `root`, or the whole document
    pub fn new(ctx: PageContext, root: Option<String>) -> Self {
        Self {
            ctx,
            root: root.filter(|r| !r.is_empty()),
        }
    }

    /// The whole document
    pub fn document(ctx: PageContext) -> Self {
        Self::new(ctx, None)
    }

    /// Container rooted at `root`
    pub fn rooted(ctx: PageContext, root: impl Into<String>) -> Self {
        Self::new(ctx, Some(root.into()))
    }

    /// Root XPath, `None` for the whole document
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// XPath locating the container itself
    #[must_use]
    pub fn self_xpath(&self) -> &str {
        self.root.as_deref().unwrap_or(DOCUMENT_XPATH)
    }

    /// Page context
    #[must_use]
    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn driver(&self) -> &dyn PageDriver {
        self.ctx.driver()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Locate the container's root node
    pub async fn locate_self(&self, timeout_ms: u64) -> PagekitResult<NodeRef> {
        let wait = self.ctx.timeouts().wait(timeout_ms);
        let xpath = self.self_xpath();
        wait_for_node(self.driver(), xpath, true, &wait).await
    }

    /// Whether the root is displayed within `timeout_ms`. Never fails.
    pub async fn is_visible(&self, timeout_ms: u64) -> bool {
        match self.locate_self(timeout_ms).await {
            Ok(node) => {
                release_quietly(self.driver(), &node).await;
                true
            }
            Err(_) => false,
        }
    }

    /// Wait for the root to be displayed, then for loading to finish
    pub async fn wait_until_visible(&self, timeout_ms: u64) -> PagekitResult<()> {
        let node = self.locate_self(timeout_ms).await?;
        release_quietly(self.driver(), &node).await;
        let loading = self.ctx.config().loading_options(false).with_timeout(timeout_ms);
        wait_while_loading(self.driver(), None, &loading).await?;
        Ok(())
    }

    /// Wait for the root to disappear
    pub async fn wait_until_closed(&self, timeout_ms: u64) -> PagekitResult<()> {
        let wait = self.ctx.timeouts().wait(timeout_ms);
        wait_for_xpath(self.driver(), self.self_xpath(), Visibility::Hidden, &wait).await?;
        tracing::debug!(xpath = self.self_xpath(), "container closed");
        Ok(())
    }

    /// Whether the root is attached right now, displayed or not
    pub async fn exists(&self) -> PagekitResult<bool> {
        let nodes = self.driver().query_xpath(self.self_xpath()).await?;
        let found = !nodes.is_empty();
        for node in &nodes {
            release_quietly(self.driver(), node).await;
        }
        Ok(found)
    }

    /// Displayed root node, probing briefly
    pub async fn as_node(&self) -> PagekitResult<NodeRef> {
        self.locate_self(self.ctx.timeouts().probe_ms).await
    }

    /// Rendered text of the root
    pub async fn text_content(&self) -> PagekitResult<String> {
        let node = self.locate_self(self.ctx.timeouts().default_ms).await?;
        let text = self.driver().property(&node, "innerText").await;
        release_quietly(self.driver(), &node).await;
        Ok(text?.as_str().unwrap_or_default().trim().to_string())
    }

    // =========================================================================
    // SCOPED LOOKUP
    // =========================================================================

    /// Lazy handle for `query` beneath the root
    pub fn find_element(&self, query: &LocatorQuery) -> PagekitResult<Element> {
        let xpath = build(query, self.root())?;
        Ok(Element::new(self.ctx.clone(), xpath))
    }

    /// Button labelled `label` (whitespace-normalized match)
    pub fn find_button(&self, label: &str) -> PagekitResult<Button> {
        let query = LocatorQuery::button(TextMatch::normalize_space(label));
        Ok(Button::new(self.find_element(&query)?))
    }

    /// Checkbox named `name`
    pub fn find_checkbox(&self, name: &str) -> PagekitResult<Checkbox> {
        let query = LocatorQuery::checkbox(TextMatch::exact(name));
        Ok(Checkbox::new(self.find_element(&query)?))
    }

    /// Textbox named `name`
    pub fn find_textbox(&self, name: &str) -> PagekitResult<Textbox> {
        let query = LocatorQuery::textbox(TextMatch::exact(name));
        Ok(Textbox::new(self.find_element(&query)?))
    }

    /// Textarea named `name`
    pub fn find_textarea(&self, name: &str) -> PagekitResult<Textarea> {
        let query = LocatorQuery::textarea(TextMatch::exact(name));
        Ok(Textarea::new(self.find_element(&query)?))
    }

    /// Radio button named `name`
    pub fn find_radio_button(&self, name: &str) -> PagekitResult<RadioButton> {
        let query = LocatorQuery::radio_button(TextMatch::exact(name));
        Ok(RadioButton::new(self.find_element(&query)?))
    }

    /// Link labelled `label`
    pub fn find_link(&self, label: &str) -> PagekitResult<Link> {
        let query = LocatorQuery::link(TextMatch::normalize_space(label));
        Ok(Link::new(self.find_element(&query)?))
    }

    /// Icon of `shape`
    pub fn find_icon(&self, shape: &str) -> PagekitResult<Icon> {
        Ok(Icon::new(self.find_element(&LocatorQuery::icon(shape))?))
    }

    /// Icon of `shape` next to `label`
    pub fn find_labeled_icon(&self, shape: &str, label: &str) -> PagekitResult<Icon> {
        let query = LocatorQuery::icon_labeled(shape, TextMatch::normalize_space(label));
        Ok(Icon::new(self.find_element(&query)?))
    }

    /// Native select named `name`
    pub fn find_select(&self, name: &str) -> PagekitResult<Select> {
        let query = LocatorQuery::select(TextMatch::exact(name));
        Ok(Select::new(self.find_element(&query)?))
    }

    /// Dropdown widget named `name`
    pub fn find_dropdown(&self, name: &str) -> PagekitResult<Dropdown> {
        let query = LocatorQuery::dropdown(TextMatch::exact(name));
        Ok(Dropdown::new(self.find_element(&query)?))
    }

    // =========================================================================
    // CLICK ORCHESTRATION
    // =========================================================================

    /// Find the button, wait until it is enabled, click it and run the
    /// requested post-click waits.
    ///
    /// Navigation and close waits are armed before the click; the loading
    /// wait runs once they are done.
    pub async fn click_button(&self, label: &str, options: ClickButtonOptions) -> PagekitResult<()> {
        let button = self.find_button(label)?;
        let timeouts = self.ctx.timeouts();
        let outcome = async {
            button.wait_until_enabled(timeouts.default_ms).await?;
            let post = self.post_click(&options);
            tracing::info!(label, root = self.self_xpath(), "click button");
            button.click_and_wait(&post).await
        }
        .await;
        button.dispose().await;
        outcome
    }

    fn post_click(&self, options: &ClickButtonOptions) -> PostClick {
        let timeouts = self.ctx.timeouts();
        let mut post = PostClick::none();
        if options.wait_for_nav {
            let ms = options.timeout_ms.unwrap_or(timeouts.navigation_ms);
            post = post.with_navigation(std::time::Duration::from_millis(ms));
        }
        if options.wait_for_close {
            match self.root() {
                Some(root) => {
                    let ms = options.timeout_ms.unwrap_or(timeouts.close_ms);
                    post = post.with_close(root, timeouts.wait(ms));
                }
                None => tracing::warn!("wait_for_close ignored: the document cannot close"),
            }
        }
        if options.wait_for_loading_spinner {
            let loading = self.ctx.config().loading_options(options.include_runtime_spinner);
            post = post.with_loading(None, loading);
        }
        post
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockNode};
    use crate::result::PagekitError;
    use crate::wait::DEFAULT_BUSY_INDICATORS;
    use std::sync::Arc;
    use std::time::Duration;

    fn page() -> (Arc<MockDriver>, PageContext) {
        let driver = Arc::new(MockDriver::new());
        let ctx = PageContext::with_defaults(driver.clone());
        (driver, ctx)
    }

    fn button_xpath(root: Option<&str>, label: &str) -> String {
        build(&LocatorQuery::button(TextMatch::normalize_space(label)), root).unwrap()
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_lookups_are_scoped_to_root() {
            let (_driver, ctx) = page();
            let modal = Container::rooted(ctx.clone(), "//*[@role=\"dialog\"]");
            let button = modal.find_button("OK").unwrap();
            assert!(button.element().xpath().starts_with("//*[@role=\"dialog\"]//"));

            let document = Container::document(ctx);
            let button = document.find_button("OK").unwrap();
            assert!(button.element().xpath().starts_with("//*["));
            assert_eq!(document.self_xpath(), DOCUMENT_XPATH);
        }

        #[test]
        fn test_empty_root_means_document() {
            let (_driver, ctx) = page();
            assert_eq!(Container::new(ctx, Some(String::new())).root(), None);
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_textbox_resolves() {
            let (driver, ctx) = page();
            let form = Container::rooted(ctx, "//form");
            let textbox = form.find_textbox("Name").unwrap();
            driver.add_node(textbox.element().xpath(), MockNode::input("text"));
            textbox.node().await.unwrap();
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_visibility_and_close() {
            let (driver, ctx) = page();
            let id = driver.add_node("//*[@role=\"dialog\"]", MockNode::new("div").with_text(" Delete? "));
            let modal = Container::rooted(ctx, "//*[@role=\"dialog\"]");
            assert!(modal.is_visible(1_000).await);
            assert!(modal.exists().await.unwrap());
            assert_eq!(modal.text_content().await.unwrap(), "Delete?");

            driver.schedule(Duration::from_millis(300), MockEffect::Detach(id));
            modal.wait_until_closed(1_000).await.unwrap();
            assert!(!modal.is_visible(100).await);
            assert!(!modal.exists().await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_until_visible_waits_for_loading() {
            let (driver, ctx) = page();
            driver.add_node("//main", MockNode::new("main"));
            let spinner = driver.add_node(DEFAULT_BUSY_INDICATORS[0], MockNode::new("div"));
            driver.schedule(Duration::from_millis(700), MockEffect::Hide(spinner));

            let main = Container::rooted(ctx, "//main");
            let started = tokio::time::Instant::now();
            main.wait_until_visible(5_000).await.unwrap();
            assert!(started.elapsed() >= Duration::from_millis(700));
        }

        #[tokio::test(start_paused = true)]
        async fn test_locate_self_not_found() {
            let (_driver, ctx) = page();
            let sidebar = Container::rooted(ctx, "//aside");
            let err = sidebar.locate_self(500).await.unwrap_err();
            assert!(matches!(err, PagekitError::NotFound { ref xpath, .. } if xpath == "//aside"));
        }
    }

    mod click_button_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_click_and_close() {
            let (driver, ctx) = page();
            let root = "//*[@role=\"dialog\"]";
            let dialog = driver.add_node(root, MockNode::new("div"));
            let ok = driver.add_node(button_xpath(Some(root), "OK"), MockNode::new("button"));
            driver.on_click_after(ok, Duration::from_millis(100), MockEffect::Detach(dialog));

            let modal = Container::rooted(ctx, root);
            let options = ClickButtonOptions::new().wait_for_close().without_loading_spinner();
            modal.click_button("OK", options).await.unwrap();
            assert!(!driver.node(dialog).unwrap().attached);
            assert_eq!(driver.release_count(ok), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_waits_until_enabled_before_clicking() {
            let (driver, ctx) = page();
            let save = driver.add_node(
                button_xpath(None, "Save"),
                MockNode::new("button").with_attribute("disabled", ""),
            );
            driver.schedule(
                Duration::from_millis(400),
                MockEffect::RemoveAttribute(save, "disabled".into()),
            );
            let page = Container::document(ctx);
            let started = tokio::time::Instant::now();
            page.click_button("Save", ClickButtonOptions::new().without_loading_spinner())
                .await
                .unwrap();
            assert!(started.elapsed() >= Duration::from_millis(400));
            assert_eq!(driver.click_count(save), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigation_is_observed_before_loading_wait() {
            let (driver, ctx) = page();
            let indicator = DEFAULT_BUSY_INDICATORS[0];
            let save = driver.add_node(button_xpath(None, "Save"), MockNode::new("button"));
            let old_spinner = driver.add_node(indicator, MockNode::new("div").hidden());
            let new_spinner = driver.add_node(indicator, MockNode::new("div").hidden());
            let marker = driver.add_node(
                "//h1",
                MockNode::new("h1").with_text("Workspace created").hidden(),
            );

            // the old page spins, then navigates; the new page spins until 500ms
            driver.on_click(save, MockEffect::Show(old_spinner));
            let at = Duration::from_millis(200);
            driver.on_click_after(save, at, MockEffect::Detach(old_spinner));
            driver.on_click_after(save, at, MockEffect::Show(new_spinner));
            driver.on_click_after(save, at, MockEffect::navigate("https://app/workspaces/ws-1", "ws-1"));
            let done = Duration::from_millis(500);
            driver.on_click_after(save, done, MockEffect::Hide(new_spinner));
            driver.on_click_after(save, done, MockEffect::Show(marker));

            let page = Container::document(ctx.clone());
            page.click_button("Save", ClickButtonOptions::new().wait_for_nav())
                .await
                .unwrap();

            assert_eq!(driver.nav_generation(), 1);
            assert!(!driver.node(new_spinner).unwrap().visible);
            let marker = driver.node(marker).unwrap();
            assert!(marker.visible);
            assert_eq!(marker.text, "Workspace created");
            assert_eq!(ctx.current_url().await.unwrap(), "https://app/workspaces/ws-1");
        }

        #[tokio::test(start_paused = true)]
        async fn test_route_change_counts_as_navigation() {
            let (driver, ctx) = page();
            driver.set_title("Workspaces");
            let open = driver.add_node(button_xpath(None, "Open"), MockNode::new("button"));
            driver.on_click_after(
                open,
                Duration::from_millis(150),
                MockEffect::PushState("https://app/workspaces/ws-1/data".into()),
            );

            let page = Container::document(ctx.clone());
            page.click_button("Open", ClickButtonOptions::new().wait_for_nav())
                .await
                .unwrap();
            assert_eq!(driver.nav_generation(), 1);
            assert_eq!(ctx.current_url().await.unwrap(), "https://app/workspaces/ws-1/data");
            assert_eq!(ctx.title().await.unwrap(), "Workspaces");
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_button_is_not_found() {
            let (_driver, ctx) = page();
            let page = Container::document(ctx);
            let err = page
                .click_button("Nope", ClickButtonOptions::new())
                .await
                .unwrap_err();
            assert!(matches!(err, PagekitError::NotFound { .. }));
        }
    }
}
