//! Element handles.
//!
//! An [`Element`] wraps one locator and, once located, the node it resolved
//! to. Location is lazy: nothing touches the page until the first operation,
//! after which the node is cached. A cached node that has since detached is
//! reported as [`PagekitError::StaleElement`]; call [`Element::relocate`] to
//! resolve the locator again after a navigation or re-render.
//!
//! Typed wrappers ([`Button`], [`Checkbox`], ...) implement
//! [`ElementWrapper`], which checks the located node's kind before any
//! kind-specific operation.

mod button;
mod checkbox;
mod link;
mod radio;
mod select;
mod text_input;

pub use button::{Button, PostClick};
pub use checkbox::Checkbox;
pub use link::{Icon, Link};
pub use radio::RadioButton;
pub use select::{Dropdown, Select};
pub use text_input::{Editable, Textarea, Textbox};

use crate::context::PageContext;
use crate::driver::{release_quietly, ClickOptions, NodeRef, PageDriver};
use crate::locator::ElementKind;
use crate::result::{PagekitError, PagekitResult};
use crate::wait::{wait_for_fn, wait_for_node};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How a handle resolves its locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    /// Time allowed for the node to show up
    pub timeout_ms: u64,
    /// Require the node to be displayed, not just attached
    pub visible: bool,
}

impl LocateOptions {
    /// Visible node within `timeout_ms`
    #[must_use]
    pub const fn visible(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            visible: true,
        }
    }

    /// Attached node within `timeout_ms`, displayed or not
    #[must_use]
    pub const fn present(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            visible: false,
        }
    }
}

#[derive(Debug, Default)]
struct HandleState {
    node: Option<NodeRef>,
    disposed: bool,
}

/// Handle to one located (or yet to be located) node
#[derive(Debug)]
pub struct Element {
    ctx: PageContext,
    xpath: String,
    state: Mutex<HandleState>,
}

impl Element {
    /// Lazy handle for `xpath`
    pub fn new(ctx: PageContext, xpath: impl Into<String>) -> Self {
        Self {
            ctx,
            xpath: xpath.into(),
            state: Mutex::new(HandleState::default()),
        }
    }

    /// Handle for a node that is already located
    pub fn from_node(ctx: PageContext, node: NodeRef) -> Self {
        Self {
            ctx,
            xpath: node.xpath.clone(),
            state: Mutex::new(HandleState {
                node: Some(node),
                disposed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locator of this handle
    #[must_use]
    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    /// Page context
    #[must_use]
    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Driver of the page
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.ctx.driver()
    }

    /// Whether `dispose` was called
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    fn default_locate(&self) -> LocateOptions {
        LocateOptions::visible(self.ctx.timeouts().default_ms)
    }

    /// Resolve the locator, or return the cached node.
    ///
    /// A cached node that detached fails with `StaleElement` instead of being
    /// silently re-resolved.
    pub async fn locate(&self, options: LocateOptions) -> PagekitResult<NodeRef> {
        let cached = {
            let state = self.state();
            if state.disposed {
                return Err(PagekitError::Disposed {
                    xpath: self.xpath.clone(),
                });
            }
            state.node.clone()
        };

        if let Some(node) = cached {
            if self.driver().is_attached(&node).await? {
                return Ok(node);
            }
            return Err(PagekitError::StaleElement {
                xpath: self.xpath.clone(),
            });
        }

        let wait = self.ctx.timeouts().wait(options.timeout_ms);
        let node = wait_for_node(self.driver(), &self.xpath, options.visible, &wait).await?;
        tracing::debug!(xpath = %self.xpath, node = %node.describe(), "located");
        self.state().node = Some(node.clone());
        Ok(node)
    }

    /// Drop the cached node and resolve the locator again
    pub async fn relocate(&self, options: LocateOptions) -> PagekitResult<NodeRef> {
        let previous = self.state().node.take();
        if let Some(node) = previous {
            release_quietly(self.driver(), &node).await;
        }
        self.locate(options).await
    }

    /// Locate and check that the node is of `kind`
    pub async fn locate_as(&self, kind: ElementKind, options: LocateOptions) -> PagekitResult<NodeRef> {
        let node = self.locate(options).await?;
        if accepts(kind, &node) {
            Ok(node)
        } else {
            Err(PagekitError::WrongKind {
                xpath: self.xpath.clone(),
                expected: kind.to_string(),
                found: node.describe(),
            })
        }
    }

    async fn node(&self) -> PagekitResult<NodeRef> {
        self.locate(self.default_locate()).await
    }

    /// Whether the locator matches a displayed node within `timeout_ms`.
    ///
    /// Never fails: absence, staleness and driver errors all read as `false`.
    pub async fn is_visible(&self, timeout_ms: u64) -> bool {
        if self.is_disposed() {
            return false;
        }
        let wait = self.ctx.timeouts().wait(timeout_ms);
        match wait_for_node(self.driver(), &self.xpath, true, &wait).await {
            Ok(node) => {
                release_quietly(self.driver(), &node).await;
                true
            }
            Err(_) => false,
        }
    }

    /// Read a DOM property
    pub async fn property(&self, name: &str) -> PagekitResult<serde_json::Value> {
        let node = self.node().await?;
        self.driver().property(&node, name).await
    }

    /// Read an attribute
    pub async fn attribute(&self, name: &str) -> PagekitResult<Option<String>> {
        let node = self.node().await?;
        self.driver().attribute(&node, name).await
    }

    /// Read a computed style
    pub async fn computed_style(&self, css_property: &str) -> PagekitResult<String> {
        let node = self.node().await?;
        self.driver().computed_style(&node, css_property).await
    }

    /// Rendered text, trimmed
    pub async fn text(&self) -> PagekitResult<String> {
        let value = self.property("innerText").await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    /// Simulated click
    pub async fn click(&self, options: &ClickOptions) -> PagekitResult<()> {
        let node = self.node().await?;
        tracing::debug!(xpath = %self.xpath, "click");
        self.driver().click(&node, options).await
    }

    /// Programmatic click, bypasses overlays and animations
    pub async fn click_via_script(&self) -> PagekitResult<()> {
        let node = self.locate(LocateOptions::present(self.ctx.timeouts().default_ms)).await?;
        tracing::debug!(xpath = %self.xpath, "click via script");
        self.driver().click_via_script(&node).await
    }

    /// Focus the node
    pub async fn focus(&self) -> PagekitResult<()> {
        let node = self.node().await?;
        self.driver().focus(&node).await
    }

    /// Whether the node lacks a `disabled` attribute
    pub async fn has_no_disabled_attribute(&self) -> PagekitResult<bool> {
        Ok(self.attribute("disabled").await?.is_none())
    }

    /// Wait until the node has no `disabled` attribute
    pub async fn wait_until_enabled(&self, timeout_ms: u64) -> PagekitResult<()> {
        let description = format!("{} to be enabled", self.xpath);
        let wait = self.ctx.timeouts().wait(timeout_ms);
        wait_for_fn(&description, &wait, move || self.has_no_disabled_attribute()).await?;
        Ok(())
    }

    /// Release the native handle. Later calls are no-ops.
    pub async fn dispose(&self) {
        let node = {
            let mut state = self.state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.node.take()
        };
        if let Some(node) = node {
            if let Err(e) = self.driver().release(&node).await {
                tracing::debug!(xpath = %self.xpath, error = %e, "release failed");
            }
        }
    }
}

/// Whether a located node has the shape of `kind`
#[must_use]
pub fn accepts(kind: ElementKind, node: &NodeRef) -> bool {
    let tag = node.tag_name.as_str();
    let role = node.role.as_deref();
    let input_of = |types: &[&str]| {
        tag == "input" && types.contains(&node.input_type.as_deref().unwrap_or("text"))
    };
    match kind {
        ElementKind::Button => {
            tag == "button" || role == Some("button") || input_of(&["button", "submit", "reset"])
        }
        ElementKind::Link => tag == "a" || role == Some("link"),
        ElementKind::Icon => matches!(tag, "clr-icon" | "svg" | "img" | "i") || role == Some("img"),
        ElementKind::Checkbox => input_of(&["checkbox"]) || role == Some("checkbox"),
        ElementKind::RadioButton => input_of(&["radio"]) || role == Some("radio"),
        ElementKind::Textbox => {
            input_of(&["text", "email", "password", "search", "number", "tel", "url"])
                || (role == Some("textbox") && tag != "textarea")
        }
        ElementKind::Textarea => tag == "textarea",
        ElementKind::Select => tag == "select",
        ElementKind::Dropdown => tag != "input" && tag != "select",
    }
}

/// Capability shared by all typed wrappers
#[async_trait]
pub trait ElementWrapper: Send + Sync {
    /// Kind of node this wrapper operates on
    const KIND: ElementKind;

    /// Underlying handle
    fn element(&self) -> &Element;

    /// How the wrapper locates its node
    fn locate_options(&self) -> LocateOptions {
        LocateOptions::visible(self.element().context().timeouts().default_ms)
    }

    /// Located node, checked against [`Self::KIND`]
    async fn node(&self) -> PagekitResult<NodeRef> {
        self.element().locate_as(Self::KIND, self.locate_options()).await
    }

    /// Kind-specific enabled predicate
    async fn is_enabled(&self) -> PagekitResult<bool> {
        self.node().await?;
        self.element().has_no_disabled_attribute().await
    }

    /// Poll [`Self::is_enabled`] until true
    async fn wait_until_enabled(&self, timeout_ms: u64) -> PagekitResult<()> {
        let element = self.element();
        let description = format!("{} {} to be enabled", Self::KIND, element.xpath());
        let wait = element.context().timeouts().wait(timeout_ms);
        wait_for_fn(&description, &wait, move || self.is_enabled()).await?;
        Ok(())
    }

    /// Whether the node is displayed within `timeout_ms` (never fails)
    async fn is_visible(&self, timeout_ms: u64) -> bool {
        self.element().is_visible(timeout_ms).await
    }

    /// Release the native handle (idempotent)
    async fn dispose(&self) {
        self.element().dispose().await;
    }
}
