//! PageDriver - the narrow browser capability set pagekit depends on.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Container / Element / wait helpers                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Arc<dyn PageDriver>   (one per browser tab)                 │
//! │                                                              │
//! │  ┌──────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ChromiumDriver      │   │  MockDriver                 │  │
//! │  │  (feature "browser") │   │  (scripted DOM, unit tests) │  │
//! │  │  CDP via chromiumoxide│   │                             │  │
//! │  └──────────────────────┘   └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing above this trait knows which browser automation library is in use.

mod mock;

pub use mock::{MockDriver, MockEffect, MockNode, MockNodeId};

use crate::result::PagekitResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A node located by a driver.
///
/// Only meaningful to the driver that produced it. The node may detach from
/// the document at any time; reads against a detached node fail with
/// [`crate::PagekitError::StaleElement`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Driver-specific identifier
    pub id: String,
    /// Lower-case tag name
    pub tag_name: String,
    /// `type` attribute for `<input>` nodes
    pub input_type: Option<String>,
    /// ARIA role attribute
    pub role: Option<String>,
    /// XPath the node was located with
    pub xpath: String,
}

impl NodeRef {
    /// Create a node reference
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into().to_ascii_lowercase(),
            input_type: None,
            role: None,
            xpath: xpath.into(),
        }
    }

    /// Set the input type
    #[must_use]
    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into().to_ascii_lowercase());
        self
    }

    /// Set the ARIA role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Short description used in error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.input_type, &self.role) {
            (Some(t), _) => format!("{}[type={t}]", self.tag_name),
            (None, Some(r)) => format!("{}[role={r}]", self.tag_name),
            (None, None) => self.tag_name.clone(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.xpath)
    }
}

/// Mouse button for simulated clicks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button
    #[default]
    Left,
    /// Middle button
    Middle,
    /// Secondary button
    Right,
}

/// Options for a simulated click
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickOptions {
    /// Mouse button
    pub button: MouseButton,
    /// Number of clicks (1 = single, 2 = double)
    pub click_count: u32,
    /// Delay between mousedown and mouseup
    pub delay_ms: u64,
}

impl ClickOptions {
    /// Single left click
    #[must_use]
    pub const fn new() -> Self {
        Self {
            button: MouseButton::Left,
            click_count: 1,
            delay_ms: 0,
        }
    }

    /// Double click
    #[must_use]
    pub const fn double() -> Self {
        Self {
            button: MouseButton::Left,
            click_count: 2,
            delay_ms: 0,
        }
    }

    /// Set mousedown/mouseup delay
    #[must_use]
    pub const fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Effective click count (at least one)
    #[must_use]
    pub const fn effective_count(&self) -> u32 {
        if self.click_count == 0 {
            1
        } else {
            self.click_count
        }
    }
}

/// Browser capabilities used by pagekit.
///
/// One driver instance represents one browser tab and is shared as
/// `Arc<dyn PageDriver>` by every container and element of that tab.
/// Implementations must be safe to call from concurrent read-only waits.
#[async_trait]
pub trait PageDriver: Send + Sync + fmt::Debug {
    /// All element nodes matching `xpath`, in document order. Zero matches
    /// is `Ok(vec![])`.
    async fn query_xpath(&self, xpath: &str) -> PagekitResult<Vec<NodeRef>>;

    /// Whether the node is rendered and visible
    async fn is_displayed(&self, node: &NodeRef) -> PagekitResult<bool>;

    /// Whether the node is still attached to the document
    async fn is_attached(&self, node: &NodeRef) -> PagekitResult<bool>;

    /// Read a DOM property
    async fn property(&self, node: &NodeRef, name: &str) -> PagekitResult<serde_json::Value>;

    /// Read an attribute (`None` when absent)
    async fn attribute(&self, node: &NodeRef, name: &str) -> PagekitResult<Option<String>>;

    /// Read a computed CSS property
    async fn computed_style(&self, node: &NodeRef, css_property: &str) -> PagekitResult<String>;

    /// Simulated mouse click (subject to overlays and visibility)
    async fn click(&self, node: &NodeRef, options: &ClickOptions) -> PagekitResult<()>;

    /// Programmatic `HTMLElement.click()`
    async fn click_via_script(&self, node: &NodeRef) -> PagekitResult<()>;

    /// Focus the node
    async fn focus(&self, node: &NodeRef) -> PagekitResult<()>;

    /// Clear the value of an editable node
    async fn clear(&self, node: &NodeRef) -> PagekitResult<()>;

    /// Type text into a focused editable node
    async fn type_text(&self, node: &NodeRef, text: &str) -> PagekitResult<()>;

    /// Press a named key (`"Tab"`, `"Enter"`) on the node
    async fn press_key(&self, node: &NodeRef, key: &str) -> PagekitResult<()>;

    /// Select an option of a `<select>` by value
    async fn select_option(&self, node: &NodeRef, value: &str) -> PagekitResult<()>;

    /// Release the native handle held for `node`
    async fn release(&self, node: &NodeRef) -> PagekitResult<()>;

    /// Evaluate a JavaScript expression in the page
    async fn evaluate(&self, script: &str) -> PagekitResult<serde_json::Value>;

    /// Navigate to `url` and wait for the load event
    async fn goto(&self, url: &str) -> PagekitResult<()>;

    /// Current page URL
    async fn current_url(&self) -> PagekitResult<String>;

    /// Current document title
    async fn title(&self) -> PagekitResult<String>;

    /// Full serialized HTML of the page
    async fn content(&self) -> PagekitResult<String>;

    /// PNG screenshot of the viewport or the full page
    async fn screenshot(&self, full_page: bool) -> PagekitResult<Vec<u8>>;

    /// Wait for the next main-frame navigation.
    ///
    /// Both document loads and same-document (history API) navigations
    /// count. The wait is armed when the returned future is first polled and
    /// only completes for a navigation that happens after that point.
    /// Dropping the future removes any listener it installed.
    async fn wait_for_navigation(&self, timeout: Duration) -> PagekitResult<()>;
}

/// Release `node`, logging a failure instead of returning it
pub(crate) async fn release_quietly(driver: &dyn PageDriver, node: &NodeRef) {
    if let Err(e) = driver.release(node).await {
        tracing::debug!(node = %node, error = %e, "release failed");
    }
}

/// Release every node in `nodes`
pub(crate) async fn release_all<'a, I>(driver: &dyn PageDriver, nodes: I)
where
    I: IntoIterator<Item = &'a NodeRef>,
{
    for node in nodes {
        release_quietly(driver, node).await;
    }
}
