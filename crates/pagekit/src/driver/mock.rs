//! Mock driver for unit testing page objects without a browser.
//!
//! The DOM is scripted: every node is registered under the exact XPath
//! strings it should answer to, and clicks can be wired to effects that are
//! applied immediately or after a delay. Delays are measured on the tokio
//! clock, so tests running with a paused clock stay deterministic.

use super::{ClickOptions, NodeRef, PageDriver};
use crate::result::{PagekitError, PagekitResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// PNG signature, returned as the default screenshot
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Poll interval of the mock navigation wait
const NAV_POLL: Duration = Duration::from_millis(10);

/// Identifier of a node in a [`MockDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockNodeId(u64);

impl MockNodeId {
    fn key(self) -> String {
        format!("mock-{}", self.0)
    }

    fn handle(self, seq: u64) -> String {
        format!("mock-{}#{seq}", self.0)
    }

    fn parse(id: &str) -> Option<Self> {
        let rest = id.strip_prefix("mock-")?;
        let node = rest.split_once('#').map_or(rest, |(node, _)| node);
        node.parse().ok().map(Self)
    }
}

/// A scripted DOM node
#[derive(Debug, Clone, PartialEq)]
pub struct MockNode {
    /// Tag name
    pub tag_name: String,
    /// `type` of an `<input>`
    pub input_type: Option<String>,
    /// ARIA role
    pub role: Option<String>,
    /// `innerText`
    pub text: String,
    /// Current value of editable nodes
    pub value: String,
    /// Rendered and visible
    pub visible: bool,
    /// Part of the document
    pub attached: bool,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Properties other than `value` and `innerText`
    pub properties: BTreeMap<String, Value>,
    /// Computed styles
    pub styles: BTreeMap<String, String>,
}

impl MockNode {
    /// Visible, attached node with the given tag
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            input_type: None,
            role: None,
            text: String::new(),
            value: String::new(),
            visible: true,
            attached: true,
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            styles: BTreeMap::new(),
        }
    }

    /// `<input type=...>`
    #[must_use]
    pub fn input(input_type: &str) -> Self {
        let mut node = Self::new("input");
        node.input_type = Some(input_type.to_ascii_lowercase());
        node.attributes
            .insert("type".to_string(), input_type.to_string());
        node
    }

    /// Checkbox input with an initial `checked` property
    #[must_use]
    pub fn checkbox(checked: bool) -> Self {
        Self::input("checkbox").with_property("checked", Value::Bool(checked))
    }

    /// Set `innerText`
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the current value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the ARIA role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        self.attributes.insert("role".to_string(), role.clone());
        self.role = Some(role);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Set a computed style
    #[must_use]
    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(name.into(), value.into());
        self
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start detached from the document
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    fn read_property(&self, name: &str) -> Value {
        match name {
            "value" => Value::String(self.value.clone()),
            "innerText" | "textContent" => Value::String(self.text.clone()),
            "tagName" => Value::String(self.tag_name.to_ascii_uppercase()),
            _ => self.properties.get(name).cloned().unwrap_or_else(|| {
                if name == "disabled" {
                    Value::Bool(self.attributes.contains_key("disabled"))
                } else {
                    Value::Null
                }
            }),
        }
    }
}

/// A DOM mutation applied by a click or a schedule
#[derive(Debug, Clone, PartialEq)]
pub enum MockEffect {
    /// Set a property
    SetProperty(MockNodeId, String, Value),
    /// Flip a boolean property
    ToggleProperty(MockNodeId, String),
    /// Set an attribute
    SetAttribute(MockNodeId, String, String),
    /// Remove an attribute
    RemoveAttribute(MockNodeId, String),
    /// Replace `innerText`
    SetText(MockNodeId, String),
    /// Make visible
    Show(MockNodeId),
    /// Make invisible
    Hide(MockNodeId),
    /// Re-attach to the document
    Attach(MockNodeId),
    /// Detach from the document
    Detach(MockNodeId),
    /// Complete a navigation (fires a load event)
    Navigate {
        /// New URL
        url: String,
        /// New title
        title: String,
    },
    /// Same-document route change through the history API; no load event
    PushState(String),
}

impl MockEffect {
    /// Navigation effect
    #[must_use]
    pub fn navigate(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::Navigate {
            url: url.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    nodes: BTreeMap<MockNodeId, MockNode>,
    xpaths: HashMap<String, Vec<MockNodeId>>,
    click_effects: HashMap<MockNodeId, Vec<(Duration, MockEffect)>>,
    ignored_clicks: HashMap<MockNodeId, u32>,
    clicks: HashMap<MockNodeId, u32>,
    released: HashMap<MockNodeId, u32>,
    released_handles: HashSet<String>,
    next_handle: u64,
    pending: Vec<(Instant, MockEffect)>,
    scripts: HashMap<String, Value>,
    url: String,
    title: String,
    html: String,
    screenshot: Option<Vec<u8>>,
    fail_content: bool,
    nav_generation: u64,
    call_history: Vec<String>,
}

impl MockState {
    fn apply(&mut self, effect: MockEffect) {
        let target = match &effect {
            MockEffect::Navigate { url, title } => {
                self.url.clone_from(url);
                self.title.clone_from(title);
                self.nav_generation += 1;
                return;
            }
            MockEffect::PushState(url) => {
                self.url.clone_from(url);
                self.nav_generation += 1;
                return;
            }
            MockEffect::SetProperty(id, ..)
            | MockEffect::ToggleProperty(id, _)
            | MockEffect::SetAttribute(id, ..)
            | MockEffect::RemoveAttribute(id, _)
            | MockEffect::SetText(id, _)
            | MockEffect::Show(id)
            | MockEffect::Hide(id)
            | MockEffect::Attach(id)
            | MockEffect::Detach(id) => *id,
        };
        let Some(node) = self.nodes.get_mut(&target) else {
            return;
        };
        match effect {
            MockEffect::SetProperty(_, name, value) => {
                node.properties.insert(name, value);
            }
            MockEffect::ToggleProperty(_, name) => {
                let current = node.read_property(&name).as_bool().unwrap_or(false);
                node.properties.insert(name, Value::Bool(!current));
            }
            MockEffect::SetAttribute(_, name, value) => {
                node.attributes.insert(name, value);
            }
            MockEffect::RemoveAttribute(_, name) => {
                node.attributes.remove(&name);
            }
            MockEffect::SetText(_, text) => node.text = text,
            MockEffect::Show(_) => node.visible = true,
            MockEffect::Hide(_) => node.visible = false,
            MockEffect::Attach(_) => node.attached = true,
            MockEffect::Detach(_) => node.attached = false,
            MockEffect::Navigate { .. } | MockEffect::PushState(_) => {}
        }
    }

    /// Apply every scheduled effect whose time has come, in schedule order
    fn settle(&mut self) {
        let now = Instant::now();
        let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.pending = later;
        due.sort_by_key(|(at, _)| *at);
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn schedule(&mut self, delay: Duration, effect: MockEffect) {
        if delay.is_zero() {
            self.apply(effect);
        } else {
            self.pending.push((Instant::now() + delay, effect));
        }
    }

    fn resolve(&self, node: &NodeRef) -> PagekitResult<MockNodeId> {
        let stale = || PagekitError::StaleElement {
            xpath: node.xpath.clone(),
        };
        let id = MockNodeId::parse(&node.id).ok_or_else(stale)?;
        if self.released_handles.contains(&node.id) {
            return Err(PagekitError::driver(format!(
                "handle {} was released",
                node.id
            )));
        }
        match self.nodes.get(&id) {
            Some(n) if n.attached => Ok(id),
            _ => Err(stale()),
        }
    }

    fn node_mut(&mut self, node: &NodeRef) -> PagekitResult<&mut MockNode> {
        let id = self.resolve(node)?;
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| PagekitError::StaleElement {
                xpath: node.xpath.clone(),
            })
    }

    fn record_on(&mut self, action: &str, node: &NodeRef, detail: Option<&str>) {
        let key = MockNodeId::parse(&node.id).map_or_else(|| node.id.clone(), MockNodeId::key);
        match detail {
            Some(detail) => self.record(format!("{action}:{key}:{detail}")),
            None => self.record(format!("{action}:{key}")),
        }
    }

    fn record(&mut self, call: String) {
        self.call_history.push(call);
    }

    fn fire_click(&mut self, id: MockNodeId) {
        *self.clicks.entry(id).or_default() += 1;
        if let Some(remaining) = self.ignored_clicks.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return;
            }
        }
        let effects = self.click_effects.get(&id).cloned().unwrap_or_default();
        for (delay, effect) in effects {
            self.schedule(delay, effect);
        }
    }
}

/// In-memory scripted page
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let state = MockState {
            url: "about:blank".to_string(),
            html: "<html><head></head><body></body></html>".to_string(),
            screenshot: Some(PNG_MAGIC.to_vec()),
            ..MockState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a node answering to `xpath`
    pub fn add_node(&self, xpath: impl Into<String>, node: MockNode) -> MockNodeId {
        let mut state = self.state();
        state.next_id += 1;
        let id = MockNodeId(state.next_id);
        state.nodes.insert(id, node);
        state.xpaths.entry(xpath.into()).or_default().push(id);
        id
    }

    /// Make an existing node answer to another XPath as well
    pub fn alias(&self, xpath: impl Into<String>, id: MockNodeId) {
        self.state().xpaths.entry(xpath.into()).or_default().push(id);
    }

    /// Apply `effect` as soon as `id` is clicked
    pub fn on_click(&self, id: MockNodeId, effect: MockEffect) {
        self.on_click_after(id, Duration::ZERO, effect);
    }

    /// Apply `effect` `delay` after `id` is clicked
    pub fn on_click_after(&self, id: MockNodeId, delay: Duration, effect: MockEffect) {
        self.state()
            .click_effects
            .entry(id)
            .or_default()
            .push((delay, effect));
    }

    /// The next `count` clicks on `id` have no effect
    pub fn ignore_clicks(&self, id: MockNodeId, count: u32) {
        self.state().ignored_clicks.insert(id, count);
    }

    /// Apply `effect` after `delay`, independent of any click
    pub fn schedule(&self, delay: Duration, effect: MockEffect) {
        self.state().schedule(delay, effect);
    }

    /// Apply `effect` now
    pub fn apply(&self, effect: MockEffect) {
        self.state().apply(effect);
    }

    /// Clicks received by `id`, both simulated and scripted
    #[must_use]
    pub fn click_count(&self, id: MockNodeId) -> u32 {
        self.state().clicks.get(&id).copied().unwrap_or(0)
    }

    /// Times `release` was called for `id`
    #[must_use]
    pub fn release_count(&self, id: MockNodeId) -> u32 {
        self.state().released.get(&id).copied().unwrap_or(0)
    }

    /// Handles minted by `query_xpath` so far
    #[must_use]
    pub fn minted_handles(&self) -> u64 {
        self.state().next_handle
    }

    /// Distinct handles released so far
    #[must_use]
    pub fn released_handles(&self) -> usize {
        self.state().released_handles.len()
    }

    /// Snapshot of a node after applying due effects
    #[must_use]
    pub fn node(&self, id: MockNodeId) -> Option<MockNode> {
        let mut state = self.state();
        state.settle();
        state.nodes.get(&id).cloned()
    }

    /// Set the URL
    pub fn set_url(&self, url: impl Into<String>) {
        self.state().url = url.into();
    }

    /// Set the document title
    pub fn set_title(&self, title: impl Into<String>) {
        self.state().title = title.into();
    }

    /// Set the HTML returned by `content()`
    pub fn set_content(&self, html: impl Into<String>) {
        self.state().html = html.into();
    }

    /// Make `content()` fail
    pub fn fail_content(&self, fail: bool) {
        self.state().fail_content = fail;
    }

    /// Set the screenshot bytes; `None` makes `screenshot()` fail
    pub fn set_screenshot(&self, png: Option<Vec<u8>>) {
        self.state().screenshot = png;
    }

    /// Result returned by `evaluate(script)`
    pub fn set_script_result(&self, script: impl Into<String>, value: Value) {
        self.state().scripts.insert(script.into(), value);
    }

    /// Completed navigations so far
    #[must_use]
    pub fn nav_generation(&self) -> u64 {
        self.state().nav_generation
    }

    /// Recorded actions
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if an action was recorded
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn query_xpath(&self, xpath: &str) -> PagekitResult<Vec<NodeRef>> {
        let mut state = self.state();
        state.settle();
        let ids = state.xpaths.get(xpath).cloned().unwrap_or_default();
        let mut found = Vec::new();
        for id in ids {
            let Some(node) = state.nodes.get(&id).filter(|n| n.attached) else {
                continue;
            };
            let mut node_ref = NodeRef::new(id.handle(state.next_handle + 1), &node.tag_name, xpath);
            node_ref.input_type.clone_from(&node.input_type);
            node_ref.role.clone_from(&node.role);
            state.next_handle += 1;
            found.push(node_ref);
        }
        Ok(found)
    }

    async fn is_displayed(&self, node: &NodeRef) -> PagekitResult<bool> {
        let mut state = self.state();
        state.settle();
        Ok(state.node_mut(node)?.visible)
    }

    async fn is_attached(&self, node: &NodeRef) -> PagekitResult<bool> {
        let mut state = self.state();
        state.settle();
        Ok(MockNodeId::parse(&node.id)
            .and_then(|id| state.nodes.get(&id))
            .is_some_and(|n| n.attached))
    }

    async fn property(&self, node: &NodeRef, name: &str) -> PagekitResult<Value> {
        let mut state = self.state();
        state.settle();
        Ok(state.node_mut(node)?.read_property(name))
    }

    async fn attribute(&self, node: &NodeRef, name: &str) -> PagekitResult<Option<String>> {
        let mut state = self.state();
        state.settle();
        Ok(state.node_mut(node)?.attributes.get(name).cloned())
    }

    async fn computed_style(&self, node: &NodeRef, css_property: &str) -> PagekitResult<String> {
        let mut state = self.state();
        state.settle();
        Ok(state
            .node_mut(node)?
            .styles
            .get(css_property)
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, node: &NodeRef, options: &ClickOptions) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        let id = state.resolve(node)?;
        if !state.node_mut(node)?.visible {
            return Err(PagekitError::driver(format!(
                "{node} is not visible and cannot receive pointer events"
            )));
        }
        state.record_on("click", node, None);
        for _ in 0..options.effective_count() {
            state.fire_click(id);
        }
        Ok(())
    }

    async fn click_via_script(&self, node: &NodeRef) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        let id = state.resolve(node)?;
        state.record_on("click_via_script", node, None);
        state.fire_click(id);
        Ok(())
    }

    async fn focus(&self, node: &NodeRef) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        state.resolve(node)?;
        state.record_on("focus", node, None);
        Ok(())
    }

    async fn clear(&self, node: &NodeRef) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        state.node_mut(node)?.value.clear();
        state.record_on("clear", node, None);
        Ok(())
    }

    async fn type_text(&self, node: &NodeRef, text: &str) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        state.node_mut(node)?.value.push_str(text);
        state.record_on("type_text", node, Some(text));
        Ok(())
    }

    async fn press_key(&self, node: &NodeRef, key: &str) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        state.resolve(node)?;
        state.record_on("press_key", node, Some(key));
        Ok(())
    }

    async fn select_option(&self, node: &NodeRef, value: &str) -> PagekitResult<()> {
        let mut state = self.state();
        state.settle();
        state.node_mut(node)?.value = value.to_string();
        state.record_on("select_option", node, Some(value));
        Ok(())
    }

    async fn release(&self, node: &NodeRef) -> PagekitResult<()> {
        let mut state = self.state();
        if let Some(id) = MockNodeId::parse(&node.id) {
            *state.released.entry(id).or_default() += 1;
        }
        state.released_handles.insert(node.id.clone());
        state.record_on("release", node, None);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> PagekitResult<Value> {
        let mut state = self.state();
        state.settle();
        state.record(format!("evaluate:{script}"));
        Ok(state.scripts.get(script).cloned().unwrap_or(Value::Null))
    }

    async fn goto(&self, url: &str) -> PagekitResult<()> {
        let mut state = self.state();
        state.record(format!("goto:{url}"));
        state.apply(MockEffect::navigate(url, String::new()));
        Ok(())
    }

    async fn current_url(&self) -> PagekitResult<String> {
        let mut state = self.state();
        state.settle();
        Ok(state.url.clone())
    }

    async fn title(&self) -> PagekitResult<String> {
        let mut state = self.state();
        state.settle();
        Ok(state.title.clone())
    }

    async fn content(&self) -> PagekitResult<String> {
        let mut state = self.state();
        state.record("content".to_string());
        if state.fail_content {
            return Err(PagekitError::driver("mock content() failure"));
        }
        Ok(state.html.clone())
    }

    async fn screenshot(&self, full_page: bool) -> PagekitResult<Vec<u8>> {
        let mut state = self.state();
        state.record(format!("screenshot:full_page={full_page}"));
        state
            .screenshot
            .clone()
            .ok_or_else(|| PagekitError::driver("mock screenshot() failure"))
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> PagekitResult<()> {
        let armed = self.state().nav_generation;
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            {
                let mut state = self.state();
                state.settle();
                if state.nav_generation > armed {
                    return Ok(());
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PagekitError::timeout(
                    "navigation",
                    started.elapsed().as_millis() as u64,
                ));
            }
            tokio::time::sleep(NAV_POLL.min(deadline - now)).await;
        }
    }
}
