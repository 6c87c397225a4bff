//! Chromium-backed [`PageDriver`] over the DevTools protocol.
//!
//! Only compiled with the `browser` feature. Nodes are CDP remote objects
//! kept in a registry keyed by [`NodeRef::id`]; `release` drops the entry
//! and releases the remote object. Node reads run small functions on the
//! remote object that return JSON text, so every value crosses the
//! protocol by value.

#![allow(
    clippy::significant_drop_tightening,
    clippy::items_after_statements
)]

use crate::config::SessionConfig;
use crate::driver::{ClickOptions, NodeRef, PageDriver};
use crate::result::{PagekitError, PagekitResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::EventLoadingFailed;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, EventLoadEventFired,
    EventNavigatedWithinDocument, FrameId,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown, ReleaseObjectParams,
};
use chromiumoxide::element::Element as CdpElement;
use chromiumoxide::page::Page as CdpPage;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

fn driver_error(e: impl fmt::Display) -> PagekitError {
    PagekitError::driver(e.to_string())
}

/// Number of nodes `xpath` selects; throws on a malformed expression
fn count_script(xpath: &str) -> String {
    format!(
        "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
        js_string(xpath)
    )
}

/// Whether a CDP failure means the matched nodes went away between the
/// count and the lookup
fn is_vanished_node(message: &str) -> bool {
    const VANISHED: [&str; 3] = [
        "No node with given id",
        "Could not find node",
        "Invalid search result range",
    ];
    VANISHED.iter().any(|m| message.contains(m))
}

/// Whether a same-document navigation happened in the main frame
fn is_main_frame(main: Option<&FrameId>, frame: &FrameId) -> bool {
    main.map_or(true, |main| main == frame)
}

/// Function body evaluated against a node, returning `JSON.stringify(expr)`
fn json_fn(expr: &str) -> String {
    format!("function() {{ const v = ({expr}); return JSON.stringify(v === undefined ? null : v); }}")
}

/// JavaScript string literal for `s`
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

const DESCRIBE_FN: &str = "({ tag: this.tagName, type: this.getAttribute('type'), role: this.getAttribute('role') })";

const DISPLAYED_FN: &str = "(() => { \
    if (!this.isConnected) return false; \
    const s = window.getComputedStyle(this); \
    const r = this.getBoundingClientRect(); \
    return s.visibility !== 'hidden' && s.display !== 'none' && r.width > 0 && r.height > 0; \
})()";

/// One Chromium tab driven over CDP
pub struct ChromiumDriver {
    browser: tokio::sync::Mutex<CdpBrowser>,
    page: CdpPage,
    nodes: Mutex<HashMap<String, Arc<CdpElement>>>,
    next_id: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("nodes", &self.registry().len())
            .finish_non_exhaustive()
    }
}

impl ChromiumDriver {
    /// Launch Chromium per `session` and open one tab
    pub async fn launch(session: &SessionConfig) -> PagekitResult<Self> {
        let mut builder = CdpConfig::builder().window_size(session.viewport_width, session.viewport_height);
        if !session.headless {
            builder = builder.with_head();
        }
        if !session.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &session.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| PagekitError::BrowserLaunch { message })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| PagekitError::BrowserLaunch {
                message: e.to_string(),
            })?;
        let mut tasks = vec![tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        })];

        let page = browser.new_page("about:blank").await.map_err(driver_error)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(session.viewport_width),
            i64::from(session.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(driver_error)?;
        if let Some(user_agent) = &session.user_agent {
            page.set_user_agent(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(driver_error)?;
        }
        tasks.extend(log_page_events(&page).await?);
        tracing::info!(headless = session.headless, "launched chromium");

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            tasks,
        })
    }

    /// Close the browser
    pub async fn close(self) -> PagekitResult<()> {
        for task in &self.tasks {
            task.abort();
        }
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(driver_error)?;
        Ok(())
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<CdpElement>>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn element(&self, node: &NodeRef) -> PagekitResult<Arc<CdpElement>> {
        self.registry()
            .get(&node.id)
            .cloned()
            .ok_or_else(|| PagekitError::driver(format!("handle {} was released", node.id)))
    }

    /// Evaluate `expr` with `this` bound to the node
    async fn call(&self, node: &NodeRef, expr: &str) -> PagekitResult<Value> {
        let element = self.element(node)?;
        let returned = element
            .call_js_fn(json_fn(expr), true)
            .await
            .map_err(|_| PagekitError::StaleElement {
                xpath: node.xpath.clone(),
            })?;
        match returned.result.value {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            _ => Ok(Value::Null),
        }
    }

    async fn attached_or_stale(&self, node: &NodeRef) -> PagekitResult<()> {
        if self.is_attached(node).await? {
            Ok(())
        } else {
            Err(PagekitError::StaleElement {
                xpath: node.xpath.clone(),
            })
        }
    }

    async fn register(&self, element: CdpElement, xpath: &str) -> PagekitResult<NodeRef> {
        let id = format!("cdp-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.registry().insert(id.clone(), Arc::new(element));
        let probe = NodeRef::new(id.clone(), "", xpath);
        let shape = self.call(&probe, DESCRIBE_FN).await?;
        let tag = shape["tag"].as_str().unwrap_or_default();
        let mut node = NodeRef::new(id, tag, xpath);
        if tag.eq_ignore_ascii_case("input") {
            node = node.with_input_type(shape["type"].as_str().unwrap_or("text"));
        }
        if let Some(role) = shape["role"].as_str() {
            node = node.with_role(role);
        }
        Ok(node)
    }
}

/// Forward console warnings and errors, uncaught exceptions and failed
/// requests to `tracing`
async fn log_page_events(page: &CdpPage) -> PagekitResult<Vec<JoinHandle<()>>> {
    let mut console = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(driver_error)?;
    let mut exceptions = page
        .event_listener::<EventExceptionThrown>()
        .await
        .map_err(driver_error)?;
    let mut failures = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(driver_error)?;

    Ok(vec![
        tokio::spawn(async move {
            while let Some(event) = console.next().await {
                if matches!(
                    event.r#type,
                    ConsoleApiCalledType::Error | ConsoleApiCalledType::Warning
                ) {
                    let text: Vec<String> = event
                        .args
                        .iter()
                        .filter_map(|arg| arg.value.as_ref().map(ToString::to_string))
                        .collect();
                    tracing::debug!(kind = ?event.r#type, message = %text.join(" "), "page console");
                }
            }
        }),
        tokio::spawn(async move {
            while let Some(event) = exceptions.next().await {
                tracing::debug!(message = %event.exception_details.text, "page error");
            }
        }),
        tokio::spawn(async move {
            while let Some(event) = failures.next().await {
                tracing::debug!(error = %event.error_text, "request failed");
            }
        }),
    ])
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn query_xpath(&self, xpath: &str) -> PagekitResult<Vec<NodeRef>> {
        let count = self
            .page
            .evaluate(count_script(xpath))
            .await
            .map_err(|e| PagekitError::driver(format!("xpath {xpath}: {e}")))?
            .value()
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }
        let elements = match self.page.find_xpaths(xpath).await {
            Ok(elements) => elements,
            Err(e) if is_vanished_node(&e.to_string()) => {
                tracing::trace!(xpath, error = %e, "matches detached before lookup");
                return Ok(Vec::new());
            }
            Err(e) => return Err(driver_error(e)),
        };
        let mut nodes = Vec::with_capacity(elements.len());
        for element in elements {
            nodes.push(self.register(element, xpath).await?);
        }
        Ok(nodes)
    }

    async fn is_displayed(&self, node: &NodeRef) -> PagekitResult<bool> {
        Ok(self.call(node, DISPLAYED_FN).await?.as_bool().unwrap_or(false))
    }

    async fn is_attached(&self, node: &NodeRef) -> PagekitResult<bool> {
        match self.call(node, "this.isConnected").await {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(PagekitError::StaleElement { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn property(&self, node: &NodeRef, name: &str) -> PagekitResult<Value> {
        self.attached_or_stale(node).await?;
        self.call(node, &format!("this[{}]", js_string(name))).await
    }

    async fn attribute(&self, node: &NodeRef, name: &str) -> PagekitResult<Option<String>> {
        self.attached_or_stale(node).await?;
        let value = self
            .call(node, &format!("this.getAttribute({})", js_string(name)))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn computed_style(&self, node: &NodeRef, css_property: &str) -> PagekitResult<String> {
        self.attached_or_stale(node).await?;
        let value = self
            .call(
                node,
                &format!("window.getComputedStyle(this).getPropertyValue({})", js_string(css_property)),
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, node: &NodeRef, options: &ClickOptions) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        let element = self.element(node)?;
        for i in 0..options.effective_count() {
            if i > 0 && options.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(options.delay_ms)).await;
            }
            element.click().await.map_err(driver_error)?;
        }
        Ok(())
    }

    async fn click_via_script(&self, node: &NodeRef) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        self.call(node, "this.click()").await?;
        Ok(())
    }

    async fn focus(&self, node: &NodeRef) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        self.element(node)?.focus().await.map_err(driver_error)?;
        Ok(())
    }

    async fn clear(&self, node: &NodeRef) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        self.call(
            node,
            "(() => { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); })()",
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, node: &NodeRef, text: &str) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        self.element(node)?.type_str(text).await.map_err(driver_error)?;
        Ok(())
    }

    async fn press_key(&self, node: &NodeRef, key: &str) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        self.element(node)?.press_key(key).await.map_err(driver_error)?;
        Ok(())
    }

    async fn select_option(&self, node: &NodeRef, value: &str) -> PagekitResult<()> {
        self.attached_or_stale(node).await?;
        let script = format!(
            "(() => {{ this.value = {}; this.dispatchEvent(new Event('change', {{ bubbles: true }})); }})()",
            js_string(value)
        );
        self.call(node, &script).await?;
        Ok(())
    }

    async fn release(&self, node: &NodeRef) -> PagekitResult<()> {
        let Some(element) = self.registry().remove(&node.id) else {
            return Ok(());
        };
        self.page
            .execute(ReleaseObjectParams::new(element.remote_object_id.clone()))
            .await
            .map_err(driver_error)?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> PagekitResult<Value> {
        let result = self.page.evaluate(script).await.map_err(driver_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn goto(&self, url: &str) -> PagekitResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| PagekitError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(url, "navigated");
        Ok(())
    }

    async fn current_url(&self) -> PagekitResult<String> {
        Ok(self.page.url().await.map_err(driver_error)?.unwrap_or_default())
    }

    async fn title(&self) -> PagekitResult<String> {
        Ok(self.page.get_title().await.map_err(driver_error)?.unwrap_or_default())
    }

    async fn content(&self) -> PagekitResult<String> {
        self.page.content().await.map_err(driver_error)
    }

    async fn screenshot(&self, full_page: bool) -> PagekitResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(full_page)
            .build();
        let screenshot = self.page.execute(params).await.map_err(driver_error)?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(driver_error)
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> PagekitResult<()> {
        let main = self.page.mainframe().await.map_err(driver_error)?;
        let loads = self
            .page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(driver_error)?
            .map(|_| "load");
        let routes = self
            .page
            .event_listener::<EventNavigatedWithinDocument>()
            .await
            .map_err(driver_error)?
            .filter(move |event| {
                futures::future::ready(is_main_frame(main.as_ref(), &event.frame_id))
            })
            .map(|_| "same-document");
        let mut navigations: BoxStream<'static, &'static str> =
            stream::select(loads, routes).boxed();
        match tokio::time::timeout(timeout, navigations.next()).await {
            Ok(Some(kind)) => {
                tracing::debug!(kind, "navigation observed");
                Ok(())
            }
            Ok(None) => Err(PagekitError::driver("page closed while waiting for navigation")),
            Err(_) => Err(PagekitError::timeout(
                "navigation",
                timeout.as_millis() as u64,
            )),
        }
    }
}
