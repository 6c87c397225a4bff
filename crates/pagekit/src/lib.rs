//! Pagekit: page objects for browser end-to-end suites
//!
//! Pagekit models a web application as page objects, containers and typed
//! element wrappers, all located by XPath and driven through a narrow
//! browser capability trait. Every wait is bounded, and failures leave a
//! screenshot and an HTML snapshot behind.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PAGEKIT Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Container  │    │ Element    │            │
//! │   │ objects    │───►│ + locator  │───►│ wrappers   │            │
//! │   │ components │    │ builder    │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │                   │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐            │
//! │   │ Scenario   │    │ Failure    │    │ PageDriver │            │
//! │   │ runner     │───►│ capture    │───►│ chromium / │            │
//! │   │            │    │            │    │ mock       │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pagekit::{ClickButtonOptions, Container, FrameworkConfig, MockDriver, PageContext};
//! use std::sync::Arc;
//!
//! # async fn run() -> pagekit::PagekitResult<()> {
//! let ctx = PageContext::new(Arc::new(MockDriver::new()), FrameworkConfig::default());
//! let page = Container::new(ctx, None);
//! page.click_button("Create Workspace", ClickButtonOptions::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod result;

/// XPath locator builder
pub mod locator;

/// Browser capability trait and the scripted mock driver
pub mod driver;

/// Bounded polling waits
pub mod wait;

/// Layered framework configuration
pub mod config;

/// Tracing subscriber setup
pub mod logging;

mod context;

/// Element handles and typed wrappers
pub mod element;

mod container;

/// Screenshot and HTML capture on failure
pub mod diagnostics;

mod harness;

mod page_object;

/// Reusable application components: cards, modals, sidebars and tables
pub mod components;

/// Chromium DevTools driver
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod browser;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::{
    DataTableConfig, DiagnosticsConfig, FrameworkConfig, LoadingConfig, RetryPolicy,
    RunnerConfig, SessionConfig, TimeoutConfig,
};
pub use container::{ClickButtonOptions, Container, Locatable, DOCUMENT_XPATH};
pub use context::PageContext;
pub use diagnostics::{DiagnosticsArtifact, FailureCapture};
pub use driver::{ClickOptions, MockDriver, MouseButton, NodeRef, PageDriver};
pub use element::{
    Button, Checkbox, Dropdown, Editable, Element, ElementWrapper, Icon, Link, LocateOptions,
    PostClick, RadioButton, Select, Textarea, Textbox,
};
pub use harness::{ScenarioResult, ScenarioRunner, SuiteResults};
pub use locator::{build, xpath_literal, ElementKind, LocatorError, LocatorQuery, TextMatch};
pub use page_object::{url_path, PageObject, UrlMatcher};
pub use result::{PagekitError, PagekitResult};
pub use wait::{
    poll_until, wait_for_fn, wait_for_node, wait_for_script, wait_for_text, wait_for_xpath,
    wait_while_loading, LoadingOptions, Visibility, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::components::{
        DataResourceCard, DataTable, Dialog, GenomicExtractionsSidebar, Modal, ReactModal,
        Sidebar, WorkspaceCard,
    };
    pub use super::element::*;
    pub use super::locator::{LocatorQuery, TextMatch};
    pub use super::{
        ClickButtonOptions, Container, FrameworkConfig, Locatable, PageContext, PageDriver,
        PageObject, PagekitError, PagekitResult, ScenarioRunner, UrlMatcher,
    };
}
