//! Help sidebar panels.
//!
//! Every panel opens from an icon in the sidebar's icon strip and renders
//! into the same content root. [`Sidebar`] carries the shared open/close
//! behaviour; panel types such as [`GenomicExtractionsSidebar`] compose it.

use super::DataTable;
use crate::container::{Container, Locatable};
use crate::context::PageContext;
use crate::driver::{release_quietly, ClickOptions};
use crate::element::{Element, ElementWrapper};
use crate::locator::xpath_literal;
use crate::result::{PagekitError, PagekitResult};
use crate::wait::{wait_for_node, wait_while_loading};

/// Content root of the open panel
pub const SIDEBAR_XPATH: &str = r#"//*[@id="help-sidebar"]//*[@data-test-id="sidebar-content"]"#;

/// Icon strip the panels are opened from
pub const SIDEBAR_ICONS_XPATH: &str = r#"//*[@id="help-sidebar"]//*[@data-test-id="sidebar-icons"]"#;

/// Spinner shown next to a running extraction
pub const EXTRACTION_SPINNER_XPATH: &str =
    r#"//*[@data-test-id="extraction-status-icon-container"]/*[@data-icon="sync-alt"]"#;

/// Shape of the panel's close icon
pub const CLOSE_ICON_SHAPE: &str = "times";

/// Icon in the icon strip labelled `label`
#[must_use]
pub fn sidebar_icon_xpath(label: &str) -> String {
    format!(
        "{SIDEBAR_ICONS_XPATH}//*[@role=\"button\" and @aria-label={}]",
        xpath_literal(label)
    )
}

/// One help sidebar panel
#[derive(Debug, Clone)]
pub struct Sidebar {
    container: Container,
    icon_label: String,
    heading: String,
}

impl Locatable for Sidebar {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl Sidebar {
    /// Panel opened by the icon labelled `icon_label`, showing `heading`
    pub fn new(ctx: PageContext, icon_label: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            container: Container::rooted(ctx, SIDEBAR_XPATH),
            icon_label: icon_label.into(),
            heading: heading.into(),
        }
    }

    /// Icon label
    #[must_use]
    pub fn icon_label(&self) -> &str {
        &self.icon_label
    }

    /// Heading the open panel displays
    #[must_use]
    pub fn heading(&self) -> &str {
        &self.heading
    }

    fn heading_xpath(&self) -> String {
        format!(
            "{SIDEBAR_XPATH}//h3[normalize-space(text())={}]",
            xpath_literal(&self.heading)
        )
    }

    /// Whether the panel is displayed, probing briefly
    pub async fn is_open(&self) -> bool {
        self.container.is_visible(self.context().timeouts().probe_ms).await
    }

    /// Open the panel; nothing happens when it is already open
    pub async fn open(&self) -> PagekitResult<()> {
        if self.is_open().await {
            return Ok(());
        }
        let ctx = self.context();
        let icon = Element::new(ctx.clone(), sidebar_icon_xpath(&self.icon_label));
        let clicked = icon.click(&ClickOptions::new()).await;
        icon.dispose().await;
        clicked?;

        let timeout_ms = ctx.timeouts().visible_ms;
        self.container.wait_until_visible(timeout_ms).await?;
        let wait = ctx.timeouts().wait(timeout_ms);
        for xpath in [self.heading_xpath(), format!(r#"{SIDEBAR_XPATH}//*[@role="button"]"#)] {
            let node = wait_for_node(ctx.driver(), &xpath, true, &wait).await?;
            release_quietly(ctx.driver(), &node).await;
        }
        tracing::info!(panel = %self.heading, "opened sidebar");
        Ok(())
    }

    /// Panel heading as displayed
    pub async fn title(&self) -> PagekitResult<String> {
        let heading = Element::new(self.context().clone(), format!("{SIDEBAR_XPATH}//h3"));
        let text = heading.text().await;
        heading.dispose().await;
        text
    }

    /// Close the panel and wait until it is gone
    pub async fn close(&self) -> PagekitResult<()> {
        let icon = self.container.find_icon(CLOSE_ICON_SHAPE)?;
        let clicked = icon.click().await;
        icon.dispose().await;
        clicked?;
        self.container.wait_until_closed(self.context().timeouts().close_ms).await?;
        tracing::info!(panel = %self.heading, "closed sidebar");
        Ok(())
    }
}

/// History of genomic extraction jobs
#[derive(Debug, Clone)]
pub struct GenomicExtractionsSidebar {
    sidebar: Sidebar,
}

impl Locatable for GenomicExtractionsSidebar {
    fn container(&self) -> &Container {
        self.sidebar.container()
    }
}

impl GenomicExtractionsSidebar {
    /// Icon label of the panel
    pub const ICON_LABEL: &'static str = "Genomic Extractions History";
    /// Heading of the open panel
    pub const HEADING: &'static str = "Genomic Extractions";

    /// The panel on `ctx`'s page
    pub fn new(ctx: PageContext) -> Self {
        Self {
            sidebar: Sidebar::new(ctx, Self::ICON_LABEL, Self::HEADING),
        }
    }

    /// Shared panel behaviour
    #[must_use]
    pub const fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    /// Open the panel
    pub async fn open(&self) -> PagekitResult<()> {
        self.sidebar.open().await
    }

    /// Close the panel
    pub async fn close(&self) -> PagekitResult<()> {
        self.sidebar.close().await
    }

    /// Table of extraction jobs
    #[must_use]
    pub fn history_table(&self) -> DataTable {
        DataTable::within(self)
    }

    /// Whether an extraction spinner shows up within `timeout_ms`
    pub async fn is_in_progress(&self, timeout_ms: u64) -> bool {
        let ctx = self.context();
        let wait = ctx.timeouts().wait(timeout_ms);
        match wait_for_node(ctx.driver(), EXTRACTION_SPINNER_XPATH, true, &wait).await {
            Ok(node) => {
                release_quietly(ctx.driver(), &node).await;
                true
            }
            Err(_) => false,
        }
    }

    /// Open the panel and wait for an extraction to finish.
    ///
    /// The completion icon and the end of loading (runtime spinner
    /// included) are awaited together, each bounded by `timeout_ms`. The
    /// panel is closed whatever the outcome. Returns whether the
    /// extraction completed in time.
    pub async fn wait_for_completion_and_close(&self, timeout_ms: u64) -> PagekitResult<bool> {
        self.open().await?;
        let ctx = self.context();
        let table = self.history_table();
        let completed = async {
            table.wait_until_visible(ctx.timeouts().visible_ms).await?;
            let done_icon = format!(
                r#"{}//*[@data-icon="check-circle" and @role="img"]"#,
                table.container().self_xpath()
            );
            let wait = ctx.timeouts().wait(timeout_ms);
            let loading = ctx.config().loading_options(true).with_timeout(timeout_ms);
            let (node, _) = futures::try_join!(
                wait_for_node(ctx.driver(), &done_icon, true, &wait),
                wait_while_loading(ctx.driver(), None, &loading),
            )?;
            release_quietly(ctx.driver(), &node).await;
            Ok::<_, PagekitError>(())
        }
        .await;

        if let Err(e) = &completed {
            tracing::warn!(error = %e, "extraction did not complete");
        }
        self.close().await?;
        Ok(completed.is_ok())
    }
}
