//! Modal dialogs.
//!
//! Two flavours share one behaviour set through [`Dialog`]: [`Modal`] for
//! any `role="dialog"` region and [`ReactModal`] for dialogs rendered into
//! the application's portal root, addressed by portal index.

use crate::container::{ClickButtonOptions, Container, Locatable};
use crate::context::PageContext;
use crate::diagnostics::FailureCapture;
use crate::driver::release_quietly;
use crate::result::{PagekitError, PagekitResult};
use crate::wait::wait_for_node;
use async_trait::async_trait;

/// Root of a plain dialog
pub const DIALOG_XPATH: &str = r#"//*[@role="dialog"]"#;

/// Root of the `index`-th (1-based) open portal dialog
#[must_use]
pub fn react_modal_xpath(index: u32) -> String {
    format!(
        r#"//*[@id="popup-root"]/*[@class="ReactModalPortal"][{index}]//*[@role="dialog" and @aria-modal="true" and contains(@class, "after-open")]"#
    )
}

/// Text blocks of a dialog: divs with own text that are not buttons
#[must_use]
pub fn text_lines_xpath(root: &str) -> String {
    format!(r#"{root}//div[normalize-space(text()) and not(@role="button")]"#)
}

/// Shared behaviour of modal dialogs
#[async_trait]
pub trait Dialog: Locatable {
    /// Time allowed for the dialog to show up
    fn load_timeout_ms(&self) -> u64 {
        self.context().timeouts().visible_ms
    }

    /// Wait until the dialog is displayed and done loading.
    ///
    /// On failure the page is captured under its title and the error is
    /// returned with the title in its description.
    async fn wait_for_load(&self) -> PagekitResult<()> {
        let ctx = self.context();
        let timeout_ms = self.load_timeout_ms();
        let Err(e) = self.container().wait_until_visible(timeout_ms).await else {
            tracing::info!(root = self.container().self_xpath(), "modal loaded");
            return Ok(());
        };

        let title = ctx.title().await.unwrap_or_default();
        tracing::error!(title = %title, error = %e, "modal did not load");
        FailureCapture::new(ctx.config().diagnostics.clone())
            .capture(ctx.driver(), &title)
            .await;
        if e.is_absence() {
            Err(PagekitError::timeout(
                format!("{title:?} modal to load ({e})"),
                timeout_ms,
            ))
        } else {
            Err(e)
        }
    }

    /// Rendered text of the whole dialog
    async fn content(&self) -> PagekitResult<String> {
        self.container().text_content().await
    }

    /// Trimmed text of each text block, in document order
    async fn text_lines(&self) -> PagekitResult<Vec<String>> {
        let ctx = self.context();
        let xpath = text_lines_xpath(self.container().self_xpath());
        let wait = ctx.timeouts().default_wait();
        let first = wait_for_node(ctx.driver(), &xpath, true, &wait).await?;
        release_quietly(ctx.driver(), &first).await;

        let mut lines = Vec::new();
        for node in ctx.driver().query_xpath(&xpath).await? {
            let text = ctx.driver().property(&node, "innerText").await;
            release_quietly(ctx.driver(), &node).await;
            lines.push(text?.as_str().unwrap_or_default().trim().to_string());
        }
        Ok(lines)
    }

    /// First text block, usually the heading
    async fn title(&self) -> PagekitResult<String> {
        Ok(self.text_lines().await?.into_iter().next().unwrap_or_default())
    }

    /// Whether the dialog is attached right now
    async fn exists(&self) -> PagekitResult<bool> {
        self.container().exists().await
    }

    /// Click a dialog button, optionally waiting for the dialog to close
    async fn click_button(&self, label: &str, wait_for_close: bool) -> PagekitResult<()> {
        let mut options = ClickButtonOptions::new().without_loading_spinner();
        if wait_for_close {
            options = options.wait_for_close();
        }
        self.container().click_button(label, options).await
    }

    /// Wait until the dialog is gone
    async fn wait_until_closed(&self) -> PagekitResult<()> {
        let timeout_ms = self.context().timeouts().close_ms;
        self.container().wait_until_closed(timeout_ms).await
    }
}

/// A `role="dialog"` region
#[derive(Debug, Clone)]
pub struct Modal {
    container: Container,
}

impl Modal {
    /// The page's dialog
    pub fn new(ctx: PageContext) -> Self {
        Self::rooted(ctx, DIALOG_XPATH)
    }

    /// A dialog at a custom root
    pub fn rooted(ctx: PageContext, root: impl Into<String>) -> Self {
        Self {
            container: Container::rooted(ctx, root),
        }
    }
}

impl Locatable for Modal {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl Dialog for Modal {}

/// A dialog rendered into the portal root
#[derive(Debug, Clone)]
pub struct ReactModal {
    container: Container,
    index: u32,
}

impl ReactModal {
    /// The first open portal dialog
    pub fn new(ctx: PageContext) -> Self {
        Self::at_index(ctx, 1)
    }

    /// The `index`-th open portal dialog (1-based; 0 is treated as 1)
    pub fn at_index(ctx: PageContext, index: u32) -> Self {
        let index = index.max(1);
        Self {
            container: Container::rooted(ctx, react_modal_xpath(index)),
            index,
        }
    }

    /// Portal index
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl Locatable for ReactModal {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl Dialog for ReactModal {
    fn load_timeout_ms(&self) -> u64 {
        self.context().timeouts().default_ms
    }
}
