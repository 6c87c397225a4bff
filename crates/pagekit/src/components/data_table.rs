//! Data tables.

use crate::container::{Container, Locatable};
use crate::context::PageContext;
use crate::driver::release_quietly;
use crate::element::Element;
use crate::locator::LocatorError;
use crate::result::PagekitResult;

/// Table XPath, relative to a scope
pub const TABLE_XPATH: &str = "//table";

/// A `<table>` region with 1-based row and column addressing
#[derive(Debug, Clone)]
pub struct DataTable {
    container: Container,
}

impl Locatable for DataTable {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl DataTable {
    /// The page's table
    pub fn new(ctx: PageContext) -> Self {
        Self {
            container: Container::rooted(ctx, TABLE_XPATH),
        }
    }

    /// The table inside `scope`
    pub fn within(scope: &impl Locatable) -> Self {
        let root = format!("{}{TABLE_XPATH}", scope.root().unwrap_or(""));
        Self {
            container: Container::rooted(scope.context().clone(), root),
        }
    }

    /// Rows shown per page
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.context().config().data_table.page_size
    }

    /// Wait for the table to be displayed
    pub async fn wait_until_visible(&self, timeout_ms: u64) -> PagekitResult<()> {
        self.container.wait_until_visible(timeout_ms).await
    }

    /// Body rows currently attached
    pub async fn row_count(&self) -> PagekitResult<usize> {
        let driver = self.context().driver();
        let rows = driver.query_xpath(&self.rows_xpath()).await?;
        for row in &rows {
            release_quietly(driver, row).await;
        }
        Ok(rows.len())
    }

    /// Header labels, left to right
    pub async fn header_texts(&self) -> PagekitResult<Vec<String>> {
        let xpath = format!("{}//thead/tr/th", self.container.self_xpath());
        self.texts(&xpath).await
    }

    /// Cell texts of body row `row`
    pub async fn row_texts(&self, row: u32) -> PagekitResult<Vec<String>> {
        check_index(row)?;
        let xpath = format!("{}[{row}]/td", self.rows_xpath());
        self.texts(&xpath).await
    }

    /// Text of the cell at body row `row`, column `column`
    pub async fn cell_text(&self, row: u32, column: u32) -> PagekitResult<String> {
        check_index(row)?;
        check_index(column)?;
        let xpath = format!("{}[{row}]/td[{column}]", self.rows_xpath());
        let cell = Element::new(self.context().clone(), xpath);
        let text = cell.text().await;
        cell.dispose().await;
        text
    }

    fn rows_xpath(&self) -> String {
        format!("{}//tbody/tr", self.container.self_xpath())
    }

    async fn texts(&self, xpath: &str) -> PagekitResult<Vec<String>> {
        let driver = self.context().driver();
        let mut texts = Vec::new();
        for node in driver.query_xpath(xpath).await? {
            let text = driver.property(&node, "innerText").await;
            release_quietly(driver, &node).await;
            texts.push(text?.as_str().unwrap_or_default().trim().to_string());
        }
        Ok(texts)
    }
}

fn check_index(index: u32) -> PagekitResult<()> {
    if index == 0 {
        return Err(LocatorError::IndexOutOfRange(0).into());
    }
    Ok(())
}
