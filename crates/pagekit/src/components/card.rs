//! Resource cards.
//!
//! Cards are minted from located card roots. Each card keeps the root node
//! it was found with and addresses its children through an indexed XPath
//! (`(<card root>)[i]`), so reads stay inside the card even when many
//! cards share one layout. Searches dispose the cards they do not return.

use crate::container::{Container, Locatable};
use crate::context::PageContext;
use crate::driver::{release_quietly, ClickOptions, NodeRef};
use crate::element::Element;
use crate::locator::xpath_literal;
use crate::result::{PagekitError, PagekitResult};
use crate::wait::{poll_until, wait_for_xpath, wait_while_loading, Visibility};
use std::fmt;
use std::str::FromStr;

/// Root of every workspace card
pub const WORKSPACE_CARD_XPATH: &str = r#"//*[child::*[@data-test-id="workspace-card"]]"#;
/// Predicate of a workspace card's name node
pub const WORKSPACE_NAME_PREDICATE: &str = r#"@data-test-id="workspace-card-name""#;
/// Root of every data resource card
pub const RESOURCE_CARD_XPATH: &str = r#"//*[child::*[@data-test-id="card"]]"#;
/// Predicate of a data resource card's name node
pub const RESOURCE_NAME_PREDICATE: &str = r#"@data-test-id="card-name""#;

/// How long [`WorkspaceCard::find_all`] waits for the first card
pub const WORKSPACE_CARD_WAIT_MS: u64 = 5_000;
/// How long [`DataResourceCard::find_all`] waits for the first card
pub const RESOURCE_CARD_WAIT_MS: u64 = 1_000;

const LAST_CHANGED_PREFIX: &str = "Last Changed: ";

/// Workspace permission shown on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Full control
    Owner,
    /// Read and write
    Writer,
    /// Read only
    Reader,
}

impl AccessLevel {
    /// Label as rendered on the card
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Writer => "WRITER",
            Self::Reader => "READER",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = PagekitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "WRITER" => Ok(Self::Writer),
            "READER" => Ok(Self::Reader),
            other => Err(PagekitError::driver(format!("unknown access level {other:?}"))),
        }
    }
}

/// Kind of a data resource card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    /// Cohort
    Cohort,
    /// Concept set
    ConceptSet,
    /// Notebook
    Notebook,
}

impl CardType {
    /// Label as rendered on the card
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cohort => "Cohort",
            Self::ConceptSet => "Concept Set",
            Self::Notebook => "Notebook",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// XPath of the card under `card_root` whose name node reads `name`
#[must_use]
pub fn named_card_xpath(card_root: &str, name_predicate: &str, name: &str) -> String {
    format!(
        "{card_root}[.//*[{name_predicate} and normalize-space(text())={}]]",
        xpath_literal(name)
    )
}

/// Indexed XPath of the `index`-th (1-based) match of `card_root`
#[must_use]
pub fn nth_card_xpath(card_root: &str, index: usize) -> String {
    format!("({card_root})[{index}]")
}

/// Located card roots, one container per card.
///
/// Polls until at least one card is displayed; nothing displayed within
/// `timeout_ms` is an empty list. The returned nodes are owned by the caller.
async fn locate_cards(
    ctx: &PageContext,
    card_root: &str,
    timeout_ms: u64,
) -> PagekitResult<Vec<(Container, NodeRef)>> {
    let driver = ctx.driver();
    let wait = ctx.timeouts().wait(timeout_ms);
    let description = format!("{card_root} to be visible");
    let polled = poll_until(&description, &wait, || async move {
        let nodes = driver.query_xpath(card_root).await?;
        let mut displayed = false;
        for node in &nodes {
            if matches!(driver.is_displayed(node).await, Ok(true)) {
                displayed = true;
                break;
            }
        }
        if displayed {
            return Ok(Some(nodes));
        }
        for node in &nodes {
            release_quietly(driver, node).await;
        }
        Ok::<_, PagekitError>(None)
    })
    .await;

    let nodes = match polled {
        Ok((nodes, _)) => nodes,
        Err(PagekitError::Timeout { .. }) => {
            tracing::debug!(card_root, "no card displayed");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };
    Ok(nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            let root = nth_card_xpath(card_root, i + 1);
            (Container::rooted(ctx.clone(), root), node)
        })
        .collect())
}

/// Trimmed `innerText` of the first displayed node at `xpath`
async fn read_text(ctx: &PageContext, xpath: String) -> PagekitResult<String> {
    let element = Element::new(ctx.clone(), xpath);
    let text = element.text().await;
    element.dispose().await;
    text
}

/// Whether anything beneath `scope` matches `predicate`, without waiting
async fn has_child(container: &Container, predicate: &str) -> PagekitResult<bool> {
    let driver = container.context().driver();
    let xpath = format!("{}//*[{predicate}]", container.self_xpath());
    let nodes = driver.query_xpath(&xpath).await?;
    let found = !nodes.is_empty();
    for node in &nodes {
        release_quietly(driver, node).await;
    }
    Ok(found)
}

fn name_match(name_predicate: &str, name: &str) -> String {
    format!("{name_predicate} and normalize-space(text())={}", xpath_literal(name))
}

// =============================================================================
// WORKSPACE CARD
// =============================================================================

/// A workspace card on the home and workspace list pages
#[derive(Debug)]
pub struct WorkspaceCard {
    container: Container,
    node: Option<NodeRef>,
}

impl Locatable for WorkspaceCard {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl WorkspaceCard {
    fn new(container: Container, node: Option<NodeRef>) -> Self {
        Self { container, node }
    }

    /// Every displayed workspace card, after the page is done loading.
    ///
    /// Waits up to [`WORKSPACE_CARD_WAIT_MS`] for the first card; no card is
    /// an empty list.
    pub async fn find_all(ctx: &PageContext) -> PagekitResult<Vec<Self>> {
        wait_while_loading(ctx.driver(), None, &ctx.config().loading_options(false)).await?;
        let cards = locate_cards(ctx, WORKSPACE_CARD_XPATH, WORKSPACE_CARD_WAIT_MS).await?;
        tracing::debug!(count = cards.len(), "workspace cards");
        Ok(cards
            .into_iter()
            .map(|(container, node)| Self::new(container, Some(node)))
            .collect())
    }

    /// Workspace cards showing `level`
    pub async fn find_all_with_access_level(
        ctx: &PageContext,
        level: AccessLevel,
    ) -> PagekitResult<Vec<Self>> {
        let mut matching = Vec::new();
        for card in Self::find_all(ctx).await? {
            if card.access_level().await? == level {
                matching.push(card);
            } else {
                card.dispose().await;
            }
        }
        Ok(matching)
    }

    /// The first workspace card on the page
    pub async fn find_any(ctx: &PageContext) -> PagekitResult<Self> {
        let mut cards = Self::find_all(ctx).await?.into_iter();
        let Some(first) = cards.next() else {
            return Err(PagekitError::NotFound {
                xpath: WORKSPACE_CARD_XPATH.to_string(),
                elapsed_ms: WORKSPACE_CARD_WAIT_MS,
            });
        };
        for rest in cards {
            rest.dispose().await;
        }
        Ok(first)
    }

    /// The card named `name`, if one is displayed within `timeout_ms`
    pub async fn find_card(ctx: &PageContext, name: &str, timeout_ms: u64) -> PagekitResult<Option<Self>> {
        let xpath = named_card_xpath(WORKSPACE_CARD_XPATH, WORKSPACE_NAME_PREDICATE, name);
        let wait = ctx.timeouts().wait(timeout_ms);
        match wait_for_xpath(ctx.driver(), &xpath, Visibility::Visible, &wait).await {
            Ok(node) => {
                tracing::info!(name, "found workspace card");
                Ok(Some(Self::new(Container::rooted(ctx.clone(), xpath), node)))
            }
            Err(e) if e.is_absence() => {
                tracing::info!(name, "workspace card not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait until no card named `name` is displayed
    pub async fn wait_until_gone(ctx: &PageContext, name: &str, timeout_ms: u64) -> PagekitResult<()> {
        let xpath = format!(
            "{WORKSPACE_CARD_XPATH}//*[{}]",
            name_match(WORKSPACE_NAME_PREDICATE, name)
        );
        let wait = ctx.timeouts().wait(timeout_ms);
        wait_for_xpath(ctx.driver(), &xpath, Visibility::Hidden, &wait).await?;
        Ok(())
    }

    fn name_xpath(&self) -> String {
        format!("{}//*[{WORKSPACE_NAME_PREDICATE}]", self.container.self_xpath())
    }

    fn access_level_xpath(&self) -> String {
        format!(
            r#"{}//*[@data-test-id="workspace-access-level"]"#,
            self.container.self_xpath()
        )
    }

    /// Workspace name
    pub async fn name(&self) -> PagekitResult<String> {
        read_text(self.context(), self.name_xpath()).await
    }

    /// Access level shown on the card
    pub async fn access_level(&self) -> PagekitResult<AccessLevel> {
        read_text(self.context(), self.access_level_xpath()).await?.parse()
    }

    /// Last-changed timestamp as displayed, without its label
    pub async fn last_changed(&self) -> PagekitResult<String> {
        let xpath = format!("{}/following-sibling::div", self.access_level_xpath());
        let text = read_text(self.context(), xpath).await?;
        Ok(text
            .strip_prefix(LAST_CHANGED_PREFIX)
            .unwrap_or(&text)
            .trim()
            .to_string())
    }

    /// Click the workspace name, optionally waiting for the navigation it
    /// triggers. Returns the name clicked.
    pub async fn click_name(&self, wait_for_nav: bool) -> PagekitResult<String> {
        let ctx = self.context();
        let name = self.name().await?;
        let link = Element::new(ctx.clone(), self.name_xpath());
        let clicked = async {
            if wait_for_nav {
                let navigation = ctx.driver().wait_for_navigation(ctx.timeouts().navigation());
                let click_options = ClickOptions::new();
                futures::try_join!(navigation, link.click(&click_options))?;
            } else {
                link.click(&ClickOptions::new()).await?;
            }
            Ok::<_, PagekitError>(())
        }
        .await;
        link.dispose().await;
        clicked?;
        tracing::info!(name = %name, "clicked workspace name");
        Ok(name)
    }

    /// Release the card's root node
    pub async fn dispose(mut self) {
        if let Some(node) = self.node.take() {
            release_quietly(self.context().driver(), &node).await;
        }
    }
}

// =============================================================================
// DATA RESOURCE CARD
// =============================================================================

/// A cohort, concept set or notebook card on a workspace's data page
#[derive(Debug)]
pub struct DataResourceCard {
    container: Container,
    node: Option<NodeRef>,
}

impl Locatable for DataResourceCard {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl DataResourceCard {
    /// Every displayed resource card; none within
    /// [`RESOURCE_CARD_WAIT_MS`] is an empty list
    pub async fn find_all(ctx: &PageContext) -> PagekitResult<Vec<Self>> {
        let cards = locate_cards(ctx, RESOURCE_CARD_XPATH, RESOURCE_CARD_WAIT_MS).await?;
        Ok(cards
            .into_iter()
            .map(|(container, node)| Self {
                container,
                node: Some(node),
            })
            .collect())
    }

    /// The card named `name`, disposing every card checked along the way
    pub async fn find_card(ctx: &PageContext, name: &str) -> PagekitResult<Option<Self>> {
        let predicate = name_match(RESOURCE_NAME_PREDICATE, name);
        let mut cards = Self::find_all(ctx).await?.into_iter();
        while let Some(card) = cards.next() {
            if has_child(&card.container, &predicate).await? {
                for rest in cards {
                    rest.dispose().await;
                }
                tracing::info!(name, "found resource card");
                return Ok(Some(card));
            }
            card.dispose().await;
        }
        Ok(None)
    }

    /// Resource name
    pub async fn name(&self) -> PagekitResult<String> {
        let xpath = format!("{}//*[{RESOURCE_NAME_PREDICATE}]", self.container.self_xpath());
        read_text(self.context(), xpath).await
    }

    /// Resource type label, e.g. "Concept Set"
    pub async fn card_type(&self) -> PagekitResult<String> {
        let xpath = format!(r#"{}//*[@data-test-id="card-type"]"#, self.container.self_xpath());
        read_text(self.context(), xpath).await
    }

    /// Whether the card is of `kind`
    pub async fn is_type(&self, kind: CardType) -> PagekitResult<bool> {
        Ok(self.card_type().await?.eq_ignore_ascii_case(kind.as_str()))
    }

    /// Release the card's root node
    pub async fn dispose(mut self) {
        if let Some(node) = self.node.take() {
            release_quietly(self.context().driver(), &node).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockNode, MockNodeId};
    use std::sync::Arc;
    use std::time::Duration;

    fn page() -> (Arc<MockDriver>, PageContext) {
        let driver = Arc::new(MockDriver::new());
        (driver.clone(), PageContext::with_defaults(driver))
    }

    /// Registers a workspace card and its children; returns the root and
    /// name nodes
    fn add_workspace_card(
        driver: &MockDriver,
        index: usize,
        name: &str,
        level: &str,
    ) -> (MockNodeId, MockNodeId) {
        let root = nth_card_xpath(WORKSPACE_CARD_XPATH, index);
        let id = driver.add_node(WORKSPACE_CARD_XPATH, MockNode::new("div"));
        driver.alias(&root, id);
        driver.alias(named_card_xpath(WORKSPACE_CARD_XPATH, WORKSPACE_NAME_PREDICATE, name), id);
        let name_node = driver.add_node(
            format!("{root}//*[{WORKSPACE_NAME_PREDICATE}]"),
            MockNode::new("div").with_role("button").with_text(name),
        );
        let access = format!(r#"{root}//*[@data-test-id="workspace-access-level"]"#);
        driver.add_node(&access, MockNode::new("div").with_text(level));
        driver.add_node(
            format!("{access}/following-sibling::div"),
            MockNode::new("div").with_text("Last Changed: 01/08/21, 05:22 PM"),
        );
        (id, name_node)
    }

    mod access_level_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!(" owner ".parse::<AccessLevel>().unwrap(), AccessLevel::Owner);
            assert_eq!("READER".parse::<AccessLevel>().unwrap(), AccessLevel::Reader);
            assert!("ADMIN".parse::<AccessLevel>().is_err());
            assert_eq!(AccessLevel::Writer.to_string(), "WRITER");
        }

        #[test]
        fn test_card_xpaths() {
            assert_eq!(
                named_card_xpath(RESOURCE_CARD_XPATH, RESOURCE_NAME_PREDICATE, "My cohort"),
                r#"//*[child::*[@data-test-id="card"]][.//*[@data-test-id="card-name" and normalize-space(text())="My cohort"]]"#
            );
            assert_eq!(nth_card_xpath("//li", 3), "(//li)[3]");
        }
    }

    mod workspace_card_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_find_all_and_read_fields() {
            let (driver, ctx) = page();
            add_workspace_card(&driver, 1, "Alpha", "OWNER");
            add_workspace_card(&driver, 2, "Beta", "READER");

            let cards = WorkspaceCard::find_all(&ctx).await.unwrap();
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[1].name().await.unwrap(), "Beta");
            assert_eq!(cards[1].access_level().await.unwrap(), AccessLevel::Reader);
            assert_eq!(cards[0].last_changed().await.unwrap(), "01/08/21, 05:22 PM");
        }

        #[tokio::test(start_paused = true)]
        async fn test_filter_by_access_level_disposes_the_rest() {
            let (driver, ctx) = page();
            let (alpha, _) = add_workspace_card(&driver, 1, "Alpha", "OWNER");
            let (beta, _) = add_workspace_card(&driver, 2, "Beta", "WRITER");

            let owned = WorkspaceCard::find_all_with_access_level(&ctx, AccessLevel::Owner)
                .await
                .unwrap();
            assert_eq!(owned.len(), 1);
            assert_eq!(owned[0].name().await.unwrap(), "Alpha");
            assert_eq!(driver.release_count(beta), 1);
            assert_eq!(driver.release_count(alpha), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_cards() {
            let (_driver, ctx) = page();
            assert!(WorkspaceCard::find_all(&ctx).await.unwrap().is_empty());
            let err = WorkspaceCard::find_any(&ctx).await.unwrap_err();
            assert!(matches!(err, PagekitError::NotFound { .. }));
            assert!(WorkspaceCard::find_card(&ctx, "Alpha", 500).await.unwrap().is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_card_and_wait_until_gone() {
            let (driver, ctx) = page();
            add_workspace_card(&driver, 1, "Alpha", "OWNER");
            let gone_xpath = format!(
                "{WORKSPACE_CARD_XPATH}//*[{}]",
                name_match(WORKSPACE_NAME_PREDICATE, "Alpha")
            );
            let name_node = driver.add_node(gone_xpath, MockNode::new("div").with_text("Alpha"));

            let card = WorkspaceCard::find_card(&ctx, "Alpha", 1_000).await.unwrap().unwrap();
            assert!(card.root().unwrap().ends_with(r#"normalize-space(text())="Alpha"]]"#));

            driver.schedule(Duration::from_millis(300), MockEffect::Detach(name_node));
            WorkspaceCard::wait_until_gone(&ctx, "Alpha", 1_000).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_name_waits_for_navigation() {
            let (driver, ctx) = page();
            let (_, name_node) = add_workspace_card(&driver, 1, "Alpha", "OWNER");
            driver.on_click_after(
                name_node,
                Duration::from_millis(50),
                MockEffect::navigate("https://app/workspaces/alpha/data", "Data"),
            );

            let card = WorkspaceCard::find_any(&ctx).await.unwrap();
            let clicked = card.click_name(true).await.unwrap();
            assert_eq!(clicked, "Alpha");
            assert_eq!(driver.click_count(name_node), 1);
            assert_eq!(ctx.current_url().await.unwrap(), "https://app/workspaces/alpha/data");
        }
    }

    mod resource_card_tests {
        use super::*;

        fn add_resource_card(driver: &MockDriver, index: usize, name: &str, kind: CardType) -> MockNodeId {
            let root = nth_card_xpath(RESOURCE_CARD_XPATH, index);
            let id = driver.add_node(RESOURCE_CARD_XPATH, MockNode::new("div"));
            driver.alias(&root, id);
            driver.add_node(
                format!("{root}//*[{RESOURCE_NAME_PREDICATE}]"),
                MockNode::new("div").with_text(name),
            );
            driver.add_node(
                format!("{root}//*[{}]", name_match(RESOURCE_NAME_PREDICATE, name)),
                MockNode::new("div").with_text(name),
            );
            driver.add_node(
                format!(r#"{root}//*[@data-test-id="card-type"]"#),
                MockNode::new("div").with_text(kind.as_str()),
            );
            id
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_card_disposes_non_matching() {
            let (driver, ctx) = page();
            let first = add_resource_card(&driver, 1, "Diabetes cohort", CardType::Cohort);
            let second = add_resource_card(&driver, 2, "Blood pressure", CardType::ConceptSet);
            let third = add_resource_card(&driver, 3, "Analysis", CardType::Notebook);

            let card = DataResourceCard::find_card(&ctx, "Blood pressure").await.unwrap().unwrap();
            assert_eq!(card.name().await.unwrap(), "Blood pressure");
            assert_eq!(card.card_type().await.unwrap(), "Concept Set");
            assert!(card.is_type(CardType::ConceptSet).await.unwrap());
            assert_eq!(driver.release_count(first), 1);
            assert_eq!(driver.release_count(third), 1);
            assert_eq!(driver.release_count(second), 0);

            card.dispose().await;
            assert_eq!(driver.release_count(second), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_card() {
            let (driver, ctx) = page();
            let only = add_resource_card(&driver, 1, "Diabetes cohort", CardType::Cohort);
            assert!(DataResourceCard::find_card(&ctx, "Other").await.unwrap().is_none());
            assert_eq!(driver.release_count(only), 1);
        }
    }
}
