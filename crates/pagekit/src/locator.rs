//! Locator builder: declarative queries to XPath strings.
//!
//! A [`LocatorQuery`] says *what* to find (a checkbox labelled "Export to
//! notebook", the second dialog button, an icon of shape `ellipsis-vertical`)
//! and [`build`] turns it into an XPath that is evaluated against the live
//! document. Building is a pure function of the query and the optional scope:
//! the same inputs always produce the same string.
//!
//! # Ancestor level
//!
//! Application markup often renders the label and the interactive node as
//! siblings (`<div><span>Label</span><input/></div>`). The ancestor level
//! says how many structural parents to walk up from the node carrying the
//! text before searching downwards for the interactive element:
//!
//! - `0`: the node carrying the text *is* the interactive element
//! - `1`: search below the parent of the text node
//! - `N`: search below the N-th ancestor
//!
//! Levels above [`MAX_ANCESTOR_LEVEL`] are rejected, never clamped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest accepted ancestor level
pub const MAX_ANCESTOR_LEVEL: u32 = 8;

/// Default ancestor level for form fields, whose label is usually a sibling
pub const DEFAULT_FIELD_ANCESTOR_LEVEL: u32 = 1;

/// Contract violations detected while building a locator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// More than one of name / normalize-space / contains-text was supplied
    #[error("exactly one text match is allowed, got: {0}")]
    ConflictingTextMatch(String),

    /// A text-based lookup was requested without any text field
    #[error("{kind} lookup needs one of name, normalize_space or contains_text")]
    MissingTextMatch {
        /// Kind being located
        kind: ElementKind,
    },

    /// Text to match was empty
    #[error("text match must not be empty")]
    EmptyText,

    /// Ancestor level above the supported maximum
    #[error("ancestor level {level} is out of range (max {max})")]
    AncestorLevelOutOfRange {
        /// Requested level
        level: u32,
        /// Supported maximum
        max: u32,
    },

    /// Structural index must be 1-based
    #[error("structural index must be >= 1, got {0}")]
    IndexOutOfRange(u32),

    /// Field is not meaningful for this kind of element
    #[error("field `{field}` is not supported for {kind}")]
    UnsupportedField {
        /// Offending field
        field: &'static str,
        /// Kind being located
        kind: ElementKind,
    },

    /// Element kind was not given
    #[error("element kind is required")]
    MissingKind,

    /// Unknown element kind name
    #[error("unknown element kind `{0}`")]
    UnknownKind(String),
}

/// Kind of element to locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// `<button>` or `role="button"`
    Button,
    /// `<clr-icon>` with a shape
    Icon,
    /// `<input type="checkbox">`
    Checkbox,
    /// `<input type="radio">`
    #[serde(rename = "radio")]
    RadioButton,
    /// `<input type="text">`
    #[serde(rename = "text")]
    Textbox,
    /// `<textarea>`
    Textarea,
    /// `<a>` or `role="link"`
    Link,
    /// Native `<select>`
    Select,
    /// PrimeReact style dropdown
    Dropdown,
}

impl ElementKind {
    /// All kinds, in declaration order
    pub const ALL: [Self; 9] = [
        Self::Button,
        Self::Icon,
        Self::Checkbox,
        Self::RadioButton,
        Self::Textbox,
        Self::Textarea,
        Self::Link,
        Self::Select,
        Self::Dropdown,
    ];

    /// Short name used in configuration and on the command line
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Icon => "icon",
            Self::Checkbox => "checkbox",
            Self::RadioButton => "radio",
            Self::Textbox => "text",
            Self::Textarea => "textarea",
            Self::Link => "link",
            Self::Select => "select",
            Self::Dropdown => "dropdown",
        }
    }

    /// Node test for this kind: tag plus optional extra condition
    const fn shape(&self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Button => ("*", Some(r#"self::button or @role="button""#)),
            Self::Icon => ("clr-icon", None),
            Self::Checkbox => ("input", Some(r#"@type="checkbox""#)),
            Self::RadioButton => ("input", Some(r#"@type="radio""#)),
            Self::Textbox => ("input", Some(r#"@type="text""#)),
            Self::Textarea => ("textarea", None),
            Self::Link => ("*", Some(r#"self::a or @role="link""#)),
            Self::Select => ("select", None),
            Self::Dropdown => (
                "*",
                Some(r#"contains(concat(" ", normalize-space(@class), " "), " p-dropdown ")"#),
            ),
        }
    }

    /// Ancestor level used when a query does not say otherwise
    #[must_use]
    pub const fn default_ancestor_level(&self) -> u32 {
        match self {
            Self::Button | Self::Link | Self::Icon => 0,
            _ => DEFAULT_FIELD_ANCESTOR_LEVEL,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lowered || format!("{k:?}").to_ascii_lowercase() == lowered)
            .ok_or_else(|| LocatorError::UnknownKind(s.to_string()))
    }
}

/// How text is matched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextMatch {
    /// Exact text, aria-label, placeholder or value
    Exact(String),
    /// Whitespace-normalized exact match on the string value
    NormalizeSpace(String),
    /// Substring of text, aria-label, placeholder or value
    Contains(String),
}

impl TextMatch {
    /// Exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Normalized-whitespace match
    #[must_use]
    pub fn normalize_space(text: impl Into<String>) -> Self {
        Self::NormalizeSpace(text.into())
    }

    /// Substring match
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// The text being matched
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Exact(t) | Self::NormalizeSpace(t) | Self::Contains(t) => t,
        }
    }

    /// Predicate matching the label of an element (text or labelling attributes)
    #[must_use]
    pub fn label_predicate(&self) -> String {
        let lit = xpath_literal(self.text());
        match self {
            Self::Exact(_) => format!(
                "text()={lit} or @aria-label={lit} or @placeholder={lit} or @value={lit}"
            ),
            Self::NormalizeSpace(_) => format!("normalize-space()={lit}"),
            Self::Contains(_) => format!(
                "contains(text(),{lit}) or contains(@aria-label,{lit}) \
                 or contains(@placeholder,{lit}) or contains(@value,{lit})"
            ),
        }
    }

    /// Predicate matching only the node's own text
    #[must_use]
    pub fn text_predicate(&self) -> String {
        let lit = xpath_literal(self.text());
        match self {
            Self::Exact(_) => format!("text()={lit}"),
            Self::NormalizeSpace(_) => format!("normalize-space(text())={lit}"),
            Self::Contains(_) => format!("contains(text(),{lit})"),
        }
    }
}

/// Text match plus the ancestor walk from the text node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Labeled {
    /// Text identifying the element
    pub text: TextMatch,
    /// Parents to walk up from the text node
    pub ancestor_level: u32,
}

/// A declarative element query, one variant per element kind.
///
/// Each variant carries only the fields that make sense for that kind, so
/// "exactly one text match" is enforced by construction. [`QueryOptions`]
/// is the loose, deserializable form and is validated on conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocatorQuery {
    /// Button by label
    Button(Labeled),
    /// Link by label
    Link(Labeled),
    /// Checkbox by label
    Checkbox(Labeled),
    /// Radio button by label
    RadioButton(Labeled),
    /// Text input by label
    Textbox(Labeled),
    /// Textarea by label
    Textarea(Labeled),
    /// Native select by label
    Select(Labeled),
    /// Custom dropdown by label
    Dropdown(Labeled),
    /// Icon by shape, optionally next to a label
    Icon {
        /// `shape` attribute of the icon
        shape: String,
        /// Label the icon belongs to
        label: Option<Labeled>,
    },
    /// The N-th element of a kind in document order (1-based), no text
    Nth {
        /// Kind to count
        kind: ElementKind,
        /// 1-based position
        index: u32,
    },
}

impl LocatorQuery {
    fn labeled(kind: ElementKind, text: TextMatch) -> Labeled {
        Labeled {
            text,
            ancestor_level: kind.default_ancestor_level(),
        }
    }

    /// Button query
    #[must_use]
    pub fn button(text: TextMatch) -> Self {
        Self::Button(Self::labeled(ElementKind::Button, text))
    }

    /// Link query
    #[must_use]
    pub fn link(text: TextMatch) -> Self {
        Self::Link(Self::labeled(ElementKind::Link, text))
    }

    /// Checkbox query
    #[must_use]
    pub fn checkbox(text: TextMatch) -> Self {
        Self::Checkbox(Self::labeled(ElementKind::Checkbox, text))
    }

    /// Radio button query
    #[must_use]
    pub fn radio_button(text: TextMatch) -> Self {
        Self::RadioButton(Self::labeled(ElementKind::RadioButton, text))
    }

    /// Textbox query
    #[must_use]
    pub fn textbox(text: TextMatch) -> Self {
        Self::Textbox(Self::labeled(ElementKind::Textbox, text))
    }

    /// Textarea query
    #[must_use]
    pub fn textarea(text: TextMatch) -> Self {
        Self::Textarea(Self::labeled(ElementKind::Textarea, text))
    }

    /// Select query
    #[must_use]
    pub fn select(text: TextMatch) -> Self {
        Self::Select(Self::labeled(ElementKind::Select, text))
    }

    /// Dropdown query
    #[must_use]
    pub fn dropdown(text: TextMatch) -> Self {
        Self::Dropdown(Self::labeled(ElementKind::Dropdown, text))
    }

    /// Icon query by shape alone
    #[must_use]
    pub fn icon(shape: impl Into<String>) -> Self {
        Self::Icon {
            shape: shape.into(),
            label: None,
        }
    }

    /// Icon query next to a label
    #[must_use]
    pub fn icon_labeled(shape: impl Into<String>, text: TextMatch) -> Self {
        Self::Icon {
            shape: shape.into(),
            label: Some(Labeled {
                text,
                ancestor_level: DEFAULT_FIELD_ANCESTOR_LEVEL,
            }),
        }
    }

    /// Structural query: the N-th element of `kind`
    #[must_use]
    pub const fn nth(kind: ElementKind, index: u32) -> Self {
        Self::Nth { kind, index }
    }

    /// Override the ancestor level. No effect on shape-only icons and `Nth`.
    #[must_use]
    pub fn with_ancestor_level(mut self, level: u32) -> Self {
        if let Some(labeled) = self.labeled_mut() {
            labeled.ancestor_level = level;
        }
        self
    }

    /// Kind of element this query locates
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Button(_) => ElementKind::Button,
            Self::Link(_) => ElementKind::Link,
            Self::Checkbox(_) => ElementKind::Checkbox,
            Self::RadioButton(_) => ElementKind::RadioButton,
            Self::Textbox(_) => ElementKind::Textbox,
            Self::Textarea(_) => ElementKind::Textarea,
            Self::Select(_) => ElementKind::Select,
            Self::Dropdown(_) => ElementKind::Dropdown,
            Self::Icon { .. } => ElementKind::Icon,
            Self::Nth { kind, .. } => *kind,
        }
    }

    /// Label part of the query, if any
    #[must_use]
    pub const fn label(&self) -> Option<&Labeled> {
        match self {
            Self::Button(l)
            | Self::Link(l)
            | Self::Checkbox(l)
            | Self::RadioButton(l)
            | Self::Textbox(l)
            | Self::Textarea(l)
            | Self::Select(l)
            | Self::Dropdown(l) => Some(l),
            Self::Icon { label, .. } => label.as_ref(),
            Self::Nth { .. } => None,
        }
    }

    fn labeled_mut(&mut self) -> Option<&mut Labeled> {
        match self {
            Self::Button(l)
            | Self::Link(l)
            | Self::Checkbox(l)
            | Self::RadioButton(l)
            | Self::Textbox(l)
            | Self::Textarea(l)
            | Self::Select(l)
            | Self::Dropdown(l) => Some(l),
            Self::Icon { label, .. } => label.as_mut(),
            Self::Nth { .. } => None,
        }
    }

    /// Build the XPath for this query (see [`build`])
    pub fn to_xpath(&self, scope: Option<&str>) -> Result<String, LocatorError> {
        build(self, scope)
    }
}

/// Loose query options, the shape used in config files and on the CLI.
///
/// Converting into a [`LocatorQuery`] rejects contradictory combinations
/// instead of silently preferring one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Element kind
    #[serde(rename = "type")]
    pub kind: Option<ElementKind>,
    /// Exact name
    pub name: Option<String>,
    /// Normalized-whitespace name
    pub normalize_space: Option<String>,
    /// Substring of the name
    pub contains_text: Option<String>,
    /// Ancestor walk from the text node
    pub ancestor_level: Option<u32>,
    /// Icon shape
    pub icon_shape: Option<String>,
    /// 1-based structural index (no text)
    pub index: Option<u32>,
}

impl QueryOptions {
    fn text_match(&self) -> Result<Option<TextMatch>, LocatorError> {
        let supplied: Vec<(&str, TextMatch)> = [
            ("name", self.name.clone().map(TextMatch::Exact)),
            (
                "normalize_space",
                self.normalize_space.clone().map(TextMatch::NormalizeSpace),
            ),
            (
                "contains_text",
                self.contains_text.clone().map(TextMatch::Contains),
            ),
        ]
        .into_iter()
        .filter_map(|(field, m)| m.map(|m| (field, m)))
        .collect();

        match supplied.len() {
            0 => Ok(None),
            1 => Ok(supplied.into_iter().next().map(|(_, m)| m)),
            _ => Err(LocatorError::ConflictingTextMatch(
                supplied
                    .iter()
                    .map(|(field, _)| *field)
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }
}

impl TryFrom<QueryOptions> for LocatorQuery {
    type Error = LocatorError;

    fn try_from(opts: QueryOptions) -> Result<Self, Self::Error> {
        let kind = opts.kind.ok_or(LocatorError::MissingKind)?;
        let text = opts.text_match()?;

        if opts.icon_shape.is_some() && kind != ElementKind::Icon {
            return Err(LocatorError::UnsupportedField {
                field: "icon_shape",
                kind,
            });
        }

        if let Some(index) = opts.index {
            if text.is_some() {
                return Err(LocatorError::UnsupportedField {
                    field: "index",
                    kind,
                });
            }
            if opts.ancestor_level.is_some() {
                return Err(LocatorError::UnsupportedField {
                    field: "ancestor_level",
                    kind,
                });
            }
            return Ok(Self::nth(kind, index));
        }

        let query = match (kind, text) {
            (ElementKind::Icon, text) => {
                let shape = opts.icon_shape.ok_or(LocatorError::UnsupportedField {
                    field: "icon without icon_shape",
                    kind,
                })?;
                match text {
                    Some(text) => Self::icon_labeled(shape, text),
                    None => Self::icon(shape),
                }
            }
            (kind, None) => return Err(LocatorError::MissingTextMatch { kind }),
            (ElementKind::Button, Some(t)) => Self::button(t),
            (ElementKind::Link, Some(t)) => Self::link(t),
            (ElementKind::Checkbox, Some(t)) => Self::checkbox(t),
            (ElementKind::RadioButton, Some(t)) => Self::radio_button(t),
            (ElementKind::Textbox, Some(t)) => Self::textbox(t),
            (ElementKind::Textarea, Some(t)) => Self::textarea(t),
            (ElementKind::Select, Some(t)) => Self::select(t),
            (ElementKind::Dropdown, Some(t)) => Self::dropdown(t),
        };

        Ok(match opts.ancestor_level {
            Some(level) => query.with_ancestor_level(level),
            None => query,
        })
    }
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath 1.0 has no escape sequences, so text containing both quote
/// characters is assembled with `concat()`.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts: Vec<String> = text
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

/// XPath matching any node under `scope` whose own text matches
#[must_use]
pub fn text_xpath(scope: Option<&str>, text: &TextMatch) -> String {
    format!("{}//*[{}]", scope.unwrap_or(""), text.text_predicate())
}

/// Build the XPath for `query`, optionally scoped beneath `scope`.
///
/// Pure: no hidden state, same inputs give the same string. The result
/// selects zero or more nodes in document order.
pub fn build(query: &LocatorQuery, scope: Option<&str>) -> Result<String, LocatorError> {
    let scope = scope.unwrap_or("");
    let kind = query.kind();

    if let LocatorQuery::Nth { index, .. } = query {
        if *index == 0 {
            return Err(LocatorError::IndexOutOfRange(0));
        }
        return Ok(format!("({scope}//{})[{index}]", node_test(query, None)));
    }

    let Some(labeled) = query.label() else {
        // shape-only icon
        return Ok(format!("{scope}//{}", node_test(query, None)));
    };

    if labeled.text.text().is_empty() {
        return Err(LocatorError::EmptyText);
    }
    if labeled.ancestor_level > MAX_ANCESTOR_LEVEL {
        return Err(LocatorError::AncestorLevelOutOfRange {
            level: labeled.ancestor_level,
            max: MAX_ANCESTOR_LEVEL,
        });
    }

    let label = labeled.text.label_predicate();
    let xpath = match labeled.ancestor_level {
        0 => format!("{scope}//{}", node_test(query, Some(&label))),
        level => format!(
            "{scope}//*[{label}]/ancestor::node()[{level}]//{}",
            node_test(query, None)
        ),
    };
    tracing::trace!(%kind, %xpath, "built locator");
    Ok(xpath)
}

fn node_test(query: &LocatorQuery, label: Option<&str>) -> String {
    let (tag, condition) = query.kind().shape();
    let shape_condition = match query {
        LocatorQuery::Icon { shape, .. } => Some(format!("@shape={}", xpath_literal(shape))),
        _ => condition.map(ToString::to_string),
    };
    match (shape_condition, label) {
        (None, None) => tag.to_string(),
        (Some(c), None) => format!("{tag}[{c}]"),
        (None, Some(l)) => format!("{tag}[{l}]"),
        (Some(c), Some(l)) => format!("{tag}[({c}) and ({l})]"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_exact_label_predicate() {
            assert_eq!(
                TextMatch::exact("Save").label_predicate(),
                r#"text()="Save" or @aria-label="Save" or @placeholder="Save" or @value="Save""#
            );
        }

        #[test]
        fn test_normalize_space_predicate() {
            assert_eq!(
                TextMatch::normalize_space("Create Workspace").label_predicate(),
                r#"normalize-space()="Create Workspace""#
            );
            assert_eq!(
                TextMatch::normalize_space("Done").text_predicate(),
                r#"normalize-space(text())="Done""#
            );
        }

        #[test]
        fn test_literal_quoting() {
            assert_eq!(xpath_literal("plain"), r#""plain""#);
            assert_eq!(xpath_literal(r#"say "hi""#), r#"'say "hi"'"#);
            assert_eq!(
                xpath_literal(r#"it's "x""#),
                r#"concat("it's ", '"', "x", '"', "")"#
            );
        }
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_button_by_normalized_label() {
            let q = LocatorQuery::button(TextMatch::normalize_space("Save"));
            assert_eq!(
                build(&q, None).unwrap(),
                r#"//*[(self::button or @role="button") and (normalize-space()="Save")]"#
            );
        }

        #[test]
        fn test_checkbox_defaults_to_parent() {
            let q = LocatorQuery::checkbox(TextMatch::exact("Export to notebook"));
            assert_eq!(
                build(&q, None).unwrap(),
                "//*[text()=\"Export to notebook\" or @aria-label=\"Export to notebook\" \
                 or @placeholder=\"Export to notebook\" or @value=\"Export to notebook\"]\
                 /ancestor::node()[1]//input[@type=\"checkbox\"]"
            );
        }

        #[test]
        fn test_scope_prefix() {
            let q = LocatorQuery::textarea(TextMatch::contains("Description"));
            let xpath = build(&q, Some(r#"//*[@role="dialog"]"#)).unwrap();
            assert!(xpath.starts_with(r#"//*[@role="dialog"]//*[contains(text(),"Description")"#));
            assert!(xpath.ends_with("/ancestor::node()[1]//textarea"));
        }

        #[test]
        fn test_icon_shape_only() {
            let q = LocatorQuery::icon("ellipsis-vertical");
            assert_eq!(
                build(&q, Some("//div")).unwrap(),
                r#"//div//clr-icon[@shape="ellipsis-vertical"]"#
            );
        }

        #[test]
        fn test_icon_next_to_label() {
            let q = LocatorQuery::icon_labeled("info-standard", TextMatch::exact("Name"));
            assert!(build(&q, None)
                .unwrap()
                .ends_with(r#"/ancestor::node()[1]//clr-icon[@shape="info-standard"]"#));
        }

        #[test]
        fn test_nth_is_structural() {
            let q = LocatorQuery::nth(ElementKind::Checkbox, 2);
            assert_eq!(
                build(&q, Some("//table")).unwrap(),
                r#"(//table//input[@type="checkbox"])[2]"#
            );
            assert_eq!(
                build(&LocatorQuery::nth(ElementKind::Link, 0), None),
                Err(LocatorError::IndexOutOfRange(0))
            );
        }

        #[test]
        fn test_empty_text_rejected() {
            let q = LocatorQuery::button(TextMatch::exact(""));
            assert_eq!(build(&q, None), Err(LocatorError::EmptyText));
        }

        #[test]
        fn test_ancestor_level_out_of_range() {
            let q = LocatorQuery::checkbox(TextMatch::exact("A"))
                .with_ancestor_level(MAX_ANCESTOR_LEVEL + 1);
            assert_eq!(
                build(&q, None),
                Err(LocatorError::AncestorLevelOutOfRange {
                    level: MAX_ANCESTOR_LEVEL + 1,
                    max: MAX_ANCESTOR_LEVEL,
                })
            );
            let q = LocatorQuery::checkbox(TextMatch::exact("A"))
                .with_ancestor_level(MAX_ANCESTOR_LEVEL);
            assert!(build(&q, None).is_ok());
        }
    }

    mod evaluation_tests {
        use super::*;
        use sxd_document::parser;
        use sxd_xpath::{evaluate_xpath, Value};

        const FIXTURE: &str = r#"<html><body>
            <section id="section">
                <div id="row">
                    <span id="label">Label</span>
                    <button id="sibling">Go</button>
                </div>
                <div id="other-row">
                    <button id="cousin">Other</button>
                </div>
            </section>
            <button id="outside">Outside</button>
            <form id="form">
                <div id="field">
                    <span>Show all</span>
                    <input id="show-all" type="checkbox"/>
                </div>
                <input id="unrelated" type="checkbox"/>
            </form>
        </body></html>"#;

        /// `id`s of the elements `xpath` selects in the fixture, in document order
        fn select(xpath: &str) -> Vec<String> {
            let package = parser::parse(FIXTURE).unwrap();
            let document = package.as_document();
            match evaluate_xpath(&document, xpath).unwrap() {
                Value::Nodeset(nodes) => nodes
                    .document_order()
                    .into_iter()
                    .filter_map(|node| node.element())
                    .map(|el| el.attribute_value("id").unwrap_or_default().to_string())
                    .collect(),
                other => panic!("{xpath} is not a node set: {other:?}"),
            }
        }

        fn button_at(level: u32) -> String {
            build(
                &LocatorQuery::button(TextMatch::exact("Label")).with_ancestor_level(level),
                None,
            )
            .unwrap()
        }

        #[test]
        fn test_ancestor_levels_resolve_distinct_nodes() {
            // the text node itself is no button
            assert!(select(&button_at(0)).is_empty());
            // parent: the sibling button
            assert_eq!(select(&button_at(1)), ["sibling"]);
            // grandparent: every button in the section, nothing outside it
            assert_eq!(select(&button_at(2)), ["sibling", "cousin"]);
        }

        #[test]
        fn test_button_text_matches_itself_at_level_zero() {
            let xpath = build(&LocatorQuery::button(TextMatch::exact("Outside")), None).unwrap();
            assert_eq!(select(&xpath), ["outside"]);
        }

        #[test]
        fn test_checkbox_label_finds_its_sibling_input() {
            let xpath = build(&LocatorQuery::checkbox(TextMatch::exact("Show all")), None).unwrap();
            assert_eq!(select(&xpath), ["show-all"]);
        }

        #[test]
        fn test_scope_restricts_where_the_label_is_found() {
            let scoped = |scope: &str| {
                build(
                    &LocatorQuery::button(TextMatch::exact("Label")).with_ancestor_level(1),
                    Some(scope),
                )
                .unwrap()
            };
            assert_eq!(select(&scoped(r#"//div[@id="row"]"#)), ["sibling"]);
            assert!(select(&scoped(r#"//div[@id="other-row"]"#)).is_empty());
        }
    }

    mod query_options_tests {
        use super::*;

        #[test]
        fn test_two_text_fields_rejected() {
            let opts = QueryOptions {
                kind: Some(ElementKind::Button),
                name: Some("Save".into()),
                contains_text: Some("Sa".into()),
                ..Default::default()
            };
            assert_eq!(
                LocatorQuery::try_from(opts),
                Err(LocatorError::ConflictingTextMatch(
                    "name, contains_text".into()
                ))
            );
        }

        #[test]
        fn test_all_three_text_fields_rejected() {
            let opts = QueryOptions {
                kind: Some(ElementKind::Checkbox),
                name: Some("a".into()),
                normalize_space: Some("b".into()),
                contains_text: Some("c".into()),
                ..Default::default()
            };
            assert!(matches!(
                LocatorQuery::try_from(opts),
                Err(LocatorError::ConflictingTextMatch(_))
            ));
        }

        #[test]
        fn test_missing_text_rejected() {
            let opts = QueryOptions {
                kind: Some(ElementKind::Textbox),
                ..Default::default()
            };
            assert_eq!(
                LocatorQuery::try_from(opts),
                Err(LocatorError::MissingTextMatch {
                    kind: ElementKind::Textbox
                })
            );
        }

        #[test]
        fn test_missing_kind_rejected() {
            assert_eq!(
                LocatorQuery::try_from(QueryOptions::default()),
                Err(LocatorError::MissingKind)
            );
        }

        #[test]
        fn test_icon_shape_only_for_icons() {
            let opts = QueryOptions {
                kind: Some(ElementKind::Button),
                name: Some("Go".into()),
                icon_shape: Some("x".into()),
                ..Default::default()
            };
            assert!(matches!(
                LocatorQuery::try_from(opts),
                Err(LocatorError::UnsupportedField {
                    field: "icon_shape",
                    ..
                })
            ));
        }

        #[test]
        fn test_structural_index_without_text() {
            let opts = QueryOptions {
                kind: Some(ElementKind::RadioButton),
                index: Some(3),
                ..Default::default()
            };
            assert_eq!(
                LocatorQuery::try_from(opts).unwrap(),
                LocatorQuery::nth(ElementKind::RadioButton, 3)
            );
        }

        #[test]
        fn test_ancestor_level_applied() {
            let opts = QueryOptions {
                kind: Some(ElementKind::RadioButton),
                name: Some("Python".into()),
                ancestor_level: Some(0),
                ..Default::default()
            };
            let q = LocatorQuery::try_from(opts).unwrap();
            assert_eq!(q.label().unwrap().ancestor_level, 0);
        }

        #[test]
        fn test_deserialize_from_json() {
            let opts: QueryOptions = serde_json::from_str(
                r#"{"type": "checkbox", "name": "Export to notebook", "ancestor_level": 2}"#,
            )
            .unwrap();
            assert_eq!(opts.kind, Some(ElementKind::Checkbox));
            let q = LocatorQuery::try_from(opts).unwrap();
            assert_eq!(q.kind(), ElementKind::Checkbox);
        }

        #[test]
        fn test_kind_from_str() {
            assert_eq!("radio".parse::<ElementKind>().unwrap(), ElementKind::RadioButton);
            assert_eq!(
                "RadioButton".parse::<ElementKind>().unwrap(),
                ElementKind::RadioButton
            );
            assert_eq!("text".parse::<ElementKind>().unwrap(), ElementKind::Textbox);
            assert!("slider".parse::<ElementKind>().is_err());
        }
    }

    fn text_match_strategy() -> impl Strategy<Value = TextMatch> {
        prop_oneof![
            "[a-zA-Z0-9 '\"]{1,24}".prop_map(TextMatch::Exact),
            "[a-zA-Z0-9 '\"]{1,24}".prop_map(TextMatch::NormalizeSpace),
            "[a-zA-Z0-9 '\"]{1,24}".prop_map(TextMatch::Contains),
        ]
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(
            text in text_match_strategy(),
            level in 0u32..=MAX_ANCESTOR_LEVEL,
            kind_idx in 0usize..ElementKind::ALL.len(),
            scope in proptest::option::of("//[a-z]{1,8}"),
        ) {
            let query = match ElementKind::ALL[kind_idx] {
                ElementKind::Icon => LocatorQuery::icon_labeled("cog", text),
                ElementKind::Button => LocatorQuery::button(text),
                ElementKind::Link => LocatorQuery::link(text),
                ElementKind::Checkbox => LocatorQuery::checkbox(text),
                ElementKind::RadioButton => LocatorQuery::radio_button(text),
                ElementKind::Textbox => LocatorQuery::textbox(text),
                ElementKind::Textarea => LocatorQuery::textarea(text),
                ElementKind::Select => LocatorQuery::select(text),
                ElementKind::Dropdown => LocatorQuery::dropdown(text),
            }
            .with_ancestor_level(level);

            let first = build(&query, scope.as_deref()).unwrap();
            let second = build(&query.clone(), scope.as_deref()).unwrap();
            prop_assert_eq!(&first, &second);
            if let Some(scope) = scope {
                prop_assert!(first.starts_with(&scope));
            }
        }
    }
}
