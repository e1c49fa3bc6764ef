//! Node identity and element descriptions.

use std::collections::BTreeMap;
use std::fmt;

/// Opaque identity of a node within a [`Document`](crate::Document).
///
/// Ids are never reused by a document, so an id that refers to a removed node
/// stays dangling instead of silently pointing at a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node id from its raw value.
    ///
    /// Intended for [`Document`](crate::Document) implementations.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inline `display` state of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// No inline override (`display: ''`).
    #[default]
    Default,
    /// Forced visible (`display: block`).
    Block,
    /// Suppressed (`display: none`).
    None,
}

impl DisplayMode {
    /// Whether an element with this mode is shown.
    #[must_use]
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::None)
    }

    /// CSS value of the inline override.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Block => "block",
            Self::None => "none",
        }
    }
}

/// Snapshot of an element's tag and attributes.
///
/// Classes live in the `class` attribute, exactly as in markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    /// All attributes, including `id`, `class` and `style`.
    pub attributes: BTreeMap<String, String>,
}

impl ElementInfo {
    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Element id, if set.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Iterate over the whitespace-separated classes.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or_default().split_whitespace()
    }

    /// Whether the element carries the given class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Description of an element to create.
///
/// # Example
///
/// ```
/// use mdr_document::ElementSpec;
///
/// let spec = ElementSpec::new("div")
///     .with_class("mermaid")
///     .with_id("mermaid-1")
///     .with_text("graph TD\nA-->B");
/// assert_eq!(spec.info().tag, "div");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    info: ElementInfo,
    text: Option<String>,
}

impl ElementSpec {
    /// Start describing an element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            info: ElementInfo {
                tag: tag.into().to_ascii_lowercase(),
                attributes: BTreeMap::new(),
            },
            text: None,
        }
    }

    /// Set the element id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attribute("id", id)
    }

    /// Add a class (appended to any existing classes).
    #[must_use]
    pub fn with_class(mut self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref();
        self.info
            .attributes
            .entry("class".to_owned())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(class);
            })
            .or_insert_with(|| class.to_owned());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the inline style declaration.
    #[must_use]
    pub fn with_style(self, style: impl Into<String>) -> Self {
        self.with_attribute("style", style)
    }

    /// Give the element a single text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Tag and attributes of the element to create.
    #[must_use]
    pub fn info(&self) -> &ElementInfo {
        &self.info
    }

    /// Text child of the element to create.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Split into tag/attributes and optional text child.
    #[must_use]
    pub fn into_parts(self) -> (ElementInfo, Option<String>) {
        (self.info, self.text)
    }
}
