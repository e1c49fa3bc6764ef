//! Structural element patterns.
//!
//! Supports the subset of CSS selector syntax needed to find code blocks:
//!
//! - type selectors (`code`) and the universal selector (`*`)
//! - class (`.code-block`) and id (`#main`) selectors
//! - attribute selectors: `[attr]`, `[attr=v]`, `[attr*=v]`, `[attr^=v]`,
//!   `[attr$=v]`, `[attr~=v]` with bare or quoted values
//! - the descendant combinator (`pre code`)
//! - selector lists (`code.language-text, pre code`)

use std::fmt;

use crate::document::Document;
use crate::node::{ElementInfo, NodeId};

/// Selector parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// Empty selector or empty entry in a selector list.
    #[error("empty selector at position {0}")]
    Empty(usize),
    /// Character not allowed at this position.
    #[error("unexpected '{ch}' at position {position}")]
    Unexpected {
        /// Offending character.
        ch: char,
        /// Character offset.
        position: usize,
    },
    /// Input ended inside a construct.
    #[error("unexpected end of selector, expected {0}")]
    UnexpectedEnd(&'static str),
}

/// A parsed selector list.
///
/// Two selectors compare equal when their normalized sources are equal.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

/// Compounds joined by descendant combinators, left to right.
#[derive(Debug, Clone)]
struct Complex {
    parts: Vec<Compound>,
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

#[derive(Debug, Clone)]
struct AttributeMatch {
    name: String,
    op: AttributeOp,
}

#[derive(Debug, Clone)]
enum AttributeOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
    Word(String),
}

impl Selector {
    /// Parse a selector list.
    ///
    /// # Example
    ///
    /// ```
    /// use mdr_document::Selector;
    ///
    /// let selector = Selector::parse(r#"code.language-text, code[class*="language-"], pre code"#)?;
    /// assert_eq!(selector.len(), 3);
    /// # Ok::<(), mdr_document::SelectorError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let alternatives = Parser::new(input).parse_list()?;
        Ok(Self {
            source: input.trim().to_owned(),
            alternatives,
        })
    }

    /// Selector matching elements with the given class.
    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        let class = class.into();
        Self {
            source: format!(".{class}"),
            alternatives: vec![Complex {
                parts: vec![Compound {
                    classes: vec![class],
                    ..Compound::default()
                }],
            }],
        }
    }

    /// Selector matching elements carrying the given attribute.
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: format!("[{name}]"),
            alternatives: vec![Complex {
                parts: vec![Compound {
                    attributes: vec![AttributeMatch {
                        name,
                        op: AttributeOp::Exists,
                    }],
                    ..Compound::default()
                }],
            }],
        }
    }

    /// Combine selectors into one list matching any of them.
    #[must_use]
    pub fn any(selectors: impl IntoIterator<Item = Self>) -> Self {
        let mut sources = Vec::new();
        let mut alternatives = Vec::new();
        for selector in selectors {
            sources.push(selector.source);
            alternatives.extend(selector.alternatives);
        }
        Self {
            source: sources.join(", "),
            alternatives,
        }
    }

    /// Number of alternatives in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    /// Whether the list has no alternatives (only possible via [`Selector::any`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Source text of the selector.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches any alternative.
    pub fn matches<D: Document + ?Sized>(&self, document: &D, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(document, node))
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Complex {
    fn matches<D: Document + ?Sized>(&self, document: &D, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(document, node) {
            return false;
        }

        // Descendant combinators only, so the nearest matching ancestor is
        // always the best candidate for each step.
        let mut current = node;
        for compound in ancestors.iter().rev() {
            loop {
                let Some(parent) = document.parent(current) else {
                    return false;
                };
                current = parent;
                if compound.matches(document, current) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    fn matches<D: Document + ?Sized>(&self, document: &D, node: NodeId) -> bool {
        let Some(element) = document.element(node) else {
            return false;
        };
        self.matches_element(&element)
    }

    fn matches_element(&self, element: &ElementInfo) -> bool {
        if let Some(tag) = &self.tag
            && !element.tag.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if !self.ids.iter().all(|id| element.id() == Some(id.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes
            .iter()
            .all(|attr| attr.matches(element.attribute(&attr.name)))
    }
}

impl AttributeMatch {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttributeOp::Exists => true,
            AttributeOp::Equals(expected) => value == expected,
            // Empty operands never match for the substring operators.
            AttributeOp::Contains(needle) => !needle.is_empty() && value.contains(needle.as_str()),
            AttributeOp::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            AttributeOp::Suffix(suffix) => !suffix.is_empty() && value.ends_with(suffix.as_str()),
            AttributeOp::Word(word) => value.split_whitespace().any(|w| w == word),
        }
    }
}

/// Recursive-descent parser over the selector characters.
struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::Unexpected {
                ch,
                position: self.pos,
            },
            None => SelectorError::UnexpectedEnd("selector"),
        }
    }

    fn expect(&mut self, expected: char, what: &'static str) -> Result<(), SelectorError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(SelectorError::Unexpected {
                ch,
                position: self.pos - 1,
            }),
            None => Err(SelectorError::UnexpectedEnd(what)),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
            match self.peek() {
                None => return Ok(alternatives),
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let start = self.pos;
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None | Some(',') => break,
                _ => parts.push(self.parse_compound()?),
            }
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some(_) if had_space => {}
                Some(_) => return Err(self.unexpected()),
            }
        }
        if parts.is_empty() {
            return Err(SelectorError::Empty(start));
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(ch) if is_ident_char(ch) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(ch) => SelectorError::Unexpected {
                    ch,
                    position: self.pos,
                },
                None => SelectorError::UnexpectedEnd("identifier"),
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let operator = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeMatch {
                    name,
                    op: AttributeOp::Exists,
                });
            }
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(op @ ('*' | '^' | '$' | '~')) => {
                self.pos += 1;
                self.expect('=', "'='")?;
                op
            }
            _ => return Err(self.unexpected()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_quoted(quote)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        self.expect(']', "']'")?;

        let op = match operator {
            '*' => AttributeOp::Contains(value),
            '^' => AttributeOp::Prefix(value),
            '$' => AttributeOp::Suffix(value),
            '~' => AttributeOp::Word(value),
            _ => AttributeOp::Equals(value),
        };
        Ok(AttributeMatch { name, op })
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorError::UnexpectedEnd("closing quote")),
                Some(ch) if ch == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(SelectorError::UnexpectedEnd("escaped character")),
                },
                Some(ch) => value.push(ch),
            }
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}
