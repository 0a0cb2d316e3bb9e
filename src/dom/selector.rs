//! Structural match patterns.
//!
//! Catalog entries are CSS selectors. Hosts backed by a real browser hand
//! [`Selector::as_str`] to their native `querySelectorAll`; the bundled
//! [`Document`](super::Document) evaluates the parsed form itself.
//!
//! Supported grammar:
//!
//! | Construct | Example |
//! |-----------|---------|
//! | Type / universal | `input`, `*` |
//! | Id / class | `#chat-input`, `.upload-btn` |
//! | Attribute presence | `[contenteditable]` |
//! | Attribute operators | `=`, `~=`, `\|=`, `^=`, `$=`, `*=` |
//! | Case flag | `[class*="upload" i]` |
//! | Combinators | descendant (space), child (`>`) |
//! | Selector lists | `textarea, [role="textbox"]` |
//!
//! # Example
//!
//! ```ignore
//! use ask_screenshot::Selector;
//!
//! let selector = Selector::parse(r#"button[title*="upload" i]"#)?;
//! assert_eq!(selector.as_str(), r#"button[title*="upload" i]"#);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// ElementTree
// ============================================================================

/// Read access to one light tree, as needed by selector matching.
///
/// `parent_element` must stop at the tree root: combinators never cross
/// shadow or frame boundaries.
pub trait ElementTree {
    /// Lowercase tag name of the element.
    fn tag(&self, element: NodeId) -> Option<&str>;

    /// Attribute value by lowercase name.
    fn attr(&self, element: NodeId, name: &str) -> Option<&str>;

    /// Parent element within the same tree.
    fn parent_element(&self, element: NodeId) -> Option<NodeId>;
}

// ============================================================================
// Selector
// ============================================================================

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parses a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] for empty input, unsupported
    /// pseudo-classes or malformed attribute blocks.
    pub fn parse(source: &str) -> Result<Self> {
        let alternatives = Parser::new(source).parse_list()?;
        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    /// Returns the selector text as written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `element` matches any alternative.
    #[must_use]
    pub fn matches<T: ElementTree + ?Sized>(&self, tree: &T, element: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(tree, element))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Selector {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Selector AST
// ============================================================================

/// Compounds joined by combinators, left to right.
///
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// Lowercase tag; `None` for `*` or an omitted type.
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    test: Option<(AttrOp, String)>,
    ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

// ============================================================================
// Matching
// ============================================================================

impl Complex {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, element: NodeId) -> bool {
        self.match_from(tree, element, self.compounds.len() - 1)
    }

    fn match_from<T: ElementTree + ?Sized>(&self, tree: &T, element: NodeId, idx: usize) -> bool {
        if !self.compounds[idx].matches(tree, element) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent_element(element)
                .is_some_and(|parent| self.match_from(tree, parent, idx - 1)),
            Combinator::Descendant => {
                let mut current = tree.parent_element(element);
                while let Some(ancestor) = current {
                    if self.match_from(tree, ancestor, idx - 1) {
                        return true;
                    }
                    current = tree.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, element: NodeId) -> bool {
        let Some(tag) = tree.tag(element) else {
            return false;
        };

        if let Some(expected) = &self.tag
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }

        if let Some(id) = &self.id
            && tree.attr(element, "id") != Some(id.as_str())
        {
            return false;
        }

        if !self.classes.is_empty() {
            let class_attr = tree.attr(element, "class").unwrap_or_default();
            let has_all = self
                .classes
                .iter()
                .all(|class| class_attr.split_ascii_whitespace().any(|c| c == class));
            if !has_all {
                return false;
            }
        }

        self.attributes
            .iter()
            .all(|attribute| attribute.matches(tree, element))
    }
}

impl AttributeSelector {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, element: NodeId) -> bool {
        let Some(actual) = tree.attr(element, &self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };

        let (actual, expected) = if self.ignore_case {
            (actual.to_ascii_lowercase(), expected.to_ascii_lowercase())
        } else {
            (actual.to_string(), expected.clone())
        };

        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty() && actual.split_ascii_whitespace().any(|w| w == expected)
            }
            AttrOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_selector(self.source, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skips whitespace, returning whether any was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.bump() {
                None => return Ok(list),
                Some(',') => continue,
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut consumed = false;

        if self.eat('*') {
            consumed = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            consumed = true;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
            consumed = true;
        }

        if consumed {
            Ok(compound)
        } else {
            Err(self.error("expected a selector"))
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        if self.eat(']') {
            return Ok(AttributeSelector {
                name,
                test: None,
                ignore_case: false,
            });
        }

        let op = match self.bump() {
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) if self.eat('=') => match c {
                '~' => AttrOp::Includes,
                '|' => AttrOp::DashMatch,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Substring,
            },
            Some(c) => return Err(self.error(format!("unexpected '{c}' in attribute"))),
            None => return Err(self.error("unterminated attribute")),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_quoted(quote)?
            }
            Some(_) => self.parse_ident()?,
            None => return Err(self.error("unterminated attribute")),
        };

        self.skip_ws();
        let ignore_case = match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                true
            }
            Some('s' | 'S') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        self.skip_ws();
        if !self.eat(']') {
            return Err(self.error("unterminated attribute"));
        }

        Ok(AttributeSelector {
            name,
            test: Some((op, value)),
            ignore_case,
        })
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    /// Flat test tree: (tag, parent, attributes).
    struct Tree {
        nodes: Vec<(&'static str, Option<usize>, FxHashMap<&'static str, &'static str>)>,
    }

    impl Tree {
        fn new() -> Self {
            Self { nodes: Vec::new() }
        }

        fn add(
            &mut self,
            tag: &'static str,
            parent: Option<usize>,
            attrs: &[(&'static str, &'static str)],
        ) -> NodeId {
            self.nodes
                .push((tag, parent, attrs.iter().copied().collect()));
            NodeId::new(self.nodes.len() - 1)
        }
    }

    impl ElementTree for Tree {
        fn tag(&self, element: NodeId) -> Option<&str> {
            self.nodes.get(element.index()).map(|n| n.0)
        }

        fn attr(&self, element: NodeId, name: &str) -> Option<&str> {
            self.nodes
                .get(element.index())
                .and_then(|n| n.2.get(name).copied())
        }

        fn parent_element(&self, element: NodeId) -> Option<NodeId> {
            self.nodes
                .get(element.index())
                .and_then(|n| n.1)
                .map(NodeId::new)
        }
    }

    fn matches(selector: &str, tree: &Tree, node: NodeId) -> bool {
        Selector::parse(selector).unwrap().matches(tree, node)
    }

    #[test]
    fn test_type_and_attribute() {
        let mut tree = Tree::new();
        let input = tree.add("input", None, &[("type", "file")]);
        let text = tree.add("input", None, &[("type", "text")]);

        assert!(matches(r#"input[type="file"]"#, &tree, input));
        assert!(!matches(r#"input[type="file"]"#, &tree, text));
        assert!(matches("INPUT", &tree, text));
    }

    #[test]
    fn test_substring_case_flag() {
        let mut tree = Tree::new();
        let button = tree.add("div", None, &[("class", "Chat-Upload-Button")]);

        assert!(!matches(r#"[class*="upload"]"#, &tree, button));
        assert!(matches(r#"[class*="upload" i]"#, &tree, button));
    }

    #[test]
    fn test_unicode_attribute_value() {
        let mut tree = Tree::new();
        let button = tree.add("button", None, &[("title", "上传文件")]);
        assert!(matches(r#"button[title*="上传"]"#, &tree, button));
    }

    #[test]
    fn test_id_and_class() {
        let mut tree = Tree::new();
        let node = tree.add("textarea", None, &[("id", "chat-input"), ("class", "a b")]);

        assert!(matches("textarea#chat-input", &tree, node));
        assert!(matches(".a.b", &tree, node));
        assert!(!matches(".a.c", &tree, node));
    }

    #[test]
    fn test_prefix_suffix_dash_includes() {
        let mut tree = Tree::new();
        let node = tree.add(
            "div",
            None,
            &[("data-testid", "upload-area"), ("lang", "en-US"), ("rel", "a b")],
        );

        assert!(matches(r#"[data-testid^="upload"]"#, &tree, node));
        assert!(matches(r#"[data-testid$="area"]"#, &tree, node));
        assert!(matches(r#"[lang|="en"]"#, &tree, node));
        assert!(matches(r#"[rel~="b"]"#, &tree, node));
        assert!(!matches(r#"[data-testid^=""]"#, &tree, node));
    }

    #[test]
    fn test_combinators() {
        let mut tree = Tree::new();
        let form = tree.add("form", None, &[("class", "composer")]);
        let wrapper = tree.add("div", Some(form.index()), &[]);
        let area = tree.add("textarea", Some(wrapper.index()), &[]);

        assert!(matches(".composer textarea", &tree, area));
        assert!(matches("div > textarea", &tree, area));
        assert!(!matches(".composer > textarea", &tree, area));
    }

    #[test]
    fn test_selector_list() {
        let mut tree = Tree::new();
        let node = tree.add("div", None, &[("role", "textbox")]);
        assert!(matches(r#"textarea, [role="textbox"]"#, &tree, node));
    }

    #[test]
    fn test_presence_and_universal() {
        let mut tree = Tree::new();
        let node = tree.add("div", None, &[("contenteditable", "true")]);
        assert!(matches("[contenteditable]", &tree, node));
        assert!(matches("*", &tree, node));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "[class*=", "div:hover", r#"[a="x"#, "a >", "[=x]", "a,"] {
            let err = Selector::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidSelector { .. }), "{bad}");
        }
    }

    #[test]
    fn test_as_str_round_trips_source() {
        let selector: Selector = " input[type=file] ".parse().unwrap();
        assert_eq!(selector.as_str(), "input[type=file]");
        assert_eq!(selector.to_string(), "input[type=file]");
    }
}
