//! HTML fragment parser.
//!
//! A small, forgiving tree builder for the markup shapes chat pages are made
//! of: nested elements, void elements, comments, raw-text elements, and
//! declarative shadow roots (`<template shadowrootmode="open">`). Text content
//! is discarded; the engine only looks at structure and attributes.
//!
//! Unclosed elements are closed at the end of input and stray end tags are
//! ignored, as a browser would. Only truly unterminated constructs (comments,
//! quoted attribute values, raw-text bodies) are errors.

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Elements that never have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose body is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

// ============================================================================
// MarkupElement
// ============================================================================

/// A parsed element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order, lowercase names, entity-decoded values.
    pub attributes: Vec<(String, String)>,
    /// Light-DOM children.
    pub children: Vec<MarkupElement>,
    /// Children of a declarative shadow root, if one was declared.
    pub shadow_root: Option<Vec<MarkupElement>>,
}

impl MarkupElement {
    /// Attribute value by lowercase name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an HTML fragment into top-level elements.
///
/// # Errors
///
/// [`Error::Markup`] for unterminated comments, attribute values and
/// raw-text bodies.
pub fn parse_fragment(input: &str) -> Result<Vec<MarkupElement>> {
    TreeBuilder::new(input).run()
}

struct Open {
    element: MarkupElement,
    declares_shadow: bool,
}

struct TreeBuilder<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<Open>,
    output: Vec<MarkupElement>,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            output: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn run(mut self) -> Result<Vec<MarkupElement>> {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or_else(|| Error::markup(self.pos, "unterminated comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos += rest.find('>').map_or(rest.len(), |end| end + 1);
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest.starts_with('<')
                && rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic)
            {
                self.start_tag()?;
            } else {
                // Text: skip to the next tag opener.
                let first = rest.chars().next().map_or(1, char::len_utf8);
                self.pos += rest[first..]
                    .find('<')
                    .map_or(rest.len(), |next| next + first);
            }
        }

        while !self.stack.is_empty() {
            self.close_top();
        }
        Ok(self.output)
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':')
        {
            self.pos += 1;
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn end_tag(&mut self) {
        self.pos += 2;
        let name = self.read_name();
        let rest = self.rest();
        self.pos += rest.find('>').map_or(rest.len(), |end| end + 1);

        let Some(depth) = self.stack.iter().rposition(|open| open.element.tag == name) else {
            return;
        };
        while self.stack.len() > depth {
            self.close_top();
        }
    }

    fn start_tag(&mut self) -> Result<()> {
        let tag_start = self.pos;
        self.pos += 1;
        let tag = self.read_name();
        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(Error::markup(tag_start, format!("unterminated <{tag}>"))),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.peek() == Some(b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let (name, value) = self.attribute()?;
                    if !name.is_empty() && !attributes.iter().any(|(n, _)| *n == name) {
                        attributes.push((name, value));
                    }
                }
            }
        }

        let declares_shadow = tag == "template"
            && attributes
                .iter()
                .any(|(n, v)| n == "shadowrootmode" && v.eq_ignore_ascii_case("open"));
        if declares_shadow && self.stack.is_empty() {
            return Err(Error::markup(tag_start, "shadow root template needs a host"));
        }

        let element = MarkupElement {
            tag: tag.clone(),
            attributes,
            ..MarkupElement::default()
        };

        if VOID_ELEMENTS.contains(&tag.as_str()) || (self_closing && !declares_shadow) {
            self.append(element);
            return Ok(());
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let closing = format!("</{tag}");
            let end = self
                .rest()
                .to_ascii_lowercase()
                .find(&closing)
                .ok_or_else(|| Error::markup(tag_start, format!("unterminated <{tag}> body")))?;
            self.pos += end;
            let rest = self.rest();
            self.pos += rest.find('>').map_or(rest.len(), |e| e + 1);
            self.append(element);
            return Ok(());
        }

        self.stack.push(Open {
            element,
            declares_shadow,
        });
        Ok(())
    }

    fn attribute(&mut self) -> Result<(String, String)> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        let name = self.input[start..self.pos].to_ascii_lowercase();
        if name.is_empty() {
            // A lone '=' or similar: skip one byte to guarantee progress.
            self.pos += 1;
            return Ok((name, String::new()));
        }

        self.skip_ws();
        if self.peek() != Some(b'=') {
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_ws();

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let end = self.input[value_start..]
                    .find(quote as char)
                    .ok_or_else(|| Error::markup(start, format!("unterminated value for {name}")))?;
                self.pos = value_start + end + 1;
                &self.input[value_start..value_start + end]
            }
            _ => {
                let value_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                &self.input[value_start..self.pos]
            }
        };

        Ok((name, decode_entities(value)))
    }

    fn append(&mut self, element: MarkupElement) {
        match self.stack.last_mut() {
            Some(parent) => parent.element.children.push(element),
            None => self.output.push(element),
        }
    }

    /// Pops the innermost open element into its parent.
    ///
    /// A shadow template always has a host below it; `start_tag` rejects
    /// top-level ones.
    fn close_top(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };

        match self.stack.last_mut() {
            Some(host) if open.declares_shadow => host
                .element
                .shadow_root
                .get_or_insert_with(Vec::new)
                .extend(open.element.children),
            _ => self.append(open.element),
        }
    }
}

/// Decodes the handful of entities that appear in attribute values.
fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_and_text() {
        let nodes = parse_fragment("<div class=\"a\">hello <span>x</span></div><p>tail</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].tag, "div");
        assert_eq!(nodes[0].attribute("class"), Some("a"));
        assert_eq!(nodes[0].children[0].tag, "span");
        assert_eq!(nodes[1].tag, "p");
    }

    #[test]
    fn test_attribute_forms() {
        let nodes = parse_fragment(r#"<input type=file hidden data-x='1' ID="Dup" id="second">"#).unwrap();
        let input = &nodes[0];
        assert_eq!(input.attribute("type"), Some("file"));
        assert_eq!(input.attribute("hidden"), Some(""));
        assert_eq!(input.attribute("data-x"), Some("1"));
        assert_eq!(input.attribute("id"), Some("Dup"));
        assert!(input.children.is_empty());
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let nodes = parse_fragment("<label><input type=file><span>Upload</span></label>").unwrap();
        let label = &nodes[0];
        assert_eq!(label.children.len(), 2);
        assert_eq!(label.children[1].tag, "span");
    }

    #[test]
    fn test_declarative_shadow_root() {
        let nodes = parse_fragment(
            r#"<chat-box><template shadowrootmode="open"><button class="attach"></button></template><p></p></chat-box>"#,
        )
        .unwrap();
        let host = &nodes[0];
        let shadow = host.shadow_root.as_ref().unwrap();
        assert_eq!(shadow[0].tag, "button");
        assert_eq!(host.children.len(), 1);
        assert_eq!(host.children[0].tag, "p");
    }

    #[test]
    fn test_raw_text_body_is_skipped() {
        let nodes = parse_fragment("<textarea><div>not a tag</div></textarea><b></b>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn test_comments_doctype_and_stray_end_tags() {
        let nodes = parse_fragment("<!doctype html><!-- <input> --></span><i></i>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].tag, "i");
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let nodes = parse_fragment("<div><section><input>").unwrap();
        assert_eq!(nodes[0].children[0].children[0].tag, "input");
    }

    #[test]
    fn test_entities_in_srcdoc() {
        let nodes = parse_fragment(r#"<iframe srcdoc="&lt;input type=&quot;file&quot;&gt;"></iframe>"#).unwrap();
        assert_eq!(nodes[0].attribute("srcdoc"), Some(r#"<input type="file">"#));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_fragment("<!-- open"), Err(Error::Markup { .. })));
        assert!(matches!(parse_fragment(r#"<a href="x>"#), Err(Error::Markup { .. })));
        assert!(matches!(parse_fragment("<style>body{}"), Err(Error::Markup { .. })));
        assert!(matches!(
            parse_fragment(r#"<template shadowrootmode="open"></template>"#),
            Err(Error::Markup { .. })
        ));
    }
}
