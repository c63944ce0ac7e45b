//! Parser for YIN, the XML serialization of YANG (RFC 7950, section 13).
//!
//! This crate turns a YIN document into an owned [`Element`] tree with
//! namespaces resolved and byte spans attached, and makes no attempt to
//! understand YANG semantics. Statement-level interpretation is the job of
//! the `yang-compiler` crate, which consumes elements destructively via
//! [`Element::take_children`].
//!
//! XML well-formedness and namespace handling are delegated to `roxmltree`;
//! the tree built here is owned and mutable so the compiler can move
//! subtrees around (extension instances keep their YIN subtree verbatim).

use std::fmt;

/// The XML namespace of YIN elements.
pub const YIN_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:yin:1";

/// A half-open byte range into the source document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An XML attribute with its namespace resolved.
///
/// YIN argument attributes (`name`, `value`, `date`, …) carry no namespace;
/// namespaced attributes only occur inside extension instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

/// An element of a YIN document.
///
/// `text` is the concatenation of the element's direct text children, kept
/// verbatim; YIN wraps human-readable arguments in `<text>`/`<value>`
/// subelements whose content is significant including whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub span: Span,
}

impl Element {
    /// Whether this element is in the YIN namespace.
    pub fn is_yin(&self) -> bool {
        self.namespace.as_deref() == Some(YIN_NAMESPACE)
    }

    /// Looks up an un-namespaced attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Looks up an attribute by name and namespace.
    pub fn attribute_ns(&self, name: &str, namespace: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the first YIN-namespace child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is_yin() && c.name == name)
    }

    /// Iterates over YIN-namespace children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |c| c.is_yin() && c.name == name)
    }

    /// Takes ownership of all children, leaving the element childless.
    ///
    /// The statement reader consumes elements this way so extension
    /// instances can keep their subtrees without cloning.
    pub fn take_children(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.children)
    }
}

/// A lexical or well-formedness error in the input document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed XML at byte {offset}: {message}")]
pub struct Error {
    pub message: String,
    pub offset: usize,
}

/// Parses a YIN document into its root element.
///
/// The root element is returned as-is; checking that it actually is a
/// `module` or `submodule` in the YIN namespace is left to the caller.
pub fn parse(text: &str) -> Result<Element, Error> {
    let doc = roxmltree::Document::parse(text).map_err(|e| Error {
        message: e.to_string(),
        offset: byte_offset(text, e.pos()),
    })?;
    Ok(convert(doc.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut attributes = Vec::new();
    for attr in node.attributes() {
        attributes.push(Attribute {
            name: attr.name().to_owned(),
            namespace: attr.namespace().map(str::to_owned),
            value: attr.value().to_owned(),
        });
    }
    let mut children = Vec::new();
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert(child));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }
    let range = node.range();
    Element {
        name: tag.name().to_owned(),
        namespace: tag.namespace().map(str::to_owned),
        attributes,
        children,
        text: if text.is_empty() { None } else { Some(text) },
        span: Span {
            start: range.start,
            end: range.end,
        },
    }
}

/// Converts a row/column position into a byte offset.
fn byte_offset(text: &str, pos: roxmltree::TextPos) -> usize {
    let mut row = 1u32;
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        if row == pos.row {
            let col = (pos.col as usize).saturating_sub(1);
            return offset
                + line
                    .char_indices()
                    .nth(col)
                    .map(|(i, _)| i)
                    .unwrap_or(line.len());
        }
        row += 1;
        offset += line.len();
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_module_skeleton() {
        let root = parse(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
               </module>"#,
        )
        .unwrap();
        assert!(root.is_yin());
        assert_eq!(root.name, "module");
        assert_eq!(root.attribute("name"), Some("m"));
        assert_eq!(root.child("namespace").unwrap().attribute("uri"), Some("urn:m"));
        assert_eq!(root.child("prefix").unwrap().attribute("value"), Some("m"));
        assert!(root.child("import").is_none());
    }

    #[test]
    fn text_arguments_are_verbatim() {
        let root = parse(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <description><text>two
lines</text></description>
               </module>"#,
        )
        .unwrap();
        let text = root
            .child("description")
            .unwrap()
            .child("text")
            .unwrap()
            .text
            .clone();
        assert_eq!(text.as_deref(), Some("two\nlines"));
    }

    #[test]
    fn foreign_namespace_children_are_kept() {
        let root = parse(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1"
                       xmlns:md="urn:example:meta">
                 <md:annotation name="x"><md:detail/></md:annotation>
               </module>"#,
        )
        .unwrap();
        let ann = &root.children[0];
        assert!(!ann.is_yin());
        assert_eq!(ann.namespace.as_deref(), Some("urn:example:meta"));
        assert_eq!(ann.name, "annotation");
        assert_eq!(ann.children.len(), 1);
    }

    #[test]
    fn spans_point_into_the_source() {
        let src = r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1"><container name="c"/></module>"#;
        let root = parse(src).unwrap();
        let container = &root.children[0];
        assert!(src[container.span.start..].starts_with("<container"));
    }

    #[test]
    fn malformed_input_reports_an_offset() {
        let err = parse("<module name=\"m\"><unclosed></module>").unwrap_err();
        assert!(err.offset > 0);
        assert!(err.to_string().contains("malformed XML"));
    }

    #[test]
    fn take_children_empties_the_element() {
        let mut root = parse(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <container name="a"/>
                 <container name="b"/>
               </module>"#,
        )
        .unwrap();
        let children = root.take_children();
        assert_eq!(children.len(), 2);
        assert!(root.children.is_empty());
    }
}
