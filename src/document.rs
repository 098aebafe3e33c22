//! Owned SVG document tree.
//!
//! The recolorer needs to rewrite attributes and detach subtrees in place, so
//! source markup is parsed once with `roxmltree` into a small owned tree of
//! [`Element`]s and serialized back out with [`Document::to_svg_string`].
//! Comments, processing instructions and blank text are dropped on parse.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Errors produced while loading an SVG document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0} is not an SVG file")]
    NotSvg(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed SVG markup: {0}")]
    Xml(#[from] roxmltree::Error),
}

// ============================================================================
// ViewBox
// ============================================================================

/// The `viewBox` rectangle of an SVG root, in user units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parses `"min-x min-y width height"`, separated by spaces and/or commas.
    pub fn parse(value: &str) -> Option<Self> {
        let numbers: Vec<f64> = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;

        match numbers.as_slice() {
            [x, y, width, height] => Some(Self::new(*x, *y, *width, *height)),
            _ => None,
        }
    }
}

// ============================================================================
// Node / Element
// ============================================================================

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An SVG element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Qualified tag name, e.g. `path` or `sodipodi:namedview`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// The `fill` attribute, if present.
    pub fn fill(&self) -> Option<&str> {
        self.attr("fill")
    }

    /// The `class` attribute, if present.
    pub fn class(&self) -> Option<&str> {
        self.attr("class")
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Iterates over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Iterates over this element and all its descendants in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Finds the first element (in document order) whose class is `class`.
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.descendants().find(|e| e.class() == Some(class))
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape(value, true));
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(out),
                Node::Text(text) => out.push_str(&escape(text, false)),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// Pre-order iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.child_elements().collect::<Vec<_>>().into_iter().rev());
        Some(element)
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Document
// ============================================================================

/// A parsed SVG document.
///
/// # Example
///
/// ```
/// use artwork_recolor::Document;
///
/// let doc = Document::parse(r##"<svg xmlns="http://www.w3.org/2000/svg"><rect fill="#fff"/></svg>"##).unwrap();
/// assert_eq!(doc.root().child_elements().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wraps an existing root element.
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parses SVG markup. DTDs are accepted since design tools emit them.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)?;
        Ok(Self {
            root: convert_element(xml.root_element()),
        })
    }

    /// Reads and parses an `.svg` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("svg") {
            return Err(DocumentError::NotSvg(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// The root `viewBox`, or `None` if it is missing or malformed.
    pub fn view_box(&self) -> Option<ViewBox> {
        self.root.attr("viewBox").and_then(ViewBox::parse)
    }

    /// Serializes the tree back to markup (no XML declaration).
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.root.write_to(&mut out);
        out
    }
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = Element::new(qualified_name(node, node.tag_name().namespace(), node.tag_name().name()));

    let parent_namespaces: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    for ns in node.namespaces() {
        if ns.uri() == XML_NAMESPACE || parent_namespaces.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        element.attributes.push((key, ns.uri().to_string()));
    }

    for attr in node.attributes() {
        let key = qualified_name(node, attr.namespace(), attr.name());
        element.attributes.push((key, attr.value().to_string()));
    }

    for child in node.children() {
        if child.is_element() {
            element.children.push(Node::Element(convert_element(child)));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            if !text.trim().is_empty() {
                element.children.push(Node::Text(text.to_string()));
            }
        }
    }

    element
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NAMESPACE) => format!("xml:{}", local),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
