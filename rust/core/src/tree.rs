// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Markup Tree - owned element tree consumed by the loader
//!
//! The loader never looks at raw text. Documents arrive as a [`Node`] tree,
//! either built by the caller's own parser through the builder methods or by
//! [`Node::parse`], which reads XML text with [quick-xml](https://docs.rs/quick-xml).
//! Tags and attribute names are stored without their namespace prefix, so
//! `kml:Placemark` and `Placemark` are the same element.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// One element of a parsed markup document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    /// Create an element with no attributes, children or text
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: append a child element
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append text content
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.text.push_str(text.as_ref());
        self
    }

    /// Local tag name
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The `id` attribute, if any
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Direct children in document order
    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// First direct child with the given tag
    pub fn child(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All elements below this one (excluding itself) with the given tag, in
    /// document order
    pub fn descendants<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        Descendants::new(self).filter(move |node| node.tag == tag)
    }

    /// First element below this one with the given tag
    pub fn first_descendant(&self, tag: &str) -> Option<&Node> {
        Descendants::new(self).find(|node| node.tag == tag)
    }

    /// Text content of this element and everything below it
    pub fn text(&self) -> String {
        let mut out = self.text.clone();
        for node in Descendants::new(self) {
            out.push_str(&node.text);
        }
        out
    }

    /// Trimmed text of the first descendant with the given tag
    pub fn descendant_text(&self, tag: &str) -> Option<String> {
        self.first_descendant(tag)
            .map(|node| node.text().trim().to_string())
    }

    /// Parse XML text into a tree rooted at the document element
    pub fn parse(content: &str) -> Result<Node> {
        // Text is kept untrimmed: a comment or CDATA section inside a text
        // run must not glue the surrounding tokens together
        let mut reader = Reader::from_str(content);

        // Open elements, innermost last
        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        loop {
            let position = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| Error::markup(position, e.to_string()))?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start, position)?);
                }
                Event::Empty(start) => {
                    let node = element_from_start(&start, position)?;
                    attach(&mut stack, &mut root, node, position)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::markup(position, "unexpected closing tag"))?;
                    attach(&mut stack, &mut root, node, position)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::markup(position, e.to_string()))?;
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::markup(content.len(), "unclosed element"));
        }
        root.ok_or_else(|| Error::markup(0, "document has no root element"))
    }
}

fn element_from_start(start: &BytesStart, position: usize) -> Result<Node> {
    let mut node = Node::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| Error::markup(position, e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| Error::markup(position, e.to_string()))?;
        node.attributes.push((
            String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(node)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node, position: usize) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::markup(position, "multiple root elements")),
    }
    Ok(())
}

/// Pre-order walk below a node
struct Descendants<'a> {
    pending: Vec<&'a Node>,
}

impl<'a> Descendants<'a> {
    fn new(node: &'a Node) -> Self {
        Self {
            pending: node.children.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.pending.pop()?;
        self.pending.extend(node.children.iter().rev());
        Some(node)
    }
}
