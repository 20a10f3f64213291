//! Library-neutral XML element tree.
//!
//! Everything downstream of the wire (fault rendering, key-reference rewriting,
//! pre-approval extraction) works on [`XmlNode`] rather than on parser events,
//! so the parser can change without touching those transformations.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XmlError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Qualified tag as written on the wire (`prefix:local` or `local`).
    pub tag: String,
    /// Attributes in document order, namespace declarations included.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: Option<String>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing value with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Attributes that carry data, i.e. everything except `xmlns` declarations.
    pub fn data_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(key, _)| !is_namespace_declaration(key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn has_data_attributes(&self) -> bool {
        self.data_attributes().next().is_some()
    }

    /// First direct child whose local name matches.
    pub fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children
            .iter()
            .find(|child| child.local_name() == local)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children
            .iter()
            .filter(move |child| child.local_name() == local)
    }

    /// Follows a chain of direct children by local name.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Depth-first, document-order search below this node.
    pub fn descendant(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find_map(|child| {
            if child.local_name() == local {
                Some(child)
            } else {
                child.descendant(local)
            }
        })
    }

    pub fn descendant_mut(&mut self, local: &str) -> Option<&mut XmlNode> {
        let index = self.children.iter().position(|child| {
            child.local_name() == local || child.descendant(local).is_some()
        })?;
        let child = &mut self.children[index];
        if child.local_name() == local {
            Some(child)
        } else {
            child.descendant_mut(local)
        }
    }

    /// Detaches and returns the first direct child with the given local name.
    pub fn remove_child(&mut self, local: &str) -> Option<XmlNode> {
        let index = self
            .children
            .iter()
            .position(|child| child.local_name() == local)?;
        Some(self.children.remove(index))
    }

    /// Serializes the subtree back to markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        let text = self.text.as_deref().unwrap_or_default();
        if text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        out.push_str(&escape(text));
        for child in &self.children {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl std::fmt::Display for XmlNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

pub fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map(|(_, local)| local)
        .unwrap_or(qualified)
}

pub fn is_namespace_declaration(attribute: &str) -> bool {
    attribute == "xmlns" || attribute.starts_with("xmlns:")
}

/// Parses a complete document and returns its root element.
///
/// Whitespace-only text is dropped; text and CDATA inside an element are
/// concatenated into [`XmlNode::text`].
pub fn parse_document(input: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event().map_err(|error| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message: error.to_string(),
        })?;

        match event {
            Event::Start(start) => stack.push(element_from_start(&start, &reader)?),
            Event::Empty(start) => {
                let node = element_from_start(&start, &reader)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| XmlError::Syntax {
                    position: reader.buffer_position() as u64,
                    message: "closing tag without an open element".to_string(),
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|error| XmlError::Syntax {
                    position: reader.buffer_position() as u64,
                    message: error.to_string(),
                })?;
                append_text(&mut stack, &value);
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut stack, &value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.tag));
    }
    root.ok_or(XmlError::Empty)
}

fn element_from_start(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<XmlNode, XmlError> {
    let syntax = |message: String| XmlError::Syntax {
        position: reader.buffer_position() as u64,
        message,
    };

    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|error| syntax(error.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|error| syntax(error.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_some() => Err(XmlError::MultipleRoots),
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}

fn append_text(stack: &mut [XmlNode], value: &str) {
    if let Some(current) = stack.last_mut() {
        current
            .text
            .get_or_insert_with(String::new)
            .push_str(value);
    }
}
