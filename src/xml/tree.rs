use std::borrow::Cow;

use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::XmlSyntaxError;

/// Owned XML element: name, attributes in document order, mixed content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenation of every descendant text node, in document order
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// First element matching a relative path such as `people/person` or
    /// `subject-area-list[@name="Research Organism(s)"]/subject-area`
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current: Vec<&Element> = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()).map(PathStep::parse) {
            current = current
                .into_iter()
                .flat_map(|element| element.child_elements())
                .filter(|element| step.matches(element))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&quick_xml::escape::escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(&quick_xml::escape::escape(text.as_str())),
                XmlNode::Element(element) => element.write_xml(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(XmlNode::Text(text));
        }
    }
}

struct PathStep<'a> {
    name: &'a str,
    predicate: Option<(&'a str, &'a str)>,
}

impl<'a> PathStep<'a> {
    fn parse(step: &'a str) -> Self {
        let Some((name, rest)) = step.split_once('[') else {
            return Self {
                name: step,
                predicate: None,
            };
        };
        let predicate = rest
            .trim_end_matches(']')
            .trim_start_matches('@')
            .split_once('=')
            .map(|(key, value)| {
                (
                    key.trim(),
                    value.trim().trim_matches(|c| c == '"' || c == '\''),
                )
            });
        Self { name, predicate }
    }

    fn matches(&self, element: &Element) -> bool {
        if self.name != "*" && element.name() != self.name {
            return false;
        }
        match self.predicate {
            Some((key, value)) => element.attribute(key) == Some(value),
            None => true,
        }
    }
}

/// Builds an [`Element`] tree from raw bytes.
///
/// The reader is forgiving in the same places eJP exports tend to be broken:
/// an end tag closes back to the nearest open element of that name, stray end
/// tags are dropped, unknown entities are kept verbatim and elements still
/// open at end of input are closed there. Anything after the root element is
/// ignored.
pub fn parse_document(bytes: &[u8]) -> Result<Element, XmlSyntaxError> {
    let mut reader = Reader::from_reader(bytes);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    while root.is_none() {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(_))) => break,
            Err(err) => {
                let position = reader.error_position() as usize;
                return Err(XmlSyntaxError {
                    message: err.to_string(),
                    position,
                    line_number: line_number_at(bytes, position),
                });
            }
        };

        match event {
            Event::Start(start) => stack.push(open_element(&start)),
            Event::Empty(start) => {
                let element = open_element(&start);
                close_into(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if let Some(depth) = stack.iter().rposition(|open| open.name == name) {
                    while stack.len() > depth {
                        if let Some(element) = stack.pop() {
                            close_into(&mut stack, &mut root, element);
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(decode_text(&text));
                }
            }
            Event::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(String::from_utf8_lossy(&data.into_inner()).into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while let Some(element) = stack.pop() {
        close_into(&mut stack, &mut root, element);
    }

    root.ok_or_else(|| {
        let position = bytes.len();
        XmlSyntaxError {
            message: "document has no root element".to_string(),
            position,
            line_number: line_number_at(bytes, position),
        }
    })
}

/// 1-based line containing the byte offset
pub fn line_number_at(bytes: &[u8], position: usize) -> usize {
    let end = position.min(bytes.len());
    bytes[..end].iter().filter(|b| **b == b'\n').count() + 1
}

fn close_into(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn open_element(start: &BytesStart<'_>) -> Element {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    let mut attributes = start.attributes();
    attributes.with_checks(false);
    for attribute in attributes.flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
        };
        element.attributes.push((key, value));
    }
    element
}

fn decode_text(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(Cow::Borrowed(value)) => value.to_string(),
        Ok(Cow::Owned(value)) => value,
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}
