//! Minimal element tree over quick-xml events.
//!
//! Provider documents carry all data in attributes, so the tree keeps element
//! names, attributes and children only. Text content is dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// One XML element with its attributes and child elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Attribute value by name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First descendant matching a `/`-separated path of child names,
    /// e.g. `location/fact/values`.
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return Some(self);
        };
        let rest: Vec<&str> = segments.collect();
        let rest = rest.join("/");
        self.children
            .iter()
            .filter(|c| c.name == first)
            .find_map(|c| c.find(&rest))
    }

    /// All descendants matching a `/`-separated path, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current: Vec<&XmlElement> = vec![self];
        for segment in segments {
            current = current
                .into_iter()
                .flat_map(|el| el.children.iter().filter(|c| c.name == segment))
                .collect();
        }
        current
    }
}

/// Parse a document into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from(e));
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XmlError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from(e: &BytesStart<'_>) -> XmlElement {
    let attributes = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = local_name_str(attr.key.as_ref());
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();

    XmlElement {
        name: local_name_str(e.name().as_ref()),
        attributes,
        children: Vec::new(),
    }
}

/// Extract the local name from a potentially namespaced XML name.
/// e.g. `gm:day` -> `day`, `day` -> `day`
fn local_name_str(full: &[u8]) -> String {
    let s = std::str::from_utf8(full).unwrap_or("");
    match s.rfind(':') {
        Some(pos) => s[pos + 1..].to_string(),
        None => s.to_string(),
    }
}
