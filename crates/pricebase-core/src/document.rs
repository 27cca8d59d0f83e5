//! Catalog document parsing.
//!
//! The whole document is read into an owned [`Element`] tree before the
//! import writes anything, so malformed markup fails the run up front.
//! Text content is dropped: the catalog format carries every value in
//! attributes.
//!
//! Catalogs arrive in whatever encoding their XML declaration names
//! (`windows-1251` is common); [`decode`] turns raw bytes into UTF-8 text
//! before [`parse`] sees them.

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;

/// One element of the catalog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_owned(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Children named `name` under the first `group` child. A missing group
    /// yields nothing.
    pub fn grouped<'a>(&'a self, group: &str, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child(group)
            .into_iter()
            .flat_map(move |g| g.children_named(name))
    }
}

/// Decodes raw document bytes into text.
///
/// A byte order mark wins; otherwise the `encoding` pseudo-attribute of the
/// XML declaration is honored, and UTF-8 is assumed without one.
pub fn decode(bytes: &[u8]) -> Result<String, ParseError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared_encoding(bytes)?.unwrap_or(UTF_8), bytes),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| ParseError {
            position: 0,
            message: format!("document is not valid {}", encoding.name()),
        })
}

/// Encoding named by the XML declaration, if the document starts with one.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>, ParseError> {
    if !bytes.starts_with(b"<?xml") {
        return Ok(None);
    }
    let Some(end) = bytes.windows(2).position(|w| w == b"?>") else {
        return Ok(None);
    };
    // The declaration itself is ASCII in every encoding we can sniff here.
    let declaration = String::from_utf8_lossy(&bytes[..end]);
    let Some(at) = declaration.find("encoding") else {
        return Ok(None);
    };
    let rest = declaration[at + "encoding".len()..].trim_start();
    let Some(rest) = rest.strip_prefix('=') else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(None);
    };
    let label = rest[1..].split(quote).next().unwrap_or_default();

    Encoding::for_label(label.as_bytes())
        .map(Some)
        .ok_or_else(|| ParseError {
            position: 0,
            message: format!("unsupported encoding {:?}", label),
        })
}

/// Parses a complete catalog document into its root element.
pub fn parse(xml: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| ParseError {
            position,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                stack.push(open_element(&start, position)?);
            }
            Event::Empty(start) => {
                let element = open_element(&start, position)?;
                close_element(element, &mut stack, &mut root, position)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| ParseError {
                    position,
                    message: "closing tag without matching opening tag".to_string(),
                })?;
                close_element(element, &mut stack, &mut root, position)?;
            }
            Event::Text(text) => {
                if stack.is_empty() && !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(ParseError {
                        position,
                        message: "text outside the root element".to_string(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError {
            position: reader.buffer_position() as u64,
            message: format!("unexpected end of document inside <{}>", open.name),
        });
    }

    root.ok_or_else(|| ParseError {
        position: 0,
        message: "document has no root element".to_string(),
    })
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<Element, ParseError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError {
            position,
            message: e.to_string(),
        })?;
        let value = attr.unescape_value().map_err(|e| ParseError {
            position,
            message: e.to_string(),
        })?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
    position: u64,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ParseError {
                position,
                message: format!("second root element <{}>", element.name),
            })
        }
    }
    Ok(())
}
