//! Minimal element tree over the quick-xml event stream.
//!
//! Namespace prefixes are stripped to local names both at parse time and
//! in lookup paths, which keeps path expressions independent of the
//! prefixes the service happens to emit.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Text extracted from a path lookup: a single string or an ordered
/// sequence, disambiguated explicitly instead of by inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatch {
    /// Exactly one element matched and wrapping was not requested.
    One(String),
    /// Multiple elements matched, or wrapping was requested.
    Many(Vec<String>),
}

impl TextMatch {
    /// The first matched string.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::One(text) => text,
            Self::Many(texts) => texts.first().map_or("", String::as_str),
        }
    }

    /// All matched strings in document order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            Self::One(text) => vec![text.as_str()],
            Self::Many(texts) => texts.iter().map(String::as_str).collect(),
        }
    }
}

/// A parsed XML element: local name, attributes, children and text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: BTreeMap<String, String>,
    children: Vec<XmlElement>,
    text: String,
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

impl XmlElement {
    /// The element's local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An attribute value by local name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct children in document order.
    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Concatenated character data directly inside this element.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// All elements matched by `path`, in document order.
    ///
    /// A path is slash-separated local names resolved against direct
    /// children; a leading `.//` resolves the first segment against
    /// descendants at any depth. Prefixes in segments are ignored.
    #[must_use]
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a XmlElement> {
        let (descend, rest) = match path.strip_prefix(".//") {
            Some(stripped) => (true, stripped),
            None => (false, path),
        };
        let segments: Vec<&str> = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(local_name)
            .collect();
        let Some((first, deeper)) = segments.split_first() else {
            return vec![self];
        };

        let mut current: Vec<&XmlElement> = if descend {
            let mut pool = Vec::new();
            self.collect_descendants(&mut pool);
            pool.into_iter().filter(|el| el.name == *first).collect()
        } else {
            self.children.iter().filter(|el| el.name == *first).collect()
        };

        for segment in deeper {
            current = current
                .iter()
                .flat_map(|el| el.children.iter().filter(|child| child.name == *segment))
                .collect();
        }
        current
    }

    /// The first element matched by `path`.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }

    /// Text of the elements matched by `path`.
    ///
    /// Returns `None` on no match. A single match comes back as
    /// [`TextMatch::One`] unless `wrap` forces the sequence form.
    #[must_use]
    pub fn get_text(&self, path: &str, wrap: bool) -> Option<TextMatch> {
        let matched = self.find_all(path);
        if matched.is_empty() {
            return None;
        }
        if matched.len() == 1 && !wrap {
            return Some(TextMatch::One(matched[0].text.clone()));
        }
        Some(TextMatch::Many(
            matched.into_iter().map(|el| el.text.clone()).collect(),
        ))
    }
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    // Synthetic container whose children are the document's root elements;
    // path lookups on the document behave like lookups from above the root.
    root: XmlElement,
}

impl XmlDocument {
    /// Parses an XML document into an element tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] on malformed XML.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    stack.push(Self::element_from_start(&start)?);
                }
                Ok(Event::Empty(start)) => {
                    let element = Self::element_from_start(&start)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
                Ok(Event::End(_)) => {
                    if stack.len() > 1 {
                        if let Some(element) = stack.pop() {
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(element);
                            }
                        }
                    }
                }
                Ok(Event::Text(text)) => {
                    let unescaped = text
                        .unescape()
                        .map_err(|xml_error| Error::service(format!("malformed XML text: {xml_error}")))?;
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&String::from_utf8_lossy(&cdata));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(xml_error) => {
                    return Err(Error::service(format!("malformed XML: {xml_error}")));
                }
            }
        }

        let root = stack
            .into_iter()
            .next()
            .ok_or_else(|| Error::service("malformed XML: empty document"))?;
        Ok(Self { root })
    }

    fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = BTreeMap::new();
        for attribute in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|xml_error| Error::service(format!("malformed XML attribute: {xml_error}")))?
                .into_owned();
            attributes.insert(key, value);
        }
        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// The synthetic element above the document root; lookup paths start
    /// with the root element's name.
    #[must_use]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}
