//! XML to object-tree decoding.
//!
//! Elements become objects keyed by child tag name, each child list is an
//! array. Attributes live under `"$"` and text content under `"_"`. An element
//! with neither attributes nor children collapses to its text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use super::Body;
use crate::error::ParseError;

/// Deepest element nesting accepted.
const MAX_DEPTH: usize = 128;

struct Element {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(ParseError::wrap)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(ParseError::wrap)?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn adopt(&mut self, child: Self) {
        let name = child.name.clone();
        let value = child.into_value();
        match self.children.get_mut(&name) {
            Some(Value::Array(siblings)) => siblings.push(value),
            _ => {
                self.children.insert(name, Value::Array(vec![value]));
            }
        }
    }

    fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return Value::String(self.text);
        }
        let mut object = self.children;
        if !self.attributes.is_empty() {
            object.insert("$".into(), Value::Object(self.attributes));
        }
        if !self.text.is_empty() {
            object.insert("_".into(), Value::String(self.text));
        }
        Value::Object(object)
    }
}

pub(super) fn decode(text: &str) -> Result<Body, ParseError> {
    if text.trim().is_empty() {
        return Ok(Body::Value(Value::Null));
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(ParseError::wrap)? {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::new("element nesting too deep"));
                }
                stack.push(Element::open(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                close(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::new("unexpected closing tag"))?;
                close(&mut stack, &mut root, element)?;
            }
            Event::Text(content) => {
                let content = content.unescape().map_err(ParseError::wrap)?;
                append_text(&mut stack, &content)?;
            }
            Event::CData(data) => {
                let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut stack, &content)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::new(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    let (name, value) = root.ok_or_else(|| ParseError::new("document has no root element"))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Body::Value(Value::Object(document)))
}

fn close(
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
    element: Element,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.adopt(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::new("multiple root elements"));
    }
    *root = Some((element.name.clone(), element.into_value()));
    Ok(())
}

fn append_text(stack: &mut [Element], content: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(content);
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err(ParseError::new("text outside of the root element")),
    }
}
