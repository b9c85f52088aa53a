//! Content-type driven body codecs.
//!
//! The registry maps MIME types to [`Parser`]s. Lookups first try the exact
//! type, then progressively strip vendor segments from `type/vnd.a.b+suffix`
//! until a registered vendor variant or the generic `type/suffix` matches.
//! Registrations are process-wide; register custom types at startup.

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use bytes::Bytes;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ParseError;

mod json;
#[cfg(feature = "xml")]
mod xml;
mod yaml;

/// Decoded representation of a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw bytes, produced by [`Decoding::Buffer`](crate::Decoding::Buffer).
    Bytes(Bytes),
    /// Text that no codec claimed.
    Text(String),
    /// Structured value produced by a codec.
    Value(Value),
}

impl Body {
    /// Borrow the body as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the body as raw bytes, if it was decoded as a buffer.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Borrow the structured value, if a codec produced one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a codec decoded the body to null (an empty JSON/YAML/XML body).
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// Deserialize a structured body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not structured or does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ParseError> {
        match self {
            Self::Value(value) => T::deserialize(value).map_err(ParseError::wrap),
            Self::Text(text) => serde_json::from_str(text).map_err(ParseError::wrap),
            Self::Bytes(bytes) => serde_json::from_slice(bytes).map_err(ParseError::wrap),
        }
    }
}

type DecodeFn = dyn Fn(&str) -> Result<Body, ParseError> + Send + Sync;

/// A named body decoder.
#[derive(Clone)]
pub struct Parser {
    name: Cow<'static, str>,
    decode: Arc<DecodeFn>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Parser").field(&self.name).finish()
    }
}

impl Parser {
    /// Create a parser from a decoding function.
    ///
    /// `name` appears in error messages (`Failed to parse <name> body: ...`).
    pub fn new<F>(name: impl Into<Cow<'static, str>>, decode: F) -> Self
    where
        F: Fn(&str) -> Result<Body, ParseError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(decode),
        }
    }

    /// JSON decoder. An empty body decodes to null.
    #[must_use]
    pub fn json() -> Self {
        Self::new("JSON", json::decode)
    }

    /// Restricted YAML decoder.
    #[must_use]
    pub fn yaml() -> Self {
        Self::new("YAML", yaml::decode)
    }

    /// XML decoder producing a tree of objects.
    #[cfg(feature = "xml")]
    #[must_use]
    pub fn xml() -> Self {
        Self::new("XML", xml::decode)
    }

    /// Name used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn format(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    /// Run the decoder on `text`.
    ///
    /// # Errors
    ///
    /// Returns the codec's error when `text` is malformed.
    pub fn parse(&self, text: &str) -> Result<Body, ParseError> {
        (self.decode)(text)
    }
}

/// MIME type to parser table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    parsers: HashMap<String, Parser>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the JSON, XML and YAML codecs.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("application/json", Parser::json());
        registry.register("text/json", Parser::json());
        #[cfg(feature = "xml")]
        {
            registry.register("application/xml", Parser::xml());
            registry.register("text/xml", Parser::xml());
        }
        for mime in ["application/yaml", "application/x-yaml", "text/yaml", "text/x-yaml"] {
            registry.register(mime, Parser::yaml());
        }
        registry
    }

    /// Register `parser` for `mime`, replacing any earlier registration.
    pub fn register(&mut self, mime: &str, parser: Parser) {
        self.parsers.insert(mime.trim().to_ascii_lowercase(), parser);
    }

    /// Find the parser for a `Content-Type` header value.
    #[must_use]
    pub fn resolve(&self, content_type: &str) -> Option<Parser> {
        candidates(content_type)
            .into_iter()
            .find_map(|candidate| self.parsers.get(&candidate).cloned())
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_builtins()));

/// Register a parser in the process-wide registry used by auto dispatch.
pub fn register(mime: &str, parser: Parser) {
    let mut registry = REGISTRY
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    registry.register(mime, parser);
}

/// Resolve a `Content-Type` header against the process-wide registry.
#[must_use]
pub fn resolve(content_type: &str) -> Option<Parser> {
    REGISTRY
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .resolve(content_type)
}

/// Lookup keys for a content type, most specific first.
fn candidates(content_type: &str) -> Vec<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let mut keys = vec![essence.clone()];

    let Some((top, subtype)) = essence.split_once('/') else {
        return keys;
    };
    let Some((vendor, suffix)) = subtype
        .strip_prefix("vnd.")
        .and_then(|rest| rest.rsplit_once('+'))
    else {
        return keys;
    };
    if vendor.is_empty() || suffix.is_empty() {
        return keys;
    }

    let segments: Vec<&str> = vendor.split('.').collect();
    for len in (1..segments.len()).rev() {
        keys.push(format!("{top}/vnd.{}+{suffix}", segments[..len].join(".")));
    }
    keys.push(format!("{top}/{suffix}"));
    keys
}
