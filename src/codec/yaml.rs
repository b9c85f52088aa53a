//! Decoder for a restricted YAML subset.
//!
//! Supported: block mappings and sequences (nested by indentation), single-line
//! flow collections, quoted and plain scalars, comments, and the YAML 1.1
//! boolean aliases `yes/no/on/off`. Anchors, tags, block scalars and multi-line
//! plain scalars are rejected instead of being half-parsed.

use serde_json::{Map, Number, Value};

use super::Body;
use crate::error::ParseError;

/// Deepest collection nesting accepted, block and flow alike.
const MAX_DEPTH: usize = 128;

pub(super) fn decode(text: &str) -> Result<Body, ParseError> {
    let lines = logical_lines(text)?;
    if lines.is_empty() {
        return Ok(Body::Value(Value::Null));
    }
    let mut parser = BlockParser {
        lines,
        pos: 0,
        depth: 0,
    };
    let indent = parser.lines[0].indent;
    let value = parser.block(indent)?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(error_at(line.number, "unexpected content"));
    }
    Ok(Body::Value(value))
}

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    content: String,
}

fn error_at(line: usize, message: &str) -> ParseError {
    ParseError::new(format!("{message} at line {line}"))
}

fn logical_lines(text: &str) -> Result<Vec<Line>, ParseError> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let body = raw.trim_start_matches(' ');
        if body.starts_with('\t') {
            return Err(error_at(number, "tabs are not allowed in indentation"));
        }
        let content = strip_comment(body).trim_end();
        if content.is_empty() || content == "---" || content == "..." {
            continue;
        }
        if content.starts_with('%') {
            return Err(error_at(number, "directives are not supported"));
        }
        lines.push(Line {
            number,
            indent: raw.len() - body.len(),
            content: content.to_owned(),
        });
    }
    Ok(lines)
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut previous = ' ';
    for (index, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if (ch == '"' || ch == '\'') && (previous == ' ' || index == 0) => {
                quote = Some(ch);
            }
            None if ch == '#' && previous.is_whitespace() => return &line[..index],
            None => {}
        }
        previous = ch;
    }
    line
}

fn is_sequence_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

/// Byte offset of the `:` separating a mapping key from its value.
fn mapping_colon(content: &str) -> Option<usize> {
    if content.starts_with('[') || content.starts_with('{') {
        return None;
    }
    let bytes = content.as_bytes();
    let start = match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => {
            let close = content[1..].find(q as char)? + 1;
            close + 1
        }
        _ => 0,
    };
    content[start..].char_indices().find_map(|(offset, ch)| {
        let index = start + offset;
        let next = bytes.get(index + 1);
        (ch == ':' && next.is_none_or(|b| *b == b' ')).then_some(index)
    })
}

struct BlockParser {
    lines: Vec<Line>,
    pos: usize,
    depth: usize,
}

impl BlockParser {
    fn block(&mut self, indent: usize) -> Result<Value, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(error_at(self.lines[self.pos].number, "nesting too deep"));
        }
        self.depth += 1;
        let value = self.node(indent);
        self.depth -= 1;
        value
    }

    fn node(&mut self, indent: usize) -> Result<Value, ParseError> {
        let line = self.lines[self.pos].clone();
        if is_sequence_item(&line.content) {
            return self.sequence(indent);
        }
        if mapping_colon(&line.content).is_some() {
            return self.mapping(indent);
        }
        self.pos += 1;
        if let Some(next) = self.lines.get(self.pos)
            && next.indent > indent
        {
            return Err(error_at(
                next.number,
                "multi-line plain scalars are not supported",
            ));
        }
        inline_value(&line.content, line.number)
    }

    fn mapping(&mut self, indent: usize) -> Result<Value, ParseError> {
        let mut map = Map::new();
        while let Some(line) = self.lines.get(self.pos).cloned() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(error_at(line.number, "bad indentation of a mapping entry"));
            }
            if is_sequence_item(&line.content) {
                return Err(error_at(line.number, "sequence item inside a mapping"));
            }
            let colon = mapping_colon(&line.content)
                .ok_or_else(|| error_at(line.number, "expected a mapping entry"))?;
            let key = scalar_key(line.content[..colon].trim(), line.number)?;
            let rest = line.content[colon + 1..].trim();
            self.pos += 1;

            let value = if rest.is_empty() {
                self.nested(indent, true)?
            } else {
                inline_value(rest, line.number)?
            };
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    fn sequence(&mut self, indent: usize) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        while let Some(line) = self.lines.get(self.pos).cloned() {
            if line.indent < indent || !is_sequence_item(&line.content) {
                break;
            }
            if line.indent > indent {
                return Err(error_at(line.number, "bad indentation of a sequence item"));
            }
            let rest = line.content[1..].trim_start();
            if rest.is_empty() {
                self.pos += 1;
                items.push(self.nested(indent, false)?);
                continue;
            }

            let item_indent = indent + (line.content.len() - rest.len());
            if is_sequence_item(rest) || mapping_colon(rest).is_some() {
                // Re-read the remainder of the line as the first line of a nested block.
                self.lines[self.pos] = Line {
                    number: line.number,
                    indent: item_indent,
                    content: rest.to_owned(),
                };
                items.push(self.block(item_indent)?);
            } else {
                self.pos += 1;
                items.push(inline_value(rest, line.number)?);
            }

            if let Some(next) = self.lines.get(self.pos)
                && next.indent > indent
                && next.indent != item_indent
            {
                return Err(error_at(next.number, "bad indentation of a sequence item"));
            }
        }
        Ok(Value::Array(items))
    }

    /// Value of an entry whose inline part was empty.
    ///
    /// Mapping values may be a sequence at the key's own indentation.
    fn nested(&mut self, parent_indent: usize, in_mapping: bool) -> Result<Value, ParseError> {
        match self.lines.get(self.pos) {
            Some(next) if next.indent > parent_indent => {
                let indent = next.indent;
                self.block(indent)
            }
            Some(next)
                if in_mapping
                    && next.indent == parent_indent
                    && is_sequence_item(&next.content) =>
            {
                self.sequence(parent_indent)
            }
            _ => Ok(Value::Null),
        }
    }
}

fn scalar_key(raw: &str, line: usize) -> Result<String, ParseError> {
    let value = inline_value(raw, line)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            return Err(error_at(line, "complex mapping keys are not supported"));
        }
        other => other.to_string(),
    })
}

fn inline_value(text: &str, line: usize) -> Result<Value, ParseError> {
    let mut cursor = Flow {
        chars: text.chars().collect(),
        pos: 0,
        line,
        depth: 0,
    };
    let value = if text.starts_with(['[', '{', '"', '\'']) {
        cursor.value()?
    } else {
        if text.starts_with(['&', '*', '!', '|', '>', '@', '`']) {
            return Err(error_at(line, "unsupported YAML construct"));
        }
        cursor.pos = cursor.chars.len();
        resolve_plain(text.trim())
    };
    cursor.skip_spaces();
    if cursor.pos < cursor.chars.len() {
        return Err(error_at(line, "unexpected characters after value"));
    }
    Ok(value)
}

struct Flow {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
}

impl Flow {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn fail(&self, message: &str) -> ParseError {
        error_at(self.line, message)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip_spaces();
        match self.peek() {
            Some('[') => self.nested(Self::sequence),
            Some('{') => self.nested(Self::mapping),
            Some('"') => self.double_quoted().map(Value::String),
            Some('\'') => self.single_quoted().map(Value::String),
            Some(_) => Ok(resolve_plain(&self.plain(false))),
            None => Err(self.fail("unexpected end of flow collection")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, ParseError>,
    ) -> Result<Value, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.fail("nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn sequence(&mut self) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_spaces();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_spaces();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                _ => return Err(self.fail("unterminated flow sequence")),
            }
        }
    }

    fn mapping(&mut self) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_spaces();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some('"') => self.double_quoted()?,
                Some('\'') => self.single_quoted()?,
                Some(_) => self.plain(true),
                None => return Err(self.fail("unterminated flow mapping")),
            };
            self.skip_spaces();
            let value = if self.peek() == Some(':') {
                self.pos += 1;
                self.skip_spaces();
                if matches!(self.peek(), Some(',' | '}')) {
                    Value::Null
                } else {
                    self.value()?
                }
            } else {
                Value::Null
            };
            map.insert(key, value);
            self.skip_spaces();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.fail("unterminated flow mapping")),
            }
        }
    }

    fn plain(&mut self, key: bool) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, ',' | ']' | '}') {
                break;
            }
            if key && ch == ':' {
                break;
            }
            if ch == ':' && self.chars.get(self.pos + 1).is_none_or(|c| c.is_whitespace()) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    fn single_quoted(&mut self) -> Result<String, ParseError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\'') if self.chars.get(self.pos + 1) == Some(&'\'') => {
                    out.push('\'');
                    self.pos += 2;
                }
                Some('\'') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
                None => return Err(self.fail("unterminated single-quoted string")),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<String, ParseError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.fail("unterminated double-quoted string"));
            };
            self.pos += 1;
            match ch {
                '"' => return Ok(out),
                '\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.fail("unterminated escape sequence"))?;
                    self.pos += 1;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '"' | '\\' | '/' | ' ' => out.push(escaped),
                        'x' => out.push(self.hex_escape(2)?),
                        'u' => out.push(self.hex_escape(4)?),
                        'U' => out.push(self.hex_escape(8)?),
                        _ => return Err(self.fail("invalid escape sequence")),
                    }
                }
                _ => out.push(ch),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, ParseError> {
        let end = self.pos + digits;
        let hex: String = self
            .chars
            .get(self.pos..end)
            .ok_or_else(|| self.fail("truncated escape sequence"))?
            .iter()
            .collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.fail("invalid escape sequence"))
    }
}

fn resolve_plain(text: &str) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        _ => {}
    }
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Value::Bool(true),
        "false" | "no" | "off" => return Value::Bool(false),
        _ => {}
    }
    if let Some(number) = resolve_integer(text) {
        return Value::Number(number.into());
    }
    if text.contains(['.', 'e', 'E'])
        && text.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        && let Ok(float) = text.parse::<f64>()
        && let Some(number) = Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(text.to_owned())
}

fn resolve_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = digits.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()?
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()?
    } else {
        return None;
    };
    Some(if negative { -magnitude } else { magnitude })
}
