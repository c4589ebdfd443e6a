//! Parsing of model replies that are supposed to be JSON.
//!
//! Models like to wrap the payload in a ```json fence and sometimes answer with a
//! Python-style literal (single quotes, `True`/`None`, trailing commas). The fenced
//! block is extracted first, strict JSON is tried, then the permissive literal parser.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    List,
    Object,
}

static FENCED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").expect("valid regex"));
static FENCED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));
static STRAY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?").expect("valid regex"));

impl Shape {
    fn fence(self) -> &'static Regex {
        match self {
            Shape::List => &FENCED_LIST,
            Shape::Object => &FENCED_OBJECT,
        }
    }
}

/// The fenced payload if there is one, otherwise the whole reply.
pub fn extract(reply: &str, shape: Shape) -> String {
    match shape.fence().captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim().to_string(),
        None => reply.trim().to_string(),
    }
}

pub fn parse_value(reply: &str, shape: Shape) -> Result<Value, AppError> {
    let candidate = extract(reply, shape);
    let json_err = match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let cleaned = STRAY_FENCE.replace_all(&candidate, "");
    match parse_literal(cleaned.trim()) {
        Ok(value) => {
            tracing::warn!(error = %json_err, "model reply was not strict JSON; used literal parser");
            Ok(value)
        }
        Err(literal_err) => Err(AppError::ModelOutput(format!(
            "{json_err}; literal parse also failed: {literal_err}"
        ))),
    }
}

pub fn parse<T: DeserializeOwned>(reply: &str, shape: Shape) -> Result<T, AppError> {
    let value = parse_value(reply, shape)?;
    serde_json::from_value(value).map_err(|e| AppError::ModelOutput(e.to_string()))
}

/// Parses a Python literal (dict, list, tuple, str, int, float, bool, None) into JSON.
pub fn parse_literal(input: &str) -> Result<Value, String> {
    let mut parser = LiteralParser { chars: input.chars().collect(), pos: 0 };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(format!("unexpected trailing input at offset {}", parser.pos));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        match self.peek() {
            Some('{') => self.dict(),
            Some('[') => self.sequence('[', ']').map(Value::Array),
            Some('(') => self.sequence('(', ')').map(Value::Array),
            Some(q @ ('\'' | '"')) => self.strings(q).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(c) => Err(format!("unexpected '{c}' at offset {}", self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Vec<Value>, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(c) => return Err(format!("expected ',' or '{close}', found '{c}'")),
                None => return Err(format!("unterminated sequence, expected '{close}'")),
            }
        }
    }

    fn dict(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => return Err(format!("expected ',' or '}}', found '{c}'")),
                None => return Err("unterminated dict".to_string()),
            }
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), String> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(format!("expected '{wanted}', found '{c}'")),
            None => Err(format!("expected '{wanted}', found end of input")),
        }
    }

    /// Adjacent string literals concatenate, as in Python.
    fn strings(&mut self, first_quote: char) -> Result<String, String> {
        let mut out = self.string(first_quote)?;
        loop {
            let save = self.pos;
            self.skip_ws();
            match self.peek() {
                Some(q @ ('\'' | '"')) => out.push_str(&self.string(q)?),
                _ => {
                    self.pos = save;
                    return Ok(out);
                }
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('\\') => out.push('\\'),
                    Some('\'') => out.push('\''),
                    Some('"') => out.push('"'),
                    Some('\n') => {}
                    Some('x') => out.push(self.hex_escape(2)?),
                    Some('u') => out.push(self.hex_escape(4)?),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, String> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err("truncated escape".to_string());
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid escape \\{hex}"))
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')) {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        if let Ok(int) = raw.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number '{raw}'"))
    }

    fn keyword(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(format!("unknown name '{word}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_is_extracted() {
        let reply = "Here you go:\n```json\n[{\"title\": \"Joins\"}]\n```\nGood luck!";
        let value = parse_value(reply, Shape::List).unwrap();
        assert_eq!(value, json!([{ "title": "Joins" }]));
    }

    #[test]
    fn each_shape_picks_its_own_fence() {
        let reply = "```json\n{\"a\": 1}\n```\n```json\n[1, 2]\n```";
        assert_eq!(extract(reply, Shape::Object), "{\"a\": 1}");
        assert_eq!(extract(reply, Shape::List), "[1, 2]");
        assert_eq!(extract(reply, Shape::List), "[1, 2]");
        assert_eq!(extract(" no fence ", Shape::Object), "no fence");
    }

    #[test]
    fn bare_json_is_accepted() {
        let value = parse_value("  {\"a\": 1}  ", Shape::Object).unwrap();
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn python_literal_falls_back() {
        let reply = "```\n[{'title': 'Intro', 'done': True, 'extra': None, 'tags': ('a', 'b'),},]\n```";
        let value = parse_value(reply, Shape::List).unwrap();
        assert_eq!(
            value,
            json!([{ "title": "Intro", "done": true, "extra": null, "tags": ["a", "b"] }])
        );
    }

    #[test]
    fn literal_handles_escapes_and_numbers() {
        let value = parse_literal(r#"{'it\'s': "a\nb", 'n': -3, 'x': 1.5, 'big': 1_000}"#).unwrap();
        assert_eq!(value, json!({ "it's": "a\nb", "n": -3, "x": 1.5, "big": 1000 }));
    }

    #[test]
    fn unparseable_reply_is_an_error() {
        let err = parse_value("I cannot help with that.", Shape::List).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn typed_parse_reports_shape_mismatch() {
        let err = parse::<Vec<String>>("{\"a\": 1}", Shape::List).unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }
}
