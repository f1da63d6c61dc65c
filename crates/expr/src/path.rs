//! Variable path grammar
//!
//! A path is a dot-separated list of segments. A segment is a plain key
//! lookup with optional `[index]` suffixes, or a method call when a
//! `(args)` suffix follows the name directly: `user.name.upper()`,
//! `items[1]`, `rows[-1].cells[0]`, `tags.join(", ")`.

use crate::errors::ExprError;
use serde_json::Value;

/// Parsed variable path
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

/// One path segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Key to look up, or method name when `call` is present
    pub name: String,
    /// Literal arguments when this segment is a method call
    pub call: Option<Vec<Value>>,
    /// `[index]` suffixes applied in order after the lookup/call
    pub indexes: Vec<IndexKey>,
}

/// One `[...]` suffix: numeric list index or mapping key
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// List index; negative counts from the end
    Number(i64),
    /// Mapping key
    Key(String),
}

/// Parse a path expression (the text between `${` and `}`)
pub fn parse_path(input: &str) -> Result<Path, ExprError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExprError::EmptyReference);
    }
    let mut parser = Parser {
        path: trimmed,
        chars: trimmed.char_indices().peekable(),
    };
    let mut segments = vec![parser.segment()?];
    while parser.eat('.') {
        segments.push(parser.segment()?);
    }
    if let Some((_, c)) = parser.chars.peek().copied() {
        return Err(parser.err(format!("unexpected character `{c}`")));
    }
    Ok(Path { segments })
}

struct Parser<'a> {
    path: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn err(&self, reason: impl Into<String>) -> ExprError {
        ExprError::InvalidPath {
            path: self.path.to_string(),
            reason: reason.into(),
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some((_, c)) if *c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn segment(&mut self) -> Result<Segment, ExprError> {
        let mut name = String::new();
        while let Some((_, c)) = self.chars.peek().copied() {
            if matches!(c, '.' | '[' | '(') {
                break;
            }
            if matches!(c, ']' | ')' | ',') {
                return Err(self.err(format!("unexpected character `{c}` in segment name")));
            }
            name.push(c);
            self.chars.next();
        }
        if name.is_empty() {
            return Err(self.err("empty segment name"));
        }

        // A call suffix must follow the name directly; the segment name is
        // then the method invoked on the current value.
        let call = if self.eat('(') { Some(self.args()?) } else { None };

        let mut indexes = Vec::new();
        while self.eat('[') {
            indexes.push(self.index()?);
        }
        if matches!(self.chars.peek(), Some((_, '('))) {
            return Err(self.err("call suffix must directly follow the segment name"));
        }
        Ok(Segment {
            name,
            call,
            indexes,
        })
    }

    fn index(&mut self) -> Result<IndexKey, ExprError> {
        self.skip_ws();
        let key = if matches!(self.chars.peek(), Some((_, '\'' | '"'))) {
            IndexKey::Key(self.quoted()?)
        } else {
            let mut raw = String::new();
            while let Some((_, c)) = self.chars.peek().copied() {
                if c == ']' {
                    break;
                }
                raw.push(c);
                self.chars.next();
            }
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(self.err("empty index"));
            }
            match raw.parse::<i64>() {
                Ok(n) => IndexKey::Number(n),
                Err(_) => IndexKey::Key(raw.to_string()),
            }
        };
        self.skip_ws();
        if !self.eat(']') {
            return Err(self.err("missing `]`"));
        }
        Ok(key)
    }

    fn args(&mut self) -> Result<Vec<Value>, ExprError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            args.push(self.literal()?);
            self.skip_ws();
            if self.eat(')') {
                return Ok(args);
            }
            if !self.eat(',') {
                return Err(self.err("expected `,` or `)` in argument list"));
            }
            self.skip_ws();
        }
    }

    fn literal(&mut self) -> Result<Value, ExprError> {
        match self.chars.peek().copied() {
            Some((_, '\'' | '"')) => Ok(Value::String(self.quoted()?)),
            Some((_, c)) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(_) => {
                let mut word = String::new();
                while let Some((_, c)) = self.chars.peek().copied() {
                    if !c.is_ascii_alphanumeric() && c != '_' {
                        break;
                    }
                    word.push(c);
                    self.chars.next();
                }
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "none" => Ok(Value::Null),
                    other => Err(self.err(format!("invalid literal `{other}`"))),
                }
            }
            None => Err(self.err("unterminated argument list")),
        }
    }

    fn number(&mut self) -> Result<Value, ExprError> {
        let mut raw = String::new();
        if self.eat('-') {
            raw.push('-');
        }
        let mut is_float = false;
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() {
                raw.push(c);
                self.chars.next();
            } else if c == '.' && !is_float {
                is_float = true;
                raw.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if is_float {
            raw.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| self.err(format!("invalid number `{raw}`")))
        } else {
            raw.parse::<i64>()
                .map(Value::from)
                .map_err(|_| self.err(format!("invalid number `{raw}`")))
        }
    }

    fn quoted(&mut self) -> Result<String, ExprError> {
        let quote = match self.chars.next() {
            Some((_, c)) => c,
            None => return Err(self.err("expected a quoted string")),
        };
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                match self.chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => return Err(self.err("unterminated string escape")),
                }
            } else {
                out.push(c);
            }
        }
        Err(self.err("unterminated quoted string"))
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }
}
