//! Turns template source into a flat stream of [`Token`]s.
//!
//! Text is copied verbatim; everything between `{{` and `}}` is classified by
//! its leading marker and, for components and blocks, decoded into a
//! [`ComponentRef`]. `{{{` is an escaped delimiter and yields a literal `{{`.

use crate::{
    ast::ComponentRef,
    attribute::{AttributeQuoting, parse_attributes_with},
    error::{CurlyResult, SyntaxError},
};

const CURLY_START: &str = "{{";
const CURLY_END: &str = "}}";
const ESCAPED_CURLY_START: &str = "{{{";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Comment(String),
    Component(ComponentRef),
    ConditionalBlockStart(ComponentRef),
    InverseConditionalBlockStart(ComponentRef),
    CollectionBlockStart(ComponentRef),
    ContextBlockStart(ComponentRef),
    Else,
    ConditionalBlockEnd,
    InverseConditionalBlockEnd,
    BlockEnd(ComponentRef),
}

impl Token {
    pub const fn is_block_start(&self) -> bool {
        matches!(
            self,
            Self::ConditionalBlockStart(_)
                | Self::InverseConditionalBlockStart(_)
                | Self::CollectionBlockStart(_)
                | Self::ContextBlockStart(_)
        )
    }

    pub const fn is_block_end(&self) -> bool {
        matches!(
            self,
            Self::ConditionalBlockEnd | Self::InverseConditionalBlockEnd | Self::BlockEnd(_)
        )
    }
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    quoting: AttributeQuoting,
}

impl<'a> Scanner<'a> {
    const fn new(input: &'a str, quoting: AttributeQuoting) -> Self {
        Self {
            input,
            pos: 0,
            quoting,
        }
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.pos = self.pos.saturating_add(s.len());
            true
        } else {
            false
        }
    }

    fn syntax_error(&self, position: usize) -> SyntaxError {
        SyntaxError::new(position, self.input)
    }

    fn scan(mut self) -> CurlyResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while !self.eof() {
            tokens.push(self.scan_token()?);
        }
        Ok(tokens)
    }

    fn scan_token(&mut self) -> CurlyResult<Token> {
        if self.consume(ESCAPED_CURLY_START) {
            return Ok(Token::Text(CURLY_START.to_string()));
        }

        let start = self.pos;
        if self.consume(CURLY_START) {
            return self.scan_tag(start);
        }

        Ok(self.scan_text())
    }

    /// Literal text up to the next opening delimiter or the end of input.
    fn scan_text(&mut self) -> Token {
        let rest = self.rest();
        let len = rest.find(CURLY_START).unwrap_or(rest.len());
        self.pos = self.pos.saturating_add(len);
        Token::Text(rest.get(..len).unwrap_or_default().to_string())
    }

    /// Consumes everything up to and including the closing delimiter,
    /// returning the tag body.
    fn scan_until_end_of_curly(&mut self, start: usize) -> Result<&'a str, SyntaxError> {
        let rest = self.rest();
        let end = rest
            .find(CURLY_END)
            .ok_or_else(|| self.syntax_error(start))?;
        self.pos = self.pos.saturating_add(end).saturating_add(CURLY_END.len());
        Ok(rest.get(..end).unwrap_or_default())
    }

    /// Called with the opening delimiter already consumed; `start` points at it.
    fn scan_tag(&mut self, start: usize) -> CurlyResult<Token> {
        if self.consume("!") {
            let comment = self.scan_until_end_of_curly(start)?;
            return Ok(Token::Comment(comment.to_string()));
        }

        let body = self.scan_until_end_of_curly(start)?;
        let trimmed = body.trim();

        let token = if trimmed == "else" {
            Token::Else
        } else if trimmed == "/if" {
            Token::ConditionalBlockEnd
        } else if trimmed == "/unless" {
            Token::InverseConditionalBlockEnd
        } else if let Some(rest) = body.strip_prefix('@') {
            Token::ContextBlockStart(self.decode(rest, start)?)
        } else if let Some(rest) = body
            .strip_prefix("#unless ")
            .or_else(|| body.strip_prefix('^'))
        {
            Token::InverseConditionalBlockStart(self.decode(rest, start)?)
        } else if let Some(rest) = body.strip_prefix("#if ").or_else(|| body.strip_prefix('#')) {
            Token::ConditionalBlockStart(self.decode(rest, start)?)
        } else if let Some(rest) = body.strip_prefix('*') {
            Token::CollectionBlockStart(self.decode(rest, start)?)
        } else if let Some(rest) = body.strip_prefix('/') {
            Token::BlockEnd(self.decode(rest, start)?)
        } else {
            Token::Component(self.decode(body, start)?)
        };

        Ok(token)
    }

    fn decode(&self, body: &str, start: usize) -> CurlyResult<ComponentRef> {
        decode_component(body, self.quoting).map_err(|err| match err {
            DecodeError::Syntax => self.syntax_error(start).into(),
            DecodeError::Attribute(err) => err,
        })
    }
}

enum DecodeError {
    Syntax,
    Attribute(crate::CurlyError),
}

/// Splits a tag body into `(contexts, name, identifier, attributes)`.
///
/// `a:b:name.id? key=value` decodes to contexts `[a, b]`, name `name?`,
/// identifier `id` and a single attribute.
fn decode_component(body: &str, quoting: AttributeQuoting) -> Result<ComponentRef, DecodeError> {
    let body = body.trim_start();
    let (head, rest) = match body.find(char::is_whitespace) {
        Some(idx) => {
            let (head, rest) = body.split_at(idx);
            (head, Some(rest))
        }
        None => (body, None),
    };

    if head.is_empty() {
        return Err(DecodeError::Syntax);
    }

    let mut segments: Vec<&str> = head.split(':').collect();
    let last = segments.pop().ok_or(DecodeError::Syntax)?;
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DecodeError::Syntax);
    }

    let (mut name, identifier) = match last.split_once('.') {
        Some((name, identifier)) => (name.to_string(), Some(identifier.to_string())),
        None => (last.to_string(), None),
    };

    // `even.42?` reads as the predicate `even?` applied to `42`.
    let identifier = identifier.map(|identifier| match identifier.strip_suffix('?') {
        Some(stripped) => {
            name.push('?');
            stripped.to_string()
        }
        None => identifier,
    });

    if name.is_empty() || name == "?" {
        return Err(DecodeError::Syntax);
    }

    let attributes = parse_attributes_with(rest, quoting).map_err(DecodeError::Attribute)?;

    Ok(ComponentRef {
        name,
        identifier,
        attributes,
        contexts: segments.into_iter().map(str::to_string).collect(),
    })
}

/// Scans `source` into tokens using the default attribute quoting policy.
///
/// # Errors
/// Returns [`crate::CurlyError::Syntax`] for unterminated tags or comments and
/// for empty tag bodies, and [`crate::CurlyError::Attribute`] for malformed
/// attribute lists. No partial token list is ever returned.
pub fn scan(source: &str) -> CurlyResult<Vec<Token>> {
    scan_with(source, AttributeQuoting::default())
}

/// Scans `source` into tokens with an explicit attribute quoting policy.
///
/// # Errors
/// See [`scan`].
pub fn scan_with(source: &str, quoting: AttributeQuoting) -> CurlyResult<Vec<Token>> {
    Scanner::new(source, quoting).scan()
}
