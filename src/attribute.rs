use indexmap::IndexMap;

use crate::error::{CurlyError, CurlyResult};

/// Ordered `key=value` attributes attached to a component.
pub type Attributes = IndexMap<String, String>;

/// How attribute values may be quoted within a single attribute list.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum AttributeQuoting {
    /// Single- and double-quoted values may appear side by side.
    #[default]
    Mixed,
    /// Every quoted value in one list must use the same quote character.
    Uniform,
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct AttributeParser<'a> {
    input: &'a str,
    pos: usize,
    quoting: AttributeQuoting,
    /// The first quote character seen, used for [`AttributeQuoting::Uniform`].
    seen_quote: Option<char>,
}

impl<'a> AttributeParser<'a> {
    const fn new(input: &'a str, quoting: AttributeQuoting) -> Self {
        Self {
            input,
            pos: 0,
            quoting,
            seen_quote: None,
        }
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    fn error(&self) -> CurlyError {
        CurlyError::Attribute {
            input: self.input.to_string(),
            position: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos = self.pos.saturating_add(rest.len().saturating_sub(trimmed.len()));
    }

    /// Length in bytes of the run of word characters at the current position.
    fn word_len(&self) -> usize {
        self.rest()
            .char_indices()
            .find(|(_, c)| !is_word_char(*c))
            .map_or(self.rest().len(), |(idx, _)| idx)
    }

    /// Scans `\w+=`, returning the name without the `=`.
    fn scan_name(&mut self) -> Option<&'a str> {
        let len = self.word_len();
        if len == 0 {
            return None;
        }
        let rest = self.rest();
        let name = rest.get(..len)?;
        if !rest.get(len..)?.starts_with('=') {
            return None;
        }
        self.pos = self.pos.saturating_add(len).saturating_add(1);
        Some(name)
    }

    fn scan_unquoted_value(&mut self) -> Option<&'a str> {
        let len = self.word_len();
        if len == 0 {
            return None;
        }
        let value = self.rest().get(..len)?;
        self.pos = self.pos.saturating_add(len);
        Some(value)
    }

    fn scan_quoted_value(&mut self, quote: char) -> Option<&'a str> {
        let rest = self.rest();
        let inner = rest.strip_prefix(quote)?;
        let end = inner.find(quote)?;
        let value = inner.get(..end)?;
        // Opening quote, contents, closing quote.
        let consumed = end.saturating_add(quote.len_utf8().saturating_mul(2));
        self.pos = self.pos.saturating_add(consumed);
        Some(value)
    }

    fn scan_value(&mut self) -> CurlyResult<Option<&'a str>> {
        if let Some(value) = self.scan_unquoted_value() {
            return Ok(Some(value));
        }

        for quote in ['\'', '"'] {
            let start = self.pos;
            if let Some(value) = self.scan_quoted_value(quote) {
                if self.quoting == AttributeQuoting::Uniform {
                    match self.seen_quote {
                        Some(seen) if seen != quote => {
                            self.pos = start;
                            return Err(self.error());
                        }
                        Some(_) => {}
                        None => self.seen_quote = Some(quote),
                    }
                }
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    fn scan_attribute(&mut self) -> CurlyResult<Option<(String, String)>> {
        self.skip_whitespace();

        if self.rest().is_empty() {
            return Ok(None);
        }

        let name = self.scan_name().ok_or_else(|| self.error())?;
        let value = self.scan_value()?.ok_or_else(|| self.error())?;

        Ok(Some((name.to_string(), value.to_string())))
    }

    fn parse(mut self) -> CurlyResult<Attributes> {
        let mut attributes = Attributes::new();
        while let Some((name, value)) = self.scan_attribute()? {
            attributes.insert(name, value);
        }
        Ok(attributes)
    }
}

/// Parses a trailing attribute list such as `width=10px title="hello world"`.
///
/// `None` and blank input both yield an empty map.
///
/// # Errors
/// Returns [`CurlyError::Attribute`] when a position is reached where neither
/// a `name=` nor a value can be scanned.
pub fn parse_attributes(input: Option<&str>) -> CurlyResult<Attributes> {
    parse_attributes_with(input, AttributeQuoting::default())
}

/// Like [`parse_attributes`], applying the given quoting policy.
///
/// # Errors
/// See [`parse_attributes`]; additionally fails under
/// [`AttributeQuoting::Uniform`] when quote characters are mixed.
pub fn parse_attributes_with(
    input: Option<&str>,
    quoting: AttributeQuoting,
) -> CurlyResult<Attributes> {
    match input {
        Some(input) => AttributeParser::new(input, quoting).parse(),
        None => Ok(Attributes::new()),
    }
}
