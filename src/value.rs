use indexmap::IndexMap;

/// The named values a presenter is constructed from.
pub type Options = IndexMap<String, Value>;

/// A value returned by a component, or carried into a nested presenter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Plain text; escaped when written to the output.
    Str(String),
    /// Markup that is already safe to emit and is never escaped again.
    Safe(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn safe<T: Into<String>>(markup: T) -> Self {
        Self::Safe(markup.into())
    }

    /// Only `Nil` and `false` are falsy.
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Safe(s) => Some(s),
            Self::Nil
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::List(_)
            | Self::Map(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(key),
            Self::Nil
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Str(_)
            | Self::Safe(_)
            | Self::List(_) => None,
        }
    }

    /// Appends this value to `output`, escaping anything not marked safe.
    pub fn write_escaped(&self, output: &mut String) {
        match self {
            Self::Nil | Self::Map(_) => {}
            Self::Bool(b) => output.push_str(&b.to_string()),
            Self::Int(i) => output.push_str(&i.to_string()),
            Self::Float(f) => output.push_str(&f.to_string()),
            Self::Str(s) => escape_html_into(s, output),
            Self::Safe(s) => output.push_str(s),
            Self::List(items) => {
                for item in items {
                    item.write_escaped(output);
                }
            }
        }
    }

    /// The escaped rendering of this value as a new string.
    pub fn to_html(&self) -> String {
        let mut output = String::new();
        self.write_escaped(&mut output);
        output
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl<K: Into<String>, V: Into<Self>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn escape_html_into(s: &str, output: &mut String) {
    for c in s.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            c => output.push(c),
        }
    }
}

/// Escapes the HTML special characters `& < > " '`.
pub fn escape_html(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    escape_html_into(s, &mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_escapes_plain_strings() {
        assert_eq!(
            Value::from("<p>dirty</p>").to_html(),
            "&lt;p&gt;dirty&lt;/p&gt;"
        );
        assert_eq!(escape_html("a & 'b' \"c\""), "a &amp; &#39;b&#39; &quot;c&quot;");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_safe_strings_are_not_escaped_twice() {
        let safe = Value::safe("<p>dirty</p>");
        assert_eq!(safe.to_html(), "<p>dirty</p>");
        assert_eq!(Value::safe(safe.to_html()).to_html(), "<p>dirty</p>");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_scalars_render_as_strings() {
        assert_eq!(Value::Int(42).to_html(), "42");
        assert_eq!(Value::Bool(true).to_html(), "true");
        assert_eq!(Value::Nil.to_html(), "");
        assert_eq!(
            Value::from(vec!["<a>", "b"]).to_html(),
            "&lt;a&gt;b"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_map_lookup() {
        let item: Value = [("name", "foo"), ("status", "active")].into_iter().collect();
        assert_eq!(item.get("name"), Some(&Value::from("foo")));
        assert_eq!(item.get("missing"), None);
        assert_eq!(Value::from("x").get("name"), None);
    }
}
