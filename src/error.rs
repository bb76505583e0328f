pub type CurlyResult<T> = std::result::Result<T, CurlyError>;

/// Number of bytes of context shown on either side of a syntax error.
const SNIPPET_RADIUS: usize = 8;

/// An opening delimiter that was not followed by a recognised tag, or a tag
/// that was never closed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    /// Byte offset of the offending position.
    pub position: usize,
    /// Line number (1-indexed) of the offending position.
    pub line: usize,
    /// Column (1-indexed, in characters) of the offending position.
    pub column: usize,
    /// A short excerpt of the source around the offending position.
    pub snippet: String,
    /// The full template source.
    pub source: String,
}

impl SyntaxError {
    pub fn new(position: usize, source: &str) -> Self {
        let position = floor_char_boundary(source, position.min(source.len()));
        let start = floor_char_boundary(source, position.saturating_sub(SNIPPET_RADIUS));
        let stop = ceil_char_boundary(
            source,
            position
                .saturating_add(SNIPPET_RADIUS)
                .saturating_add(1)
                .min(source.len()),
        );

        let snippet = source.get(start..stop).unwrap_or_default().trim().to_string();

        // Lines are counted up to and including the offending character.
        let upto = ceil_char_boundary(source, position.saturating_add(1).min(source.len()));
        let before = source.get(..upto).unwrap_or_default();
        let line = before.matches('\n').count().saturating_add(1);

        let line_start = source
            .get(..position)
            .and_then(|s| s.rfind('\n'))
            .map_or(0, |idx| idx.saturating_add(1));
        let column = source
            .get(line_start..position)
            .map_or(0, |s| s.chars().count())
            .saturating_add(1);

        Self {
            position,
            line,
            column,
            snippet,
            source: source.to_string(),
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid syntax near `{}` on line {} in template:\n\n{}\n",
            self.snippet, self.line, self.source
        )
    }
}

impl std::error::Error for SyntaxError {}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx = idx.saturating_sub(1);
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx = idx.saturating_add(1);
    }
    idx
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CurlyError {
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("invalid attribute list `{input}` at offset {position}")]
    Attribute { input: String, position: usize },

    #[error("invalid component `{{{{{component}}}}}`")]
    InvalidComponent { component: String },

    #[error(
        "error compiling `{{{{#{component}}}}}`: block must be terminated with `{{{{/{component}}}}}`"
    )]
    IncompleteBlock { component: String },

    #[error(
        "compilation error: expected `{{{{/{}}}}}`, got `{{{{/{actual}}}}}`",
        .expected.as_deref().unwrap_or("<root>")
    )]
    IncorrectEnding {
        /// The innermost open block, or `None` when no block was open.
        expected: Option<String>,
        actual: String,
    },

    #[error("compilation error: {message}")]
    Compile { message: String },

    #[error("could not find presenter `{name}`")]
    PresenterNotFound { name: String },

    #[error("required identifier `{name}` missing for `{presenter}`")]
    MissingPresentedName { presenter: String, name: String },

    #[error("Rendering error: {message}")]
    Render { message: String },

    #[error("Template already exists: {template_name}")]
    TemplateExists { template_name: String },

    #[error("Template not found: {template_name}")]
    MissingTemplate { template_name: String },
}

impl CurlyError {
    pub(crate) fn compile<T: Into<String>>(message: T) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    pub fn render<T: Into<String>>(message: T) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}
