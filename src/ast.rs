use std::fmt;

use crate::attribute::Attributes;

/// A component reference as written in a tag, e.g. `{{a:b:name.id key=value}}`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentRef {
    pub name: String,
    pub identifier: Option<String>,
    pub attributes: Attributes,
    /// Leading context namespaces, outermost first.
    pub contexts: Vec<String>,
}

impl ComponentRef {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_identifier<T: Into<String>>(mut self, identifier: T) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_contexts<I, T>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.contexts = contexts.into_iter().map(Into::into).collect();
        self
    }

    /// Block identity ignores attributes.
    pub fn same_block(&self, other: &Self) -> bool {
        self.name == other.name
            && self.identifier == other.identifier
            && self.contexts == other.contexts
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.contexts {
            write!(f, "{context}:")?;
        }
        f.write_str(&self.name)?;
        if let Some(identifier) = &self.identifier {
            write!(f, ".{identifier}")?;
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Conditional,
    InverseConditional,
    Collection,
    Context,
}

impl BlockKind {
    /// Whether `{{else}}` may appear inside a block of this kind.
    pub const fn accepts_else(self) -> bool {
        matches!(
            self,
            Self::Conditional | Self::InverseConditional | Self::Collection
        )
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal template text, emitted verbatim.
    Text(String),
    /// A comment; produces no output.
    Comment(String),
    Component(ComponentRef),
    Block(Block),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub component: ComponentRef,
    pub body: Vec<Node>,
    pub else_body: Vec<Node>,
}

impl Block {
    pub const fn new(kind: BlockKind, component: ComponentRef) -> Self {
        Self {
            kind,
            component,
            body: Vec::new(),
            else_body: Vec::new(),
        }
    }
}
