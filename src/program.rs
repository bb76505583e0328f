use std::{fmt, sync::Arc};

use crate::{attribute::Attributes, compiler::CollectionCoercion, presenter::PresenterType};

/// A validated call of a component on the presenter in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub identifier: Option<String>,
    pub attributes: Attributes,
    /// Whether the caller's block is passed on to the component.
    pub forwards_block: bool,
}

/// What a [`Step::Begin`] does with the result of its invocation.
#[derive(Clone)]
pub enum BlockStep {
    /// Runs the body when the result is truthy, otherwise the else body.
    Conditional,
    /// Runs the body when the result is falsy, otherwise the else body.
    Inverse,
    /// Runs the body once per item, each under a fresh `presenter`.
    Collection {
        presenter: Arc<dyn PresenterType>,
        /// Option name the item is bound to.
        item: String,
    },
    /// Hands the body to the component as its block; the value the
    /// component yields is bound to `name` under `presenter`.
    Context {
        presenter: Arc<dyn PresenterType>,
        name: String,
    },
}

impl fmt::Debug for BlockStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conditional => f.write_str("Conditional"),
            Self::Inverse => f.write_str("Inverse"),
            Self::Collection { presenter, item } => f
                .debug_struct("Collection")
                .field("presenter", &presenter.name())
                .field("item", item)
                .finish(),
            Self::Context { presenter, name } => f
                .debug_struct("Context")
                .field("presenter", &presenter.name())
                .field("name", name)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Begin {
    pub block: BlockStep,
    pub call: Invocation,
    /// Index of the matching [`Step::Else`], if the block has an else body.
    pub else_at: Option<usize>,
    /// Index of the matching [`Step::End`].
    pub end_at: usize,
}

#[derive(Debug, Clone)]
pub enum Step {
    /// Template text, appended verbatim.
    Literal(String),
    /// Invokes a component and appends its escaped result.
    Emit(Invocation),
    Begin(Begin),
    Else,
    End,
}

/// A compiled template, bound to the presenter type it was validated
/// against. Immutable, and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) presenter: Arc<dyn PresenterType>,
    pub(crate) steps: Vec<Step>,
    pub(crate) coercion: CollectionCoercion,
}

impl Program {
    pub fn presenter(&self) -> &Arc<dyn PresenterType> {
        &self.presenter
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub const fn collection_coercion(&self) -> CollectionCoercion {
        self.coercion
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
