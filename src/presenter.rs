//! The capability surface a presenter exposes to the compiler and evaluator.
//!
//! The compiler only ever sees a [`PresenterType`]: which components exist,
//! what their [`Signature`]s are and which presenter type handles the items of
//! a collection or the value of a context block. At render time the type
//! instantiates a [`Presenter`], which answers component calls.
//!
//! [`crate::class`] provides a declarative implementation of both traits.

use std::{fmt, rc::Rc, sync::Arc};

use crate::{
    attribute::Attributes,
    error::{CurlyError, CurlyResult},
    value::{Options, Value},
};

/// How a component treats the positional identifier in `{{name.identifier}}`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierPolicy {
    None,
    Optional,
    Required,
}

/// A single declared parameter of a component.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// A required positional parameter, filled from the identifier.
    Required(String),
    /// An optional positional parameter, filled from the identifier.
    Optional(String),
    /// A named parameter, filled from an attribute.
    Keyword { name: String, required: bool },
    /// Accepts any attributes not otherwise declared.
    KeywordCollection,
    /// Accepts a block argument.
    Block(String),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSpec {
    pub name: String,
    pub required: bool,
}

/// The declared parameter list of a component.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    /// A signature taking no arguments at all.
    pub const fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn required<T: Into<String>>(mut self, name: T) -> Self {
        self.parameters.push(Parameter::Required(name.into()));
        self
    }

    #[must_use]
    pub fn optional<T: Into<String>>(mut self, name: T) -> Self {
        self.parameters.push(Parameter::Optional(name.into()));
        self
    }

    #[must_use]
    pub fn keyword<T: Into<String>>(mut self, name: T) -> Self {
        self.parameters.push(Parameter::Keyword {
            name: name.into(),
            required: false,
        });
        self
    }

    #[must_use]
    pub fn required_keyword<T: Into<String>>(mut self, name: T) -> Self {
        self.parameters.push(Parameter::Keyword {
            name: name.into(),
            required: true,
        });
        self
    }

    #[must_use]
    pub fn keyword_collection(mut self) -> Self {
        self.parameters.push(Parameter::KeywordCollection);
        self
    }

    #[must_use]
    pub fn block<T: Into<String>>(mut self, name: T) -> Self {
        self.parameters.push(Parameter::Block(name.into()));
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn positional(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| matches!(p, Parameter::Required(_) | Parameter::Optional(_)))
    }

    /// More than one positional parameter can never be satisfied by a single
    /// identifier.
    pub fn is_valid(&self) -> bool {
        self.positional().count() <= 1
    }

    pub fn identifier_policy(&self) -> IdentifierPolicy {
        if self
            .parameters
            .iter()
            .any(|p| matches!(p, Parameter::Required(_)))
        {
            IdentifierPolicy::Required
        } else if self
            .parameters
            .iter()
            .any(|p| matches!(p, Parameter::Optional(_)))
        {
            IdentifierPolicy::Optional
        } else {
            IdentifierPolicy::None
        }
    }

    /// The positional parameter, with whether it is required.
    pub fn identifier(&self) -> Option<(&str, bool)> {
        self.positional().find_map(|p| match p {
            Parameter::Required(name) => Some((name.as_str(), true)),
            Parameter::Optional(name) => Some((name.as_str(), false)),
            Parameter::Keyword { .. } | Parameter::KeywordCollection | Parameter::Block(_) => None,
        })
    }

    pub fn attributes(&self) -> Vec<AttributeSpec> {
        self.parameters
            .iter()
            .filter_map(|p| match p {
                Parameter::Keyword { name, required } => Some(AttributeSpec {
                    name: name.clone(),
                    required: *required,
                }),
                Parameter::Required(_)
                | Parameter::Optional(_)
                | Parameter::KeywordCollection
                | Parameter::Block(_) => None,
            })
            .collect()
    }

    pub fn accepts_keyword_collection(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| matches!(p, Parameter::KeywordCollection))
    }

    pub fn block_name(&self) -> Option<&str> {
        self.parameters.iter().find_map(|p| match p {
            Parameter::Block(name) => Some(name.as_str()),
            Parameter::Required(_)
            | Parameter::Optional(_)
            | Parameter::Keyword { .. }
            | Parameter::KeywordCollection => None,
        })
    }

    pub fn accepts_block(&self) -> bool {
        self.block_name().is_some()
    }
}

/// A callable block handed to a component.
pub type BlockFn<'a> = dyn FnMut(Value) -> CurlyResult<Value> + 'a;

/// The arguments of a single component invocation.
pub struct Arguments<'a> {
    identifier: Option<&'a str>,
    attributes: &'a Attributes,
    block: Option<&'a mut BlockFn<'a>>,
}

impl<'a> Arguments<'a> {
    pub fn new(
        identifier: Option<&'a str>,
        attributes: &'a Attributes,
        block: Option<&'a mut BlockFn<'a>>,
    ) -> Self {
        Self {
            identifier,
            attributes,
            block,
        }
    }

    pub const fn identifier(&self) -> Option<&'a str> {
        self.identifier
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub const fn attributes(&self) -> &'a Attributes {
        self.attributes
    }

    pub const fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Calls the block with `value`, as a component would `yield`.
    ///
    /// # Errors
    /// Fails if no block was given, or with whatever the block fails with.
    pub fn call_block(&mut self, value: Value) -> CurlyResult<Value> {
        match self.block.as_mut() {
            Some(block) => block(value),
            None => Err(CurlyError::render("no block given (yield)")),
        }
    }
}

impl fmt::Debug for Arguments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("identifier", &self.identifier)
            .field("attributes", &self.attributes)
            .field("block", &self.block.is_some())
            .finish()
    }
}

/// A presenter instance bound to concrete data.
pub trait Presenter {
    /// Invokes a component. Only components the compiler validated against
    /// the presenter's type are ever called.
    ///
    /// # Errors
    /// Whatever the component fails with; the evaluator propagates it as is.
    fn call(&self, component: &str, arguments: Arguments<'_>) -> CurlyResult<Value>;
}

/// The fallback that presenters delegate exposed helpers to.
pub trait ExecutionContext {
    /// # Errors
    /// Fails when the helper is unknown or the helper itself fails.
    fn call_helper(&self, name: &str, arguments: Arguments<'_>) -> CurlyResult<Value>;
}

/// An execution context without any helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullContext;

impl ExecutionContext for NullContext {
    fn call_helper(&self, name: &str, _arguments: Arguments<'_>) -> CurlyResult<Value> {
        Err(CurlyError::render(format!("undefined helper `{name}`")))
    }
}

/// Compile-time knowledge about a kind of presenter.
pub trait PresenterType: fmt::Debug + Send + Sync {
    /// The type's name, used in error messages and logs.
    fn name(&self) -> &str;

    /// Identifies the type for program caching. Handles with equal identity
    /// must validate and render every template the same way, and the value
    /// must stay unique while any handle is alive.
    fn identity(&self) -> usize;

    /// Whether `name` is a publicly invokable, non-reserved component.
    fn component_available(&self, name: &str) -> bool;

    fn signature_of(&self, name: &str) -> Option<Signature>;

    /// The presenter type that handles the items of collection `name`, or
    /// the value of context `name`.
    fn nested_presenter_for(&self, name: &str) -> Option<Arc<dyn PresenterType>>;

    /// Builds a presenter from an options bag.
    ///
    /// # Errors
    /// Fails when a name the presenter requires is missing from `options`.
    fn instantiate(
        &self,
        context: &Rc<dyn ExecutionContext>,
        options: &Options,
    ) -> CurlyResult<Rc<dyn Presenter>>;
}
