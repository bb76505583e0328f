//! Curly: logic-less `{{...}}` HTML templates backed by presenters.
//!
//! A template is scanned, parsed into a block tree, then compiled against a
//! [`PresenterType`] into a [`Program`]. Every component a template names is
//! checked against the presenter at compile time, so a compiled program only
//! fails at render time when a component itself fails.
//!
//! ```
//! use std::sync::Arc;
//!
//! use curly::{Options, PresenterClass, Registry, Signature, Value};
//!
//! let registry: Arc<Registry> = Registry::new()
//!     .with(
//!         PresenterClass::builder("ArticlePresenter")
//!             .component("reverse", Signature::new().required("text"), |_, args| {
//!                 Ok(args.identifier().unwrap_or_default().chars().rev().collect::<String>().into())
//!             })
//!             .build(),
//!     )
//!     .into();
//! let presenter = registry.presenter("ArticlePresenter").unwrap();
//!
//! let program = curly::compile("{{reverse.123}}", &presenter).unwrap();
//! assert_eq!(curly::render(&program, Options::new()).unwrap(), "321");
//!
//! assert!(!curly::valid("{{missing}}", &presenter));
//! ```

mod ast;
mod attribute;
mod cache;
mod class;
mod compiler;
mod engine;
mod error;
mod evaluator;
mod interface;
mod parser;
mod presenter;
mod program;
mod scanner;
mod template;
mod value;

// Public exports.
pub use ast::{Block, BlockKind, ComponentRef, Node};
pub use attribute::{AttributeQuoting, Attributes, parse_attributes, parse_attributes_with};
pub use cache::ProgramCache;
pub use class::{
    ComponentDescription, ComponentKind, Instance, PresenterClass, PresenterClassBuilder,
    RESERVED_NAMES, Registry, presenter_name, presenter_name_for_path, singularize,
};
pub use compiler::{CollectionCoercion, CompileOptions, compile, compile_nodes, compile_with, valid};
pub use engine::CurlyEngine;
pub use error::{CurlyError, CurlyResult, SyntaxError};
pub use evaluator::{Evaluator, render};
pub use interface::CurlyInterface;
pub use parser::parse;
pub use presenter::{
    Arguments, AttributeSpec, BlockFn, ExecutionContext, IdentifierPolicy, NullContext, Parameter,
    Presenter, PresenterType, Signature,
};
pub use program::{Begin, BlockStep, Invocation, Program, Step};
pub use scanner::{Token, scan, scan_with};
pub use template::Template;
pub use value::{Options, Value, escape_html};
