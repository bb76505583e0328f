use std::{rc::Rc, sync::Arc};

use crate::{
    cache::ProgramCache,
    error::CurlyResult,
    evaluator::Evaluator,
    presenter::{BlockFn, ExecutionContext, PresenterType},
    program::Program,
    value::Options,
};

/// A Template is a named source compiled against one presenter type.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use curly::{Options, PresenterClass, Registry, Signature, Template};
///
/// let registry: Arc<Registry> = Registry::new()
///     .with(
///         PresenterClass::builder("BookPresenter")
///             .component("title", Signature::new(), |_, _| Ok("A Clockwork Orange".into()))
///             .build(),
///     )
///     .into();
/// let presenter = registry.presenter("BookPresenter").unwrap();
///
/// let template = Template::new("book", "<h1>{{title}}</h1>", &presenter).unwrap();
/// assert_eq!(
///     template.render(Options::new()).unwrap(),
///     "<h1>A Clockwork Orange</h1>"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
    program: Arc<Program>,
}

impl Template {
    /// Compiles `source` against `presenter`.
    ///
    /// # Errors
    /// Any syntax, block structure or component validation error.
    pub fn new<N: Into<String>, S: Into<String>>(
        name: N,
        source: S,
        presenter: &Arc<dyn PresenterType>,
    ) -> CurlyResult<Self> {
        Self::cached(name, source, presenter, &ProgramCache::new())
    }

    /// Like [`Template::new`], reusing programs already in `cache`.
    ///
    /// # Errors
    /// Any syntax, block structure or component validation error.
    pub fn cached<N: Into<String>, S: Into<String>>(
        name: N,
        source: S,
        presenter: &Arc<dyn PresenterType>,
        cache: &ProgramCache,
    ) -> CurlyResult<Self> {
        let source = source.into();
        let program = cache.get_or_compile(&source, presenter)?;
        Ok(Self {
            name: name.into(),
            source,
            program,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn presenter(&self) -> &Arc<dyn PresenterType> {
        self.program.presenter()
    }

    /// Renders with no helpers and no caller block.
    ///
    /// # Errors
    /// Fails when the presenter cannot be built from `options`, or with the
    /// first error raised by a component.
    pub fn render(&self, options: Options) -> CurlyResult<String> {
        Evaluator::new(&self.program).evaluate(options)
    }

    /// Renders with an execution context for exposed helpers and an optional
    /// caller block.
    ///
    /// # Errors
    /// Fails when the presenter cannot be built from `options`, or with the
    /// first error raised by a component.
    pub fn render_with<'b>(
        &self,
        options: Options,
        context: Rc<dyn ExecutionContext>,
        block: Option<&'b mut BlockFn<'b>>,
    ) -> CurlyResult<String> {
        let evaluator = Evaluator::new(&self.program).with_context(context);
        match block {
            Some(block) => evaluator.with_block(block).evaluate(options),
            None => evaluator.evaluate(options),
        }
    }
}
