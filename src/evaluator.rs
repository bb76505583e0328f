use std::{ops::Range, rc::Rc, sync::Arc};

use crate::{
    compiler::CollectionCoercion,
    error::{CurlyError, CurlyResult},
    presenter::{Arguments, BlockFn, ExecutionContext, NullContext, Presenter, PresenterType},
    program::{Begin, BlockStep, Invocation, Program, Step},
    value::{Options, Value},
};

/// A presenter binding on the runtime stack.
struct Scope {
    presenter: Rc<dyn Presenter>,
    options: Options,
}

/// Runs a [`Program`] against concrete presenters.
///
/// One evaluator serves one render; the scope stack is never shared.
pub struct Evaluator<'p, 'b> {
    program: &'p Program,
    context: Rc<dyn ExecutionContext>,
    block: Option<&'b mut BlockFn<'b>>,
    scopes: Vec<Scope>,
}

impl<'p, 'b> Evaluator<'p, 'b> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            context: Rc::new(NullContext),
            block: None,
            scopes: Vec::new(),
        }
    }

    /// Sets the fallback that exposed helpers are resolved on.
    #[must_use]
    pub fn with_context(mut self, context: Rc<dyn ExecutionContext>) -> Self {
        self.context = context;
        self
    }

    /// Sets the block that components taking a block may yield to.
    #[must_use]
    pub fn with_block(mut self, block: &'b mut BlockFn<'b>) -> Self {
        self.block = Some(block);
        self
    }

    /// Instantiates the program's presenter from `options` and renders.
    ///
    /// # Errors
    /// Fails when the presenter cannot be instantiated, or with the first
    /// error raised by a component.
    pub fn evaluate(self, options: Options) -> CurlyResult<String> {
        let presenter = self.program.presenter.instantiate(&self.context, &options)?;
        self.evaluate_with(presenter, options)
    }

    /// Renders with an already built root presenter.
    ///
    /// # Errors
    /// The first error raised by a component.
    pub fn evaluate_with(
        mut self,
        presenter: Rc<dyn Presenter>,
        options: Options,
    ) -> CurlyResult<String> {
        self.scopes.push(Scope { presenter, options });

        let mut output = String::new();
        self.execute(0..self.program.steps.len(), &mut output)?;
        Ok(output)
    }

    fn scope(&self) -> CurlyResult<&Scope> {
        self.scopes
            .last()
            .ok_or_else(|| CurlyError::render("no presenter in scope"))
    }

    fn execute(&mut self, range: Range<usize>, output: &mut String) -> CurlyResult<()> {
        let program = self.program;
        let mut at = range.start;

        while at < range.end {
            let Some(step) = program.steps.get(at) else {
                return Err(CurlyError::render(format!("step {at} is out of range")));
            };

            at = match step {
                Step::Literal(text) => {
                    output.push_str(text);
                    at.saturating_add(1)
                }
                Step::Emit(call) => {
                    self.invoke(call)?.write_escaped(output);
                    at.saturating_add(1)
                }
                Step::Begin(begin) => {
                    self.execute_block(at, begin, output)?;
                    begin.end_at.saturating_add(1)
                }
                Step::Else | Step::End => at.saturating_add(1),
            };
        }

        Ok(())
    }

    /// Calls a component on the presenter in scope, forwarding the caller's
    /// block if the component takes one.
    fn invoke(&mut self, call: &Invocation) -> CurlyResult<Value> {
        let presenter = Rc::clone(&self.scope()?.presenter);
        let identifier = call.identifier.as_deref();

        match self.block.as_mut() {
            Some(block) if call.forwards_block => {
                let mut forward = |value: Value| block(value);
                presenter.call(
                    &call.name,
                    Arguments::new(identifier, &call.attributes, Some(&mut forward)),
                )
            }
            Some(_) | None => {
                presenter.call(&call.name, Arguments::new(identifier, &call.attributes, None))
            }
        }
    }

    fn execute_block(&mut self, at: usize, begin: &Begin, output: &mut String) -> CurlyResult<()> {
        let body = at.saturating_add(1)..begin.else_at.unwrap_or(begin.end_at);
        let else_body = begin
            .else_at
            .map_or(begin.end_at..begin.end_at, |else_at| {
                else_at.saturating_add(1)..begin.end_at
            });

        match &begin.block {
            BlockStep::Conditional | BlockStep::Inverse => {
                let truthy = self.invoke(&begin.call)?.is_truthy();
                let negate = matches!(begin.block, BlockStep::Inverse);
                if truthy != negate {
                    self.execute(body, output)
                } else {
                    self.execute(else_body, output)
                }
            }
            BlockStep::Collection { presenter, item } => {
                let value = self.invoke(&begin.call)?;
                let items = self.coerce(&begin.call.name, value)?;
                if items.is_empty() {
                    return self.execute(else_body, output);
                }
                self.execute_collection(presenter, item, items, body, output)
            }
            BlockStep::Context { presenter, name } => {
                let value = self.execute_context(&begin.call, presenter, name, body)?;
                value.write_escaped(output);
                Ok(())
            }
        }
    }

    fn coerce(&self, name: &str, value: Value) -> CurlyResult<Vec<Value>> {
        match (value, self.program.coercion) {
            (Value::List(items), _) => Ok(items),
            (Value::Nil, CollectionCoercion::WrapSingleton) => Ok(Vec::new()),
            (value, CollectionCoercion::WrapSingleton) => Ok(vec![value]),
            (_, CollectionCoercion::Reject) => Err(CurlyError::render(format!(
                "`{name}` did not return a list"
            ))),
        }
    }

    fn execute_collection(
        &mut self,
        presenter: &Arc<dyn PresenterType>,
        item: &str,
        items: Vec<Value>,
        body: Range<usize>,
        output: &mut String,
    ) -> CurlyResult<()> {
        let parent = self.scope()?.options.clone();
        let counter = format!("{item}_counter");

        for (counter_value, value) in (1_i64..).zip(items) {
            let mut options = parent.clone();
            options.insert(item.to_string(), value);
            options.insert(counter.clone(), Value::Int(counter_value));

            let instance = presenter.instantiate(&self.context, &options)?;
            self.scopes.push(Scope {
                presenter: instance,
                options,
            });
            let result = self.execute(body.clone(), output);
            self.scopes.pop();
            result?;
        }

        Ok(())
    }

    /// Invokes a context component with the block body as its block. Each
    /// value the component yields renders the body under a fresh `presenter`,
    /// and the rendered markup is handed back as the block's result.
    fn execute_context(
        &mut self,
        call: &Invocation,
        presenter: &Arc<dyn PresenterType>,
        name: &str,
        body: Range<usize>,
    ) -> CurlyResult<Value> {
        let scope = self.scope()?;
        let component = Rc::clone(&scope.presenter);
        let parent = scope.options.clone();

        let mut render_body = |value: Value| -> CurlyResult<Value> {
            let mut options = parent.clone();
            options.insert(name.to_string(), value);

            let instance = presenter.instantiate(&self.context, &options)?;
            self.scopes.push(Scope {
                presenter: instance,
                options,
            });
            let mut nested = String::new();
            let result = self.execute(body.clone(), &mut nested);
            self.scopes.pop();
            result?;

            Ok(Value::Safe(nested))
        };

        component.call(
            &call.name,
            Arguments::new(
                call.identifier.as_deref(),
                &call.attributes,
                Some(&mut render_body),
            ),
        )
    }
}

/// Renders `program` with its presenter instantiated from `options`.
///
/// # Errors
/// Fails when the presenter cannot be instantiated, or with the first error
/// raised by a component.
pub fn render(program: &Program, options: Options) -> CurlyResult<String> {
    Evaluator::new(program).evaluate(options)
}
