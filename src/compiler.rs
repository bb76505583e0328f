use std::{collections::HashMap, sync::Arc};

use crate::{
    ast::{Block, BlockKind, ComponentRef, Node},
    attribute::AttributeQuoting,
    class::singularize,
    error::{CurlyError, CurlyResult},
    parser::parse,
    presenter::{IdentifierPolicy, PresenterType, Signature},
    program::{Begin, BlockStep, Invocation, Program, Step},
    scanner::scan_with,
};

/// What a collection block does with a result that is not a list.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum CollectionCoercion {
    /// Treat the value as a one-item list, and `Nil` as an empty one.
    #[default]
    WrapSingleton,
    /// Fail the render.
    Reject,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompileOptions {
    pub collection_coercion: CollectionCoercion,
    pub attribute_quoting: AttributeQuoting,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_collection_coercion(mut self, coercion: CollectionCoercion) -> Self {
        self.collection_coercion = coercion;
        self
    }

    #[must_use]
    pub const fn with_attribute_quoting(mut self, quoting: AttributeQuoting) -> Self {
        self.attribute_quoting = quoting;
        self
    }
}

struct Compiler {
    steps: Vec<Step>,
    /// Presenter types of the enclosing collection and context blocks.
    scopes: Vec<Arc<dyn PresenterType>>,
    signatures: HashMap<(String, String), Signature>,
}

impl Compiler {
    fn new(presenter: Arc<dyn PresenterType>) -> Self {
        Self {
            steps: Vec::new(),
            scopes: vec![presenter],
            signatures: HashMap::new(),
        }
    }

    fn presenter(&self) -> CurlyResult<&Arc<dyn PresenterType>> {
        self.scopes
            .last()
            .ok_or_else(|| CurlyError::compile("no presenter in scope"))
    }

    fn compile_nodes(&mut self, nodes: &[Node]) -> CurlyResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.literal(text),
                Node::Comment(_) => log::trace!("skipping comment"),
                Node::Component(component) => {
                    log::trace!("compiling component `{component}`");
                    let (call, _) = self.invocation(component)?;
                    self.steps.push(Step::Emit(call));
                }
                Node::Block(block) => {
                    log::trace!("compiling {:?} block `{}`", block.kind, block.component);
                    match block.kind {
                        BlockKind::Conditional => self.compile_conditional(block, false)?,
                        BlockKind::InverseConditional => self.compile_conditional(block, true)?,
                        BlockKind::Collection => self.compile_collection(block)?,
                        BlockKind::Context => self.compile_context(block)?,
                    }
                }
            }
        }
        Ok(())
    }

    /// Adjacent text is merged into one step.
    fn literal(&mut self, text: &str) {
        if let Some(Step::Literal(previous)) = self.steps.last_mut() {
            previous.push_str(text);
        } else {
            self.steps.push(Step::Literal(text.to_string()));
        }
    }

    fn signature(&mut self, component: &ComponentRef) -> CurlyResult<Signature> {
        let presenter = Arc::clone(self.presenter()?);
        let name = component.name.as_str();

        if !presenter.component_available(name) {
            return Err(CurlyError::InvalidComponent {
                component: name.to_string(),
            });
        }

        let key = (presenter.name().to_string(), name.to_string());
        if let Some(signature) = self.signatures.get(&key) {
            return Ok(signature.clone());
        }

        let signature =
            presenter
                .signature_of(name)
                .ok_or_else(|| CurlyError::InvalidComponent {
                    component: name.to_string(),
                })?;
        self.signatures.insert(key, signature.clone());
        Ok(signature)
    }

    /// Validates `component` against the presenter in scope.
    fn invocation(&mut self, component: &ComponentRef) -> CurlyResult<(Invocation, Signature)> {
        let signature = self.signature(component)?;
        let name = component.name.as_str();

        if !signature.is_valid() {
            return Err(CurlyError::compile(format!(
                "`{name}` is not a valid component method"
            )));
        }

        if !signature.accepts_keyword_collection() {
            let specs = signature.attributes();
            if let Some(key) = component
                .attributes
                .keys()
                .find(|key| !specs.iter().any(|spec| &spec.name == *key))
            {
                return Err(CurlyError::compile(format!(
                    "`{name}` does not allow attribute `{key}`"
                )));
            }
        }

        if let Some(spec) = signature
            .attributes()
            .into_iter()
            .find(|spec| spec.required && !component.attributes.contains_key(&spec.name))
        {
            return Err(CurlyError::compile(format!(
                "`{name}` is missing the required attribute `{}`",
                spec.name
            )));
        }

        match (signature.identifier_policy(), &component.identifier) {
            (IdentifierPolicy::Required, None) => {
                return Err(CurlyError::compile(format!(
                    "`{name}` requires an identifier"
                )));
            }
            (IdentifierPolicy::None, Some(_)) => {
                return Err(CurlyError::compile(format!(
                    "`{name}` does not take an identifier"
                )));
            }
            (IdentifierPolicy::Required | IdentifierPolicy::Optional, _)
            | (IdentifierPolicy::None, None) => {}
        }

        let call = Invocation {
            name: name.to_string(),
            identifier: component.identifier.clone(),
            attributes: component.attributes.clone(),
            forwards_block: signature.accepts_block(),
        };
        Ok((call, signature))
    }

    fn begin(&mut self, block: BlockStep, call: Invocation) -> usize {
        let at = self.steps.len();
        self.steps.push(Step::Begin(Begin {
            block,
            call,
            else_at: None,
            end_at: at,
        }));
        at
    }

    fn mark_else(&mut self) -> usize {
        let at = self.steps.len();
        self.steps.push(Step::Else);
        at
    }

    fn end(&mut self, begin_at: usize, else_at: Option<usize>) {
        let end_at = self.steps.len();
        self.steps.push(Step::End);
        if let Some(Step::Begin(begin)) = self.steps.get_mut(begin_at) {
            begin.else_at = else_at;
            begin.end_at = end_at;
        }
    }

    fn compile_conditional(&mut self, block: &Block, negate: bool) -> CurlyResult<()> {
        if !block.component.name.ends_with('?') {
            return Err(CurlyError::compile(format!(
                "conditional components have to end in `?`, got `{}`",
                block.component.name
            )));
        }

        let (call, _) = self.invocation(&block.component)?;
        let kind = if negate {
            BlockStep::Inverse
        } else {
            BlockStep::Conditional
        };

        let begin_at = self.begin(kind, call);
        self.compile_nodes(&block.body)?;
        let else_at = self.compile_else(&block.else_body)?;
        self.end(begin_at, else_at);
        Ok(())
    }

    fn compile_else(&mut self, else_body: &[Node]) -> CurlyResult<Option<usize>> {
        if else_body.is_empty() {
            return Ok(None);
        }
        let else_at = self.mark_else();
        self.compile_nodes(else_body)?;
        Ok(Some(else_at))
    }

    fn compile_collection(&mut self, block: &Block) -> CurlyResult<()> {
        let (call, _) = self.invocation(&block.component)?;
        let name = block.component.name.as_str();
        let item = singularize(name);

        let presenter = self.presenter()?.nested_presenter_for(&item).ok_or_else(|| {
            CurlyError::compile(format!(
                "cannot enumerate `{name}`, could not find matching presenter class"
            ))
        })?;

        let begin_at = self.begin(
            BlockStep::Collection {
                presenter: Arc::clone(&presenter),
                item,
            },
            call,
        );

        self.scopes.push(presenter);
        let body = self.compile_nodes(&block.body);
        self.scopes.pop();
        body?;

        let else_at = self.compile_else(&block.else_body)?;
        self.end(begin_at, else_at);
        Ok(())
    }

    fn compile_context(&mut self, block: &Block) -> CurlyResult<()> {
        let (mut call, signature) = self.invocation(&block.component)?;
        let name = block.component.name.as_str();

        if !signature.accepts_block() {
            return Err(CurlyError::compile(format!(
                "`{name}` cannot be used as a context block, it does not accept a block"
            )));
        }
        // The body is the block; the caller's block is not forwarded.
        call.forwards_block = false;

        let presenter = self.presenter()?.nested_presenter_for(name).ok_or_else(|| {
            CurlyError::compile(format!(
                "cannot use context `{name}`, could not find matching presenter class"
            ))
        })?;

        let begin_at = self.begin(
            BlockStep::Context {
                presenter: Arc::clone(&presenter),
                name: name.to_string(),
            },
            call,
        );

        self.scopes.push(presenter);
        let body = self.compile_nodes(&block.body);
        self.scopes.pop();
        body?;

        self.end(begin_at, None);
        Ok(())
    }
}

/// Compiles a parsed template against `presenter`.
///
/// # Errors
/// The first validation failure; no partial program is returned.
pub fn compile_nodes(
    nodes: &[Node],
    presenter: &Arc<dyn PresenterType>,
    options: &CompileOptions,
) -> CurlyResult<Program> {
    let mut compiler = Compiler::new(Arc::clone(presenter));
    compiler.compile_nodes(nodes)?;

    log::debug!(
        "compiled template for `{}` into {} steps",
        presenter.name(),
        compiler.steps.len()
    );

    Ok(Program {
        presenter: Arc::clone(presenter),
        steps: compiler.steps,
        coercion: options.collection_coercion,
    })
}

/// Scans, parses and compiles `source` against `presenter`.
///
/// # Errors
/// Any syntax, block structure or component validation error.
pub fn compile_with(
    source: &str,
    presenter: &Arc<dyn PresenterType>,
    options: &CompileOptions,
) -> CurlyResult<Program> {
    let tokens = scan_with(source, options.attribute_quoting)?;
    let nodes = parse(tokens)?;
    compile_nodes(&nodes, presenter, options)
}

/// [`compile_with`] using the default [`CompileOptions`].
///
/// # Errors
/// Any syntax, block structure or component validation error.
pub fn compile(source: &str, presenter: &Arc<dyn PresenterType>) -> CurlyResult<Program> {
    compile_with(source, presenter, &CompileOptions::default())
}

/// Whether `source` compiles against `presenter`.
pub fn valid(source: &str, presenter: &Arc<dyn PresenterType>) -> bool {
    match compile(source, presenter) {
        Ok(_) => true,
        Err(err) => {
            log::debug!("template is not valid for `{}`: {err}", presenter.name());
            false
        }
    }
}
