use std::{collections::HashMap, rc::Rc, sync::Arc};

use crate::{
    cache::ProgramCache,
    class::{ComponentDescription, Registry},
    compiler::CompileOptions,
    error::{CurlyError, CurlyResult},
    interface::CurlyInterface,
    presenter::{BlockFn, ExecutionContext},
    template::Template,
    value::Options,
};

/// `CurlyEngine` is the primary implementation of the `CurlyInterface` trait.
///
/// Templates are registered by path; the path names the presenter the
/// template is compiled against (`dashboards/show` is presented by
/// `Dashboards::ShowPresenter`). Compiled programs are shared through a
/// [`ProgramCache`], so identical sources for the same presenter compile once.
///
/// # Examples
///
/// ```
/// use curly::{CurlyEngine, CurlyInterface, Options, PresenterClass, Registry, Value};
///
/// let registry = Registry::new().with(
///     PresenterClass::builder("Books::ShowPresenter")
///         .presents("book")
///         .reader("book")
///         .build(),
/// );
///
/// // Create a new engine
/// let mut engine = CurlyEngine::new(registry);
///
/// // Add a template
/// engine.add_template("books/show", "Now reading: {{book}}").unwrap();
///
/// // Render template
/// let mut options = Options::new();
/// options.insert("book".to_string(), Value::from("Dune"));
/// let output = engine.render("books/show", options).unwrap();
/// assert_eq!(output, "Now reading: Dune");
/// ```
#[derive(Debug)]
pub struct CurlyEngine {
    registry: Arc<Registry>,
    cache: ProgramCache,
    templates: HashMap<String, Template>,
}

impl CurlyEngine {
    /// Creates a new engine with no templates, using the default
    /// [`CompileOptions`].
    pub fn new<R: Into<Arc<Registry>>>(registry: R) -> Self {
        Self::with_options(registry, CompileOptions::default())
    }

    pub fn with_options<R: Into<Arc<Registry>>>(registry: R, options: CompileOptions) -> Self {
        Self {
            registry: registry.into(),
            cache: ProgramCache::with_options(options),
            templates: HashMap::new(),
        }
    }

    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn template<N: AsRef<str>>(&self, template_name: N) -> Option<&Template> {
        self.templates.get(template_name.as_ref())
    }

    fn get(&self, name: &str) -> CurlyResult<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| CurlyError::MissingTemplate {
                template_name: name.to_string(),
            })
    }

    fn insert(&mut self, name: &str, template: Template) -> CurlyResult<()> {
        if self.templates.contains_key(name) {
            return Err(CurlyError::TemplateExists {
                template_name: name.to_string(),
            });
        }
        log::debug!(
            "added template `{name}` presented by `{}`",
            template.presenter().name()
        );
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Adds a template under `name`, compiled against the presenter
    /// registered as `presenter` rather than the one `name` resolves to.
    ///
    /// # Errors
    /// Same as [`CurlyInterface::add_template`].
    pub fn add_template_for<N: AsRef<str>, C: Into<String>>(
        &mut self,
        name: N,
        content: C,
        presenter: &str,
    ) -> CurlyResult<()> {
        let name = name.as_ref();
        if self.templates.contains_key(name) {
            return Err(CurlyError::TemplateExists {
                template_name: name.to_string(),
            });
        }

        let presenter = self.registry.presenter(presenter)?;
        let template = Template::cached(name, content, &presenter, &self.cache)?;
        self.insert(name, template)
    }

    /// Renders a template with an execution context for exposed helpers and
    /// an optional block that components such as layouts may yield to.
    ///
    /// # Errors
    /// Same as [`CurlyInterface::render`].
    pub fn render_with<'b, N: AsRef<str>>(
        &self,
        template_name: N,
        options: Options,
        context: Rc<dyn ExecutionContext>,
        block: Option<&'b mut BlockFn<'b>>,
    ) -> CurlyResult<String> {
        self.get(template_name.as_ref())?
            .render_with(options, context, block)
    }
}

impl CurlyInterface for CurlyEngine {
    /// Adds a new template to the engine, compiled against the presenter
    /// its path resolves to.
    ///
    /// # Examples
    ///
    /// ```
    /// use curly::{CurlyEngine, CurlyError, CurlyInterface, Registry};
    ///
    /// let mut engine = CurlyEngine::new(Registry::new());
    /// assert!(matches!(
    ///     engine.add_template("missing/show", "hello"),
    ///     Err(CurlyError::PresenterNotFound { .. })
    /// ));
    /// ```
    fn add_template<N: AsRef<str>, C: Into<String>>(
        &mut self,
        path: N,
        content: C,
    ) -> CurlyResult<()> {
        let path = path.as_ref();
        if self.templates.contains_key(path) {
            return Err(CurlyError::TemplateExists {
                template_name: path.to_string(),
            });
        }

        let presenter = self.registry.presenter_for_path(path)?;
        let template = Template::cached(path, content, &presenter, &self.cache)?;
        self.insert(path, template)
    }

    fn render<N: AsRef<str>>(&self, template_name: N, options: Options) -> CurlyResult<String> {
        self.get(template_name.as_ref())?.render(options)
    }

    fn components<N: AsRef<str>>(
        &self,
        template_name: N,
    ) -> CurlyResult<Vec<ComponentDescription>> {
        let template = self.get(template_name.as_ref())?;
        self.registry.describe(template.presenter().name())
    }
}
