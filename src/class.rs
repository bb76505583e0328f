//! Declarative presenters.
//!
//! A [`PresenterClass`] is built once from a list of components, presented
//! option names and exposed helpers, then registered by its fully qualified
//! name (`Dashboards::ItemPresenter`) in a [`Registry`]. Nested presenters for
//! collection and context blocks are found by naming convention:
//!
//! ```text
//! {{*items}} inside Dashboards::ShowPresenter looks up, in order:
//!   Dashboards::ShowPresenter::ItemPresenter
//!   Dashboards::ItemPresenter
//!   ItemPresenter
//! ```

use std::{fmt, rc::Rc, sync::Arc};

use heck::ToUpperCamelCase;
use indexmap::IndexMap;

use crate::{
    error::{CurlyError, CurlyResult},
    presenter::{
        Arguments, AttributeSpec, ExecutionContext, Presenter, PresenterType, Signature,
    },
    value::{Options, Value},
};

/// Names that are never available as components.
pub const RESERVED_NAMES: &[&str] = &["cache_key", "cache_duration", "presented_names"];

const NAMESPACE_SEPARATOR: &str = "::";
const PRESENTER_SUFFIX: &str = "Presenter";

type ComponentFn = dyn Fn(&Instance, Arguments<'_>) -> CurlyResult<Value> + Send + Sync;

struct Component {
    signature: Signature,
    call: Arc<ComponentFn>,
}

/// An immutable presenter descriptor.
pub struct PresenterClass {
    name: String,
    presents: IndexMap<String, Option<Value>>,
    components: IndexMap<String, Component>,
    helpers: IndexMap<String, Signature>,
}

impl PresenterClass {
    pub fn builder<T: Into<String>>(name: T) -> PresenterClassBuilder {
        PresenterClassBuilder {
            class: Self {
                name: name.into(),
                presents: IndexMap::new(),
                components: IndexMap::new(),
                helpers: IndexMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The option names this class captures, in declaration order.
    pub fn presented_names(&self) -> impl Iterator<Item = &str> {
        self.presents.keys().map(String::as_str)
    }

    pub fn component_available(&self, name: &str) -> bool {
        !RESERVED_NAMES.contains(&name)
            && (self.components.contains_key(name) || self.helpers.contains_key(name))
    }

    pub fn signature_of(&self, name: &str) -> Option<&Signature> {
        if RESERVED_NAMES.contains(&name) {
            return None;
        }
        self.components
            .get(name)
            .map(|c| &c.signature)
            .or_else(|| self.helpers.get(name))
    }

    /// Every available component name, declared components before helpers.
    pub fn available_components(&self) -> impl Iterator<Item = &str> {
        self.components
            .keys()
            .chain(self.helpers.keys())
            .map(String::as_str)
            .filter(|name| !RESERVED_NAMES.contains(name))
    }

    /// The enclosing namespaces of this class, innermost first, ending with
    /// the top level.
    fn scopes(&self) -> Vec<&str> {
        let mut scopes = vec![self.name.as_str()];
        let mut rest = self.name.as_str();
        while let Some((outer, _)) = rest.rsplit_once(NAMESPACE_SEPARATOR) {
            rest = outer;
            scopes.push(rest);
        }
        scopes.push("");
        scopes
    }
}

impl fmt::Debug for PresenterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterClass")
            .field("name", &self.name)
            .field("presents", &self.presents)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[must_use]
pub struct PresenterClassBuilder {
    class: PresenterClass,
}

impl PresenterClassBuilder {
    /// Captures a required option.
    pub fn presents<T: Into<String>>(mut self, name: T) -> Self {
        self.class.presents.insert(name.into(), None);
        self
    }

    /// Captures an option, falling back to `default` when it is absent.
    pub fn presents_with_default<T: Into<String>, V: Into<Value>>(
        mut self,
        name: T,
        default: V,
    ) -> Self {
        self.class
            .presents
            .insert(name.into(), Some(default.into()));
        self
    }

    pub fn component<T, F>(mut self, name: T, signature: Signature, call: F) -> Self
    where
        T: Into<String>,
        F: Fn(&Instance, Arguments<'_>) -> CurlyResult<Value> + Send + Sync + 'static,
    {
        self.class.components.insert(
            name.into(),
            Component {
                signature,
                call: Arc::new(call),
            },
        );
        self
    }

    /// A no-argument component returning the presented option of the same
    /// name.
    pub fn reader<T: Into<String>>(self, name: T) -> Self {
        let name = name.into();
        let key = name.clone();
        self.component(name, Signature::new(), move |presenter, _| {
            Ok(presenter.value(&key))
        })
    }

    /// Makes a helper of the execution context available as a component.
    pub fn exposes_helper<T: Into<String>>(mut self, name: T, signature: Signature) -> Self {
        self.class.helpers.insert(name.into(), signature);
        self
    }

    pub fn build(self) -> PresenterClass {
        self.class
    }
}

/// A presenter class bound to concrete options.
pub struct Instance {
    class: Arc<PresenterClass>,
    options: Options,
    context: Rc<dyn ExecutionContext>,
}

impl Instance {
    pub fn class(&self) -> &PresenterClass {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// The option `name`, or `Nil` when absent.
    pub fn value(&self, name: &str) -> Value {
        self.options.get(name).cloned().unwrap_or_default()
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    pub fn context(&self) -> &dyn ExecutionContext {
        self.context.as_ref()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Presenter for Instance {
    fn call(&self, component: &str, arguments: Arguments<'_>) -> CurlyResult<Value> {
        if let Some(c) = self.class.components.get(component) {
            return (c.call)(self, arguments);
        }
        if self.class.helpers.contains_key(component) {
            return self.context.call_helper(component, arguments);
        }
        Err(CurlyError::render(format!(
            "undefined component `{component}` for `{}`",
            self.class.name
        )))
    }
}

/// How a component is meant to be used in a template.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Value,
    Conditional,
    Collection,
    Context,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescription {
    pub name: String,
    pub kind: ComponentKind,
    /// Name and requiredness of the positional identifier, if any.
    pub identifier: Option<AttributeSpec>,
    pub attributes: Vec<AttributeSpec>,
    pub block: Option<String>,
}

/// All known presenter classes, by fully qualified name.
#[derive(Debug, Default)]
pub struct Registry {
    classes: IndexMap<String, Arc<PresenterClass>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class`, replacing any class of the same name.
    pub fn register(&mut self, class: PresenterClass) -> &mut Self {
        log::debug!("registering presenter `{}`", class.name);
        self.classes.insert(class.name.clone(), Arc::new(class));
        self
    }

    #[must_use]
    pub fn with(mut self, class: PresenterClass) -> Self {
        self.register(class);
        self
    }

    pub fn class(&self, name: &str) -> Option<&Arc<PresenterClass>> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The presenter type registered as `name`.
    ///
    /// # Errors
    /// [`CurlyError::PresenterNotFound`] when no such class is registered.
    pub fn presenter(self: &Arc<Self>, name: &str) -> CurlyResult<Arc<dyn PresenterType>> {
        self.handle(name)
            .map(|p| Arc::new(p) as Arc<dyn PresenterType>)
            .ok_or_else(|| CurlyError::PresenterNotFound {
                name: name.to_string(),
            })
    }

    /// Resolves a template path such as `dashboards/show` to the presenter
    /// `Dashboards::ShowPresenter`.
    ///
    /// # Errors
    /// [`CurlyError::PresenterNotFound`] when no such class is registered.
    pub fn presenter_for_path(self: &Arc<Self>, path: &str) -> CurlyResult<Arc<dyn PresenterType>> {
        self.presenter(&presenter_name_for_path(path))
    }

    fn handle(self: &Arc<Self>, name: &str) -> Option<RegisteredPresenter> {
        self.classes.get(name).map(|class| RegisteredPresenter {
            registry: Arc::clone(self),
            class: Arc::clone(class),
        })
    }

    /// Finds the class handling `name` as seen from inside `class`.
    fn resolve_nested(&self, class: &PresenterClass, name: &str) -> Option<&Arc<PresenterClass>> {
        let simple = presenter_name(name);
        class.scopes().into_iter().find_map(|scope| {
            if scope.is_empty() {
                self.classes.get(&simple)
            } else {
                self.classes
                    .get(&format!("{scope}{NAMESPACE_SEPARATOR}{simple}"))
            }
        })
    }

    /// Lists the components of the class registered as `name`.
    ///
    /// # Errors
    /// [`CurlyError::PresenterNotFound`] when no such class is registered.
    pub fn describe(&self, name: &str) -> CurlyResult<Vec<ComponentDescription>> {
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| CurlyError::PresenterNotFound {
                name: name.to_string(),
            })?;

        Ok(class
            .available_components()
            .filter_map(|component| {
                let signature = class.signature_of(component)?;
                Some(ComponentDescription {
                    name: component.to_string(),
                    kind: self.kind_of(class, component, signature),
                    identifier: signature.identifier().map(|(name, required)| AttributeSpec {
                        name: name.to_string(),
                        required,
                    }),
                    attributes: signature.attributes(),
                    block: signature.block_name().map(str::to_string),
                })
            })
            .collect())
    }

    fn kind_of(&self, class: &PresenterClass, name: &str, signature: &Signature) -> ComponentKind {
        if name.ends_with('?') {
            return ComponentKind::Conditional;
        }
        if signature.accepts_block() && self.resolve_nested(class, name).is_some() {
            return ComponentKind::Context;
        }
        let singular = singularize(name);
        if singular != name && self.resolve_nested(class, &singular).is_some() {
            return ComponentKind::Collection;
        }
        ComponentKind::Value
    }
}

/// A registered class together with the registry it resolves nested
/// presenters in.
struct RegisteredPresenter {
    registry: Arc<Registry>,
    class: Arc<PresenterClass>,
}

impl fmt::Debug for RegisteredPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegisteredPresenter")
            .field(&self.class.name)
            .finish()
    }
}

impl PresenterType for RegisteredPresenter {
    fn name(&self) -> &str {
        &self.class.name
    }

    /// Every registration allocates its own class, so two registries
    /// declaring the same name never share an identity.
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.class).addr()
    }

    fn component_available(&self, name: &str) -> bool {
        self.class.component_available(name)
    }

    fn signature_of(&self, name: &str) -> Option<Signature> {
        self.class.signature_of(name).cloned()
    }

    fn nested_presenter_for(&self, name: &str) -> Option<Arc<dyn PresenterType>> {
        let class = self.registry.resolve_nested(&self.class, name)?;
        Some(Arc::new(Self {
            registry: Arc::clone(&self.registry),
            class: Arc::clone(class),
        }))
    }

    fn instantiate(
        &self,
        context: &Rc<dyn ExecutionContext>,
        options: &Options,
    ) -> CurlyResult<Rc<dyn Presenter>> {
        let mut options = options.clone();
        for (name, default) in &self.class.presents {
            if options.contains_key(name) {
                continue;
            }
            match default {
                Some(value) => {
                    options.insert(name.clone(), value.clone());
                }
                None => {
                    return Err(CurlyError::MissingPresentedName {
                        presenter: self.class.name.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(Rc::new(Instance {
            class: Arc::clone(&self.class),
            options,
            context: Rc::clone(context),
        }))
    }
}

/// `line_items?` becomes `LineItemsPresenter`.
pub fn presenter_name(name: &str) -> String {
    let mut camel = name.trim_end_matches('?').to_upper_camel_case();
    camel.push_str(PRESENTER_SUFFIX);
    camel
}

/// `dashboards/show` becomes `Dashboards::ShowPresenter`.
pub fn presenter_name_for_path(path: &str) -> String {
    let mut name = path
        .trim_matches('/')
        .split('/')
        .map(ToUpperCamelCase::to_upper_camel_case)
        .collect::<Vec<_>>()
        .join(NAMESPACE_SEPARATOR);
    name.push_str(PRESENTER_SUFFIX);
    name
}

/// Singular of a snake_case collection name; only the last word changes, so
/// `line_people` becomes `line_person`.
pub fn singularize(name: &str) -> String {
    match name.rsplit_once('_') {
        Some((stem, last)) => format!("{stem}_{}", facet_singularize::singularize(last)),
        None => facet_singularize::singularize(name),
    }
}
