use crate::{class::ComponentDescription, value::Options};

/// `CurlyInterface` is a trait for a store of named Curly templates, each
/// compiled once against the presenter its name resolves to.
pub trait CurlyInterface {
    /// `add_template` compiles a template and makes it available under `path`.
    ///
    /// # Errors
    /// - If a template is already registered under `path`.
    /// - If no presenter matches `path`.
    /// - If the template does not compile against that presenter.
    fn add_template<N: AsRef<str>, C: Into<String>>(
        &mut self,
        path: N,
        content: C,
    ) -> crate::CurlyResult<()>;

    /// `render` tries to render a template, building its presenter from
    /// `options`.
    ///
    /// # Errors
    /// - If the template name is not found.
    /// - If a name the presenter requires is missing from `options`.
    /// - If a component fails.
    fn render<N: AsRef<str>>(&self, template_name: N, options: Options)
    -> crate::CurlyResult<String>;

    /// `components` lists what the presenter behind a template offers, which
    /// is everything the template may reference at its top level.
    ///
    /// # Errors
    /// - If the template name is not found.
    fn components<N: AsRef<str>>(
        &self,
        template_name: N,
    ) -> crate::CurlyResult<Vec<ComponentDescription>>;
}
