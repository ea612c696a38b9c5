use super::pattern::{CompiledPattern, PatternCompiler, validate_assertion};
use crate::fn_trait::FnTrait;
use crate::handler::{Converter, FnConverter, Handler};
use crate::injector::Inject;
use http::Method;
use std::collections::HashMap;

/// The HTTP methods a route accepts.
#[derive(Debug, Clone)]
pub(crate) enum MethodSet {
    /// The `*` wildcard: every method is admitted.
    Any,
    Methods(Vec<Method>),
}

impl MethodSet {
    /// Builds a method set from names, upper-casing them on the way in.
    /// `"*"` anywhere in the list makes the set a wildcard.
    ///
    /// # Panics
    ///
    /// Panics on a name that is not a valid HTTP method, since a bogus
    /// method list is a configuration fault.
    pub(crate) fn from_names(names: &[&str]) -> Self {
        if names.iter().any(|name| *name == "*") {
            return MethodSet::Any;
        }
        let methods = names
            .iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                    .unwrap_or_else(|_| panic!("`{name}` is not a valid HTTP method"))
            })
            .collect();
        MethodSet::Methods(methods)
    }

    /// Whether `method` is admitted. A `GET` registration also admits
    /// `HEAD`, matching standard HTTP semantics.
    pub(crate) fn admits(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Methods(methods) => methods
                .iter()
                .any(|candidate| candidate == method || (*candidate == Method::GET && *method == Method::HEAD)),
        }
    }
}

/// A single method-set + path-pattern + handler-chain binding.
///
/// Routes are configured through chainable setters while the owning
/// collection is still mutable; freezing compiles the pattern exactly once
/// and locks every setter.
pub struct Route {
    path: String,
    methods: MethodSet,
    handlers: Vec<Box<dyn Handler>>,
    converters: Vec<(String, Box<dyn Converter>)>,
    assertions: HashMap<String, String>,
    name: String,
    passthrough: bool,
    frozen: bool,
    compiled: Option<CompiledPattern>,
}

impl Route {
    /// Creates a route for `path` accepting every method. Handlers are
    /// attached by the collection the route is added to.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_methods(path, MethodSet::Any, false)
    }

    pub(crate) fn with_methods(path: impl Into<String>, methods: MethodSet, passthrough: bool) -> Self {
        Self {
            path: path.into(),
            methods,
            handlers: Vec::new(),
            converters: Vec::new(),
            assertions: HashMap::new(),
            name: String::new(),
            passthrough,
            frozen: false,
            compiled: None,
        }
    }

    /// The path template, including any mount prefixes applied at freeze.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The route name: explicitly set, or derived from the path at freeze.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Names this route.
    ///
    /// # Panics
    ///
    /// Panics when the route is frozen.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.assert_unfrozen("set_name");
        self.name = name.into();
        self
    }

    /// Replaces the accepted method list. `"*"` accepts every method.
    ///
    /// # Panics
    ///
    /// Panics when the route is frozen or a name is not a valid method.
    pub fn set_methods(&mut self, methods: &[&str]) -> &mut Self {
        self.assert_unfrozen("set_methods");
        self.methods = MethodSet::from_names(methods);
        self
    }

    /// Constrains the variable `var` to match `pattern` instead of the
    /// default word-characters sub-pattern. A request value that does not
    /// match turns into a routing miss for this route.
    ///
    /// # Panics
    ///
    /// Panics when the route is frozen or `pattern` is not a valid regex;
    /// a bad assertion must surface at registration time, not on the first
    /// request.
    pub fn assert(&mut self, var: &str, pattern: &str) -> &mut Self {
        self.assert_unfrozen("assert");
        if let Err(error) = validate_assertion(var, pattern) {
            panic!("{error}");
        }
        self.assertions.insert(var.to_string(), pattern.to_string());
        self
    }

    /// Registers a converter for the variable `var`.
    ///
    /// The converter is an injectable async fn; its [`RawVar`] parameter
    /// receives the raw matched string and its return value is stored in
    /// the context's converted-variable map under `var`.
    ///
    /// [`RawVar`]: crate::RawVar
    ///
    /// # Panics
    ///
    /// Panics when the route is frozen.
    pub fn convert<F, Args>(&mut self, var: &str, converter: F) -> &mut Self
    where
        F: FnTrait<Args> + 'static,
        Args: Inject,
        F::Output: Send + Sync + 'static,
    {
        self.assert_unfrozen("convert");
        self.converters.push((var.to_string(), Box::new(FnConverter::new(converter))));
        self
    }

    pub(crate) fn add_handler(&mut self, handler: Box<dyn Handler>) {
        self.assert_unfrozen("adding a handler");
        self.handlers.push(handler);
    }

    pub(crate) fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }

    pub(crate) fn converter_for(&self, var: &str) -> Option<&dyn Converter> {
        // the latest registration for a variable wins
        self.converters.iter().rev().find(|(name, _)| name.as_str() == var).map(|(_, converter)| converter.as_ref())
    }

    pub(crate) fn admits_method(&self, method: &Method) -> bool {
        self.methods.admits(method)
    }

    pub(crate) fn apply_prefix(&mut self, prefix: &str) {
        self.path = join_paths(prefix, &self.path);
    }

    /// Compiles the pattern and locks the route. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics when the template does not compile; the route table must be
    /// valid before the first request is served.
    pub(crate) fn freeze(&mut self, compiler: &PatternCompiler) {
        if self.frozen {
            return;
        }
        let compiled = compiler
            .compile(&self.path, &self.assertions, self.passthrough)
            .unwrap_or_else(|error| panic!("{error}"));
        if self.name.is_empty() {
            self.name = derive_name(&self.path);
        }
        self.compiled = Some(compiled);
        self.frozen = true;
    }

    /// The compiled pattern. Only available once the route is frozen.
    pub(crate) fn compiled(&self) -> &CompiledPattern {
        self.compiled.as_ref().expect("route is not frozen yet")
    }

    fn assert_unfrozen(&self, operation: &str) {
        assert!(
            !self.frozen,
            "route `{}` is frozen: {} must happen before the application boots",
            if self.name.is_empty() { &self.path } else { &self.name },
            operation
        );
    }
}

/// Joins a mount prefix and a route path, collapsing the doubled slash and
/// the trailing slash of `prefix + "/"`.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    let mut joined = prefix.trim_end_matches('/').to_string();
    if !path.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(path);
    while joined.len() > 1 && joined.ends_with('/') {
        joined.pop();
    }
    if joined.is_empty() { "/".to_string() } else { joined }
}

fn derive_name(path: &str) -> String {
    let name: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() { "root".to_string() } else { name }
}
