use super::pattern::PatternCompiler;
use super::route::{MethodSet, Route, join_paths};
use crate::handler::Handler;
use std::sync::Arc;

/// An ordered, prefixable, mountable group of routes.
///
/// Insertion order is match-priority order. Mounted child collections keep
/// their position in the sequence: at freeze the child's flattened routes
/// are spliced in exactly where the child was mounted.
///
/// Freezing is depth-first and idempotent. Once frozen, the collection is a
/// flat, ordered, immutable route table and every mutator panics.
pub struct RouteCollection {
    prefix: String,
    entries: Vec<Entry>,
    frozen: bool,
    flattened: Vec<Arc<Route>>,
}

enum Entry {
    Route(Route),
    Collection(RouteCollection),
}

impl RouteCollection {
    pub fn new() -> Self {
        Self { prefix: String::new(), entries: Vec::new(), frozen: false, flattened: Vec::new() }
    }

    /// The path prefix, final once the owning collection has frozen.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of routes registered directly on this collection.
    pub fn route_count(&self) -> usize {
        self.entries.iter().filter(|entry| matches!(entry, Entry::Route(_))).count()
    }

    /// Appends a pre-built route.
    pub fn add_route(&mut self, route: Route) -> &mut Route {
        self.assert_unfrozen();
        self.entries.push(Entry::Route(route));
        match self.entries.last_mut() {
            Some(Entry::Route(route)) => route,
            _ => unreachable!("just pushed a route entry"),
        }
    }

    fn route(&mut self, path: &str, methods: MethodSet, passthrough: bool, handler: Box<dyn Handler>) -> &mut Route {
        let mut route = Route::with_methods(path, methods, passthrough);
        route.add_handler(handler);
        self.add_route(route)
    }

    /// Appends a route accepting any method.
    pub fn all(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.route(path, MethodSet::Any, false, Box::new(handler))
    }

    /// Appends a passthrough (middleware) route: it matches `path` as a
    /// prefix and never terminates matching by itself.
    pub fn middleware(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.route(path, MethodSet::Any, true, Box::new(handler))
    }

    /// Mounts `child` under `prefix`, deferring prefix resolution until
    /// freeze. Taking the child by value, a collection can only ever be
    /// mounted once.
    pub fn mount(&mut self, prefix: impl Into<String>, mut child: RouteCollection) {
        self.assert_unfrozen();
        assert!(!child.frozen, "cannot mount a frozen route collection");
        child.prefix = join_paths(&prefix.into(), &child.prefix);
        self.entries.push(Entry::Collection(child));
    }

    /// Freezes depth-first and returns the flat, ordered route table.
    ///
    /// Children resolve their full prefix and freeze before their routes
    /// are spliced into the parent's table. Calling this twice returns the
    /// cached table without recompiling anything.
    pub(crate) fn freeze(&mut self, compiler: &PatternCompiler) -> Vec<Arc<Route>> {
        if self.frozen {
            return self.flattened.clone();
        }
        self.frozen = true;

        let prefix = self.prefix.clone();
        let mut flattened = Vec::new();
        for entry in std::mem::take(&mut self.entries) {
            match entry {
                Entry::Route(mut route) => {
                    route.apply_prefix(&prefix);
                    route.freeze(compiler);
                    flattened.push(Arc::new(route));
                }
                Entry::Collection(mut child) => {
                    child.prefix = join_paths(&prefix, &child.prefix);
                    flattened.extend(child.freeze(compiler));
                }
            }
        }
        self.flattened = flattened.clone();
        flattened
    }

    fn assert_unfrozen(&self) {
        assert!(!self.frozen, "route collection is frozen: routes must be declared before the application boots");
    }
}

impl Default for RouteCollection {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! method_route {
    ($method:ident, $method_name:literal) => {
        #[doc = concat!("Appends a `", $method_name, "` route; handlers run in registration order.")]
        pub fn $method(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
            self.route(path, MethodSet::from_names(&[$method_name]), false, Box::new(handler))
        }
    };
}

impl RouteCollection {
    method_route!(get, "GET");
    method_route!(post, "POST");
    method_route!(put, "PUT");
    method_route!(delete, "DELETE");
}
