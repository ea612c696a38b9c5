use super::route::Route;
use http::Method;
use std::sync::Arc;

/// Matches inbound requests against the frozen, flat route table.
///
/// Built once at boot and shared read-only across all requests.
pub struct RequestMatcher {
    routes: Vec<Arc<Route>>,
}

impl RequestMatcher {
    pub(crate) fn new(routes: Vec<Arc<Route>>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// The first route admitting the method whose pattern matches the path.
    pub fn match_first(&self, method: &Method, path: &str) -> Option<Arc<Route>> {
        self.routes.iter().find(|route| route.admits_method(method) && route.compiled().is_match(path)).cloned()
    }

    /// Every matching route, in table order. The method filter applies
    /// before the pattern is consulted.
    pub fn match_all(&self, method: &Method, path: &str) -> Vec<Arc<Route>> {
        self.routes
            .iter()
            .filter(|route| route.admits_method(method) && route.compiled().is_match(path))
            .cloned()
            .collect()
    }
}
