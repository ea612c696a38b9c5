//! Route declaration, compilation and matching.
//!
//! Routes are declared on a [`RouteCollection`] (usually through the
//! [`App`](crate::App) façade), compiled by the [`PatternCompiler`] when the
//! collection freezes, and matched by the [`RequestMatcher`] afterwards.

mod collection;
mod matcher;
mod pattern;
mod route;

pub use collection::RouteCollection;
pub use matcher::RequestMatcher;
pub use pattern::{CompiledPattern, PatternCompiler, PatternError};
pub use route::Route;
