//! The request-processing chain.
//!
//! Matched routes form an ordered chain of responsibility. Each route's
//! handlers receive a [`Next`] continuation through the injector; calling it
//! is the only way to advance to the next matched route, so a handler that
//! returns without proceeding ends the chain with the response as written.

use crate::app::AppCore;
use crate::context::{Context, RawVar};
use crate::error::HandleError;
use crate::injector::{Inject, InjectError, Injector};
use crate::routing::Route;
use http::StatusCode;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// The continuation a middleware or handler calls to hand the request over
/// to the next matched route.
///
/// Resolved from the injector like any other handler parameter:
///
/// ```ignore
/// async fn timing(next: Next) -> Result<(), HandleError> {
///     let started = Instant::now();
///     let result = next.proceed().await;
///     tracing::debug!(elapsed = ?started.elapsed(), "request handled");
///     result
/// }
/// ```
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

struct NextInner {
    core: Arc<AppCore>,
    ctx: Arc<Context>,
    request_injector: Arc<Injector>,
    remaining: VecDeque<Arc<Route>>,
}

impl Next {
    fn new(
        core: Arc<AppCore>,
        ctx: Arc<Context>,
        request_injector: Arc<Injector>,
        remaining: VecDeque<Arc<Route>>,
    ) -> Self {
        Self { inner: Arc::new(NextInner { core, ctx, request_injector, remaining }) }
    }

    /// Runs the rest of the chain: error-handler substitution, then the
    /// next matched route, or the 404 handler when none remain.
    pub async fn proceed(&self) -> Result<(), HandleError> {
        let inner = &self.inner;
        advance(&inner.core, &inner.ctx, &inner.request_injector, inner.remaining.clone()).await
    }
}

impl Inject for Next {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        Ok(injector.resolve::<Next>()?.as_ref().clone())
    }
}

/// One transition of the chain state machine.
pub(crate) async fn advance(
    core: &Arc<AppCore>,
    ctx: &Arc<Context>,
    request_injector: &Arc<Injector>,
    mut remaining: VecDeque<Arc<Route>>,
) -> Result<(), HandleError> {
    // a handler set an error status without writing a body: substitute the
    // registered error handler's output
    let status = ctx.response().status();
    if status.as_u16() >= 400 && ctx.response().bytes_written() == 0 {
        return core.dispatch_error(status, ctx, request_injector).await;
    }

    let Some(route) = remaining.pop_front() else {
        // a routing miss is not an error, it resolves to the 404 handler --
        // unless a handler already produced output, which stands as written
        if ctx.response().bytes_written() > 0 {
            return Ok(());
        }
        ctx.response().set_status(StatusCode::NOT_FOUND);
        return core.dispatch_error(StatusCode::NOT_FOUND, ctx, request_injector).await;
    };

    debug!(route = route.name(), path = ctx.path(), "dispatching route");

    let vars = route.compiled().extract(ctx.path()).unwrap_or_default();
    for (name, value) in vars {
        ctx.set_request_var(name, value);
    }

    // converters run before the handler chain, in path-variable order, each
    // in a fresh injector seeded with the raw value
    for name in route.compiled().var_names() {
        let Some(converter) = route.converter_for(name) else {
            continue;
        };
        let Some(raw) = ctx.request_var(name) else {
            continue;
        };
        let converter_injector = Injector::with_parent(Arc::clone(request_injector));
        converter_injector.register(RawVar(raw));
        let converted = converter.convert(&converter_injector).await?;
        ctx.set_converted_var(name, converted);
    }

    // the invocation injector carries a continuation bound to what is left
    // of the chain
    let invocation_injector = Injector::with_parent(Arc::clone(request_injector));
    invocation_injector.register(Next::new(
        Arc::clone(core),
        Arc::clone(ctx),
        Arc::clone(request_injector),
        remaining,
    ));

    for handler in route.handlers() {
        handler.invoke(&invocation_injector).await?;
    }
    Ok(())
}
