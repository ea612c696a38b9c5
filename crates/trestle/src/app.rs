//! The application façade: route registration, error handlers, boot and the
//! per-request recovery boundary.

use crate::body::{OptionReqBody, ReqBody, ResponseBody};
use crate::context::Context;
use crate::dispatcher::advance;
use crate::error::HandleError;
use crate::handler::{Handler, handler_fn};
use crate::injector::Injector;
use crate::response::ResponseWriter;
use crate::routing::{PatternCompiler, RequestMatcher, Route, RouteCollection};
use http::{Request, Response, StatusCode};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// A trestle application.
///
/// Routes, middleware and error handlers are declared while the value is
/// still mutable. The first request boots the application exactly once:
/// the route collection freezes into a flat compiled table, the matcher is
/// built, and default 404/500 handlers are installed for codes without a
/// registration. From then on the route table is immutable and shared
/// read-only across concurrent requests.
///
/// ```no_run
/// use std::sync::Arc;
/// use trestle::{App, Context, handler_fn};
///
/// async fn hello(ctx: Arc<Context>) -> String {
///     format!("Hello {}", ctx.request_var("name").unwrap_or_default())
/// }
///
/// let mut app = App::new();
/// app.get("/hello/:name", handler_fn(hello));
/// ```
pub struct App {
    collection: Mutex<Option<RouteCollection>>,
    error_handlers: Mutex<Option<HashMap<u16, Box<dyn Handler>>>>,
    injector: Arc<Injector>,
    compiler: PatternCompiler,
    core: OnceCell<Arc<AppCore>>,
}

impl App {
    pub fn new() -> Self {
        Self::with_compiler(PatternCompiler::new())
    }

    /// Creates an application with a custom pattern compiler configuration.
    pub fn with_compiler(compiler: PatternCompiler) -> Self {
        Self {
            collection: Mutex::new(Some(RouteCollection::new())),
            error_handlers: Mutex::new(Some(HashMap::new())),
            injector: Arc::new(Injector::new()),
            compiler,
            core: OnceCell::new(),
        }
    }

    /// The root injector. Services registered here resolve in every
    /// handler, middleware and converter for the application's lifetime.
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Appends a `GET` route.
    ///
    /// # Panics
    ///
    /// All registration methods panic once the application has booted.
    pub fn get(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().get(path, handler)
    }

    /// Appends a `POST` route.
    pub fn post(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().post(path, handler)
    }

    /// Appends a `PUT` route.
    pub fn put(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().put(path, handler)
    }

    /// Appends a `DELETE` route.
    pub fn delete(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().delete(path, handler)
    }

    /// Appends a route accepting any method; narrow it with
    /// [`Route::set_methods`].
    pub fn all(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().all(path, handler)
    }

    /// Appends passthrough middleware matching `path` as a prefix.
    pub fn middleware(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.collection_mut().middleware(path, handler)
    }

    /// Mounts a route collection under `prefix`.
    pub fn mount(&mut self, prefix: impl Into<String>, collection: RouteCollection) {
        self.collection_mut().mount(prefix, collection);
    }

    /// Registers the handler invoked for responses carrying `status`.
    ///
    /// # Panics
    ///
    /// Panics for status codes below 400: those are not errors, and
    /// registering a handler for them is a configuration fault.
    pub fn error(&mut self, status: u16, handler: impl Handler + 'static) {
        assert!(status >= 400, "error handlers are for status codes >= 400, got {status}");
        self.error_handlers_mut().insert(status, Box::new(handler));
    }

    /// Handles one request. This is the single recovery boundary: any
    /// failure escaping handlers, converters or injection is logged and
    /// mapped to the 500 handler, never out of this function.
    pub async fn handle(&self, request: Request<ReqBody>) -> Response<ResponseBody> {
        let core = Arc::clone(self.boot());

        let (head, body) = request.into_parts();
        let method = head.method.clone();
        let path = head.uri.path().to_string();

        let response = Arc::new(ResponseWriter::new());
        let ctx = Arc::new(Context::new(head, OptionReqBody::from(body), Arc::clone(&response)));

        let request_injector = Arc::new(Injector::with_parent(Arc::clone(&core.injector)));
        request_injector.register_arc(Arc::clone(&ctx));
        request_injector.register_arc(Arc::clone(&response));

        let matches: VecDeque<Arc<Route>> = core.matcher.match_all(&method, &path).into();
        if let Err(cause) = advance(&core, &ctx, &request_injector, matches).await {
            error!(%cause, %method, %path, "request failed, invoking 500 handler");
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            if let Err(cause) = core.dispatch_error(StatusCode::INTERNAL_SERVER_ERROR, &ctx, &request_injector).await
            {
                error!(%cause, "500 handler failed");
                if response.bytes_written() == 0 {
                    response.write_str("Internal Server Error");
                }
            }
        }

        response.finish()
    }

    /// Boots on first use: freezes the route collection into the compiled
    /// table and installs default error handlers. Guarded so that it runs
    /// exactly once even under concurrent first requests.
    fn boot(&self) -> &Arc<AppCore> {
        self.core.get_or_init(|| {
            let mut collection = self
                .collection
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .expect("application already booted");
            let routes = collection.freeze(&self.compiler);

            let mut error_handlers = self
                .error_handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .expect("application already booted");
            error_handlers.entry(404).or_insert_with(|| Box::new(handler_fn(default_not_found)));
            error_handlers.entry(500).or_insert_with(|| Box::new(handler_fn(default_server_error)));

            info!(routes = routes.len(), "application booted, route table frozen");
            Arc::new(AppCore {
                matcher: RequestMatcher::new(routes),
                error_handlers,
                injector: Arc::clone(&self.injector),
            })
        })
    }

    fn collection_mut(&mut self) -> &mut RouteCollection {
        self.collection
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .expect("application is booted: routes must be declared before serving begins")
    }

    fn error_handlers_mut(&mut self) -> &mut HashMap<u16, Box<dyn Handler>> {
        self.error_handlers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .expect("application is booted: error handlers must be declared before serving begins")
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// The immutable, boot-time state shared by every request.
pub(crate) struct AppCore {
    pub(crate) matcher: RequestMatcher,
    error_handlers: HashMap<u16, Box<dyn Handler>>,
    pub(crate) injector: Arc<Injector>,
}

impl AppCore {
    /// Invokes the error handler registered for `status`. Without one, the
    /// canonical reason phrase becomes the body.
    pub(crate) async fn dispatch_error(
        &self,
        status: StatusCode,
        ctx: &Arc<Context>,
        request_injector: &Arc<Injector>,
    ) -> Result<(), HandleError> {
        match self.error_handlers.get(&status.as_u16()) {
            Some(handler) => handler.invoke(request_injector).await,
            None => {
                ctx.write_str(status.canonical_reason().unwrap_or("error"));
                Ok(())
            }
        }
    }
}

async fn default_not_found(ctx: Arc<Context>) {
    ctx.response().set_status(StatusCode::NOT_FOUND);
    ctx.write_str("Not Found");
}

async fn default_server_error(ctx: Arc<Context>) {
    ctx.response().set_status(StatusCode::INTERNAL_SERVER_ERROR);
    ctx.write_str("Internal Server Error");
}
