//! trestle is a minimalist web routing framework.
//!
//! Incoming requests are matched against an ordered table of regex-compiled
//! routes; matched routes form a middleware chain driven by an explicit
//! [`Next`] continuation, and handler arguments are resolved by type from a
//! hierarchy of [`Injector`]s, so any async function whose parameters are
//! injectable can serve as a handler, middleware or path-variable converter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use trestle::{App, Context, HandleError, Next, Server, handler_fn};
//!
//! async fn log_requests(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
//!     tracing::info!(path = ctx.path(), "incoming request");
//!     next.proceed().await
//! }
//!
//! async fn greet(ctx: Arc<Context>) -> String {
//!     format!("Hello {}", ctx.request_var("name").unwrap_or_default())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = App::new();
//!     app.middleware("/", handler_fn(log_requests));
//!     app.get("/hello/:name", handler_fn(greet));
//!
//!     Server::builder()
//!         .app(app)
//!         .address("127.0.0.1:8080")
//!         .build()
//!         .unwrap()
//!         .start()
//!         .await;
//! }
//! ```

mod app;
mod body;
mod context;
mod dispatcher;
mod error;
mod fn_trait;
mod handler;
mod injector;
mod responder;
mod response;
mod server;

pub mod routing;

pub use app::App;
pub use body::{OptionReqBody, ReqBody, ResponseBody, boxed_body, empty_body, full_body};
pub use context::{Context, RawVar};
pub use dispatcher::Next;
pub use error::{BoxError, HandleError};
pub use fn_trait::FnTrait;
pub use handler::{FnHandler, Handler, handler_fn};
pub use injector::{Inject, InjectError, Injector};
pub use responder::{Json, Responder};
pub use response::ResponseWriter;
pub use routing::{PatternCompiler, Route, RouteCollection};
pub use server::Server;
