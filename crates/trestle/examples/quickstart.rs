use http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use trestle::{App, Context, HandleError, Next, RawVar, RouteCollection, Server, handler_fn};

#[derive(Clone, Serialize)]
struct User {
    id: String,
    name: String,
}

struct Users;

impl Users {
    fn get_by_id(&self, id: &str) -> Option<User> {
        [("100", "John"), ("200", "Jane")]
            .iter()
            .find(|(user_id, _)| *user_id == id)
            .map(|(id, name)| User { id: (*id).to_string(), name: (*name).to_string() })
    }
}

// middleware that times every request passing through it
async fn timing(next: Next) -> Result<(), HandleError> {
    let started = Instant::now();
    let result = next.proceed().await;
    println!("lapse: {:?}", started.elapsed());
    result
}

async fn greet(ctx: Arc<Context>) -> String {
    format!("Hello {}", ctx.request_var("name").unwrap_or_default())
}

// the admin area only opens up with ?password=secret
async fn require_secret(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
    let authorized = ctx.uri().query().is_some_and(|query| query.contains("password=secret"));
    if !authorized {
        ctx.response().set_status(StatusCode::FORBIDDEN);
    }
    next.proceed().await
}

// the `user` variable has already been converted to Option<User> here
async fn show_user(ctx: Arc<Context>) -> Result<(), HandleError> {
    match ctx.converted_var::<Option<User>>("user").as_deref() {
        Some(Some(user)) => ctx.write_json(user),
        _ => {
            ctx.response().set_status(StatusCode::NOT_FOUND);
            Ok(())
        }
    }
}

async fn find_user(raw: RawVar, users: Arc<Users>) -> Option<User> {
    users.get_by_id(raw.as_str())
}

#[tokio::main]
async fn main() {
    let mut app = App::new();

    // every handler and converter can now ask for Arc<Users>
    app.injector().register(Users);

    app.middleware("/", handler_fn(timing));
    app.get("/greet/:name?", handler_fn(greet)).assert("name", "[A-Za-z]+");

    let mut admin = RouteCollection::new();
    admin.middleware("/", handler_fn(require_secret));
    admin.all("/:user", handler_fn(show_user)).convert("user", find_user).assert("user", r"\d+");
    app.mount("/admin", admin);

    Server::builder()
        .app(app)
        .address("127.0.0.1:8080")
        .build()
        .unwrap()
        .start()
        .await;
}
