//! End-to-end request tests, driven through `App::handle` without a socket.

use http::header::CONTENT_TYPE;
use http::{Method, Request, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use trestle::{
    App, Context, HandleError, Json, Next, RawVar, ReqBody, RouteCollection, empty_body, full_body, handler_fn,
};

fn request(method: Method, path: &str) -> Request<ReqBody> {
    Request::builder().method(method).uri(path).body(empty_body()).unwrap()
}

async fn send(app: &App, method: Method, path: &str) -> (StatusCode, String) {
    let response = app.handle(request(method, path)).await;
    let status = response.status();
    let body = String::from_utf8(response.into_body().into_bytes().to_vec()).unwrap();
    (status, body)
}

async fn pass(next: Next) -> Result<(), HandleError> {
    next.proceed().await
}

#[tokio::test]
async fn test_hello_world() {
    async fn hello(ctx: Arc<Context>) -> String {
        format!("Hello {}", ctx.request_var("name").unwrap_or_default())
    }

    let mut app = App::new();
    app.get("/hello/:name", handler_fn(hello));

    let (status, body) = send(&app, Method::GET, "/hello/foo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello foo");
}

#[tokio::test]
async fn test_optional_request_variable() {
    async fn one(ctx: Arc<Context>) -> String {
        format!("param: {}", ctx.request_var("param").unwrap_or_default())
    }
    async fn two(ctx: Arc<Context>) -> String {
        format!(
            "{}{}",
            ctx.request_var("param1").unwrap_or_default(),
            ctx.request_var("param2").unwrap_or_default()
        )
    }

    let mut app = App::new();
    app.middleware("/", handler_fn(pass));
    app.get("/:param?", handler_fn(one));
    app.get("/:param1?/:param2", handler_fn(two));

    let (status, body) = send(&app, Method::GET, "/example").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("example"));

    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("example"));
    assert!(body.contains("param:"));

    let (status, body) = send(&app, Method::GET, "/job/salary").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("job"));
    assert!(body.contains("salary"));

    let (status, _body) = send(&app, Method::GET, "/house/room/door").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_does_not_hit_get_route() {
    async fn feedback_get() -> &'static str {
        "GET"
    }
    async fn feedback_post(ctx: Arc<Context>) -> Result<String, HandleError> {
        let form: HashMap<String, String> = ctx.read_form().await?;
        Ok(form.get("message").cloned().unwrap_or_default())
    }

    let mut app = App::new();
    app.get("/feedback", handler_fn(feedback_get));
    app.post("/feedback", handler_fn(feedback_post));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/feedback")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(full_body("message=message"))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(response.into_body().into_bytes().to_vec()).unwrap();
    assert_eq!(body, "message");
}

#[tokio::test]
async fn test_put_extracts_variable() {
    async fn update(ctx: Arc<Context>) -> String {
        ctx.request_var("id").unwrap_or_default()
    }

    let mut app = App::new();
    app.put("/blog/:id", handler_fn(update));

    let (status, body) = send(&app, Method::PUT, "/blog/10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "10");
}

#[tokio::test]
async fn test_delete_extracts_variables_in_order() {
    async fn remove(ctx: Arc<Context>) -> String {
        format!(
            "{}:{}",
            ctx.request_var("category").unwrap_or_default(),
            ctx.request_var("id").unwrap_or_default()
        )
    }

    let mut app = App::new();
    app.delete("/category/:category/product/:id", handler_fn(remove));

    let (status, body) = send(&app, Method::DELETE, "/category/food/product/200?foo=bar").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "food:200");
}

#[tokio::test]
async fn test_set_methods() {
    async fn ok() -> &'static str {
        "ok"
    }

    let mut app = App::new();
    app.all("/foo", handler_fn(ok)).set_methods(&["GET", "POST"]);
    app.all("/bar", handler_fn(ok)).set_methods(&["*"]);

    let (status, _) = send(&app, Method::GET, "/foo").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/foo").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::PUT, "/foo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::OPTIONS, "/bar").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_head_is_implied_by_get() {
    async fn hello() -> &'static str {
        "hello"
    }

    let mut app = App::new();
    app.get("/hello", handler_fn(hello));

    let (status, _) = send(&app, Method::HEAD, "/hello").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_middleware_chain_runs_in_registration_order() {
    async fn mw1(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.write_str("mw1 ");
        next.proceed().await
    }
    async fn mw2(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.write_str("mw2 ");
        next.proceed().await
    }
    async fn terminal() -> &'static str {
        "x"
    }

    let mut app = App::new();
    app.middleware("/", handler_fn(mw1));
    app.middleware("/", handler_fn(mw2));
    app.get("/x", handler_fn(terminal));

    let (status, body) = send(&app, Method::GET, "/x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "mw1 mw2 x");
}

#[tokio::test]
async fn test_chain_stops_when_next_is_not_called() {
    async fn gate(ctx: Arc<Context>) {
        ctx.write_str("gate");
    }
    async fn terminal() -> &'static str {
        "never"
    }

    let mut app = App::new();
    app.middleware("/", handler_fn(gate));
    app.get("/x", handler_fn(terminal));

    let (status, body) = send(&app, Method::GET, "/x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "gate");
}

#[tokio::test]
async fn test_request_bag_is_shared_along_the_chain() {
    async fn tag(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.set_var("request_id", "req-7");
        next.proceed().await
    }
    async fn show(ctx: Arc<Context>) -> String {
        ctx.var("request_id").unwrap_or_default()
    }

    let mut app = App::new();
    app.middleware("/", handler_fn(tag));
    app.get("/id", handler_fn(show));

    let (status, body) = send(&app, Method::GET, "/id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "req-7");
}

#[tokio::test]
async fn test_root_injector_service_resolves_in_handler() {
    struct Greeting(&'static str);

    async fn greet(greeting: Arc<Greeting>) -> String {
        greeting.0.to_string()
    }

    let mut app = App::new();
    app.injector().register(Greeting("service hello"));
    app.get("/", handler_fn(greet));

    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "service hello");
}

#[derive(Clone)]
struct Person {
    id: usize,
    name: &'static str,
}

struct PersonRepository {
    people: Vec<Person>,
}

impl PersonRepository {
    fn sample() -> Self {
        Self { people: vec![Person { id: 0, name: "James" }, Person { id: 1, name: "Frank" }] }
    }
}

async fn find_person(raw: RawVar, repo: Arc<PersonRepository>) -> Option<Person> {
    let id: usize = raw.as_str().parse().ok()?;
    repo.people.iter().find(|person| person.id == id).cloned()
}

#[tokio::test]
async fn test_convert_turns_variable_into_service_backed_value() {
    async fn show(ctx: Arc<Context>) -> String {
        match ctx.converted_var::<Option<Person>>("person").as_deref() {
            Some(Some(person)) => person.name.to_string(),
            _ => "unknown".to_string(),
        }
    }

    let mut app = App::new();
    app.injector().register(PersonRepository::sample());
    app.get("/person/:person", handler_fn(show)).convert("person", find_person);

    let (status, body) = send(&app, Method::GET, "/person/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "James");

    // a converter producing None is not an error and does not stop the chain
    let (status, body) = send(&app, Method::GET, "/person/99").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "unknown");
}

#[tokio::test]
async fn test_assert_constrains_variable() {
    async fn show(ctx: Arc<Context>) -> String {
        ctx.request_var("id").unwrap_or_default()
    }

    let mut app = App::new();
    app.get("/movies/:id", handler_fn(show)).assert("id", r"\d+");

    let (status, _) = send(&app, Method::GET, "/movies/foobar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/movies/0123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0123");
}

#[tokio::test]
async fn test_custom_404_handler() {
    async fn not_found(ctx: Arc<Context>) -> String {
        format!("Route {} Not Found", ctx.path())
    }

    let mut app = App::new();
    app.error(404, handler_fn(not_found));

    let (status, body) = send(&app, Method::GET, "/foo/bar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Route /foo/bar Not Found");
}

#[tokio::test]
async fn test_default_404_handler() {
    let mut app = App::new();
    async fn ok() {}
    app.get("/known", handler_fn(ok));

    let (status, body) = send(&app, Method::GET, "/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Not Found");
}

#[tokio::test]
async fn test_unresolvable_parameter_escalates_to_500() {
    struct Missing;

    async fn broken(_missing: Arc<Missing>) {}

    let mut app = App::new();
    app.get("/", handler_fn(broken));

    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error");
}

#[tokio::test]
async fn test_custom_500_handler() {
    struct Missing;

    async fn broken(_missing: Arc<Missing>) {}
    async fn crashed() -> &'static str {
        "it broke"
    }

    let mut app = App::new();
    app.get("/", handler_fn(broken));
    app.error(500, handler_fn(crashed));

    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "it broke");
}

#[tokio::test]
async fn test_error_status_without_body_invokes_error_handler() {
    async fn reject(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.response().set_status(StatusCode::UNAUTHORIZED);
        next.proceed().await
    }
    async fn unauthorized() -> &'static str {
        "Not Authorized"
    }

    let mut app = App::new();
    app.get("/notauthorized", handler_fn(reject));
    app.error(401, handler_fn(unauthorized));

    let (status, body) = send(&app, Method::GET, "/notauthorized").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Not Authorized");
}

#[tokio::test]
async fn test_error_status_with_body_is_left_untouched() {
    async fn reject(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.response().set_status(StatusCode::UNAUTHORIZED);
        ctx.write_str("go away");
        next.proceed().await
    }
    async fn unauthorized() -> &'static str {
        "Not Authorized"
    }

    let mut app = App::new();
    app.get("/notauthorized", handler_fn(reject));
    app.error(401, handler_fn(unauthorized));

    let (status, body) = send(&app, Method::GET, "/notauthorized").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "go away");
}

#[tokio::test]
async fn test_unregistered_error_status_writes_reason_phrase() {
    async fn forbid(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.response().set_status(StatusCode::FORBIDDEN);
        next.proceed().await
    }

    let mut app = App::new();
    app.get("/", handler_fn(forbid));

    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Forbidden");
}

#[test]
#[should_panic(expected = "status codes >= 400")]
fn test_error_handler_below_400_panics() {
    async fn noop() {}

    let mut app = App::new();
    app.error(100, handler_fn(noop));
}

#[tokio::test]
async fn test_mount_at_root() {
    async fn example() -> &'static str {
        "example"
    }

    let mut collection = RouteCollection::new();
    collection.all("/example", handler_fn(example));

    let mut app = App::new();
    app.mount("/", collection);

    let (status, body) = send(&app, Method::GET, "/example").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "example");
}

#[tokio::test]
async fn test_mount_prefixes_variables() {
    async fn show(ctx: Arc<Context>) -> String {
        ctx.request_var("user").unwrap_or_default()
    }

    let mut admin = RouteCollection::new();
    admin.get("/:user", handler_fn(show));

    let mut app = App::new();
    app.mount("/admin", admin);

    let (status, body) = send(&app, Method::GET, "/admin/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "42");
}

#[tokio::test]
async fn test_nested_mounts() {
    async fn use_mw(ctx: Arc<Context>, next: Next) -> Result<(), HandleError> {
        ctx.write_str("Use");
        next.proceed().await
    }
    async fn subroutes(ctx: Arc<Context>) {
        ctx.write_str("SubRoutes");
    }
    async fn subsubroutes(ctx: Arc<Context>) {
        ctx.write_str("SubSubRoutes");
    }

    let mut sub2 = RouteCollection::new();
    sub2.all("/", handler_fn(subsubroutes));

    let mut sub = RouteCollection::new();
    sub.middleware("/", handler_fn(use_mw));
    sub.all("/", handler_fn(subroutes));
    sub.mount("/subroutes", sub2);

    let mut app = App::new();
    app.mount("/subroutes", sub);

    let (status, body) = send(&app, Method::GET, "/subroutes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "UseSubRoutes");

    let (status, body) = send(&app, Method::POST, "/subroutes/subroutes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "UseSubSubRoutes");
}

#[tokio::test]
async fn test_raw_group_is_extracted_positionally() {
    async fn show(ctx: Arc<Context>) -> String {
        ctx.request_var("0").unwrap_or_default()
    }

    let mut app = App::new();
    app.get("/file/(.+)", handler_fn(show));

    let (status, body) = send(&app, Method::GET, "/file/notes.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "notes.txt");
}

#[tokio::test]
async fn test_json_responder() {
    #[derive(serde::Serialize)]
    struct Account {
        balance: u32,
    }

    async fn account() -> Json<Account> {
        Json(Account { balance: 1000 })
    }

    let mut app = App::new();
    app.get("/account", handler_fn(account));

    let response = app.handle(request(Method::GET, "/account")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    let body = String::from_utf8(response.into_body().into_bytes().to_vec()).unwrap();
    assert_eq!(body, r#"{"balance":1000}"#);
}

#[tokio::test]
async fn test_read_json_body() {
    #[derive(serde::Deserialize)]
    struct Account {
        balance: f32,
    }

    async fn deposit(ctx: Arc<Context>) -> Result<String, HandleError> {
        let account: Account = ctx.read_json().await?;
        Ok(format!("{}", account.balance))
    }

    let mut app = App::new();
    app.post("/account", handler_fn(deposit));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/account")
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(r#"{"balance":500}"#))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(response.into_body().into_bytes().to_vec()).unwrap();
    assert_eq!(body, "500");
}

#[tokio::test]
async fn test_handler_without_writes_responds_200_empty() {
    async fn noop() {}

    let mut app = App::new();
    app.get("/empty", handler_fn(noop));

    let (status, body) = send(&app, Method::GET, "/empty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
#[should_panic(expected = "booted")]
async fn test_routes_cannot_be_added_after_boot() {
    async fn ok() {}

    let mut app = App::new();
    app.get("/", handler_fn(ok));

    let _ = app.handle(request(Method::GET, "/")).await;
    app.get("/more", handler_fn(ok));
}
