use trestle::{App, Server, handler_fn};

async fn hello_world() -> &'static str {
    "hello world"
}

#[tokio::main]
async fn main() {
    let mut app = App::new();
    app.get("/", handler_fn(hello_world));

    Server::builder()
        .app(app)
        .address("127.0.0.1:3000")
        .build()
        .unwrap()
        .start()
        .await;
}
