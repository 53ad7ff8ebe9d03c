use axum::Router;
use sockjs::{Hooks, ServerConfig, routes};
use tracing_subscriber::EnvFilter;

/// Echo every message back to the session it came from.
fn echo() -> Hooks {
    Hooks::new().on_message(|session, message| session.send([message]))
}

/// Close the session as soon as it opens.
fn close() -> Hooks {
    Hooks::new().on_open(|session| session.close_with(3000, "Go away!"))
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let port = config.port;

    let router = routes::mount(Router::new(), "/echo", config.clone(), echo());
    let router = routes::mount(router, "/close", config.clone(), close());
    let router = routes::mount(
        router,
        "/disabled_websocket_echo",
        ServerConfig { websocket: false, ..config.clone() },
        echo(),
    );
    let router = routes::mount(router, "/cookie_needed_echo", ServerConfig { cookie_needed: true, ..config }, echo());
    let app = routes::app(router);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sockjs listening");
    axum::serve(listener, app).await.expect("server failed");
}
