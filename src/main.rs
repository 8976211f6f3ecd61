use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use examgen_backend::{
    config::{get_config, init_config},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::new();
    info!(
        "Loaded {} item-type specs into the registry",
        app_state.registry.len()
    );

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/items/generate",
            post(routes::generate::generate_item),
        )
        .route(
            "/api/items/generate-batch",
            post(routes::generate::generate_batch),
        )
        .route("/api/items/suggest", post(routes::generate::suggest_types))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
