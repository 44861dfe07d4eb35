use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};

use cashbox_backend::rest::{self, AppState};
use cashbox_backend::Backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up data directory and services");
    let backend = Backend::new_default()?;
    let state = AppState::new(backend);

    // CORS setup to allow the admin front-end to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/registers", get(rest::list_registers).post(rest::create_register))
        .route(
            "/registers/active",
            get(rest::get_active_register).post(rest::set_active_register),
        )
        .route(
            "/registers/:id",
            get(rest::get_register)
                .put(rest::update_register)
                .delete(rest::delete_register),
        )
        .route(
            "/transactions",
            get(rest::list_transactions).post(rest::create_transaction),
        )
        .route("/transactions/delete", post(rest::delete_transactions))
        .route("/sessions", get(rest::list_sessions))
        .route("/sessions/open", post(rest::open_session))
        .route("/sessions/current", get(rest::get_current_session))
        .route("/sessions/count", post(rest::count_cash))
        .route("/sessions/close", post(rest::close_session))
        .route("/sessions/reconcile", post(rest::reconcile_session))
        .route("/reports/summary", get(rest::get_summary))
        .route("/reports/export-data", post(rest::export_ledger_data))
        .route("/reports/export", post(rest::export_ledger_to_path));

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
