//! HTTP API for Newsdesk.
//!
//! JSON endpoints for the public feeds, search, and the admin article
//! editor. Category pages are always derived server-side; see
//! [`newsdesk_core::CategoryPageMap`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use newsdesk_shared::{NewsdeskError, Result, ServerConfig};

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

/// Build the router with every route, CORS and request tracing.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route("/api/articles/search", get(handlers::search_articles))
        .route(
            "/api/articles/:id",
            get(handlers::get_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/pages/preview", post(handlers::preview_pages))
        .with_state(state)
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

/// Bind the listener and serve until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState, server: &ServerConfig) -> Result<()> {
    let app = create_router(state, server);

    let address = format!("{}:{}", server.bind_addr, server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| NewsdeskError::config(format!("cannot bind {address}: {e}")))?;
    info!(%address, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| NewsdeskError::Storage(format!("server error: {e}")))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl-C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
