use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::{AppState, api::api_router};

async fn serve_page(state: &AppState, page: &str) -> Response {
    match tokio::fs::read_to_string(state.static_dir.join(page)).await {
        Ok(contents) => Html(contents).into_response(),
        Err(e) => {
            tracing::debug!("Cannot serve {}: {}", page, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn index(State(state): State<AppState>) -> Response {
    serve_page(&state, "index.html").await
}

async fn dashboard(State(state): State<AppState>) -> Response {
    serve_page(&state, "dashboard.html").await
}

/// Create the main backend router
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    Router::new()
        .nest("/api", api_router())
        // web dashboard
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
        .nest_service("/static", static_files)
        // the extension popup calls from its own origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
