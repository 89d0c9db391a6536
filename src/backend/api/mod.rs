use axum::{
    Router,
    routing::{delete, get, post},
};

use super::AppState;

pub mod config;
pub mod queue;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/add", post(queue::add_link))
        .route("/queue", get(queue::get_queue).delete(queue::clear_queue))
        .route("/queue/{id}", delete(queue::delete_item))
        .route("/categories", get(queue::get_categories))
        .route("/config", get(config::get_config).post(config::set_config))
}
