//! Queue API module

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    backend::{
        AppState,
        response::{ApiJson, ApiRes, ApiResponse},
    },
    error::Error,
    queue::{AddOutcome, Category, QueueSnapshot, RECENT_LIMIT},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequest {
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Queue a link. A link that is already queued is answered with
/// `success: false` rather than an error status.
pub async fn add_link(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddRequest>,
) -> ApiRes<Json<ApiResponse>> {
    tracing::trace!(url = %req.url, "Add request");
    let response = match state.queue.add(&req.url, req.category.as_deref()).await? {
        AddOutcome::Added { id, category } => {
            ApiResponse::success(format!("Queued in [{category}]")).with_id(id)
        }
        AddOutcome::Duplicate => ApiResponse::failure("Link is already in the queue"),
    };
    Ok(Json(response))
}

pub async fn get_queue(State(state): State<AppState>) -> ApiRes<Json<QueueSnapshot>> {
    let snapshot = state.queue.recent(RECENT_LIMIT).await?;
    Ok(Json(snapshot))
}

/// Remove every pending item
pub async fn clear_queue(State(state): State<AppState>) -> ApiRes<Json<ApiResponse>> {
    let removed = state.queue.clear_pending().await?;
    Ok(Json(
        ApiResponse::success(format!("Removed {removed} pending item(s)")).with_removed(removed),
    ))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiRes<Json<ApiResponse>> {
    if !state.queue.delete(&id).await? {
        return Err(Error::NotFound(id));
    }
    Ok(Json(ApiResponse::success("Item deleted").with_id(id)))
}

pub async fn get_categories(State(state): State<AppState>) -> ApiRes<Json<Vec<Category>>> {
    let categories = state.queue.categories().await?;
    Ok(Json(categories))
}
