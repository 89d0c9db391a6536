use axum::{Json, extract::State};

use crate::backend::{
    AppState,
    kv_config::{DownloaderSettings, KvOptExt, SettingsPatch},
    response::{ApiJson, ApiRes, ApiResponse},
};

pub async fn get_config(State(state): State<AppState>) -> ApiRes<Json<DownloaderSettings>> {
    let settings = DownloaderSettings::load(&state.db).await?;
    Ok(Json(settings))
}

pub async fn set_config(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> ApiRes<Json<ApiResponse>> {
    tracing::trace!(?patch, "Updating downloader settings");
    DownloaderSettings::update(&state.db, &patch).await?;
    Ok(Json(ApiResponse::success("Settings saved")))
}
