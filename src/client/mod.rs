//! HTTP client for the queue API, used by the `xhsq` CLI commands.
//!
//! The client holds no state of its own: every call mirrors what the server
//! returns and leaves it to the caller to render.

pub mod commands;
pub mod import;
pub mod render;

use reqwest::{Client, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

use crate::backend::api::queue::AddRequest;
use crate::backend::kv_config::{DownloaderSettings, SettingsPatch};
use crate::backend::response::ApiResponse;
use crate::queue::{Category, QueueSnapshot};
use crate::validate::{
    ValidationError, normalize_category, validate_delay, validate_download_path,
    validate_item_id, validate_link,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("cannot connect to server at {0}")]
    Connect(Url, #[source] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("xhsq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: with_trailing_slash(base),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Connect(self.base.clone(), e)
            } else {
                ClientError::Request(e)
            }
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // error bodies carry `{success: false, message}` when they come from our handlers
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiResponse>(&body)
            .map(|r| r.message)
            .unwrap_or(body);
        Err(ClientError::Server { status, message })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        Ok(self.send(self.http.get(url)).await?.json().await?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        Ok(self.send(self.http.post(url).json(body)).await?.json().await?)
    }

    async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        Ok(self.send(self.http.delete(url)).await?.json().await?)
    }

    /// Queue a link. `success: false` in the answer means it was already queued.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn add(&self, url: &str, category: Option<&str>) -> Result<ApiResponse> {
        let request = AddRequest {
            url: validate_link(url)?,
            category: Some(normalize_category(category)?),
        };
        self.post("add", &request).await
    }

    pub async fn queue(&self) -> Result<QueueSnapshot> {
        self.get("queue").await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get("categories").await
    }

    pub async fn delete_item(&self, id: &str) -> Result<ApiResponse> {
        let id = validate_item_id(id)?;
        let mut url = self.endpoint("queue")?;
        // pushed as a segment so `?`, `#` and `%` are percent-encoded
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(&id);
        self.delete(url).await
    }

    pub async fn clear_pending(&self) -> Result<ApiResponse> {
        self.delete(self.endpoint("queue")?).await
    }

    pub async fn config(&self) -> Result<DownloaderSettings> {
        self.get("config").await
    }

    pub async fn update_config(&self, patch: &SettingsPatch) -> Result<ApiResponse> {
        let patch = SettingsPatch {
            download_path: patch
                .download_path
                .as_deref()
                .map(validate_download_path)
                .transpose()?,
            delay_seconds: patch.delay_seconds.map(validate_delay).transpose()?,
        };
        self.post("config", &patch).await
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
