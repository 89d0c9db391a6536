//! Client for the XHS-Downloader detail endpoint
//!
//! The endpoint takes `{"url": ..., "download": true}`, downloads the post on
//! its side and answers with the post details under `data`, or with a
//! `message` explaining why it could not.

use std::time::Duration;

use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::queue::PostMeta;

const TITLE_KEY: &str = "作品标题";
const AUTHOR_KEY: &str = "作者昵称";
const POST_TYPE_KEY: &str = "作品类型";

#[derive(Error, Debug)]
pub enum XhsError {
    #[error("cannot reach XHS API")]
    Connect(#[source] reqwest::Error),
    #[error("XHS API timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("XHS API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

impl XhsError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::Connect(e)
        } else if e.is_timeout() {
            Self::Timeout(e)
        } else {
            Self::Request(e)
        }
    }
}

#[derive(Debug, Serialize)]
struct DetailRequest<'a> {
    url: &'a str,
    download: bool,
}

pub struct XhsClient {
    client: Client,
    endpoint: String,
}

impl XhsClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the XHS API to download one post
    #[instrument(level = "debug", skip(self))]
    pub async fn download(&self, url: &str) -> Result<PostMeta, XhsError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DetailRequest {
                url,
                download: true,
            })
            .send()
            .await
            .map_err(XhsError::from_reqwest)?;

        debug!(status = %response.status(), "XHS API answered");
        let body: Value = response.json().await.map_err(XhsError::from_reqwest)?;
        parse_detail(&body)
    }
}

/// Interpret a detail response: a non-empty `data` object means success.
pub fn parse_detail(body: &Value) -> Result<PostMeta, XhsError> {
    match body.get("data") {
        Some(data) if is_truthy(data) => Ok(PostMeta {
            title: text_field(data, TITLE_KEY),
            author: text_field(data, AUTHOR_KEY),
            post_type: text_field(data, POST_TYPE_KEY),
        }),
        _ => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown error");
            Err(XhsError::Rejected(message.to_string()))
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn text_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use serde_json::json;

    #[test]
    fn data_object_means_success() {
        let meta = parse_detail(&json!({
            "message": "获取作品数据成功",
            "data": {
                "作品标题": "Weekend in Chengdu",
                "作者昵称": "panda_fan",
                "作品类型": "图文",
                "下载地址": ["https://sns-img.example/1.jpg"]
            }
        }))
        .unwrap();
        assert_eq!(meta.title.as_deref(), Some("Weekend in Chengdu"));
        assert_eq!(meta.author.as_deref(), Some("panda_fan"));
        assert_eq!(meta.post_type.as_deref(), Some("图文"));
    }

    #[test]
    fn missing_fields_are_none() {
        let meta = parse_detail(&json!({"data": {"作品标题": "", "作品ID": "1"}})).unwrap();
        assert_eq!(meta, PostMeta::default());
    }

    #[test]
    fn empty_data_is_a_failure() {
        for body in [
            json!({"message": "获取作品数据失败", "data": null}),
            json!({"message": "获取作品数据失败", "data": {}}),
            json!({"message": "获取作品数据失败"}),
        ] {
            match parse_detail(&body) {
                Err(XhsError::Rejected(msg)) => assert_eq!(msg, "获取作品数据失败"),
                other => panic!("unexpected {other:?}"),
            }
        }
        match parse_detail(&json!({"data": []})) {
            Err(XhsError::Rejected(msg)) => assert_eq!(msg, "Unknown error"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn posts_link_to_endpoint() {
        async fn detail(Json(req): Json<Value>) -> Json<Value> {
            assert_eq!(req["download"], json!(true));
            Json(json!({"data": {"作品标题": req["url"], "作者昵称": "me"}}))
        }
        let app = Router::new().route("/xhs/detail", post(detail));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client =
            XhsClient::new(format!("http://{addr}/xhs/detail"), Duration::from_secs(5)).unwrap();
        let meta = client.download("https://xhslink.com/a/1").await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("https://xhslink.com/a/1"));
        assert_eq!(meta.author.as_deref(), Some("me"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connect_error() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            XhsClient::new(format!("http://{addr}/xhs/detail"), Duration::from_secs(5)).unwrap();
        let err = client.download("https://xhslink.com/a/1").await.unwrap_err();
        assert!(matches!(err, XhsError::Connect(_)), "got {err:?}");
        assert_eq!(err.to_string(), "cannot reach XHS API");
    }
}
