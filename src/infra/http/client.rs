// Responsible for all REST communication with the marketplace API.

use crate::error::{ApiError, ApiResult};
use crate::infra::config::ClientConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock};

/// Thin wrapper over `reqwest::Client` that keeps credentials (cookies) across calls
/// and unwraps the `{ success, data, error }` envelope used by the API.
pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: RwLock<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            jar,
            base_url: RwLock::new(config.api_url.trim_end_matches('/').to_string()),
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Points subsequent requests at another endpoint (e.g. the fallback).
    pub fn set_base_url(&self, url: &str) {
        let mut guard = self
            .base_url
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = url.trim_end_matches('/').to_string();
    }

    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Checks whether a cookie with this name is held for the current base URL.
    /// Only presence is reported; the value never leaves the jar.
    pub fn has_cookie(&self, name: &str) -> bool {
        let Ok(url) = Url::parse(&self.base_url()) else {
            return false;
        };
        let Some(header) = self.jar.cookies(&url) else {
            return false;
        };
        let Ok(raw) = header.to_str() else {
            return false;
        };
        raw.split(';')
            .filter_map(|pair| pair.split_once('='))
            .any(|(k, v)| k.trim() == name && !v.trim().is_empty())
    }

    /// Drops a cookie locally by storing an already-expired copy of it.
    pub fn expire_cookie(&self, name: &str) {
        if let Ok(url) = Url::parse(&self.base_url()) {
            self.jar
                .add_cookie_str(&format!("{}=; Path=/; Max-Age=0", name), &url);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, path).json(body)).await
    }

    /// POST without a body; the response payload is discarded.
    pub async fn post_empty(&self, path: &str) -> ApiResult<()> {
        let _: JsonValue = self.send(self.request(Method::POST, path)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let _: JsonValue = self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// Raw GET used by health probes: no envelope handling, caller sets the timeout.
    pub async fn probe(&self, url: &str, timeout: std::time::Duration) -> ApiResult<StatusCode> {
        let resp = self.http.get(url).timeout(timeout).send().await?;
        Ok(resp.status())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url(), path.trim_start_matches('/'));
        self.http.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body: JsonValue = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            tracing::debug!(%status, %message, "api request failed");
            return Err(ApiError::Status { status, message });
        }

        serde_json::from_value(unwrap_envelope(body)).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Returns `data` when the body is the standard envelope, otherwise the body itself.
fn unwrap_envelope(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(mut map) if map.contains_key("success") => {
            map.remove("data").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}
