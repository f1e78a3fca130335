//! Centralized configuration (environment variables + defaults).

use crate::error::{ApiError, ApiResult};
use std::time::Duration;

pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Everything the client needs to reach the marketplace API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_fallback_url: Option<String>,
    pub socket_url: Option<String>,
    pub health_timeout: Duration,
    pub request_timeout: Duration,
    pub login_path: String,
    pub unauthorized_path: String,
}

impl ClientConfig {
    /// Config pointing at a single endpoint with every other value defaulted.
    pub fn for_endpoint(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_fallback_url: None,
            socket_url: None,
            health_timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
        }
    }

    /// Loads `.env` (if any) and reads the environment.
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let mut cfg = Self::for_endpoint(api_url()?);
        cfg.api_fallback_url = optional_url("API_FALLBACK_URL");
        cfg.socket_url = optional_url("SOCKET_URL");
        if let Some(ms) = parse_u64("HEALTH_TIMEOUT_MS")? {
            cfg.health_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64("REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(p) = optional_var("LOGIN_PATH") {
            cfg.login_path = p;
        }
        if let Some(p) = optional_var("UNAUTHORIZED_PATH") {
            cfg.unauthorized_path = p;
        }
        Ok(cfg)
    }

    /// Primary endpoint first, then the fallback if one is configured.
    pub fn endpoints(&self) -> Vec<String> {
        let mut out = vec![self.api_url.clone()];
        if let Some(fallback) = &self.api_fallback_url {
            if fallback != &self.api_url {
                out.push(fallback.clone());
            }
        }
        out
    }
}

/// Primary API base URL (required).
pub fn api_url() -> ApiResult<String> {
    optional_url("API_URL").ok_or_else(|| ApiError::Config("API_URL must be set".to_string()))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_url(name: &str) -> Option<String> {
    optional_var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64(name: &str) -> ApiResult<Option<u64>> {
    match optional_var(name) {
        None => Ok(None),
        Some(v) => v
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ApiError::Config(format!("{} must be a valid u64 (got '{}')", name, v))),
    }
}
