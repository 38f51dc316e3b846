//! The transport seam. `HttpTransport` is the only place a real socket is
//! touched; everything above it (pipeline, lifecycle controller, tests) works
//! against the trait.

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::config::ClientConfig;

use super::request::{ApiRequest, ApiResponse, Method};

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid transport configuration: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        // Base must end with '/' so joining keeps any path prefix (e.g. /api/).
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| TransportError::Config(format!("invalid api base '{base}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Send(format!("invalid request path '{path}': {e}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&req.path)?;
        let mut builder = match req.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        let status = resp.status().as_u16();
        // Empty and non-JSON bodies normalize to an empty object.
        let body = resp
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::json!({}));
        Ok(ApiResponse::new(status, body))
    }
}
