//! Single network attempts: a direct GET and a proxy round-trip.
//!
//! `ureq` is blocking, so each attempt runs on tokio's blocking pool and the
//! caller awaits the join handle from the event loop.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Body sent to the proxy service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRequest {
    pub url: String,
}

/// The proxy answers with an embeddable `data:` URI on success.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,
    #[serde(default, rename = "imageData")]
    pub image_data: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>>;

    fn post_proxy(
        &self,
        endpoint: &str,
        request: &ProxyRequest,
    ) -> impl Future<Output = Result<ProxyResponse, TransportError>>;
}

#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
    direct_timeout: Option<Duration>,
    proxy_timeout: Option<Duration>,
}

impl HttpTransport {
    /// No request is bounded until a timeout is set for its kind.
    pub fn new(user_agent: &str, max_body_bytes: u64) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            user_agent: user_agent.to_string(),
            max_body_bytes,
            direct_timeout: None,
            proxy_timeout: None,
        }
    }

    pub fn with_direct_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.direct_timeout = timeout;
        self
    }

    /// `None` lets a proxy round-trip run as long as the proxy needs.
    pub fn with_proxy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.proxy_timeout = timeout;
        self
    }

    pub fn direct_timeout(&self) -> Option<Duration> {
        self.direct_timeout
    }

    pub fn proxy_timeout(&self) -> Option<Duration> {
        self.proxy_timeout
    }
}

fn body_error(err: ureq::Error, limit: u64) -> TransportError {
    match err {
        ureq::Error::BodyExceedsLimit(_) => TransportError::TooLarge { limit },
        other => TransportError::Http(other.to_string()),
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let user_agent = self.user_agent.clone();
        let limit = self.max_body_bytes;
        let timeout = self.direct_timeout;

        tokio::task::spawn_blocking(move || {
            let mut response = agent
                .get(&url)
                .config()
                .timeout_global(timeout)
                .build()
                .header("User-Agent", user_agent.as_str())
                .call()
                .map_err(|e| TransportError::Http(e.to_string()))?;

            response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_vec()
                .map_err(|e| body_error(e, limit))
        })
        .await
        .map_err(|e| TransportError::Join(e.to_string()))?
    }

    async fn post_proxy(
        &self,
        endpoint: &str,
        request: &ProxyRequest,
    ) -> Result<ProxyResponse, TransportError> {
        let agent = self.agent.clone();
        let endpoint = endpoint.to_string();
        let user_agent = self.user_agent.clone();
        // base64 inflates the image by a third, plus the JSON envelope.
        let limit = self.max_body_bytes.saturating_mul(2);
        let timeout = self.proxy_timeout;
        let body =
            serde_json::to_vec(request).map_err(|e| TransportError::Http(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&endpoint)
                .config()
                .timeout_global(timeout)
                .build()
                .header("User-Agent", user_agent.as_str())
                .header("Content-Type", "application/json")
                .send(&body[..])
                .map_err(|e| TransportError::Http(e.to_string()))?;

            let text = response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_string()
                .map_err(|e| body_error(e, limit))?;

            serde_json::from_str::<ProxyResponse>(&text)
                .map_err(|e| TransportError::MalformedResponse(e.to_string()))
        })
        .await
        .map_err(|e| TransportError::Join(e.to_string()))?
    }
}
