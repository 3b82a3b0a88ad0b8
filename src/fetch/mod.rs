//! Remote logo acquisition.
//!
//! [`RemoteImageFetcher`] makes one logical attempt per call: a direct GET
//! with a short deadline, then the proxy service, which returns the image as
//! a `data:` URI. Hosts known to block hotlinking skip the direct attempt.
//! Every path ends in `Ok(LogoImage)` or a [`LoadFailure`]; nothing panics
//! or propagates transport errors upward.

mod data_uri;
mod transport;

use std::cell::RefCell;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use data_uri::decode_data_uri;
pub use transport::{HttpTransport, ProxyRequest, ProxyResponse, Transport};

use crate::error::{ConfigError, LoadFailure};
use crate::image::LogoImage;
use crate::model::LogoUrl;

const DIRECT_TIMEOUT_MS: u64 = 5_000;
const PROXY_TIMEOUT_MS: u64 = 20_000;
const PROXY_CACHE_CAPACITY: usize = 256;
const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
const USER_AGENT: &str = concat!("matchcard/", env!("CARGO_PKG_VERSION"));

/// Vendor CDNs that reject hotlinked requests without a matching referer.
const RESTRICTED_HOSTS: &[&str] = &[
    "*.cloudfront.net",
    "*.akamaihd.net",
    "*.akamaized.net",
    "*.fastly.net",
    "*.imgix.net",
    "*.cloudinary.com",
    "cdn.*",
    "images.*",
];

/// Anything that can turn a URL into a drawable image.
pub trait ImageSource {
    fn load(&self, url: &LogoUrl) -> impl Future<Output = Result<LogoImage, LoadFailure>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub proxy_endpoint: Option<String>,
    #[serde(default = "default_direct_timeout_ms")]
    pub direct_timeout_ms: u64,
    /// Upper bound on one proxy round-trip. `0` disables the bound.
    #[serde(default = "default_proxy_timeout_ms")]
    pub proxy_timeout_ms: u64,
    #[serde(default = "default_restricted_hosts")]
    pub restricted_hosts: Vec<String>,
    #[serde(default = "default_proxy_cache_capacity")]
    pub proxy_cache_capacity: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_direct_timeout_ms() -> u64 {
    DIRECT_TIMEOUT_MS
}
fn default_proxy_timeout_ms() -> u64 {
    PROXY_TIMEOUT_MS
}
fn default_restricted_hosts() -> Vec<String> {
    RESTRICTED_HOSTS.iter().map(|h| h.to_string()).collect()
}
fn default_proxy_cache_capacity() -> usize {
    PROXY_CACHE_CAPACITY
}
fn default_max_image_bytes() -> u64 {
    MAX_IMAGE_BYTES
}
fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: None,
            direct_timeout_ms: DIRECT_TIMEOUT_MS,
            proxy_timeout_ms: PROXY_TIMEOUT_MS,
            restricted_hosts: default_restricted_hosts(),
            proxy_cache_capacity: PROXY_CACHE_CAPACITY,
            max_image_bytes: MAX_IMAGE_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    pub fn with_proxy(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = Some(endpoint.into());
        self
    }

    /// True when the URL's host matches one of `restricted_hosts`.
    pub fn is_restricted(&self, url: &str) -> bool {
        let Some(host) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return false;
        };
        self.restricted_hosts
            .iter()
            .any(|pattern| host_matches(&pattern.to_ascii_lowercase(), &host))
    }

    fn direct_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_timeout_ms)
    }

    fn proxy_timeout(&self) -> Option<Duration> {
        (self.proxy_timeout_ms > 0).then(|| Duration::from_millis(self.proxy_timeout_ms))
    }
}

/// `*.example.com` matches the apex and any subdomain, `cdn.*` matches any
/// host whose first label is `cdn`, anything else must match exactly.
fn host_matches(pattern: &str, host: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        host == suffix || host.ends_with(&format!(".{suffix}"))
    } else if let Some(prefix) = pattern.strip_suffix(".*") {
        host.starts_with(&format!("{prefix}."))
    } else {
        host == pattern
    }
}

pub struct RemoteImageFetcher<T = HttpTransport> {
    transport: T,
    config: FetchConfig,
    proxy_payloads: RefCell<LruCache<String, String>>,
}

impl RemoteImageFetcher<HttpTransport> {
    /// Each request kind carries its own socket deadline: the direct GET
    /// uses `direct_timeout_ms`, the proxy POST `proxy_timeout_ms` (none when
    /// that is `0`).
    pub fn new(config: FetchConfig) -> Self {
        let transport = HttpTransport::new(&config.user_agent, config.max_image_bytes)
            .with_direct_timeout(Some(config.direct_timeout()))
            .with_proxy_timeout(config.proxy_timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> RemoteImageFetcher<T> {
    pub fn with_transport(config: FetchConfig, transport: T) -> Self {
        let capacity =
            NonZeroUsize::new(config.proxy_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            transport,
            config,
            proxy_payloads: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The proxy's `data:` payload for a URL, if one was received earlier.
    pub fn cached_proxy_payload(&self, url: &LogoUrl) -> Option<String> {
        self.proxy_payloads.borrow().peek(url.as_str()).cloned()
    }

    pub async fn fetch(&self, url: &LogoUrl) -> Result<LogoImage, LoadFailure> {
        if url.is_data_uri() {
            return image_from_data_uri(url.as_str());
        }

        let cached = self.proxy_payloads.borrow_mut().get(url.as_str()).cloned();
        if let Some(payload) = cached {
            debug!(url = %url, "using cached proxy payload");
            return image_from_data_uri(&payload);
        }

        if self.config.is_restricted(url.as_str()) {
            debug!(url = %url, "restricted host, skipping direct load");
        } else {
            match self.fetch_direct(url).await {
                Ok(image) => return Ok(image),
                Err(failure) => {
                    debug!(url = %url, error = %failure, "direct load failed, trying proxy");
                }
            }
        }

        let result = self.fetch_via_proxy(url).await;
        if let Err(failure) = &result {
            warn!(url = %url, error = %failure, "logo could not be loaded");
        }
        result
    }

    async fn fetch_direct(&self, url: &LogoUrl) -> Result<LogoImage, LoadFailure> {
        let deadline = self.config.direct_timeout();
        let bytes = tokio::time::timeout(deadline, self.transport.get(url.as_str()))
            .await
            .map_err(|_| LoadFailure::TimedOut(self.config.direct_timeout_ms))??;
        LogoImage::from_bytes(bytes)
    }

    async fn fetch_via_proxy(&self, url: &LogoUrl) -> Result<LogoImage, LoadFailure> {
        let endpoint = self
            .config
            .proxy_endpoint
            .as_deref()
            .ok_or(LoadFailure::ProxyUnavailable)?;
        let request = ProxyRequest {
            url: url.to_string(),
        };

        let attempt = self.transport.post_proxy(endpoint, &request);
        let response = match self.config.proxy_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, attempt)
                .await
                .map_err(|_| LoadFailure::TimedOut(self.config.proxy_timeout_ms))??,
            None => attempt.await?,
        };

        if !response.success {
            return Err(LoadFailure::ProxyRejected(
                response
                    .error
                    .unwrap_or_else(|| "proxy reported failure".to_string()),
            ));
        }
        let payload = response
            .image_data
            .ok_or_else(|| LoadFailure::ProxyRejected("response had no imageData".to_string()))?;

        let image = image_from_data_uri(&payload)?;
        debug!(url = %url, bytes = image.bytes().len(), "loaded via proxy");
        self.proxy_payloads.borrow_mut().put(url.to_string(), payload);
        Ok(image)
    }
}

impl<T: Transport> ImageSource for RemoteImageFetcher<T> {
    async fn load(&self, url: &LogoUrl) -> Result<LogoImage, LoadFailure> {
        self.fetch(url).await
    }
}

fn image_from_data_uri(uri: &str) -> Result<LogoImage, LoadFailure> {
    LogoImage::from_bytes(decode_data_uri(uri)?)
}
