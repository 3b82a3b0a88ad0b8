//! Error taxonomy for fetching, rendering and exporting.
//!
//! Fetch problems never abort a render: they end up as a [`LoadFailure`]
//! recorded against a single URL. [`RenderError`] and [`ExportError`] are
//! structural and are reported to the caller of that one call.

use thiserror::Error;

/// One network attempt failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(String),

    #[error("response body exceeded {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("malformed proxy response: {0}")]
    MalformedResponse(String),

    #[error("transport task did not complete: {0}")]
    Join(String),
}

/// Terminal failure of a logo URL, as remembered by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0} ms")]
    TimedOut(u64),

    #[error("direct load failed and no proxy endpoint is configured")]
    ProxyUnavailable,

    #[error("proxy rejected the request: {0}")]
    ProxyRejected(String),

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),
}

impl From<TransportError> for LoadFailure {
    fn from(err: TransportError) -> Self {
        LoadFailure::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid style: {0}")]
    InvalidStyle(String),

    #[error("failed to allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },

    #[error("failed to rasterize scene: {0}")]
    Scene(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no raster surface to export")]
    MissingSurface,

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Structural errors mean the export target itself is missing and
    /// retrying the same call cannot succeed.
    pub fn is_structural(&self) -> bool {
        matches!(self, ExportError::MissingSurface)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse TOML: {0}")]
    Toml(String),

    #[error("failed to parse YAML: {0}")]
    Yaml(String),

    #[error("unknown built-in style '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },
}
