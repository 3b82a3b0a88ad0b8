//! Render match schedules to shareable PNG cards.
//!
//! A render resolves every distinct logo URL through a process-wide
//! [`ImageLoadCache`] (one fetch per URL, direct first and then through an
//! optional proxy), waits for the whole batch, lays the rows out onto an SVG
//! scene and rasterizes it. [`ExportPipeline`] turns the result into PNG
//! bytes.
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use matchcard::{
//!     Entry, ExportPipeline, ExportSource, FetchConfig, GraphicComposer, ImageLoadCache,
//!     MonospaceMeasure, PairedEntry, Rasterizer, RemoteImageFetcher, Side, StyleConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default().with_proxy("https://proxy.example/fetch");
//! let fetcher = RemoteImageFetcher::new(config);
//! let cache = Rc::new(ImageLoadCache::new(fetcher));
//! let composer = GraphicComposer::new(cache, MonospaceMeasure::default(), Rasterizer::new());
//!
//! let entries = vec![Entry::from(
//!     PairedEntry::new(
//!         Side::new("Lions").with_logo("https://logos.example/lions.png"),
//!         Side::new("Bears"),
//!     )
//!     .with_time("18:30"),
//! )];
//! let surface = composer.render(&entries, &StyleConfig::default()).await?;
//! let image = ExportPipeline::new()
//!     .export(ExportSource::Surface(&surface), &entries)
//!     .await?;
//! # let _ = image;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod canvas;
pub mod composer;
pub mod error;
pub mod export;
pub mod fetch;
pub mod fonts;
pub mod image;
pub mod layout;
pub mod model;
pub mod style;
pub mod surface;
mod xml;

pub use cache::{ImageLoadCache, LoadResult, LoadState, PendingLoad, ResolvedLogos};
pub use composer::{GraphicComposer, RenderSession, Scene};
pub use error::{ConfigError, ExportError, LoadFailure, RenderError, TransportError};
pub use export::{ExportPipeline, ExportSource, ExportedImage, FileSink, LiveView, export_filename};
pub use fetch::{FetchConfig, ImageSource, RemoteImageFetcher};
pub use fonts::{CosmicTextMeasure, MonospaceMeasure, TextMeasure};
pub use image::{ImageFormat, LogoImage};
pub use layout::{LayoutEngine, surface_height};
pub use model::{Entry, LogoUrl, PairedEntry, Side, SingleEntry};
pub use style::{EmphasisRule, StyleConfig, TitleAlign};
pub use surface::{RasterSurface, Rasterizer};
