//! Turning a finished card into PNG bytes and, optionally, a file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future;
use tracing::{debug, info, warn};

use crate::cache::PendingLoad;
use crate::error::ExportError;
use crate::model::{Entry, LogoUrl};
use crate::surface::RasterSurface;

/// A card as currently shown by a host view: the nested surface, the scale
/// it is displayed at, and images that may still be loading.
pub struct LiveView {
    surface: Option<Rc<RasterSurface>>,
    display_scale: f32,
    images: Vec<(LogoUrl, PendingLoad)>,
}

impl LiveView {
    pub fn new(surface: Option<Rc<RasterSurface>>) -> Self {
        Self {
            surface,
            display_scale: 1.0,
            images: Vec::new(),
        }
    }

    pub fn with_display_scale(mut self, scale: f32) -> Self {
        self.display_scale = scale;
        self
    }

    pub fn track_image(&mut self, url: LogoUrl, load: PendingLoad) {
        self.images.push((url, load));
    }

    pub fn display_scale(&self) -> f32 {
        self.display_scale
    }

    pub fn set_display_scale(&mut self, scale: f32) {
        self.display_scale = scale;
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_deref()
    }
}

pub enum ExportSource<'a> {
    Surface(&'a RasterSurface),
    Live(&'a LiveView),
}

/// A fully encoded export, ready to hand to a download or share action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Filename for an export: the slugified title, or a name built from the
/// entry count when there is no usable title.
pub fn export_filename(entries: &[Entry], title: Option<&str>) -> String {
    let slug = title.map(slugify).unwrap_or_default();
    if !slug.is_empty() {
        return format!("{}.png", slug);
    }
    match entries.len() {
        1 => "schedule-1-entry.png".to_string(),
        n => format!("schedule-{}-entries.png", n),
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ExportPipeline {
    title: Option<String>,
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Encodes `source` at the surface's native pixel size.
    ///
    /// A live view first waits for every tracked image to settle; failed
    /// images are logged and skipped. Display scale never affects the
    /// exported pixels.
    pub async fn export(
        &self,
        source: ExportSource<'_>,
        entries: &[Entry],
    ) -> Result<ExportedImage, ExportError> {
        let (width, height, png) = match source {
            ExportSource::Surface(surface) => snapshot(surface)?,
            ExportSource::Live(view) => export_live(view).await?,
        };

        let image = ExportedImage {
            filename: export_filename(entries, self.title.as_deref()),
            width,
            height,
            png,
        };
        info!(
            filename = %image.filename,
            width = image.width,
            height = image.height,
            bytes = image.png.len(),
            "export complete"
        );
        Ok(image)
    }

    /// Callback form of [`export`](Self::export). `on_done` runs exactly
    /// once, after the PNG is fully encoded or the export has failed.
    pub async fn export_with<F>(&self, source: ExportSource<'_>, entries: &[Entry], on_done: F)
    where
        F: FnOnce(Result<ExportedImage, ExportError>),
    {
        on_done(self.export(source, entries).await);
    }
}

/// The snapshot copies the surface's own pixels, so the scale the view is
/// displayed at never reaches the export.
async fn export_live(view: &LiveView) -> Result<(u32, u32, Vec<u8>), ExportError> {
    if view.surface.is_none() {
        return Err(ExportError::MissingSurface);
    }

    if !view.images.is_empty() {
        debug!(count = view.images.len(), "waiting on live images");
        let loads = view.images.iter().map(|(_, load)| load.clone());
        let results = future::join_all(loads).await;
        for ((url, _), result) in view.images.iter().zip(results) {
            if let Err(failure) = result {
                warn!(url = %url, error = %failure, "live image failed, exporting without it");
            }
        }
    }

    let surface = view.surface.as_deref().ok_or(ExportError::MissingSurface)?;
    snapshot(surface)
}

/// Copies the surface at 1:1 and encodes it.
fn snapshot(surface: &RasterSurface) -> Result<(u32, u32, Vec<u8>), ExportError> {
    let copy = surface.clone();
    let png = copy.encode_png()?;
    Ok((copy.width(), copy.height(), png))
}

/// Writes exports into a directory. The final file appears only once its
/// contents are complete.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, image: &ExportedImage) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(&image.filename);
        let partial = self.dir.join(format!(".{}.part", image.filename));

        let written = File::create(&partial).and_then(|mut file| {
            file.write_all(&image.png)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&partial, &target)) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        debug!(path = %target.display(), "export written");
        Ok(target)
    }
}
