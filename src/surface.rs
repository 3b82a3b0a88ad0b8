use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::error::{ExportError, RenderError};

/// A finished bitmap. Never mutated once the draw phase has produced it.
#[derive(Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Unpremultiplied RGBA at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let pixel = self.pixmap.pixel(x, y)?.demultiply();
        Some([pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()])
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        self.pixmap
            .encode_png()
            .map_err(|e| ExportError::Encode(e.to_string()))
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Turns SVG scenes into pixels. Font discovery happens once, here.
pub struct Rasterizer {
    options: usvg::Options<'static>,
}

impl Rasterizer {
    /// Loads system fonts plus any in a local `fonts/` directory.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        {
            let fontdb = options.fontdb_mut();
            fontdb.load_system_fonts();

            let local_fonts = Path::new("fonts");
            if local_fonts.is_dir() {
                fontdb.load_fonts_dir(local_fonts);
            }

            configure_font_fallbacks(fontdb);
        }
        Self { options }
    }

    /// No fonts at all: text primitives are skipped. Shapes and images still
    /// render, which is all layout tests need.
    pub fn without_fonts() -> Self {
        Self {
            options: usvg::Options::default(),
        }
    }

    pub fn rasterize(&self, svg: &str, scale: f32) -> Result<RasterSurface, RenderError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderError::InvalidStyle(format!(
                "invalid scale value: {}",
                scale
            )));
        }

        let tree = usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| RenderError::Scene(e.to_string()))?;

        let width = (tree.size().width() * scale).ceil().max(1.0) as u32;
        let height = (tree.size().height() * scale).ceil().max(1.0) as u32;

        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?;
        let transform = Transform::from_scale(scale, scale);

        resvg::render(&tree, transform, &mut pixmap.as_mut());

        Ok(RasterSurface::from_pixmap(pixmap))
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn configure_font_fallbacks(fontdb: &mut usvg::fontdb::Database) {
    let mut sans_family: Option<String> = None;
    let mut first_family: Option<String> = None;

    for face in fontdb.faces() {
        for (family, _) in &face.families {
            if first_family.is_none() {
                first_family = Some(family.clone());
            }

            let lower = family.to_ascii_lowercase();
            if sans_family.is_none() && lower.contains("sans") && !lower.contains("mono") {
                sans_family = Some(family.clone());
            }
        }
    }

    if let Some(family) = sans_family.as_deref().or(first_family.as_deref()) {
        fontdb.set_sans_serif_family(family);
    }
}
