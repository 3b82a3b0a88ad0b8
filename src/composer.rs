//! Render orchestration: resolve every logo, then lay out and rasterize.
//!
//! Drawing starts only after the whole batch has settled, so a card never
//! shows a mix of drawn and not-yet-loaded logos. Failed logos become
//! placeholders and a failed background becomes the gradient; neither aborts
//! the render.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::cache::{ImageLoadCache, ResolvedLogos};
use crate::canvas::SvgCanvas;
use crate::error::RenderError;
use crate::fetch::ImageSource;
use crate::fonts::TextMeasure;
use crate::image::LogoImage;
use crate::layout::{LayoutEngine, surface_height};
use crate::model::{Entry, LogoUrl};
use crate::style::StyleConfig;
use crate::surface::{RasterSurface, Rasterizer};

/// A laid-out card before rasterization.
#[derive(Debug, Clone)]
pub struct Scene {
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

/// Distinct, non-blank logo URLs in first-seen order. Empty when logos are
/// switched off, so nothing is fetched for them.
pub fn collect_logo_urls(entries: &[Entry], style: &StyleConfig) -> Vec<LogoUrl> {
    if !style.show_logos {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    entries
        .iter()
        .flat_map(Entry::logo_urls)
        .filter(|url| seen.insert(*url))
        .cloned()
        .collect()
}

pub struct GraphicComposer<S, M> {
    cache: Rc<ImageLoadCache<S>>,
    engine: RefCell<LayoutEngine<M>>,
    rasterizer: Rasterizer,
}

impl<S: ImageSource + 'static, M: TextMeasure> GraphicComposer<S, M> {
    pub fn new(cache: Rc<ImageLoadCache<S>>, measure: M, rasterizer: Rasterizer) -> Self {
        Self {
            cache,
            engine: RefCell::new(LayoutEngine::new(measure)),
            rasterizer,
        }
    }

    pub fn cache(&self) -> &Rc<ImageLoadCache<S>> {
        &self.cache
    }

    pub async fn render(
        &self,
        entries: &[Entry],
        style: &StyleConfig,
    ) -> Result<RasterSurface, RenderError> {
        let scene = self.render_scene(entries, style).await?;
        self.rasterizer.rasterize(&scene.svg, style.scale)
    }

    /// Resolves logos and background, then lays the card out.
    pub async fn render_scene(
        &self,
        entries: &[Entry],
        style: &StyleConfig,
    ) -> Result<Scene, RenderError> {
        style.validate().map_err(RenderError::InvalidStyle)?;

        let urls = collect_logo_urls(entries, style);
        info!(
            entries = entries.len(),
            logos = urls.len(),
            "rendering schedule"
        );

        let background = async {
            match style.background_image.as_ref().filter(|url| !url.is_empty()) {
                Some(url) => Some(self.cache.resolve(url).await),
                None => None,
            }
        };
        let (logos, background) = futures::join!(self.cache.resolve_all(&urls), background);

        debug!(
            loaded = logos.loaded_count(),
            failed = logos.failed_count(),
            "logos settled"
        );

        let background = match background {
            Some(Ok(image)) => Some(image),
            Some(Err(failure)) => {
                warn!(error = %failure, "background unavailable, falling back to gradient");
                None
            }
            None => None,
        };

        Ok(self.compose_scene(entries, style, &logos, background.as_ref()))
    }

    /// Pure layout from already-resolved inputs. Same inputs, same scene.
    pub fn compose_scene(
        &self,
        entries: &[Entry],
        style: &StyleConfig,
        logos: &ResolvedLogos,
        background: Option<&LogoImage>,
    ) -> Scene {
        let width = style.width;
        let height = surface_height(entries, style).max(1.0);
        let mut canvas = SvgCanvas::new(width, height);
        let mut engine = self.engine.borrow_mut();

        engine.draw_background(&mut canvas, width, height, style, background);
        let mut y = engine.draw_title(&mut canvas, style);
        for entry in entries {
            y = engine.draw_entry(&mut canvas, entry, y, style, logos);
        }

        Scene {
            svg: canvas.finish(),
            width,
            height,
        }
    }
}

struct Rendered {
    entries: Vec<Entry>,
    style: StyleConfig,
    surface: Rc<RasterSurface>,
}

/// Keeps the latest card for a host view.
///
/// Unchanged inputs reuse the current surface. Any change discards it and
/// renders from scratch. When a newer `update` starts while an older one is
/// still waiting on logos, the older one resolves to `None` and its surface
/// is dropped.
pub struct RenderSession<S, M> {
    composer: GraphicComposer<S, M>,
    generation: Cell<u64>,
    current: RefCell<Option<Rendered>>,
    last_inputs: RefCell<Option<(Vec<Entry>, StyleConfig)>>,
}

impl<S: ImageSource + 'static, M: TextMeasure> RenderSession<S, M> {
    pub fn new(composer: GraphicComposer<S, M>) -> Self {
        Self {
            composer,
            generation: Cell::new(0),
            current: RefCell::new(None),
            last_inputs: RefCell::new(None),
        }
    }

    pub fn composer(&self) -> &GraphicComposer<S, M> {
        &self.composer
    }

    pub fn surface(&self) -> Option<Rc<RasterSurface>> {
        self.current
            .borrow()
            .as_ref()
            .map(|rendered| Rc::clone(&rendered.surface))
    }

    pub async fn update(
        &self,
        entries: &[Entry],
        style: &StyleConfig,
    ) -> Result<Option<Rc<RasterSurface>>, RenderError> {
        if let Some(rendered) = self.current.borrow().as_ref() {
            if rendered.entries == entries && rendered.style == *style {
                return Ok(Some(Rc::clone(&rendered.surface)));
            }
        }
        self.rerender(entries.to_vec(), style.clone()).await
    }

    /// Forgets `url` in the logo cache and renders the last inputs again.
    pub async fn retry(&self, url: &LogoUrl) -> Result<Option<Rc<RasterSurface>>, RenderError> {
        self.composer.cache().invalidate(url);
        let last = self.last_inputs.borrow().clone();
        match last {
            Some((entries, style)) => self.rerender(entries, style).await,
            None => Ok(None),
        }
    }

    async fn rerender(
        &self,
        entries: Vec<Entry>,
        style: StyleConfig,
    ) -> Result<Option<Rc<RasterSurface>>, RenderError> {
        self.current.borrow_mut().take();
        *self.last_inputs.borrow_mut() = Some((entries.clone(), style.clone()));

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let result = self.composer.render(&entries, &style).await;
        if self.generation.get() != generation {
            debug!(generation, "render superseded, discarding surface");
            return Ok(None);
        }

        let surface = Rc::new(result?);
        *self.current.borrow_mut() = Some(Rendered {
            entries,
            style,
            surface: Rc::clone(&surface),
        });
        Ok(Some(surface))
    }
}
