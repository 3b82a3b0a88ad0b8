use std::num::NonZeroUsize;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};
use lru::LruCache;

const MEASURE_CACHE_CAPACITY: usize = 4096;

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_bold: bool,
    is_italic: bool,
}

/// Measures single-line text as (width, height) in pixels.
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool, is_italic: bool)
    -> (f32, f32);
}

impl<T: TextMeasure + ?Sized> TextMeasure for &mut T {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_bold: bool,
        is_italic: bool,
    ) -> (f32, f32) {
        (**self).measure_text(text, font_size, is_bold, is_italic)
    }
}

/// Shapes text with the system font set.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: LruCache<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: LruCache::new(
                NonZeroUsize::new(MEASURE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            ),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_bold: bool,
        is_italic: bool,
    ) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_bold,
            is_italic,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );

        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new()
            .family(Family::SansSerif)
            .weight(if is_bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            })
            .style(if is_italic {
                Style::Italic
            } else {
                Style::Normal
            });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;

        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height);
        self.cache.put(key, measured);
        measured
    }
}

/// Fixed advance per character. Deterministic and font-free, for hosts
/// without system fonts and for layout tests.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub advance_ratio: f32,
    pub bold_advance_ratio: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            bold_advance_ratio: 0.65,
        }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_bold: bool,
        _is_italic: bool,
    ) -> (f32, f32) {
        let ratio = if is_bold {
            self.bold_advance_ratio
        } else {
            self.advance_ratio
        };
        let width = text.chars().count() as f32 * font_size * ratio;
        (width, font_size * 1.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_width_scales_with_char_count_not_bytes() {
        let mut measure = MonospaceMeasure::default();
        let (ascii, _) = measure.measure_text("abc", 10.0, false, false);
        let (nordic, _) = measure.measure_text("æøå", 10.0, false, false);
        assert_eq!(ascii, nordic);
        assert!((ascii - 18.0).abs() < 1e-4);
    }

    #[test]
    fn shaped_measurements_are_memoized() {
        let mut measure = CosmicTextMeasure::new();
        let first = measure.measure_text("Lions", 20.0, true, false);
        let second = measure.measure_text("Lions", 20.0, true, false);
        assert_eq!(first, second);
        assert_eq!(measure.cache.len(), 1);

        measure.measure_text("Lions", 20.0, false, false);
        assert_eq!(measure.cache.len(), 2);
    }

    #[test]
    fn bold_is_wider() {
        let mut measure = MonospaceMeasure::default();
        let (regular, _) = measure.measure_text("Lions", 20.0, false, false);
        let (bold, _) = measure.measure_text("Lions", 20.0, true, false);
        assert!(bold > regular);
    }
}
