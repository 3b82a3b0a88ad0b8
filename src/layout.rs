//! Row geometry and drawing for schedule cards.
//!
//! The engine is stateless between calls apart from its text metrics cache.
//! The caller owns the vertical cursor: [`LayoutEngine::draw_entry`] draws one
//! row at a given `y` and returns where the next row starts.
//!
//! ```text
//! | time |  name A  [logo] – [logo]  name B  | tournament |
//!        ^content_left    center     content_right^
//! ```

use crate::cache::ResolvedLogos;
use crate::canvas::{Canvas, GradientStop, ImageFit, Rect, TextAnchor, TextStyle};
use crate::fonts::TextMeasure;
use crate::image::LogoImage;
use crate::model::{Entry, PairedEntry, Side, SingleEntry};
use crate::style::{StyleConfig, TitleAlign};

pub const ELLIPSIS: &str = "\u{2026}";
const SEPARATOR: &str = "\u{2013}";
const BASELINE_SHIFT: f32 = 0.35;
const PLACEHOLDER_GLYPH_RATIO: f32 = 0.45;
const OVERLAY_TOP_OPACITY: f32 = 0.35;
const OVERLAY_BOTTOM_OPACITY: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn regular(size: f32) -> Self {
        Self {
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(size: f32) -> Self {
        Self {
            size,
            bold: true,
            italic: false,
        }
    }

    pub fn italic(size: f32) -> Self {
        Self {
            size,
            bold: false,
            italic: true,
        }
    }

    fn text_style(self, color: &str, anchor: TextAnchor) -> TextStyle {
        TextStyle {
            font_size: self.size,
            color: color.to_string(),
            bold: self.bold,
            italic: self.italic,
            anchor,
        }
    }
}

/// Total card height: explicit `style.height`, or the header offset plus
/// every row's extent.
pub fn surface_height(entries: &[Entry], style: &StyleConfig) -> f32 {
    style.height.unwrap_or_else(|| {
        style.header_offset() + entries.iter().map(|e| style.row_extent(e)).sum::<f32>()
    })
}

/// Baseline that vertically centres a line of `font_size` text in `rect`.
fn centered_baseline(rect: Rect, font_size: f32) -> f32 {
    rect.center().1 + font_size * BASELINE_SHIFT
}

pub struct LayoutEngine<M> {
    measure: M,
}

impl<M: TextMeasure> LayoutEngine<M> {
    pub fn new(measure: M) -> Self {
        Self { measure }
    }

    pub fn text_width(&mut self, text: &str, font: FontSpec) -> f32 {
        self.measure
            .measure_text(text, font.size, font.bold, font.italic)
            .0
    }

    /// Shortens `text` until it fits `max_width`, ending in an ellipsis.
    ///
    /// Text that already fits is returned unchanged, so applying this twice
    /// is the same as applying it once. If not even the ellipsis fits, the
    /// result is empty.
    pub fn truncate(&mut self, text: &str, max_width: f32, font: FontSpec) -> String {
        let max_width = if max_width.is_nan() { 0.0 } else { max_width };

        if self.text_width(text, font) <= max_width {
            return text.to_string();
        }
        if self.text_width(ELLIPSIS, font) > max_width {
            return String::new();
        }

        let mut chars: Vec<char> = text.chars().collect();
        while chars.pop().is_some() {
            let kept: String = chars.iter().collect();
            let candidate = format!("{}{}", kept.trim_end(), ELLIPSIS);
            if self.text_width(&candidate, font) <= max_width {
                return candidate;
            }
        }

        ELLIPSIS.to_string()
    }

    /// Fills the whole card. A background image is covered by a darkening
    /// overlay; without one the two configured colours form a gradient.
    pub fn draw_background<C: Canvas>(
        &self,
        canvas: &mut C,
        width: f32,
        height: f32,
        style: &StyleConfig,
        image: Option<&LogoImage>,
    ) {
        let full = Rect::new(0.0, 0.0, width, height);
        match image {
            Some(image) => {
                canvas.draw_image(full, image, ImageFit::Cover);
                canvas.fill_vertical_gradient(
                    full,
                    &GradientStop {
                        color: style.overlay_color.clone(),
                        opacity: OVERLAY_TOP_OPACITY,
                    },
                    &GradientStop {
                        color: style.overlay_color.clone(),
                        opacity: OVERLAY_BOTTOM_OPACITY,
                    },
                );
            }
            None => canvas.fill_vertical_gradient(
                full,
                &GradientStop::opaque(&style.background_color),
                &GradientStop::opaque(&style.background_color_end),
            ),
        }
    }

    /// Draws the optional title and returns the `y` of the first row.
    pub fn draw_title<C: Canvas>(&mut self, canvas: &mut C, style: &StyleConfig) -> f32 {
        let title = match style.title.as_deref() {
            Some(title) if style.has_title() => title,
            _ => return style.padding_top,
        };

        let font = FontSpec::bold(style.title_font_size);
        let budget = style.width - style.padding_x * 2.0;
        let text = self.truncate(title.trim(), budget, font);
        let (x, anchor) = match style.title_align {
            TitleAlign::Left => (style.padding_x, TextAnchor::Start),
            TitleAlign::Center => (style.width / 2.0, TextAnchor::Middle),
            TitleAlign::Right => (style.width - style.padding_x, TextAnchor::End),
        };
        canvas.draw_text(
            x,
            style.padding_top + style.title_font_size,
            &text,
            &font.text_style(&style.text_color, anchor),
        );

        style.padding_top + style.title_block
    }

    /// Draws one row with its top edge at `y` and returns the next row's `y`.
    pub fn draw_entry<C: Canvas>(
        &mut self,
        canvas: &mut C,
        entry: &Entry,
        y: f32,
        style: &StyleConfig,
        logos: &ResolvedLogos,
    ) -> f32 {
        let row = Rect::new(
            style.padding_x,
            y,
            style.width - style.padding_x * 2.0,
            style.row_height,
        );
        let emphasized = style.is_emphasized(entry);
        let fill = if emphasized {
            &style.emphasized_row_color
        } else {
            &style.row_color
        };
        canvas.fill_rounded_rect(row, style.corner_radius, fill);

        let inner_left = row.x + style.row_padding;
        let inner_right = row.right() - style.row_padding;
        let mut content_left = inner_left;

        if style.show_time {
            if let Some(time) = entry.time() {
                let font = FontSpec::bold(style.time_font_size);
                let text = self.truncate(time, style.time_gutter - style.logo_spacing, font);
                canvas.draw_text(
                    inner_left,
                    centered_baseline(row, font.size),
                    &text,
                    &font.text_style(&style.text_color, TextAnchor::Start),
                );
            }
            content_left += style.time_gutter;
        }

        match entry {
            Entry::Paired(paired) => {
                self.draw_paired(canvas, paired, row, content_left, inner_right, style, logos)
            }
            Entry::Single(single) => {
                self.draw_single(canvas, single, row, content_left, inner_right, style)
            }
        }

        if emphasized {
            if let Some(rule) = &style.emphasis {
                self.draw_caption(canvas, &rule.caption, row, style);
            }
        }

        y + style.row_extent(entry)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_paired<C: Canvas>(
        &mut self,
        canvas: &mut C,
        entry: &PairedEntry,
        row: Rect,
        content_left: f32,
        inner_right: f32,
        style: &StyleConfig,
        logos: &ResolvedLogos,
    ) {
        let content_right = inner_right - style.tournament_gutter;
        let center = (content_left + content_right) / 2.0;
        let name_font = FontSpec::bold(style.font_size);
        let baseline = centered_baseline(row, name_font.size);

        canvas.draw_text(
            center,
            baseline,
            SEPARATOR,
            &name_font.text_style(&style.secondary_text_color, TextAnchor::Middle),
        );

        let logo_block = if style.show_logos {
            style.logo_size + style.logo_spacing
        } else {
            0.0
        };
        let logo_top = row.center().1 - style.logo_size / 2.0;

        let home_end = center - style.center_gap;
        if style.show_logos {
            let rect = Rect::new(
                home_end - style.logo_size,
                logo_top,
                style.logo_size,
                style.logo_size,
            );
            self.draw_logo(canvas, &entry.home, rect, style, logos);
        }
        let home_text_right = home_end - logo_block;
        let home_name = self.truncate(
            &entry.home.name,
            (home_text_right - content_left).max(0.0),
            name_font,
        );
        canvas.draw_text(
            home_text_right,
            baseline,
            &home_name,
            &name_font.text_style(&style.text_color, TextAnchor::End),
        );

        let away_start = center + style.center_gap;
        if style.show_logos {
            let rect = Rect::new(away_start, logo_top, style.logo_size, style.logo_size);
            self.draw_logo(canvas, &entry.away, rect, style, logos);
        }
        let away_text_left = away_start + logo_block;
        let away_name = self.truncate(
            &entry.away.name,
            (content_right - away_text_left).max(0.0),
            name_font,
        );
        canvas.draw_text(
            away_text_left,
            baseline,
            &away_name,
            &name_font.text_style(&style.text_color, TextAnchor::Start),
        );

        if let Some(tournament) = entry.tournament.as_deref() {
            let font = FontSpec::regular(style.tournament_font_size);
            let budget = (style.tournament_gutter - style.logo_spacing).max(0.0);
            let text = self.truncate(tournament, budget, font);
            canvas.draw_text(
                inner_right,
                centered_baseline(row, font.size),
                &text,
                &font.text_style(&style.secondary_text_color, TextAnchor::End),
            );
        }
    }

    fn draw_single<C: Canvas>(
        &mut self,
        canvas: &mut C,
        entry: &SingleEntry,
        row: Rect,
        content_left: f32,
        inner_right: f32,
        style: &StyleConfig,
    ) {
        let font = FontSpec::bold(style.font_size);
        let label = self.truncate(&entry.label, (inner_right - content_left).max(0.0), font);
        canvas.draw_text(
            content_left,
            centered_baseline(row, font.size),
            &label,
            &font.text_style(&style.text_color, TextAnchor::Start),
        );
    }

    /// Draws the loaded logo, or a lettered disc when there is none.
    fn draw_logo<C: Canvas>(
        &self,
        canvas: &mut C,
        side: &Side,
        rect: Rect,
        style: &StyleConfig,
        logos: &ResolvedLogos,
    ) {
        match side.logo_url().and_then(|url| logos.get(url)) {
            Some(image) => canvas.draw_image(rect, image, ImageFit::Contain),
            None => {
                let (cx, cy) = rect.center();
                let radius = rect.width.min(rect.height) / 2.0;
                canvas.fill_circle(cx, cy, radius, &style.placeholder_color);

                let initial: String = side
                    .name
                    .trim()
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().collect())
                    .unwrap_or_default();
                let font = FontSpec::bold(rect.height * PLACEHOLDER_GLYPH_RATIO);
                canvas.draw_text(
                    cx,
                    cy + font.size * BASELINE_SHIFT,
                    &initial,
                    &font.text_style(&style.text_color, TextAnchor::Middle),
                );
            }
        }
    }

    fn draw_caption<C: Canvas>(
        &mut self,
        canvas: &mut C,
        caption: &str,
        row: Rect,
        style: &StyleConfig,
    ) {
        let font = FontSpec::italic(style.caption_font_size);
        let text = self.truncate(caption, row.width - style.row_padding * 2.0, font);
        let band = Rect::new(row.x, row.bottom(), row.width, style.emphasis_increment);
        canvas.draw_text(
            row.x + style.row_padding,
            centered_baseline(band, font.size),
            &text,
            &font.text_style(&style.text_color, TextAnchor::Start),
        );
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::cache::LoadResult;
    use crate::canvas::testing::{Op, RecordingCanvas};
    use crate::error::LoadFailure;
    use crate::fonts::MonospaceMeasure;
    use crate::image::testing::solid_png;
    use crate::model::LogoUrl;
    use crate::style::EmphasisRule;

    fn engine() -> LayoutEngine<MonospaceMeasure> {
        LayoutEngine::new(MonospaceMeasure::default())
    }

    fn style() -> StyleConfig {
        StyleConfig::default()
    }

    fn paired(home: &str, away: &str) -> Entry {
        Entry::from(PairedEntry::new(Side::new(home), Side::new(away)).with_time("18:30"))
    }

    fn base_row(style: &StyleConfig) -> f32 {
        style.row_height + style.row_gap
    }

    #[test]
    fn truncate_keeps_short_text() {
        let font = FontSpec::regular(10.0);
        assert_eq!(engine().truncate("Lions", 100.0, font), "Lions");
    }

    #[test]
    fn truncate_long_name_to_budget() {
        let mut engine = engine();
        let font = FontSpec::bold(28.0);
        let name = "X".repeat(200);

        let text = engine.truncate(&name, 120.0, font);
        assert!(text.ends_with(ELLIPSIS));
        assert!(engine.text_width(&text, font) <= 120.0);
        assert!(text.chars().count() > 1);
    }

    #[test]
    fn truncate_trims_space_before_ellipsis() {
        let font = FontSpec::regular(10.0);
        // 6px per char: "Real M…" would be 7 chars = 42px; budget 36 keeps "Real…".
        assert_eq!(engine().truncate("Real Madrid", 36.0, font), "Real\u{2026}");
    }

    #[test]
    fn truncate_below_ellipsis_width_is_empty() {
        let font = FontSpec::regular(10.0);
        assert_eq!(engine().truncate("Lions", 5.0, font), "");
        assert_eq!(engine().truncate("Lions", 0.0, font), "");
        assert_eq!(engine().truncate("Lions", f32::NAN, font), "");
    }

    proptest! {
        #[test]
        fn truncate_is_idempotent_and_fits(text in "\\PC{0,80}", width in 0.0f32..400.0) {
            let mut engine = engine();
            let font = FontSpec::regular(14.0);
            let once = engine.truncate(&text, width, font);
            let twice = engine.truncate(&once, width, font);

            prop_assert_eq!(&once, &twice);
            prop_assert!(once.is_empty() || engine.text_width(&once, font) <= width);
        }
    }

    #[test]
    fn height_of_empty_list_is_header_offset() {
        let style = style();
        assert_eq!(surface_height(&[], &style), style.header_offset());
    }

    #[test]
    fn height_counts_emphasis_increments() {
        let mut style = style();
        style.title = Some("Weekend".to_string());
        style.emphasis = Some(EmphasisRule {
            team: "Lions".to_string(),
            caption: "Live on TV".to_string(),
        });
        let entries = vec![
            paired("Lions", "Bears"),
            paired("Owls", "Bears"),
            Entry::from(SingleEntry::new("Training", "10:00")),
        ];

        let expected = style.header_offset() + 3.0 * base_row(&style) + style.emphasis_increment;
        assert_eq!(
            surface_height(&entries[..1], &style),
            style.header_offset() + base_row(&style) + style.emphasis_increment
        );
        assert_eq!(surface_height(&entries, &style), expected);
    }

    #[test]
    fn explicit_height_wins() {
        let style = StyleConfig {
            height: Some(1920.0),
            ..style()
        };
        assert_eq!(surface_height(&[paired("A", "B")], &style), 1920.0);
    }

    #[test]
    fn rows_without_logos_issue_no_logo_draws() {
        let style = StyleConfig {
            show_logos: false,
            show_time: true,
            ..style()
        };
        let entries = vec![paired("Lions", "Bears"), paired("Owls", "Hawks")];
        let mut engine = engine();
        let mut canvas = RecordingCanvas::default();

        let mut y = engine.draw_title(&mut canvas, &style);
        for entry in &entries {
            y = engine.draw_entry(&mut canvas, entry, y, &style, &ResolvedLogos::default());
        }

        assert_eq!(canvas.image_count(), 0);
        assert_eq!(canvas.circle_count(), 0);
        assert_eq!(y + style.padding_bottom, surface_height(&entries, &style));
        assert_eq!(
            surface_height(&entries, &style),
            2.0 * base_row(&style) + style.header_offset()
        );
        assert!(canvas.text_values().contains(&"18:30"));
    }

    #[test]
    fn missing_or_failed_logos_get_placeholders() {
        let style = style();
        let loaded = LogoUrl::new("https://x/lions.png");
        let failed = LogoUrl::new("https://x/bears.png");
        let image = LogoImage::from_bytes(solid_png(4, 4, (1, 1, 1))).expect("png");
        let logos: ResolvedLogos = [
            (loaded.clone(), LoadResult::Ok(image)),
            (failed.clone(), Err(LoadFailure::TimedOut(5000))),
        ]
        .into_iter()
        .collect();

        let entries = [
            Entry::from(PairedEntry::new(
                Side::new("Lions").with_logo(loaded.as_str()),
                Side::new("bears").with_logo(failed.as_str()),
            )),
            Entry::from(PairedEntry::new(
                Side::new("Owls").with_logo("https://x/never-requested.png"),
                Side::new("Hawks"),
            )),
        ];

        let mut engine = engine();
        let mut canvas = RecordingCanvas::default();
        let mut y = 0.0;
        for entry in &entries {
            y = engine.draw_entry(&mut canvas, entry, y, &style, &logos);
        }

        assert_eq!(canvas.image_count(), 1);
        assert_eq!(canvas.circle_count(), 3);
        let texts = canvas.text_values();
        assert!(texts.contains(&"B"));
        assert!(texts.contains(&"O"));
        assert!(texts.contains(&"H"));
    }

    #[test]
    fn home_side_ends_before_separator_and_away_starts_after() {
        let style = StyleConfig {
            show_logos: false,
            ..style()
        };
        let mut canvas = RecordingCanvas::default();
        let entry = paired("Lions", "Bears");
        engine().draw_entry(&mut canvas, &entry, 0.0, &style, &ResolvedLogos::default());

        let find = |needle: &str| {
            canvas.ops.iter().find_map(|op| match op {
                Op::Text(x, _, text, s) if text == needle => Some((*x, s.anchor)),
                _ => None,
            })
        };
        let (sep_x, sep_anchor) = find(SEPARATOR).expect("separator");
        let (home_x, home_anchor) = find("Lions").expect("home");
        let (away_x, away_anchor) = find("Bears").expect("away");

        assert_eq!(sep_anchor, TextAnchor::Middle);
        assert_eq!(home_anchor, TextAnchor::End);
        assert_eq!(away_anchor, TextAnchor::Start);
        assert!((sep_x - home_x - style.center_gap).abs() < 1e-3);
        assert!((away_x - sep_x - style.center_gap).abs() < 1e-3);
    }

    #[test]
    fn tournament_is_right_aligned_in_row() {
        let style = style();
        let entry = Entry::from(
            PairedEntry::new(Side::new("A"), Side::new("B")).with_tournament("Cup"),
        );
        let mut canvas = RecordingCanvas::default();
        engine().draw_entry(&mut canvas, &entry, 0.0, &style, &ResolvedLogos::default());

        let (x, anchor) = canvas
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Text(x, _, text, s) if text == "Cup" => Some((*x, s.anchor)),
                _ => None,
            })
            .expect("tournament label");
        assert_eq!(anchor, TextAnchor::End);
        assert_eq!(x, style.width - style.padding_x - style.row_padding);
    }

    #[test]
    fn emphasized_rows_get_highlight_and_italic_caption() {
        let mut style = style();
        style.emphasis = Some(EmphasisRule {
            team: "Lions".to_string(),
            caption: "Live on TV".to_string(),
        });
        let mut canvas = RecordingCanvas::default();
        let entry = paired("Lions", "Bears");
        let logos = ResolvedLogos::default();
        let next = engine().draw_entry(&mut canvas, &entry, 100.0, &style, &logos);

        assert_eq!(next, 100.0 + base_row(&style) + style.emphasis_increment);
        let rects = canvas.rounded_rects();
        assert_eq!(rects[0].1, style.emphasized_row_color);

        let caption = canvas
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Text(_, y, text, s) if text == "Live on TV" => Some((*y, s.italic)),
                _ => None,
            })
            .expect("caption");
        assert!(caption.1);
        assert!(caption.0 > rects[0].0.bottom());
        assert!(caption.0 <= rects[0].0.bottom() + style.emphasis_increment);
    }

    #[test]
    fn single_entries_draw_label_from_time_gutter() {
        let style = style();
        let mut canvas = RecordingCanvas::default();
        let entry = Entry::from(SingleEntry::new("Open training", "10:00"));
        let next = engine().draw_entry(&mut canvas, &entry, 0.0, &style, &ResolvedLogos::default());

        assert_eq!(next, base_row(&style));
        assert!(!canvas.text_values().contains(&SEPARATOR));
        let label_x = canvas
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Text(x, _, text, _) if text == "Open training" => Some(*x),
                _ => None,
            })
            .expect("label");
        assert_eq!(label_x, style.padding_x + style.row_padding + style.time_gutter);
    }

    #[test]
    fn hidden_time_moves_content_left() {
        let style = StyleConfig {
            show_time: false,
            ..style()
        };
        let mut canvas = RecordingCanvas::default();
        let entry = Entry::from(SingleEntry::new("Open training", "10:00"));
        engine().draw_entry(&mut canvas, &entry, 0.0, &style, &ResolvedLogos::default());

        assert!(!canvas.text_values().contains(&"10:00"));
    }

    #[test]
    fn title_alignment() {
        let mut style = style();
        style.title = Some("Weekend fixtures".to_string());
        style.title_align = TitleAlign::Right;
        let mut canvas = RecordingCanvas::default();

        let first_row = engine().draw_title(&mut canvas, &style);
        assert_eq!(first_row, style.padding_top + style.title_block);
        match &canvas.ops[0] {
            Op::Text(x, y, text, s) => {
                assert_eq!(text, "Weekend fixtures");
                assert_eq!(*x, style.width - style.padding_x);
                assert_eq!(*y, style.padding_top + style.title_font_size);
                assert_eq!(s.anchor, TextAnchor::End);
            }
            other => panic!("expected title text, got {:?}", other),
        }
    }

    #[test]
    fn blank_title_is_skipped() {
        let mut style = style();
        style.title = Some("   ".to_string());
        let mut canvas = RecordingCanvas::default();
        assert_eq!(engine().draw_title(&mut canvas, &style), style.padding_top);
        assert!(canvas.ops.is_empty());
    }

    #[test]
    fn background_image_gets_translucent_overlay() {
        let style = style();
        let image = LogoImage::from_bytes(solid_png(4, 4, (1, 1, 1))).expect("png");
        let mut canvas = RecordingCanvas::default();
        engine().draw_background(&mut canvas, 100.0, 200.0, &style, Some(&image));

        assert!(matches!(canvas.ops[0], Op::Image(_, ImageFit::Cover)));
        match &canvas.ops[1] {
            Op::Gradient(_, top, bottom) => {
                assert!(top.opacity < 1.0 && bottom.opacity < 1.0);
            }
            other => panic!("expected overlay, got {:?}", other),
        }
    }

    #[test]
    fn background_without_image_is_opaque_gradient() {
        let style = style();
        let mut canvas = RecordingCanvas::default();
        engine().draw_background(&mut canvas, 100.0, 200.0, &style, None);

        assert_eq!(
            canvas.ops,
            vec![Op::Gradient(
                Rect::new(0.0, 0.0, 100.0, 200.0),
                GradientStop::opaque(&style.background_color),
                GradientStop::opaque(&style.background_color_end),
            )]
        );
    }
}
