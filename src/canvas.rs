//! Drawing primitives used by the layout engine.
//!
//! [`SvgCanvas`] records primitives as an SVG document which the rasterizer
//! turns into pixels. Other canvases (such as the recording one in tests)
//! can observe exactly which primitives a layout issued.

use std::fmt::Write as _;

use crate::image::LogoImage;
use crate::xml::escape_xml;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_svg(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFit {
    /// Scale to fit entirely inside the rect.
    Contain,
    /// Scale to cover the rect, cropping overflow.
    Cover,
}

/// One stop of a vertical gradient: colour plus opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub color: String,
    pub opacity: f32,
}

impl GradientStop {
    pub fn opaque(color: &str) -> Self {
        Self {
            color: color.to_string(),
            opacity: 1.0,
        }
    }
}

pub trait Canvas {
    fn fill_vertical_gradient(&mut self, rect: Rect, top: &GradientStop, bottom: &GradientStop);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: &str);

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: &str);

    /// Draws `text` with its baseline at `y`; `x` is interpreted per anchor.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle);

    fn draw_image(&mut self, rect: Rect, image: &LogoImage, fit: ImageFit);
}

/// Canvas that records an SVG display list.
pub struct SvgCanvas {
    width: f32,
    height: f32,
    defs: String,
    content: String,
    next_id: usize,
}

impl SvgCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            content: String::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><defs>{}</defs>{}</svg>"#,
            self.defs,
            self.content,
            w = self.width,
            h = self.height,
        )
    }
}

impl Canvas for SvgCanvas {
    fn fill_vertical_gradient(&mut self, rect: Rect, top: &GradientStop, bottom: &GradientStop) {
        let id = self.next_id("grad");
        let _ = write!(
            self.defs,
            r#"<linearGradient id="{}" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{}" stop-opacity="{:.3}" /><stop offset="1" stop-color="{}" stop-opacity="{:.3}" /></linearGradient>"#,
            id,
            escape_xml(&top.color),
            top.opacity,
            escape_xml(&bottom.color),
            bottom.opacity,
        );
        let _ = write!(
            self.content,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="url(#{})" />"#,
            rect.x, rect.y, rect.width, rect.height, id,
        );
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: &str) {
        let _ = write!(
            self.content,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" />"#,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            radius,
            escape_xml(color),
        );
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: &str) {
        let _ = write!(
            self.content,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" />"#,
            cx,
            cy,
            radius,
            escape_xml(color),
        );
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let weight_attr = if style.bold { " font-weight=\"700\"" } else { "" };
        let style_attr = if style.italic {
            " font-style=\"italic\""
        } else {
            ""
        };

        let _ = write!(
            self.content,
            r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="{:.2}" fill="{}" text-anchor="{}"{}{}>{}</text>"#,
            x,
            y,
            style.font_size,
            escape_xml(&style.color),
            style.anchor.as_svg(),
            weight_attr,
            style_attr,
            escape_xml(text),
        );
    }

    fn draw_image(&mut self, rect: Rect, image: &LogoImage, fit: ImageFit) {
        let aspect = match fit {
            ImageFit::Contain => "xMidYMid meet",
            ImageFit::Cover => "xMidYMid slice",
        };
        let _ = write!(
            self.content,
            r#"<image x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="{}" xlink:href="{}" />"#,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            aspect,
            image.to_data_uri(),
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Gradient(Rect, GradientStop, GradientStop),
        RoundedRect(Rect, String),
        Circle(f32, f32, f32),
        Text(f32, f32, String, TextStyle),
        Image(Rect, ImageFit),
    }

    /// Canvas that records the primitives it receives.
    #[derive(Debug, Default)]
    pub struct RecordingCanvas {
        pub ops: Vec<Op>,
    }

    impl RecordingCanvas {
        pub fn text_values(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text(_, _, text, _) => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn image_count(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Image(..)))
                .count()
        }

        pub fn circle_count(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Circle(..)))
                .count()
        }

        pub fn rounded_rects(&self) -> Vec<(Rect, &str)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::RoundedRect(rect, color) => Some((*rect, color.as_str())),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn fill_vertical_gradient(
            &mut self,
            rect: Rect,
            top: &GradientStop,
            bottom: &GradientStop,
        ) {
            self.ops.push(Op::Gradient(rect, top.clone(), bottom.clone()));
        }

        fn fill_rounded_rect(&mut self, rect: Rect, _radius: f32, color: &str) {
            self.ops.push(Op::RoundedRect(rect, color.to_string()));
        }

        fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, _color: &str) {
            self.ops.push(Op::Circle(cx, cy, radius));
        }

        fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
            self.ops.push(Op::Text(x, y, text.to_string(), style.clone()));
        }

        fn draw_image(&mut self, rect: Rect, _image: &LogoImage, fit: ImageFit) {
            self.ops.push(Op::Image(rect, fit));
        }
    }
}
