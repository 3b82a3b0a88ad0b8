use std::cell::Cell;
use std::rc::Rc;

use matchcard::canvas::{Canvas, GradientStop, ImageFit, Rect, TextStyle};
use matchcard::fetch::{ProxyRequest, ProxyResponse, Transport};
use matchcard::layout::{FontSpec, LayoutEngine};
use matchcard::{
    Entry, FetchConfig, GraphicComposer, ImageLoadCache, ImageSource, LoadFailure, LoadState,
    LogoImage, LogoUrl, MonospaceMeasure, PairedEntry, Rasterizer, RemoteImageFetcher,
    ResolvedLogos, Side, StyleConfig, TextMeasure, TransportError, surface_height,
};
use tiny_skia::{Color, Pixmap};

const ELLIPSIS: char = '\u{2026}';

fn png(rgb: (u8, u8, u8)) -> Vec<u8> {
    let mut pixmap = Pixmap::new(4, 4).expect("pixmap");
    pixmap.fill(Color::from_rgba8(rgb.0, rgb.1, rgb.2, 255));
    pixmap.encode_png().expect("encode")
}

/// Image source that must never be asked for anything.
struct Unreachable;

impl ImageSource for Unreachable {
    async fn load(&self, url: &LogoUrl) -> Result<LogoImage, LoadFailure> {
        panic!("unexpected load of {}", url);
    }
}

/// Direct GETs are refused; the proxy answers with a fixed image.
struct BlockedDirect {
    proxy_image: LogoImage,
    gets: Cell<usize>,
    posts: Cell<usize>,
}

impl Transport for BlockedDirect {
    async fn get(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
        self.gets.set(self.gets.get() + 1);
        tokio::task::yield_now().await;
        Err(TransportError::Http("403 Forbidden".to_string()))
    }

    async fn post_proxy(
        &self,
        _endpoint: &str,
        _request: &ProxyRequest,
    ) -> Result<ProxyResponse, TransportError> {
        self.posts.set(self.posts.get() + 1);
        tokio::task::yield_now().await;
        Ok(ProxyResponse {
            success: true,
            image_data: Some(self.proxy_image.to_data_uri()),
            error: None,
        })
    }
}

#[derive(Default)]
struct TextCapture {
    texts: Vec<String>,
    images: usize,
}

impl Canvas for TextCapture {
    fn fill_vertical_gradient(
        &mut self,
        _rect: Rect,
        _top: &GradientStop,
        _bottom: &GradientStop,
    ) {
    }

    fn fill_rounded_rect(&mut self, _rect: Rect, _radius: f32, _color: &str) {}

    fn fill_circle(&mut self, _cx: f32, _cy: f32, _radius: f32, _color: &str) {}

    fn draw_text(&mut self, _x: f32, _y: f32, text: &str, _style: &TextStyle) {
        self.texts.push(text.to_string());
    }

    fn draw_image(&mut self, _rect: Rect, _image: &LogoImage, _fit: ImageFit) {
        self.images += 1;
    }
}

#[tokio::test]
async fn two_rows_without_logos() {
    let composer = GraphicComposer::new(
        Rc::new(ImageLoadCache::new(Unreachable)),
        MonospaceMeasure::default(),
        Rasterizer::without_fonts(),
    );
    let style = StyleConfig {
        show_logos: false,
        show_time: true,
        ..StyleConfig::default()
    };
    let entries = vec![
        Entry::from(
            PairedEntry::new(
                Side::new("Lions").with_logo("https://logos.example/lions.png"),
                Side::new("Bears").with_logo("https://logos.example/bears.png"),
            )
            .with_time("18:30"),
        ),
        Entry::from(PairedEntry::new(Side::new("Owls"), Side::new("Hawks")).with_time("20:00")),
    ];

    let expected = 2.0 * (style.row_height + style.row_gap) + style.header_offset();
    assert_eq!(surface_height(&entries, &style), expected);

    let scene = composer.render_scene(&entries, &style).await.expect("scene");
    assert_eq!(scene.height, expected);
    assert!(!scene.svg.contains("<image"));
    assert!(!scene.svg.contains("<circle"));
    assert!(composer.cache().is_empty());

    let surface = composer.render(&entries, &style).await.expect("surface");
    assert_eq!(surface.height(), (expected * style.scale).ceil() as u32);
}

#[test]
fn overlong_name_is_ellipsized_within_budget() {
    let mut engine = LayoutEngine::new(MonospaceMeasure::default());
    let name = "x".repeat(200);
    let font = FontSpec::bold(16.0);

    let truncated = engine.truncate(&name, 120.0, font);
    assert!(truncated.ends_with(ELLIPSIS));
    assert!(engine.text_width(&truncated, font) <= 120.0);

    let style = StyleConfig {
        show_logos: false,
        width: 700.0,
        ..StyleConfig::default()
    };
    let entry = Entry::from(PairedEntry::new(Side::new(name.clone()), Side::new("Bears")));
    let mut canvas = TextCapture::default();
    engine.draw_entry(&mut canvas, &entry, 0.0, &style, &ResolvedLogos::default());

    let drawn = canvas
        .texts
        .iter()
        .find(|t| t.starts_with('x'))
        .expect("home name drawn");
    assert!(drawn.ends_with(ELLIPSIS));
    let mut measure = MonospaceMeasure::default();
    let (width, _) = measure.measure_text(drawn, style.font_size, true, false);
    assert!(width <= 120.0);
    assert_eq!(canvas.images, 0);
}

#[tokio::test]
async fn blocked_logo_comes_from_the_proxy_once() {
    let proxy_image = LogoImage::from_bytes(png((200, 30, 30))).expect("png");
    let transport = BlockedDirect {
        proxy_image: proxy_image.clone(),
        gets: Cell::new(0),
        posts: Cell::new(0),
    };
    let config = FetchConfig::default().with_proxy("https://proxy.example/fetch");
    let cache = Rc::new(ImageLoadCache::new(RemoteImageFetcher::with_transport(
        config, transport,
    )));
    let composer = GraphicComposer::new(
        Rc::clone(&cache),
        MonospaceMeasure::default(),
        Rasterizer::without_fonts(),
    );

    let url = LogoUrl::new("https://logos.example/lions.png");
    let entries = vec![
        Entry::from(PairedEntry::new(
            Side::new("Lions").with_logo(url.clone()),
            Side::new("Bears"),
        )),
        Entry::from(PairedEntry::new(
            Side::new("Owls"),
            Side::new("Lions").with_logo(url.clone()),
        )),
    ];

    let scene = composer
        .render_scene(&entries, &StyleConfig::default())
        .await
        .expect("scene");

    assert_eq!(cache.state(&url), LoadState::Loaded);
    assert_eq!(cache.peek(&url), Some(Ok(proxy_image.clone())));
    let transport = cache.source().transport();
    assert_eq!(transport.gets.get(), 1);
    assert_eq!(transport.posts.get(), 1);
    assert_eq!(scene.svg.matches(&proxy_image.to_data_uri()).count(), 2);
}
