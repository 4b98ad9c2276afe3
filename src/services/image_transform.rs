// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image transform engine: turns a source image plus a customization into
//! an inline JPEG.
//!
//! Pipeline:
//! 1. Load the source (inline data or remote fetch, retrying once with a
//!    relaxed cross-origin mode)
//! 2. Downscale so neither side exceeds 1200 px
//! 3. Theme filters and hue rotation
//! 4. Flat color overlay with the "color" blend mode
//! 5. Optional text layer (position, rotation, scale)
//! 6. JPEG at quality 80, bounded to 1,000,000 characters as a data URL

use crate::data_url::{self, DataUrl};
use crate::error::RenderError;
use crate::models::customization::parse_hex_color;
use crate::models::{Customization, Design};
use crate::services::filters::{apply_color_overlay, apply_filters, filter_chain};
use crate::services::placeholder::xml_escape;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;

/// Longest allowed side of the working canvas.
pub const MAX_DIMENSION: u32 = 1200;
/// Largest allowed inline encoding, in characters.
pub const MAX_ENCODED_LEN: usize = 1_000_000;
pub const JPEG_QUALITY: u8 = 80;
/// Overlay opacity (`#RRGGBB20`).
pub const OVERLAY_ALPHA: f32 = 32.0 / 255.0;
/// Text size as a fraction of the shorter side.
const BASE_FONT_FRACTION: f32 = 0.05;
const MAX_SVG_DIMENSION: f32 = 8192.0;

/// Cross-origin mode for remote source fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOriginMode {
    /// Send an `Origin` and require the response to allow it.
    Anonymous,
    /// Skip the cross-origin check.
    Relaxed,
}

/// Raw bytes of a fetched remote image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Fetches remote source images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, mode: CrossOriginMode) -> Result<FetchedImage, RenderError>;
}

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Parse a remote source URL and refuse anything outside plain http(s) on a
/// public host: loopback, private, link-local and unspecified addresses are
/// blocked, as is `localhost`.
pub fn check_remote_url(raw: &str) -> Result<reqwest::Url, RenderError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| RenderError::Decode(format!("Invalid source URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RenderError::Blocked(format!("scheme {}", url.scheme())));
    }
    let host = url
        .host_str()
        .ok_or_else(|| RenderError::Blocked("missing host".to_string()))?;
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let lowered = bare.trim_end_matches('.').to_ascii_lowercase();
    if lowered == "localhost" || lowered.ends_with(".localhost") {
        return Err(RenderError::Blocked(format!("host {}", host)));
    }
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_blocked_ip(ip) {
            return Err(RenderError::Blocked(format!("address {}", ip)));
        }
    }
    Ok(url)
}

/// Addresses a server-side fetch must never reach.
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_blocked_ip(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    }
}

/// `reqwest`-backed fetcher. Only public http(s) hosts are fetched, plus
/// the operator-configured trusted origins; each redirect hop is checked the
/// same way.
pub struct HttpImageFetcher {
    http: reqwest::Client,
    origin: String,
    trusted: Arc<Vec<String>>,
}

impl HttpImageFetcher {
    /// `origin` is sent on anonymous fetches (the dashboard's own origin).
    /// `trusted` lists base URLs whose origin may be private, such as a
    /// generation server on the local network.
    pub fn new(origin: impl Into<String>, trusted: &[String]) -> Result<Self, reqwest::Error> {
        let trusted: Arc<Vec<String>> = Arc::new(
            trusted
                .iter()
                .filter_map(|raw| reqwest::Url::parse(raw).ok())
                .map(|url| url.origin().ascii_serialization())
                .collect(),
        );
        let hop_trusted = trusted.clone();
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.stop()
            } else if is_trusted(&hop_trusted, attempt.url()) {
                attempt.follow()
            } else if let Err(e) = check_remote_url(attempt.url().as_str()) {
                attempt.error(e)
            } else {
                attempt.follow()
            }
        });
        Ok(Self {
            http: reqwest::Client::builder().redirect(policy).build()?,
            origin: origin.into(),
            trusted,
        })
    }
}

fn is_trusted(trusted: &[String], url: &reqwest::Url) -> bool {
    let origin = url.origin().ascii_serialization();
    trusted.iter().any(|t| *t == origin)
}

/// Resolve the URL's host and refuse it if any address is blocked.
async fn check_resolved_host(url: &reqwest::Url) -> Result<(), RenderError> {
    let Some(host) = url.host_str() else {
        return Err(RenderError::Blocked("missing host".to_string()));
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| RenderError::Decode(format!("Fetch failed: {}", e)))?;
    for addr in addrs {
        if is_blocked_ip(addr.ip()) {
            return Err(RenderError::Blocked(format!("address {}", addr.ip())));
        }
    }
    Ok(())
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, mode: CrossOriginMode) -> Result<FetchedImage, RenderError> {
        let url = match reqwest::Url::parse(url) {
            Ok(parsed) if is_trusted(&self.trusted, &parsed) => parsed,
            _ => {
                let checked = check_remote_url(url)?;
                check_resolved_host(&checked).await?;
                checked
            }
        };

        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "image/*")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");
        if mode == CrossOriginMode::Anonymous {
            request = request.header(reqwest::header::ORIGIN, self.origin.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| RenderError::Decode(format!("Fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RenderError::Decode(format!(
                "Fetch failed: HTTP {}",
                response.status()
            )));
        }

        if mode == CrossOriginMode::Anonymous {
            let allowed = response
                .headers()
                .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(|v| v == "*" || v == self.origin)
                .unwrap_or(false);
            if !allowed {
                return Err(RenderError::CrossOrigin);
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Decode(format!("Fetch failed: {}", e)))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Encoded result of a render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Applies customizations to source images.
pub struct ImageTransformEngine {
    fetcher: Arc<dyn ImageFetcher>,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ImageTransformEngine {
    /// Engine with the system font database loaded.
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::info!(faces = db.len(), "Loaded system fonts for text rendering");
        Self::with_fontdb(fetcher, Arc::new(db))
    }

    pub fn with_fontdb(fetcher: Arc<dyn ImageFetcher>, fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fetcher, fontdb }
    }

    /// Decode a source image in one cross-origin mode.
    pub async fn load_with_mode(
        &self,
        image_ref: &str,
        mode: CrossOriginMode,
    ) -> Result<RgbaImage, RenderError> {
        if data_url::is_inline(image_ref) {
            let parsed = DataUrl::parse(image_ref).map_err(|e| RenderError::Decode(e.to_string()))?;
            return decode_bytes(&parsed.bytes, parsed.is_svg(), &self.fontdb);
        }

        let fetched = self.fetcher.fetch(image_ref, mode).await?;
        let declared_svg = fetched
            .content_type
            .as_deref()
            .map(|ct| ct.contains("svg"))
            .unwrap_or(false);
        decode_bytes(&fetched.bytes, declared_svg, &self.fontdb)
    }

    /// Decode a source image, retrying once in relaxed mode on a
    /// cross-origin failure.
    pub async fn load_source(&self, image_ref: &str) -> Result<RgbaImage, RenderError> {
        match self.load_with_mode(image_ref, CrossOriginMode::Anonymous).await {
            Err(RenderError::CrossOrigin) => {
                tracing::warn!("Cross-origin load blocked, retrying in relaxed mode");
                self.load_with_mode(image_ref, CrossOriginMode::Relaxed).await
            }
            other => other,
        }
    }

    /// Render a customization over the image at `image_ref`.
    pub async fn render(
        &self,
        image_ref: &str,
        customization: &Customization,
    ) -> Result<RenderedImage, RenderError> {
        let source = self.load_source(image_ref).await?;
        self.render_decoded(source, customization).await
    }

    /// Render over a design's image, falling back to its inline original
    /// when the primary ref cannot be loaded.
    pub async fn render_design(
        &self,
        design: &Design,
        customization: &Customization,
    ) -> Result<RenderedImage, RenderError> {
        let source = match self.load_source(&design.image_ref).await {
            Ok(img) => img,
            Err(e) => match design.recovery_ref() {
                Some(original) => {
                    tracing::warn!(
                        design_id = %design.id,
                        error = %e,
                        "Source image unavailable, rendering from inline original"
                    );
                    self.load_source(original).await?
                }
                None => return Err(e),
            },
        };
        self.render_decoded(source, customization).await
    }

    async fn render_decoded(
        &self,
        source: RgbaImage,
        customization: &Customization,
    ) -> Result<RenderedImage, RenderError> {
        let fontdb = self.fontdb.clone();
        let customization = customization.clone();
        tokio::task::spawn_blocking(move || render_pixels(&source, &customization, &fontdb))
            .await
            .map_err(|e| RenderError::Encode(format!("Render task failed: {}", e)))?
    }
}

/// Working size: aspect preserved, longest side capped, never upscaled.
pub fn working_dimensions(width: u32, height: u32) -> (u32, u32) {
    let max = MAX_DIMENSION as f64;
    if width > height && width > MAX_DIMENSION {
        let h = (height as f64 * max / width as f64).round() as u32;
        (MAX_DIMENSION, h.max(1))
    } else if height > MAX_DIMENSION {
        let w = (width as f64 * max / height as f64).round() as u32;
        (w.max(1), MAX_DIMENSION)
    } else {
        (width, height)
    }
}

/// Synchronous render of a decoded source.
pub fn render_pixels(
    source: &RgbaImage,
    customization: &Customization,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<RenderedImage, RenderError> {
    let (width, height) = working_dimensions(source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(RenderError::Decode("Source image is empty".to_string()));
    }

    let mut canvas = if (width, height) == source.dimensions() {
        source.clone()
    } else {
        imageops::resize(source, width, height, FilterType::Triangle)
    };

    apply_filters(&mut canvas, &filter_chain(customization));

    if let Some(rgb) = customization.primary_color().and_then(parse_hex_color) {
        apply_color_overlay(&mut canvas, rgb, OVERLAY_ALPHA);
    }

    if !customization.text.trim().is_empty() {
        let layer = render_text_layer(width, height, customization, fontdb)?;
        imageops::overlay(&mut canvas, &layer, 0, 0);
    }

    let data_url = encode_jpeg(&canvas)?;
    Ok(RenderedImage {
        data_url,
        width,
        height,
    })
}

/// Font size in pixels for a canvas of the given size.
pub fn font_size_for(width: u32, height: u32, customization: &Customization) -> f32 {
    width.min(height) as f32 * BASE_FONT_FRACTION * customization.size.multiplier()
}

fn font_family_list(font: &str) -> String {
    let font = font.trim();
    match font {
        "" => "sans-serif".to_string(),
        "serif" | "sans-serif" | "monospace" | "cursive" | "fantasy" => font.to_string(),
        _ => format!("{}, sans-serif", font),
    }
}

fn text_layer_svg(width: u32, height: u32, customization: &Customization) -> String {
    let x = customization.position.x / 100.0 * width as f32;
    let y = customization.position.y / 100.0 * height as f32;
    let fill = parse_hex_color(customization.text_color())
        .map(|[r, g, b]| format!("#{:02x}{:02x}{:02x}", r, g, b))
        .unwrap_or_else(|| "#ffffff".to_string());

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
         <text x=\"0\" y=\"0\" transform=\"translate({x} {y}) rotate({r}) scale({s})\" \
         font-family=\"{family}\" font-size=\"{size}\" fill=\"{fill}\" \
         text-anchor=\"middle\" dominant-baseline=\"middle\">{text}</text></svg>",
        w = width,
        h = height,
        x = x,
        y = y,
        r = customization.rotation,
        s = customization.scale,
        family = xml_escape(&font_family_list(&customization.font)),
        size = font_size_for(width, height, customization),
        fill = fill,
        text = xml_escape(&customization.text),
    )
}

fn render_text_layer(
    width: u32,
    height: u32,
    customization: &Customization,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<RgbaImage, RenderError> {
    let svg = text_layer_svg(width, height, customization);
    let options = usvg::Options {
        fontdb: fontdb.clone(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|e| RenderError::Encode(format!("Text layer: {}", e)))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Encode("Failed to allocate text layer".to_string()))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

    Ok(demultiply(width, height, pixmap.data()))
}

fn demultiply(width: u32, height: u32, premultiplied: &[u8]) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for (dst, src) in img.pixels_mut().zip(premultiplied.chunks_exact(4)) {
        let a = src[3];
        dst.0 = if a == 0 {
            [0, 0, 0, 0]
        } else {
            let un = |c: u8| ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8;
            [un(src[0]), un(src[1]), un(src[2]), a]
        };
    }
    img
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// Decode raster or SVG bytes into RGBA.
pub fn decode_bytes(
    bytes: &[u8],
    declared_svg: bool,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<RgbaImage, RenderError> {
    if declared_svg || looks_like_svg(bytes) {
        return rasterize_svg(bytes, fontdb);
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RenderError::Decode(e.to_string()))
}

fn rasterize_svg(bytes: &[u8], fontdb: &Arc<usvg::fontdb::Database>) -> Result<RgbaImage, RenderError> {
    let options = usvg::Options {
        fontdb: fontdb.clone(),
        ..Default::default()
    };
    let tree =
        usvg::Tree::from_data(bytes, &options).map_err(|e| RenderError::Decode(e.to_string()))?;

    let size = tree.size();
    let (w, h) = (size.width().ceil(), size.height().ceil());
    if !(w >= 1.0 && h >= 1.0 && w <= MAX_SVG_DIMENSION && h <= MAX_SVG_DIMENSION) {
        return Err(RenderError::Decode(format!("Unsupported SVG size {}x{}", w, h)));
    }
    let (w, h) = (w as u32, h as u32);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| RenderError::Decode("Failed to allocate SVG pixmap".to_string()))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

    Ok(demultiply(w, h, pixmap.data()))
}

/// Encode as a JPEG data URL, flattening transparency onto black.
pub fn encode_jpeg(img: &RgbaImage) -> Result<String, RenderError> {
    let rgb = RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let a = u16::from(p[3]);
        let f = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
        Rgb([f(p[0]), f(p[1]), f(p[2])])
    });

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    let data_url = DataUrl::encode("image/jpeg", &buf);
    if data_url.len() > MAX_ENCODED_LEN {
        return Err(RenderError::TooLarge {
            len: data_url.len(),
            max: MAX_ENCODED_LEN,
        });
    }
    Ok(data_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, Theme};
    use image::Rgba;

    struct NoFetch;

    #[async_trait]
    impl ImageFetcher for NoFetch {
        async fn fetch(&self, _url: &str, _mode: CrossOriginMode) -> Result<FetchedImage, RenderError> {
            Err(RenderError::Decode("offline".to_string()))
        }
    }

    /// Fails anonymous fetches with a cross-origin error, serves a PNG when relaxed.
    struct CorsBlocked {
        png: Vec<u8>,
    }

    #[async_trait]
    impl ImageFetcher for CorsBlocked {
        async fn fetch(&self, _url: &str, mode: CrossOriginMode) -> Result<FetchedImage, RenderError> {
            match mode {
                CrossOriginMode::Anonymous => Err(RenderError::CrossOrigin),
                CrossOriginMode::Relaxed => Ok(FetchedImage {
                    bytes: self.png.clone(),
                    content_type: Some("image/png".to_string()),
                }),
            }
        }
    }

    fn empty_fontdb() -> Arc<usvg::fontdb::Database> {
        Arc::new(usvg::fontdb::Database::new())
    }

    fn engine(fetcher: Arc<dyn ImageFetcher>) -> ImageTransformEngine {
        ImageTransformEngine::with_fontdb(fetcher, empty_fontdb())
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([40, 120, 200, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_working_dimensions() {
        assert_eq!(working_dimensions(600, 400), (600, 400));
        assert_eq!(working_dimensions(2400, 1000), (1200, 500));
        assert_eq!(working_dimensions(1000, 3000), (400, 1200));
        assert_eq!(working_dimensions(1500, 1500), (1200, 1200));
        assert_eq!(working_dimensions(5000, 1), (1200, 1));
    }

    #[test]
    fn test_font_size() {
        let mut c = Customization::default();
        assert!((font_size_for(600, 400, &c) - 20.0).abs() < 1e-4);
        c.size = crate::models::TextSize::Large;
        assert!((font_size_for(600, 400, &c) - 24.0).abs() < 1e-4);
    }

    #[test]
    fn test_text_svg_escapes_and_transforms() {
        let c = Customization {
            text: "<50% OFF>".to_string(),
            position: Position { x: 25.0, y: 75.0 },
            rotation: -30.0,
            scale: 1.5,
            ..Default::default()
        };
        let svg = text_layer_svg(400, 200, &c);
        assert!(svg.contains("&lt;50% OFF&gt;"));
        assert!(svg.contains("translate(100 150) rotate(-30) scale(1.5)"));
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("text-anchor=\"middle\""));
    }

    #[test]
    fn test_render_downscales_and_encodes_jpeg() {
        let src = RgbaImage::from_pixel(2000, 1000, Rgba([200, 100, 50, 255]));
        let c = Customization {
            theme: Theme::Retro,
            text: "SALE".to_string(),
            ..Default::default()
        };
        let out = render_pixels(&src, &c, &empty_fontdb()).unwrap();
        assert_eq!((out.width, out.height), (1200, 600));
        assert!(out.data_url.starts_with("data:image/jpeg;base64,"));
        assert!(out.data_url.len() <= MAX_ENCODED_LEN);

        let decoded = DataUrl::parse(&out.data_url).unwrap();
        let img = image::load_from_memory(&decoded.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 600));
    }

    #[test]
    fn test_render_never_upscales() {
        let src = RgbaImage::from_pixel(30, 20, Rgba([0, 0, 0, 255]));
        let out = render_pixels(&src, &Customization::default(), &empty_fontdb()).unwrap();
        assert_eq!((out.width, out.height), (30, 20));
    }

    #[test]
    fn test_encode_rejects_oversized_output() {
        // Noise compresses poorly: 1200x1200 at q80 is well over the bound.
        let mut state = 0x1234_5678_u32;
        let img = RgbaImage::from_fn(1200, 1200, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [a, b, c, _] = state.to_le_bytes();
            Rgba([a, b, c, 255])
        });
        assert!(matches!(
            encode_jpeg(&img),
            Err(RenderError::TooLarge { max: MAX_ENCODED_LEN, .. })
        ));
    }

    #[tokio::test]
    async fn test_render_inline_svg_placeholder() {
        let svg = crate::services::placeholder::prompt_placeholder("sunset sale banner");
        let c = Customization {
            theme: Theme::Retro,
            text: "50% OFF".to_string(),
            ..Default::default()
        };
        let out = engine(Arc::new(NoFetch)).render(&svg, &c).await.unwrap();
        assert_eq!((out.width, out.height), (600, 400));
        assert!(out.data_url.len() <= MAX_ENCODED_LEN);
    }

    #[tokio::test]
    async fn test_undecodable_source_fails() {
        let bad = DataUrl::encode("image/png", b"not a png");
        let result = engine(Arc::new(NoFetch))
            .render(&bad, &Customization::default())
            .await;
        assert!(matches!(result, Err(RenderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_cross_origin_retry_once_relaxed() {
        let fetcher = Arc::new(CorsBlocked { png: png_bytes(8, 4) });
        let img = engine(fetcher)
            .load_source("https://cdn.example.com/a.png")
            .await
            .unwrap();
        assert_eq!(img.dimensions(), (8, 4));
    }

    #[tokio::test]
    async fn test_render_design_recovers_from_original() {
        let design = Design {
            id: "d1".to_string(),
            owner_id: "u1".to_string(),
            image_ref: "https://firebasestorage.googleapis.com/v0/b/x/o/gone".to_string(),
            original_image_ref: Some(DataUrl::encode("image/png", &png_bytes(10, 10))),
            prompt: String::new(),
            customization: None,
            source: crate::models::DesignSource::FirebaseStorage,
            created_at: None,
            filename: None,
            is_local_server_ref: false,
        };
        let out = engine(Arc::new(NoFetch))
            .render_design(&design, &Customization::default())
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (10, 10));
    }

    #[test]
    fn test_demultiply() {
        let img = demultiply(1, 2, &[64, 32, 0, 128, 9, 9, 9, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [128, 64, 0, 128]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_check_remote_url_schemes() {
        assert!(check_remote_url("https://cdn.example/a.jpg").is_ok());
        assert!(check_remote_url("http://93.184.216.34/a.jpg").is_ok());
        for raw in [
            "file:///etc/passwd",
            "ftp://cdn.example/a.jpg",
            "gopher://cdn.example/",
            "data:image/png;base64,AAAA",
        ] {
            assert!(
                matches!(check_remote_url(raw), Err(RenderError::Blocked(_))),
                "{raw}"
            );
        }
        assert!(matches!(
            check_remote_url("not a url"),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn test_check_remote_url_internal_hosts() {
        for raw in [
            "http://localhost:5000/saved-images/a.jpg",
            "http://LOCALHOST./a.jpg",
            "http://api.localhost/a.jpg",
            "http://127.0.0.1/a.jpg",
            "http://10.0.0.8/a.jpg",
            "http://172.16.4.1/a.jpg",
            "http://192.168.1.1/a.jpg",
            "http://169.254.169.254/latest/meta-data/",
            "http://100.64.0.1/a.jpg",
            "http://0.0.0.0/a.jpg",
            "http://[::1]/a.jpg",
            "http://[fe80::1]/a.jpg",
            "http://[fd00::1]/a.jpg",
            "http://[::ffff:127.0.0.1]/a.jpg",
        ] {
            assert!(
                matches!(check_remote_url(raw), Err(RenderError::Blocked(_))),
                "{raw}"
            );
        }
        assert!(check_remote_url("http://[2606:4700::1111]/a.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_refuses_local_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let fetcher = HttpImageFetcher::new("http://localhost:5173", &[]).unwrap();

        for url in [
            format!("http://127.0.0.1:{port}/secret"),
            format!("http://localhost:{port}/secret"),
        ] {
            let result = fetcher.fetch(&url, CrossOriginMode::Relaxed).await;
            assert!(matches!(result, Err(RenderError::Blocked(_))), "{url}");
        }

        let accepted =
            tokio::time::timeout(std::time::Duration::from_millis(50), listener.accept()).await;
        assert!(accepted.is_err(), "fetcher connected to a loopback server");
    }

    #[test]
    fn test_trusted_origin_matching() {
        let trusted = vec![reqwest::Url::parse("http://localhost:5000/api")
            .unwrap()
            .origin()
            .ascii_serialization()];
        let url = |raw: &str| reqwest::Url::parse(raw).unwrap();
        assert!(is_trusted(&trusted, &url("http://localhost:5000/images/a.png")));
        assert!(!is_trusted(&trusted, &url("http://localhost:5001/images/a.png")));
        assert!(!is_trusted(&trusted, &url("https://localhost:5000/images/a.png")));
        assert!(!is_trusted(&trusted, &url("http://127.0.0.1:5000/images/a.png")));
    }
}
