//! Software card renderer
//!
//! Draws a card document into an RGBA buffer: rounded body in the card's
//! background color, an optional picture loaded from a local PNG, suit pips
//! and the border. Editing chrome (the drag badge shown in the editor) is
//! drawn last so it is easy to leave out of exports.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, warn};

use deckcraft_core::card_id::{CardId, Suit};
use deckcraft_core::document::fields;
use deckcraft_core::{CaptureOptions, CaptureSurface, CardDocument, ExportError};

/// Layout size of a card in pixels (poker ratio)
pub const CARD_WIDTH: u32 = 250;
pub const CARD_HEIGHT: u32 = 350;

const DEFAULT_BG: Rgba<u8> = Rgba([0x2D, 0x2A, 0x4A, 0xFF]);
const DEFAULT_BORDER: Rgba<u8> = Rgba([0xFF, 0x7E, 0x67, 0xFF]);
const DEFAULT_TEXT: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
const RED_SUIT: Rgba<u8> = Rgba([0xE5, 0x3E, 0x3E, 0xFF]);
const CHROME: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xB0]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Largest canvas a capture may allocate
const MAX_CAPTURE_PIXELS: u64 = 64 * 1024 * 1024;

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Some(TRANSPARENT);
    }

    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 0xFF]))
        }
        6 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            0xFF,
        ])),
        8 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ])),
        _ => None,
    }
}

/// Resolved drawing parameters of a document
#[derive(Debug, Clone)]
struct Style {
    bg: Rgba<u8>,
    border: Rgba<u8>,
    border_width: f32,
    radius: f32,
    text: Rgba<u8>,
    accent: Option<Rgba<u8>>,
    symbol_size: f32,
    image: Option<String>,
    image_scale: f32,
    opacity: f32,
}

impl Style {
    fn from_document(doc: &CardDocument) -> Self {
        let color = |field: &str, fallback: Rgba<u8>| {
            doc.str_field(field)
                .and_then(parse_color)
                .unwrap_or(fallback)
        };
        let number = |field: &str, fallback: f64| doc.number_field(field).unwrap_or(fallback) as f32;
        // Stored as a percentage; missing or zero means 100%
        let percent = |field: &str| match doc.number_field(field) {
            Some(value) if value != 0.0 => value as f32 / 100.0,
            _ => 1.0,
        };

        Self {
            bg: color(fields::BG_COLOR, DEFAULT_BG),
            border: color(fields::BORDER_COLOR, DEFAULT_BORDER),
            border_width: number(fields::BORDER_WIDTH, 4.0).max(0.0),
            radius: number(fields::BORDER_RADIUS, 12.0).max(0.0),
            text: color(fields::TEXT_COLOR, DEFAULT_TEXT),
            accent: doc.str_field(fields::ACCENT_COLOR).and_then(parse_color),
            symbol_size: number(fields::SYMBOL_SIZE, 16.0).max(1.0),
            image: doc.image().map(str::to_string),
            image_scale: percent(fields::IMAGE_SCALE).max(0.0),
            opacity: percent(fields::OPACITY).clamp(0.0, 1.0),
        }
    }

    fn pip_color(&self, suit: Suit) -> Rgba<u8> {
        match self.accent {
            Some(accent) => accent,
            None if suit.is_red() => RED_SUIT,
            None => self.text,
        }
    }
}

/// A card (or the card back) as drawn in the editor
#[derive(Debug, Clone)]
pub struct CardSurface {
    id: Option<CardId>,
    doc: CardDocument,
    visible: bool,
    chrome: bool,
}

impl CardSurface {
    /// Off-screen surface for a card face, with editing chrome attached
    pub fn card(id: CardId, doc: CardDocument) -> Self {
        Self {
            id: Some(id),
            doc,
            visible: false,
            chrome: true,
        }
    }

    /// Off-screen surface for the shared card back
    pub fn back(doc: CardDocument) -> Self {
        Self {
            id: None,
            doc,
            visible: false,
            chrome: true,
        }
    }

    /// Mark the surface as on screen
    pub fn shown(mut self) -> Self {
        self.visible = true;
        self
    }

    /// Drop the editing chrome
    pub fn without_chrome(mut self) -> Self {
        self.chrome = false;
        self
    }

    fn draw(&self, options: &CaptureOptions) -> Option<RgbaImage> {
        let scale = options.scale.max(1);
        let (w, h) = canvas_size(scale)?;
        let s = scale as f32;
        let style = Style::from_document(&self.doc);
        let backdrop = options.background.map(Rgba).unwrap_or(TRANSPARENT);

        let outer = RoundedRect::new(0.0, 0.0, w as f32, h as f32, style.radius * s);
        let inner = outer.inset(style.border_width * s);

        let mut img = RgbaImage::from_pixel(w, h, backdrop);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
            if outer.contains(fx, fy) {
                *px = style.bg;
            }
        }

        if let Some(ref reference) = style.image {
            self.draw_picture(&mut img, reference, &style, &inner);
        }

        if let Some(id) = self.id {
            draw_pips(&mut img, id.suit, &style, s);
        }

        // Border, then clip everything to the rounded outline
        for (x, y, px) in img.enumerate_pixels_mut() {
            let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
            if !outer.contains(fx, fy) {
                *px = backdrop;
            } else if !inner.contains(fx, fy) {
                *px = style.border;
            }
        }

        if self.chrome {
            let size = (24.0 * s) as u32;
            let margin = (8.0 * s) as u32;
            fill_rect(&mut img, w.saturating_sub(size + margin), margin, size, size, CHROME);
        }

        Some(img)
    }

    fn draw_picture(&self, img: &mut RgbaImage, reference: &str, style: &Style, area: &RoundedRect) {
        let path = Path::new(reference);
        if !path.is_file() {
            debug!("Image '{}' is not a local file, skipping", reference);
            return;
        }

        let picture = match image::open(path) {
            Ok(picture) => picture.to_rgba8(),
            Err(e) => {
                warn!("Could not load image '{}': {}", reference, e);
                return;
            }
        };

        let fit = (area.width / picture.width() as f32).min(area.height / picture.height() as f32)
            * style.image_scale;
        let nw = ((picture.width() as f32 * fit) as u32).max(1);
        let nh = ((picture.height() as f32 * fit) as u32).max(1);
        let mut resized = imageops::resize(&picture, nw, nh, FilterType::Triangle);

        if style.opacity < 1.0 {
            for px in resized.pixels_mut() {
                px[3] = (px[3] as f32 * style.opacity) as u8;
            }
        }

        let x = area.x + (area.width - nw as f32) / 2.0;
        let y = area.y + (area.height - nh as f32) / 2.0;
        imageops::overlay(img, &resized, x as i64, y as i64);
    }
}

impl CaptureSurface for CardSurface {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn chrome_visible(&self) -> bool {
        self.chrome
    }

    fn set_chrome_visible(&mut self, visible: bool) {
        self.chrome = visible;
    }

    fn capture(&mut self, options: &CaptureOptions) -> Result<Vec<u8>, ExportError> {
        let label = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "card back".to_string());

        if !self.visible {
            return Err(ExportError::Capture {
                surface: label,
                reason: "surface is not laid out".to_string(),
            });
        }

        let img = self.draw(options).ok_or_else(|| ExportError::Capture {
            surface: label,
            reason: format!("scale {} exceeds the largest supported canvas", options.scale),
        })?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

/// Pixel size of a capture at `scale`, if it fits the allocation limit
fn canvas_size(scale: u32) -> Option<(u32, u32)> {
    let w = CARD_WIDTH.checked_mul(scale)?;
    let h = CARD_HEIGHT.checked_mul(scale)?;
    (u64::from(w) * u64::from(h) <= MAX_CAPTURE_PIXELS).then_some((w, h))
}

#[derive(Debug, Clone, Copy)]
struct RoundedRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radius: f32,
}

impl RoundedRect {
    fn new(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Self {
        let radius = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        Self {
            x,
            y,
            width,
            height,
            radius,
        }
    }

    fn inset(&self, by: f32) -> Self {
        let by = by.min(self.width / 2.0).min(self.height / 2.0);
        Self::new(
            self.x + by,
            self.y + by,
            self.width - 2.0 * by,
            self.height - 2.0 * by,
            self.radius - by,
        )
    }

    fn contains(&self, px: f32, py: f32) -> bool {
        if px < self.x || py < self.y || px > self.x + self.width || py > self.y + self.height {
            return false;
        }
        let r = self.radius;
        let cx = px.clamp(self.x + r, self.x + self.width - r);
        let cy = py.clamp(self.y + r, self.y + self.height - r);
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= r * r
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = (x + w).min(img.width());
    let y_end = (y + h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

/// Corner indices and a centre pip, shaped per suit
fn draw_pips(img: &mut RgbaImage, suit: Suit, style: &Style, scale: f32) {
    let color = style.pip_color(suit);
    let corner = style.symbol_size * scale / 2.0;
    let margin = (style.border_width + 10.0) * scale + corner;
    let (w, h) = (img.width() as f32, img.height() as f32);

    draw_pip(img, suit, margin, margin, corner, color);
    draw_pip(img, suit, w - margin, h - margin, corner, color);
    draw_pip(img, suit, w / 2.0, h / 2.0, corner * 2.5, color);
}

fn draw_pip(img: &mut RgbaImage, suit: Suit, cx: f32, cy: f32, r: f32, color: Rgba<u8>) {
    let x0 = (cx - r).max(0.0) as u32;
    let y0 = (cy - r).max(0.0) as u32;
    let x1 = ((cx + r).ceil() as u32).min(img.width());
    let y1 = ((cy + r).ceil() as u32).min(img.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let inside = match suit {
                Suit::Hearts => dx * dx + dy * dy <= r * r,
                Suit::Diamonds => dx.abs() + dy.abs() <= r,
                Suit::Clubs => dx.abs() <= r * 0.8 && dy.abs() <= r * 0.8,
                // Upward triangle
                Suit::Spades => dy <= r && dx.abs() <= (dy + r) / 2.0,
            };
            if inside {
                img.put_pixel(x, y, color);
            }
        }
    }
}
