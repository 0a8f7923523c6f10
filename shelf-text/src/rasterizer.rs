//! Glyph rasterization: turns a character into an RGBA8 bitmap.
//!
//! [`CosmicRasterizer`] uses `cosmic-text` (font discovery, shaping) and
//! its `SwashCache` (glyph rasterization). The bitmap covers the laid-out
//! text: its width is the shaped advance, its height is one line height
//! per line, and `FontOptions::padding` is added on every side.
//!
//! [`BlockRasterizer`] draws solid blocks of a fixed size and needs no
//! fonts, which makes it useful headless and in tests.

use cosmic_text::{
    Attrs, Buffer, Color as CColor, Family, FontSystem, Metrics, Shaping, Style as CStyle,
    SwashCache, Weight,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::surface::BYTES_PER_PIXEL;

/// Straight-alpha RGBA8 color.
pub type Rgba8 = [u8; 4];

pub const TRANSPARENT: Rgba8 = [0, 0, 0, 0];
pub const WHITE: Rgba8 = [255, 255, 255, 255];

// ── Font options ────────────────────────────────────────────────────

/// Font selection and metrics used for rasterization and layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontOptions {
    /// CSS-style family chain (e.g. `"Fira Sans, sans-serif"`). The first
    /// entry is handed to cosmic-text, which does its own fallback.
    pub family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Line height in pixels. Also the atlas shelf height.
    pub line_height: u32,
    /// Font weight (100–900). 400 = normal, 700 = bold.
    pub weight: u16,
    pub italic: bool,
    /// Transparent columns added on each side of every bitmap, in pixels.
    /// Vertical spacing comes from the line box, so padding never makes a
    /// bitmap taller than `line_height`.
    pub padding: u32,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            family: String::from("sans-serif"),
            font_size: 16.0,
            line_height: 20,
            weight: 400,
            italic: false,
            padding: 1,
        }
    }
}

impl FontOptions {
    /// The cosmic-text family for the first entry of the family chain.
    pub fn family(&self) -> Family<'_> {
        let first = self
            .family
            .split(',')
            .next()
            .unwrap_or(&self.family)
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        match first {
            "sans-serif" => Family::SansSerif,
            "serif" => Family::Serif,
            "monospace" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            concrete => Family::Name(concrete),
        }
    }

    fn attrs(&self) -> Attrs<'_> {
        let style = if self.italic {
            CStyle::Italic
        } else {
            CStyle::Normal
        };
        Attrs::new()
            .family(self.family())
            .weight(Weight(self.weight))
            .style(style)
    }
}

// ── Rasterizer interface ────────────────────────────────────────────

/// A rasterized glyph: `width × height` RGBA8 pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GlyphBitmap {
    /// A bitmap filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        Self {
            width,
            height,
            pixels: color.repeat(width as usize * height as usize),
        }
    }

    /// Drop rows below `max_height`. Rows are contiguous, so this only
    /// truncates the pixel buffer.
    pub fn clip_height(&mut self, max_height: u32) {
        if self.height > max_height {
            self.height = max_height;
            self.pixels
                .truncate(self.width as usize * max_height as usize * BYTES_PER_PIXEL);
        }
    }
}

pub trait Rasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        font: &FontOptions,
        background: Rgba8,
        foreground: Rgba8,
    ) -> Result<GlyphBitmap>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn rasterize(
        &mut self,
        text: &str,
        font: &FontOptions,
        background: Rgba8,
        foreground: Rgba8,
    ) -> Result<GlyphBitmap> {
        (**self).rasterize(text, font, background, foreground)
    }
}

// ── cosmic-text ─────────────────────────────────────────────────────

/// Rasterizer backed by a cosmic-text `FontSystem` and `SwashCache`.
pub struct CosmicRasterizer {
    pub font_system: FontSystem,
    pub swash_cache: SwashCache,
}

impl Default for CosmicRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CosmicRasterizer {
    /// Create a rasterizer with system font discovery.
    pub fn new() -> Self {
        Self::with_font_system(FontSystem::new())
    }

    pub fn with_font_system(font_system: FontSystem) -> Self {
        Self {
            font_system,
            swash_cache: SwashCache::new(),
        }
    }

    /// Number of font faces available for rasterization.
    pub fn face_count(&self) -> usize {
        self.font_system.db().faces().count()
    }
}

impl Rasterizer for CosmicRasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        font: &FontOptions,
        background: Rgba8,
        foreground: Rgba8,
    ) -> Result<GlyphBitmap> {
        if !(font.font_size > 0.0) || font.line_height == 0 {
            return Err(AtlasError::Rasterize(format!(
                "invalid metrics: size {} / line height {}",
                font.font_size, font.line_height
            )));
        }

        let metrics = Metrics::new(font.font_size, font.line_height as f32);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, text, font.attrs(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut line_width: f32 = 0.0;
        let mut lines: u32 = 0;
        for run in buffer.layout_runs() {
            line_width = line_width.max(run.line_w);
            lines += 1;
        }

        let pad = font.padding;
        let width = line_width.ceil() as u32 + pad * 2;
        let height = lines.max(1).saturating_mul(font.line_height);
        let mut bitmap = GlyphBitmap::filled(width, height, background);

        let color = CColor::rgba(foreground[0], foreground[1], foreground[2], foreground[3]);
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            color,
            |x, y, w, h, color| {
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let px = x + dx + pad as i32;
                        let py = y + dy;
                        if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                            continue;
                        }
                        let idx = (py as usize * width as usize + px as usize) * BYTES_PER_PIXEL;
                        blend_over(
                            &mut bitmap.pixels[idx..idx + BYTES_PER_PIXEL],
                            [color.r(), color.g(), color.b(), color.a()],
                        );
                    }
                }
            },
        );

        log::debug!("Rasterized {:?} into {}x{} bitmap", text, width, height);
        Ok(bitmap)
    }
}

/// Composite straight-alpha `src` over `dst` in place.
fn blend_over(dst: &mut [u8], src: Rgba8) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    let inv = 255 - sa;
    for c in 0..3 {
        dst[c] = ((src[c] as u32 * sa + dst[c] as u32 * inv + 127) / 255) as u8;
    }
    dst[3] = (sa + (dst[3] as u32 * inv + 127) / 255) as u8;
}

// ── Solid blocks ────────────────────────────────────────────────────

/// Font-free rasterizer producing solid foreground blocks.
///
/// Each character is `default_size` unless overridden with
/// [`BlockRasterizer::with_size`]. A multi-character string is the
/// characters side by side.
#[derive(Clone, Debug)]
pub struct BlockRasterizer {
    default_size: (u32, u32),
    sizes: FxHashMap<char, (u32, u32)>,
    calls: usize,
}

impl BlockRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            default_size: (width, height),
            sizes: FxHashMap::default(),
            calls: 0,
        }
    }

    pub fn with_size(mut self, c: char, width: u32, height: u32) -> Self {
        self.sizes.insert(c, (width, height));
        self
    }

    /// How many times `rasterize` has run.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn size_of(&self, c: char) -> (u32, u32) {
        self.sizes.get(&c).copied().unwrap_or(self.default_size)
    }
}

impl Rasterizer for BlockRasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        _font: &FontOptions,
        _background: Rgba8,
        foreground: Rgba8,
    ) -> Result<GlyphBitmap> {
        self.calls += 1;
        let (width, height) = text
            .chars()
            .map(|c| self.size_of(c))
            .fold((0, 0), |(w, h), (cw, ch)| (w + cw, h.max(ch)));
        Ok(GlyphBitmap::filled(width, height, foreground))
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_options_default() {
        let font = FontOptions::default();
        assert_eq!(font.font_size, 16.0);
        assert_eq!(font.line_height, 20);
        assert_eq!(font.weight, 400);
        assert!(!font.italic);
    }

    #[test]
    fn test_family_chain_uses_first_entry() {
        let font = FontOptions {
            family: "\"Fira Sans\", Helvetica, sans-serif".into(),
            ..Default::default()
        };
        assert_eq!(font.family(), Family::Name("Fira Sans"));

        let font = FontOptions {
            family: "monospace".into(),
            ..Default::default()
        };
        assert_eq!(font.family(), Family::Monospace);
    }

    #[test]
    fn test_blend_over() {
        let mut px = [0, 0, 0, 0];
        blend_over(&mut px, [255, 255, 255, 255]);
        assert_eq!(px, [255, 255, 255, 255]);

        let mut px = [0, 0, 0, 255];
        blend_over(&mut px, [255, 255, 255, 0]);
        assert_eq!(px, [0, 0, 0, 255]);

        let mut px = [0, 0, 0, 0];
        blend_over(&mut px, [255, 0, 0, 128]);
        assert_eq!(px[3], 128);
        assert_eq!(px[0], 128);
    }

    #[test]
    fn test_block_rasterizer_sizes() {
        let mut raster = BlockRasterizer::new(8, 12).with_size('W', 14, 12);
        let font = FontOptions::default();

        let a = raster.rasterize("a", &font, TRANSPARENT, WHITE).unwrap();
        assert_eq!((a.width, a.height), (8, 12));
        assert_eq!(a.pixels.len(), 8 * 12 * 4);
        assert!(a.pixels.chunks(4).all(|p| p == WHITE));

        let w = raster.rasterize("W", &font, TRANSPARENT, WHITE).unwrap();
        assert_eq!((w.width, w.height), (14, 12));

        let aw = raster.rasterize("aW", &font, TRANSPARENT, WHITE).unwrap();
        assert_eq!((aw.width, aw.height), (22, 12));
        assert_eq!(raster.calls(), 3);
    }

    #[test]
    fn test_cosmic_rejects_bad_metrics() {
        let mut raster = CosmicRasterizer::new();
        let font = FontOptions {
            line_height: 0,
            ..Default::default()
        };
        assert!(matches!(
            raster.rasterize("A", &font, TRANSPARENT, WHITE),
            Err(AtlasError::Rasterize(_))
        ));
    }

    #[test]
    fn test_cosmic_rasterizes_glyph() {
        let mut raster = CosmicRasterizer::new();
        // May run without system fonts in CI; skip gracefully.
        if raster.face_count() == 0 {
            return;
        }
        let font = FontOptions {
            font_size: 24.0,
            line_height: 28,
            ..Default::default()
        };
        let bitmap = raster.rasterize("A", &font, TRANSPARENT, WHITE).unwrap();
        assert!(bitmap.width > 2, "width {}", bitmap.width);
        assert_eq!(bitmap.height, 28);
        assert_eq!(bitmap.pixels.len(), (bitmap.width * bitmap.height * 4) as usize);
        assert!(
            bitmap.pixels.chunks(4).any(|p| p[3] > 0),
            "expected some coverage for 'A'"
        );
    }

    #[test]
    fn test_cosmic_bitmap_fits_line_box() {
        let mut raster = CosmicRasterizer::new();
        if raster.face_count() == 0 {
            return;
        }
        let font = FontOptions {
            padding: 3,
            ..Default::default()
        };
        for c in ['A', 'g', 'j', 'Q', '|'] {
            let bitmap = raster
                .rasterize(c.encode_utf8(&mut [0; 4]), &font, TRANSPARENT, WHITE)
                .unwrap();
            assert_eq!(bitmap.height, font.line_height, "{c:?}");
        }
    }

    #[test]
    fn test_clip_height_truncates_rows() {
        let mut bitmap = GlyphBitmap::filled(3, 5, WHITE);
        bitmap.clip_height(8);
        assert_eq!((bitmap.width, bitmap.height), (3, 5));

        bitmap.clip_height(2);
        assert_eq!((bitmap.width, bitmap.height), (3, 2));
        assert_eq!(bitmap.pixels.len(), 3 * 2 * 4);
    }

    #[test]
    fn test_cosmic_space_is_blank_but_wide() {
        let mut raster = CosmicRasterizer::new();
        if raster.face_count() == 0 {
            return;
        }
        let font = FontOptions::default();
        let bitmap = raster.rasterize(" ", &font, TRANSPARENT, WHITE).unwrap();
        assert!(bitmap.width > 2 * font.padding);
        assert!(bitmap.pixels.chunks(4).all(|p| p[3] == 0));
    }

    #[test]
    fn test_cosmic_wider_text_is_wider() {
        let mut raster = CosmicRasterizer::new();
        if raster.face_count() == 0 {
            return;
        }
        let font = FontOptions::default();
        let one = raster.rasterize("M", &font, TRANSPARENT, WHITE).unwrap();
        let three = raster.rasterize("MMM", &font, TRANSPARENT, WHITE).unwrap();
        assert!(three.width > one.width);
        assert_eq!(three.height, one.height);
    }
}
