//! Text atlas: the glyph cache on top of a backing surface.
//!
//! On a cache miss the atlas rasterizes the character, asks the shelf
//! allocator for a spot (which may grow the surface), writes the bitmap
//! into the surface, and records the rectangle. Hits have no side effects.
//!
//! ```text
//! get_rectangle(c)
//!     │ hit ─────────────────────────────────────────────▶ GlyphRect
//!     │ miss
//!     ▼
//! Rasterizer ──▶ ShelfAllocator ──▶ AtlasSurface::insert ──▶ GlyphCache
//! ```
//!
//! The atlas is single-threaded: callers serialize every call against a
//! given instance (typically one render thread per atlas).

use crate::allocator::ShelfAllocator;
use crate::cache::GlyphCache;
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::quad::{GlyphRect, TexRect};
use crate::rasterizer::{FontOptions, Rasterizer, Rgba8, TRANSPARENT, WHITE};
use crate::surface::{check_pixel_len, AtlasSurface};

/// Manual line-break marker. It has no glyph; layout handles it.
pub const LINE_BREAK: char = '\n';

/// Glyph cache backed by a single surface.
pub struct TextAtlas<S, R> {
    surface: S,
    rasterizer: R,
    font: FontOptions,
    allocator: ShelfAllocator,
    cache: GlyphCache,
    background: Rgba8,
    foreground: Rgba8,
}

impl<S: AtlasSurface, R: Rasterizer> TextAtlas<S, R> {
    /// Create an atlas over `surface`, growing it by at least
    /// `expand_height` rows whenever it runs out of space.
    pub fn new(surface: S, rasterizer: R, font: FontOptions, expand_height: u32) -> Self {
        let allocator = ShelfAllocator::new(font.line_height, expand_height);
        Self {
            surface,
            rasterizer,
            font,
            allocator,
            cache: GlyphCache::new(),
            background: TRANSPARENT,
            foreground: WHITE,
        }
    }

    pub fn from_config(surface: S, rasterizer: R, config: &AtlasConfig) -> Self {
        Self::new(surface, rasterizer, config.font.clone(), config.expand_height)
    }

    /// Colors passed to the rasterizer for glyphs rasterized from now on.
    pub fn with_colors(mut self, background: Rgba8, foreground: Rgba8) -> Self {
        self.background = background;
        self.foreground = foreground;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access, e.g. to register storage-replaced listeners.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn font(&self) -> &FontOptions {
        &self.font
    }

    pub fn allocator(&self) -> &ShelfAllocator {
        &self.allocator
    }

    /// Current surface `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    /// Number of distinct characters placed so far.
    pub fn glyph_count(&self) -> usize {
        self.cache.len()
    }

    pub fn contains(&self, c: char) -> bool {
        self.cache.contains(c)
    }

    /// Rectangle of an already placed character, without rasterizing.
    pub fn cached(&self, c: char) -> Option<GlyphRect> {
        self.cache.get(c)
    }

    pub fn glyphs(&self) -> impl Iterator<Item = (char, GlyphRect)> + '_ {
        self.cache.iter()
    }

    /// Pixel rectangle of `c` in the atlas, placing it on first use.
    ///
    /// Bitmaps taller than the line height lose their bottom rows.
    pub fn get_rectangle(&mut self, c: char) -> Result<GlyphRect> {
        if let Some(rect) = self.cache.get(c) {
            return Ok(rect);
        }
        if !self.surface.can_write() {
            return Err(AtlasError::AtlasWriteUnsupported);
        }
        if c == LINE_BREAK {
            return Err(AtlasError::ReservedCharacter(c));
        }

        let mut utf8 = [0u8; 4];
        let mut bitmap = self.rasterizer.rasterize(
            c.encode_utf8(&mut utf8),
            &self.font,
            self.background,
            self.foreground,
        )?;
        check_pixel_len(bitmap.width, bitmap.height, &bitmap.pixels)?;
        // Shelves are one line apart; anything taller would bleed into the next.
        let line_height = self.allocator.line_height();
        if bitmap.height > line_height {
            log::debug!(
                "Clipping {:?} from {} to {} rows",
                c,
                bitmap.height,
                line_height
            );
            bitmap.clip_height(line_height);
        }

        let saved = self.allocator.clone();
        let (x, y) = self
            .allocator
            .allocate(&mut self.surface, bitmap.width, bitmap.height)?;
        if let Err(err) = self
            .surface
            .insert(x, y, bitmap.width, bitmap.height, &bitmap.pixels)
        {
            self.allocator = saved;
            return Err(err);
        }

        let rect = GlyphRect::new(x, y, bitmap.width, bitmap.height);
        log::debug!("Cached {:?} at {:?}", c, rect);
        Ok(self.cache.insert(c, rect))
    }

    /// Rectangles for each character, in order. Repeated characters are
    /// rasterized once.
    pub fn get_rectangles<I>(&mut self, chars: I) -> Result<Vec<GlyphRect>>
    where
        I: IntoIterator<Item = char>,
    {
        chars.into_iter().map(|c| self.get_rectangle(c)).collect()
    }

    /// Atlas-relative `[0, 1]` rectangles for each character of `text`.
    pub fn tex_coords(&mut self, text: &str) -> Result<Vec<TexRect>> {
        let rects = self.get_rectangles(text.chars())?;
        let (width, height) = self.size();
        Ok(rects.iter().map(|r| r.normalized(width, height)).collect())
    }

    /// Give back the surface and rasterizer, dropping the directory.
    pub fn into_parts(self) -> (S, R) {
        (self.surface, self.rasterizer)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;
    use crate::rasterizer::{BlockRasterizer, GlyphBitmap};
    use crate::surface::SurfaceCaps;

    fn font(line_height: u32) -> FontOptions {
        FontOptions {
            line_height,
            ..Default::default()
        }
    }

    fn block_atlas(
        width: u32,
        height: u32,
        glyph: u32,
    ) -> TextAtlas<MemorySurface, BlockRasterizer> {
        TextAtlas::new(
            MemorySurface::new(width, height),
            BlockRasterizer::new(glyph, glyph),
            font(glyph),
            64,
        )
    }

    #[test]
    fn test_atlas_creation() {
        let atlas = block_atlas(256, 256, 10);
        assert_eq!(atlas.size(), (256, 256));
        assert_eq!(atlas.glyph_count(), 0);
        assert_eq!(atlas.allocator().cursor(), (0, 0));
    }

    #[test]
    fn test_get_rectangle_places_glyph() {
        let mut atlas = block_atlas(256, 256, 10);
        let rect = atlas.get_rectangle('A').unwrap();
        assert_eq!(rect, GlyphRect::new(0, 0, 10, 10));
        assert_eq!(atlas.glyph_count(), 1);
        assert!(atlas.contains('A'));
        let pixels = atlas.surface().read_region(0, 0, 10, 10).unwrap();
        assert!(pixels.chunks(4).all(|p| p == WHITE));
    }

    #[test]
    fn test_tall_glyphs_clipped_to_line_height() {
        // 'T' is taller than a shelf. 'T', 'a', 'b' fill the first one.
        let mut atlas = TextAtlas::new(
            MemorySurface::new(40, 64),
            BlockRasterizer::new(10, 10).with_size('T', 10, 16),
            font(10),
            16,
        );
        let rects = atlas.get_rectangles("TabcT".chars()).unwrap();
        assert_eq!(rects[0], GlyphRect::new(0, 0, 10, 10));
        assert_eq!(rects[3], GlyphRect::new(0, 10, 10, 10));

        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(a == b || !a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
        let below = atlas.surface().read_region(0, 10, 10, 10).unwrap();
        assert!(below.chunks(4).all(|p| p == WHITE));
    }

    #[test]
    fn test_hit_does_not_rasterize() {
        let mut atlas = block_atlas(256, 256, 10);
        let first = atlas.get_rectangle('x').unwrap();
        let second = atlas.get_rectangle('x').unwrap();
        assert_eq!(first, second);
        assert_eq!(atlas.rasterizer().calls(), 1);
        assert_eq!(atlas.allocator().cursor(), (10, 0));
    }

    #[test]
    fn test_get_rectangles_dedupes() {
        let mut atlas = block_atlas(256, 256, 10);
        let rects = atlas.get_rectangles("abab".chars()).unwrap();
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0], rects[2]);
        assert_eq!(rects[1], rects[3]);
        assert_ne!(rects[0], rects[1]);
        assert_eq!(atlas.rasterizer().calls(), 2);
        assert_eq!(atlas.glyph_count(), 2);
    }

    #[test]
    fn test_line_break_is_reserved() {
        let mut atlas = block_atlas(256, 256, 10);
        assert_eq!(
            atlas.get_rectangle('\n'),
            Err(AtlasError::ReservedCharacter('\n'))
        );
        assert_eq!(atlas.rasterizer().calls(), 0);
        assert_eq!(atlas.glyph_count(), 0);
    }

    #[test]
    fn test_atlas_write_unsupported() {
        let caps = SurfaceCaps {
            write: false,
            ..SurfaceCaps::ALL
        };
        let mut atlas = TextAtlas::new(
            MemorySurface::with_caps(64, 64, caps),
            BlockRasterizer::new(8, 8),
            font(8),
            16,
        );
        assert_eq!(atlas.get_rectangle('a'), Err(AtlasError::AtlasWriteUnsupported));
        assert_eq!(atlas.glyph_count(), 0);
    }

    #[test]
    fn test_glyph_too_large_adds_nothing() {
        let mut atlas = TextAtlas::new(
            MemorySurface::new(32, 32),
            BlockRasterizer::new(8, 8).with_size('W', 40, 8),
            font(8),
            16,
        );
        assert!(matches!(
            atlas.get_rectangle('W'),
            Err(AtlasError::GlyphTooLarge { .. })
        ));
        assert!(!atlas.contains('W'));
        assert_eq!(atlas.allocator().cursor(), (0, 0));
    }

    #[test]
    fn test_atlas_full_on_fixed_surface() {
        let mut atlas = TextAtlas::new(
            MemorySurface::with_caps(32, 32, SurfaceCaps::FIXED),
            BlockRasterizer::new(10, 10),
            font(10),
            16,
        );
        for c in 'a'..='i' {
            atlas.get_rectangle(c).unwrap();
        }
        assert_eq!(atlas.get_rectangle('j'), Err(AtlasError::AtlasFull));
        assert_eq!(atlas.glyph_count(), 9);
    }

    #[test]
    fn test_growth_keeps_cached_rectangles() {
        let mut atlas = block_atlas(32, 32, 10);
        let before: Vec<_> = ('a'..='i').map(|c| atlas.get_rectangle(c).unwrap()).collect();
        let handle = atlas.surface().handle();

        atlas.get_rectangle('j').unwrap();
        assert!(atlas.size().1 > 32);
        assert_ne!(atlas.surface().handle(), handle);

        let after: Vec<_> = ('a'..='i').map(|c| atlas.cached(c).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_tex_coords_normalized() {
        let mut atlas = block_atlas(64, 32, 8);
        let tex = atlas.tex_coords("ab").unwrap();
        assert_eq!(tex[0], TexRect { x: 0.0, y: 0.0, width: 0.125, height: 0.25 });
        assert_eq!(tex[1].x, 0.125);
    }

    #[test]
    fn test_with_colors_reaches_rasterizer() {
        let red = [255, 0, 0, 255];
        let mut atlas = block_atlas(64, 64, 4).with_colors(TRANSPARENT, red);
        atlas.get_rectangle('r').unwrap();
        let pixels = atlas.surface().read_region(0, 0, 4, 4).unwrap();
        assert!(pixels.chunks(4).all(|p| p == red));
    }

    /// Produces bitmaps whose pixel buffer is too short.
    struct Truncated;

    impl Rasterizer for Truncated {
        fn rasterize(
            &mut self,
            _text: &str,
            _font: &FontOptions,
            _background: Rgba8,
            _foreground: Rgba8,
        ) -> Result<GlyphBitmap> {
            Ok(GlyphBitmap {
                width: 4,
                height: 4,
                pixels: vec![0; 3],
            })
        }
    }

    #[test]
    fn test_malformed_bitmap_leaves_state_untouched() {
        let mut atlas = TextAtlas::new(MemorySurface::new(64, 64), Truncated, font(8), 16);
        assert!(matches!(
            atlas.get_rectangle('q'),
            Err(AtlasError::PixelLengthMismatch { .. })
        ));
        assert_eq!(atlas.allocator().cursor(), (0, 0));
        assert_eq!(atlas.glyph_count(), 0);
    }

    #[test]
    fn test_into_parts() {
        let mut atlas = block_atlas(64, 64, 4);
        atlas.get_rectangle('z').unwrap();
        let (surface, raster) = atlas.into_parts();
        assert_eq!(surface.width(), 64);
        assert_eq!(raster.calls(), 1);
    }
}
