//! Quad layout: turns a string into textured quads inside a region.
//!
//! Glyphs are laid left to right from the region's top-left corner. A
//! [`LINE_BREAK`] returns the pen to the left edge and moves it down one
//! line height. There is no automatic wrapping: a glyph that does not fit
//! horizontally is an error.

use crate::atlas::{TextAtlas, LINE_BREAK};
use crate::error::{AtlasError, Result};
use crate::quad::{NdcRect, Orthographic, PixelRect, Quad};
use crate::rasterizer::Rasterizer;
use crate::surface::AtlasSurface;

impl<S: AtlasSurface, R: Rasterizer> TextAtlas<S, R> {
    /// Pixel-space quads for each non-line-break character of `text`.
    ///
    /// Texture coordinates are atlas pixels. Missing glyphs are placed
    /// on the way, so the atlas may grow during layout.
    pub fn pixel_quads(&mut self, region: PixelRect, text: &str) -> Result<Vec<Quad>> {
        let line_height = self.font().line_height as i32;
        let (mut pen_x, mut pen_y) = (region.x, region.y);
        let mut quads = Vec::with_capacity(text.len());

        for c in text.chars() {
            if c == LINE_BREAK {
                pen_x = region.x;
                pen_y += line_height;
                if pen_y > region.bottom() {
                    return Err(AtlasError::RegionTooShort);
                }
                continue;
            }

            let glyph = self.get_rectangle(c)?;
            let (width, height) = (glyph.width as i32, glyph.height as i32);
            if pen_x + width > region.right() {
                return Err(AtlasError::RegionTooNarrow);
            }
            if pen_y + height > region.bottom() {
                return Err(AtlasError::RegionTooShort);
            }

            quads.push(Quad::from_glyph(pen_x, pen_y, &glyph));
            pen_x += width;
        }

        Ok(quads)
    }

    /// Clip-space quads for `text` laid out in an NDC `region` of a
    /// `viewport` of `(width, height)` pixels.
    ///
    /// Texture coordinates are divided by the atlas size as it stands
    /// once layout has finished, so they stay inside `[0, 1]` even if
    /// layout grew the atlas. They go stale on the next growth.
    pub fn normalized_quads(
        &mut self,
        region: NdcRect,
        viewport: (u32, u32),
        text: &str,
    ) -> Result<Vec<Quad>> {
        let quads = self.pixel_quads(region.to_pixels(viewport), text)?;
        let projection = Orthographic::for_viewport(viewport);
        let atlas_size = self.size();
        Ok(quads
            .iter()
            .map(|quad| quad.project(&projection, atlas_size))
            .collect())
    }
}

// ===================================================================
// Tests
// ===================================================================
