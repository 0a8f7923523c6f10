//! Shelf allocator: places glyph rectangles into a surface row by row.
//!
//! Glyphs are packed left-to-right along a shelf. When a glyph would reach
//! the right edge, the cursor wraps to a new shelf one line-height below.
//! The shelf height is the font's line height, not the height of the
//! glyphs placed on it, so glyphs of different heights share a shelf
//! without re-measuring it.
//!
//! ```text
//!   x=0        cursor_x
//!   ┌────┬──┬───┬───────────────┐ y=0
//!   │ A  │i │ W │               │
//!   ├────┴──┴───┴───────────────┤ y=line_height   ◀── cursor_y
//!   │ ...                       │
//!   └───────────────────────────┘
//! ```
//!
//! Edge checks use `>=`, so a glyph that would touch the right or bottom
//! edge is pushed on. This keeps a gap of at least one pixel on those two
//! edges, preventing sampling bleed. Left and top edges are not padded.

use crate::error::{AtlasError, Result};
use crate::surface::AtlasSurface;

/// Row/shelf packer with a monotonic write head.
#[derive(Clone, Debug)]
pub struct ShelfAllocator {
    cursor_x: u32,
    cursor_y: u32,
    /// Shelf height in pixels.
    line_height: u32,
    /// Minimum number of rows added when the surface has to grow.
    expand_height: u32,
}

impl ShelfAllocator {
    pub fn new(line_height: u32, expand_height: u32) -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            line_height,
            expand_height,
        }
    }

    /// Current write head `(x, y)`.
    pub fn cursor(&self) -> (u32, u32) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn line_height(&self) -> u32 {
        self.line_height
    }

    pub fn expand_height(&self) -> u32 {
        self.expand_height
    }

    /// Reserve a `width × height` rectangle and return its top-left corner.
    ///
    /// Grows `surface` vertically at most once when the current shelf runs
    /// past the bottom edge. On failure the cursor is left untouched.
    pub fn allocate<S>(&mut self, surface: &mut S, width: u32, height: u32) -> Result<(u32, u32)>
    where
        S: AtlasSurface + ?Sized,
    {
        if width >= surface.width() || height >= surface.height() {
            log::warn!(
                "Glyph {}x{} can never fit in a {}x{} atlas",
                width,
                height,
                surface.width(),
                surface.height()
            );
            return Err(AtlasError::GlyphTooLarge {
                width,
                height,
                atlas_width: surface.width(),
                atlas_height: surface.height(),
            });
        }

        let mut grown = false;
        loop {
            let (x, y) = self.propose(surface.width(), width);
            if y.saturating_add(height) < surface.height() {
                // Same shelf: only x advances. y moves on wrap alone.
                self.cursor_x = x + width;
                self.cursor_y = y;
                log::debug!("Allocated {}x{} at ({}, {})", width, height, x, y);
                return Ok((x, y));
            }

            let new_height = self
                .growth_for(surface.height(), y, height)
                .and_then(|growth| surface.height().checked_add(growth));
            let Some(new_height) = new_height.filter(|_| !grown && surface.can_resize()) else {
                log::warn!(
                    "Atlas {}x{} is full, cannot place {}x{}",
                    surface.width(),
                    surface.height(),
                    width,
                    height
                );
                return Err(AtlasError::AtlasFull);
            };

            log::info!(
                "Growing atlas {}x{} -> {}x{}",
                surface.width(),
                surface.height(),
                surface.width(),
                new_height
            );
            surface.resize(surface.width(), new_height)?;
            grown = true;
        }
    }

    /// Where the next `width`-wide glyph would go, without committing.
    fn propose(&self, surface_width: u32, width: u32) -> (u32, u32) {
        if self.cursor_x.saturating_add(width) >= surface_width {
            (0, self.cursor_y.saturating_add(self.line_height))
        } else {
            (self.cursor_x, self.cursor_y)
        }
    }

    /// Rows to add so that a glyph of `height` at `y` fits after growth.
    ///
    /// At least `max(expand_height, height)`; more only when the wrapped
    /// shelf already starts beyond that, so the single retry always lands.
    /// `None` when the required height does not fit in a `u32`.
    fn growth_for(&self, surface_height: u32, y: u32, height: u32) -> Option<u32> {
        let needed = y.checked_add(height)?.checked_add(1)?;
        let shortfall = needed.saturating_sub(surface_height);
        Some(self.expand_height.max(height).max(shortfall))
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;
    use crate::surface::{AtlasSurface, SurfaceCaps};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_five_glyphs_wrap_after_three() {
        let mut surface = MemorySurface::new(64, 64);
        let mut alloc = ShelfAllocator::new(16, 32);
        let placed: Vec<_> = (0..5)
            .map(|_| alloc.allocate(&mut surface, 20, 10).unwrap())
            .collect();
        // 60 + 20 >= 64, so the fourth wraps.
        assert_eq!(placed, vec![(0, 0), (20, 0), (40, 0), (0, 16), (20, 16)]);
    }

    #[test]
    fn test_exact_fit_is_rejected() {
        let mut surface = MemorySurface::new(64, 64);
        let mut alloc = ShelfAllocator::new(16, 32);
        alloc.allocate(&mut surface, 32, 8).unwrap();
        // 32 + 32 == 64 touches the edge, so this wraps.
        assert_eq!(alloc.allocate(&mut surface, 32, 8).unwrap(), (0, 16));
    }

    #[test]
    fn test_glyph_too_large() {
        let mut surface = MemorySurface::new(32, 32);
        let mut alloc = ShelfAllocator::new(8, 64);
        assert!(matches!(
            alloc.allocate(&mut surface, 32, 4),
            Err(AtlasError::GlyphTooLarge { .. })
        ));
        assert!(matches!(
            alloc.allocate(&mut surface, 4, 32),
            Err(AtlasError::GlyphTooLarge { .. })
        ));
        // Resizable surface was not grown to try anyway.
        assert_eq!(surface.height(), 32);
        assert_eq!(alloc.cursor(), (0, 0));
    }

    #[test]
    fn test_atlas_full_on_fixed_surface() {
        let mut surface = MemorySurface::with_caps(32, 32, SurfaceCaps::FIXED);
        let mut alloc = ShelfAllocator::new(10, 16);
        // Three shelves (y = 0, 10, 20) of three glyphs each.
        for _ in 0..9 {
            alloc.allocate(&mut surface, 10, 10).unwrap();
        }
        let cursor = alloc.cursor();
        assert_eq!(alloc.allocate(&mut surface, 10, 10), Err(AtlasError::AtlasFull));
        assert_eq!(alloc.cursor(), cursor, "cursor must not move on failure");
    }

    #[test]
    fn test_grows_by_expand_height() {
        let mut surface = MemorySurface::new(32, 32);
        let mut alloc = ShelfAllocator::new(10, 40);
        for _ in 0..9 {
            alloc.allocate(&mut surface, 10, 10).unwrap();
        }
        assert_eq!(alloc.allocate(&mut surface, 10, 10).unwrap(), (0, 30));
        assert_eq!(surface.height(), 72);
        assert_eq!(surface.width(), 32);
    }

    #[test]
    fn test_grows_by_glyph_height_when_larger() {
        let mut surface = MemorySurface::new(32, 32);
        let mut alloc = ShelfAllocator::new(20, 4);
        alloc.allocate(&mut surface, 10, 10).unwrap();
        alloc.allocate(&mut surface, 10, 10).unwrap();
        // Wraps to y=20; 20 + 15 >= 32, grow by max(4, 15) = 15.
        assert_eq!(alloc.allocate(&mut surface, 20, 15).unwrap(), (0, 20));
        assert_eq!(surface.height(), 47);
    }

    #[test]
    fn test_growth_covers_shortfall() {
        let mut surface = MemorySurface::new(32, 32);
        // The wrapped shelf starts below the current bottom edge.
        let mut alloc = ShelfAllocator::new(40, 1);
        alloc.allocate(&mut surface, 20, 4).unwrap();
        // Wraps to y=40: needs 40 + 4 + 1 = 45 rows.
        assert_eq!(alloc.allocate(&mut surface, 20, 4).unwrap(), (0, 40));
        assert_eq!(surface.height(), 45);
    }

    #[test]
    fn test_single_resize_per_allocation() {
        let mut surface = MemorySurface::new(32, 32);
        let resizes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resizes);
        surface.on_storage_replaced(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let mut alloc = ShelfAllocator::new(30, 1);
        alloc.allocate(&mut surface, 20, 4).unwrap();
        alloc.allocate(&mut surface, 20, 4).unwrap();
        assert_eq!(resizes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cursor_y_only_moves_on_wrap() {
        let mut surface = MemorySurface::new(100, 100);
        let mut alloc = ShelfAllocator::new(12, 16);
        alloc.allocate(&mut surface, 10, 5).unwrap();
        alloc.allocate(&mut surface, 10, 11).unwrap();
        alloc.allocate(&mut surface, 10, 3).unwrap();
        assert_eq!(alloc.cursor(), (30, 0));
    }

    #[test]
    fn test_huge_line_height_fails_without_overflow() {
        let mut surface = MemorySurface::new(32, 32);
        let handle = surface.handle();
        let mut alloc = ShelfAllocator::new(u32::MAX, 16);
        alloc.allocate(&mut surface, 20, 10).unwrap();
        // Wrapping saturates y; the needed height cannot be represented.
        assert_eq!(alloc.allocate(&mut surface, 20, 10), Err(AtlasError::AtlasFull));
        assert_eq!(alloc.cursor(), (20, 0));
        assert_eq!(surface.handle(), handle, "no resize was attempted");
    }

    #[test]
    fn test_zero_width_glyph_keeps_cursor() {
        let mut surface = MemorySurface::new(64, 64);
        let mut alloc = ShelfAllocator::new(16, 16);
        alloc.allocate(&mut surface, 10, 10).unwrap();
        assert_eq!(alloc.allocate(&mut surface, 0, 10).unwrap(), (10, 0));
        assert_eq!(alloc.cursor(), (10, 0));
    }
}
