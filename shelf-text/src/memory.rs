//! CPU-side backing surface.
//!
//! Stores the atlas as a tightly packed RGBA8 buffer (`width * height * 4`
//! bytes, row-major). Growing the surface allocates a new buffer, copies
//! the old rows into it, and then drops the old buffer, so every resize
//! replaces the storage handle just like a GPU texture would.

use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::surface::{
    check_bounds, check_growth, check_pixel_len, AtlasSurface, ReplaceListener, StorageEvents,
    StorageHandle, SurfaceCaps, BYTES_PER_PIXEL,
};

/// RGBA8 pixel store held in system memory.
#[derive(Debug)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    /// RGBA pixel data (width * height * 4 bytes).
    data: Vec<u8>,
    caps: SurfaceCaps,
    handle: StorageHandle,
    events: StorageEvents,
    /// Whether data has changed since the last call to `take_dirty`.
    dirty: bool,
}

impl MemorySurface {
    /// Create a readable, writable, resizable surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_caps(width, height, SurfaceCaps::ALL)
    }

    /// Create a surface advertising the given capabilities.
    pub fn with_caps(width: u32, height: u32, caps: SurfaceCaps) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
            caps,
            handle: StorageHandle::next(),
            events: StorageEvents::new(),
            dirty: false,
        }
    }

    pub fn from_config(config: &AtlasConfig) -> Self {
        let caps = SurfaceCaps {
            resize: config.resizable,
            ..SurfaceCaps::ALL
        };
        Self::with_caps(config.width, config.height, caps)
    }

    /// Whole-surface RGBA8 data, for uploading in one go.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn caps(&self) -> SurfaceCaps {
        self.caps
    }

    /// Returns whether the pixels changed since the last call, and clears
    /// the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    fn row_range(&self, x: u32, y: u32, width: u32) -> std::ops::Range<usize> {
        let start = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        start..start + width as usize * BYTES_PER_PIXEL
    }
}

impl AtlasSurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn can_resize(&self) -> bool {
        self.caps.resize
    }

    fn can_read(&self) -> bool {
        self.caps.read
    }

    fn can_write(&self) -> bool {
        self.caps.write
    }

    fn handle(&self) -> StorageHandle {
        self.handle
    }

    fn insert(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
        if !self.caps.write {
            return Err(AtlasError::AtlasWriteUnsupported);
        }
        check_bounds(self.width, self.height, x, y, width, height)?;
        check_pixel_len(width, height, pixels)?;

        let src_stride = width as usize * BYTES_PER_PIXEL;
        for row in 0..height {
            let dst = self.row_range(x, y + row, width);
            let src = row as usize * src_stride;
            self.data[dst].copy_from_slice(&pixels[src..src + src_stride]);
        }
        self.dirty = true;
        Ok(())
    }

    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        if !self.caps.read {
            return Err(AtlasError::ReadUnsupported);
        }
        check_bounds(self.width, self.height, x, y, width, height)?;

        let mut out = Vec::with_capacity(Self::byte_len(width, height));
        for row in 0..height {
            out.extend_from_slice(&self.data[self.row_range(x, y + row, width)]);
        }
        Ok(out)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.caps.resize {
            return Err(AtlasError::ResizeUnsupported);
        }
        check_growth((self.width, self.height), (width, height))?;

        let mut data = vec![0u8; Self::byte_len(width, height)];
        let old_stride = self.width as usize * BYTES_PER_PIXEL;
        let new_stride = width as usize * BYTES_PER_PIXEL;
        for row in 0..self.height as usize {
            let src = row * old_stride;
            let dst = row * new_stride;
            data[dst..dst + old_stride].copy_from_slice(&self.data[src..src + old_stride]);
        }

        let old = self.handle;
        let new = StorageHandle::next();
        log::info!(
            "Memory atlas grew {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        self.events.emit(old, new);

        // Old storage goes away only after listeners have rebound.
        self.data = data;
        self.handle = new;
        self.width = width;
        self.height = height;
        self.dirty = true;
        Ok(())
    }

    fn on_storage_replaced(&mut self, listener: ReplaceListener) {
        self.events.subscribe(listener);
    }
}

// ===================================================================
// Tests
// ===================================================================
