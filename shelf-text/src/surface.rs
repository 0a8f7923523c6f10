//! Backing surface capability interface.
//!
//! A surface is an opaque 2D RGBA8 pixel store. Backends differ in what
//! they can do (read back, write, grow), so the atlas only ever talks to
//! them through [`AtlasSurface`] and checks the capability flags before
//! relying on an operation.
//!
//! Growing a surface may replace its underlying storage. Consumers that
//! hold views onto the storage (texture views, bind groups, …) register a
//! listener with [`AtlasSurface::on_storage_replaced`]; the listener runs
//! synchronously inside `resize`, before the old storage is released.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AtlasError, Result};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

// ── Storage handles ─────────────────────────────────────────────────

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies one allocation of backing storage.
///
/// Every storage allocation mints a new handle, so a handle observed
/// before a resize never compares equal to the one observed after.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageHandle(u64);

impl StorageHandle {
    /// Mint a fresh, process-unique handle.
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Emitted once per successful resize, before `old` is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageReplaced {
    pub old: StorageHandle,
    pub new: StorageHandle,
}

/// Callback invoked on storage replacement.
pub type ReplaceListener = Box<dyn FnMut(&StorageReplaced) + Send>;

/// Listener registry shared by surface implementations.
#[derive(Default)]
pub struct StorageEvents {
    listeners: Vec<ReplaceListener>,
}

impl StorageEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: ReplaceListener) {
        self.listeners.push(listener);
    }

    /// Run every listener, in registration order.
    pub fn emit(&mut self, old: StorageHandle, new: StorageHandle) {
        let event = StorageReplaced { old, new };
        log::info!(
            "Atlas storage replaced {} -> {} ({} listener(s))",
            old,
            new,
            self.listeners.len()
        );
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for StorageEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEvents")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ── Capability interface ────────────────────────────────────────────

/// Capability flags advertised by a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceCaps {
    pub read: bool,
    pub write: bool,
    pub resize: bool,
}

impl SurfaceCaps {
    pub const ALL: Self = Self {
        read: true,
        write: true,
        resize: true,
    };

    /// Readable and writable, fixed size.
    pub const FIXED: Self = Self {
        read: true,
        write: true,
        resize: false,
    };
}

impl Default for SurfaceCaps {
    fn default() -> Self {
        Self::ALL
    }
}

/// The minimal contract every backing surface implements.
pub trait AtlasSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn can_resize(&self) -> bool;
    fn can_read(&self) -> bool;
    fn can_write(&self) -> bool;

    /// Handle of the storage currently backing this surface.
    fn handle(&self) -> StorageHandle;

    /// Write a `width × height` block of RGBA8 pixels at `(x, y)`.
    fn insert(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> Result<()>;

    /// Read a `width × height` block of RGBA8 pixels at `(x, y)`.
    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>>;

    /// Grow the surface, preserving existing content at its coordinates.
    ///
    /// Emits exactly one [`StorageReplaced`] event before returning.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Register a listener for storage replacement.
    fn on_storage_replaced(&mut self, listener: ReplaceListener);
}

impl<S: AtlasSurface + ?Sized> AtlasSurface for Box<S> {
    fn width(&self) -> u32 {
        (**self).width()
    }
    fn height(&self) -> u32 {
        (**self).height()
    }
    fn can_resize(&self) -> bool {
        (**self).can_resize()
    }
    fn can_read(&self) -> bool {
        (**self).can_read()
    }
    fn can_write(&self) -> bool {
        (**self).can_write()
    }
    fn handle(&self) -> StorageHandle {
        (**self).handle()
    }
    fn insert(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
        (**self).insert(x, y, width, height, pixels)
    }
    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        (**self).read_region(x, y, width, height)
    }
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        (**self).resize(width, height)
    }
    fn on_storage_replaced(&mut self, listener: ReplaceListener) {
        (**self).on_storage_replaced(listener)
    }
}

// ── Shared validation ───────────────────────────────────────────────

/// Check that a `width × height` block at `(x, y)` lies inside a
/// `surface_width × surface_height` surface.
pub fn check_bounds(
    surface_width: u32,
    surface_height: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<()> {
    let fits_x = x.checked_add(width).is_some_and(|right| right <= surface_width);
    let fits_y = y.checked_add(height).is_some_and(|bottom| bottom <= surface_height);
    if fits_x && fits_y {
        Ok(())
    } else {
        Err(AtlasError::RegionOutOfBounds {
            x,
            y,
            width,
            height,
            surface_width,
            surface_height,
        })
    }
}

/// Check that `pixels` holds exactly `width × height` RGBA8 pixels.
pub fn check_pixel_len(width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if pixels.len() == expected {
        Ok(())
    } else {
        Err(AtlasError::PixelLengthMismatch {
            expected,
            actual: pixels.len(),
        })
    }
}

/// Check that a resize request never shrinks the surface.
pub fn check_growth(from: (u32, u32), to: (u32, u32)) -> Result<()> {
    if to.0 >= from.0 && to.1 >= from.1 {
        Ok(())
    } else {
        Err(AtlasError::InvalidResize {
            from_width: from.0,
            from_height: from.1,
            to_width: to.0,
            to_height: to.1,
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
