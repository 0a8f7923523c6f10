//! # shelf-text
//!
//! Dynamic glyph atlas. Characters are rasterized on first use, packed
//! into a growable RGBA8 surface by a shelf allocator, and laid out as
//! textured quads for a GPU text pipeline.
//!
//! ## Architecture
//!
//! ```text
//! TextAtlas<S: AtlasSurface, R: Rasterizer>
//!     │
//!     ├── GlyphCache      char ──► GlyphRect (never evicted)
//!     ├── ShelfAllocator  cursor + line height, grows S vertically
//!     └── S               MemorySurface here, WgpuSurface in shelf-render
//!     │
//!     ▼
//! pixel_quads / normalized_quads ──► Vec<Quad> ──► vertex buffer
//! ```
//!
//! - **`surface`**: the capability contract backends implement, plus
//!   storage-replaced notifications.
//! - **`memory`**: CPU-side surface backed by a `Vec<u8>`.
//! - **`allocator`**: shelf packing with vertical growth.
//! - **`atlas`** / **`layout`**: the glyph cache and quad generation.
//! - **`rasterizer`**: `cosmic-text` glyph rasterization.

pub mod allocator;
pub mod atlas;
pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod memory;
pub mod quad;
pub mod rasterizer;
pub mod surface;

// Re-exports for ergonomic use.
pub use allocator::ShelfAllocator;
pub use atlas::{TextAtlas, LINE_BREAK};
pub use cache::GlyphCache;
pub use config::AtlasConfig;
pub use error::{AtlasError, ConfigError, Result};
pub use memory::MemorySurface;
pub use quad::{Corner, GlyphRect, NdcRect, Orthographic, PixelRect, Quad, TexRect, Vertex};
pub use rasterizer::{
    BlockRasterizer, CosmicRasterizer, FontOptions, GlyphBitmap, Rasterizer, Rgba8, TRANSPARENT,
    WHITE,
};
pub use surface::{
    AtlasSurface, ReplaceListener, StorageEvents, StorageHandle, StorageReplaced, SurfaceCaps,
    BYTES_PER_PIXEL,
};
