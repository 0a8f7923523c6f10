//! # shelf-render
//!
//! `wgpu` backend for the `shelf-text` glyph atlas.
//!
//! ## Architecture
//!
//! ```text
//!  TextAtlas<WgpuSurface, _> (shelf-text)
//!       │  grows ──► StorageReplaced ──► TextPipeline marks bind group stale
//!       ▼
//!  normalized_quads(region, viewport, text) ──► Vec<Quad>
//!       │
//!       ▼
//!  Renderer.prepare(quads)          ◀─── rebinds atlas if replaced, uploads
//!       │
//!       ▼
//!  Renderer.render_to_texture()     ◀─── single draw call
//! ```
//!
//! ## Crate modules
//!
//! - [`context`]: headless GPU device/queue and the shared submission lock
//! - [`surface`]: `WgpuSurface`, the texture-backed `AtlasSurface`
//! - [`vertex`]: quad vertex layout and index generation
//! - [`pipelines`]: text and blit render pipelines
//! - [`renderer`]: offscreen frame orchestration

pub mod context;
pub mod pipelines;
pub mod renderer;
pub mod surface;
pub mod vertex;

// Re-exports for convenience
pub use context::{GpuContext, GpuError};
pub use pipelines::blit::BlitPipeline;
pub use pipelines::text::TextPipeline;
pub use renderer::{FrameStats, Renderer};
pub use surface::{SurfaceProfile, WgpuSurface, ATLAS_FORMAT};
pub use vertex::TextUniform;
