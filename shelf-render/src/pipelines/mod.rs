//! wgpu render pipelines.
//!
//! - [`text`]: draws atlas quads.
//! - [`blit`]: texel-exact texture copy through a render pass, used to
//!   grow surfaces whose storage cannot be copied directly.

pub mod blit;
pub mod text;
