//! Error taxonomy for the atlas core.
//!
//! Every failure is reported synchronously at the point of violation and
//! never retried internally. A failed allocation or insertion leaves the
//! allocator cursor and the glyph cache untouched.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// The glyph is at least as wide or as tall as the surface. Growing the
    /// surface never helps because growth is vertical and checked up front.
    #[error("glyph {width}x{height} cannot fit in a {atlas_width}x{atlas_height} atlas")]
    GlyphTooLarge {
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },
    #[error("atlas is full and the backing surface cannot be resized")]
    AtlasFull,
    #[error("the backing surface is not writable")]
    AtlasWriteUnsupported,
    #[error("the backing surface is not readable")]
    ReadUnsupported,
    #[error("the backing surface cannot be resized")]
    ResizeUnsupported,
    #[error("region is not wide enough for the requested text")]
    RegionTooNarrow,
    #[error("region is not tall enough for the requested text")]
    RegionTooShort,
    #[error("{0:?} is a line-break marker and has no glyph")]
    ReservedCharacter(char),
    #[error("region ({x}, {y}) {width}x{height} lies outside the {surface_width}x{surface_height} surface")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        surface_width: u32,
        surface_height: u32,
    },
    #[error("expected {expected} bytes of RGBA8 pixel data, got {actual}")]
    PixelLengthMismatch { expected: usize, actual: usize },
    #[error("cannot resize {from_width}x{from_height} surface down to {to_width}x{to_height}")]
    InvalidResize {
        from_width: u32,
        from_height: u32,
        to_width: u32,
        to_height: u32,
    },
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = AtlasError> = std::result::Result<T, E>;
