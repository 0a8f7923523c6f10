//! Atlas configuration, loadable from JSON.
//!
//! Every field has a default, so a config file only needs to name the
//! values it changes:
//!
//! ```json
//! { "height": 256, "font": { "font_size": 24.0, "line_height": 30 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rasterizer::FontOptions;

/// Initial surface geometry, growth policy, and font.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Surface width in pixels. Never changes after creation.
    pub width: u32,
    /// Initial surface height in pixels.
    pub height: u32,
    /// Minimum number of rows added each time the surface grows.
    pub expand_height: u32,
    /// Whether the surface may grow at all.
    pub resizable: bool,
    pub font: FontOptions,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            expand_height: 256,
            resizable: true,
            font: FontOptions::default(),
        }
    }
}

impl AtlasConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded atlas config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "atlas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.font.line_height == 0 {
            return Err(ConfigError::Invalid("line_height must be positive".into()));
        }
        if self.font.line_height >= self.height {
            return Err(ConfigError::Invalid(format!(
                "line_height {} must be less than the atlas height {}",
                self.font.line_height, self.height
            )));
        }
        if !(self.font.font_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "font_size must be positive, got {}",
                self.font.font_size
            )));
        }
        Ok(())
    }
}

// ===================================================================
// Tests
// ===================================================================
