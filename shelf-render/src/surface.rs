//! `wgpu` texture backing for the glyph atlas.
//!
//! A [`WgpuSurface`] owns one RGBA8 texture and implements
//! [`AtlasSurface`] in one of three [`SurfaceProfile`]s. Growth always
//! allocates a new texture, copies the old content into its top-left
//! corner on the device, notifies listeners, and destroys the old
//! texture.

use std::sync::mpsc;

use shelf_text::surface::{check_bounds, check_growth, check_pixel_len};
use shelf_text::{
    AtlasConfig, AtlasError, AtlasSurface, ReplaceListener, Result, StorageEvents, StorageHandle,
    BYTES_PER_PIXEL,
};
use wgpu::{
    BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Extent3d, MapMode, Origin3d,
    TexelCopyBufferInfo, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

use crate::pipelines::blit::BlitPipeline;
use crate::context::GpuContext;

/// Texel format of every atlas texture. Linear, so bytes read back are
/// the bytes written.
pub const ATLAS_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// How a surface exposes its texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceProfile {
    /// Readable and writable; grows with a texture-to-texture copy.
    ReadWriteCopy,
    /// Readable and writable; grows by rendering the old texture into
    /// the new one.
    ReadWriteBlit,
    /// Writable only; grows with a texture-to-texture copy.
    WriteOnlyCopy,
}

impl SurfaceProfile {
    pub fn can_read(self) -> bool {
        !matches!(self, SurfaceProfile::WriteOnlyCopy)
    }

    fn usage(self) -> TextureUsages {
        let base = TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST;
        match self {
            SurfaceProfile::ReadWriteCopy => base | TextureUsages::COPY_SRC,
            SurfaceProfile::ReadWriteBlit => {
                base | TextureUsages::COPY_SRC | TextureUsages::RENDER_ATTACHMENT
            }
            // Copy source for growth only; reads are refused.
            SurfaceProfile::WriteOnlyCopy => base | TextureUsages::COPY_SRC,
        }
    }
}

/// Atlas surface stored in a GPU texture.
pub struct WgpuSurface {
    gpu: GpuContext,
    profile: SurfaceProfile,
    resizable: bool,
    texture: Texture,
    width: u32,
    height: u32,
    handle: StorageHandle,
    events: StorageEvents,
    blit: Option<BlitPipeline>,
}

impl WgpuSurface {
    /// Create a resizable `width × height` surface. The texture starts
    /// fully transparent.
    pub fn new(gpu: &GpuContext, width: u32, height: u32, profile: SurfaceProfile) -> Self {
        let texture = create_texture(gpu, width, height, profile);
        let blit = match profile {
            SurfaceProfile::ReadWriteBlit => Some(BlitPipeline::new(&gpu.device, ATLAS_FORMAT)),
            _ => None,
        };
        let handle = StorageHandle::next();
        log::debug!("GPU atlas {} created at {}x{} ({:?})", handle, width, height, profile);

        Self {
            gpu: gpu.clone(),
            profile,
            resizable: true,
            texture,
            width,
            height,
            handle,
            events: StorageEvents::new(),
            blit,
        }
    }

    pub fn from_config(gpu: &GpuContext, config: &AtlasConfig, profile: SurfaceProfile) -> Self {
        Self::new(gpu, config.width, config.height, profile).with_resizable(config.resizable)
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn profile(&self) -> SurfaceProfile {
        self.profile
    }

    /// The texture currently backing the surface. Replaced on resize.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn create_view(&self) -> TextureView {
        self.texture.create_view(&TextureViewDescriptor::default())
    }

    fn copy_into(&self, target: &Texture) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("atlas_grow_encoder"),
            });

        match &self.blit {
            Some(blit) => {
                let source = self.create_view();
                let target = target.create_view(&TextureViewDescriptor::default());
                blit.encode(
                    &self.gpu.device,
                    &mut encoder,
                    &source,
                    &target,
                    (self.width, self.height),
                );
            }
            None => encoder.copy_texture_to_texture(
                TexelCopyTextureInfo {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                TexelCopyTextureInfo {
                    texture: target,
                    mip_level: 0,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                extent(self.width, self.height),
            ),
        }

        let _guard = self.gpu.lock_submission();
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl AtlasSurface for WgpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn can_resize(&self) -> bool {
        self.resizable
    }

    fn can_read(&self) -> bool {
        self.profile.can_read()
    }

    fn can_write(&self) -> bool {
        true
    }

    fn handle(&self) -> StorageHandle {
        self.handle
    }

    fn insert(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
        check_bounds(self.width, self.height, x, y, width, height)?;
        check_pixel_len(width, height, pixels)?;
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.gpu.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: Origin3d { x, y, z: 0 },
                aspect: TextureAspect::All,
            },
            pixels,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL as u32),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
        Ok(())
    }

    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        if !self.can_read() {
            return Err(AtlasError::ReadUnsupported);
        }
        check_bounds(self.width, self.height, x, y, width, height)?;
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let row_bytes = width * BYTES_PER_PIXEL as u32;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = self.gpu.device.create_buffer(&BufferDescriptor {
            label: Some("atlas_readback"),
            size: padded_row_bytes as u64 * height as u64,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("atlas_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: Origin3d { x, y, z: 0 },
                aspect: TextureAspect::All,
            },
            TexelCopyBufferInfo {
                buffer: &staging,
                layout: TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        let submission = {
            let _guard = self.gpu.lock_submission();
            self.gpu.queue.submit(std::iter::once(encoder.finish()))
        };

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(MapMode::Read, move |res| {
            let _ = sender.send(res);
        });
        let status = self
            .gpu
            .device
            .poll(wgpu::Maintain::wait_for(submission));
        if !status.is_queue_empty() {
            log::debug!("Atlas readback done with other submissions still queued");
        }
        receiver
            .recv()
            .map_err(|e| AtlasError::Backend(format!("readback channel closed: {e}")))?
            .map_err(|e| AtlasError::Backend(format!("readback map failed: {e}")))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity(row_bytes as usize * height as usize);
        for row in 0..height as usize {
            let start = row * padded_row_bytes as usize;
            out.extend_from_slice(&mapped[start..start + row_bytes as usize]);
        }
        drop(mapped);
        staging.unmap();
        Ok(out)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.resizable {
            return Err(AtlasError::ResizeUnsupported);
        }
        check_growth((self.width, self.height), (width, height))?;

        let texture = create_texture(&self.gpu, width, height, self.profile);
        self.copy_into(&texture);

        let old_texture = std::mem::replace(&mut self.texture, texture);
        let old = self.handle;
        let new = StorageHandle::next();
        log::info!(
            "GPU atlas grew {}x{} -> {}x{} ({} -> {})",
            self.width,
            self.height,
            width,
            height,
            old,
            new
        );
        self.handle = new;
        self.width = width;
        self.height = height;

        self.events.emit(old, new);
        old_texture.destroy();
        Ok(())
    }

    fn on_storage_replaced(&mut self, listener: ReplaceListener) {
        self.events.subscribe(listener);
    }
}

impl Drop for WgpuSurface {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

fn create_texture(gpu: &GpuContext, width: u32, height: u32, profile: SurfaceProfile) -> Texture {
    gpu.device.create_texture(&TextureDescriptor {
        label: Some("glyph_atlas"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: ATLAS_FORMAT,
        usage: profile.usage(),
        view_formats: &[],
    })
}

fn extent(width: u32, height: u32) -> Extent3d {
    Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

// ===================================================================
// Tests
// ===================================================================
