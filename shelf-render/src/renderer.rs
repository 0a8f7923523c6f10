//! High-level renderer that ties the GPU context, the text pipeline, and
//! an atlas surface together into offscreen frames.

use shelf_text::Quad;
use wgpu::{
    Color, CommandEncoderDescriptor, Extent3d, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDescriptor, StoreOp, Texture, TextureDescriptor, TextureDimension, TextureUsages,
    TextureView, TextureViewDescriptor,
};

use crate::context::GpuContext;
use crate::pipelines::text::TextPipeline;
use crate::surface::WgpuSurface;
use crate::vertex::TextUniform;

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of glyph quads drawn.
    pub quad_count: u32,
    /// Number of draw calls.
    pub draw_calls: u32,
    /// Atlas bind-group rebuilds so far, one per storage replacement.
    pub atlas_rebinds: u32,
}

/// Offscreen text renderer.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = Renderer::new(&gpu);
/// renderer.watch(atlas.surface_mut());
/// let quads = atlas.normalized_quads(NdcRect::FULL, (800, 600), "Hello")?;
/// renderer.prepare(&gpu, atlas.surface(), &quads);
/// let stats = renderer.render_to_texture(&gpu, &target_view);
/// ```
pub struct Renderer {
    text_pipeline: TextPipeline,
    clear_color: Color,
}

impl Renderer {
    /// Create a new renderer for the given GPU context.
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            text_pipeline: TextPipeline::new(&gpu.device, gpu.target_format),
            clear_color: Color {
                r: 0.12,
                g: 0.12,
                b: 0.13,
                a: 1.0,
            },
        }
    }

    /// Set the background clear color.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    /// Set the color glyph texels are multiplied by.
    pub fn set_text_color(&self, gpu: &GpuContext, color: [f32; 4]) {
        self.text_pipeline
            .upload_uniform(&gpu.queue, &TextUniform { color });
    }

    /// Follow storage replacement on the atlas surface.
    pub fn watch(&self, surface: &mut WgpuSurface) {
        self.text_pipeline.watch(surface);
    }

    /// Upload this frame's quads. Call after all layout for the frame,
    /// since layout may grow the atlas.
    pub fn prepare(&mut self, gpu: &GpuContext, surface: &WgpuSurface, quads: &[Quad]) -> u32 {
        self.text_pipeline
            .prepare(&gpu.device, &gpu.queue, surface, quads)
    }

    /// Render to an off-screen texture.
    ///
    /// Returns the frame stats. The rendered output is in `target_view`.
    pub fn render_to_texture(&self, gpu: &GpuContext, target_view: &TextureView) -> FrameStats {
        let mut encoder = gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("shelf_offscreen_encoder"),
            });

        let draw_calls = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("shelf_offscreen_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.text_pipeline.draw(&mut pass)
        };

        {
            let _guard = gpu.lock_submission();
            gpu.queue.submit(std::iter::once(encoder.finish()));
        }

        FrameStats {
            quad_count: if draw_calls > 0 {
                self.text_pipeline.quad_count()
            } else {
                0
            },
            draw_calls,
            atlas_rebinds: self.text_pipeline.rebind_count(),
        }
    }

    /// Allocate a render target matching the context's target format.
    pub fn create_target(gpu: &GpuContext, width: u32, height: u32) -> (Texture, TextureView) {
        let texture = gpu.device.create_texture(&TextureDescriptor {
            label: Some("shelf_offscreen_target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: gpu.target_format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());
        (texture, view)
    }

    /// Access the text pipeline (for advanced usage).
    pub fn text_pipeline(&self) -> &TextPipeline {
        &self.text_pipeline
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceProfile;
    use shelf_text::{AtlasSurface, BlockRasterizer, FontOptions, NdcRect, TextAtlas};

    fn gpu() -> Option<GpuContext> {
        // May fail in CI without GPU; skip gracefully.
        pollster::block_on(GpuContext::new_headless()).ok()
    }

    #[test]
    fn test_frame_stats_default() {
        let stats = FrameStats::default();
        assert_eq!(stats.quad_count, 0);
        assert_eq!(stats.draw_calls, 0);
    }

    #[test]
    fn test_empty_frame_has_no_draws() {
        let Some(gpu) = gpu() else { return };
        let renderer = Renderer::new(&gpu);
        let (_target, view) = Renderer::create_target(&gpu, 64, 64);
        assert_eq!(renderer.render_to_texture(&gpu, &view), FrameStats::default());
    }

    #[test]
    fn test_growth_without_prepare_skips_draw() {
        let Some(gpu) = gpu() else { return };
        let mut renderer = Renderer::new(&gpu);
        let mut surface = WgpuSurface::new(&gpu, 32, 32, SurfaceProfile::ReadWriteCopy);
        renderer.watch(&mut surface);

        let font = FontOptions {
            line_height: 10,
            ..Default::default()
        };
        let mut atlas = TextAtlas::new(surface, BlockRasterizer::new(10, 10), font, 16);
        let (_target, view) = Renderer::create_target(&gpu, 320, 40);

        let quads = atlas.normalized_quads(NdcRect::FULL, (320, 40), "ab").unwrap();
        renderer.prepare(&gpu, atlas.surface(), &quads);
        let stale = atlas.surface().handle();

        atlas.surface_mut().resize(32, 64).unwrap();
        let skipped = renderer.render_to_texture(&gpu, &view);
        assert_eq!(skipped.draw_calls, 0);
        assert_eq!(skipped.quad_count, 0);
        assert_eq!(renderer.text_pipeline().bound_handle(), Some(stale));

        renderer.prepare(&gpu, atlas.surface(), &quads);
        let drawn = renderer.render_to_texture(&gpu, &view);
        assert_eq!(drawn.draw_calls, 1);
        assert_eq!(drawn.quad_count, 2);
        assert_eq!(drawn.atlas_rebinds, 1);
    }

    #[test]
    fn test_render_atlas_text_across_growth() {
        let Some(gpu) = gpu() else { return };
        let mut renderer = Renderer::new(&gpu);
        let mut surface = WgpuSurface::new(&gpu, 32, 32, SurfaceProfile::ReadWriteCopy);
        renderer.watch(&mut surface);

        let font = FontOptions {
            line_height: 10,
            ..Default::default()
        };
        let mut atlas = TextAtlas::new(surface, BlockRasterizer::new(10, 10), font, 16);
        let (_target, view) = Renderer::create_target(&gpu, 320, 40);

        let quads = atlas.normalized_quads(NdcRect::FULL, (320, 40), "abc").unwrap();
        renderer.prepare(&gpu, atlas.surface(), &quads);
        let first = renderer.render_to_texture(&gpu, &view);
        assert_eq!(first.quad_count, 3);
        assert_eq!(first.draw_calls, 1);
        assert_eq!(first.atlas_rebinds, 0);

        // Nine 10x10 glyphs fill a 32x32 atlas; the tenth grows it.
        let quads = atlas
            .normalized_quads(NdcRect::FULL, (320, 40), "abcdefghij")
            .unwrap();
        assert!(atlas.surface().height() > 32);
        renderer.prepare(&gpu, atlas.surface(), &quads);
        let second = renderer.render_to_texture(&gpu, &view);
        assert_eq!(second.quad_count, 10);
        assert_eq!(second.atlas_rebinds, 1);
        assert_eq!(
            renderer.text_pipeline().bound_handle(),
            Some(atlas.surface().handle())
        );
    }
}
