//! Text render pipeline: draws atlas quads as indexed triangles.
//!
//! Quads from [`shelf_text::TextAtlas::normalized_quads`] upload as-is
//! (clip-space positions, `[0, 1]` texture coordinates). The atlas
//! texture is bound through a bind group that must be rebuilt whenever
//! the surface replaces its storage; [`TextPipeline::watch`] subscribes
//! to those notifications and the next [`TextPipeline::prepare`] rebinds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use shelf_text::{AtlasSurface, Quad, StorageHandle};
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBindingType, BufferDescriptor, BufferUsages, ColorTargetState, ColorWrites,
    Device, FilterMode, FragmentState, FrontFace, IndexFormat, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode, PrimitiveState,
    PrimitiveTopology, Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor, Sampler,
    SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderStages, TextureFormat,
    TextureSampleType, TextureViewDimension, VertexState,
};

use crate::surface::WgpuSurface;
use crate::vertex::{quad_indices, vertex_layout, TextUniform, INDICES_PER_QUAD};

/// Maximum quads per draw call.
pub const MAX_QUADS: usize = 16_384;

/// No replacement reported since the last bind.
const NO_REPLACEMENT: u64 = 0;

/// Owns the wgpu pipeline, buffers, and atlas bind group for text.
pub struct TextPipeline {
    pipeline: RenderPipeline,

    vertex_buffer: Buffer,
    index_buffer: Buffer,
    quad_count: u32,

    uniform_buffer: Buffer,
    uniform_bind_group: BindGroup,

    // Atlas texture.
    atlas_bgl: BindGroupLayout,
    atlas_sampler: Sampler,
    atlas_bind_group: Option<BindGroup>,
    bound_handle: Option<StorageHandle>,
    replaced: Arc<AtomicU64>,
    rebinds: u32,
}

impl TextPipeline {
    /// Create the text pipeline and allocate GPU buffers.
    pub fn new(device: &Device, target_format: TextureFormat) -> Self {
        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/text.wgsl").into()),
        });

        // ── Uniform bind group layout (group 0) ─────────────────
        let uniform_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_uniform_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // ── Atlas bind group layout (group 1) ───────────────────
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_atlas_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[vertex_layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: target_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Geometry ────────────────────────────────────────────
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_quads_vb"),
            size: (MAX_QUADS * std::mem::size_of::<Quad>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Index pattern is the same every frame.
        let index_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("text_quads_ib"),
            contents: bytemuck::cast_slice(&quad_indices(MAX_QUADS)),
            usage: BufferUsages::INDEX,
        });

        // ── Uniform ─────────────────────────────────────────────
        let uniform_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("text_uniform_ub"),
            contents: bytemuck::bytes_of(&TextUniform::default()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_uniform_bg"),
            layout: &uniform_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glyph_atlas_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            quad_count: 0,
            uniform_buffer,
            uniform_bind_group,
            atlas_bgl,
            atlas_sampler,
            atlas_bind_group: None,
            bound_handle: None,
            replaced: Arc::new(AtomicU64::new(NO_REPLACEMENT)),
            rebinds: 0,
        }
    }

    // ───────────────────── Atlas binding ──────────────────────────

    /// Subscribe to storage replacement on `surface`.
    ///
    /// The listener only records the new handle; the bind group is
    /// rebuilt on the next `prepare`, after the resize has finished.
    pub fn watch<S: AtlasSurface + ?Sized>(&self, surface: &mut S) {
        let replaced = Arc::clone(&self.replaced);
        surface.on_storage_replaced(Box::new(move |event| {
            replaced.store(event.new.raw(), Ordering::Release);
        }));
    }

    /// (Re)build the atlas bind group from the surface's current texture.
    pub fn bind_atlas(&mut self, device: &Device, surface: &WgpuSurface) {
        let view = surface.create_view();
        self.atlas_bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_atlas_bg"),
            layout: &self.atlas_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.atlas_sampler),
                },
            ],
        }));
        if self.bound_handle.is_some() {
            self.rebinds += 1;
            log::debug!("Rebound text pipeline to atlas {}", surface.handle());
        }
        self.bound_handle = Some(surface.handle());
    }

    /// Whether a storage replacement arrived since the last bind.
    pub fn needs_rebind(&self) -> bool {
        self.atlas_bind_group.is_none()
            || self.replaced.load(Ordering::Acquire) != NO_REPLACEMENT
    }

    // ───────────────────── Upload ─────────────────────────────────

    /// Bind the atlas if needed and upload this frame's quads.
    ///
    /// Returns the number of quads that will be drawn.
    pub fn prepare(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &WgpuSurface,
        quads: &[Quad],
    ) -> u32 {
        if self.replaced.swap(NO_REPLACEMENT, Ordering::AcqRel) != NO_REPLACEMENT
            || self.atlas_bind_group.is_none()
        {
            self.bind_atlas(device, surface);
        }

        let count = quads.len().min(MAX_QUADS);
        if count < quads.len() {
            log::warn!("Dropping {} quads past the per-draw limit", quads.len() - count);
        }
        if count > 0 {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&quads[..count]));
        }
        self.quad_count = count as u32;
        self.quad_count
    }

    /// Upload the color multiplier for this frame.
    pub fn upload_uniform(&self, queue: &Queue, uniform: &TextUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    // ───────────────────── Draw ───────────────────────────────────

    /// Record draw commands into the render pass. One draw call.
    ///
    /// Draws nothing while a storage replacement is pending: the bound
    /// texture may already be destroyed until `prepare` rebinds.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) -> u32 {
        let Some(atlas_bind_group) = &self.atlas_bind_group else {
            return 0;
        };
        if self.quad_count == 0 {
            return 0;
        }
        if self.replaced.load(Ordering::Acquire) != NO_REPLACEMENT {
            log::warn!("Atlas storage replaced since prepare; skipping text draw");
            return 0;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, atlas_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);
        pass.draw_indexed(0..self.quad_count * INDICES_PER_QUAD, 0, 0..1);
        1
    }

    /// Number of quads that will be drawn.
    pub fn quad_count(&self) -> u32 {
        self.quad_count
    }

    /// How many times the atlas bind group was rebuilt after the first bind.
    pub fn rebind_count(&self) -> u32 {
        self.rebinds
    }

    /// Storage the atlas bind group currently points at.
    pub fn bound_handle(&self) -> Option<StorageHandle> {
        self.bound_handle
    }
}

// ===================================================================
// Tests
// ===================================================================
