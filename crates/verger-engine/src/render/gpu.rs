use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;

use crate::coords::Mat4;
use crate::device::DEPTH_FORMAT;
use crate::paint::Color;
use crate::scene::RenderState;

use super::backend::{RenderBackend, SpriteVertex, VertexBuffer};
use super::ctx::{RenderCtx, RenderTarget};
use super::texture::{Texture, TextureId, WeakTexture};

const PROJECTION_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;
const STATES: [RenderState; 2] = [RenderState::Sprite, RenderState::Overlay];

// ── resources ─────────────────────────────────────────────────────────────

struct ResidentTexture {
    source: WeakTexture,
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

/// GPU objects that outlive a frame: pipelines per render state, the
/// projection uniform, and uploaded sprite textures.
///
/// Everything is created lazily on first use. Textures stay resident until
/// the last [`Texture`] handle for them is dropped.
#[derive(Default)]
pub struct SpriteResources {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipelines: HashMap<RenderState, wgpu::RenderPipeline>,

    globals_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    projection_ubo: Option<wgpu::Buffer>,
    globals: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,

    textures: HashMap<TextureId, ResidentTexture>,
}

impl SpriteResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures currently uploaded.
    #[inline]
    pub fn resident_textures(&self) -> usize {
        self.textures.len()
    }

    fn prepare(&mut self, ctx: &RenderCtx<'_>) {
        self.ensure_layouts(ctx);
        self.ensure_pipelines(ctx);
        self.ensure_globals(ctx);
        self.ensure_sampler(ctx);

        let before = self.textures.len();
        self.textures.retain(|_, resident| resident.source.is_alive());
        let evicted = before - self.textures.len();
        if evicted > 0 {
            log::debug!("released {evicted} sprite texture(s) from the GPU");
        }
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals_layout.is_some() && self.texture_layout.is_some() {
            return;
        }

        let globals = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("verger sprite globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(PROJECTION_SIZE),
                },
                count: None,
            }],
        });

        let texture = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("verger sprite texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        self.globals_layout = Some(globals);
        self.texture_layout = Some(texture);
        self.pipelines.clear();
        self.globals = None;
        self.textures.clear();
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && !self.pipelines.is_empty() {
            return;
        }
        let Some(globals_layout) = self.globals_layout.as_ref() else { return; };
        let Some(texture_layout) = self.texture_layout.as_ref() else { return; };

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("verger sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("verger sprite pipeline layout"),
            bind_group_layouts: &[globals_layout, texture_layout],
            immediate_size: 0,
        });

        self.pipelines = STATES
            .into_iter()
            .map(|state| (state, create_pipeline(ctx, &shader, &layout, state)))
            .collect();
        self.pipeline_format = Some(ctx.surface_format);
        log::debug!("built sprite pipelines for {:?}", ctx.surface_format);
    }

    fn ensure_globals(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals.is_some() && self.projection_ubo.is_some() {
            return;
        }
        let Some(layout) = self.globals_layout.as_ref() else { return; };

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("verger projection ubo"),
            size: PROJECTION_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("verger sprite globals"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.projection_ubo = Some(ubo);
        self.globals = Some(globals);
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        // Repeat so that sprites with a repeat count tile their texture.
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("verger sprite sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    /// Uploads `texture` on first use and returns its bind group.
    fn ensure_texture(&mut self, ctx: &RenderCtx<'_>, texture: &Texture) -> Option<&wgpu::BindGroup> {
        if !self.textures.contains_key(&texture.id()) {
            let resident = self.upload(ctx, texture)?;
            self.textures.insert(texture.id(), resident);
        }
        self.textures.get(&texture.id()).map(|r| &r.bind_group)
    }

    fn upload(&self, ctx: &RenderCtx<'_>, texture: &Texture) -> Option<ResidentTexture> {
        if !texture.is_valid() {
            return None;
        }
        let layout = self.texture_layout.as_ref()?;
        let sampler = self.sampler.as_ref()?;

        let size = wgpu::Extent3d {
            width: texture.width(),
            height: texture.height(),
            depth_or_array_layers: 1,
        };

        let gpu = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture.name()),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texture.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width()),
                rows_per_image: Some(texture.height()),
            },
            size,
        );

        let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("verger sprite texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        log::debug!(
            "uploaded texture {:?} ({}x{})",
            texture.name(),
            texture.width(),
            texture.height()
        );

        Some(ResidentTexture {
            source: texture.downgrade(),
            bind_group,
            _texture: gpu,
        })
    }
}

fn create_pipeline(
    ctx: &RenderCtx<'_>,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    state: RenderState,
) -> wgpu::RenderPipeline {
    let (label, depth_write_enabled, depth_compare) = match state {
        RenderState::Sprite => ("verger sprite pipeline", true, wgpu::CompareFunction::LessEqual),
        RenderState::Overlay => ("verger overlay pipeline", false, wgpu::CompareFunction::Always),
    };

    ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[SpriteVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: ctx.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            // Negative scale mirrors a sprite; keep both windings.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

// ── backend ───────────────────────────────────────────────────────────────

/// [`RenderBackend`] that records into a frame's command encoder.
///
/// Each draw opens its own render pass that loads the previous contents, so
/// calls land on the target in submission order.
pub struct WgpuBackend<'a> {
    ctx: RenderCtx<'a>,
    target: RenderTarget<'a>,
    resources: &'a mut SpriteResources,
    active: Option<RenderState>,
    warned_inactive: bool,
}

impl<'a> WgpuBackend<'a> {
    pub fn new(ctx: RenderCtx<'a>, target: RenderTarget<'a>, resources: &'a mut SpriteResources) -> Self {
        resources.prepare(&ctx);
        Self {
            ctx,
            target,
            resources,
            active: None,
            warned_inactive: false,
        }
    }

    fn pipeline_state(&mut self) -> RenderState {
        match self.active {
            Some(state) => state,
            None => {
                if !self.warned_inactive {
                    log::debug!("draw with no active render state; using the sprite pipeline");
                    self.warned_inactive = true;
                }
                RenderState::Sprite
            }
        }
    }
}

impl RenderBackend for WgpuBackend<'_> {
    fn clear(&mut self, background: Color) {
        let _rpass = self.target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("verger clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(background.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn set_projection(&mut self, projection: Mat4) {
        let Some(ubo) = self.resources.projection_ubo.as_ref() else { return; };
        self.ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&projection));
    }

    fn activate(&mut self, state: RenderState) {
        self.active = Some(state);
    }

    fn deactivate(&mut self, state: RenderState) {
        if self.active == Some(state) {
            self.active = None;
        }
    }

    fn create_vertex_buffer(&mut self, label: &str, capacity: usize) -> VertexBuffer {
        let size = (capacity.max(1) * std::mem::size_of::<SpriteVertex>()) as u64;
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        VertexBuffer::new(capacity, Some(buffer))
    }

    fn upload_vertices(&mut self, buffer: &VertexBuffer, vertices: &[SpriteVertex]) {
        let Some(gpu) = buffer.gpu() else { return; };
        if vertices.len() > buffer.capacity() {
            log::warn!(
                "vertex upload of {} exceeds buffer capacity {}; skipped",
                vertices.len(),
                buffer.capacity()
            );
            return;
        }
        self.ctx.queue.write_buffer(gpu, 0, bytemuck::cast_slice(vertices));
    }

    fn draw(&mut self, buffer: &VertexBuffer, texture: &Texture, vertices: Range<u32>) {
        if vertices.is_empty() {
            return;
        }
        let Some(gpu) = buffer.gpu() else { return; };

        let state = self.pipeline_state();
        let ctx = self.ctx;
        if self.resources.ensure_texture(&ctx, texture).is_none() {
            return;
        }

        let resources = &*self.resources;
        let Some(pipeline) = resources.pipelines.get(&state) else { return; };
        let Some(globals) = resources.globals.as_ref() else { return; };
        let Some(texture_group) = resources.textures.get(&texture.id()).map(|r| &r.bind_group) else {
            return;
        };

        let mut rpass = self.target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("verger sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, globals, &[]);
        rpass.set_bind_group(1, texture_group, &[]);
        rpass.set_vertex_buffer(0, gpu.slice(..));
        rpass.draw(vertices, 0..1);
    }
}
