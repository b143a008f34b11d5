use std::collections::HashMap;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::render::pass::{logical_clip_to_scissor, premul_alpha_blend, triangle_list};
use crate::render::{RenderCtx, RenderTarget};

use super::{
    BufferKind, CompiledProgram, DrawCall, FilterMode, GpuBackend, GpuError, HandleKind, ProgramLayout, RawHandle,
    SamplerState, ScalarType, TextureRegion, VertexAttribute, VertexLayout, WrapMode,
};

// ── resource tables ───────────────────────────────────────────────────────

struct BufferEntry {
    buffer: wgpu::Buffer,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

struct ProgramEntry {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vs_entry: String,
    fs_entry: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    layout: ProgramLayout,
}

struct VertexArrayEntry {
    layout: VertexLayout,
    vertices: RawHandle,
    indices: RawHandle,
}

/// Bind groups only depend on the program and which textures fill its slots;
/// uniforms come in through a dynamic offset into the shared ring.
#[derive(Clone, PartialEq, Eq, Hash)]
struct BindKey {
    program: RawHandle,
    textures: Vec<Option<RawHandle>>,
}

// ── backend ───────────────────────────────────────────────────────────────

/// wgpu implementation of [`GpuBackend`].
///
/// Draws are recorded during the frame and encoded in one render pass by
/// `encode_frame`, after the frame's clear pass. Pipelines are created lazily
/// per (program, vertex layout); every draw's uniform block is copied into a
/// shared ring buffer and addressed with a dynamic offset.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    next: u64,

    buffers: HashMap<RawHandle, BufferEntry>,
    textures: HashMap<RawHandle, TextureEntry>,
    programs: HashMap<RawHandle, ProgramEntry>,
    vertex_arrays: HashMap<RawHandle, VertexArrayEntry>,

    pipelines: HashMap<(RawHandle, VertexLayout), wgpu::RenderPipeline>,
    bind_groups: HashMap<BindKey, wgpu::BindGroup>,
    fallback: Option<TextureEntry>,
    uniform_ring: Option<wgpu::Buffer>,
    ring_capacity: u64,

    viewport: Viewport,
    pending: Vec<DrawCall>,
}

const MIN_RING_SIZE: u64 = 16 * 1024;

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            surface_format,
            next: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            fallback: None,
            uniform_ring: None,
            ring_capacity: 0,
            viewport: Viewport::default(),
            pending: Vec::new(),
        }
    }

    fn issue(&mut self) -> RawHandle {
        self.next += 1;
        RawHandle::new(self.next)
    }

    fn make_texture(&self, label: &str, width: u32, height: u32, sampler: SamplerState) -> TextureEntry {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.make_sampler(sampler);
        TextureEntry { texture, view, sampler }
    }

    fn make_sampler(&self, state: SamplerState) -> wgpu::Sampler {
        let filter = |f: FilterMode| match f {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let wrap = |w: WrapMode| match w {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        };
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessel sampler"),
            address_mode_u: wrap(state.wrap_u),
            address_mode_v: wrap(state.wrap_v),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter(state.mag_filter),
            min_filter: filter(state.min_filter),
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        })
    }

    fn upload(&self, texture: &wgpu::Texture, region: TextureRegion, pixels: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: region.x, y: region.y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * 4),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d { width: region.width, height: region.height, depth_or_array_layers: 1 },
        );
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_fallback(&mut self) {
        if self.fallback.is_some() {
            return;
        }
        let entry = self.make_texture("tessel fallback white", 1, 1, SamplerState::default());
        self.upload(&entry.texture, TextureRegion::full(1, 1), &[255; 4]);
        self.fallback = Some(entry);
    }

    fn ensure_uniform_ring(&mut self, needed: u64) {
        if self.uniform_ring.is_some() && self.ring_capacity >= needed {
            return;
        }
        let size = needed.next_power_of_two().max(MIN_RING_SIZE);
        self.uniform_ring = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessel uniform ring"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.ring_capacity = size;
        // Bind groups reference the old ring.
        self.bind_groups.clear();
        log::debug!("uniform ring grown to {size} bytes");
    }

    fn ensure_pipeline(&mut self, program: RawHandle, vertex_array: RawHandle) -> Result<(RawHandle, VertexLayout), GpuError> {
        let vao = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or(GpuError::UnknownHandle(HandleKind::VertexArray, vertex_array.get()))?;
        let key = (program, vao.layout.clone());
        if self.pipelines.contains_key(&key) {
            return Ok(key);
        }

        let entry = self
            .programs
            .get(&program)
            .ok_or(GpuError::UnknownHandle(HandleKind::Program, program.get()))?;

        let attributes = key
            .1
            .offsets()
            .map(|(attr, offset)| {
                Ok(wgpu::VertexAttribute {
                    format: vertex_format(attr)?,
                    offset: u64::from(offset),
                    shader_location: attr.semantic.location(),
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&entry.label),
            layout: Some(&entry.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &entry.vertex,
                entry_point: Some(&entry.vs_entry),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: u64::from(key.1.stride()),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &entry.fragment,
                entry_point: Some(&entry.fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        log::debug!("pipeline created for `{}` (stride {})", entry.label, key.1.stride());

        self.pipelines.insert(key.clone(), pipeline);
        Ok(key)
    }

    fn ensure_bind_group(&mut self, call: &DrawCall) -> Result<BindKey, GpuError> {
        let key = BindKey {
            program: call.program,
            textures: call.textures.iter().map(|t| t.texture).collect(),
        };
        if self.bind_groups.contains_key(&key) {
            return Ok(key);
        }

        let program = self
            .programs
            .get(&call.program)
            .ok_or(GpuError::UnknownHandle(HandleKind::Program, call.program.get()))?;

        let mut entries = Vec::new();
        if let Some(block) = &program.layout.uniforms {
            let ring = self
                .uniform_ring
                .as_ref()
                .ok_or_else(|| GpuError::Backend("uniform ring not allocated".into()))?;
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: ring,
                    offset: 0,
                    size: NonZeroU64::new(u64::from(block.size)),
                }),
            });
        }
        for slot in &call.textures {
            let bound = slot.texture.and_then(|h| self.textures.get(&h));
            if slot.texture.is_some() && bound.is_none() {
                log::warn!("program `{}` samples a released texture; using white", program.label);
            }
            let texture = bound
                .or(self.fallback.as_ref())
                .ok_or_else(|| GpuError::Backend("fallback texture not allocated".into()))?;
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            if let Some(binding) = slot.sampler_binding {
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                });
            }
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.label),
            layout: &program.bind_group_layout,
            entries: &entries,
        });
        self.bind_groups.insert(key.clone(), bind_group);
        Ok(key)
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<RawHandle, GpuError> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
            BufferKind::Storage => wgpu::BufferUsages::STORAGE,
        } | wgpu::BufferUsages::COPY_DST;

        let handle = self.issue();
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel buffer"),
            contents,
            usage,
        });
        self.buffers.insert(handle, BufferEntry { buffer });
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let entry = self
            .buffers
            .get(&buffer)
            .ok_or(GpuError::UnknownHandle(HandleKind::Buffer, buffer.get()))?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GpuError::Backend(format!(
                "buffer writes must be {}-byte aligned (offset {offset}, len {})",
                wgpu::COPY_BUFFER_ALIGNMENT,
                data.len()
            )));
        }
        self.queue.write_buffer(&entry.buffer, offset, data);
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32, sampler: SamplerState) -> Result<RawHandle, GpuError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(GpuError::Backend(format!("{width}x{height} texture exceeds the {max}px limit")));
        }
        let handle = self.issue();
        let entry = self.make_texture("tessel texture", width, height, sampler);
        self.textures.insert(handle, entry);
        Ok(handle)
    }

    fn write_texture(&mut self, texture: RawHandle, region: TextureRegion, pixels: &[u8]) -> Result<(), GpuError> {
        let entry = self
            .textures
            .get(&texture)
            .ok_or(GpuError::UnknownHandle(HandleKind::Texture, texture.get()))?;
        self.upload(&entry.texture, region, pixels);
        Ok(())
    }

    fn set_sampler(&mut self, texture: RawHandle, sampler: SamplerState) -> Result<(), GpuError> {
        let new_sampler = self.make_sampler(sampler);
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownHandle(HandleKind::Texture, texture.get()))?;
        entry.sampler = new_sampler;
        self.bind_groups.retain(|k, _| !k.textures.contains(&Some(texture)));
        Ok(())
    }

    fn create_program(&mut self, program: &CompiledProgram) -> Result<RawHandle, GpuError> {
        let module = |stage: &str, source: &str| {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{} {stage}", program.label)),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let vertex = module("vs", &program.vertex.source);
        let fragment = module("fs", &program.fragment.source);

        let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let mut entries = Vec::new();
        if let Some(block) = &program.layout.uniforms {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(u64::from(block.size)),
                },
                count: None,
            });
        }
        for slot in &program.layout.textures {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            if let Some(binding) = slot.sampler_binding {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&program.label),
            entries: &entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&program.label),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let handle = self.issue();
        self.programs.insert(
            handle,
            ProgramEntry {
                label: program.label.clone(),
                vertex,
                fragment,
                vs_entry: program.vertex.entry_point.clone(),
                fs_entry: program.fragment.entry_point.clone(),
                bind_group_layout,
                pipeline_layout,
                layout: program.layout.clone(),
            },
        );
        Ok(handle)
    }

    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
        vertices: RawHandle,
        indices: RawHandle,
    ) -> Result<RawHandle, GpuError> {
        for buffer in [vertices, indices] {
            if !self.buffers.contains_key(&buffer) {
                return Err(GpuError::UnknownHandle(HandleKind::Buffer, buffer.get()));
            }
        }
        for attr in layout.attributes() {
            vertex_format(attr)?;
        }
        let handle = self.issue();
        self.vertex_arrays.insert(handle, VertexArrayEntry { layout: layout.clone(), vertices, indices });
        Ok(handle)
    }

    fn bind(&mut self, kind: HandleKind, handle: RawHandle) {
        // wgpu binds inside the render pass; nothing to do eagerly.
        log::trace!("bind {kind} {}", handle.get());
    }

    fn release(&mut self, kind: HandleKind, handle: RawHandle) {
        match kind {
            HandleKind::Buffer => {
                self.buffers.remove(&handle);
            }
            HandleKind::Texture => {
                self.textures.remove(&handle);
                self.bind_groups.retain(|k, _| !k.textures.contains(&Some(handle)));
            }
            HandleKind::Program => {
                self.programs.remove(&handle);
                self.pipelines.retain(|(p, _), _| *p != handle);
                self.bind_groups.retain(|k, _| k.program != handle);
            }
            HandleKind::VertexArray => {
                self.vertex_arrays.remove(&handle);
            }
        }
    }

    fn begin_frame(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.pending.clear();
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), GpuError> {
        self.pending.push(call);
        Ok(())
    }

    fn encode_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<(), GpuError> {
        let draws = std::mem::take(&mut self.pending);
        if draws.is_empty() {
            return Ok(());
        }

        // Uniform blocks, each at an aligned dynamic offset.
        let align = u64::from(self.device.limits().min_uniform_buffer_offset_alignment);
        let mut blob: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(draws.len());
        for call in &draws {
            if call.uniforms.is_empty() {
                offsets.push(None);
                continue;
            }
            let at = (blob.len() as u64).next_multiple_of(align);
            blob.resize(at as usize, 0);
            blob.extend_from_slice(&call.uniforms);
            offsets.push(Some(at as u32));
        }
        blob.resize((blob.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize, 0);

        self.ensure_uniform_ring(blob.len() as u64);
        self.ensure_fallback();
        if let Some(ring) = &self.uniform_ring {
            if !blob.is_empty() {
                self.queue.write_buffer(ring, 0, &blob);
            }
        }

        let mut prepared = Vec::with_capacity(draws.len());
        for call in &draws {
            let pipeline = self.ensure_pipeline(call.program, call.vertex_array)?;
            let bind_group = self.ensure_bind_group(call)?;
            prepared.push((pipeline, bind_group));
        }

        let viewport = ctx.viewport;
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for ((call, (pipeline_key, bind_key)), offset) in draws.iter().zip(&prepared).zip(&offsets) {
            let Some((x, y, w, h)) = logical_clip_to_scissor(call.scissor, viewport) else {
                continue;
            };
            let (Some(pipeline), Some(bind_group)) = (self.pipelines.get(pipeline_key), self.bind_groups.get(bind_key))
            else {
                continue;
            };
            let Some(vao) = self.vertex_arrays.get(&call.vertex_array) else { continue };
            let (Some(vbo), Some(ibo)) = (self.buffers.get(&vao.vertices), self.buffers.get(&vao.indices)) else {
                log::warn!("vertex array {} refers to a released buffer; skipped", call.vertex_array.get());
                continue;
            };

            rpass.set_pipeline(pipeline);
            match offset {
                Some(offset) => rpass.set_bind_group(0, bind_group, &[*offset]),
                None => rpass.set_bind_group(0, bind_group, &[]),
            }
            rpass.set_vertex_buffer(0, vbo.buffer.slice(..));
            rpass.set_index_buffer(ibo.buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.set_scissor_rect(x, y, w, h);
            rpass.draw_indexed(0..call.index_count, 0, 0..1);
        }

        Ok(())
    }
}

fn vertex_format(attr: &VertexAttribute) -> Result<wgpu::VertexFormat, GpuError> {
    use wgpu::VertexFormat as F;
    let format = match (attr.scalar, attr.count, attr.normalized) {
        (ScalarType::F32, 1, _) => Some(F::Float32),
        (ScalarType::F32, 2, _) => Some(F::Float32x2),
        (ScalarType::F32, 3, _) => Some(F::Float32x3),
        (ScalarType::F32, 4, _) => Some(F::Float32x4),
        (ScalarType::U8, 2, true) => Some(F::Unorm8x2),
        (ScalarType::U8, 4, true) => Some(F::Unorm8x4),
        (ScalarType::U8, 2, false) => Some(F::Uint8x2),
        (ScalarType::U8, 4, false) => Some(F::Uint8x4),
        (ScalarType::I8, 2, true) => Some(F::Snorm8x2),
        (ScalarType::I8, 4, true) => Some(F::Snorm8x4),
        (ScalarType::I8, 2, false) => Some(F::Sint8x2),
        (ScalarType::I8, 4, false) => Some(F::Sint8x4),
        (ScalarType::U16, 2, true) => Some(F::Unorm16x2),
        (ScalarType::U16, 4, true) => Some(F::Unorm16x4),
        (ScalarType::U16, 2, false) => Some(F::Uint16x2),
        (ScalarType::U16, 4, false) => Some(F::Uint16x4),
        (ScalarType::I16, 2, true) => Some(F::Snorm16x2),
        (ScalarType::I16, 4, true) => Some(F::Snorm16x4),
        (ScalarType::I16, 2, false) => Some(F::Sint16x2),
        (ScalarType::I16, 4, false) => Some(F::Sint16x4),
        (ScalarType::U32, 1, false) => Some(F::Uint32),
        (ScalarType::U32, 2, false) => Some(F::Uint32x2),
        (ScalarType::U32, 3, false) => Some(F::Uint32x3),
        (ScalarType::U32, 4, false) => Some(F::Uint32x4),
        (ScalarType::I32, 1, false) => Some(F::Sint32),
        (ScalarType::I32, 2, false) => Some(F::Sint32x2),
        (ScalarType::I32, 3, false) => Some(F::Sint32x3),
        (ScalarType::I32, 4, false) => Some(F::Sint32x4),
        _ => None,
    };
    format.ok_or(GpuError::UnsupportedVertexFormat {
        count: attr.count,
        scalar: attr.scalar.name(),
        normalized: attr.normalized,
    })
}
