//! WGSL front end: parse + validate each stage with naga, then read the
//! resource interface the backend and the uniform setters need.

use std::collections::BTreeMap;

use wgpu::naga;
use naga::{AddressSpace, Binding, ScalarKind, TypeInner, VectorSize};

use super::{GpuError, ProgramSource, ShaderStage};

/// Value type of one uniform member.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformType {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Present in the block but not settable from the CPU side.
    Unsupported,
}

impl UniformType {
    pub const fn size(self) -> u32 {
        match self {
            UniformType::F32 | UniformType::I32 | UniformType::U32 => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
            UniformType::Unsupported => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub ty: UniformType,
    pub offset: u32,
}

/// The program's single `var<uniform>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    pub binding: u32,
    pub size: u32,
    pub members: Vec<UniformMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub binding: u32,
    pub sampler_binding: Option<u32>,
}

/// Resource interface of a linked program (bind group 0 only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramLayout {
    pub uniforms: Option<UniformBlock>,
    pub textures: Vec<TextureSlot>,
    /// Sorted `@location`s the vertex entry point reads.
    pub vertex_inputs: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub source: String,
    pub entry_point: String,
}

/// Validated program, ready for `GpuBackend::create_program`.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub label: String,
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub layout: ProgramLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resource {
    Uniform(UniformBlock),
    Texture(String),
    Sampler(String),
}

impl Resource {
    fn name(&self) -> &str {
        match self {
            Resource::Uniform(b) => &b.name,
            Resource::Texture(n) | Resource::Sampler(n) => n,
        }
    }
}

pub(crate) fn compile(source: &ProgramSource<'_>) -> Result<CompiledProgram, GpuError> {
    let label = source.label;
    let vs = parse_stage(label, ShaderStage::Vertex, source.vertex)?;
    let fs = parse_stage(label, ShaderStage::Fragment, source.fragment)?;

    let vs_entry = vs
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex)
        .ok_or_else(|| GpuError::link(label, "vertex source has no @vertex entry point"))?;
    let fs_entry = fs
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Fragment)
        .ok_or_else(|| GpuError::link(label, "fragment source has no @fragment entry point"))?;

    let mut resources = BTreeMap::new();
    merge(label, &mut resources, module_resources(label, &vs)?)?;
    merge(label, &mut resources, module_resources(label, &fs)?)?;

    let mut layout = link(label, resources)?;
    layout.vertex_inputs = vertex_inputs(&vs, vs_entry);

    Ok(CompiledProgram {
        label: label.to_string(),
        vertex: CompiledStage { source: source.vertex.to_string(), entry_point: vs_entry.name.clone() },
        fragment: CompiledStage { source: source.fragment.to_string(), entry_point: fs_entry.name.clone() },
        layout,
    })
}

fn parse_stage(label: &str, stage: ShaderStage, source: &str) -> Result<naga::Module, GpuError> {
    let compile_error = |log: String| GpuError::ShaderCompile { label: label.to_string(), stage, log };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;
    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;
    Ok(module)
}

fn module_resources(label: &str, module: &naga::Module) -> Result<Vec<(u32, Resource)>, GpuError> {
    let mut out = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_else(|| format!("binding{}", rb.binding));
        if rb.group != 0 {
            return Err(GpuError::link(
                label,
                format!("`{name}` is in bind group {}; only group 0 is supported", rb.group),
            ));
        }

        let resource = match (var.space, &module.types[var.ty].inner) {
            (AddressSpace::Uniform, inner) => Resource::Uniform(uniform_block(module, name, rb.binding, inner)),
            (AddressSpace::Handle, TypeInner::Image { .. }) => Resource::Texture(name),
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => Resource::Sampler(name),
            (space, _) => {
                return Err(GpuError::link(label, format!("`{name}` uses unsupported address space {space:?}")));
            }
        };
        out.push((rb.binding, resource));
    }
    Ok(out)
}

fn uniform_block(module: &naga::Module, name: String, binding: u32, inner: &TypeInner) -> UniformBlock {
    match inner {
        TypeInner::Struct { members, span } => UniformBlock {
            name,
            binding,
            size: *span,
            members: members
                .iter()
                .map(|m| UniformMember {
                    name: m.name.clone().unwrap_or_default(),
                    ty: uniform_type(&module.types[m.ty].inner),
                    offset: m.offset,
                })
                .collect(),
        },
        // Bare `var<uniform> x: T` is a one-member block.
        other => {
            let ty = uniform_type(other);
            UniformBlock {
                name: name.clone(),
                binding,
                size: ty.size(),
                members: vec![UniformMember { name, ty, offset: 0 }],
            }
        }
    }
}

fn uniform_type(inner: &TypeInner) -> UniformType {
    let is_f32 = |s: &naga::Scalar| s.kind == ScalarKind::Float && s.width == 4;
    match inner {
        TypeInner::Scalar(s) if s.width == 4 => match s.kind {
            ScalarKind::Float => UniformType::F32,
            ScalarKind::Sint => UniformType::I32,
            ScalarKind::Uint => UniformType::U32,
            _ => UniformType::Unsupported,
        },
        TypeInner::Vector { size, scalar } if is_f32(scalar) => match size {
            VectorSize::Bi => UniformType::Vec2,
            VectorSize::Tri => UniformType::Vec3,
            VectorSize::Quad => UniformType::Vec4,
        },
        TypeInner::Matrix { columns: VectorSize::Quad, rows: VectorSize::Quad, scalar } if is_f32(scalar) => {
            UniformType::Mat4
        }
        _ => UniformType::Unsupported,
    }
}

fn merge(label: &str, into: &mut BTreeMap<u32, Resource>, from: Vec<(u32, Resource)>) -> Result<(), GpuError> {
    for (binding, resource) in from {
        match into.get(&binding) {
            Some(existing) if *existing == resource => {}
            Some(existing) => {
                return Err(GpuError::link(
                    label,
                    format!(
                        "binding {binding} is `{}` in one stage and `{}` in the other",
                        existing.name(),
                        resource.name()
                    ),
                ));
            }
            None => {
                into.insert(binding, resource);
            }
        }
    }
    Ok(())
}

fn link(label: &str, resources: BTreeMap<u32, Resource>) -> Result<ProgramLayout, GpuError> {
    let mut layout = ProgramLayout::default();
    let mut samplers: Vec<(u32, String)> = Vec::new();

    for (binding, resource) in resources {
        match resource {
            Resource::Uniform(block) => {
                if let Some(first) = &layout.uniforms {
                    return Err(GpuError::link(
                        label,
                        format!("two uniform blocks (`{}`, `{}`); only one is supported", first.name, block.name),
                    ));
                }
                layout.uniforms = Some(block);
            }
            Resource::Texture(name) => {
                layout.textures.push(TextureSlot { name, binding, sampler_binding: None });
            }
            Resource::Sampler(name) => samplers.push((binding, name)),
        }
    }

    // `<texture>_sampler` pairs by name, otherwise the sampler right after it.
    for (binding, name) in samplers {
        let by_name = layout
            .textures
            .iter()
            .position(|t| t.sampler_binding.is_none() && format!("{}_sampler", t.name) == name);
        let by_slot = || {
            layout
                .textures
                .iter()
                .position(|t| t.sampler_binding.is_none() && t.binding + 1 == binding)
        };
        let Some(index) = by_name.or_else(by_slot) else {
            return Err(GpuError::link(label, format!("sampler `{name}` is not paired with a texture")));
        };
        layout.textures[index].sampler_binding = Some(binding);
    }

    Ok(layout)
}

fn vertex_inputs(module: &naga::Module, entry: &naga::EntryPoint) -> Vec<u32> {
    let location = |b: &Option<Binding>| match b {
        Some(Binding::Location { location, .. }) => Some(*location),
        _ => None,
    };

    let mut locations = Vec::new();
    for arg in &entry.function.arguments {
        if arg.binding.is_some() {
            locations.extend(location(&arg.binding));
        } else if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
            locations.extend(members.iter().filter_map(|m| location(&m.binding)));
        }
    }
    locations.sort_unstable();
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::builtin;

    #[test]
    fn builtin_sprite_reflects_block_and_texture() {
        let program = compile(&builtin::SPRITE).unwrap();
        let block = program.layout.uniforms.as_ref().unwrap();

        assert_eq!(block.binding, 0);
        assert_eq!(block.size, 80);
        assert_eq!(
            block.members,
            vec![
                UniformMember { name: "transform".into(), ty: UniformType::Mat4, offset: 0 },
                UniformMember { name: "tint".into(), ty: UniformType::Vec4, offset: 64 },
            ]
        );
        assert_eq!(
            program.layout.textures,
            vec![TextureSlot { name: "main_texture".into(), binding: 1, sampler_binding: Some(2) }]
        );
        assert_eq!(program.layout.vertex_inputs, vec![0, 2]);
        assert_eq!(program.vertex.entry_point, "vs_main");
        assert_eq!(program.fragment.entry_point, "fs_main");
    }

    #[test]
    fn every_builtin_compiles() {
        for src in [builtin::SOLID, builtin::SPRITE, builtin::TEXT, builtin::VERTEX_COLOR] {
            compile(&src).unwrap_or_else(|e| panic!("{}: {e}", src.label));
        }
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let bad = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0) +; }";
        let src = ProgramSource::new("broken", bad, builtin::SOLID.fragment);
        match compile(&src) {
            Err(GpuError::ShaderCompile { stage, log, .. }) => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(log.contains("error"), "diagnostic was: {log}");
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn missing_fragment_entry_is_a_link_error() {
        let vs_only = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        let src = ProgramSource::single("vs-only", vs_only);
        assert!(matches!(compile(&src), Err(GpuError::ShaderLink { .. })));
    }

    #[test]
    fn conflicting_bindings_fail_to_link() {
        let vs = "@group(0) @binding(0) var<uniform> a: vec4<f32>;
            @vertex fn vs_main() -> @builtin(position) vec4<f32> { return a; }";
        let fs = "@group(0) @binding(0) var<uniform> b: f32;
            @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(b); }";
        let err = compile(&ProgramSource::new("clash", vs, fs)).unwrap_err();
        assert!(matches!(err, GpuError::ShaderLink { .. }), "{err}");
    }

    #[test]
    fn bare_uniform_is_a_single_member_block() {
        let src = "@group(0) @binding(3) var<uniform> opacity: f32;
            @vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }
            @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(opacity); }";
        let program = compile(&ProgramSource::single("bare", src)).unwrap();
        let block = program.layout.uniforms.unwrap();
        assert_eq!(block.binding, 3);
        assert_eq!(block.members, vec![UniformMember { name: "opacity".into(), ty: UniformType::F32, offset: 0 }]);
        assert_eq!(program.layout.vertex_inputs, vec![0]);
    }
}
