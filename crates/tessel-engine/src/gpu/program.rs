use std::cell::{Cell, RefCell};

use glam::Mat4;
use thiserror::Error;

use crate::paint::Color;

use super::reflect::{self, ProgramLayout, UniformMember, UniformType};
use super::{GpuError, GraphicsDevice, HandleKind, RawHandle, Texture, TextureBinding};

/// Vertex + fragment WGSL for one program.
///
/// Both stages may come from the same source text; see [`ProgramSource::single`].
#[derive(Debug, Copy, Clone)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

impl<'a> ProgramSource<'a> {
    pub const fn new(label: &'a str, vertex: &'a str, fragment: &'a str) -> Self {
        Self { label, vertex, fragment }
    }

    /// One WGSL module holding both entry points.
    pub const fn single(label: &'a str, source: &'a str) -> Self {
        Self { label, vertex: source, fragment: source }
    }
}

/// A CPU value headed for a uniform member.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4(Mat4),
}

impl UniformValue {
    pub const fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Bool(_) => "bool",
            UniformValue::Int(_) => "i32",
            UniformValue::UInt(_) => "u32",
            UniformValue::Float(_) => "f32",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat4(_) => "mat4",
        }
    }

    /// Bytes for a member of type `ty`, or `None` if the value does not fit it.
    /// WGSL has no host-shareable bool; bools land in integer members as 0/1.
    fn encode(&self, ty: UniformType) -> Option<Vec<u8>> {
        let bytes = |v: &[u8]| Some(v.to_vec());
        match (*self, ty) {
            (UniformValue::Bool(b), UniformType::I32 | UniformType::U32) => bytes(&u32::from(b).to_le_bytes()),
            (UniformValue::Int(v), UniformType::I32) => bytes(&v.to_le_bytes()),
            (UniformValue::Int(v), UniformType::U32) if v >= 0 => bytes(&(v as u32).to_le_bytes()),
            (UniformValue::UInt(v), UniformType::U32) => bytes(&v.to_le_bytes()),
            (UniformValue::Float(v), UniformType::F32) => bytes(&v.to_le_bytes()),
            (UniformValue::Vec2(v), UniformType::Vec2) => bytes(bytemuck::cast_slice(&v)),
            (UniformValue::Vec3(v), UniformType::Vec3) => bytes(bytemuck::cast_slice(&v)),
            (UniformValue::Vec4(v), UniformType::Vec4) => bytes(bytemuck::cast_slice(&v)),
            (UniformValue::Mat4(m), UniformType::Mat4) => bytes(bytemuck::cast_slice(&m.to_cols_array())),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum UniformError {
    #[error("program `{program}` has no uniform named `{name}`")]
    UnknownUniform { program: String, name: String },

    #[error("program `{program}` has no texture slot named `{name}`")]
    UnknownTexture { program: String, name: String },

    #[error("uniform `{name}` is {expected:?}; a {found} value does not fit")]
    TypeMismatch { name: String, expected: UniformType, found: &'static str },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

#[derive(Debug)]
struct Staging {
    uniforms: Vec<u8>,
    textures: Vec<Option<RawHandle>>,
}

/// A linked vertex + fragment program with named uniform setters.
///
/// Uniform values are staged on the CPU and snapshotted into each draw, so a
/// program shared by many materials can be re-set between draws. Shared via
/// `Rc<Program>`; setters take `&self`.
#[derive(Debug)]
pub struct Program {
    handle: RawHandle,
    label: String,
    layout: ProgramLayout,
    staging: RefCell<Staging>,
    disposed: Cell<bool>,
}

impl Program {
    /// Compiles, validates and links `source`.
    ///
    /// Errors carry the compiler diagnostic verbatim. Nothing is created on
    /// the backend unless both stages validate and link.
    pub fn compile(dev: &mut GraphicsDevice, source: &ProgramSource<'_>) -> Result<Self, GpuError> {
        let compiled = reflect::compile(source)?;
        let handle = dev.create_program(&compiled)?;

        let block_size = compiled.layout.uniforms.as_ref().map_or(0, |b| b.size as usize);
        let staging = Staging {
            uniforms: vec![0; block_size],
            textures: vec![None; compiled.layout.textures.len()],
        };
        log::debug!(
            "program `{}` linked: {} uniform members, {} texture slots",
            compiled.label,
            compiled.layout.uniforms.as_ref().map_or(0, |b| b.members.len()),
            compiled.layout.textures.len()
        );

        Ok(Self {
            handle,
            label: compiled.label,
            layout: compiled.layout,
            staging: RefCell::new(staging),
            disposed: Cell::new(false),
        })
    }

    pub fn handle(&self) -> Result<RawHandle, GpuError> {
        if self.disposed.get() { Err(GpuError::Disposed(HandleKind::Program)) } else { Ok(self.handle) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformMember> {
        self.layout.uniforms.as_ref()?.members.iter().find(|m| m.name == name)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform(name).is_some()
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.layout.textures.iter().any(|t| t.name == name)
    }

    pub fn bind(&self, dev: &mut GraphicsDevice) -> Result<(), GpuError> {
        dev.bind(HandleKind::Program, self.handle()?);
        Ok(())
    }

    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<(), UniformError> {
        self.handle()?;
        let member = self.uniform(name).ok_or_else(|| UniformError::UnknownUniform {
            program: self.label.clone(),
            name: name.to_string(),
        })?;
        let bytes = value.encode(member.ty).ok_or_else(|| UniformError::TypeMismatch {
            name: name.to_string(),
            expected: member.ty,
            found: value.type_name(),
        })?;

        let at = member.offset as usize;
        self.staging.borrow_mut().uniforms[at..at + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn set_bool(&self, name: &str, v: bool) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Bool(v))
    }

    pub fn set_int(&self, name: &str, v: i32) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Int(v))
    }

    pub fn set_float(&self, name: &str, v: f32) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Float(v))
    }

    pub fn set_vec4(&self, name: &str, v: [f32; 4]) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Vec4(v))
    }

    pub fn set_color(&self, name: &str, c: Color) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Vec4(c.to_array()))
    }

    pub fn set_matrix(&self, name: &str, m: Mat4) -> Result<(), UniformError> {
        self.set_uniform(name, UniformValue::Mat4(m))
    }

    /// Assigns `texture` to the slot `name` for subsequent draws.
    pub fn set_texture(&self, name: &str, texture: &Texture) -> Result<(), UniformError> {
        self.handle()?;
        let handle = texture.handle()?;
        let index = self.layout.textures.iter().position(|t| t.name == name).ok_or_else(|| {
            UniformError::UnknownTexture { program: self.label.clone(), name: name.to_string() }
        })?;
        self.staging.borrow_mut().textures[index] = Some(handle);
        Ok(())
    }

    /// Current contents of the uniform block.
    pub fn uniform_bytes(&self) -> Vec<u8> {
        self.staging.borrow().uniforms.clone()
    }

    pub(crate) fn texture_bindings(&self) -> Vec<TextureBinding> {
        let staging = self.staging.borrow();
        self.layout
            .textures
            .iter()
            .zip(&staging.textures)
            .map(|(slot, texture)| TextureBinding {
                binding: slot.binding,
                sampler_binding: slot.sampler_binding,
                texture: *texture,
            })
            .collect()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the GPU program. Calling again is a no-op.
    pub fn dispose(&self, dev: &mut GraphicsDevice) {
        if !self.disposed.replace(true) {
            dev.release(HandleKind::Program, self.handle);
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.disposed.get() {
            log::warn!("program `{}` dropped without dispose", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::builtin;

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn compile_error_creates_nothing() {
        let (mut dev, probe) = GraphicsDevice::headless();
        let src = ProgramSource::single("broken", "@vertex fn vs_main( {");
        let err = Program::compile(&mut dev, &src).unwrap_err();

        assert!(matches!(err, GpuError::ShaderCompile { .. }));
        assert!(err.to_string().contains("broken"));
        assert_eq!(dev.live_resources(HandleKind::Program), 0);
        assert!(probe.calls().is_empty());
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn setters_write_at_reflected_offsets() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Program::compile(&mut dev, &builtin::SOLID).unwrap();

        program.set_color("tint", Color::from_premul(0.1, 0.2, 0.3, 0.4)).unwrap();
        program.set_matrix("transform", Mat4::from_scale(glam::Vec3::new(2.0, 3.0, 1.0))).unwrap();

        let bytes = program.uniform_bytes();
        assert_eq!(bytes.len(), 80);
        assert_eq!(f32_at(&bytes, 0), 2.0);
        assert_eq!(f32_at(&bytes, 20), 3.0);
        assert_eq!(f32_at(&bytes, 64), 0.1);
        assert_eq!(f32_at(&bytes, 76), 0.4);
        program.dispose(&mut dev);
    }

    #[test]
    fn unknown_uniform_and_type_mismatch_are_distinct() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Program::compile(&mut dev, &builtin::SOLID).unwrap();

        assert!(matches!(program.set_float("nope", 1.0), Err(UniformError::UnknownUniform { .. })));
        assert!(matches!(
            program.set_float("tint", 1.0),
            Err(UniformError::TypeMismatch { expected: UniformType::Vec4, found: "f32", .. })
        ));
        program.dispose(&mut dev);
    }

    #[test]
    fn bool_lands_in_integer_member() {
        let src = "struct U { flag: u32, level: i32 };
            @group(0) @binding(0) var<uniform> u: U;
            @vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(f32(u.flag)); }
            @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(f32(u.level)); }";
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Program::compile(&mut dev, &ProgramSource::single("flags", src)).unwrap();

        program.set_bool("flag", true).unwrap();
        program.set_int("level", -2).unwrap();
        let bytes = program.uniform_bytes();
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2i32).to_le_bytes());
        program.dispose(&mut dev);
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[test]
    fn texture_slots_feed_draw_bindings() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Program::compile(&mut dev, &builtin::SPRITE).unwrap();
        let tex = Texture::new(&mut dev, 1, 1).unwrap();

        assert!(matches!(program.set_texture("albedo", &tex), Err(UniformError::UnknownTexture { .. })));
        program.set_texture("main_texture", &tex).unwrap();

        let bindings = program.texture_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].binding, 1);
        assert_eq!(bindings[0].sampler_binding, Some(2));
        assert_eq!(bindings[0].texture, Some(tex.handle().unwrap()));

        tex.dispose(&mut dev);
        program.dispose(&mut dev);
    }

    #[test]
    fn disposed_program_rejects_setters() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Program::compile(&mut dev, &builtin::SOLID).unwrap();
        program.dispose(&mut dev);
        program.dispose(&mut dev);
        assert!(matches!(
            program.set_float("tint", 0.0),
            Err(UniformError::Gpu(GpuError::Disposed(HandleKind::Program)))
        ));
        assert_eq!(dev.live_resources(HandleKind::Program), 0);
    }
}
