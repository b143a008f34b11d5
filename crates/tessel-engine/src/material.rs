//! Named shader properties bound to one program.

use std::rc::Rc;

use glam::Mat4;
use thiserror::Error;

use crate::coords::Vec2;
use crate::gpu::{GpuError, Program, Texture, UniformError, UniformValue};
use crate::paint::Color;

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("program `{program}` has no uniform or texture named `{name}`")]
    MissingUniform { program: String, name: String },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A value a material can hold.
#[derive(Debug, Clone)]
pub enum MaterialValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Color(Color),
    Matrix(Mat4),
    Texture(Rc<Texture>),
}

impl MaterialValue {
    fn uniform(&self) -> Option<UniformValue> {
        Some(match self {
            MaterialValue::Bool(v) => UniformValue::Bool(*v),
            MaterialValue::Int(v) => UniformValue::Int(*v),
            MaterialValue::Float(v) => UniformValue::Float(*v),
            MaterialValue::Vec2(v) => UniformValue::Vec2(v.to_array()),
            MaterialValue::Vec3(v) => UniformValue::Vec3(*v),
            MaterialValue::Vec4(v) => UniformValue::Vec4(*v),
            MaterialValue::Color(c) => UniformValue::Vec4(c.to_array()),
            MaterialValue::Matrix(m) => UniformValue::Mat4(*m),
            MaterialValue::Texture(_) => return None,
        })
    }
}

impl From<bool> for MaterialValue {
    fn from(v: bool) -> Self {
        MaterialValue::Bool(v)
    }
}

impl From<i32> for MaterialValue {
    fn from(v: i32) -> Self {
        MaterialValue::Int(v)
    }
}

impl From<f32> for MaterialValue {
    fn from(v: f32) -> Self {
        MaterialValue::Float(v)
    }
}

impl From<Vec2> for MaterialValue {
    fn from(v: Vec2) -> Self {
        MaterialValue::Vec2(v)
    }
}

impl From<Color> for MaterialValue {
    fn from(c: Color) -> Self {
        MaterialValue::Color(c)
    }
}

impl From<Mat4> for MaterialValue {
    fn from(m: Mat4) -> Self {
        MaterialValue::Matrix(m)
    }
}

impl From<Rc<Texture>> for MaterialValue {
    fn from(t: Rc<Texture>) -> Self {
        MaterialValue::Texture(t)
    }
}

/// Insertion-ordered property bag applied to its program before each draw.
///
/// Setting an existing name replaces its value in place, keeping its
/// position. Names are checked against the program only in [`Material::apply`].
#[derive(Debug, Clone)]
pub struct Material {
    program: Rc<Program>,
    properties: Vec<(String, MaterialValue)>,
}

impl Material {
    pub fn new(program: Rc<Program>) -> Self {
        Self { program, properties: Vec::new() }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<MaterialValue>) {
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name.to_string(), value)),
        }
    }

    pub fn set_float(&mut self, name: &str, v: f32) {
        self.set_property(name, v);
    }

    pub fn set_color(&mut self, name: &str, c: Color) {
        self.set_property(name, c);
    }

    pub fn set_matrix(&mut self, name: &str, m: Mat4) {
        self.set_property(name, m);
    }

    pub fn set_texture(&mut self, name: &str, texture: Rc<Texture>) {
        self.set_property(name, texture);
    }

    pub fn property(&self, name: &str) -> Option<&MaterialValue> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<MaterialValue> {
        let index = self.properties.iter().position(|(n, _)| n == name)?;
        Some(self.properties.remove(index).1)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &MaterialValue)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn textures(&self) -> impl Iterator<Item = &Rc<Texture>> {
        self.properties.iter().filter_map(|(_, v)| match v {
            MaterialValue::Texture(t) => Some(t),
            _ => None,
        })
    }

    /// Pushes every property into the program, in insertion order.
    ///
    /// Unknown names fail. A value whose type the named slot cannot take is
    /// logged and skipped.
    pub fn apply(&self) -> Result<(), MaterialError> {
        let program = &self.program;
        for (name, value) in &self.properties {
            let is_uniform = program.has_uniform(name);
            let is_texture = program.has_texture(name);
            if !is_uniform && !is_texture {
                return Err(MaterialError::MissingUniform { program: program.label().to_string(), name: name.clone() });
            }

            let result = match (value, value.uniform()) {
                (MaterialValue::Texture(texture), _) if is_texture => program.set_texture(name, texture),
                (_, Some(uniform)) if is_uniform => program.set_uniform(name, uniform),
                _ => {
                    let slot = if is_texture { "texture slot" } else { "uniform" };
                    log::warn!("material on `{}`: {slot} `{name}` cannot take {value:?}; skipped", program.label());
                    continue;
                }
            };

            match result {
                Ok(()) => {}
                Err(UniformError::TypeMismatch { name, expected, found }) => {
                    log::warn!("material on `{}`: `{name}` is {expected:?}, got {found}; skipped", program.label());
                }
                Err(UniformError::Gpu(e)) => return Err(e.into()),
                Err(UniformError::UnknownUniform { program, name } | UniformError::UnknownTexture { program, name }) => {
                    return Err(MaterialError::MissingUniform { program, name });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GraphicsDevice, HandleKind};
    use crate::render::builtin;

    fn sprite(dev: &mut GraphicsDevice) -> Rc<Program> {
        Rc::new(Program::compile(dev, &builtin::SPRITE).unwrap())
    }

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    // ── properties ────────────────────────────────────────────────────────

    #[test]
    fn set_property_replaces_in_place() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut material = Material::new(sprite(&mut dev));
        material.set_float("a", 1.0);
        material.set_float("b", 2.0);
        material.set_float("a", 3.0);

        let names: Vec<_> = material.properties().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(matches!(material.property("a"), Some(MaterialValue::Float(v)) if *v == 3.0));
        assert!(material.remove_property("a").is_some());
        assert!(material.property("a").is_none());
        material.program().dispose(&mut dev);
    }

    // ── apply ─────────────────────────────────────────────────────────────

    #[test]
    fn apply_writes_uniforms_and_textures() {
        let (mut dev, probe) = GraphicsDevice::headless();
        let program = sprite(&mut dev);
        let texture = Rc::new(Texture::from_rgba(&mut dev, 1, 1, &[255; 4]).unwrap());

        let mut material = Material::new(program.clone());
        material.set_color("tint", Color::from_premul(0.5, 0.25, 0.0, 0.5));
        material.set_texture("main_texture", texture.clone());
        material.apply().unwrap();

        assert_eq!(f32_at(&program.uniform_bytes(), 64), 0.5);
        assert_eq!(f32_at(&program.uniform_bytes(), 68), 0.25);

        let mut mesh = crate::mesh::Mesh::quad(crate::coords::Rect::UNIT, crate::coords::Rect::UNIT);
        mesh.apply(&mut dev).unwrap();
        dev.draw(&program, mesh.vertex_array().unwrap(), None).unwrap();
        let draw = probe.draws().pop().unwrap();
        assert_eq!(draw.textures[0].texture, Some(texture.handle().unwrap()));
        assert_eq!(probe.bind_count(HandleKind::Texture), 1);

        mesh.dispose(&mut dev);
        texture.dispose(&mut dev);
        program.dispose(&mut dev);
    }

    #[test]
    fn unknown_name_fails() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut material = Material::new(sprite(&mut dev));
        material.set_float("glow", 1.0);
        let err = material.apply().unwrap_err();
        assert!(matches!(err, MaterialError::MissingUniform { ref name, .. } if name == "glow"));
        material.program().dispose(&mut dev);
    }

    #[test]
    fn mismatched_type_is_skipped() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = sprite(&mut dev);
        let mut material = Material::new(program.clone());
        material.set_float("tint", 1.0);
        material.set_property("main_texture", 2.0f32);
        material.set_float("transform", 3.0);
        material.apply().unwrap();
        assert!(program.uniform_bytes().iter().all(|&b| b == 0));
        program.dispose(&mut dev);
    }
}
