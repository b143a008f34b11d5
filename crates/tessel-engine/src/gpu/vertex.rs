use super::{BufferKind, Buffer, GpuError, GraphicsDevice, HandleKind, RawHandle};

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    F32,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl ScalarType {
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::F32 | ScalarType::U32 | ScalarType::I32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::F32 => "f32",
            ScalarType::U8 => "u8",
            ScalarType::I8 => "i8",
            ScalarType::U16 => "u16",
            ScalarType::I16 => "i16",
            ScalarType::U32 => "u32",
            ScalarType::I32 => "i32",
        }
    }
}

/// What an attribute feeds. Each semantic has a fixed shader location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Color,
    TexCoord,
}

impl Semantic {
    #[inline]
    pub const fn location(self) -> u32 {
        match self {
            Semantic::Position => 0,
            Semantic::Color => 1,
            Semantic::TexCoord => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub count: u8,
    pub scalar: ScalarType,
    pub normalized: bool,
}

impl VertexAttribute {
    #[inline]
    pub const fn new(semantic: Semantic, count: u8, scalar: ScalarType) -> Self {
        Self { semantic, count, scalar, normalized: false }
    }

    #[inline]
    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    #[inline]
    pub const fn size(&self) -> u32 {
        self.count as u32 * self.scalar.size()
    }
}

/// Ordered attribute list of one interleaved vertex buffer.
///
/// Offsets accumulate in declaration order; the stride is their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn push(&mut self, attribute: VertexAttribute) {
        self.attributes.push(attribute);
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(VertexAttribute::size).sum()
    }

    /// `(attribute, byte offset)` in declaration order.
    pub fn offsets(&self) -> impl Iterator<Item = (&VertexAttribute, u32)> + '_ {
        self.attributes.iter().scan(0u32, |offset, attr| {
            let at = *offset;
            *offset += attr.size();
            Some((attr, at))
        })
    }

    pub fn offset_of(&self, semantic: Semantic) -> Option<u32> {
        self.offsets().find(|(a, _)| a.semantic == semantic).map(|(_, o)| o)
    }

    pub fn has(&self, semantic: Semantic) -> bool {
        self.attributes.iter().any(|a| a.semantic == semantic)
    }

    pub(crate) fn validate(&self) -> Result<(), GpuError> {
        if self.attributes.is_empty() {
            return Err(GpuError::LayoutMismatch("layout has no attributes".into()));
        }
        for (i, a) in self.attributes.iter().enumerate() {
            if a.count == 0 || a.count > 4 {
                return Err(GpuError::LayoutMismatch(format!("{:?} has {} components", a.semantic, a.count)));
            }
            if self.attributes[..i].iter().any(|b| b.semantic == a.semantic) {
                return Err(GpuError::LayoutMismatch(format!("{:?} declared twice", a.semantic)));
            }
        }
        Ok(())
    }
}

/// A vertex buffer + index buffer pair bound to a layout: one draw-call unit.
///
/// Does not own the buffers; dispose them separately.
#[derive(Debug)]
pub struct VertexArray {
    handle: RawHandle,
    layout: VertexLayout,
    index_count: u32,
    disposed: bool,
}

impl VertexArray {
    pub fn new(
        dev: &mut GraphicsDevice,
        layout: VertexLayout,
        vertices: &Buffer,
        indices: &Buffer,
        index_count: u32,
    ) -> Result<Self, GpuError> {
        layout.validate()?;
        for (buffer, expected) in [(vertices, BufferKind::Vertex), (indices, BufferKind::Index)] {
            if buffer.kind() != expected {
                return Err(GpuError::WrongBufferKind { expected, actual: buffer.kind() });
            }
        }

        let stride = u64::from(layout.stride());
        if vertices.len() % stride != 0 {
            return Err(GpuError::LayoutMismatch(format!(
                "vertex buffer of {} bytes is not a multiple of the {stride}-byte stride",
                vertices.len()
            )));
        }
        let needed = u64::from(index_count) * 4;
        if needed > indices.len() {
            return Err(GpuError::OutOfRange {
                kind: HandleKind::Buffer,
                offset: 0,
                len: needed,
                capacity: indices.len(),
            });
        }

        let handle = dev.create_vertex_array(&layout, vertices.handle()?, indices.handle()?)?;
        Ok(Self { handle, layout, index_count, disposed: false })
    }

    pub fn handle(&self) -> Result<RawHandle, GpuError> {
        if self.disposed { Err(GpuError::Disposed(HandleKind::VertexArray)) } else { Ok(self.handle) }
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn bind(&self, dev: &mut GraphicsDevice) -> Result<(), GpuError> {
        dev.bind(HandleKind::VertexArray, self.handle()?);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases the GPU object. Calling again is a no-op.
    pub fn dispose(&mut self, dev: &mut GraphicsDevice) {
        if !std::mem::replace(&mut self.disposed, true) {
            dev.release(HandleKind::VertexArray, self.handle);
        }
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.disposed {
            log::warn!("vertex array {} dropped without dispose", self.handle.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite_layout() -> VertexLayout {
        VertexLayout::new()
            .with(VertexAttribute::new(Semantic::Position, 2, ScalarType::F32))
            .with(VertexAttribute::new(Semantic::Color, 4, ScalarType::U8).normalized())
            .with(VertexAttribute::new(Semantic::TexCoord, 2, ScalarType::F32))
    }

    #[test]
    fn offsets_accumulate_in_declaration_order() {
        let layout = sprite_layout();
        let offsets: Vec<u32> = layout.offsets().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
        assert_eq!(layout.stride(), 20);
        assert_eq!(layout.offset_of(Semantic::TexCoord), Some(12));
    }

    #[test]
    fn duplicate_semantic_is_rejected() {
        let layout = VertexLayout::new()
            .with(VertexAttribute::new(Semantic::Position, 2, ScalarType::F32))
            .with(VertexAttribute::new(Semantic::Position, 3, ScalarType::F32));
        assert!(matches!(layout.validate(), Err(GpuError::LayoutMismatch(_))));
    }

    #[test]
    fn vertex_array_checks_buffer_kinds_and_stride() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let layout = VertexLayout::new().with(VertexAttribute::new(Semantic::Position, 2, ScalarType::F32));

        let mut vbo = Buffer::new(&mut dev, BufferKind::Vertex, &[0u8; 24]).unwrap();
        let mut ibo = Buffer::new(&mut dev, BufferKind::Index, &[0u8; 12]).unwrap();

        let swapped = VertexArray::new(&mut dev, layout.clone(), &ibo, &vbo, 3);
        assert!(matches!(swapped, Err(GpuError::WrongBufferKind { .. })));

        let too_many = VertexArray::new(&mut dev, layout.clone(), &vbo, &ibo, 4);
        assert!(matches!(too_many, Err(GpuError::OutOfRange { .. })));

        let mut vao = VertexArray::new(&mut dev, layout, &vbo, &ibo, 3).unwrap();
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 1);

        vao.dispose(&mut dev);
        vao.dispose(&mut dev);
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 0);
        assert!(matches!(vao.handle(), Err(GpuError::Disposed(HandleKind::VertexArray))));

        vbo.dispose(&mut dev);
        ibo.dispose(&mut dev);
    }
}
