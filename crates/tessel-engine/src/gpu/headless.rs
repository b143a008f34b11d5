use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::coords::Viewport;

use super::{
    BufferKind, CompiledProgram, DrawCall, GpuBackend, GpuError, HandleKind, RawHandle, SamplerState, TextureRegion,
    VertexLayout,
};

/// One call received by a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer(RawHandle, BufferKind, usize),
    WriteBuffer(RawHandle, u64, usize),
    CreateTexture(RawHandle, u32, u32),
    WriteTexture(RawHandle, TextureRegion),
    SetSampler(RawHandle, SamplerState),
    CreateProgram(RawHandle, String),
    CreateVertexArray(RawHandle, RawHandle, RawHandle),
    Bind(HandleKind, RawHandle),
    Release(HandleKind, RawHandle),
    BeginFrame(Viewport),
    Draw(RawHandle, RawHandle),
}

#[derive(Debug, Default)]
struct Recording {
    next: u64,
    calls: Vec<BackendCall>,
    draws: Vec<DrawCall>,
    buffers: HashMap<RawHandle, Vec<u8>>,
    textures: HashMap<RawHandle, (u32, u32, Vec<u8>)>,
    vertex_arrays: HashMap<RawHandle, VertexLayout>,
    releases: HashMap<RawHandle, usize>,
}

/// A backend that talks to no GPU and records everything it is asked to do.
///
/// Buffers and textures keep their bytes so tests can read uploads back.
/// Inspect through the [`HeadlessProbe`] obtained before handing the backend
/// to a `GraphicsDevice`.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    rec: Rc<RefCell<Recording>>,
}

/// Read side of a [`HeadlessBackend`].
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    rec: Rc<RefCell<Recording>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe { rec: Rc::clone(&self.rec) }
    }

    fn issue(&self) -> RawHandle {
        let mut rec = self.rec.borrow_mut();
        rec.next += 1;
        RawHandle::new(rec.next)
    }

    fn record(&self, call: BackendCall) {
        self.rec.borrow_mut().calls.push(call);
    }
}

impl GpuBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<RawHandle, GpuError> {
        let handle = self.issue();
        self.rec.borrow_mut().buffers.insert(handle, contents.to_vec());
        self.record(BackendCall::CreateBuffer(handle, kind, contents.len()));
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        {
            let mut rec = self.rec.borrow_mut();
            let bytes = rec
                .buffers
                .get_mut(&buffer)
                .ok_or(GpuError::UnknownHandle(HandleKind::Buffer, buffer.get()))?;
            let at = offset as usize;
            bytes[at..at + data.len()].copy_from_slice(data);
        }
        self.record(BackendCall::WriteBuffer(buffer, offset, data.len()));
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32, _sampler: SamplerState) -> Result<RawHandle, GpuError> {
        let handle = self.issue();
        let pixels = vec![0; width as usize * height as usize * 4];
        self.rec.borrow_mut().textures.insert(handle, (width, height, pixels));
        self.record(BackendCall::CreateTexture(handle, width, height));
        Ok(handle)
    }

    fn write_texture(&mut self, texture: RawHandle, region: TextureRegion, pixels: &[u8]) -> Result<(), GpuError> {
        {
            let mut rec = self.rec.borrow_mut();
            let (width, _, dst) = rec
                .textures
                .get_mut(&texture)
                .ok_or(GpuError::UnknownHandle(HandleKind::Texture, texture.get()))?;
            let row_bytes = region.width as usize * 4;
            for row in 0..region.height as usize {
                let src = &pixels[row * row_bytes..(row + 1) * row_bytes];
                let start = ((region.y as usize + row) * *width as usize + region.x as usize) * 4;
                dst[start..start + row_bytes].copy_from_slice(src);
            }
        }
        self.record(BackendCall::WriteTexture(texture, region));
        Ok(())
    }

    fn set_sampler(&mut self, texture: RawHandle, sampler: SamplerState) -> Result<(), GpuError> {
        self.record(BackendCall::SetSampler(texture, sampler));
        Ok(())
    }

    fn create_program(&mut self, program: &CompiledProgram) -> Result<RawHandle, GpuError> {
        let handle = self.issue();
        self.record(BackendCall::CreateProgram(handle, program.label.clone()));
        Ok(handle)
    }

    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
        vertices: RawHandle,
        indices: RawHandle,
    ) -> Result<RawHandle, GpuError> {
        let handle = self.issue();
        self.rec.borrow_mut().vertex_arrays.insert(handle, layout.clone());
        self.record(BackendCall::CreateVertexArray(handle, vertices, indices));
        Ok(handle)
    }

    fn bind(&mut self, kind: HandleKind, handle: RawHandle) {
        self.record(BackendCall::Bind(kind, handle));
    }

    fn release(&mut self, kind: HandleKind, handle: RawHandle) {
        {
            let mut rec = self.rec.borrow_mut();
            *rec.releases.entry(handle).or_default() += 1;
            rec.buffers.remove(&handle);
            rec.textures.remove(&handle);
            rec.vertex_arrays.remove(&handle);
        }
        self.record(BackendCall::Release(kind, handle));
    }

    fn begin_frame(&mut self, viewport: Viewport) {
        self.rec.borrow_mut().draws.clear();
        self.record(BackendCall::BeginFrame(viewport));
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), GpuError> {
        self.record(BackendCall::Draw(call.program, call.vertex_array));
        self.rec.borrow_mut().draws.push(call);
        Ok(())
    }
}

impl HeadlessProbe {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.rec.borrow().calls.clone()
    }

    /// Draws recorded since the last `begin_frame`, in submission order.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.rec.borrow().draws.clone()
    }

    pub fn buffer_contents(&self, buffer: RawHandle) -> Option<Vec<u8>> {
        self.rec.borrow().buffers.get(&buffer).cloned()
    }

    /// RGBA8 contents of a live texture.
    pub fn texture_pixels(&self, texture: RawHandle) -> Option<Vec<u8>> {
        self.rec.borrow().textures.get(&texture).map(|(_, _, p)| p.clone())
    }

    pub fn vertex_array_layout(&self, vertex_array: RawHandle) -> Option<VertexLayout> {
        self.rec.borrow().vertex_arrays.get(&vertex_array).cloned()
    }

    /// How many times `handle` has been released (anything but 0 or 1 is a bug).
    pub fn release_count(&self, handle: RawHandle) -> usize {
        self.rec.borrow().releases.get(&handle).copied().unwrap_or(0)
    }

    pub fn bind_count(&self, kind: HandleKind) -> usize {
        self.rec
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Bind(k, _) if *k == kind))
            .count()
    }

    pub fn clear_calls(&self) {
        self.rec.borrow_mut().calls.clear();
    }
}
