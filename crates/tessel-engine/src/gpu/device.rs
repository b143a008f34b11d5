use anyhow::Context;

use crate::coords::{Rect, Viewport};
use crate::render::{RenderCtx, RenderTarget};

use super::handle::BindCache;
use super::queue::CommandQueue;
use super::{
    BindStats, BufferKind, CommandSender, CompiledProgram, DrawCall, GpuBackend, GpuError, HandleKind,
    HeadlessBackend, HeadlessProbe, Program, RawHandle, SamplerState, TextureRegion, VertexArray, VertexLayout,
};

/// Single-threaded owner of the graphics backend.
///
/// Every resource wrapper creates, binds, writes and releases through a
/// `&mut GraphicsDevice`. The device elides redundant binds, counts live
/// resources per kind and owns the deferred command queue that other threads
/// feed through [`CommandSender`].
pub struct GraphicsDevice {
    backend: Box<dyn GpuBackend>,
    binds: BindCache,
    live: [usize; 4],
    commands: CommandQueue,
    viewport: Viewport,
    frame_draws: u32,
}

impl GraphicsDevice {
    pub fn new(backend: impl GpuBackend + 'static) -> Self {
        log::debug!("graphics device on `{}` backend", backend.name());
        Self {
            backend: Box::new(backend),
            binds: BindCache::default(),
            live: [0; 4],
            commands: CommandQueue::default(),
            viewport: Viewport::default(),
            frame_draws: 0,
        }
    }

    /// A device over a recording backend, plus the probe to inspect it.
    pub fn headless() -> (Self, HeadlessProbe) {
        let backend = HeadlessBackend::new();
        let probe = backend.probe();
        (Self::new(backend), probe)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn bind_stats(&self) -> BindStats {
        self.binds.stats()
    }

    pub fn bound(&self, kind: HandleKind) -> Option<RawHandle> {
        self.binds.bound(kind)
    }

    pub fn live_resources(&self, kind: HandleKind) -> usize {
        self.live[kind.slot()]
    }

    /// Draws recorded since the last `begin_frame`.
    pub fn frame_draws(&self) -> u32 {
        self.frame_draws
    }

    // ── deferred commands ─────────────────────────────────────────────────

    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending()
    }

    /// Runs every command queued before this call, in FIFO order.
    ///
    /// Commands enqueued while draining (including by a running command) wait
    /// for the next drain. The first failure stops the drain; the commands
    /// behind it stay queued ahead of newer ones.
    pub fn drain_commands(&mut self) -> anyhow::Result<usize> {
        let mut batch = self.commands.take_batch();
        let mut ran = 0;
        while let Some(command) = batch.pop_front() {
            if let Err(err) = command(self) {
                let left = batch.len();
                self.commands.requeue_front(batch);
                return Err(err).with_context(|| {
                    format!("deferred GPU command #{ran} failed; {left} left queued")
                });
            }
            ran += 1;
        }
        if ran > 0 {
            log::trace!("drained {ran} deferred GPU commands");
        }
        Ok(ran)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    pub fn begin_frame(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.frame_draws = 0;
        self.backend.begin_frame(viewport);
    }

    /// Records one indexed draw of `vertex_array` with `program`'s current
    /// uniforms and textures.
    pub fn draw(&mut self, program: &Program, vertex_array: &VertexArray, scissor: Option<Rect>) -> Result<(), GpuError> {
        let program_handle = program.handle()?;
        let vao_handle = vertex_array.handle()?;

        let inputs = &program.layout().vertex_inputs;
        if let Some(missing) = inputs
            .iter()
            .find(|loc| !vertex_array.layout().attributes().iter().any(|a| a.semantic.location() == **loc))
        {
            return Err(GpuError::LayoutMismatch(format!(
                "program `{}` reads @location({missing}) which the vertex layout does not provide",
                program.label()
            )));
        }

        self.bind(HandleKind::Program, program_handle);
        self.bind(HandleKind::VertexArray, vao_handle);
        let textures = program.texture_bindings();
        for texture in textures.iter().filter_map(|t| t.texture) {
            self.bind(HandleKind::Texture, texture);
        }

        self.backend.draw(DrawCall {
            program: program_handle,
            vertex_array: vao_handle,
            index_count: vertex_array.index_count(),
            uniforms: program.uniform_bytes(),
            textures,
            scissor,
        })?;
        self.frame_draws += 1;
        Ok(())
    }

    /// Encodes the recorded frame into `target` (no-op on headless backends).
    pub fn encode_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<(), GpuError> {
        self.backend.encode_frame(ctx, target)
    }

    // ── resource plumbing for the wrappers ────────────────────────────────

    pub(crate) fn bind(&mut self, kind: HandleKind, handle: RawHandle) {
        if self.binds.bind(kind, handle) {
            self.backend.bind(kind, handle);
        }
    }

    fn created(&mut self, kind: HandleKind, handle: RawHandle) -> RawHandle {
        self.live[kind.slot()] += 1;
        log::trace!("created {kind} {}", handle.get());
        handle
    }

    pub(crate) fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<RawHandle, GpuError> {
        let handle = self.backend.create_buffer(kind, contents)?;
        Ok(self.created(HandleKind::Buffer, handle))
    }

    pub(crate) fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        self.backend.write_buffer(buffer, offset, data)
    }

    pub(crate) fn create_texture(&mut self, width: u32, height: u32, sampler: SamplerState) -> Result<RawHandle, GpuError> {
        let handle = self.backend.create_texture(width, height, sampler)?;
        Ok(self.created(HandleKind::Texture, handle))
    }

    pub(crate) fn write_texture(&mut self, texture: RawHandle, region: TextureRegion, pixels: &[u8]) -> Result<(), GpuError> {
        self.backend.write_texture(texture, region, pixels)
    }

    pub(crate) fn set_sampler(&mut self, texture: RawHandle, sampler: SamplerState) -> Result<(), GpuError> {
        self.backend.set_sampler(texture, sampler)
    }

    pub(crate) fn create_program(&mut self, program: &CompiledProgram) -> Result<RawHandle, GpuError> {
        let handle = self.backend.create_program(program)?;
        Ok(self.created(HandleKind::Program, handle))
    }

    pub(crate) fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
        vertices: RawHandle,
        indices: RawHandle,
    ) -> Result<RawHandle, GpuError> {
        let handle = self.backend.create_vertex_array(layout, vertices, indices)?;
        Ok(self.created(HandleKind::VertexArray, handle))
    }

    pub(crate) fn release(&mut self, kind: HandleKind, handle: RawHandle) {
        self.binds.forget(kind, handle);
        self.backend.release(kind, handle);
        let live = &mut self.live[kind.slot()];
        *live = live.saturating_sub(1);
        log::trace!("released {kind} {}", handle.get());
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for kind in HandleKind::ALL {
            let live = self.live[kind.slot()];
            if live > 0 {
                log::warn!("graphics device dropped with {live} live {kind} resource(s)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use crate::gpu::Buffer;

    // ── command queue ─────────────────────────────────────────────────────

    #[test]
    fn drain_runs_commands_from_many_threads_in_per_producer_order() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let log = Arc::new(Mutex::new(Vec::new()));

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let sender = dev.command_sender();
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..25 {
                        let log = Arc::clone(&log);
                        sender.enqueue(move |_dev| {
                            log.lock().unwrap().push((worker, i));
                            Ok(())
                        });
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(dev.pending_commands(), 100);
        assert_eq!(dev.drain_commands().unwrap(), 100);

        let log = log.lock().unwrap();
        for worker in 0..4 {
            let seen: Vec<_> = log.iter().filter(|(w, _)| *w == worker).map(|(_, i)| *i).collect();
            assert_eq!(seen, (0..25).collect::<Vec<_>>());
        }
    }

    #[test]
    fn commands_enqueued_during_drain_wait_for_next_drain() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let sender = dev.command_sender();
        let inner = sender.clone();
        sender.enqueue(move |_dev| {
            inner.enqueue(|_dev| Ok(()));
            Ok(())
        });

        assert_eq!(dev.drain_commands().unwrap(), 1);
        assert_eq!(dev.pending_commands(), 1);
        assert_eq!(dev.drain_commands().unwrap(), 1);
        assert_eq!(dev.pending_commands(), 0);
    }

    #[test]
    fn failing_command_keeps_the_rest_queued_in_order() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let sender = dev.command_sender();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        sender.enqueue(move |_| {
            o.lock().unwrap().push("a");
            Ok(())
        });
        sender.enqueue(|_| anyhow::bail!("upload failed"));
        let o = Arc::clone(&order);
        sender.enqueue(move |_| {
            o.lock().unwrap().push("c");
            Ok(())
        });

        let err = dev.drain_commands().unwrap_err();
        assert!(format!("{err:#}").contains("upload failed"));
        assert_eq!(*order.lock().unwrap(), vec!["a"]);
        assert_eq!(dev.pending_commands(), 1);

        let o = Arc::clone(&order);
        sender.enqueue(move |_| {
            o.lock().unwrap().push("d");
            Ok(())
        });
        assert_eq!(dev.drain_commands().unwrap(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["a", "c", "d"]);
    }

    #[test]
    fn commands_can_create_resources() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let made = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&made);
        dev.command_sender().enqueue(move |dev| {
            let buf = Buffer::new(dev, BufferKind::Vertex, &[0u8; 16])?;
            *slot.lock().unwrap() = Some(buf.handle()?);
            std::mem::forget(buf);
            Ok(())
        });
        dev.drain_commands().unwrap();
        assert!(made.lock().unwrap().is_some());
        assert_eq!(dev.live_resources(HandleKind::Buffer), 1);
    }

    // ── binds ─────────────────────────────────────────────────────────────

    #[test]
    fn devices_do_not_share_bind_state() {
        let (mut a, probe_a) = GraphicsDevice::headless();
        let (mut b, probe_b) = GraphicsDevice::headless();
        let mut buf_a = Buffer::new(&mut a, BufferKind::Vertex, &[0; 4]).unwrap();
        let mut buf_b = Buffer::new(&mut b, BufferKind::Vertex, &[0; 4]).unwrap();

        buf_a.bind(&mut a).unwrap();
        buf_a.bind(&mut a).unwrap();
        buf_b.bind(&mut b).unwrap();

        assert_eq!(a.bind_stats(), BindStats { issued: 1, elided: 1 });
        assert_eq!(b.bind_stats(), BindStats { issued: 1, elided: 0 });
        assert_eq!(probe_a.bind_count(HandleKind::Buffer), 1);
        assert_eq!(probe_b.bind_count(HandleKind::Buffer), 1);

        buf_a.dispose(&mut a);
        buf_b.dispose(&mut b);
    }

    #[test]
    fn release_clears_the_bound_slot() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut buf = Buffer::new(&mut dev, BufferKind::Vertex, &[0; 4]).unwrap();
        buf.bind(&mut dev).unwrap();
        assert!(dev.bound(HandleKind::Buffer).is_some());
        buf.dispose(&mut dev);
        assert_eq!(dev.bound(HandleKind::Buffer), None);
    }
}
