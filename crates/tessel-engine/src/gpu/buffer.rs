use super::{BufferKind, GpuError, GraphicsDevice, HandleKind, RawHandle};

/// Owning wrapper around one GPU buffer.
#[derive(Debug)]
pub struct Buffer {
    handle: RawHandle,
    kind: BufferKind,
    len: u64,
    disposed: bool,
}

impl Buffer {
    /// Creates a buffer sized and filled from `contents`.
    pub fn new(dev: &mut GraphicsDevice, kind: BufferKind, contents: &[u8]) -> Result<Self, GpuError> {
        let handle = dev.create_buffer(kind, contents)?;
        Ok(Self { handle, kind, len: contents.len() as u64, disposed: false })
    }

    pub fn handle(&self) -> Result<RawHandle, GpuError> {
        if self.disposed { Err(GpuError::Disposed(HandleKind::Buffer)) } else { Ok(self.handle) }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bind(&self, dev: &mut GraphicsDevice) -> Result<(), GpuError> {
        dev.bind(HandleKind::Buffer, self.handle()?);
        Ok(())
    }

    /// Overwrites `data.len()` bytes starting at `offset`.
    pub fn update(&mut self, dev: &mut GraphicsDevice, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let handle = self.handle()?;
        let len = data.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(GpuError::OutOfRange { kind: HandleKind::Buffer, offset, len, capacity: self.len });
        }
        dev.bind(HandleKind::Buffer, handle);
        dev.write_buffer(handle, offset, data)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases the GPU buffer. Calling again is a no-op.
    pub fn dispose(&mut self, dev: &mut GraphicsDevice) {
        if !std::mem::replace(&mut self.disposed, true) {
            dev.release(HandleKind::Buffer, self.handle);
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.disposed {
            log::warn!("{:?} buffer {} dropped without dispose", self.kind, self.handle.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_writes_within_range() {
        let (mut dev, probe) = GraphicsDevice::headless();
        let mut buf = Buffer::new(&mut dev, BufferKind::Uniform, &[0u8; 8]).unwrap();
        buf.update(&mut dev, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(probe.buffer_contents(buf.handle().unwrap()).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        buf.dispose(&mut dev);
    }

    #[test]
    fn update_past_the_end_fails() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut buf = Buffer::new(&mut dev, BufferKind::Vertex, &[0u8; 8]).unwrap();
        let err = buf.update(&mut dev, 6, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, GpuError::OutOfRange { offset: 6, len: 4, capacity: 8, .. }));
        buf.dispose(&mut dev);
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_use() {
        let (mut dev, probe) = GraphicsDevice::headless();
        let mut buf = Buffer::new(&mut dev, BufferKind::Index, &[0u8; 4]).unwrap();
        let raw = buf.handle().unwrap();

        buf.dispose(&mut dev);
        buf.dispose(&mut dev);

        assert_eq!(probe.release_count(raw), 1);
        assert_eq!(dev.live_resources(HandleKind::Buffer), 0);
        assert!(matches!(buf.update(&mut dev, 0, &[0]), Err(GpuError::Disposed(HandleKind::Buffer))));
    }
}
