use std::cell::Cell;

use super::{FilterMode, GpuError, GraphicsDevice, HandleKind, RawHandle, SamplerState, TextureRegion, WrapMode};

/// A 2D RGBA8 image on the GPU.
///
/// Methods take `&self` so one texture can be shared (`Rc<Texture>`) by
/// several materials and font bitmaps.
#[derive(Debug)]
pub struct Texture {
    handle: RawHandle,
    width: u32,
    height: u32,
    sampler: Cell<SamplerState>,
    disposed: Cell<bool>,
}

impl Texture {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Allocates an uninitialized (transparent) texture.
    pub fn new(dev: &mut GraphicsDevice, width: u32, height: u32) -> Result<Self, GpuError> {
        Self::with_sampler(dev, width, height, SamplerState::default())
    }

    pub fn with_sampler(
        dev: &mut GraphicsDevice,
        width: u32,
        height: u32,
        sampler: SamplerState,
    ) -> Result<Self, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::RegionOutOfBounds {
                region: TextureRegion::full(width, height),
                width,
                height,
            });
        }
        let handle = dev.create_texture(width, height, sampler)?;
        Ok(Self { handle, width, height, sampler: Cell::new(sampler), disposed: Cell::new(false) })
    }

    /// Allocates and fills from tightly packed straight-alpha RGBA8.
    pub fn from_rgba(dev: &mut GraphicsDevice, width: u32, height: u32, pixels: &[u8]) -> Result<Self, GpuError> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(GpuError::PixelDataSize { expected, actual: pixels.len() });
        }
        let texture = Self::new(dev, width, height)?;
        if let Err(e) = texture.upload(dev, pixels) {
            texture.dispose(dev);
            return Err(e);
        }
        Ok(texture)
    }

    pub fn handle(&self) -> Result<RawHandle, GpuError> {
        if self.disposed.get() { Err(GpuError::Disposed(HandleKind::Texture)) } else { Ok(self.handle) }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sampler(&self) -> SamplerState {
        self.sampler.get()
    }

    pub fn bind(&self, dev: &mut GraphicsDevice) -> Result<RawHandle, GpuError> {
        let handle = self.handle()?;
        dev.bind(HandleKind::Texture, handle);
        Ok(handle)
    }

    /// Replaces the whole image.
    pub fn upload(&self, dev: &mut GraphicsDevice, pixels: &[u8]) -> Result<(), GpuError> {
        self.upload_region(dev, TextureRegion::full(self.width, self.height), pixels)
    }

    /// Replaces the texels inside `region`; `pixels` covers exactly the region.
    pub fn upload_region(&self, dev: &mut GraphicsDevice, region: TextureRegion, pixels: &[u8]) -> Result<(), GpuError> {
        if !region.fits(self.width, self.height) {
            return Err(GpuError::RegionOutOfBounds { region, width: self.width, height: self.height });
        }
        let expected = region.width as usize * region.height as usize * Self::BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(GpuError::PixelDataSize { expected, actual: pixels.len() });
        }
        let handle = self.bind(dev)?;
        dev.write_texture(handle, region, pixels)
    }

    pub fn set_filter(&self, dev: &mut GraphicsDevice, min: FilterMode, mag: FilterMode) -> Result<(), GpuError> {
        self.set_sampler(dev, SamplerState { min_filter: min, mag_filter: mag, ..self.sampler.get() })
    }

    pub fn set_wrap(&self, dev: &mut GraphicsDevice, u: WrapMode, v: WrapMode) -> Result<(), GpuError> {
        self.set_sampler(dev, SamplerState { wrap_u: u, wrap_v: v, ..self.sampler.get() })
    }

    fn set_sampler(&self, dev: &mut GraphicsDevice, sampler: SamplerState) -> Result<(), GpuError> {
        let handle = self.bind(dev)?;
        dev.set_sampler(handle, sampler)?;
        self.sampler.set(sampler);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the GPU texture. Calling again is a no-op.
    pub fn dispose(&self, dev: &mut GraphicsDevice) {
        if !self.disposed.replace(true) {
            dev.release(HandleKind::Texture, self.handle);
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.disposed.get() {
            log::warn!("texture {} ({}x{}) dropped without dispose", self.handle.get(), self.width, self.height);
        }
    }
}
