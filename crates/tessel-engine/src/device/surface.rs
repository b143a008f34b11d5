use winit::dpi::PhysicalSize;

use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// A window's swapchain: the wgpu surface, its current configuration and the
/// last drawable size the window reported.
pub(crate) struct WindowSurface<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> WindowSurface<'w> {
    /// Picks format and alpha mode from what the adapter offers and configures
    /// the surface at `size`. `None` if the adapter cannot present at all.
    pub fn configure(
        surface: wgpu::Surface<'w>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        init: &GpuInit,
    ) -> Option<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = pick_format(&caps.formats, init.prefer_srgb)?;
        let alpha_mode = init
            .alpha_mode
            .filter(|m| caps.alpha_modes.contains(m))
            .or_else(|| caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: Vec::new(),
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(device, &config);
        log::debug!("surface {format:?} {}x{} ({alpha_mode:?})", size.width, size.height);
        Some(Self { surface, config, size })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn presentable(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    /// Minimized windows report 0x0; the size is kept but the surface is only
    /// reconfigured once it is drawable again.
    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.size = size;
        if !self.presentable() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(device, &self.config);
    }

    pub fn acquire(&self, device: &wgpu::Device) -> Result<GpuFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("tessel frame") });
        Ok(GpuFrame { surface_texture, view, encoder })
    }

    pub fn recover(&self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.presentable() {
                    self.surface.configure(device, &self.config);
                }
                log::debug!("surface {err:?}, reconfigured");
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => {
                log::error!("surface out of memory");
                SurfaceErrorAction::Fatal
            }
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

/// First sRGB 8-bit format when preferred, otherwise the adapter's first.
fn pick_format(formats: &[wgpu::TextureFormat], prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    let srgb = formats
        .iter()
        .copied()
        .find(|f| matches!(f, wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb));
    match srgb {
        Some(f) if prefer_srgb => Some(f),
        _ => formats.first().copied(),
    }
}
