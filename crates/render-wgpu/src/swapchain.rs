use crate::convert;
use crate::resource::{ResourceKind, WgpuResource};
use parking_lot::Mutex;
use prism_common::Extent2d;
use prism_gpu::{Format, GpuError, PresentMode, Swapchain};
use std::sync::Arc;

/// A configured surface plus the texture of the frame being rendered.
pub(crate) struct SurfaceTarget {
    surface: Arc<wgpu::Surface<'static>>,
    device: Arc<wgpu::Device>,
    config: Mutex<wgpu::SurfaceConfiguration>,
    frame: Mutex<Option<wgpu::SurfaceTexture>>,
}

impl SurfaceTarget {
    pub(crate) fn new(
        surface: Arc<wgpu::Surface<'static>>,
        device: Arc<wgpu::Device>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(&device, &config);
        Self {
            surface,
            device,
            config: Mutex::new(config),
            frame: Mutex::new(None),
        }
    }

    /// View of the current frame's texture, acquiring it on first use.
    pub(crate) fn acquire_view(&self) -> Result<wgpu::TextureView, GpuError> {
        let mut frame = self.frame.lock();
        let texture = match frame.take() {
            Some(texture) => texture,
            None => self.acquire()?,
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        *frame = Some(texture);
        Ok(view)
    }

    fn acquire(&self) -> Result<wgpu::SurfaceTexture, GpuError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config.lock());
                self.surface
                    .get_current_texture()
                    .map_err(|err| GpuError::Surface(err.to_string()))
            }
            Err(err) => Err(GpuError::Surface(err.to_string())),
        }
    }

    fn present(&self) -> Result<(), GpuError> {
        let pending = self.frame.lock().take();
        let texture = match pending {
            Some(texture) => texture,
            None => self.acquire()?,
        };
        texture.present();
        Ok(())
    }

    fn reconfigure(&self, update: impl FnOnce(&mut wgpu::SurfaceConfiguration)) {
        // an unpresented frame is discarded
        self.frame.lock().take();
        let mut config = self.config.lock();
        update(&mut config);
        self.surface.configure(&self.device, &config);
    }
}

/// Surface presentation with a fixed number of logical back buffers.
///
/// wgpu exposes one surface texture at a time, so the back buffer index is
/// sequential and every index resolves to the texture of the current frame.
pub struct WgpuSwapchain {
    target: Arc<SurfaceTarget>,
    format: Format,
    buffer_count: u32,
    extent: Extent2d,
    index: u32,
    present_mode: PresentMode,
}

impl WgpuSwapchain {
    pub(crate) fn new(
        target: Arc<SurfaceTarget>,
        format: Format,
        buffer_count: u32,
        extent: Extent2d,
        present_mode: PresentMode,
    ) -> Self {
        Self {
            target,
            format,
            buffer_count,
            extent,
            index: 0,
            present_mode,
        }
    }
}

impl Swapchain<crate::Wgpu> for WgpuSwapchain {
    fn format(&self) -> Format {
        self.format
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn extent(&self) -> Extent2d {
        self.extent
    }

    fn back_buffer(&self, index: u32) -> Result<WgpuResource, GpuError> {
        if index >= self.buffer_count {
            return Err(GpuError::call(
                "back_buffer",
                format!("index {index} out of {} buffers", self.buffer_count),
            ));
        }
        Ok(WgpuResource::new(
            format!("back buffer {index}"),
            ResourceKind::BackBuffer {
                index,
                target: Arc::clone(&self.target),
            },
        ))
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.index
    }

    fn present(&mut self, mode: PresentMode) -> Result<(), GpuError> {
        self.target.present()?;
        if mode != self.present_mode {
            tracing::info!(?mode, "switching present mode");
            self.target
                .reconfigure(|config| config.present_mode = convert::present_mode(mode));
            self.present_mode = mode;
        }
        self.index = (self.index + 1) % self.buffer_count;
        Ok(())
    }

    fn resize_buffers(&mut self, extent: Extent2d) -> Result<(), GpuError> {
        let extent = extent.clamped();
        tracing::debug!(width = extent.width, height = extent.height, "resizing surface");
        self.target.reconfigure(|config| {
            config.width = extent.width;
            config.height = extent.height;
        });
        self.extent = extent;
        self.index = 0;
        Ok(())
    }
}
