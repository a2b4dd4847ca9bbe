//! Device, queues, swapchain and the render-target/depth descriptor heaps.
//!
//! # Invariants
//! - A context is initialized from construction until `shutdown`; there is no
//!   way back to initialized without building a new one.
//! - Every queue is drained before the depth buffer or the back buffers are
//!   destroyed, and before the context itself is dropped.
//! - Back buffers are in `Present` whenever no frame is being recorded.

use crate::backend::{
    Adapter, AdapterInfo, Backend, DescriptorHeapKind, Descriptor, Device, Format,
    PresentMode, Queue, QueueKind, Swapchain, SwapchainDesc, TextureDesc,
};
use crate::command::CommandContext;
use crate::descriptor::DescriptorAllocator;
use crate::error::GpuError;
use crate::frame::{FrameOutcome, FrameSync};
use crate::state::{ResourceState, Tracked};
use crate::sync::{CommandQueues, FlushReport};
use prism_common::{Extent2d, Viewport};

pub const DEPTH_FORMAT: Format = Format::D32Float;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextDesc {
    pub extent: Extent2d,
    pub buffer_count: u32,
    pub format: Format,
    pub present_mode: PresentMode,
}

impl Default for ContextDesc {
    fn default() -> Self {
        Self {
            extent: Extent2d::new(1920, 1080),
            buffer_count: 2,
            format: Format::Rgba8UnormSrgb,
            present_mode: PresentMode::Immediate,
        }
    }
}

/// Owner of the device and everything presentation needs.
pub struct GraphicsContext<B: Backend> {
    initialized: bool,
    slots: Vec<CommandContext<B>>,
    back_buffers: Vec<Tracked<B>>,
    rtvs: Vec<Descriptor<B>>,
    depth: Tracked<B>,
    depth_extent: Extent2d,
    dsv: Descriptor<B>,
    rtv_heap: DescriptorAllocator<B>,
    dsv_heap: DescriptorAllocator<B>,
    resource_heap: DescriptorAllocator<B>,
    frame_sync: FrameSync<B>,
    swapchain: B::Swapchain,
    queues: CommandQueues<B>,
    viewport: Viewport,
    render_resolution: Extent2d,
    present_mode: PresentMode,
    info: AdapterInfo,
    device: B::Device,
}

impl<B: Backend> GraphicsContext<B> {
    pub fn new(
        adapter: &B::Adapter,
        surface: &B::Surface,
        desc: &ContextDesc,
    ) -> Result<Self, GpuError> {
        let _span = tracing::info_span!("graphics_context_init").entered();
        debug_assert!(desc.buffer_count >= 2, "swapchain needs at least two buffers");

        let info = adapter.info();
        tracing::info!(adapter = %info.name, backend = %info.backend, "creating device");
        let device = adapter.create_device()?;
        let queues = CommandQueues::new(&device)?;

        let swapchain = device.create_swapchain(
            queues.direct(),
            surface,
            &SwapchainDesc {
                extent: desc.extent.clamped(),
                buffer_count: desc.buffer_count,
                format: desc.format,
                present_mode: desc.present_mode,
            },
        )?;
        let buffer_count = swapchain.buffer_count();
        let extent = swapchain.extent();

        let mut rtv_heap = DescriptorAllocator::new(
            &device,
            "rtv heap",
            DescriptorHeapKind::RenderTarget,
            buffer_count,
            false,
        )?;
        let mut dsv_heap =
            DescriptorAllocator::new(&device, "dsv heap", DescriptorHeapKind::DepthStencil, 1, false)?;
        let resource_heap =
            DescriptorAllocator::new(&device, "resource heap", DescriptorHeapKind::Resource, 1, true)?;

        let rtvs = (0..buffer_count)
            .map(|_| rtv_heap.allocate())
            .collect::<Result<Vec<_>, _>>()?;
        let back_buffers = acquire_back_buffers(&device, &swapchain, &rtvs)?;

        let slots = (0..buffer_count)
            .map(|_| CommandContext::new(&device, QueueKind::Direct))
            .collect::<Result<Vec<_>, _>>()?;
        let frame_sync = FrameSync::new(&device, &swapchain)?;

        let dsv = dsv_heap.allocate()?;
        let depth = create_depth_buffer(&device, extent, &dsv)?;

        tracing::info!(
            buffers = buffer_count,
            width = extent.width,
            height = extent.height,
            "swapchain created"
        );

        Ok(Self {
            initialized: true,
            slots,
            back_buffers,
            rtvs,
            depth,
            depth_extent: extent,
            dsv,
            rtv_heap,
            dsv_heap,
            resource_heap,
            frame_sync,
            swapchain,
            queues,
            viewport: Viewport::from_extent(extent),
            render_resolution: extent,
            present_mode: desc.present_mode,
            info,
            device,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Resets the current slot's allocator and list for recording.
    pub fn begin_frame(&mut self) -> Result<(), GpuError> {
        debug_assert!(self.initialized, "begin_frame on a shut down context");
        let index = self.frame_sync.back_buffer_index();
        debug_assert!(
            self.frame_sync.slot_ready(index),
            "slot {index} reset while its previous frame may still be executing"
        );
        self.slots[index as usize].reset()
    }

    /// Records a barrier on the current back buffer.
    pub fn transition_back_buffer(&mut self, before: ResourceState, after: ResourceState) {
        let index = self.frame_sync.back_buffer_index() as usize;
        let list = self.slots[index].list_mut();
        self.back_buffers[index].transition_from(list, before, after);
    }

    /// Closes the current slot's list and submits it to the direct queue.
    pub fn submit_current(&mut self) -> Result<(), GpuError> {
        let slot = &mut self.slots[self.frame_sync.back_buffer_index() as usize];
        slot.close()?;
        self.queues.direct().execute_command_lists(&[slot.list()])
    }

    pub fn present(&mut self) -> Result<FrameOutcome, GpuError> {
        debug_assert!(self.initialized, "present on a shut down context");
        debug_assert_eq!(
            self.current_back_buffer_state(),
            ResourceState::Present,
            "back buffer must be transitioned back to Present before presenting"
        );
        self.frame_sync
            .present(&mut self.swapchain, self.queues.direct(), self.present_mode)
    }

    pub fn flush_all_queues(&mut self) -> Result<FlushReport, GpuError> {
        self.queues.flush_all()
    }

    /// Rebuilds the depth buffer and its view at `width` x `height`.
    ///
    /// Zero dimensions are clamped to 1.
    pub fn recreate_depth_buffer(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        debug_assert!(self.initialized, "recreate_depth_buffer on a shut down context");
        self.queues.flush_all()?;
        self.rebuild_depth_buffer(Extent2d::new(width, height))
    }

    /// Callers must have drained every queue.
    fn rebuild_depth_buffer(&mut self, extent: Extent2d) -> Result<(), GpuError> {
        let extent = extent.clamped();
        self.depth = create_depth_buffer(&self.device, extent, &self.dsv)?;
        self.depth_extent = extent;
        tracing::info!("depth buffer recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Resizes the swapchain, render resolution, viewport and depth buffer.
    ///
    /// Drains the queues once up front.
    pub fn resize(&mut self, extent: Extent2d) -> Result<(), GpuError> {
        let _span = tracing::info_span!("resize").entered();
        debug_assert!(self.initialized, "resize on a shut down context");
        let extent = extent.clamped();

        self.queues.flush_all()?;
        self.back_buffers.clear();
        self.swapchain.resize_buffers(extent)?;
        self.back_buffers = acquire_back_buffers(&self.device, &self.swapchain, &self.rtvs)?;
        self.frame_sync.rebase(&self.swapchain);

        self.set_render_resolution(extent);
        self.rebuild_depth_buffer(extent)
    }

    /// Drains all queues and leaves the context uninitialized.
    pub fn shutdown(&mut self) -> Result<(), GpuError> {
        if !self.initialized {
            return Ok(());
        }
        self.queues.flush_all()?;
        self.initialized = false;
        tracing::info!("graphics context shut down");
        Ok(())
    }

    pub fn command_list_mut(&mut self) -> &mut B::CommandList {
        let index = self.frame_sync.back_buffer_index() as usize;
        self.slots[index].list_mut()
    }

    pub fn command_list(&self) -> &B::CommandList {
        self.slots[self.frame_sync.back_buffer_index() as usize].list()
    }

    /// The device and the current slot's list, borrowed together.
    pub fn device_and_list(&mut self) -> (&B::Device, &mut B::CommandList) {
        let index = self.frame_sync.back_buffer_index() as usize;
        (&self.device, self.slots[index].list_mut())
    }

    pub fn back_buffer_rtv(&self) -> Descriptor<B> {
        self.rtvs[self.frame_sync.back_buffer_index() as usize].clone()
    }

    pub fn depth_dsv(&self) -> Descriptor<B> {
        self.dsv.clone()
    }

    pub fn current_back_buffer_state(&self) -> ResourceState {
        self.back_buffers[self.frame_sync.back_buffer_index() as usize].state()
    }

    pub fn back_buffer(&self, index: u32) -> &Tracked<B> {
        &self.back_buffers[index as usize]
    }

    pub fn depth_buffer(&self) -> &Tracked<B> {
        &self.depth
    }

    pub fn depth_extent(&self) -> Extent2d {
        self.depth_extent
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        debug_assert!(
            viewport.width > 0.0 && viewport.height > 0.0,
            "viewport must be non-empty"
        );
        tracing::debug!("viewport set to {}x{}", viewport.width, viewport.height);
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Sets the render resolution and fits the viewport to it.
    pub fn set_render_resolution(&mut self, resolution: Extent2d) {
        let resolution = resolution.clamped();
        if resolution != self.render_resolution {
            tracing::debug!(
                "render resolution {}x{} -> {}x{}",
                self.render_resolution.width,
                self.render_resolution.height,
                resolution.width,
                resolution.height
            );
            self.render_resolution = resolution;
        }
        self.set_viewport(Viewport::from_extent(resolution));
    }

    pub fn render_resolution(&self) -> Extent2d {
        self.render_resolution
    }

    pub fn back_buffer_index(&self) -> u32 {
        self.frame_sync.back_buffer_index()
    }

    pub fn buffer_count(&self) -> u32 {
        self.swapchain.buffer_count()
    }

    pub fn back_buffer_format(&self) -> Format {
        self.swapchain.format()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn info(&self) -> &AdapterInfo {
        &self.info
    }

    pub fn queues(&self) -> &CommandQueues<B> {
        &self.queues
    }

    pub fn frame_sync(&self) -> &FrameSync<B> {
        &self.frame_sync
    }

    pub fn swapchain(&self) -> &B::Swapchain {
        &self.swapchain
    }

    pub fn rtv_heap(&self) -> &B::DescriptorHeap {
        self.rtv_heap.heap()
    }

    pub fn dsv_heap(&self) -> &B::DescriptorHeap {
        self.dsv_heap.heap()
    }

    pub fn resource_heap(&self) -> &B::DescriptorHeap {
        self.resource_heap.heap()
    }
}

impl<B: Backend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        if self.initialized {
            if let Err(err) = self.queues.flush_all() {
                tracing::error!("failed to drain queues at teardown: {err}");
            }
        }
    }
}

fn acquire_back_buffers<B: Backend>(
    device: &B::Device,
    swapchain: &B::Swapchain,
    rtvs: &[Descriptor<B>],
) -> Result<Vec<Tracked<B>>, GpuError> {
    rtvs.iter()
        .enumerate()
        .map(|(index, rtv)| {
            let buffer = swapchain.back_buffer(index as u32)?;
            device.create_render_target_view(&buffer, rtv)?;
            Ok(Tracked::new(
                buffer,
                ResourceState::Present,
                format!("back buffer {index}"),
            ))
        })
        .collect()
}

fn create_depth_buffer<B: Backend>(
    device: &B::Device,
    extent: Extent2d,
    dsv: &Descriptor<B>,
) -> Result<Tracked<B>, GpuError> {
    let texture = device.create_texture(
        &TextureDesc {
            label: "depth buffer".into(),
            extent,
            format: DEPTH_FORMAT,
        },
        ResourceState::DepthWrite,
    )?;
    device.create_depth_stencil_view(&texture, dsv)?;
    Ok(Tracked::new(texture, ResourceState::DepthWrite, "depth buffer"))
}
