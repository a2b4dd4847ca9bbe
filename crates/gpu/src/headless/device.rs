use super::Headless;
use super::command::{HeadlessCommandAllocator, HeadlessCommandList};
use super::queue::{HeadlessFence, HeadlessQueue};
use super::resource::{
    DescriptorView, HeadlessDescriptorHeap, HeadlessPipeline, HeadlessResource, HeadlessSurface,
    PipelineInfo, ResourceKind,
};
use super::sim::{SharedSim, SimState, SimStats};
use super::swapchain::HeadlessSwapchain;
use crate::backend::{
    Adapter, AdapterInfo, BufferDesc, BufferSrvDesc, Descriptor, DescriptorHeap,
    DescriptorHeapDesc, DescriptorHeapKind, Device, PipelineDesc, QueueKind, SwapchainDesc,
    TextureDesc,
};
use crate::error::GpuError;
use crate::state::ResourceState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Entry point of the simulated backend.
#[derive(Debug, Clone, Default)]
pub struct HeadlessAdapter {
    lags: [usize; 3],
    flip_order: Vec<u32>,
}

impl HeadlessAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `kind` trail its newest signal by `frames` older signals.
    pub fn with_completion_lag(mut self, kind: QueueKind, frames: usize) -> Self {
        self.lags[kind.index()] = frames;
        self
    }

    /// Scripts the back-buffer index sequence reported after each present.
    pub fn with_flip_order(mut self, order: Vec<u32>) -> Self {
        self.flip_order = order;
        self
    }
}

impl Adapter<Headless> for HeadlessAdapter {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Headless Simulated GPU".into(),
            backend: "headless".into(),
        }
    }

    fn create_device(&self) -> Result<HeadlessDevice, GpuError> {
        Ok(HeadlessDevice {
            sim: Arc::new(Mutex::new(SimState::new(self.lags))),
            flip_order: self.flip_order.clone(),
        })
    }
}

pub struct HeadlessDevice {
    pub(crate) sim: SharedSim,
    flip_order: Vec<u32>,
}

impl HeadlessDevice {
    pub fn stats(&self) -> SimStats {
        self.sim.lock().stats
    }

    /// Misuse the simulated driver detected, oldest first.
    pub fn validation_messages(&self) -> Vec<String> {
        self.sim.lock().validation.clone()
    }

    /// Runs every queue until it has no pending work.
    pub fn drain(&self) {
        self.sim.lock().drain();
    }

    fn check_slot(
        &self,
        dst: &Descriptor<Headless>,
        expected: DescriptorHeapKind,
    ) -> Result<(), GpuError> {
        let kind = dst.heap.desc().kind;
        if kind != expected {
            return Err(GpuError::call(
                "CreateView",
                format!("{expected:?} view written into a {kind:?} heap"),
            ));
        }
        Ok(())
    }
}

impl Device<Headless> for HeadlessDevice {
    fn create_command_queue(&self, kind: QueueKind) -> Result<HeadlessQueue, GpuError> {
        let id = self.sim.lock().add_queue(kind);
        Ok(HeadlessQueue {
            sim: self.sim.clone(),
            id,
            kind,
        })
    }

    fn create_command_allocator(
        &self,
        kind: QueueKind,
    ) -> Result<HeadlessCommandAllocator, GpuError> {
        let id = self.sim.lock().add_allocator();
        Ok(HeadlessCommandAllocator {
            sim: self.sim.clone(),
            id,
            kind,
        })
    }

    fn create_command_list(
        &self,
        kind: QueueKind,
        allocator: &HeadlessCommandAllocator,
    ) -> Result<HeadlessCommandList, GpuError> {
        Ok(HeadlessCommandList {
            sim: self.sim.clone(),
            kind,
            allocator: allocator.id,
            open: false,
            commands: Vec::new(),
        })
    }

    fn create_fence(&self, initial_value: u64) -> Result<HeadlessFence, GpuError> {
        let id = self.sim.lock().add_fence(initial_value, false);
        Ok(HeadlessFence {
            sim: self.sim.clone(),
            id,
        })
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<HeadlessDescriptorHeap, GpuError> {
        if desc.capacity == 0 {
            return Err(GpuError::call("CreateDescriptorHeap", "zero capacity"));
        }
        let id = self.sim.lock().next_id();
        Ok(HeadlessDescriptorHeap::new(id, desc.clone()))
    }

    fn create_buffer(
        &self,
        desc: &BufferDesc,
        initial_state: ResourceState,
    ) -> Result<HeadlessResource, GpuError> {
        if desc.size == 0 {
            return Err(GpuError::call("CreateCommittedResource", "zero-sized buffer"));
        }
        let id = self.sim.lock().next_id();
        Ok(HeadlessResource::new(
            id,
            desc.label.clone(),
            ResourceKind::Buffer {
                size: desc.size,
                usage: desc.usage,
                heap: desc.heap,
            },
            initial_state,
        ))
    }

    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_state: ResourceState,
    ) -> Result<HeadlessResource, GpuError> {
        if desc.extent.is_empty() {
            return Err(GpuError::call(
                "CreateCommittedResource",
                format!("texture '{}' has a zero dimension", desc.label),
            ));
        }
        let id = self.sim.lock().next_id();
        Ok(HeadlessResource::new(
            id,
            desc.label.clone(),
            ResourceKind::Texture {
                extent: desc.extent,
                format: desc.format,
            },
            initial_state,
        ))
    }

    fn write_buffer(
        &self,
        buffer: &HeadlessResource,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError> {
        buffer.write(offset, data)
    }

    fn create_render_target_view(
        &self,
        resource: &HeadlessResource,
        dst: &Descriptor<Headless>,
    ) -> Result<(), GpuError> {
        self.check_slot(dst, DescriptorHeapKind::RenderTarget)?;
        let extent = resource
            .extent()
            .ok_or_else(|| GpuError::call("CreateRenderTargetView", "not a texture"))?;
        dst.heap.write(
            dst.index,
            DescriptorView::RenderTarget {
                resource: resource.id(),
                extent,
            },
        )
    }

    fn create_depth_stencil_view(
        &self,
        resource: &HeadlessResource,
        dst: &Descriptor<Headless>,
    ) -> Result<(), GpuError> {
        self.check_slot(dst, DescriptorHeapKind::DepthStencil)?;
        let extent = resource
            .extent()
            .ok_or_else(|| GpuError::call("CreateDepthStencilView", "not a texture"))?;
        dst.heap.write(
            dst.index,
            DescriptorView::DepthStencil {
                resource: resource.id(),
                extent,
            },
        )
    }

    fn create_shader_resource_view(
        &self,
        resource: &HeadlessResource,
        desc: &BufferSrvDesc,
        dst: &Descriptor<Headless>,
    ) -> Result<(), GpuError> {
        self.check_slot(dst, DescriptorHeapKind::Resource)?;
        dst.heap.write(
            dst.index,
            DescriptorView::ShaderResource {
                resource: resource.id(),
                desc: *desc,
            },
        )
    }

    fn create_constant_buffer_view(
        &self,
        resource: &HeadlessResource,
        size: u64,
        dst: &Descriptor<Headless>,
    ) -> Result<(), GpuError> {
        self.check_slot(dst, DescriptorHeapKind::Resource)?;
        dst.heap.write(
            dst.index,
            DescriptorView::ConstantBuffer {
                resource: resource.id(),
                size,
            },
        )
    }

    fn create_swapchain(
        &self,
        queue: &HeadlessQueue,
        _surface: &HeadlessSurface,
        desc: &SwapchainDesc,
    ) -> Result<HeadlessSwapchain, GpuError> {
        if queue.kind != QueueKind::Direct {
            return Err(GpuError::call("CreateSwapChain", "swapchain needs the direct queue"));
        }
        if let Some(bad) = self.flip_order.iter().find(|i| **i >= desc.buffer_count) {
            return Err(GpuError::call(
                "CreateSwapChain",
                format!("flip order names buffer {bad} of {}", desc.buffer_count),
            ));
        }
        let extent = desc.extent.clamped();
        let buffers =
            HeadlessSwapchain::create_buffers(&self.sim, extent, desc.buffer_count, desc.format);
        Ok(HeadlessSwapchain {
            sim: self.sim.clone(),
            desc: SwapchainDesc {
                extent,
                ..desc.clone()
            },
            buffers,
            current: self.flip_order.first().copied().unwrap_or(0),
            flip_order: self.flip_order.clone(),
            cursor: 0,
            last_present_mode: None,
        })
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<HeadlessPipeline, GpuError> {
        if desc.vertex_shader.is_empty() || desc.pixel_shader.is_empty() {
            return Err(GpuError::Shader(format!("'{}' has an empty shader blob", desc.label)));
        }
        Ok(HeadlessPipeline {
            info: Arc::new(PipelineInfo {
                label: desc.label.to_owned(),
                vertex_shader_len: desc.vertex_shader.len(),
                pixel_shader_len: desc.pixel_shader.len(),
                render_target_format: desc.render_target_format,
                depth_format: desc.depth_format,
                root_constants: desc.root_constants,
            }),
        })
    }
}
