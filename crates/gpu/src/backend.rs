//! Backend abstraction over an explicit graphics API.
//!
//! The shape follows the explicit model: a device creates queues, fences,
//! allocator/list pairs, descriptor heaps and resources; command lists record
//! barriers and draws; queues execute lists and signal fences. Handles
//! (`Resource`, `DescriptorHeap`, `Pipeline`) are cheap reference-counted
//! clones so they can be recorded into lists and kept alive past submission.

use crate::error::GpuError;
use crate::state::ResourceState;
use crate::sync::FenceEvent;
use prism_common::{Extent2d, ScissorRect, Viewport};
use std::fmt;

/// A concrete graphics backend: the set of object types it provides.
pub trait Backend: Sized + 'static {
    type Adapter: Adapter<Self>;
    type Device: Device<Self>;
    type Queue: Queue<Self>;
    type Fence: Fence;
    type CommandAllocator: CommandAllocator;
    type CommandList: CommandList<Self>;
    type Resource: Clone + fmt::Debug;
    type DescriptorHeap: DescriptorHeap + Clone;
    type Swapchain: Swapchain<Self>;
    type Pipeline: Clone;
    type Surface;
}

/// Which hardware queue a queue, allocator or list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Direct,
    Compute,
    Copy,
}

impl QueueKind {
    pub const ALL: [QueueKind; 3] = [QueueKind::Direct, QueueKind::Compute, QueueKind::Copy];

    /// Position in [`QueueKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            QueueKind::Direct => 0,
            QueueKind::Compute => 1,
            QueueKind::Copy => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QueueKind::Direct => "direct",
            QueueKind::Compute => "compute",
            QueueKind::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    D32Float,
}

impl Format {
    pub fn is_depth(self) -> bool {
        matches!(self, Format::D32Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Memory pool a buffer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapType {
    /// GPU-local, written only through copies.
    Default,
    /// CPU-visible, written directly with `Device::write_buffer`.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Structured vertex data read through shader resource views.
    Vertex,
    Index,
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    pub heap: HeapType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub extent: Extent2d,
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorHeapKind {
    RenderTarget,
    DepthStencil,
    /// Constant-buffer, shader-resource and unordered-access views.
    Resource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorHeapDesc {
    pub label: String,
    pub kind: DescriptorHeapKind,
    pub capacity: u32,
    pub shader_visible: bool,
}

/// Structured-buffer view over `num_elements` of `stride` bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSrvDesc {
    pub first_element: u64,
    pub num_elements: u32,
    pub stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// No vsync; tearing allowed.
    Immediate,
    Vsync,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainDesc {
    pub extent: Extent2d,
    pub buffer_count: u32,
    pub format: Format,
    pub present_mode: PresentMode,
}

/// Two opaque compiled shader blobs plus the target formats they render to.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub vertex_shader: &'a [u8],
    pub pixel_shader: &'a [u8],
    pub render_target_format: Format,
    pub depth_format: Format,
    /// Number of 32-bit root constants visible to both stages.
    pub root_constants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub backend: String,
}

/// A location in a descriptor heap.
pub struct Descriptor<B: Backend> {
    pub heap: B::DescriptorHeap,
    pub index: u32,
}

impl<B: Backend> Clone for Descriptor<B> {
    fn clone(&self) -> Self {
        Self {
            heap: self.heap.clone(),
            index: self.index,
        }
    }
}

impl<B: Backend> fmt::Debug for Descriptor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("kind", &self.heap.desc().kind)
            .field("index", &self.index)
            .finish()
    }
}

pub trait Adapter<B: Backend> {
    fn info(&self) -> AdapterInfo;
    fn create_device(&self) -> Result<B::Device, GpuError>;
}

pub trait Device<B: Backend> {
    fn create_command_queue(&self, kind: QueueKind) -> Result<B::Queue, GpuError>;
    fn create_command_allocator(&self, kind: QueueKind) -> Result<B::CommandAllocator, GpuError>;
    /// Creates a list in the closed state.
    fn create_command_list(
        &self,
        kind: QueueKind,
        allocator: &B::CommandAllocator,
    ) -> Result<B::CommandList, GpuError>;
    fn create_fence(&self, initial_value: u64) -> Result<B::Fence, GpuError>;
    fn create_descriptor_heap(&self, desc: &DescriptorHeapDesc)
    -> Result<B::DescriptorHeap, GpuError>;
    fn create_buffer(
        &self,
        desc: &BufferDesc,
        initial_state: ResourceState,
    ) -> Result<B::Resource, GpuError>;
    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_state: ResourceState,
    ) -> Result<B::Resource, GpuError>;
    /// Writes into an upload-heap buffer from the CPU.
    fn write_buffer(&self, buffer: &B::Resource, offset: u64, data: &[u8])
    -> Result<(), GpuError>;
    fn create_render_target_view(
        &self,
        resource: &B::Resource,
        dst: &Descriptor<B>,
    ) -> Result<(), GpuError>;
    fn create_depth_stencil_view(
        &self,
        resource: &B::Resource,
        dst: &Descriptor<B>,
    ) -> Result<(), GpuError>;
    fn create_shader_resource_view(
        &self,
        resource: &B::Resource,
        desc: &BufferSrvDesc,
        dst: &Descriptor<B>,
    ) -> Result<(), GpuError>;
    fn create_constant_buffer_view(
        &self,
        resource: &B::Resource,
        size: u64,
        dst: &Descriptor<B>,
    ) -> Result<(), GpuError>;
    /// Creates a swapchain presenting through `queue`.
    fn create_swapchain(
        &self,
        queue: &B::Queue,
        surface: &B::Surface,
        desc: &SwapchainDesc,
    ) -> Result<B::Swapchain, GpuError>;
    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<B::Pipeline, GpuError>;
}

pub trait Queue<B: Backend> {
    fn kind(&self) -> QueueKind;
    /// Submits closed lists; they execute in submission order.
    fn execute_command_lists(&self, lists: &[&B::CommandList]) -> Result<(), GpuError>;
    /// Enqueues a fence update after all previously submitted work.
    fn signal(&self, fence: &B::Fence, value: u64) -> Result<(), GpuError>;
}

/// GPU-updated monotonic counter.
pub trait Fence {
    fn completed_value(&self) -> u64;
    /// Arranges for `event` to be set once the completed value reaches `value`.
    fn set_event_on_completion(&self, value: u64, event: &FenceEvent) -> Result<(), GpuError>;
}

pub trait CommandAllocator {
    /// Reclaims recorded command memory. Fails while any list recorded from
    /// this allocator may still be executing.
    fn reset(&self) -> Result<(), GpuError>;
}

pub trait CommandList<B: Backend> {
    /// Reopens the list for recording into `allocator`.
    fn reset(&mut self, allocator: &B::CommandAllocator) -> Result<(), GpuError>;
    fn close(&mut self) -> Result<(), GpuError>;
    fn is_open(&self) -> bool;

    fn resource_barrier(
        &mut self,
        resource: &B::Resource,
        before: ResourceState,
        after: ResourceState,
    );
    fn copy_buffer(&mut self, dst: &B::Resource, src: &B::Resource, size: u64);
    fn clear_render_target(&mut self, rtv: &Descriptor<B>, color: [f32; 4]);
    fn clear_depth(&mut self, dsv: &Descriptor<B>, depth: f32);
    fn set_pipeline(&mut self, pipeline: &B::Pipeline);
    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, rect: &ScissorRect);
    fn set_render_targets(&mut self, rtv: &Descriptor<B>, dsv: Option<&Descriptor<B>>);
    fn set_descriptor_heap(&mut self, heap: &B::DescriptorHeap);
    fn set_root_constants(&mut self, constants: &[u32]);
    fn set_index_buffer(&mut self, buffer: &B::Resource, format: IndexFormat);
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);
}

pub trait DescriptorHeap {
    fn desc(&self) -> &DescriptorHeapDesc;
}

pub trait Swapchain<B: Backend> {
    fn format(&self) -> Format;
    fn buffer_count(&self) -> u32;
    fn extent(&self) -> Extent2d;
    fn back_buffer(&self, index: u32) -> Result<B::Resource, GpuError>;
    /// Index of the back buffer the next frame renders into. Not guaranteed
    /// sequential under flip-discard presentation.
    fn current_back_buffer_index(&self) -> u32;
    fn present(&mut self, mode: PresentMode) -> Result<(), GpuError>;
    /// Resizes every back buffer. All references to the old buffers must have
    /// been released and no GPU work may reference them.
    fn resize_buffers(&mut self, extent: Extent2d) -> Result<(), GpuError>;
}
