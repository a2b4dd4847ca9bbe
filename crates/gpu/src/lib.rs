//! Explicit GPU model: backends, resource states, fences and frame pacing.
//!
//! # Invariants
//! - The CPU never resets a frame slot's command allocator while the fence
//!   value recorded for that slot is ahead of the fence's completed value.
//! - A fence wait only blocks when the fence has not yet reached the target.
//! - Every barrier's `before` state is the resource's last-known state.
//! - All queues are drained before the depth buffer, the swapchain buffers
//!   or the device are released.
//! - GPU call failures are fatal at the application boundary (see [`verify`]).

pub mod backend;
pub mod command;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod headless;
pub mod state;
pub mod sync;

pub use backend::{
    Adapter, AdapterInfo, Backend, BufferDesc, BufferSrvDesc, BufferUsage, CommandAllocator,
    CommandList, Descriptor, DescriptorHeap, DescriptorHeapDesc, DescriptorHeapKind, Device,
    Fence, Format, HeapType, IndexFormat, PipelineDesc, PresentMode, Queue, QueueKind, Swapchain,
    SwapchainDesc, TextureDesc,
};
pub use command::CommandContext;
pub use context::{ContextDesc, DEPTH_FORMAT, GraphicsContext};
pub use descriptor::{
    CONSTANT_BUFFER_ALIGNMENT, DescriptorAllocator, UploadedBuffer, align_to,
    create_constant_buffer, upload_buffer,
};
pub use error::{GpuError, verify};
pub use frame::{FrameOutcome, FrameStats, FrameSync};
pub use state::{ResourceState, Tracked};
pub use sync::{CommandQueues, FenceEvent, FlushReport, QueueSync, WaitOutcome, signal, wait_for_fence};
