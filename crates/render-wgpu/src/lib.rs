//! wgpu implementation of the prism GPU backend.
//!
//! Maps the explicit queue/fence/list model onto wgpu: every queue kind
//! submits to the single device queue, fences complete through
//! `on_submitted_work_done`, and command lists are encoded into a wgpu
//! command buffer when they close.
//!
//! # Invariants
//! - Barriers are recorded for bookkeeping only; wgpu tracks usage itself.
//! - Root constants select descriptor-heap slots; constant `i` feeds
//!   binding `i` of bind group 0.
//! - All back buffer indices alias the surface texture of the current frame.

mod command;
mod convert;
mod device;
mod queue;
mod resource;
mod shaders;
mod swapchain;

pub use command::{WgpuCommandAllocator, WgpuCommandList};
pub use device::{WgpuAdapter, WgpuDevice, enumerate_adapters};
pub use queue::{WgpuFence, WgpuQueue};
pub use resource::{WgpuDescriptorHeap, WgpuPipeline, WgpuResource, WgpuSurface};
pub use shaders::{PIXEL_SHADER_WGSL, VERTEX_SHADER_WGSL, builtin_shaders};
pub use swapchain::WgpuSwapchain;

use prism_gpu::Backend;

/// The wgpu backend.
pub enum Wgpu {}

impl Backend for Wgpu {
    type Adapter = WgpuAdapter;
    type Device = WgpuDevice;
    type Queue = WgpuQueue;
    type Fence = WgpuFence;
    type CommandAllocator = WgpuCommandAllocator;
    type CommandList = WgpuCommandList;
    type Resource = WgpuResource;
    type DescriptorHeap = WgpuDescriptorHeap;
    type Swapchain = WgpuSwapchain;
    type Pipeline = WgpuPipeline;
    type Surface = WgpuSurface;
}
