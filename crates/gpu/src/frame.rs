//! Frame pacing across swapchain back buffers.
//!
//! # Invariants
//! - The frame counter is strictly increasing; every presented frame signals
//!   a fresh value on the direct queue.
//! - `fence_values[i]` is the value signaled after the last frame rendered
//!   into back buffer `i`; it only ever grows.
//! - After `present` returns, the fence has reached the value recorded for
//!   the new current back buffer, so its slot may be reset.

use crate::backend::{Backend, Device, Fence, PresentMode, Swapchain};
use crate::error::GpuError;
use crate::sync::{FenceEvent, signal, wait_for_fence};

/// What happened during one `present`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Frames presented so far, this one included.
    pub frame: u64,
    /// Fence value signaled on the direct queue for this frame.
    pub signaled: u64,
    /// Back buffer the frame was rendered into.
    pub previous_back_buffer: u32,
    /// Back buffer the next frame renders into.
    pub back_buffer: u32,
    /// Fence value waited on before reusing `back_buffer`.
    pub waited_for: u64,
    /// Whether the CPU had to block on that wait.
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub cpu_stalls: u64,
}

/// Per-back-buffer fence bookkeeping for the direct queue.
pub struct FrameSync<B: Backend> {
    fence: B::Fence,
    event: FenceEvent,
    fence_values: Vec<u64>,
    frame_counter: u64,
    back_buffer_index: u32,
    stats: FrameStats,
}

impl<B: Backend> FrameSync<B> {
    pub fn new(device: &B::Device, swapchain: &B::Swapchain) -> Result<Self, GpuError> {
        Ok(Self {
            fence: device.create_fence(0)?,
            event: FenceEvent::new(),
            fence_values: vec![0; swapchain.buffer_count() as usize],
            frame_counter: 0,
            back_buffer_index: swapchain.current_back_buffer_index(),
            stats: FrameStats::default(),
        })
    }

    /// Presents the current back buffer and paces the CPU.
    ///
    /// Order matters: present, signal the new frame value for the buffer just
    /// rendered, query which buffer comes next, then wait until the GPU has
    /// finished the last frame that used that buffer.
    pub fn present(
        &mut self,
        swapchain: &mut B::Swapchain,
        direct_queue: &B::Queue,
        mode: PresentMode,
    ) -> Result<FrameOutcome, GpuError> {
        swapchain.present(mode)?;

        self.frame_counter += 1;
        let signaled = self.frame_counter;
        signal::<B>(direct_queue, &self.fence, signaled)?;
        let previous_back_buffer = self.back_buffer_index;
        self.fence_values[previous_back_buffer as usize] = signaled;

        let back_buffer = swapchain.current_back_buffer_index();
        self.back_buffer_index = back_buffer;

        let waited_for = self.fence_values[back_buffer as usize];
        let blocked = wait_for_fence(&self.fence, waited_for, &self.event)?.blocked();

        self.stats.frames_presented += 1;
        if blocked {
            self.stats.cpu_stalls += 1;
            tracing::debug!(frame = signaled, waited_for, "cpu waited on back buffer {back_buffer}");
        }

        Ok(FrameOutcome {
            frame: self.stats.frames_presented,
            signaled,
            previous_back_buffer,
            back_buffer,
            waited_for,
            blocked,
        })
    }

    /// True when no GPU work from an earlier frame still uses slot `index`.
    pub fn slot_ready(&self, index: u32) -> bool {
        self.fence.completed_value() >= self.fence_values[index as usize]
    }

    /// Re-reads the back-buffer index after the swapchain was rebuilt.
    pub fn rebase(&mut self, swapchain: &B::Swapchain) {
        self.fence_values
            .resize(swapchain.buffer_count() as usize, self.frame_counter);
        self.back_buffer_index = swapchain.current_back_buffer_index();
    }

    pub fn back_buffer_index(&self) -> u32 {
        self.back_buffer_index
    }

    pub fn fence_value(&self, index: u32) -> u64 {
        self.fence_values[index as usize]
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn fence(&self) -> &B::Fence {
        &self.fence
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
