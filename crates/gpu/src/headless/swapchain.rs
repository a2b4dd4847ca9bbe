use super::Headless;
use super::resource::{HeadlessResource, ResourceKind};
use super::sim::SharedSim;
use crate::backend::{Format, PresentMode, Swapchain, SwapchainDesc};
use crate::error::GpuError;
use crate::state::ResourceState;
use prism_common::Extent2d;

/// Simulated flip-model swapchain.
///
/// The back-buffer index advances sequentially unless a flip order was
/// scripted on the adapter, in which case it walks that order cyclically.
pub struct HeadlessSwapchain {
    pub(crate) sim: SharedSim,
    pub(crate) desc: SwapchainDesc,
    pub(crate) buffers: Vec<HeadlessResource>,
    pub(crate) flip_order: Vec<u32>,
    pub(crate) cursor: usize,
    pub(crate) current: u32,
    pub(crate) last_present_mode: Option<PresentMode>,
}

impl HeadlessSwapchain {
    pub(crate) fn create_buffers(
        sim: &SharedSim,
        extent: Extent2d,
        count: u32,
        format: Format,
    ) -> Vec<HeadlessResource> {
        let mut sim = sim.lock();
        (0..count)
            .map(|index| {
                HeadlessResource::new(
                    sim.next_id(),
                    format!("back buffer {index}"),
                    ResourceKind::BackBuffer {
                        index,
                        extent,
                        format,
                    },
                    ResourceState::Present,
                )
            })
            .collect()
    }

    pub fn last_present_mode(&self) -> Option<PresentMode> {
        self.last_present_mode
    }
}

impl Swapchain<Headless> for HeadlessSwapchain {
    fn format(&self) -> Format {
        self.desc.format
    }

    fn buffer_count(&self) -> u32 {
        self.desc.buffer_count
    }

    fn extent(&self) -> Extent2d {
        self.desc.extent
    }

    fn back_buffer(&self, index: u32) -> Result<HeadlessResource, GpuError> {
        self.buffers
            .get(index as usize)
            .cloned()
            .ok_or_else(|| GpuError::call("GetBuffer", format!("no back buffer {index}")))
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn present(&mut self, mode: PresentMode) -> Result<(), GpuError> {
        let buffer = &self.buffers[self.current as usize];
        let mut sim = self.sim.lock();
        if buffer.state() != ResourceState::Present {
            sim.report(format!(
                "presented '{}' while in {:?}",
                buffer.label(),
                buffer.state()
            ));
        }
        sim.stats.presents += 1;
        drop(sim);

        self.last_present_mode = Some(mode);
        self.current = if self.flip_order.is_empty() {
            (self.current + 1) % self.desc.buffer_count
        } else {
            self.cursor = (self.cursor + 1) % self.flip_order.len();
            self.flip_order[self.cursor]
        };
        Ok(())
    }

    fn resize_buffers(&mut self, extent: Extent2d) -> Result<(), GpuError> {
        if let Some(held) = self.buffers.iter().find(|b| !b.is_unique()) {
            return Err(GpuError::call(
                "ResizeBuffers",
                format!("'{}' is still referenced", held.label()),
            ));
        }
        let extent = extent.clamped();
        self.buffers =
            Self::create_buffers(&self.sim, extent, self.desc.buffer_count, self.desc.format);
        self.desc.extent = extent;
        self.cursor = 0;
        self.current = self.flip_order.first().copied().unwrap_or(0);
        Ok(())
    }
}
