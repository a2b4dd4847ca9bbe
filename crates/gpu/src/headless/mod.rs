//! Deterministic simulated GPU.
//!
//! Queues do not run on their own: a queue completes pending work only when a
//! new signal pushes it past its configured completion lag, or when the CPU
//! waits on a fence value one of its pending signals will reach. Lists, heaps
//! and descriptors stay inspectable, and driver misuse (resetting a busy
//! allocator, mismatched barriers, submitting open lists) is reported instead
//! of silently accepted.

mod command;
mod device;
mod queue;
mod resource;
mod sim;
mod swapchain;

pub use command::{Command, HeadlessCommandAllocator, HeadlessCommandList};
pub use device::{HeadlessAdapter, HeadlessDevice};
pub use queue::{HeadlessFence, HeadlessQueue};
pub use resource::{
    DescriptorView, HeadlessDescriptorHeap, HeadlessPipeline, HeadlessResource, HeadlessSurface,
    PipelineInfo, ResourceKind,
};
pub use sim::SimStats;
pub use swapchain::HeadlessSwapchain;

use crate::backend::Backend;

/// The simulated backend.
#[derive(Debug, Clone, Copy)]
pub enum Headless {}

impl Backend for Headless {
    type Adapter = HeadlessAdapter;
    type Device = HeadlessDevice;
    type Queue = HeadlessQueue;
    type Fence = HeadlessFence;
    type CommandAllocator = HeadlessCommandAllocator;
    type CommandList = HeadlessCommandList;
    type Resource = HeadlessResource;
    type DescriptorHeap = HeadlessDescriptorHeap;
    type Swapchain = HeadlessSwapchain;
    type Pipeline = HeadlessPipeline;
    type Surface = HeadlessSurface;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, CommandAllocator, CommandList, Device, Fence, Queue, QueueKind};
    use crate::error::GpuError;

    #[test]
    fn allocator_refuses_reset_while_in_flight() {
        let device = HeadlessAdapter::new()
            .with_completion_lag(QueueKind::Direct, 1)
            .create_device()
            .unwrap();
        let queue = device.create_command_queue(QueueKind::Direct).unwrap();
        let fence = device.create_fence(0).unwrap();
        let allocator = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut list = device
            .create_command_list(QueueKind::Direct, &allocator)
            .unwrap();

        list.reset(&allocator).unwrap();
        list.close().unwrap();
        queue.execute_command_lists(&[&list]).unwrap();
        queue.signal(&fence, 1).unwrap();

        assert!(matches!(allocator.reset(), Err(GpuError::AllocatorInUse)));
        let messages = device.validation_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("1 submissions in flight"), "{messages:?}");

        device.drain();
        assert_eq!(fence.completed_value(), 1);
        allocator.reset().unwrap();
    }

    #[test]
    fn open_list_cannot_be_submitted() {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let queue = device.create_command_queue(QueueKind::Direct).unwrap();
        let allocator = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut list = device
            .create_command_list(QueueKind::Direct, &allocator)
            .unwrap();

        list.reset(&allocator).unwrap();
        assert!(matches!(
            queue.execute_command_lists(&[&list]),
            Err(GpuError::ListOpen)
        ));
        assert!(matches!(list.reset(&allocator), Err(GpuError::ListOpen)));
    }

    #[test]
    fn lagging_queue_keeps_older_signals_pending() {
        let device = HeadlessAdapter::new()
            .with_completion_lag(QueueKind::Copy, 2)
            .create_device()
            .unwrap();
        let queue = device.create_command_queue(QueueKind::Copy).unwrap();
        let fence = device.create_fence(0).unwrap();

        for value in 1..=3 {
            queue.signal(&fence, value).unwrap();
        }
        assert_eq!(fence.completed_value(), 0);

        queue.signal(&fence, 4).unwrap();
        assert_eq!(fence.completed_value(), 1);
        assert_eq!(queue.pending(), 3);
    }

    #[test]
    fn wait_on_unsignaled_value_is_an_error() {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let fence = device.create_fence(0).unwrap();
        let event = crate::sync::FenceEvent::new();
        assert!(matches!(
            fence.set_event_on_completion(5, &event),
            Err(GpuError::WaitNeverSatisfied { value: 5, .. })
        ));
    }
}
