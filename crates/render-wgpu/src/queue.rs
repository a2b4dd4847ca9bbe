use crate::Wgpu;
use crate::command::WgpuCommandList;
use prism_gpu::{Fence, FenceEvent, GpuError, Queue, QueueKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One of the logical queues. All kinds submit to the same device queue.
pub struct WgpuQueue {
    pub(crate) kind: QueueKind,
    pub(crate) queue: Arc<wgpu::Queue>,
}

impl Queue<Wgpu> for WgpuQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute_command_lists(&self, lists: &[&WgpuCommandList]) -> Result<(), GpuError> {
        let buffers = lists
            .iter()
            .map(|list| list.take_encoded())
            .collect::<Result<Vec<_>, _>>()?;
        self.queue.submit(buffers);
        Ok(())
    }

    fn signal(&self, fence: &WgpuFence, value: u64) -> Result<(), GpuError> {
        fence.values.signaled.fetch_max(value, Ordering::AcqRel);
        let values = Arc::clone(&fence.values);
        self.queue.on_submitted_work_done(move || {
            values.completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }
}

struct FenceValues {
    completed: AtomicU64,
    signaled: AtomicU64,
}

/// Fence whose completed value advances from queue completion callbacks.
pub struct WgpuFence {
    device: Arc<wgpu::Device>,
    values: Arc<FenceValues>,
}

impl WgpuFence {
    pub(crate) fn new(device: Arc<wgpu::Device>, initial_value: u64) -> Self {
        Self {
            device,
            values: Arc::new(FenceValues {
                completed: AtomicU64::new(initial_value),
                signaled: AtomicU64::new(initial_value),
            }),
        }
    }

    pub fn last_signaled(&self) -> u64 {
        self.values.signaled.load(Ordering::Acquire)
    }
}

impl Fence for WgpuFence {
    fn completed_value(&self) -> u64 {
        self.device.poll(wgpu::Maintain::Poll);
        self.values.completed.load(Ordering::Acquire)
    }

    fn set_event_on_completion(&self, value: u64, event: &FenceEvent) -> Result<(), GpuError> {
        if self.completed_value() >= value {
            event.set();
            return Ok(());
        }
        let signaled = self.last_signaled();
        if signaled < value {
            return Err(GpuError::WaitNeverSatisfied {
                value,
                completed: self.values.completed.load(Ordering::Acquire),
                signaled,
            });
        }
        // wgpu has no per-fence wait; block on the device until the callback
        // for `value` has run
        loop {
            let drained = self.device.poll(wgpu::Maintain::Wait).is_queue_empty();
            if self.values.completed.load(Ordering::Acquire) >= value {
                break;
            }
            if drained {
                return Err(GpuError::call(
                    "fence wait",
                    format!("queue idle but value {value} never completed"),
                ));
            }
        }
        event.set();
        Ok(())
    }
}
