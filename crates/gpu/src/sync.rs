//! Fence waits, signals and queue flushing.

use crate::backend::{Backend, Device, Fence, Queue, QueueKind};
use crate::error::GpuError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Auto-reset CPU event a fence can be told to set on completion.
///
/// Clones share the same event.
#[derive(Debug, Clone, Default)]
pub struct FenceEvent {
    inner: Arc<EventInner>,
}

#[derive(Debug, Default)]
struct EventInner {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl FenceEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut signaled = self.inner.signaled.lock();
        *signaled = true;
        self.inner.cond.notify_all();
    }

    /// Blocks until set, then resets.
    pub fn wait(&self) {
        let mut signaled = self.inner.signaled.lock();
        while !*signaled {
            self.inner.cond.wait(&mut signaled);
        }
        *signaled = false;
    }

    pub fn is_set(&self) -> bool {
        *self.inner.signaled.lock()
    }
}

/// Whether a fence wait had to block the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    AlreadyComplete,
    Blocked,
}

impl WaitOutcome {
    pub fn blocked(self) -> bool {
        self == WaitOutcome::Blocked
    }
}

/// Enqueues `fence = value` on `queue` behind all prior work. Non-blocking.
pub fn signal<B: Backend>(queue: &B::Queue, fence: &B::Fence, value: u64) -> Result<(), GpuError> {
    queue.signal(fence, value)
}

/// Blocks until `fence` reaches `value`.
///
/// The event is only armed when the fence has not already passed `value`, so
/// a satisfied wait never touches the event.
pub fn wait_for_fence<F: Fence>(
    fence: &F,
    value: u64,
    event: &FenceEvent,
) -> Result<WaitOutcome, GpuError> {
    if fence.completed_value() >= value {
        return Ok(WaitOutcome::AlreadyComplete);
    }
    fence.set_event_on_completion(value, event)?;
    event.wait();
    Ok(WaitOutcome::Blocked)
}

/// A queue with its own fence and monotonic signal counter.
pub struct QueueSync<B: Backend> {
    queue: B::Queue,
    fence: B::Fence,
    last_signaled: u64,
}

impl<B: Backend> QueueSync<B> {
    pub fn new(device: &B::Device, kind: QueueKind) -> Result<Self, GpuError> {
        Ok(Self {
            queue: device.create_command_queue(kind)?,
            fence: device.create_fence(0)?,
            last_signaled: 0,
        })
    }

    pub fn queue(&self) -> &B::Queue {
        &self.queue
    }

    pub fn fence(&self) -> &B::Fence {
        &self.fence
    }

    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    /// Signals the next counter value and returns it.
    pub fn signal_next(&mut self) -> Result<u64, GpuError> {
        self.last_signaled += 1;
        signal::<B>(&self.queue, &self.fence, self.last_signaled)?;
        Ok(self.last_signaled)
    }

    pub fn is_idle(&self) -> bool {
        self.fence.completed_value() >= self.last_signaled
    }
}

/// Per-queue result of a full flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Value signaled on each queue, indexed like `QueueKind::ALL`.
    pub signaled: [u64; 3],
    /// Number of queues the CPU had to block on.
    pub blocked: usize,
}

/// The three hardware queues, each paired with its own fence.
pub struct CommandQueues<B: Backend> {
    direct: QueueSync<B>,
    compute: QueueSync<B>,
    copy: QueueSync<B>,
    event: FenceEvent,
}

impl<B: Backend> CommandQueues<B> {
    pub fn new(device: &B::Device) -> Result<Self, GpuError> {
        Ok(Self {
            direct: QueueSync::new(device, QueueKind::Direct)?,
            compute: QueueSync::new(device, QueueKind::Compute)?,
            copy: QueueSync::new(device, QueueKind::Copy)?,
            event: FenceEvent::new(),
        })
    }

    pub fn get(&self, kind: QueueKind) -> &QueueSync<B> {
        match kind {
            QueueKind::Direct => &self.direct,
            QueueKind::Compute => &self.compute,
            QueueKind::Copy => &self.copy,
        }
    }

    pub fn direct(&self) -> &B::Queue {
        self.direct.queue()
    }

    /// Drains one queue: signals a fresh value and waits for it.
    pub fn flush(&mut self, kind: QueueKind) -> Result<WaitOutcome, GpuError> {
        let sync = match kind {
            QueueKind::Direct => &mut self.direct,
            QueueKind::Compute => &mut self.compute,
            QueueKind::Copy => &mut self.copy,
        };
        let value = sync.signal_next()?;
        wait_for_fence(&sync.fence, value, &self.event)
    }

    /// Drains every queue.
    ///
    /// All three queues are signaled before any wait so they drain in
    /// parallel; each fence is then waited on for its own value, since the
    /// queues complete independently of each other.
    pub fn flush_all(&mut self) -> Result<FlushReport, GpuError> {
        let _span = tracing::debug_span!("flush_all_queues").entered();

        let signaled = [
            self.direct.signal_next()?,
            self.compute.signal_next()?,
            self.copy.signal_next()?,
        ];

        let mut blocked = 0;
        for (sync, value) in [&self.direct, &self.compute, &self.copy]
            .into_iter()
            .zip(signaled)
        {
            if wait_for_fence(&sync.fence, value, &self.event)?.blocked() {
                blocked += 1;
            }
        }

        tracing::debug!(?signaled, blocked, "queues flushed");
        Ok(FlushReport { signaled, blocked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn event_is_auto_reset() {
        let event = FenceEvent::new();
        event.set();
        assert!(event.is_set());
        event.wait();
        assert!(!event.is_set());
    }

    #[test]
    fn event_wakes_waiter_on_other_thread() {
        let event = FenceEvent::new();
        let setter = event.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });
        event.wait();
        handle.join().unwrap();
    }
}
