use super::Headless;
use super::command::HeadlessCommandList;
use super::device::HeadlessDevice;
use super::sim::SharedSim;
use crate::backend::{Fence, Queue, QueueKind};
use crate::error::GpuError;
use crate::sync::FenceEvent;

pub struct HeadlessQueue {
    pub(crate) sim: SharedSim,
    pub(crate) id: usize,
    pub(crate) kind: QueueKind,
}

impl HeadlessQueue {
    /// Number of submissions and signals not yet completed.
    pub fn pending(&self) -> usize {
        self.sim.lock().queues[self.id].pending.len()
    }
}

impl Queue<Headless> for HeadlessQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute_command_lists(&self, lists: &[&HeadlessCommandList]) -> Result<(), GpuError> {
        let mut sim = self.sim.lock();
        for list in lists {
            if list.open {
                return Err(GpuError::ListOpen);
            }
            if list.kind != self.kind {
                sim.report(format!(
                    "{} list submitted to {} queue",
                    list.kind.name(),
                    self.kind.name()
                ));
            }
            sim.enqueue_execute(self.id, list.allocator, list.commands.clone());
        }
        Ok(())
    }

    fn signal(&self, fence: &HeadlessFence, value: u64) -> Result<(), GpuError> {
        self.sim.lock().enqueue_signal(self.id, fence.id, value);
        Ok(())
    }
}

/// Simulated fence.
///
/// Waiting on a value that a queue has been asked to signal makes that queue
/// catch up, which counts as a forced wait in [`super::SimStats`].
pub struct HeadlessFence {
    pub(crate) sim: SharedSim,
    pub(crate) id: usize,
}

impl HeadlessFence {
    /// A fence the CPU signals itself. Waits on it block until
    /// [`signal_from_cpu`](Self::signal_from_cpu) reaches the target.
    pub fn external(device: &HeadlessDevice, initial_value: u64) -> Self {
        let id = device.sim.lock().add_fence(initial_value, true);
        Self {
            sim: device.sim.clone(),
            id,
        }
    }

    /// Sets the completed value from the CPU side.
    pub fn signal_from_cpu(&self, value: u64) {
        self.sim.lock().complete_fence(self.id, value);
    }

    pub fn last_signaled(&self) -> u64 {
        self.sim.lock().fences[self.id].last_signaled
    }
}

impl Fence for HeadlessFence {
    fn completed_value(&self) -> u64 {
        self.sim.lock().fences[self.id].completed
    }

    fn set_event_on_completion(&self, value: u64, event: &FenceEvent) -> Result<(), GpuError> {
        let mut sim = self.sim.lock();
        if sim.fences[self.id].completed < value {
            sim.drive_until(self.id, value);
        }

        let fence = &mut sim.fences[self.id];
        if fence.completed >= value {
            event.set();
        } else if fence.external {
            fence.waiters.push((value, event.clone()));
        } else {
            return Err(GpuError::WaitNeverSatisfied {
                value,
                completed: fence.completed,
                signaled: fence.last_signaled,
            });
        }
        Ok(())
    }
}
