//! Shared state of the simulated GPU.

use super::command::Command;
use crate::backend::QueueKind;
use crate::sync::FenceEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) type SharedSim = Arc<Mutex<SimState>>;

/// Counters over the lifetime of one headless device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub lists_submitted: u64,
    pub lists_completed: u64,
    pub signals: u64,
    /// CPU waits that forced a queue to catch up.
    pub forced_waits: u64,
    pub allocator_resets: u64,
    pub presents: u64,
}

pub(crate) enum PendingOp {
    Execute {
        allocator: usize,
        commands: Vec<Command>,
    },
    Signal {
        fence: usize,
        value: u64,
    },
}

pub(crate) struct SimQueue {
    /// Signals older than the newest one that may remain pending.
    pub lag: usize,
    pub pending: VecDeque<PendingOp>,
}

impl SimQueue {
    fn pending_signals(&self) -> usize {
        self.pending
            .iter()
            .filter(|op| matches!(op, PendingOp::Signal { .. }))
            .count()
    }

    fn has_signal(&self, fence: usize, value: u64) -> bool {
        self.pending.iter().any(|op| {
            matches!(op, PendingOp::Signal { fence: f, value: v } if *f == fence && *v >= value)
        })
    }
}

pub(crate) struct SimFence {
    pub completed: u64,
    pub last_signaled: u64,
    /// Fences the CPU may signal directly; waits on them never error.
    pub external: bool,
    pub waiters: Vec<(u64, FenceEvent)>,
}

#[derive(Default)]
pub(crate) struct SimAllocator {
    pub in_flight: usize,
}

pub(crate) struct SimState {
    pub queues: Vec<SimQueue>,
    pub fences: Vec<SimFence>,
    pub allocators: Vec<SimAllocator>,
    pub stats: SimStats,
    pub validation: Vec<String>,
    pub next_id: u64,
    pub lags: [usize; 3],
}

impl SimState {
    pub fn new(lags: [usize; 3]) -> Self {
        Self {
            queues: Vec::new(),
            fences: Vec::new(),
            allocators: Vec::new(),
            stats: SimStats::default(),
            validation: Vec::new(),
            next_id: 1,
            lags,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn report(&mut self, message: String) {
        tracing::warn!("headless validation: {message}");
        self.validation.push(message);
    }

    pub fn add_queue(&mut self, kind: QueueKind) -> usize {
        let lag = self.lags[kind.index()];
        self.queues.push(SimQueue {
            lag,
            pending: VecDeque::new(),
        });
        self.queues.len() - 1
    }

    pub fn add_fence(&mut self, initial: u64, external: bool) -> usize {
        self.fences.push(SimFence {
            completed: initial,
            last_signaled: initial,
            external,
            waiters: Vec::new(),
        });
        self.fences.len() - 1
    }

    pub fn add_allocator(&mut self) -> usize {
        self.allocators.push(SimAllocator::default());
        self.allocators.len() - 1
    }

    pub fn enqueue_execute(&mut self, queue: usize, allocator: usize, commands: Vec<Command>) {
        self.allocators[allocator].in_flight += 1;
        self.stats.lists_submitted += 1;
        self.queues[queue]
            .pending
            .push_back(PendingOp::Execute { allocator, commands });
    }

    /// Enqueues a signal, then lets the queue run until it trails the newest
    /// signal by at most its configured lag.
    pub fn enqueue_signal(&mut self, queue: usize, fence: usize, value: u64) {
        let f = &mut self.fences[fence];
        f.last_signaled = f.last_signaled.max(value);
        self.stats.signals += 1;
        self.queues[queue]
            .pending
            .push_back(PendingOp::Signal { fence, value });

        while self.queues[queue].pending_signals() > self.queues[queue].lag + 1 {
            self.retire_front(queue);
        }
    }

    /// Runs the queue that owns a pending signal reaching `value` on `fence`
    /// up to and including that signal. Returns false when no queue has one.
    pub fn drive_until(&mut self, fence: usize, value: u64) -> bool {
        let Some(queue) = self
            .queues
            .iter()
            .position(|q| q.has_signal(fence, value))
        else {
            return false;
        };
        self.stats.forced_waits += 1;
        while self.fences[fence].completed < value {
            if !self.retire_front(queue) {
                break;
            }
        }
        true
    }

    /// Runs every queue to empty.
    pub fn drain(&mut self) {
        for queue in 0..self.queues.len() {
            while self.retire_front(queue) {}
        }
    }

    pub fn complete_fence(&mut self, fence: usize, value: u64) {
        let f = &mut self.fences[fence];
        f.completed = f.completed.max(value);
        let completed = f.completed;
        f.waiters.retain(|(target, event)| {
            if *target <= completed {
                event.set();
                false
            } else {
                true
            }
        });
    }

    fn retire_front(&mut self, queue: usize) -> bool {
        let Some(op) = self.queues[queue].pending.pop_front() else {
            return false;
        };
        match op {
            PendingOp::Execute {
                allocator,
                commands,
            } => {
                for command in &commands {
                    if let Command::CopyBuffer { dst, src, size } = command {
                        dst.copy_from(src, *size);
                    }
                }
                self.allocators[allocator].in_flight -= 1;
                self.stats.lists_completed += 1;
            }
            PendingOp::Signal { fence, value } => self.complete_fence(fence, value),
        }
        true
    }
}
