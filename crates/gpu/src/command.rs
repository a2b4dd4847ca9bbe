use crate::backend::{Backend, CommandAllocator, CommandList, Device, QueueKind};
use crate::error::GpuError;

/// A command allocator and the list that records into it.
pub struct CommandContext<B: Backend> {
    // list before allocator: a list must not outlive its backing memory
    list: B::CommandList,
    allocator: B::CommandAllocator,
    kind: QueueKind,
}

impl<B: Backend> CommandContext<B> {
    pub fn new(device: &B::Device, kind: QueueKind) -> Result<Self, GpuError> {
        let allocator = device.create_command_allocator(kind)?;
        let list = device.create_command_list(kind, &allocator)?;
        Ok(Self {
            list,
            allocator,
            kind,
        })
    }

    /// Resets the allocator and reopens the list. Callers must know the GPU
    /// has finished every earlier submission of this list.
    pub fn reset(&mut self) -> Result<(), GpuError> {
        self.allocator.reset()?;
        self.list.reset(&self.allocator)
    }

    pub fn close(&mut self) -> Result<(), GpuError> {
        self.list.close()
    }

    pub fn list(&self) -> &B::CommandList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut B::CommandList {
        &mut self.list
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}
