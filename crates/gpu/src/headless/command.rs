use super::Headless;
use super::resource::{HeadlessDescriptorHeap, HeadlessPipeline, HeadlessResource};
use super::sim::SharedSim;
use crate::backend::{
    CommandAllocator, CommandList, Descriptor, DescriptorHeap, IndexFormat, QueueKind,
};
use crate::error::GpuError;
use crate::state::ResourceState;
use prism_common::{ScissorRect, Viewport};

/// A recorded command, kept for inspection after the list closes.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Barrier {
        resource: u64,
        before: ResourceState,
        after: ResourceState,
    },
    CopyBuffer {
        dst: HeadlessResource,
        src: HeadlessResource,
        size: u64,
    },
    ClearRenderTarget {
        heap: u64,
        index: u32,
        color: [f32; 4],
    },
    ClearDepth {
        heap: u64,
        index: u32,
        depth: f32,
    },
    SetPipeline {
        label: String,
    },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    SetRenderTargets {
        rtv: (u64, u32),
        dsv: Option<(u64, u32)>,
    },
    SetDescriptorHeap {
        heap: u64,
    },
    SetRootConstants(Vec<u32>),
    SetIndexBuffer {
        resource: u64,
        format: IndexFormat,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
}

pub struct HeadlessCommandAllocator {
    pub(crate) sim: SharedSim,
    pub(crate) id: usize,
    pub(crate) kind: QueueKind,
}

impl HeadlessCommandAllocator {
    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

impl CommandAllocator for HeadlessCommandAllocator {
    fn reset(&self) -> Result<(), GpuError> {
        let mut sim = self.sim.lock();
        let in_flight = sim.allocators[self.id].in_flight;
        if in_flight > 0 {
            sim.report(format!(
                "allocator {} reset with {in_flight} submissions in flight",
                self.id
            ));
            return Err(GpuError::AllocatorInUse);
        }
        sim.stats.allocator_resets += 1;
        Ok(())
    }
}

pub struct HeadlessCommandList {
    pub(crate) sim: SharedSim,
    pub(crate) kind: QueueKind,
    pub(crate) allocator: usize,
    pub(crate) open: bool,
    pub(crate) commands: Vec<Command>,
}

impl HeadlessCommandList {
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Commands recorded since the last reset.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn record(&mut self, command: Command) {
        if !self.open {
            self.sim
                .lock()
                .report(format!("{command:?} recorded into a closed list"));
        }
        self.commands.push(command);
    }
}

fn slot(descriptor: &Descriptor<Headless>) -> (u64, u32) {
    (descriptor.heap.id(), descriptor.index)
}

impl CommandList<Headless> for HeadlessCommandList {
    fn reset(&mut self, allocator: &HeadlessCommandAllocator) -> Result<(), GpuError> {
        if self.open {
            return Err(GpuError::ListOpen);
        }
        self.allocator = allocator.id;
        self.commands.clear();
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), GpuError> {
        if !self.open {
            return Err(GpuError::ListNotOpen);
        }
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn resource_barrier(
        &mut self,
        resource: &HeadlessResource,
        before: ResourceState,
        after: ResourceState,
    ) {
        let actual = resource.swap_state(after);
        if actual != before {
            self.sim.lock().report(format!(
                "barrier on '{}' claims {before:?} but resource is in {actual:?}",
                resource.label()
            ));
        }
        self.record(Command::Barrier {
            resource: resource.id(),
            before,
            after,
        });
    }

    fn copy_buffer(&mut self, dst: &HeadlessResource, src: &HeadlessResource, size: u64) {
        if dst.state() != ResourceState::CopyDest {
            self.sim.lock().report(format!(
                "copy into '{}' while in {:?}",
                dst.label(),
                dst.state()
            ));
        }
        self.record(Command::CopyBuffer {
            dst: dst.clone(),
            src: src.clone(),
            size,
        });
    }

    fn clear_render_target(&mut self, rtv: &Descriptor<Headless>, color: [f32; 4]) {
        let (heap, index) = slot(rtv);
        self.record(Command::ClearRenderTarget { heap, index, color });
    }

    fn clear_depth(&mut self, dsv: &Descriptor<Headless>, depth: f32) {
        let (heap, index) = slot(dsv);
        self.record(Command::ClearDepth { heap, index, depth });
    }

    fn set_pipeline(&mut self, pipeline: &HeadlessPipeline) {
        self.record(Command::SetPipeline {
            label: pipeline.info.label.clone(),
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.record(Command::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, rect: &ScissorRect) {
        self.record(Command::SetScissor(*rect));
    }

    fn set_render_targets(&mut self, rtv: &Descriptor<Headless>, dsv: Option<&Descriptor<Headless>>) {
        self.record(Command::SetRenderTargets {
            rtv: slot(rtv),
            dsv: dsv.map(slot),
        });
    }

    fn set_descriptor_heap(&mut self, heap: &HeadlessDescriptorHeap) {
        if !heap.desc().shader_visible {
            self.sim
                .lock()
                .report(format!("heap '{}' bound but not shader visible", heap.desc().label));
        }
        self.record(Command::SetDescriptorHeap { heap: heap.id() });
    }

    fn set_root_constants(&mut self, constants: &[u32]) {
        self.record(Command::SetRootConstants(constants.to_vec()));
    }

    fn set_index_buffer(&mut self, buffer: &HeadlessResource, format: IndexFormat) {
        if buffer.state() != ResourceState::IndexBuffer {
            self.sim.lock().report(format!(
                "index buffer '{}' bound while in {:?}",
                buffer.label(),
                buffer.state()
            ));
        }
        self.record(Command::SetIndexBuffer {
            resource: buffer.id(),
            format,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.record(Command::DrawIndexed {
            index_count,
            instance_count,
        });
    }
}
