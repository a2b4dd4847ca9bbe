//! Descriptor allocation and one-time buffer uploads.

use crate::backend::{
    Backend, BufferDesc, BufferUsage, CommandList, Descriptor, DescriptorHeapDesc,
    DescriptorHeapKind, Device, HeapType,
};
use crate::error::GpuError;
use crate::state::{ResourceState, Tracked};

/// Constant buffer sizes are multiples of this.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

pub fn align_to(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Hands out slots of one descriptor heap. Freed slots are reused first.
pub struct DescriptorAllocator<B: Backend> {
    heap: B::DescriptorHeap,
    capacity: u32,
    next: u32,
    free: Vec<u32>,
}

impl<B: Backend> DescriptorAllocator<B> {
    pub fn new(
        device: &B::Device,
        label: impl Into<String>,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<Self, GpuError> {
        let heap = device.create_descriptor_heap(&DescriptorHeapDesc {
            label: label.into(),
            kind,
            capacity,
            shader_visible,
        })?;
        Ok(Self {
            heap,
            capacity,
            next: 0,
            free: Vec::new(),
        })
    }

    pub fn allocate(&mut self) -> Result<Descriptor<B>, GpuError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.next < self.capacity => {
                self.next += 1;
                self.next - 1
            }
            None => {
                return Err(GpuError::DescriptorHeapFull {
                    capacity: self.capacity,
                });
            }
        };
        Ok(Descriptor {
            heap: self.heap.clone(),
            index,
        })
    }

    pub fn free(&mut self, descriptor: Descriptor<B>) {
        debug_assert!(descriptor.index < self.next, "freeing unallocated descriptor");
        debug_assert!(!self.free.contains(&descriptor.index), "double free");
        self.free.push(descriptor.index);
    }

    pub fn heap(&self) -> &B::DescriptorHeap {
        &self.heap
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn allocated(&self) -> u32 {
        self.next - self.free.len() as u32
    }
}

/// A default-heap buffer filled through a staging copy.
///
/// `staging` must stay alive until the recorded copy has executed.
pub struct UploadedBuffer<B: Backend> {
    pub buffer: Tracked<B>,
    pub staging: B::Resource,
}

/// Creates a GPU-local buffer holding `data`.
///
/// Records the staging copy and the transition from copy-destination to
/// `final_state` into `list`; nothing reaches the GPU until the list runs.
pub fn upload_buffer<B: Backend>(
    device: &B::Device,
    list: &mut B::CommandList,
    label: &str,
    data: &[u8],
    usage: BufferUsage,
    final_state: ResourceState,
) -> Result<UploadedBuffer<B>, GpuError> {
    let size = data.len() as u64;
    let buffer = device.create_buffer(
        &BufferDesc {
            label: label.to_owned(),
            size,
            usage,
            heap: HeapType::Default,
        },
        ResourceState::CopyDest,
    )?;
    let staging = device.create_buffer(
        &BufferDesc {
            label: format!("{label} (staging)"),
            size,
            usage,
            heap: HeapType::Upload,
        },
        ResourceState::GenericRead,
    )?;
    device.write_buffer(&staging, 0, data)?;

    list.copy_buffer(&buffer, &staging, size);
    let mut buffer = Tracked::new(buffer, ResourceState::CopyDest, label);
    buffer.transition(list, final_state);

    tracing::debug!("uploading {size} bytes to '{label}'");
    Ok(UploadedBuffer { buffer, staging })
}

/// Creates a CPU-writable constant buffer of at least `size` bytes.
pub fn create_constant_buffer<B: Backend>(
    device: &B::Device,
    label: &str,
    size: u64,
) -> Result<B::Resource, GpuError> {
    device.create_buffer(
        &BufferDesc {
            label: label.to_owned(),
            size: align_to(size, CONSTANT_BUFFER_ALIGNMENT),
            usage: BufferUsage::Constant,
            heap: HeapType::Upload,
        },
        ResourceState::GenericRead,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, CommandAllocator, QueueKind, Queue};
    use crate::headless::{Command, Headless, HeadlessAdapter};

    #[test]
    fn align_rounds_up_to_multiple() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(64, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn allocator_reuses_freed_slots_and_reports_full() {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let mut heap = DescriptorAllocator::<Headless>::new(
            &device,
            "test heap",
            DescriptorHeapKind::Resource,
            2,
            true,
        )
        .unwrap();

        let a = heap.allocate().unwrap();
        let b = heap.allocate().unwrap();
        assert_eq!((a.index, b.index), (0, 1));
        assert!(matches!(
            heap.allocate(),
            Err(GpuError::DescriptorHeapFull { capacity: 2 })
        ));

        heap.free(a);
        assert_eq!(heap.allocated(), 1);
        assert_eq!(heap.allocate().unwrap().index, 0);
    }

    #[test]
    fn upload_records_copy_then_transition() {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let queue = device.create_command_queue(QueueKind::Direct).unwrap();
        let fence = device.create_fence(0).unwrap();
        let allocator = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut list = device
            .create_command_list(QueueKind::Direct, &allocator)
            .unwrap();
        allocator.reset().unwrap();
        list.reset(&allocator).unwrap();

        let data: Vec<u8> = (0..16).collect();
        let uploaded = upload_buffer::<Headless>(
            &device,
            &mut list,
            "indices",
            &data,
            BufferUsage::Index,
            ResourceState::IndexBuffer,
        )
        .unwrap();

        assert_eq!(uploaded.buffer.state(), ResourceState::IndexBuffer);
        assert!(matches!(list.commands()[0], Command::CopyBuffer { size: 16, .. }));
        assert!(matches!(
            list.commands()[1],
            Command::Barrier {
                before: ResourceState::CopyDest,
                after: ResourceState::IndexBuffer,
                ..
            }
        ));

        // contents only land once the copy executes
        assert_eq!(uploaded.buffer.resource().contents(), vec![0; 16]);
        list.close().unwrap();
        queue.execute_command_lists(&[&list]).unwrap();
        queue.signal(&fence, 1).unwrap();
        device.drain();
        assert_eq!(uploaded.buffer.resource().contents(), data);
    }

    #[test]
    fn constant_buffers_are_aligned_upload_buffers() {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let cbuffer = create_constant_buffer::<Headless>(&device, "scene", 64).unwrap();
        assert!(matches!(
            cbuffer.kind(),
            crate::headless::ResourceKind::Buffer {
                size: 256,
                heap: HeapType::Upload,
                ..
            }
        ));
        device.write_buffer(&cbuffer, 0, &[1; 64]).unwrap();
        assert!(matches!(
            device.write_buffer(&cbuffer, 200, &[1; 64]),
            Err(GpuError::WriteOutOfBounds { .. })
        ));
    }
}
