use crate::backend::{
    BufferSrvDesc, BufferUsage, DescriptorHeap, DescriptorHeapDesc, Format, HeapType,
};
use crate::error::GpuError;
use crate::state::ResourceState;
use parking_lot::Mutex;
use prism_common::Extent2d;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer {
        size: u64,
        usage: BufferUsage,
        heap: HeapType,
    },
    Texture {
        extent: Extent2d,
        format: Format,
    },
    BackBuffer {
        index: u32,
        extent: Extent2d,
        format: Format,
    },
}

/// Simulated buffer or texture. Clones share the resource.
#[derive(Clone)]
pub struct HeadlessResource {
    inner: Arc<ResourceInner>,
}

struct ResourceInner {
    id: u64,
    label: String,
    kind: ResourceKind,
    state: Mutex<ResourceState>,
    data: Mutex<Vec<u8>>,
}

impl HeadlessResource {
    pub(crate) fn new(id: u64, label: String, kind: ResourceKind, state: ResourceState) -> Self {
        let len = match &kind {
            ResourceKind::Buffer { size, .. } => *size as usize,
            _ => 0,
        };
        Self {
            inner: Arc::new(ResourceInner {
                id,
                label,
                kind,
                state: Mutex::new(state),
                data: Mutex::new(vec![0; len]),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.inner.kind
    }

    /// State as of the last recorded barrier.
    pub fn state(&self) -> ResourceState {
        *self.inner.state.lock()
    }

    pub fn extent(&self) -> Option<Extent2d> {
        match self.inner.kind {
            ResourceKind::Texture { extent, .. } | ResourceKind::BackBuffer { extent, .. } => {
                Some(extent)
            }
            ResourceKind::Buffer { .. } => None,
        }
    }

    /// Current buffer contents as seen by the GPU.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.data.lock().clone()
    }

    pub(crate) fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Applies a barrier, returning the state the resource was really in.
    pub(crate) fn swap_state(&self, after: ResourceState) -> ResourceState {
        std::mem::replace(&mut *self.inner.state.lock(), after)
    }

    pub(crate) fn write(&self, offset: u64, bytes: &[u8]) -> Result<(), GpuError> {
        let ResourceKind::Buffer { size, heap, .. } = self.inner.kind else {
            return Err(GpuError::NotCpuVisible);
        };
        if heap != HeapType::Upload {
            return Err(GpuError::NotCpuVisible);
        }
        let len = bytes.len() as u64;
        if offset + len > size {
            return Err(GpuError::WriteOutOfBounds { offset, len, size });
        }
        let start = offset as usize;
        self.inner.data.lock()[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn copy_from(&self, src: &HeadlessResource, size: u64) {
        let bytes = src.inner.data.lock()[..size as usize].to_vec();
        self.inner.data.lock()[..size as usize].copy_from_slice(&bytes);
    }
}

impl PartialEq for HeadlessResource {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for HeadlessResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessResource")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .finish()
    }
}

/// A view written into a descriptor heap slot.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorView {
    RenderTarget { resource: u64, extent: Extent2d },
    DepthStencil { resource: u64, extent: Extent2d },
    ShaderResource { resource: u64, desc: BufferSrvDesc },
    ConstantBuffer { resource: u64, size: u64 },
}

#[derive(Clone)]
pub struct HeadlessDescriptorHeap {
    inner: Arc<HeapInner>,
}

struct HeapInner {
    id: u64,
    desc: DescriptorHeapDesc,
    slots: Mutex<Vec<Option<DescriptorView>>>,
}

impl HeadlessDescriptorHeap {
    pub(crate) fn new(id: u64, desc: DescriptorHeapDesc) -> Self {
        let slots = vec![None; desc.capacity as usize];
        Self {
            inner: Arc::new(HeapInner {
                id,
                desc,
                slots: Mutex::new(slots),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn view(&self, index: u32) -> Option<DescriptorView> {
        self.inner.slots.lock().get(index as usize).cloned().flatten()
    }

    pub(crate) fn write(&self, index: u32, view: DescriptorView) -> Result<(), GpuError> {
        let mut slots = self.inner.slots.lock();
        let capacity = slots.len() as u32;
        let slot = slots
            .get_mut(index as usize)
            .ok_or(GpuError::InvalidDescriptor { index, capacity })?;
        *slot = Some(view);
        Ok(())
    }
}

impl DescriptorHeap for HeadlessDescriptorHeap {
    fn desc(&self) -> &DescriptorHeapDesc {
        &self.inner.desc
    }
}

impl fmt::Debug for HeadlessDescriptorHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessDescriptorHeap")
            .field("id", &self.inner.id)
            .field("label", &self.inner.desc.label)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub label: String,
    pub vertex_shader_len: usize,
    pub pixel_shader_len: usize,
    pub render_target_format: Format,
    pub depth_format: Format,
    pub root_constants: u32,
}

#[derive(Debug, Clone)]
pub struct HeadlessPipeline {
    pub info: Arc<PipelineInfo>,
}

/// Stand-in for a window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessSurface {
    pub extent: Extent2d,
}
