use crate::swapchain::SurfaceTarget;
use parking_lot::Mutex;
use prism_common::Extent2d;
use prism_gpu::{
    BufferSrvDesc, DescriptorHeap, DescriptorHeapDesc, DescriptorHeapKind, Format, GpuError,
    HeapType,
};
use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

/// A window surface the swapchain presents to.
pub struct WgpuSurface {
    pub(crate) surface: Arc<wgpu::Surface<'static>>,
}

impl WgpuSurface {
    pub fn new(surface: wgpu::Surface<'static>) -> Self {
        Self {
            surface: Arc::new(surface),
        }
    }

    pub fn raw(&self) -> &wgpu::Surface<'static> {
        &self.surface
    }
}

pub(crate) enum ResourceKind {
    Buffer {
        buffer: wgpu::Buffer,
        /// Requested size; the allocation is rounded up for copy alignment.
        size: u64,
        heap: HeapType,
    },
    Texture {
        texture: wgpu::Texture,
        extent: Extent2d,
        format: Format,
    },
    BackBuffer {
        index: u32,
        target: Arc<SurfaceTarget>,
    },
}

/// A buffer, texture or back buffer. Clones share the resource.
#[derive(Clone)]
pub struct WgpuResource {
    inner: Arc<ResourceInner>,
}

struct ResourceInner {
    label: String,
    kind: ResourceKind,
}

impl WgpuResource {
    pub(crate) fn new(label: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                label: label.into(),
                kind,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub(crate) fn kind(&self) -> &ResourceKind {
        &self.inner.kind
    }

    pub(crate) fn buffer(&self) -> Result<&wgpu::Buffer, GpuError> {
        match &self.inner.kind {
            ResourceKind::Buffer { buffer, .. } => Ok(buffer),
            _ => Err(GpuError::call(
                "buffer access",
                format!("'{}' is not a buffer", self.inner.label),
            )),
        }
    }

    /// A view suitable for a render pass attachment. Acquires the surface
    /// texture when called on a back buffer.
    pub(crate) fn attachment_view(&self) -> Result<wgpu::TextureView, GpuError> {
        match &self.inner.kind {
            ResourceKind::Texture { texture, .. } => {
                Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
            ResourceKind::BackBuffer { target, .. } => target.acquire_view(),
            ResourceKind::Buffer { .. } => Err(GpuError::call(
                "attachment view",
                format!("buffer '{}' cannot be a render target", self.inner.label),
            )),
        }
    }

    pub fn same_resource(&self, other: &WgpuResource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for WgpuResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("WgpuResource");
        s.field("label", &self.inner.label);
        match &self.inner.kind {
            ResourceKind::Buffer { size, heap, .. } => s.field("size", size).field("heap", heap),
            ResourceKind::Texture { extent, format, .. } => {
                s.field("extent", extent).field("format", format)
            }
            ResourceKind::BackBuffer { index, .. } => s.field("back_buffer", index),
        };
        s.finish()
    }
}

#[derive(Clone)]
pub(crate) enum DescriptorView {
    RenderTarget(WgpuResource),
    DepthStencil(WgpuResource),
    ShaderResource {
        resource: WgpuResource,
        desc: BufferSrvDesc,
    },
    ConstantBuffer {
        resource: WgpuResource,
        size: u64,
    },
}

impl DescriptorView {
    /// The resource a render-target or depth-stencil descriptor points at.
    pub(crate) fn attachment(&self) -> Result<&WgpuResource, GpuError> {
        match self {
            DescriptorView::RenderTarget(resource) | DescriptorView::DepthStencil(resource) => {
                Ok(resource)
            }
            _ => Err(GpuError::call(
                "set_render_targets",
                "descriptor is not a render target or depth view",
            )),
        }
    }

    pub(crate) fn binding(&self) -> Result<wgpu::BindingResource<'_>, GpuError> {
        match self {
            DescriptorView::ShaderResource { resource, desc } => {
                let stride = desc.stride as u64;
                Ok(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: resource.buffer()?,
                    offset: desc.first_element * stride,
                    size: NonZeroU64::new(desc.num_elements as u64 * stride),
                }))
            }
            DescriptorView::ConstantBuffer { resource, size } => {
                Ok(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: resource.buffer()?,
                    offset: 0,
                    size: NonZeroU64::new(*size),
                }))
            }
            _ => Err(GpuError::call(
                "bind descriptors",
                "attachment descriptors cannot be bound to shaders",
            )),
        }
    }
}

/// Descriptor heap backed by a table of views. Clones share the table.
#[derive(Clone)]
pub struct WgpuDescriptorHeap {
    desc: Arc<DescriptorHeapDesc>,
    slots: Arc<Mutex<Vec<Option<DescriptorView>>>>,
}

impl WgpuDescriptorHeap {
    pub(crate) fn new(desc: DescriptorHeapDesc) -> Self {
        let slots = vec![None; desc.capacity as usize];
        Self {
            desc: Arc::new(desc),
            slots: Arc::new(Mutex::new(slots)),
        }
    }

    pub(crate) fn write(
        &self,
        index: u32,
        view: DescriptorView,
        expected: DescriptorHeapKind,
    ) -> Result<(), GpuError> {
        if self.desc.kind != expected {
            return Err(GpuError::call(
                "write descriptor",
                format!(
                    "{expected:?} view written into {:?} heap '{}'",
                    self.desc.kind, self.desc.label
                ),
            ));
        }
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(index as usize)
            .ok_or(GpuError::InvalidDescriptor {
                index,
                capacity: self.desc.capacity,
            })?;
        *slot = Some(view);
        Ok(())
    }

    pub(crate) fn view(&self, index: u32) -> Result<DescriptorView, GpuError> {
        self.slots
            .lock()
            .get(index as usize)
            .cloned()
            .flatten()
            .ok_or(GpuError::InvalidDescriptor {
                index,
                capacity: self.desc.capacity,
            })
    }

    pub(crate) fn same_heap(&self, other: &WgpuDescriptorHeap) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

impl DescriptorHeap for WgpuDescriptorHeap {
    fn desc(&self) -> &DescriptorHeapDesc {
        &self.desc
    }
}

/// A compiled render pipeline. Clones share it.
#[derive(Clone)]
pub struct WgpuPipeline {
    pub(crate) label: Arc<str>,
    pub(crate) pipeline: Arc<wgpu::RenderPipeline>,
}

impl WgpuPipeline {
    pub fn label(&self) -> &str {
        &self.label
    }
}
