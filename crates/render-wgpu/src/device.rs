use crate::Wgpu;
use crate::command::{WgpuCommandAllocator, WgpuCommandList};
use crate::convert;
use crate::queue::{WgpuFence, WgpuQueue};
use crate::resource::{
    DescriptorView, ResourceKind, WgpuDescriptorHeap, WgpuPipeline, WgpuResource, WgpuSurface,
};
use crate::swapchain::{SurfaceTarget, WgpuSwapchain};
use prism_gpu::{
    Adapter, AdapterInfo, BufferDesc, BufferSrvDesc, Descriptor, DescriptorHeapDesc,
    DescriptorHeapKind, Device, GpuError, HeapType, PipelineDesc, QueueKind,
    ResourceState, SwapchainDesc, TextureDesc, align_to,
};
use std::sync::Arc;

/// Lists every adapter the instance can see, for diagnostics.
pub fn enumerate_adapters(instance: &wgpu::Instance) -> Vec<AdapterInfo> {
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|adapter| adapter_info(&adapter.get_info()))
        .collect()
}

fn adapter_info(info: &wgpu::AdapterInfo) -> AdapterInfo {
    AdapterInfo {
        name: info.name.clone(),
        backend: info.backend.to_str().to_owned(),
    }
}

pub struct WgpuAdapter {
    adapter: Arc<wgpu::Adapter>,
}

impl WgpuAdapter {
    /// Picks a high-performance adapter able to present to `surface`.
    pub fn request(instance: &wgpu::Instance, surface: Option<&WgpuSurface>) -> Result<Self, GpuError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface.map(|s| s.raw()),
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::AdapterNotFound)?;
        let info = adapter.get_info();
        tracing::info!(name = %info.name, backend = info.backend.to_str(), "selected adapter");
        Ok(Self {
            adapter: Arc::new(adapter),
        })
    }
}

impl Adapter<Wgpu> for WgpuAdapter {
    fn info(&self) -> AdapterInfo {
        adapter_info(&self.adapter.get_info())
    }

    fn create_device(&self) -> Result<WgpuDevice, GpuError> {
        let (device, queue) = pollster::block_on(self.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("prism_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|err| GpuError::DeviceCreation(err.to_string()))?;

        // validation failures outside an error scope have no caller to return to
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!("fatal wgpu error: {err}");
            std::process::abort();
        }));

        Ok(WgpuDevice {
            adapter: Arc::clone(&self.adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}

pub struct WgpuDevice {
    adapter: Arc<wgpu::Adapter>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuDevice {
    pub fn raw(&self) -> &wgpu::Device {
        &self.device
    }

    fn write_view(
        &self,
        dst: &Descriptor<Wgpu>,
        view: DescriptorView,
        kind: DescriptorHeapKind,
    ) -> Result<(), GpuError> {
        dst.heap.write(dst.index, view, kind)
    }
}

impl Device<Wgpu> for WgpuDevice {
    fn create_command_queue(&self, kind: QueueKind) -> Result<WgpuQueue, GpuError> {
        if kind != QueueKind::Direct {
            tracing::debug!("{} queue shares the device queue", kind.name());
        }
        Ok(WgpuQueue {
            kind,
            queue: Arc::clone(&self.queue),
        })
    }

    fn create_command_allocator(&self, kind: QueueKind) -> Result<WgpuCommandAllocator, GpuError> {
        Ok(WgpuCommandAllocator { kind })
    }

    fn create_command_list(
        &self,
        kind: QueueKind,
        _allocator: &WgpuCommandAllocator,
    ) -> Result<WgpuCommandList, GpuError> {
        Ok(WgpuCommandList::new(Arc::clone(&self.device), kind))
    }

    fn create_fence(&self, initial_value: u64) -> Result<WgpuFence, GpuError> {
        Ok(WgpuFence::new(Arc::clone(&self.device), initial_value))
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<WgpuDescriptorHeap, GpuError> {
        Ok(WgpuDescriptorHeap::new(desc.clone()))
    }

    fn create_buffer(
        &self,
        desc: &BufferDesc,
        _initial_state: ResourceState,
    ) -> Result<WgpuResource, GpuError> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size: align_to(desc.size.max(1), wgpu::COPY_BUFFER_ALIGNMENT),
            usage: convert::buffer_usages(desc.usage, desc.heap),
            mapped_at_creation: false,
        });
        Ok(WgpuResource::new(
            desc.label.clone(),
            ResourceKind::Buffer {
                buffer,
                size: desc.size,
                heap: desc.heap,
            },
        ))
    }

    fn create_texture(
        &self,
        desc: &TextureDesc,
        _initial_state: ResourceState,
    ) -> Result<WgpuResource, GpuError> {
        let extent = desc.extent.clamped();
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert::texture_format(desc.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Ok(WgpuResource::new(
            desc.label.clone(),
            ResourceKind::Texture {
                texture,
                extent,
                format: desc.format,
            },
        ))
    }

    fn write_buffer(&self, buffer: &WgpuResource, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let ResourceKind::Buffer {
            buffer: raw,
            size,
            heap,
        } = buffer.kind()
        else {
            return Err(GpuError::NotCpuVisible);
        };
        if *heap != HeapType::Upload {
            return Err(GpuError::NotCpuVisible);
        }
        let len = data.len() as u64;
        if offset + len > *size {
            return Err(GpuError::WriteOutOfBounds {
                offset,
                len,
                size: *size,
            });
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GpuError::call(
                "write_buffer",
                format!("write of {len} bytes at {offset} is not 4-byte aligned"),
            ));
        }
        self.queue.write_buffer(raw, offset, data);
        Ok(())
    }

    fn create_render_target_view(
        &self,
        resource: &WgpuResource,
        dst: &Descriptor<Wgpu>,
    ) -> Result<(), GpuError> {
        self.write_view(
            dst,
            DescriptorView::RenderTarget(resource.clone()),
            DescriptorHeapKind::RenderTarget,
        )
    }

    fn create_depth_stencil_view(
        &self,
        resource: &WgpuResource,
        dst: &Descriptor<Wgpu>,
    ) -> Result<(), GpuError> {
        self.write_view(
            dst,
            DescriptorView::DepthStencil(resource.clone()),
            DescriptorHeapKind::DepthStencil,
        )
    }

    fn create_shader_resource_view(
        &self,
        resource: &WgpuResource,
        desc: &BufferSrvDesc,
        dst: &Descriptor<Wgpu>,
    ) -> Result<(), GpuError> {
        self.write_view(
            dst,
            DescriptorView::ShaderResource {
                resource: resource.clone(),
                desc: *desc,
            },
            DescriptorHeapKind::Resource,
        )
    }

    fn create_constant_buffer_view(
        &self,
        resource: &WgpuResource,
        size: u64,
        dst: &Descriptor<Wgpu>,
    ) -> Result<(), GpuError> {
        self.write_view(
            dst,
            DescriptorView::ConstantBuffer {
                resource: resource.clone(),
                size,
            },
            DescriptorHeapKind::Resource,
        )
    }

    fn create_swapchain(
        &self,
        _queue: &WgpuQueue,
        surface: &WgpuSurface,
        desc: &SwapchainDesc,
    ) -> Result<WgpuSwapchain, GpuError> {
        let caps = surface.surface.get_capabilities(&self.adapter);
        let requested = convert::texture_format(desc.format);
        let (format, raw_format) = if caps.formats.contains(&requested) {
            (desc.format, requested)
        } else {
            caps.formats
                .iter()
                .find_map(|&raw| {
                    convert::format_from_wgpu(raw)
                        .filter(|format| !format.is_depth())
                        .map(|format| (format, raw))
                })
                .ok_or_else(|| {
                    GpuError::Surface(format!("no supported surface format in {:?}", caps.formats))
                })?
        };
        if format != desc.format {
            tracing::warn!(requested = ?desc.format, chosen = ?format, "surface format unavailable");
        }
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let extent = desc.extent.clamped();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: raw_format,
            width: extent.width,
            height: extent.height,
            present_mode: convert::present_mode(desc.present_mode),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffer_count,
        };
        tracing::info!(
            ?format,
            width = extent.width,
            height = extent.height,
            buffers = desc.buffer_count,
            "configured surface"
        );
        let target = SurfaceTarget::new(
            Arc::clone(&surface.surface),
            Arc::clone(&self.device),
            config,
        );
        Ok(WgpuSwapchain::new(
            Arc::new(target),
            format,
            desc.buffer_count,
            extent,
            desc.present_mode,
        ))
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<WgpuPipeline, GpuError> {
        let source = |stage: &str, blob: &[u8]| {
            std::str::from_utf8(blob)
                .map(str::to_owned)
                .map_err(|err| GpuError::Shader(format!("{stage} shader is not WGSL text: {err}")))
        };
        let vertex_source = source("vertex", desc.vertex_shader)?;
        let pixel_source = source("pixel", desc.pixel_shader)?;
        if vertex_source.trim().is_empty() || pixel_source.trim().is_empty() {
            return Err(GpuError::Shader(format!("'{}' has an empty shader blob", desc.label)));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vertex shader"),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let pixel = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixel shader"),
            source: wgpu::ShaderSource::Wgsl(pixel_source.into()),
        });
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                // derived from the shaders; bind group 0 holds the heap slots
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: None,
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &pixel,
                    entry_point: None,
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: convert::texture_format(desc.render_target_format),
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: convert::texture_format(desc.depth_format),
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::Shader(format!("'{}': {err}", desc.label)));
        }
        tracing::debug!(label = desc.label, "created pipeline");

        Ok(WgpuPipeline {
            label: Arc::from(desc.label),
            pipeline: Arc::new(pipeline),
        })
    }
}
