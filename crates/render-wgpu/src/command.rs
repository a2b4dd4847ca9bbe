use crate::Wgpu;
use crate::convert;
use crate::resource::{WgpuDescriptorHeap, WgpuPipeline, WgpuResource};
use parking_lot::Mutex;
use prism_common::{ScissorRect, Viewport};
use prism_gpu::{
    CommandAllocator, CommandList, Descriptor, DescriptorHeap, GpuError, IndexFormat, QueueKind,
    ResourceState, align_to,
};
use std::sync::Arc;

/// wgpu owns encoder memory, so there is nothing to reclaim.
pub struct WgpuCommandAllocator {
    pub(crate) kind: QueueKind,
}

impl WgpuCommandAllocator {
    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

impl CommandAllocator for WgpuCommandAllocator {
    fn reset(&self) -> Result<(), GpuError> {
        Ok(())
    }
}

enum Recorded {
    Copy {
        dst: WgpuResource,
        src: WgpuResource,
        size: u64,
    },
    ClearColor {
        target: Descriptor<Wgpu>,
        color: [f32; 4],
    },
    ClearDepth {
        target: Descriptor<Wgpu>,
        depth: f32,
    },
    Pipeline(WgpuPipeline),
    Viewport(Viewport),
    Scissor(ScissorRect),
    Targets {
        rtv: Descriptor<Wgpu>,
        dsv: Option<Descriptor<Wgpu>>,
    },
    Heap(WgpuDescriptorHeap),
    RootConstants(Vec<u32>),
    IndexBuffer {
        buffer: WgpuResource,
        format: IndexFormat,
    },
    Draw {
        index_count: u32,
        instance_count: u32,
    },
}

/// Records commands and encodes them into a wgpu command buffer on close.
pub struct WgpuCommandList {
    device: Arc<wgpu::Device>,
    kind: QueueKind,
    open: bool,
    recorded: Vec<Recorded>,
    encoded: Mutex<Option<wgpu::CommandBuffer>>,
}

impl WgpuCommandList {
    pub(crate) fn new(device: Arc<wgpu::Device>, kind: QueueKind) -> Self {
        Self {
            device,
            kind,
            open: false,
            recorded: Vec::new(),
            encoded: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// The command buffer produced by the last close. A list executes once
    /// per close.
    pub(crate) fn take_encoded(&self) -> Result<wgpu::CommandBuffer, GpuError> {
        self.encoded.lock().take().ok_or_else(|| {
            GpuError::call(
                "execute_command_lists",
                format!("{} list was not closed since its last submission", self.kind.name()),
            )
        })
    }

    fn record(&mut self, command: Recorded) {
        debug_assert!(self.open, "recording into a closed command list");
        self.recorded.push(command);
    }

    fn encode(&self) -> Result<wgpu::CommandBuffer, GpuError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(self.kind.name()),
            });
        let mut state = PassState::default();

        for command in &self.recorded {
            match command {
                Recorded::Copy { dst, src, size } => {
                    encoder.copy_buffer_to_buffer(
                        src.buffer()?,
                        0,
                        dst.buffer()?,
                        0,
                        align_to(*size, wgpu::COPY_BUFFER_ALIGNMENT),
                    );
                }
                Recorded::ClearColor { target, color } => {
                    if let Some((pending, _)) = &state.color_clear {
                        if !same_slot(pending, target) {
                            flush_clears(&mut encoder, &mut state)?;
                        }
                    }
                    state.color_clear = Some((target.clone(), *color));
                }
                Recorded::ClearDepth { target, depth } => {
                    if let Some((pending, _)) = &state.depth_clear {
                        if !same_slot(pending, target) {
                            flush_clears(&mut encoder, &mut state)?;
                        }
                    }
                    state.depth_clear = Some((target.clone(), *depth));
                }
                Recorded::Pipeline(pipeline) => state.pipeline = Some(pipeline.clone()),
                Recorded::Viewport(viewport) => state.viewport = Some(*viewport),
                Recorded::Scissor(rect) => state.scissor = Some(*rect),
                Recorded::Targets { rtv, dsv } => {
                    state.targets = Some((rtv.clone(), dsv.clone()));
                }
                Recorded::Heap(heap) => state.heap = Some(heap.clone()),
                Recorded::RootConstants(constants) => state.root_constants = constants.clone(),
                Recorded::IndexBuffer { buffer, format } => {
                    state.index_buffer = Some((buffer.clone(), *format));
                }
                Recorded::Draw {
                    index_count,
                    instance_count,
                } => self.encode_draw(&mut encoder, &mut state, *index_count, *instance_count)?,
            }
        }
        // clears with no draw after them still land
        flush_clears(&mut encoder, &mut state)?;
        Ok(encoder.finish())
    }

    fn encode_draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        state: &mut PassState,
        index_count: u32,
        instance_count: u32,
    ) -> Result<(), GpuError> {
        let missing = |what: &str| GpuError::call("draw_indexed", format!("no {what} bound"));
        let (rtv, dsv) = state.targets.clone().ok_or_else(|| missing("render target"))?;
        let pipeline = state.pipeline.clone().ok_or_else(|| missing("pipeline"))?;
        let heap = state.heap.clone().ok_or_else(|| missing("descriptor heap"))?;
        let (index_buffer, index_format) =
            state.index_buffer.clone().ok_or_else(|| missing("index buffer"))?;

        // clears aimed at other targets run in their own passes first
        let color_load = take_clear(&mut state.color_clear, &rtv)
            .map_or(wgpu::LoadOp::Load, |color| {
                wgpu::LoadOp::Clear(convert::clear_color(color))
            });
        let depth_load = match &dsv {
            Some(dsv) => take_clear(&mut state.depth_clear, dsv)
                .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            None => wgpu::LoadOp::Load,
        };
        flush_clears(encoder, state)?;

        let color_view = rtv.heap.view(rtv.index)?.attachment()?.attachment_view()?;
        let depth_view = dsv
            .as_ref()
            .map(|dsv| dsv.heap.view(dsv.index)?.attachment()?.attachment_view())
            .transpose()?;
        let bind_group = self.bind_group(&pipeline, &heap, &state.root_constants)?;

        let mut pass = begin_pass(
            encoder,
            "draw",
            Some((&color_view, color_load)),
            depth_view.as_ref().map(|view| (view, depth_load)),
        );
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_index_buffer(
            index_buffer.buffer()?.slice(..),
            convert::index_format(index_format),
        );
        if let Some(viewport) = state.viewport {
            pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
        }
        if let Some(rect) = state.scissor {
            pass.set_scissor_rect(rect.left, rect.top, rect.width(), rect.height());
        }
        pass.draw_indexed(0..index_count, 0, 0..instance_count);
        Ok(())
    }

    /// Binds heap slot `root_constants[i]` at binding `i` of group 0.
    fn bind_group(
        &self,
        pipeline: &WgpuPipeline,
        heap: &WgpuDescriptorHeap,
        root_constants: &[u32],
    ) -> Result<wgpu::BindGroup, GpuError> {
        let views = root_constants
            .iter()
            .map(|&index| heap.view(index))
            .collect::<Result<Vec<_>, _>>()?;
        let entries = views
            .iter()
            .enumerate()
            .map(|(binding, view)| {
                Ok(wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: view.binding()?,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;
        let layout = pipeline.pipeline.get_bind_group_layout(0);
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&heap.desc().label),
            layout: &layout,
            entries: &entries,
        }))
    }
}

#[derive(Default)]
struct PassState {
    color_clear: Option<(Descriptor<Wgpu>, [f32; 4])>,
    depth_clear: Option<(Descriptor<Wgpu>, f32)>,
    pipeline: Option<WgpuPipeline>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    targets: Option<(Descriptor<Wgpu>, Option<Descriptor<Wgpu>>)>,
    heap: Option<WgpuDescriptorHeap>,
    root_constants: Vec<u32>,
    index_buffer: Option<(WgpuResource, IndexFormat)>,
}

fn same_slot(a: &Descriptor<Wgpu>, b: &Descriptor<Wgpu>) -> bool {
    a.heap.same_heap(&b.heap) && a.index == b.index
}

fn take_clear<T>(pending: &mut Option<(Descriptor<Wgpu>, T)>, target: &Descriptor<Wgpu>) -> Option<T> {
    match pending.take() {
        Some((slot, value)) if same_slot(&slot, target) => Some(value),
        other => {
            *pending = other;
            None
        }
    }
}

/// Encodes pending clears as passes with no draws.
fn flush_clears(encoder: &mut wgpu::CommandEncoder, state: &mut PassState) -> Result<(), GpuError> {
    if let Some((target, color)) = state.color_clear.take() {
        let view = target.heap.view(target.index)?.attachment()?.attachment_view()?;
        let load = wgpu::LoadOp::Clear(convert::clear_color(color));
        begin_pass(encoder, "clear color", Some((&view, load)), None);
    }
    if let Some((target, depth)) = state.depth_clear.take() {
        let view = target.heap.view(target.index)?.attachment()?.attachment_view()?;
        begin_pass(encoder, "clear depth", None, Some((&view, wgpu::LoadOp::Clear(depth))));
    }
    Ok(())
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    color: Option<(&wgpu::TextureView, wgpu::LoadOp<wgpu::Color>)>,
    depth: Option<(&wgpu::TextureView, wgpu::LoadOp<f32>)>,
) -> wgpu::RenderPass<'e> {
    let color_attachment = color.map(|(view, load)| wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
    });
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[color_attachment],
        depth_stencil_attachment: depth.map(|(view, load)| {
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }
        }),
        ..Default::default()
    })
}

impl CommandList<Wgpu> for WgpuCommandList {
    fn reset(&mut self, _allocator: &WgpuCommandAllocator) -> Result<(), GpuError> {
        if self.open {
            return Err(GpuError::ListOpen);
        }
        self.recorded.clear();
        self.encoded.lock().take();
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), GpuError> {
        if !self.open {
            return Err(GpuError::ListNotOpen);
        }
        self.open = false;
        let encoded = self.encode()?;
        *self.encoded.lock() = Some(encoded);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn resource_barrier(
        &mut self,
        resource: &WgpuResource,
        before: ResourceState,
        after: ResourceState,
    ) {
        tracing::trace!(resource = resource.label(), ?before, ?after, "barrier");
    }

    fn copy_buffer(&mut self, dst: &WgpuResource, src: &WgpuResource, size: u64) {
        self.record(Recorded::Copy {
            dst: dst.clone(),
            src: src.clone(),
            size,
        });
    }

    fn clear_render_target(&mut self, rtv: &Descriptor<Wgpu>, color: [f32; 4]) {
        self.record(Recorded::ClearColor {
            target: rtv.clone(),
            color,
        });
    }

    fn clear_depth(&mut self, dsv: &Descriptor<Wgpu>, depth: f32) {
        self.record(Recorded::ClearDepth {
            target: dsv.clone(),
            depth,
        });
    }

    fn set_pipeline(&mut self, pipeline: &WgpuPipeline) {
        self.record(Recorded::Pipeline(pipeline.clone()));
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.record(Recorded::Viewport(*viewport));
    }

    fn set_scissor(&mut self, rect: &ScissorRect) {
        self.record(Recorded::Scissor(*rect));
    }

    fn set_render_targets(&mut self, rtv: &Descriptor<Wgpu>, dsv: Option<&Descriptor<Wgpu>>) {
        self.record(Recorded::Targets {
            rtv: rtv.clone(),
            dsv: dsv.cloned(),
        });
    }

    fn set_descriptor_heap(&mut self, heap: &WgpuDescriptorHeap) {
        self.record(Recorded::Heap(heap.clone()));
    }

    fn set_root_constants(&mut self, constants: &[u32]) {
        self.record(Recorded::RootConstants(constants.to_vec()));
    }

    fn set_index_buffer(&mut self, buffer: &WgpuResource, format: IndexFormat) {
        self.record(Recorded::IndexBuffer {
            buffer: buffer.clone(),
            format,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.record(Recorded::Draw {
            index_count,
            instance_count,
        });
    }
}
