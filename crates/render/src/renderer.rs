use crate::camera::FlyCamera;
use crate::error::RenderError;
use crate::mesh::CubeMesh;
use crate::shaders::ShaderBlobs;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};
use prism_common::{Extent2d, ScissorRect};
use prism_gpu::{
    Backend, BufferSrvDesc, BufferUsage, CommandList, DEPTH_FORMAT, DescriptorAllocator,
    DescriptorHeapKind, Device, FrameOutcome, GraphicsContext, IndexFormat, PipelineDesc,
    ResourceState, Tracked, create_constant_buffer, upload_buffer,
};
use std::mem::size_of;

/// Descriptors in each frame slot's shader-visible heap.
pub const FRAME_HEAP_CAPACITY: u32 = 512;

/// Scene constants, one copy per frame slot.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneConstants {
    pub view_projection: [[f32; 4]; 4],
}

/// Heap indices the shaders fetch their inputs through.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct PerDrawConstants {
    pub position_buffer_idx: u32,
    pub uv_buffer_idx: u32,
    pub scene_cbuffer_idx: u32,
}

impl PerDrawConstants {
    pub const COUNT: u32 = (size_of::<Self>() / size_of::<u32>()) as u32;
}

/// Resources owned by one in-flight frame slot.
struct FrameResources<B: Backend> {
    heap: DescriptorAllocator<B>,
    scene_cbuffer: B::Resource,
    constants: PerDrawConstants,
}

/// Draws the cube once per frame into the current back buffer.
pub struct Renderer<B: Backend> {
    frames: Vec<FrameResources<B>>,
    index_buffer: Tracked<B>,
    position_buffer: Tracked<B>,
    uv_buffer: Tracked<B>,
    pipeline: B::Pipeline,
    clear_color: [f32; 4],
    frames_rendered: u64,
    ctx: GraphicsContext<B>,
}

impl<B: Backend> Renderer<B> {
    /// Uploads the cube, builds per-slot heaps and the pipeline, and waits for
    /// the uploads to land.
    pub fn new(
        mut ctx: GraphicsContext<B>,
        shaders: &ShaderBlobs,
        clear_color: [f32; 4],
    ) -> Result<Self, RenderError> {
        let _span = tracing::info_span!("renderer_init").entered();

        ctx.begin_frame()?;
        let (device, list) = ctx.device_and_list();

        let index = upload_buffer::<B>(
            device,
            list,
            "cube indices",
            CubeMesh::index_bytes(),
            BufferUsage::Index,
            ResourceState::IndexBuffer,
        )?;
        let positions = upload_buffer::<B>(
            device,
            list,
            "cube positions",
            CubeMesh::position_bytes(),
            BufferUsage::Vertex,
            ResourceState::VertexAndConstantBuffer,
        )?;
        let uvs = upload_buffer::<B>(
            device,
            list,
            "cube uvs",
            CubeMesh::uv_bytes(),
            BufferUsage::Vertex,
            ResourceState::VertexAndConstantBuffer,
        )?;

        let frames = (0..ctx.buffer_count())
            .map(|slot| {
                create_frame_resources(
                    ctx.device(),
                    slot,
                    positions.buffer.resource(),
                    uvs.buffer.resource(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pipeline = ctx.device().create_pipeline(&PipelineDesc {
            label: "cube pipeline",
            vertex_shader: &shaders.vertex,
            pixel_shader: &shaders.pixel,
            render_target_format: ctx.back_buffer_format(),
            depth_format: DEPTH_FORMAT,
            root_constants: PerDrawConstants::COUNT,
        })?;

        ctx.submit_current()?;
        ctx.flush_all_queues()?;
        // staging buffers are safe to release once the copies have run
        drop((index.staging, positions.staging, uvs.staging));

        tracing::info!(slots = frames.len(), "renderer ready");
        Ok(Self {
            frames,
            index_buffer: index.buffer,
            position_buffer: positions.buffer,
            uv_buffer: uvs.buffer,
            pipeline,
            clear_color,
            frames_rendered: 0,
            ctx,
        })
    }

    /// Resets the current slot and records the clear and the cube draw.
    /// Nothing reaches the GPU until [`present`](Self::present).
    pub fn render(&mut self, camera: &FlyCamera) -> Result<(), RenderError> {
        self.ctx.begin_frame()?;
        let slot = self.ctx.back_buffer_index() as usize;
        self.ctx
            .transition_back_buffer(ResourceState::Present, ResourceState::RenderTarget);

        let frame = &self.frames[slot];
        let scene = SceneConstants {
            view_projection: camera.view_projection().to_cols_array_2d(),
        };
        self.ctx
            .device()
            .write_buffer(&frame.scene_cbuffer, 0, bytemuck::bytes_of(&scene))?;

        let rtv = self.ctx.back_buffer_rtv();
        let dsv = self.ctx.depth_dsv();
        let viewport = self.ctx.viewport();
        let scissor = ScissorRect::from(&viewport);

        let list = self.ctx.command_list_mut();
        list.clear_render_target(&rtv, self.clear_color);
        list.clear_depth(&dsv, 1.0);
        list.set_pipeline(&self.pipeline);
        list.set_index_buffer(self.index_buffer.resource(), IndexFormat::Uint32);
        list.set_viewport(&viewport);
        list.set_scissor(&scissor);
        list.set_render_targets(&rtv, Some(&dsv));
        list.set_descriptor_heap(frame.heap.heap());
        list.set_root_constants(bytemuck::cast_slice(std::slice::from_ref(&frame.constants)));
        list.draw_indexed(CubeMesh::INDEX_COUNT, 1);
        Ok(())
    }

    /// Transitions the back buffer for presentation, submits the frame and
    /// presents it, pacing the CPU against the GPU.
    pub fn present(&mut self) -> Result<FrameOutcome, RenderError> {
        self.ctx
            .transition_back_buffer(ResourceState::RenderTarget, ResourceState::Present);
        self.ctx.submit_current()?;
        let outcome = self.ctx.present()?;
        self.frames_rendered += 1;
        Ok(outcome)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.ctx.resize(Extent2d::new(width, height))?;
        Ok(())
    }

    pub fn context(&self) -> &GraphicsContext<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut GraphicsContext<B> {
        &mut self.ctx
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn per_draw_constants(&self, slot: u32) -> PerDrawConstants {
        self.frames[slot as usize].constants
    }

    pub fn scene_cbuffer(&self, slot: u32) -> &B::Resource {
        &self.frames[slot as usize].scene_cbuffer
    }

    pub fn index_buffer(&self) -> &Tracked<B> {
        &self.index_buffer
    }

    pub fn vertex_buffers(&self) -> (&Tracked<B>, &Tracked<B>) {
        (&self.position_buffer, &self.uv_buffer)
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if self.ctx.is_initialized() {
            if let Err(err) = self.ctx.flush_all_queues() {
                tracing::error!("failed to drain queues before releasing renderer: {err}");
            }
        }
    }
}

fn create_frame_resources<B: Backend>(
    device: &B::Device,
    slot: u32,
    positions: &B::Resource,
    uvs: &B::Resource,
) -> Result<FrameResources<B>, RenderError> {
    let mut heap = DescriptorAllocator::new(
        device,
        format!("frame {slot} resource heap"),
        DescriptorHeapKind::Resource,
        FRAME_HEAP_CAPACITY,
        true,
    )?;

    let position_srv = heap.allocate()?;
    device.create_shader_resource_view(
        positions,
        &BufferSrvDesc {
            first_element: 0,
            num_elements: CubeMesh::POSITIONS.len() as u32,
            stride: size_of::<Vec4>() as u32,
        },
        &position_srv,
    )?;

    let uv_srv = heap.allocate()?;
    device.create_shader_resource_view(
        uvs,
        &BufferSrvDesc {
            first_element: 0,
            num_elements: CubeMesh::UVS.len() as u32,
            stride: size_of::<Vec2>() as u32,
        },
        &uv_srv,
    )?;

    let scene_cbuffer = create_constant_buffer::<B>(
        device,
        &format!("frame {slot} scene constants"),
        size_of::<SceneConstants>() as u64,
    )?;
    let identity = SceneConstants {
        view_projection: Mat4::IDENTITY.to_cols_array_2d(),
    };
    device.write_buffer(&scene_cbuffer, 0, bytemuck::bytes_of(&identity))?;

    let scene_cbv = heap.allocate()?;
    device.create_constant_buffer_view(
        &scene_cbuffer,
        size_of::<SceneConstants>() as u64,
        &scene_cbv,
    )?;

    Ok(FrameResources {
        constants: PerDrawConstants {
            position_buffer_idx: position_srv.index,
            uv_buffer_idx: uv_srv.index,
            scene_cbuffer_idx: scene_cbv.index,
        },
        heap,
        scene_cbuffer,
    })
}
