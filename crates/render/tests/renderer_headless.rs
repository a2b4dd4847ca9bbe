use prism_common::Extent2d;
use prism_gpu::headless::{Command, Headless, HeadlessAdapter, HeadlessSurface};
use prism_gpu::{ContextDesc, GpuError, GraphicsContext, QueueKind, ResourceState};
use prism_render::{CubeMesh, FlyCamera, PerDrawConstants, RenderError, Renderer, ShaderBlobs};

const CLEAR: [f32; 4] = [100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0, 1.0];

fn shaders() -> ShaderBlobs {
    ShaderBlobs::from_bytes(b"vertex blob".to_vec(), b"pixel blob".to_vec())
}

fn context(adapter: &HeadlessAdapter, buffer_count: u32) -> GraphicsContext<Headless> {
    let extent = Extent2d::new(1280, 720);
    GraphicsContext::new(
        adapter,
        &HeadlessSurface { extent },
        &ContextDesc {
            extent,
            buffer_count,
            ..ContextDesc::default()
        },
    )
    .unwrap()
}

fn renderer(adapter: &HeadlessAdapter, buffer_count: u32) -> Renderer<Headless> {
    Renderer::new(context(adapter, buffer_count), &shaders(), CLEAR).unwrap()
}

#[test]
fn construction_uploads_mesh_and_builds_slot_heaps() {
    let renderer = renderer(&HeadlessAdapter::new(), 2);

    let index = renderer.index_buffer();
    assert_eq!(index.state(), ResourceState::IndexBuffer);
    assert_eq!(index.resource().contents(), CubeMesh::index_bytes());

    let (positions, uvs) = renderer.vertex_buffers();
    assert_eq!(positions.state(), ResourceState::VertexAndConstantBuffer);
    assert_eq!(positions.resource().contents(), CubeMesh::position_bytes());
    assert_eq!(uvs.resource().contents(), CubeMesh::uv_bytes());

    for slot in 0..2 {
        assert_eq!(
            renderer.per_draw_constants(slot),
            PerDrawConstants {
                position_buffer_idx: 0,
                uv_buffer_idx: 1,
                scene_cbuffer_idx: 2,
            }
        );
    }

    let ctx = renderer.context();
    for kind in QueueKind::ALL {
        assert!(ctx.queues().get(kind).is_idle());
    }
    assert!(ctx.device().validation_messages().is_empty());
}

#[test]
fn frame_records_clear_bindings_and_one_draw() {
    let mut renderer = renderer(&HeadlessAdapter::new(), 2);
    let camera = FlyCamera::default();

    renderer.render(&camera).unwrap();
    let commands = renderer.context().command_list().commands().to_vec();

    assert!(matches!(
        commands[0],
        Command::Barrier {
            before: ResourceState::Present,
            after: ResourceState::RenderTarget,
            ..
        }
    ));
    assert!(
        commands
            .iter()
            .any(|c| matches!(c, Command::ClearRenderTarget { color, .. } if *color == CLEAR))
    );
    assert!(commands.contains(&Command::ClearDepth {
        heap: renderer.context().dsv_heap().id(),
        index: 0,
        depth: 1.0,
    }));
    assert!(commands.contains(&Command::SetRootConstants(vec![0, 1, 2])));
    let draws: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, Command::DrawIndexed { .. }))
        .collect();
    assert_eq!(
        draws,
        vec![&Command::DrawIndexed {
            index_count: 36,
            instance_count: 1,
        }]
    );

    let slot = renderer.context().back_buffer_index();
    let written = renderer.scene_cbuffer(slot).contents();
    let expected = camera.view_projection().to_cols_array();
    assert_eq!(&written[..64], bytemuck::cast_slice::<f32, u8>(&expected));

    let outcome = renderer.present().unwrap();
    assert_eq!(outcome.frame, 1);
    assert_eq!(outcome.previous_back_buffer, slot);
    assert_eq!(
        renderer.context().back_buffer(slot).state(),
        ResourceState::Present
    );
    assert!(renderer.context().device().validation_messages().is_empty());
}

#[test]
fn lagging_gpu_is_paced_without_slot_reuse() {
    let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, 1);
    let mut renderer = renderer(&adapter, 3);
    let camera = FlyCamera::default();

    let mut stalls = 0;
    for _ in 0..20 {
        renderer.render(&camera).unwrap();
        if renderer.present().unwrap().blocked {
            stalls += 1;
        }
    }

    assert_eq!(renderer.frames_rendered(), 20);
    assert_eq!(renderer.context().frame_sync().stats().cpu_stalls, stalls);
    // one frame of lag leaves the oldest of three slots complete by the time
    // it comes around again
    assert_eq!(stalls, 0);
    assert!(renderer.context().device().validation_messages().is_empty());
}

#[test]
fn deep_lag_stalls_every_frame_once_buffers_run_out() {
    let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, 4);
    let mut renderer = renderer(&adapter, 2);
    let camera = FlyCamera::default();

    let blocked: Vec<bool> = (0..6)
        .map(|_| {
            renderer.render(&camera).unwrap();
            renderer.present().unwrap().blocked
        })
        .collect();

    assert_eq!(blocked, vec![false, true, true, true, true, true]);
    assert!(renderer.context().device().validation_messages().is_empty());
}

#[test]
fn resize_between_frames_keeps_rendering() {
    let mut renderer = renderer(&HeadlessAdapter::new(), 2);
    let camera = FlyCamera::default();

    renderer.render(&camera).unwrap();
    renderer.present().unwrap();

    renderer.resize(0, 0).unwrap();
    assert_eq!(renderer.context().depth_extent(), Extent2d::new(1, 1));

    renderer.resize(1920, 1080).unwrap();
    for _ in 0..3 {
        renderer.render(&camera).unwrap();
        renderer.present().unwrap();
    }
    assert_eq!(renderer.context().viewport().extent(), Extent2d::new(1920, 1080));
    assert!(renderer.context().device().validation_messages().is_empty());
}

#[test]
fn empty_shader_blob_fails_construction() {
    let ctx = context(&HeadlessAdapter::new(), 2);
    let result = Renderer::new(ctx, &ShaderBlobs::from_bytes(Vec::new(), b"ps".to_vec()), CLEAR);
    assert!(matches!(result, Err(RenderError::Gpu(GpuError::Shader(_)))));
}
