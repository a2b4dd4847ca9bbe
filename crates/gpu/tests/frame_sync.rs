use prism_common::Extent2d;
use prism_gpu::headless::{DescriptorView, Headless, HeadlessAdapter, HeadlessFence, HeadlessSurface};
use prism_gpu::{
    Adapter, CommandList, CommandQueues, ContextDesc, Device, Fence, FenceEvent, FrameOutcome,
    GraphicsContext, Queue, QueueKind, ResourceState, Swapchain, WaitOutcome, wait_for_fence,
};
use std::thread;
use std::time::{Duration, Instant};

fn context(adapter: &HeadlessAdapter, buffer_count: u32) -> GraphicsContext<Headless> {
    let extent = Extent2d::new(640, 480);
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

fn run_frame(ctx: &mut GraphicsContext<Headless>) -> FrameOutcome {
    ctx.begin_frame().unwrap();
    ctx.transition_back_buffer(ResourceState::Present, ResourceState::RenderTarget);
    let rtv = ctx.back_buffer_rtv();
    ctx.command_list_mut()
        .clear_render_target(&rtv, [0.0, 0.0, 0.0, 1.0]);
    ctx.transition_back_buffer(ResourceState::RenderTarget, ResourceState::Present);
    ctx.submit_current().unwrap();
    ctx.present().unwrap()
}

#[test]
fn wait_returns_immediately_when_fence_already_past_target() {
    let device = HeadlessAdapter::new().create_device().unwrap();
    let fence = HeadlessFence::external(&device, 10);
    let event = FenceEvent::new();

    let outcome = wait_for_fence(&fence, 5, &event).unwrap();
    assert_eq!(outcome, WaitOutcome::AlreadyComplete);
    assert!(!event.is_set());

    let outcome = wait_for_fence(&fence, 10, &event).unwrap();
    assert_eq!(outcome, WaitOutcome::AlreadyComplete);
}

#[test]
fn wait_blocks_until_fence_reaches_target() {
    let device = HeadlessAdapter::new().create_device().unwrap();
    let fence = HeadlessFence::external(&device, 2);
    let event = FenceEvent::new();

    let start = Instant::now();
    let outcome = thread::scope(|scope| {
        scope.spawn(|| {
            thread::sleep(Duration::from_millis(30));
            fence.signal_from_cpu(4);
            thread::sleep(Duration::from_millis(30));
            fence.signal_from_cpu(5);
        });
        wait_for_fence(&fence, 5, &event).unwrap()
    });

    assert_eq!(outcome, WaitOutcome::Blocked);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(fence.completed_value(), 5);
}

#[test]
fn flush_waits_on_every_queue_when_they_complete_out_of_order() {
    let device = HeadlessAdapter::new()
        .with_completion_lag(QueueKind::Direct, 3)
        .with_completion_lag(QueueKind::Copy, 1)
        .create_device()
        .unwrap();
    let mut queues = CommandQueues::<Headless>::new(&device).unwrap();
    let work = device.create_fence(0).unwrap();

    let mut value = 0;
    for kind in QueueKind::ALL {
        for _ in 0..4 {
            value += 1;
            queues.get(kind).queue().signal(&work, value).unwrap();
        }
    }
    // the copy queue is ahead of the direct queue even though it was fed last
    assert!(queues.get(QueueKind::Copy).queue().pending() < queues.get(QueueKind::Direct).queue().pending());

    let report = queues.flush_all().unwrap();

    for kind in QueueKind::ALL {
        let sync = queues.get(kind);
        assert!(sync.is_idle(), "{} queue not drained", kind.name());
        assert_eq!(sync.fence().completed_value(), report.signaled[kind.index()]);
        assert_eq!(sync.queue().pending(), 0);
    }
    assert_eq!(work.completed_value(), value);
    assert_eq!(report.blocked, 3);

    // a second flush signals fresh values on each queue's own counter
    let again = queues.flush_all().unwrap();
    assert_eq!(again.signaled, [2, 2, 2]);
}

#[test]
fn single_queue_flush_drains_only_that_queue() {
    let device = HeadlessAdapter::new()
        .with_completion_lag(QueueKind::Copy, 2)
        .create_device()
        .unwrap();
    let mut queues = CommandQueues::<Headless>::new(&device).unwrap();
    let work = device.create_fence(0).unwrap();

    let copy = queues.get(QueueKind::Copy).queue();
    for value in 1..=4 {
        copy.signal(&work, value).unwrap();
    }
    assert!(work.completed_value() < 4);

    let outcome = queues.flush(QueueKind::Copy).unwrap();
    assert_eq!(outcome, WaitOutcome::Blocked);
    assert_eq!(work.completed_value(), 4);

    let copy = queues.get(QueueKind::Copy);
    assert!(copy.is_idle());
    assert_eq!(copy.last_signaled(), 1);
    assert_eq!(copy.queue().pending(), 0);
    assert_eq!(queues.get(QueueKind::Direct).last_signaled(), 0);
    assert_eq!(queues.get(QueueKind::Compute).last_signaled(), 0);

    queues.flush(QueueKind::Copy).unwrap();
    assert_eq!(queues.get(QueueKind::Copy).last_signaled(), 2);
}

#[test]
fn resource_round_trip_through_frames_leaves_back_buffers_presentable() {
    let adapter = HeadlessAdapter::new();
    let mut ctx = context(&adapter, 2);
    for _ in 0..4 {
        run_frame(&mut ctx);
    }
    for index in 0..ctx.buffer_count() {
        assert_eq!(ctx.back_buffer(index).state(), ResourceState::Present);
        assert_eq!(
            ctx.back_buffer(index).resource().state(),
            ResourceState::Present
        );
    }
    assert!(ctx.device().validation_messages().is_empty());
}

#[test]
fn zero_sized_depth_buffer_clamps_to_one_pixel() {
    let adapter = HeadlessAdapter::new();
    let mut ctx = context(&adapter, 2);

    ctx.recreate_depth_buffer(0, 0).unwrap();
    assert_eq!(ctx.depth_extent(), Extent2d::new(1, 1));
    assert_eq!(
        ctx.depth_buffer().resource().extent(),
        Some(Extent2d::new(1, 1))
    );
    assert!(matches!(
        ctx.dsv_heap().view(0),
        Some(DescriptorView::DepthStencil { extent, .. }) if extent == Extent2d::new(1, 1)
    ));
    assert_eq!(ctx.depth_buffer().state(), ResourceState::DepthWrite);

    ctx.recreate_depth_buffer(0, 0).unwrap();
    ctx.recreate_depth_buffer(320, 0).unwrap();
    assert_eq!(ctx.depth_extent(), Extent2d::new(320, 1));
}

#[test]
fn resize_to_zero_keeps_rendering() {
    let adapter = HeadlessAdapter::new();
    let mut ctx = context(&adapter, 2);
    run_frame(&mut ctx);

    ctx.resize(Extent2d::new(0, 0)).unwrap();
    assert_eq!(ctx.swapchain().extent(), Extent2d::new(1, 1));
    assert_eq!(ctx.viewport().extent(), Extent2d::new(1, 1));
    assert_eq!(ctx.depth_extent(), Extent2d::new(1, 1));

    ctx.resize(Extent2d::new(800, 600)).unwrap();
    let outcome = run_frame(&mut ctx);
    assert_eq!(outcome.previous_back_buffer, 0);
    assert!(matches!(
        ctx.rtv_heap().view(0),
        Some(DescriptorView::RenderTarget { extent, .. }) if extent == Extent2d::new(800, 600)
    ));
    assert!(ctx.device().validation_messages().is_empty());
}

fn last_signaled(ctx: &GraphicsContext<Headless>) -> Vec<u64> {
    QueueKind::ALL
        .into_iter()
        .map(|kind| ctx.queues().get(kind).last_signaled())
        .collect()
}

#[test]
fn resize_drains_each_queue_once() {
    let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, 1);
    let mut ctx = context(&adapter, 2);
    run_frame(&mut ctx);

    let before = last_signaled(&ctx);
    ctx.resize(Extent2d::new(0, 0)).unwrap();
    let after = last_signaled(&ctx);
    for (kind, (b, a)) in QueueKind::ALL.into_iter().zip(before.iter().zip(&after)) {
        assert_eq!(a - b, 1, "{} queue flushed {} times", kind.name(), a - b);
    }

    ctx.recreate_depth_buffer(64, 64).unwrap();
    let rebuilt = last_signaled(&ctx);
    assert!(rebuilt.iter().zip(&after).all(|(r, a)| r - a == 1));
}

#[test]
fn render_resolution_drives_the_viewport() {
    let adapter = HeadlessAdapter::new();
    let mut ctx = context(&adapter, 2);
    assert_eq!(ctx.render_resolution(), Extent2d::new(640, 480));

    ctx.set_render_resolution(Extent2d::new(320, 200));
    assert_eq!(ctx.render_resolution(), Extent2d::new(320, 200));
    assert_eq!(ctx.viewport().extent(), Extent2d::new(320, 200));

    ctx.resize(Extent2d::new(800, 0)).unwrap();
    assert_eq!(ctx.render_resolution(), Extent2d::new(800, 1));
    assert_eq!(ctx.viewport().extent(), Extent2d::new(800, 1));
}

#[test]
fn two_buffer_swapchain_cycles_with_increasing_slot_fences() {
    let adapter = HeadlessAdapter::new();
    let mut ctx = context(&adapter, 2);

    let mut per_slot: [Vec<u64>; 2] = [Vec::new(), Vec::new()];
    let mut indices = Vec::new();
    for frame in 1..=5 {
        let outcome = run_frame(&mut ctx);
        assert_eq!(outcome.frame, frame);
        assert_eq!(outcome.signaled, frame);
        assert!(!outcome.blocked);
        indices.push(outcome.previous_back_buffer);
        per_slot[outcome.previous_back_buffer as usize]
            .push(ctx.frame_sync().fence_value(outcome.previous_back_buffer));
    }

    assert_eq!(indices, vec![0, 1, 0, 1, 0]);
    for values in &per_slot {
        assert!(values.windows(2).all(|w| w[0] < w[1]), "{values:?}");
    }
    assert_eq!(per_slot[0], vec![1, 3, 5]);
    assert_eq!(per_slot[1], vec![2, 4]);
    assert_eq!(ctx.frame_sync().stats().cpu_stalls, 0);
}

#[test]
fn flip_discard_order_is_queried_not_assumed() {
    let adapter = HeadlessAdapter::new().with_flip_order(vec![0, 2, 1]);
    let mut ctx = context(&adapter, 3);

    let outcomes: Vec<_> = (0..6).map(|_| run_frame(&mut ctx)).collect();
    let presented: Vec<_> = outcomes.iter().map(|o| o.previous_back_buffer).collect();
    assert_eq!(presented, vec![0, 2, 1, 0, 2, 1]);

    // frame 4 reuses buffer 2, last rendered by frame 2
    assert_eq!(outcomes[3].back_buffer, 2);
    assert_eq!(outcomes[3].waited_for, 2);
    assert!(ctx.device().validation_messages().is_empty());
}

#[test]
fn gpu_three_frames_behind_blocks_first_on_fourth_present() {
    let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, 3);
    let mut ctx = context(&adapter, 4);

    let outcomes: Vec<_> = (0..4).map(|_| run_frame(&mut ctx)).collect();

    for outcome in &outcomes[..3] {
        assert!(!outcome.blocked, "{outcome:?}");
    }
    assert!(outcomes[3].blocked);
    assert_eq!(outcomes[3].waited_for, 1);
    assert_eq!(ctx.frame_sync().stats().cpu_stalls, 1);
    assert_eq!(ctx.device().stats().forced_waits, 1);
}

#[test]
fn slots_are_never_reset_before_their_fence_completes() {
    for buffers in 2..=4 {
        for lag in 0..=4 {
            let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, lag);
            let mut ctx = context(&adapter, buffers);

            for _ in 0..40 {
                let slot = ctx.back_buffer_index();
                assert!(ctx.frame_sync().slot_ready(slot));
                let outcome = run_frame(&mut ctx);
                assert!(ctx.frame_sync().fence().completed_value() >= outcome.waited_for);
            }

            let stats = ctx.device().stats();
            assert_eq!(stats.allocator_resets, 40);
            assert_eq!(stats.presents, 40);
            assert!(
                ctx.device().validation_messages().is_empty(),
                "buffers={buffers} lag={lag}: {:?}",
                ctx.device().validation_messages()
            );
        }
    }
}

#[test]
fn shutdown_drains_queues_and_clears_initialized() {
    let adapter = HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, 2);
    let mut ctx = context(&adapter, 2);
    run_frame(&mut ctx);
    assert!(ctx.is_initialized());

    ctx.shutdown().unwrap();
    assert!(!ctx.is_initialized());
    for kind in QueueKind::ALL {
        assert!(ctx.queues().get(kind).is_idle());
    }
    ctx.shutdown().unwrap();
}
