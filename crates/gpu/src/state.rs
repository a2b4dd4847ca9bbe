use crate::backend::{Backend, CommandList};
use std::fmt;

/// Usage state of a GPU resource. Operations that need a state must be
/// preceded by a barrier from the resource's last-known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    Present,
    RenderTarget,
    DepthWrite,
    CopyDest,
    /// Upload-heap resources live here for their whole lifetime.
    GenericRead,
    VertexAndConstantBuffer,
    IndexBuffer,
    ShaderResource,
}

/// A resource handle paired with its last-known usage state.
pub struct Tracked<B: Backend> {
    resource: B::Resource,
    state: ResourceState,
    label: String,
}

impl<B: Backend> Tracked<B> {
    pub fn new(resource: B::Resource, state: ResourceState, label: impl Into<String>) -> Self {
        Self {
            resource,
            state,
            label: label.into(),
        }
    }

    pub fn resource(&self) -> &B::Resource {
        &self.resource
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Records a barrier from the tracked state to `after`. Returns `false`
    /// when already in `after`; no barrier is recorded then.
    pub fn transition(&mut self, list: &mut B::CommandList, after: ResourceState) -> bool {
        if self.state == after {
            return false;
        }
        list.resource_barrier(&self.resource, self.state, after);
        tracing::trace!(resource = %self.label, before = ?self.state, ?after, "barrier");
        self.state = after;
        true
    }

    /// Like [`transition`](Self::transition), asserting the caller's view of
    /// the current state matches the tracked one.
    pub fn transition_from(
        &mut self,
        list: &mut B::CommandList,
        before: ResourceState,
        after: ResourceState,
    ) -> bool {
        debug_assert_eq!(
            self.state, before,
            "transition of '{}' expected {:?} but resource is in {:?}",
            self.label, before, self.state
        );
        self.transition(list, after)
    }
}

impl<B: Backend> fmt::Debug for Tracked<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, CommandAllocator, Device, Format, QueueKind, TextureDesc};
    use crate::headless::{
        Command, Headless, HeadlessAdapter, HeadlessCommandAllocator, HeadlessCommandList,
        HeadlessDevice,
    };
    use prism_common::Extent2d;

    fn setup() -> (
        HeadlessDevice,
        HeadlessCommandAllocator,
        HeadlessCommandList,
        Tracked<Headless>,
    ) {
        let device = HeadlessAdapter::new().create_device().unwrap();
        let allocator = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut list = device
            .create_command_list(QueueKind::Direct, &allocator)
            .unwrap();
        allocator.reset().unwrap();
        list.reset(&allocator).unwrap();
        let texture = device
            .create_texture(
                &TextureDesc {
                    label: "target".into(),
                    extent: Extent2d::new(4, 4),
                    format: Format::Rgba8Unorm,
                },
                ResourceState::Present,
            )
            .unwrap();
        let tracked = Tracked::new(texture, ResourceState::Present, "target");
        (device, allocator, list, tracked)
    }

    #[test]
    fn round_trip_restores_state_without_residue() {
        let (device, _allocator, mut list, mut target) = setup();

        for _ in 0..3 {
            assert!(target.transition(&mut list, ResourceState::RenderTarget));
            assert!(target.transition(&mut list, ResourceState::Present));
        }

        assert_eq!(target.state(), ResourceState::Present);
        assert_eq!(target.resource().state(), ResourceState::Present);
        assert_eq!(list.commands().len(), 6);
        assert_eq!(
            list.commands()[1],
            Command::Barrier {
                resource: target.resource().id(),
                before: ResourceState::RenderTarget,
                after: ResourceState::Present,
            }
        );
        assert!(device.validation_messages().is_empty());
    }

    #[test]
    fn transition_to_current_state_records_nothing() {
        let (_device, _allocator, mut list, mut target) = setup();
        assert!(!target.transition(&mut list, ResourceState::Present));
        assert!(list.commands().is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "expected RenderTarget")]
    fn transition_from_mismatched_state_asserts() {
        let (_device, _allocator, mut list, mut target) = setup();
        target.transition_from(&mut list, ResourceState::RenderTarget, ResourceState::Present);
    }
}
