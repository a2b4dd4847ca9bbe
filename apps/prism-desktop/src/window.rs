use prism_common::Extent2d;
use winit::event::WindowEvent;
use winit::event_loop::ControlFlow;

/// What the event loop should do in response to a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    None,
    Resize(Extent2d),
    Close,
}

/// Visibility and size bookkeeping for the sandbox window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    size: Extent2d,
    shown: bool,
    minimized: bool,
    closed: bool,
}

impl WindowState {
    pub fn new(size: Extent2d) -> Self {
        Self {
            size,
            shown: true,
            minimized: size.is_empty(),
            closed: false,
        }
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> WindowAction {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.closed = true;
                WindowAction::Close
            }
            WindowEvent::Resized(size) => {
                let extent = Extent2d::new(size.width, size.height);
                if extent.is_empty() {
                    // minimized; keep the last real size for the swapchain
                    self.minimized = true;
                    return WindowAction::None;
                }
                self.minimized = false;
                if extent == self.size {
                    return WindowAction::None;
                }
                self.size = extent;
                WindowAction::Resize(extent)
            }
            WindowEvent::Occluded(occluded) => {
                self.shown = !occluded;
                WindowAction::None
            }
            _ => WindowAction::None,
        }
    }

    pub fn size(&self) -> Extent2d {
        self.size
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frames are skipped while the window cannot be seen.
    pub fn should_render(&self) -> bool {
        self.shown && !self.minimized && !self.closed
    }

    /// Redraw continuously while visible, otherwise sleep until the next event.
    pub fn control_flow(&self) -> ControlFlow {
        if self.should_render() {
            ControlFlow::Poll
        } else {
            ControlFlow::Wait
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    fn state() -> WindowState {
        WindowState::new(Extent2d::new(1280, 720))
    }

    #[test]
    fn resize_reports_new_extent_once() {
        let mut window = state();
        let event = WindowEvent::Resized(PhysicalSize::new(800, 600));
        assert_eq!(
            window.handle_event(&event),
            WindowAction::Resize(Extent2d::new(800, 600))
        );
        assert_eq!(window.handle_event(&event), WindowAction::None);
        assert_eq!(window.size(), Extent2d::new(800, 600));
    }

    #[test]
    fn zero_size_minimizes_without_resizing() {
        let mut window = state();
        let action = window.handle_event(&WindowEvent::Resized(PhysicalSize::new(0, 0)));
        assert_eq!(action, WindowAction::None);
        assert!(window.is_minimized());
        assert!(!window.should_render());
        assert_eq!(window.control_flow(), ControlFlow::Wait);
        assert_eq!(window.size(), Extent2d::new(1280, 720));

        // restoring to the same size needs no swapchain resize
        let action = window.handle_event(&WindowEvent::Resized(PhysicalSize::new(1280, 720)));
        assert_eq!(action, WindowAction::None);
        assert!(window.should_render());
        assert_eq!(window.control_flow(), ControlFlow::Poll);
    }

    #[test]
    fn occlusion_pauses_rendering() {
        let mut window = state();
        window.handle_event(&WindowEvent::Occluded(true));
        assert!(!window.is_shown());
        assert!(!window.should_render());
        assert_eq!(window.control_flow(), ControlFlow::Wait);
        window.handle_event(&WindowEvent::Occluded(false));
        assert!(window.should_render());
    }

    #[test]
    fn close_request_closes() {
        let mut window = state();
        assert_eq!(window.handle_event(&WindowEvent::CloseRequested), WindowAction::Close);
        assert!(window.is_closed());
        assert!(!window.should_render());
    }
}
