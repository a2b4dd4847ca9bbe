use glam::Vec2;
use std::collections::HashSet;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard and mouse state fed from window events.
#[derive(Debug, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    prev_keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    mouse_pos: Vec2,
    mouse_delta: Vec2,
    cursor_visible: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
            prev_keys: HashSet::new(),
            buttons: HashSet::new(),
            mouse_pos: Vec2::ZERO,
            mouse_delta: Vec2::ZERO,
            cursor_visible: true,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame: remembers this frame's keys and clears the delta.
    pub fn begin_frame(&mut self) {
        self.prev_keys.clone_from(&self.keys);
        self.mouse_delta = Vec2::ZERO;
    }

    /// Updates state from a window event. Returns true if it was input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                match state {
                    ElementState::Pressed => self.press_key(*key),
                    ElementState::Released => self.release_key(*key),
                }
                true
            }
            WindowEvent::MouseInput { button, state, .. } => {
                match state {
                    ElementState::Pressed => self.press_button(*button),
                    ElementState::Released => self.release_button(*button),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.buttons.clear();
                false
            }
            _ => false,
        }
    }

    /// Raw mouse motion, unaffected by cursor clamping at window edges.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.add_mouse_delta(Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    pub fn set_mouse_position(&mut self, pos: Vec2) {
        self.mouse_pos = pos;
    }

    pub fn add_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_key_up(&self, key: KeyCode) -> bool {
        !self.is_key_down(key)
    }

    /// Down last frame, up now.
    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.prev_keys.contains(&key) && !self.keys.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_pos
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Requests cursor visibility; the window applies it.
    pub fn set_cursor_visible(&mut self, visible: bool) {
        if self.cursor_visible != visible {
            tracing::trace!(visible, "cursor visibility changed");
        }
        self.cursor_visible = visible;
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_released_lasts_one_frame() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyW);
        input.begin_frame();
        assert!(input.is_key_down(KeyCode::KeyW));
        assert!(!input.is_key_released(KeyCode::KeyW));

        input.release_key(KeyCode::KeyW);
        assert!(input.is_key_released(KeyCode::KeyW));
        assert!(input.is_key_up(KeyCode::KeyW));

        input.begin_frame();
        assert!(!input.is_key_released(KeyCode::KeyW));
    }

    #[test]
    fn mouse_delta_accumulates_within_a_frame() {
        let mut input = InputState::new();
        input.add_mouse_delta(Vec2::new(3.0, -1.0));
        input.add_mouse_delta(Vec2::new(2.0, 4.0));
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 3.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn buttons_track_press_and_release() {
        let mut input = InputState::new();
        input.press_button(MouseButton::Right);
        assert!(input.is_button_down(MouseButton::Right));
        assert!(!input.is_button_down(MouseButton::Left));
        input.release_button(MouseButton::Right);
        assert!(!input.is_button_down(MouseButton::Right));
    }

    #[test]
    fn raw_motion_feeds_delta() {
        let mut input = InputState::new();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (4.0, 2.0) });
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, 2.0));
    }
}
