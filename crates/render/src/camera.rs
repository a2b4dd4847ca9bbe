use glam::{Mat4, Vec3};
use prism_input::{InputState, KeyCode, MouseButton};

/// Fly camera with position, yaw, pitch, and projection parameters.
///
/// Only moves while the right mouse button is held: the mouse turns it and
/// WASD, Space and left Ctrl translate it along its own axes.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Units per second.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, -10.0),
            yaw: 0.0,
            pitch: 0.0,
            fov: 90.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            speed: 2.0,
            sensitivity: 0.005,
        };
        camera.look_at(Vec3::ZERO);
        camera
    }
}

impl FlyCamera {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        debug_assert!(aspect.is_finite() && aspect > 0.0, "bad aspect ratio {aspect}");
        if aspect != self.aspect {
            self.aspect = aspect;
            tracing::debug!("aspect ratio set to {aspect}");
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self
            .pitch
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Applies one frame of input. `dt` is in seconds.
    pub fn update(&mut self, input: &mut InputState, dt: f32) {
        if !input.is_button_down(MouseButton::Right) {
            input.set_cursor_visible(true);
            return;
        }
        input.set_cursor_visible(false);

        let delta = input.mouse_delta();
        if delta.x != 0.0 || delta.y != 0.0 {
            self.rotate(delta.x, delta.y);
        }

        let axis = |pos: KeyCode, neg: KeyCode| {
            if input.is_key_down(pos) {
                1.0
            } else if input.is_key_down(neg) {
                -1.0
            } else {
                0.0
            }
        };
        let z = axis(KeyCode::KeyW, KeyCode::KeyS);
        let x = axis(KeyCode::KeyD, KeyCode::KeyA);
        let y = axis(KeyCode::Space, KeyCode::ControlLeft);

        let step = self.speed * dt;
        self.position += step * (x * self.right() + y * self.up() + z * self.forward());
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn default_camera_sees_origin_at_screen_center() {
        let cam = FlyCamera::default();
        assert!((cam.forward() - Vec3::Z).length() < 1e-5);

        let clip = cam.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn movement_needs_right_mouse_button() {
        let mut cam = FlyCamera::default();
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyW);

        cam.update(&mut input, 0.5);
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, -10.0));
        assert!(input.cursor_visible());

        input.press_button(MouseButton::Right);
        cam.update(&mut input, 0.5);
        assert!((cam.position - Vec3::new(0.0, 0.0, -9.0)).length() < 1e-5);
        assert!(!input.cursor_visible());
    }

    #[test]
    fn opposite_keys_do_not_cancel_out() {
        let mut cam = FlyCamera::default();
        let mut input = InputState::new();
        input.press_button(MouseButton::Right);
        input.press_key(KeyCode::Space);
        input.press_key(KeyCode::ControlLeft);

        cam.update(&mut input, 1.0);
        assert!((cam.position.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn mouse_turns_camera_and_clamps_pitch() {
        let mut cam = FlyCamera::default();
        let yaw = cam.yaw;
        cam.rotate(100.0, 0.0);
        assert!((cam.yaw - yaw - 0.5).abs() < 1e-5);

        cam.rotate(0.0, -1.0e6);
        assert!(cam.pitch <= 89.0_f32.to_radians() + 1e-6);
    }
}
