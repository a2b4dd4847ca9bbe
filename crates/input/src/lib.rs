//! Input state: keyboard, mouse buttons and mouse motion, per frame.
//!
//! # Invariants
//! - Queries reflect every event received since the last `begin_frame`.
//! - The mouse delta covers exactly one frame.

pub mod state;

pub use state::InputState;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
