//! Cube renderer: composes the GPU model into a clear, one draw and a present
//! per frame.
//!
//! # Invariants
//! - A frame slot's heap, constants and command list are touched only after
//!   the frame pacing wait has released that slot.
//! - Upload staging buffers outlive the copies that read them.
//! - The renderer drains every queue before its resources are released.

mod camera;
mod error;
mod mesh;
mod renderer;
mod shaders;

pub use camera::FlyCamera;
pub use error::RenderError;
pub use mesh::CubeMesh;
pub use renderer::{FRAME_HEAP_CAPACITY, PerDrawConstants, Renderer, SceneConstants};
pub use shaders::{PIXEL_SHADER_FILE, ShaderBlobs, VERTEX_SHADER_FILE};
