//! Shared plain types for the prism sandbox.
//!
//! # Invariants
//! - Extents handed to GPU resource creation are never zero in either axis.
//! - Configuration is validated once at load; consumers trust it afterwards.

pub mod config;
pub mod timer;
pub mod types;

pub use config::{ConfigError, SandboxConfig};
pub use timer::TickTimer;
pub use types::{Extent2d, ScissorRect, Viewport};
