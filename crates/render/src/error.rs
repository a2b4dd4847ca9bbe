use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] prism_gpu::GpuError),
    #[error("failed to read shader {}: {source}", path.display())]
    ShaderRead {
        path: PathBuf,
        source: std::io::Error,
    },
}
