use crate::error::RenderError;
use std::path::{Path, PathBuf};

pub const VERTEX_SHADER_FILE: &str = "cube_vs.wgsl";
pub const PIXEL_SHADER_FILE: &str = "cube_ps.wgsl";

/// The two shader payloads the cube pipeline is built from.
///
/// Contents are opaque here; only the backend interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlobs {
    pub vertex: Vec<u8>,
    pub pixel: Vec<u8>,
}

impl ShaderBlobs {
    /// Reads both shaders from their fixed file names under `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let blobs = Self {
            vertex: read_blob(dir.join(VERTEX_SHADER_FILE))?,
            pixel: read_blob(dir.join(PIXEL_SHADER_FILE))?,
        };
        tracing::info!(
            vertex = blobs.vertex.len(),
            pixel = blobs.pixel.len(),
            "loaded shaders from {}",
            dir.display()
        );
        Ok(blobs)
    }

    pub fn from_bytes(vertex: impl Into<Vec<u8>>, pixel: impl Into<Vec<u8>>) -> Self {
        Self {
            vertex: vertex.into(),
            pixel: pixel.into(),
        }
    }
}

fn read_blob(path: PathBuf) -> Result<Vec<u8>, RenderError> {
    std::fs::read(&path).map_err(|source| RenderError::ShaderRead { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_both_blobs_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VERTEX_SHADER_FILE), [0xde, 0xad]).unwrap();
        std::fs::write(dir.path().join(PIXEL_SHADER_FILE), [0xbe, 0xef, 0x00]).unwrap();

        let blobs = ShaderBlobs::load(dir.path()).unwrap();
        assert_eq!(blobs.vertex, vec![0xde, 0xad]);
        assert_eq!(blobs.pixel, vec![0xbe, 0xef, 0x00]);
    }

    #[test]
    fn missing_shader_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VERTEX_SHADER_FILE), b"vs").unwrap();

        let err = ShaderBlobs::load(dir.path()).unwrap_err();
        match err {
            RenderError::ShaderRead { path, .. } => {
                assert!(path.ends_with(PIXEL_SHADER_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
