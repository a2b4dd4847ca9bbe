use prism_render::ShaderBlobs;

/// WGSL for the cube vertex stage, pulling vertices from storage buffers.
pub const VERTEX_SHADER_WGSL: &str = include_str!("../../../assets/shaders/cube_vs.wgsl");

/// WGSL for the cube pixel stage.
pub const PIXEL_SHADER_WGSL: &str = include_str!("../../../assets/shaders/cube_ps.wgsl");

/// The cube shaders compiled into the binary, for runs without a shader directory.
pub fn builtin_shaders() -> ShaderBlobs {
    ShaderBlobs::from_bytes(VERTEX_SHADER_WGSL, PIXEL_SHADER_WGSL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_blobs_hold_one_entry_point_per_stage() {
        let blobs = builtin_shaders();
        let vertex = std::str::from_utf8(&blobs.vertex).unwrap();
        let pixel = std::str::from_utf8(&blobs.pixel).unwrap();
        assert_eq!(vertex.matches("@vertex").count(), 1);
        assert_eq!(vertex.matches("@fragment").count(), 0);
        assert_eq!(pixel.matches("@fragment").count(), 1);
        assert_eq!(pixel.matches("@vertex").count(), 0);
    }

    #[test]
    fn vertex_stage_binds_heap_slots_in_root_constant_order() {
        for binding in 0..3 {
            assert!(VERTEX_SHADER_WGSL.contains(&format!("@binding({binding})")));
        }
    }
}
