use glam::{Vec2, Vec4};

/// Unit cube spanning [-1, 1] on every axis, four vertices per face.
pub struct CubeMesh;

impl CubeMesh {
    pub const INDEX_COUNT: u32 = 36;

    #[rustfmt::skip]
    pub const INDICES: [u32; 36] = [
        0, 1, 2,    0, 2, 3,    // front
        4, 5, 6,    4, 6, 7,    // back
        8, 9, 10,   8, 10, 11,  // top
        12, 13, 14, 12, 14, 15, // bottom
        16, 17, 18, 16, 18, 19, // left
        20, 21, 22, 20, 22, 23, // right
    ];

    #[rustfmt::skip]
    pub const POSITIONS: [Vec4; 24] = [
        // front
        Vec4::new(-1.0, -1.0, -1.0, 1.0), Vec4::new(-1.0,  1.0, -1.0, 1.0),
        Vec4::new( 1.0,  1.0, -1.0, 1.0), Vec4::new( 1.0, -1.0, -1.0, 1.0),
        // back
        Vec4::new(-1.0, -1.0,  1.0, 1.0), Vec4::new( 1.0, -1.0,  1.0, 1.0),
        Vec4::new( 1.0,  1.0,  1.0, 1.0), Vec4::new(-1.0,  1.0,  1.0, 1.0),
        // top
        Vec4::new(-1.0,  1.0, -1.0, 1.0), Vec4::new(-1.0,  1.0,  1.0, 1.0),
        Vec4::new( 1.0,  1.0,  1.0, 1.0), Vec4::new( 1.0,  1.0, -1.0, 1.0),
        // bottom
        Vec4::new(-1.0, -1.0, -1.0, 1.0), Vec4::new( 1.0, -1.0, -1.0, 1.0),
        Vec4::new( 1.0, -1.0,  1.0, 1.0), Vec4::new(-1.0, -1.0,  1.0, 1.0),
        // left
        Vec4::new(-1.0, -1.0,  1.0, 1.0), Vec4::new(-1.0,  1.0,  1.0, 1.0),
        Vec4::new(-1.0,  1.0, -1.0, 1.0), Vec4::new(-1.0, -1.0, -1.0, 1.0),
        // right
        Vec4::new( 1.0, -1.0, -1.0, 1.0), Vec4::new( 1.0,  1.0, -1.0, 1.0),
        Vec4::new( 1.0,  1.0,  1.0, 1.0), Vec4::new( 1.0, -1.0,  1.0, 1.0),
    ];

    #[rustfmt::skip]
    pub const UVS: [Vec2; 24] = [
        // front
        Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0),
        // back
        Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0),
        // top
        Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0),
        // bottom
        Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0),
        // left
        Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0),
        // right
        Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0),
    ];

    pub fn index_bytes() -> &'static [u8] {
        bytemuck::cast_slice(&Self::INDICES)
    }

    pub fn position_bytes() -> &'static [u8] {
        bytemuck::cast_slice(&Self::POSITIONS)
    }

    pub fn uv_bytes() -> &'static [u8] {
        bytemuck::cast_slice(&Self::UVS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_stay_in_range() {
        assert_eq!(CubeMesh::INDICES.len() as u32, CubeMesh::INDEX_COUNT);
        assert!(
            CubeMesh::INDICES
                .iter()
                .all(|&i| (i as usize) < CubeMesh::POSITIONS.len())
        );
    }

    #[test]
    fn byte_views_match_element_sizes() {
        assert_eq!(CubeMesh::index_bytes().len(), 36 * 4);
        assert_eq!(CubeMesh::position_bytes().len(), 24 * 16);
        assert_eq!(CubeMesh::uv_bytes().len(), 24 * 8);
    }

    #[test]
    fn every_face_lies_on_a_cube_side() {
        for face in CubeMesh::POSITIONS.chunks(4) {
            let axis_fixed = (0..3).any(|axis| face.iter().all(|p| p[axis] == face[0][axis]));
            assert!(axis_fixed);
        }
    }
}
