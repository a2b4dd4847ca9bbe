use prism_gpu::{BufferUsage, Format, HeapType, IndexFormat, PresentMode};

pub(crate) fn texture_format(format: Format) -> wgpu::TextureFormat {
    match format {
        Format::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        Format::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        Format::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        Format::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        Format::D32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// Inverse of [`texture_format`] for the formats the backend models.
pub(crate) fn format_from_wgpu(format: wgpu::TextureFormat) -> Option<Format> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(Format::Rgba8Unorm),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(Format::Rgba8UnormSrgb),
        wgpu::TextureFormat::Bgra8Unorm => Some(Format::Bgra8Unorm),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(Format::Bgra8UnormSrgb),
        wgpu::TextureFormat::Depth32Float => Some(Format::D32Float),
        _ => None,
    }
}

pub(crate) fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

pub(crate) fn present_mode(mode: PresentMode) -> wgpu::PresentMode {
    match mode {
        PresentMode::Immediate => wgpu::PresentMode::AutoNoVsync,
        PresentMode::Vsync => wgpu::PresentMode::AutoVsync,
    }
}

/// Default-heap buffers are only written by copies; upload-heap buffers are
/// written from the CPU and serve as copy sources.
pub(crate) fn buffer_usages(usage: BufferUsage, heap: HeapType) -> wgpu::BufferUsages {
    let base = match heap {
        HeapType::Default => wgpu::BufferUsages::COPY_DST,
        HeapType::Upload => wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
    };
    let role = match (usage, heap) {
        (BufferUsage::Vertex, HeapType::Default) => wgpu::BufferUsages::STORAGE,
        (BufferUsage::Index, HeapType::Default) => wgpu::BufferUsages::INDEX,
        (BufferUsage::Constant, _) => wgpu::BufferUsages::UNIFORM,
        (_, HeapType::Upload) => wgpu::BufferUsages::empty(),
    };
    base | role
}

pub(crate) fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: color[0] as f64,
        g: color[1] as f64,
        b: color[2] as f64,
        a: color[3] as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modelled_formats_survive_conversion() {
        for format in [
            Format::Rgba8Unorm,
            Format::Rgba8UnormSrgb,
            Format::Bgra8Unorm,
            Format::Bgra8UnormSrgb,
            Format::D32Float,
        ] {
            assert_eq!(format_from_wgpu(texture_format(format)), Some(format));
        }
        assert_eq!(format_from_wgpu(wgpu::TextureFormat::Rgba16Float), None);
    }

    #[test]
    fn staging_buffers_are_copy_sources_only() {
        let usages = buffer_usages(BufferUsage::Vertex, HeapType::Upload);
        assert!(usages.contains(wgpu::BufferUsages::COPY_SRC));
        assert!(!usages.contains(wgpu::BufferUsages::STORAGE));
    }

    #[test]
    fn gpu_buffers_match_their_binding() {
        assert!(buffer_usages(BufferUsage::Vertex, HeapType::Default).contains(wgpu::BufferUsages::STORAGE));
        assert!(buffer_usages(BufferUsage::Index, HeapType::Default).contains(wgpu::BufferUsages::INDEX));
        assert!(buffer_usages(BufferUsage::Constant, HeapType::Upload).contains(wgpu::BufferUsages::UNIFORM));
    }

    #[test]
    fn immediate_presentation_disables_vsync() {
        assert_eq!(present_mode(PresentMode::Immediate), wgpu::PresentMode::AutoNoVsync);
        assert_eq!(present_mode(PresentMode::Vsync), wgpu::PresentMode::AutoVsync);
    }
}
