use serde::{Deserialize, Serialize};

/// Width and height of a window, surface or texture in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamps both axes to at least 1. A minimized window reports 0x0.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rasterizer viewport in pixels with a [0, 1] depth range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport for `extent`.
    pub fn from_extent(extent: Extent2d) -> Self {
        debug_assert!(!extent.is_empty(), "viewport extent must be non-zero");
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        debug_assert!(self.height > 0.0, "aspect ratio of a zero-height viewport");
        self.width / self.height
    }

    pub fn extent(&self) -> Extent2d {
        Extent2d::new(self.width as u32, self.height as u32)
    }
}

/// Scissor rectangle in pixels, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScissorRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ScissorRect {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl From<&Viewport> for ScissorRect {
    fn from(viewport: &Viewport) -> Self {
        Self {
            left: viewport.x as u32,
            top: viewport.y as u32,
            right: (viewport.x + viewport.width) as u32,
            bottom: (viewport.y + viewport.height) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_clamps_to_one() {
        assert_eq!(Extent2d::new(0, 0).clamped(), Extent2d::new(1, 1));
        assert_eq!(Extent2d::new(0, 720).clamped(), Extent2d::new(1, 720));
        assert!(Extent2d::new(1280, 0).is_empty());
    }

    #[test]
    fn viewport_covers_extent() {
        let vp = Viewport::from_extent(Extent2d::new(1920, 1080));
        assert_eq!(vp.extent(), Extent2d::new(1920, 1080));
        assert!((vp.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(vp.max_depth, 1.0);
    }

    #[test]
    fn scissor_from_viewport() {
        let vp = Viewport::from_extent(Extent2d::new(800, 600));
        let rect = ScissorRect::from(&vp);
        assert_eq!((rect.width(), rect.height()), (800, 600));
        assert_eq!((rect.left, rect.top), (0, 0));
    }
}
