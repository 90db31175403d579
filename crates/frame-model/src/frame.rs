//! Captured frames and the screen region they come from.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use framesnap_common::error::{FramesnapError, FramesnapResult};

/// Bytes per pixel of a stored frame (RGB, no alpha).
pub const FRAME_CHANNELS: usize = 3;

/// A rectangular screen area in absolute screen pixel coordinates.
///
/// Fixed for the lifetime of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Create a region, rejecting zero-sized rectangles.
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> FramesnapResult<Self> {
        if width == 0 || height == 0 {
            return Err(FramesnapError::configuration(format!(
                "Degenerate capture region {width}x{height} at ({left},{top})"
            )));
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(FramesnapError::configuration(format!(
                "Capture region {width}x{height} is too large"
            )));
        }
        if left.checked_add(width as i32).is_none() || top.checked_add(height as i32).is_none() {
            return Err(FramesnapError::configuration(
                "Capture region overflows screen space",
            ));
        }
        Ok(Self {
            top,
            left,
            width,
            height,
        })
    }

    /// Build a region from the two corners of a drag gesture.
    ///
    /// The corners may be given in any order. Returns `None` when either
    /// extent is not larger than `min_size`, which callers treat as a
    /// cancelled selection.
    pub fn from_drag(start: (i32, i32), end: (i32, i32), min_size: u32) -> Option<Self> {
        let (x1, x2) = (start.0.min(end.0), start.0.max(end.0));
        let (y1, y2) = (start.1.min(end.1), start.1.max(end.1));
        let width = u32::try_from(x2.checked_sub(x1)?).ok()?;
        let height = u32::try_from(y2.checked_sub(y1)?).ok()?;
        if width <= min_size || height <= min_size {
            return None;
        }
        Self::new(x1, y1, width, height).ok()
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// One captured image. Immutable once stored in a [`crate::FrameBuffer`].
#[derive(Debug, Clone)]
pub struct Frame {
    index: usize,
    captured_at_ns: u64,
    image: RgbImage,
}

impl Frame {
    pub(crate) fn new(index: usize, captured_at_ns: u64, image: RgbImage) -> Self {
        Self {
            index,
            captured_at_ns,
            image,
        }
    }

    /// Sequence index assigned when the frame was appended.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Nanoseconds since the owning session started.
    pub fn captured_at_ns(&self) -> u64 {
        self.captured_at_ns
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Read-only view of the pixel grid.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Raw RGB bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// RGB value at `(x, y)`, or `None` outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.image.get_pixel(x, y).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_rejects_zero_size() {
        let err = Region::new(0, 0, 0, 100).unwrap_err();
        assert!(matches!(err, FramesnapError::Configuration { .. }));
        assert!(Region::new(10, 10, 100, 0).is_err());
    }

    #[test]
    fn region_allows_negative_origin() {
        let region = Region::new(-1920, 0, 1920, 1080).unwrap();
        assert_eq!(region.right(), 0);
        assert_eq!(region.bottom(), 1080);
    }

    #[test]
    fn drag_normalizes_corners() {
        let region = Region::from_drag((300, 200), (100, 50), 20).unwrap();
        assert_eq!(
            region,
            Region {
                top: 50,
                left: 100,
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn small_drag_is_a_cancellation() {
        assert!(Region::from_drag((0, 0), (20, 500), 20).is_none());
        assert!(Region::from_drag((0, 0), (500, 15), 20).is_none());
        assert!(Region::from_drag((0, 0), (21, 21), 20).is_some());
    }

    #[test]
    fn region_serializes_with_named_fields() {
        let region = Region::new(5, 6, 7, 8).unwrap();
        let json = serde_json::to_string(&region).unwrap();
        assert_eq!(json, r#"{"top":6,"left":5,"width":7,"height":8}"#);
    }

    #[test]
    fn frame_pixel_lookup_is_bounds_checked() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(1, 0, image::Rgb([9, 8, 7]));
        let frame = Frame::new(0, 0, image);
        assert_eq!(frame.pixel(1, 0), Some([9, 8, 7]));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.as_bytes().len(), 2 * 2 * FRAME_CHANNELS);
    }
}
