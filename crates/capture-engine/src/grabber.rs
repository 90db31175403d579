//! Screen-grab primitive contract.

use framesnap_common::error::FramesnapResult;
use framesnap_frame_model::Region;

/// Channel order of a raw grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Blue, green, red, alpha. The native order of most OS capture APIs.
    Bgra8,
    /// Red, green, blue, alpha.
    Rgba8,
    /// Red, green, blue. Already canonical.
    Rgb8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// Raw pixels returned by a [`ScreenGrabber`].
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Row-major pixel bytes, `width * height * bytes_per_pixel` long.
    pub data: Vec<u8>,
}

/// Synchronous source of screen pixels for a region.
///
/// A failed grab is fatal to the session that issued it; implementations
/// must not retry internally.
pub trait ScreenGrabber: Send {
    /// Capture the current contents of `region`.
    fn grab(&mut self, region: &Region) -> FramesnapResult<RawCapture>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
