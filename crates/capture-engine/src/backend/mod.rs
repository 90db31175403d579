//! Platform screen-access backends.

pub mod screen;

pub use screen::XcapGrabber;

use framesnap_common::error::FramesnapResult;
use framesnap_platform_core::MonitorInfo;

use crate::grabber::ScreenGrabber;

/// Get the screen grabber for this platform.
pub fn default_grabber() -> FramesnapResult<Box<dyn ScreenGrabber>> {
    Ok(Box::new(XcapGrabber::new()))
}

/// Enumerate connected monitors.
pub fn list_monitors() -> FramesnapResult<Vec<MonitorInfo>> {
    screen::detect_monitors()
}
