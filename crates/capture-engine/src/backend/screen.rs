//! Monitor capture through the `xcap` crate.
//!
//! Each grab captures the monitor that contains the region and crops it.
//! Monitors are enumerated per grab so hot-plugging between ticks is seen
//! as an off-screen region instead of a stale handle.

use image::imageops;
use xcap::Monitor;

use framesnap_common::error::{FramesnapError, FramesnapResult};
use framesnap_frame_model::Region;
use framesnap_platform_core::{monitor_containing, MonitorInfo};

use crate::grabber::{PixelLayout, RawCapture, ScreenGrabber};

/// Screen grabber backed by the OS monitor capture API.
#[derive(Debug, Default)]
pub struct XcapGrabber {
    grabs: u64,
}

impl XcapGrabber {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScreenGrabber for XcapGrabber {
    fn grab(&mut self, region: &Region) -> FramesnapResult<RawCapture> {
        let monitors = Monitor::all().map_err(|e| {
            FramesnapError::acquisition(format!("Failed to enumerate monitors: {e}"))
        })?;
        let infos = monitors
            .iter()
            .map(monitor_info)
            .collect::<FramesnapResult<Vec<_>>>()
            .map_err(|e| FramesnapError::acquisition(e.to_string()))?;

        let info = monitor_containing(&infos, region).ok_or_else(|| {
            FramesnapError::acquisition(format!("Region {region} is not on a single monitor"))
        })?;
        let position = infos
            .iter()
            .position(|m| std::ptr::eq(m, info))
            .ok_or_else(|| FramesnapError::acquisition("Monitor list changed during grab"))?;

        let screen = monitors[position].capture_image().map_err(|e| {
            FramesnapError::acquisition(format!("Screen capture of {} failed: {e}", info.name))
        })?;

        let crop = info
            .crop_rect(region, screen.width(), screen.height())
            .ok_or_else(|| {
                FramesnapError::acquisition(format!(
                    "Region {region} falls outside the {}x{} capture of {}",
                    screen.width(),
                    screen.height(),
                    info.name
                ))
            })?;
        let cropped = imageops::crop_imm(&screen, crop.x, crop.y, crop.width, crop.height).to_image();

        self.grabs += 1;
        if self.grabs == 1 {
            tracing::debug!(
                monitor = %info.name,
                crop_width = crop.width,
                crop_height = crop.height,
                "First grab mapped region onto monitor"
            );
        }

        Ok(RawCapture {
            width: cropped.width(),
            height: cropped.height(),
            layout: PixelLayout::Rgba8,
            data: cropped.into_raw(),
        })
    }

    fn name(&self) -> &str {
        "xcap"
    }
}

/// Enumerate connected monitors.
pub fn detect_monitors() -> FramesnapResult<Vec<MonitorInfo>> {
    let monitors = Monitor::all()
        .map_err(|e| FramesnapError::platform(format!("Failed to enumerate monitors: {e}")))?;
    monitors.iter().map(monitor_info).collect()
}

fn monitor_info(monitor: &Monitor) -> FramesnapResult<MonitorInfo> {
    let query = |what: &str, e: xcap::XCapError| {
        FramesnapError::platform(format!("Failed to read monitor {what}: {e}"))
    };
    Ok(MonitorInfo {
        name: monitor.name().map_err(|e| query("name", e))?,
        x: monitor.x().map_err(|e| query("x", e))?,
        y: monitor.y().map_err(|e| query("y", e))?,
        width: monitor.width().map_err(|e| query("width", e))?,
        height: monitor.height().map_err(|e| query("height", e))?,
        scale_factor: monitor.scale_factor().map_err(|e| query("scale factor", e))? as f64,
        primary: monitor.is_primary().unwrap_or(false),
    })
}
