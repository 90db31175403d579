//! FrameSnap platform core contracts.
//!
//! Monitor geometry shared by the capture backend and the CLI, without
//! coupling to a concrete OS screen-access library. A recording region is
//! expressed in absolute desktop coordinates; this crate maps it onto the
//! single monitor that contains it.

use framesnap_frame_model::Region;
use serde::{Deserialize, Serialize};

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Position in the virtual desktop (desktop pixels).
    pub x: i32,
    pub y: i32,
    /// Size in desktop pixels.
    pub width: u32,
    pub height: u32,
    /// Scale factor (for example 1.0, 1.25, 2.0).
    pub scale_factor: f64,
    /// Whether this monitor is primary.
    pub primary: bool,
}

/// A crop rectangle inside a captured monitor image, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MonitorInfo {
    /// Whether `region` lies entirely on this monitor.
    pub fn contains_region(&self, region: &Region) -> bool {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        region.left >= self.x
            && region.top >= self.y
            && region.right() <= right
            && region.bottom() <= bottom
    }

    /// Map `region` into an image of this monitor that is
    /// `image_width` x `image_height` pixels.
    ///
    /// The image may be larger than the desktop size on HiDPI displays; the
    /// rectangle is scaled accordingly. Returns `None` if the region is not
    /// on this monitor or would be empty after scaling.
    pub fn crop_rect(&self, region: &Region, image_width: u32, image_height: u32) -> Option<CropRect> {
        if !self.contains_region(region) || self.width == 0 || self.height == 0 {
            return None;
        }
        let sx = image_width as f64 / self.width as f64;
        let sy = image_height as f64 / self.height as f64;

        let x = (((region.left - self.x) as f64) * sx).round() as u32;
        let y = (((region.top - self.y) as f64) * sy).round() as u32;
        let width = ((region.width as f64) * sx).round() as u32;
        let height = ((region.height as f64) * sy).round() as u32;

        let width = width.min(image_width.saturating_sub(x));
        let height = height.min(image_height.saturating_sub(y));
        if width == 0 || height == 0 {
            return None;
        }
        Some(CropRect {
            x,
            y,
            width,
            height,
        })
    }
}

/// The monitor that fully contains `region`, preferring the primary one.
pub fn monitor_containing<'a>(monitors: &'a [MonitorInfo], region: &Region) -> Option<&'a MonitorInfo> {
    monitors
        .iter()
        .filter(|m| m.contains_region(region))
        .max_by_key(|m| m.primary)
}

/// Compute virtual desktop bounds that include all connected monitors.
/// Returns `(min_x, min_y, width, height)`.
pub fn virtual_desktop_bounds(monitors: &[MonitorInfo]) -> Option<(i32, i32, u32, u32)> {
    let min_x = monitors.iter().map(|m| m.x).min()?;
    let min_y = monitors.iter().map(|m| m.y).min()?;
    let max_x = monitors
        .iter()
        .map(|m| m.x as i64 + m.width as i64)
        .max()?;
    let max_y = monitors
        .iter()
        .map(|m| m.y as i64 + m.height as i64)
        .max()?;

    let width = (max_x - min_x as i64).max(1) as u32;
    let height = (max_y - min_y as i64).max(1) as u32;
    Some((min_x, min_y, width, height))
}
