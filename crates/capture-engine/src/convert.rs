//! Conversion of raw grabs into the canonical RGB frame layout.

use image::RgbImage;

use framesnap_common::error::{FramesnapError, FramesnapResult};

use crate::grabber::{PixelLayout, RawCapture};

/// Convert a raw grab to RGB, dropping any alpha channel.
///
/// A grab whose buffer length disagrees with its dimensions is reported as
/// an acquisition failure rather than being padded or truncated.
pub fn to_rgb(raw: RawCapture) -> FramesnapResult<RgbImage> {
    if raw.width == 0 || raw.height == 0 {
        return Err(FramesnapError::acquisition(format!(
            "Grab returned an empty {}x{} image",
            raw.width, raw.height
        )));
    }

    let bpp = raw.layout.bytes_per_pixel();
    let expected = raw.width as usize * raw.height as usize * bpp;
    if raw.data.len() != expected {
        return Err(FramesnapError::acquisition(format!(
            "Grab buffer holds {} bytes, expected {expected} for {}x{} {:?}",
            raw.data.len(),
            raw.width,
            raw.height,
            raw.layout
        )));
    }

    let rgb = match raw.layout {
        PixelLayout::Rgb8 => raw.data,
        PixelLayout::Rgba8 => raw
            .data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        PixelLayout::Bgra8 => raw
            .data
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
    };

    RgbImage::from_raw(raw.width, raw.height, rgb)
        .ok_or_else(|| FramesnapError::acquisition("Converted buffer does not fit frame size"))
}
