//! List connected monitors.

use framesnap_capture_engine::backend;
use framesnap_platform_core::virtual_desktop_bounds;

pub fn run() -> anyhow::Result<()> {
    let monitors = backend::list_monitors()?;
    println!("Monitors detected: {}", monitors.len());
    for m in &monitors {
        println!(
            "  {} {}x{} at ({}, {}) (scale: {}x) {}",
            m.name,
            m.width,
            m.height,
            m.x,
            m.y,
            m.scale_factor,
            if m.primary { "(primary)" } else { "" }
        );
    }

    if let Some((x, y, w, h)) = virtual_desktop_bounds(&monitors) {
        println!();
        println!("Virtual desktop: {w}x{h} at ({x}, {y})");
        println!("Pass --region LEFT,TOP,WIDTH,HEIGHT within a single monitor to record.");
    }
    Ok(())
}
