//! FrameSnap Export Engine
//!
//! Marks buffered frames for export and writes them out as independent PNG
//! files named by their 1-based frame number.

pub mod export;
pub mod selection;

pub use export::*;
pub use selection::ExportSelector;
