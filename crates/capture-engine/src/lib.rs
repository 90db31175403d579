//! FrameSnap Capture Engine
//!
//! Records a fixed screen region at a target frame rate into a shared
//! in-memory [`FrameBuffer`](framesnap_frame_model::FrameBuffer).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Recorder                    │
//! │  ┌────────────────────────────────────────┐  │
//! │  │           CaptureScheduler             │  │
//! │  │  tick ──► ScreenGrabber ──► to_rgb     │  │
//! │  │                               │        │  │
//! │  │                               ▼        │  │
//! │  │   Presenter ◄── FrameBuffer::append    │  │
//! │  └────────────────────────────────────────┘  │
//! │         ▲ pause / resume / stop (watch)      │
//! └─────────┼────────────────────────────────────┘
//!           │
//!      CaptureHandle
//! ```

pub mod backend;
pub mod convert;
pub mod grabber;
pub mod recorder;
pub mod scheduler;

pub use grabber::{PixelLayout, RawCapture, ScreenGrabber};
pub use recorder::{GrabberFactory, Recorder};
pub use scheduler::{
    CaptureConfig, CaptureEvent, CaptureHandle, CaptureScheduler, CaptureSession, CaptureState,
    CaptureStats, MAX_TARGET_FPS,
};
