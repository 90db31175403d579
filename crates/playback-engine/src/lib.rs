//! FrameSnap Playback Engine
//!
//! Turns a recorded [`FrameBuffer`](framesnap_frame_model::FrameBuffer) into
//! a navigable sequence. Presentation ticks run at a base rate of
//! `base_fps` frames per second scaled by the speed multiplier, never faster
//! than one tick per `min_tick_ms`.
//!
//! Playback never wraps: reaching the last frame stops it.

pub mod controller;

pub use controller::{PlaybackController, PlaybackState, SPEED_PRESETS};
