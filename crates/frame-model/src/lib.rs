//! FrameSnap Frame Model
//!
//! Defines the data contracts shared by capture, playback, and export:
//! - **Region:** The rectangle of the screen a session records
//! - **Frame:** One immutable RGB capture tagged with its sequence index
//! - **FrameBuffer:** The append-only, indexable store of a session's frames
//! - **Presenter:** The rendering sink frames are handed to for display
//!
//! The buffer is the only shared mutable resource in the pipeline. Exactly
//! one producer appends; any number of readers may read completed indices.

pub mod buffer;
pub mod frame;
pub mod present;

pub use buffer::*;
pub use frame::*;
pub use present::*;
