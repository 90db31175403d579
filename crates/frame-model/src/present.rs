//! Rendering sink contract.

use crate::frame::Frame;

/// Receives frames for display.
///
/// Invoked by the capture loop for live preview and by the playback
/// controller on every presentation. Implementations must return quickly;
/// they run on the loop that produced the frame.
pub trait Presenter: Send + Sync {
    /// Show `frame`, which sits at `index` of a buffer holding `total` frames.
    fn present(&self, frame: &Frame, index: usize, total: usize);
}

impl<F> Presenter for F
where
    F: Fn(&Frame, usize, usize) + Send + Sync,
{
    fn present(&self, frame: &Frame, index: usize, total: usize) {
        self(frame, index, total)
    }
}
