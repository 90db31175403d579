//! Append-only frame store shared between the capture loop and its readers.

use std::sync::Arc;

use image::RgbImage;
use parking_lot::RwLock;

use framesnap_common::error::{FramesnapError, FramesnapResult};

use crate::frame::Frame;

/// An ordered, indexable sequence of captured frames.
///
/// Cloning yields another handle to the same storage. Indices are assigned
/// on append, are contiguous from 0, and are never reordered or removed;
/// [`FrameBuffer::clear`] discards the whole sequence at once.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    inner: Arc<BufferInner>,
}

#[derive(Debug, Default)]
struct BufferInner {
    frames: RwLock<Vec<Arc<Frame>>>,
    limit: Option<usize>,
}

impl FrameBuffer {
    /// An unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that refuses appends once it holds `limit` frames.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                frames: RwLock::new(Vec::new()),
                limit: Some(limit),
            }),
        }
    }

    /// Store a frame and return the sequence index it was given.
    ///
    /// Fails only with [`FramesnapError::CapacityExceeded`] when a limit is set.
    pub fn append(&self, image: RgbImage, captured_at_ns: u64) -> FramesnapResult<usize> {
        let mut frames = self.inner.frames.write();
        let index = frames.len();
        if let Some(limit) = self.inner.limit {
            if index >= limit {
                return Err(FramesnapError::CapacityExceeded { limit });
            }
        }
        frames.push(Arc::new(Frame::new(index, captured_at_ns, image)));
        Ok(index)
    }

    /// Read-only view of the frame at `index`.
    pub fn get(&self, index: usize) -> FramesnapResult<Arc<Frame>> {
        let frames = self.inner.frames.read();
        frames
            .get(index)
            .cloned()
            .ok_or(FramesnapError::IndexOutOfRange {
                index,
                len: frames.len(),
            })
    }

    /// Current frame count.
    pub fn len(&self) -> usize {
        self.inner.frames.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.inner.limit
    }

    /// Discard every frame. Callers must not clear while a capture session runs.
    pub fn clear(&self) {
        let mut frames = self.inner.frames.write();
        let discarded = frames.len();
        frames.clear();
        tracing::debug!(discarded, "Frame buffer cleared");
    }
}
