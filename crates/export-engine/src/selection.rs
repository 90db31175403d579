//! Index sets marked for export.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Selected and bookmarked frame indices.
///
/// The two sets are independent. Indices are not checked against a buffer
/// here; the exporter skips any that no longer exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSelector {
    selected: BTreeSet<usize>,
    bookmarks: BTreeSet<usize>,
}

impl ExportSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip selection of `index`. Returns whether it is now selected.
    pub fn toggle_selected(&mut self, index: usize) -> bool {
        toggle(&mut self.selected, index)
    }

    /// Flip the bookmark on `index`. Returns whether it is now bookmarked.
    pub fn toggle_bookmark(&mut self, index: usize) -> bool {
        toggle(&mut self.bookmarks, index)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn is_bookmarked(&self, index: usize) -> bool {
        self.bookmarks.contains(&index)
    }

    /// Select every index of a buffer holding `len` frames.
    pub fn select_all(&mut self, len: usize) {
        self.selected.extend(0..len);
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection with every `stride`-th index plus the last one.
    ///
    /// A stride of 0 is treated as 1. Returns the new selection size.
    pub fn apply_stride(&mut self, stride: usize, len: usize) -> usize {
        self.selected.clear();
        if len == 0 {
            return 0;
        }
        let stride = stride.max(1);
        self.selected.extend((0..len).step_by(stride));
        self.selected.insert(len - 1);
        self.selected.len()
    }

    /// Drop both selection and bookmarks. Used when the buffer is cleared.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.bookmarks.clear();
    }

    /// Selected indices in ascending order.
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Bookmarked indices in ascending order.
    pub fn bookmarks(&self) -> impl Iterator<Item = usize> + '_ {
        self.bookmarks.iter().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn bookmark_count(&self) -> usize {
        self.bookmarks.len()
    }
}

fn toggle(set: &mut BTreeSet<usize>, index: usize) -> bool {
    if set.remove(&index) {
        false
    } else {
        set.insert(index);
        true
    }
}
