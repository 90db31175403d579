//! PNG persistence of buffered frames.

use std::path::{Path, PathBuf};

use framesnap_common::error::{FramesnapError, FramesnapResult};
use framesnap_frame_model::{Frame, FrameBuffer};

/// Progress callback for frame export.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames written so far.
    pub frames_saved: usize,

    /// Frames requested.
    pub total_frames: usize,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Writing,
    Complete,
}

/// Outcome of [`export_frames`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub saved: usize,
    /// Requested indices that were not in the buffer.
    pub skipped: usize,
    pub output_dir: PathBuf,
}

/// Filename for the frame at zero-based `index`. Names are 1-based.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:04}.png", index + 1)
}

/// Write `frame` as a PNG at `path`.
pub fn save_png(frame: &Frame, path: &Path) -> FramesnapResult<()> {
    frame
        .image()
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| FramesnapError::export(format!("Failed to write {}: {e}", path.display())))
}

/// Write every listed frame to `dir` as `frame_NNNN.png`.
///
/// Indices outside the buffer are skipped. Existing files are overwritten.
pub fn export_frames(
    buffer: &FrameBuffer,
    indices: impl IntoIterator<Item = usize>,
    dir: &Path,
    progress: Option<ProgressCallback>,
) -> FramesnapResult<ExportSummary> {
    let indices: Vec<usize> = indices.into_iter().collect();
    if indices.is_empty() {
        return Err(FramesnapError::export("Nothing selected for export"));
    }

    let report = |frames_saved: usize, stage: ExportStage| {
        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: frames_saved as f64 / indices.len() as f64,
                frames_saved,
                total_frames: indices.len(),
                stage,
            });
        }
    };

    tracing::info!(
        frames = indices.len(),
        output = %dir.display(),
        "Starting frame export"
    );
    report(0, ExportStage::Preparing);
    std::fs::create_dir_all(dir)?;

    let len = buffer.len();
    let mut saved = 0;
    let mut skipped = 0;
    for &index in &indices {
        if index >= len {
            skipped += 1;
            continue;
        }
        let frame = buffer.get(index)?;
        save_png(&frame, &dir.join(frame_file_name(index)))?;
        saved += 1;
        report(saved, ExportStage::Writing);
    }
    report(saved, ExportStage::Complete);

    if skipped > 0 {
        tracing::warn!(skipped, "Some selected frames are no longer buffered");
    }
    tracing::info!(saved, output = %dir.display(), "Frame export complete");

    Ok(ExportSummary {
        saved,
        skipped,
        output_dir: dir.to_path_buf(),
    })
}

/// Saves single frames during playback review.
#[derive(Debug, Clone)]
pub struct SnapshotSaver {
    dir: PathBuf,
    count: usize,
}

impl SnapshotSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            count: 0,
        }
    }

    /// Write the frame at `index` as `screenshot_NNNN_fK.png`.
    pub fn save(&mut self, buffer: &FrameBuffer, index: usize) -> FramesnapResult<PathBuf> {
        let frame = buffer.get(index)?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("screenshot_{:04}_f{}.png", self.count + 1, index + 1));
        save_png(&frame, &path)?;
        self.count += 1;
        tracing::info!(path = %path.display(), count = self.count, "Snapshot saved");
        Ok(path)
    }

    /// Snapshots taken so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::{Arc, Mutex};

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framesnap_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn buffer_of(len: usize) -> FrameBuffer {
        let buffer = FrameBuffer::new();
        for i in 0..len {
            let image = RgbImage::from_pixel(3, 2, image::Rgb([i as u8, 0, 0]));
            buffer.append(image, i as u64).unwrap();
        }
        buffer
    }

    #[test]
    fn file_names_are_one_based() {
        assert_eq!(frame_file_name(0), "frame_0001.png");
        assert_eq!(frame_file_name(41), "frame_0042.png");
    }

    #[test]
    fn exports_selected_frames_as_png() {
        let dir = test_dir("export_selected");
        let buffer = buffer_of(5);

        let summary = export_frames(&buffer, [0, 3], &dir, None).unwrap();
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.skipped, 0);

        let written = image::open(dir.join("frame_0004.png")).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (3, 2));
        assert_eq!(written.get_pixel(0, 0).0, [3, 0, 0]);
        assert!(dir.join("frame_0001.png").exists());
        assert!(!dir.join("frame_0002.png").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let dir = test_dir("export_skip");
        let buffer = buffer_of(2);
        let summary = export_frames(&buffer, [1, 2, 50], &dir, None).unwrap();
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.skipped, 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_selection_is_an_error() {
        let dir = test_dir("export_empty");
        let err = export_frames(&buffer_of(3), Vec::new(), &dir, None).unwrap_err();
        assert!(matches!(err, FramesnapError::Export { .. }));
        assert!(!dir.exists());
    }

    #[test]
    fn progress_reaches_completion() {
        let dir = test_dir("export_progress");
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let callback: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));

        export_frames(&buffer_of(4), 0..4, &dir, Some(callback)).unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.first().unwrap().stage, ExportStage::Preparing);
        let last = reports.last().unwrap();
        assert_eq!(last.stage, ExportStage::Complete);
        assert_eq!(last.frames_saved, 4);
        assert!((last.progress - 1.0).abs() < f64::EPSILON);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn snapshots_are_numbered() {
        let dir = test_dir("snapshots");
        let buffer = buffer_of(10);
        let mut saver = SnapshotSaver::new(&dir);

        let first = saver.save(&buffer, 6).unwrap();
        let second = saver.save(&buffer, 0).unwrap();
        assert_eq!(first.file_name().unwrap(), "screenshot_0001_f7.png");
        assert_eq!(second.file_name().unwrap(), "screenshot_0002_f1.png");
        assert_eq!(saver.count(), 2);

        assert!(saver.save(&buffer, 10).is_err());
        assert_eq!(saver.count(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
