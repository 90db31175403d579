//! Recording-session lifecycle on top of [`CaptureScheduler`].
//!
//! The recorder holds at most one active session at a time and owns the
//! buffer every session appends to. Frames from consecutive sessions
//! accumulate in the same buffer until [`Recorder::clear`] is called.

use std::sync::Arc;

use tokio::sync::mpsc;

use framesnap_common::error::{FramesnapError, FramesnapResult};
use framesnap_frame_model::{FrameBuffer, Presenter, Region};

use crate::grabber::ScreenGrabber;
use crate::scheduler::{
    CaptureConfig, CaptureEvent, CaptureHandle, CaptureScheduler, CaptureState, CaptureStats,
};

/// Produces a fresh grabber for every session.
pub type GrabberFactory =
    Box<dyn Fn() -> FramesnapResult<Box<dyn ScreenGrabber>> + Send + Sync>;

pub struct Recorder {
    buffer: FrameBuffer,
    target_fps: u32,
    grabbers: GrabberFactory,
    presenter: Option<Arc<dyn Presenter>>,
    events: Option<mpsc::UnboundedSender<CaptureEvent>>,
    active: Option<CaptureScheduler>,
}

impl Recorder {
    pub fn new(buffer: FrameBuffer, target_fps: u32, grabbers: GrabberFactory) -> Self {
        Self {
            buffer,
            target_fps,
            grabbers,
            presenter: None,
            events: None,
            active: None,
        }
    }

    /// Live-preview every captured frame through `presenter`.
    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Forward session events to `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// State of the current or most recent session.
    pub fn state(&self) -> CaptureState {
        self.active
            .as_ref()
            .map_or(CaptureState::Idle, CaptureScheduler::state)
    }

    /// Whether a session is running or paused.
    pub fn is_recording(&self) -> bool {
        matches!(self.state(), CaptureState::Running | CaptureState::Paused)
    }

    /// Control surface for the active session.
    pub fn handle(&self) -> Option<CaptureHandle> {
        self.active.as_ref().map(CaptureScheduler::handle)
    }

    /// Begin a session over `region` once the user has confirmed the selection.
    pub async fn on_start_confirmed(&mut self, region: Region) -> FramesnapResult<()> {
        if self.is_recording() {
            return Err(FramesnapError::invalid_state(
                "A recording session is already active",
            ));
        }
        // A previous session that died on its own still holds a finished task.
        if let Some(mut previous) = self.active.take() {
            if let Err(e) = previous.wait().await {
                tracing::debug!(error = %e, "Previous session had ended with an error");
            }
        }

        let config = CaptureConfig::new(region, self.target_fps);
        let grabber = (self.grabbers)()?;
        let mut scheduler = match &self.events {
            Some(tx) => CaptureScheduler::with_events(config, grabber, self.buffer.clone(), tx.clone())?,
            None => CaptureScheduler::new(config, grabber, self.buffer.clone())?,
        };
        if let Some(presenter) = &self.presenter {
            scheduler.set_presenter(presenter.clone());
        }
        scheduler.start()?;
        self.active = Some(scheduler);
        Ok(())
    }

    /// Flip pause on the active session. Returns whether it is now paused.
    pub fn toggle_pause(&self) -> FramesnapResult<bool> {
        match &self.active {
            Some(scheduler) if self.is_recording() => scheduler.toggle_pause(),
            _ => Err(FramesnapError::invalid_state("No active recording session")),
        }
    }

    /// Stop the active session and wait for it to finish.
    ///
    /// Returns `None` when no session exists.
    pub async fn on_stop_requested(&mut self) -> FramesnapResult<Option<CaptureStats>> {
        let Some(mut scheduler) = self.active.take() else {
            return Ok(None);
        };
        let stats = scheduler.stop_and_wait().await?;
        tracing::info!(
            frames = stats.frames_captured,
            buffered = self.buffer.len(),
            "Recording session finished"
        );
        Ok(Some(stats))
    }

    /// Discard every buffered frame, stopping any active session first.
    pub async fn clear(&mut self) -> FramesnapResult<()> {
        if let Err(e) = self.on_stop_requested().await {
            tracing::warn!(error = %e, "Session ended with an error while clearing");
        }
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabber::{PixelLayout, RawCapture};
    use std::time::Duration;

    struct SolidGrabber;

    impl ScreenGrabber for SolidGrabber {
        fn grab(&mut self, region: &Region) -> FramesnapResult<RawCapture> {
            let pixels = (region.width * region.height) as usize;
            Ok(RawCapture {
                width: region.width,
                height: region.height,
                layout: PixelLayout::Rgb8,
                data: vec![7; pixels * 3],
            })
        }

        fn name(&self) -> &str {
            "solid"
        }
    }

    fn recorder(buffer: FrameBuffer) -> Recorder {
        Recorder::new(
            buffer,
            10,
            Box::new(|| -> FramesnapResult<Box<dyn ScreenGrabber>> { Ok(Box::new(SolidGrabber)) }),
        )
    }

    fn region() -> Region {
        Region::new(0, 0, 4, 3).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_accumulate_into_one_buffer() {
        let buffer = FrameBuffer::new();
        let mut recorder = recorder(buffer.clone());

        recorder.on_start_confirmed(region()).await.unwrap();
        assert!(recorder.is_recording());
        tokio::time::sleep(Duration::from_millis(250)).await;
        let first = recorder.on_stop_requested().await.unwrap().unwrap();
        assert!(!recorder.is_recording());

        recorder.on_start_confirmed(region()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let second = recorder.on_stop_requested().await.unwrap().unwrap();

        assert_eq!(
            buffer.len() as u64,
            first.frames_captured + second.frames_captured
        );
        for i in 0..buffer.len() {
            assert_eq!(buffer.get(i).unwrap().index(), i);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_recording_is_rejected() {
        let mut recorder = recorder(FrameBuffer::new());
        recorder.on_start_confirmed(region()).await.unwrap();
        let err = recorder.on_start_confirmed(region()).await.unwrap_err();
        assert!(matches!(err, FramesnapError::InvalidState { .. }));
        recorder.on_stop_requested().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_session_is_a_no_op() {
        let mut recorder = recorder(FrameBuffer::new());
        assert!(recorder.on_stop_requested().await.unwrap().is_none());
        assert!(recorder.toggle_pause().is_err());
        assert_eq!(recorder.state(), CaptureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_pause_reports_new_state() {
        let mut recorder = recorder(FrameBuffer::new());
        recorder.on_start_confirmed(region()).await.unwrap();
        assert!(recorder.toggle_pause().unwrap());
        assert_eq!(recorder.state(), CaptureState::Paused);
        assert!(!recorder.toggle_pause().unwrap());
        assert_eq!(recorder.state(), CaptureState::Running);
        recorder.on_stop_requested().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn clear_stops_and_empties() {
        let buffer = FrameBuffer::new();
        let mut recorder = recorder(buffer.clone());
        recorder.on_start_confirmed(region()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!buffer.is_empty());

        recorder.clear().await.unwrap();
        assert!(buffer.is_empty());
        assert!(!recorder.is_recording());
    }

    /// Fails on its third grab.
    struct FlakyGrabber {
        grabs: usize,
    }

    impl ScreenGrabber for FlakyGrabber {
        fn grab(&mut self, region: &Region) -> FramesnapResult<RawCapture> {
            self.grabs += 1;
            if self.grabs == 3 {
                return Err(FramesnapError::acquisition("display lost"));
            }
            SolidGrabber.grab(region)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_session_reports_error_and_allows_restart() {
        let buffer = FrameBuffer::new();
        let sessions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = sessions.clone();
        let mut recorder = Recorder::new(
            buffer.clone(),
            10,
            Box::new(move || -> FramesnapResult<Box<dyn ScreenGrabber>> {
                let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Ok(Box::new(FlakyGrabber { grabs: 0 }))
                } else {
                    Ok(Box::new(SolidGrabber))
                }
            }),
        );

        recorder.on_start_confirmed(region()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(recorder.state(), CaptureState::Stopped);
        assert!(!recorder.is_recording());

        let err = recorder.on_stop_requested().await.unwrap_err();
        assert!(matches!(err, FramesnapError::Acquisition { .. }));
        assert_eq!(buffer.len(), 2);

        recorder.on_start_confirmed(region()).await.unwrap();
        assert!(recorder.is_recording());
        tokio::time::sleep(Duration::from_millis(250)).await;
        let stats = recorder.on_stop_requested().await.unwrap().unwrap();

        assert_eq!(buffer.len() as u64, 2 + stats.frames_captured);
        for i in 0..buffer.len() {
            assert_eq!(buffer.get(i).unwrap().index(), i);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grabber_factory_failure_leaves_recorder_idle() {
        let mut recorder = Recorder::new(
            FrameBuffer::new(),
            10,
            Box::new(|| -> FramesnapResult<Box<dyn ScreenGrabber>> {
                Err(FramesnapError::platform("no display"))
            }),
        );
        let err = recorder.on_start_confirmed(region()).await.unwrap_err();
        assert!(matches!(err, FramesnapError::Platform { .. }));
        assert!(!recorder.is_recording());
    }
}
