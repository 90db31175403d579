//! Fixed-interval acquisition loop.
//!
//! A [`CaptureScheduler`] owns one recording session. It grabs the session
//! region once per tick, converts the pixels to RGB, and appends them to the
//! shared [`FrameBuffer`]. Ticks are paced by wall-clock sleep and follow a
//! drop-frame policy: paused ticks produce nothing and are never repaid, and
//! a tick whose work overruns the interval is followed by the next one with
//! no sleep.
//!
//! Control flows to the loop through a single-slot watch channel that the
//! loop reads once per tick. Stop also interrupts the inter-tick sleep, so
//! no grab starts after a stop has been observed.
//!
//! Grab and conversion run on the blocking pool. The append and the
//! notifications stay on the loop task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use framesnap_common::clock::{RecordingClock, TickPacer};
use framesnap_common::error::{FramesnapError, FramesnapResult};
use framesnap_frame_model::{FrameBuffer, Presenter, Region};

use crate::convert;
use crate::grabber::ScreenGrabber;

/// Highest accepted capture rate.
pub const MAX_TARGET_FPS: u32 = 120;

/// Parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub region: Region,
    pub target_fps: u32,
}

impl CaptureConfig {
    pub fn new(region: Region, target_fps: u32) -> Self {
        Self { region, target_fps }
    }

    /// Reject configurations no session can run with.
    pub fn validate(&self) -> FramesnapResult<TickPacer> {
        if self.target_fps > MAX_TARGET_FPS {
            return Err(FramesnapError::configuration(format!(
                "target fps {} exceeds the maximum of {MAX_TARGET_FPS}",
                self.target_fps
            )));
        }
        if self.region.width == 0 || self.region.height == 0 {
            return Err(FramesnapError::configuration(format!(
                "Degenerate capture region {}",
                self.region
            )));
        }
        TickPacer::from_fps(self.target_fps)
            .ok_or_else(|| FramesnapError::configuration("target fps must be a positive integer"))
    }
}

/// Lifecycle of a capture session.
///
/// `Idle -> Running -> {Paused <-> Running} -> Stopped`. Stopped is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Snapshot of a session's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSession {
    pub region: Region,
    pub target_fps: u32,
    pub paused: bool,
    pub running: bool,
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames appended to the buffer.
    pub frames_captured: u64,
    /// Ticks that fired, paused or not.
    pub ticks: u64,
    /// Ticks skipped because the session was paused.
    pub paused_ticks: u64,
    /// Ticks whose grab took at least a full interval.
    pub overrun_ticks: u64,
}

/// Notifications sent upward from a session. Delivery never blocks the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Started { region: Region, target_fps: u32 },
    Paused,
    Resumed,
    FrameCaptured { index: usize },
    Stopped { frames: u64 },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Stop,
}

struct Shared {
    state: Mutex<CaptureState>,
    frames_captured: AtomicU64,
    events: Option<mpsc::UnboundedSender<CaptureEvent>>,
}

impl Shared {
    fn emit(&self, event: CaptureEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Cloneable control surface for a session, usable from any thread.
#[derive(Clone)]
pub struct CaptureHandle {
    control: Arc<watch::Sender<Control>>,
    shared: Arc<Shared>,
}

impl CaptureHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        *self.shared.state.lock()
    }

    /// Frames this session has appended so far.
    pub fn frames_captured(&self) -> u64 {
        self.shared.frames_captured.load(Ordering::SeqCst)
    }

    /// Suspend acquisition. Ticks keep firing but grab nothing.
    pub fn pause(&self) -> FramesnapResult<()> {
        let mut state = self.shared.state.lock();
        if *state != CaptureState::Running {
            return Err(FramesnapError::invalid_state(format!(
                "Cannot pause a {state:?} session"
            )));
        }
        *state = CaptureState::Paused;
        self.control.send_replace(Control::Pause);
        drop(state);
        tracing::info!("Recording paused");
        self.shared.emit(CaptureEvent::Paused);
        Ok(())
    }

    /// Resume a paused session on the existing cadence.
    pub fn resume(&self) -> FramesnapResult<()> {
        let mut state = self.shared.state.lock();
        if *state != CaptureState::Paused {
            return Err(FramesnapError::invalid_state(format!(
                "Cannot resume a {state:?} session"
            )));
        }
        *state = CaptureState::Running;
        self.control.send_replace(Control::Run);
        drop(state);
        tracing::info!("Recording resumed");
        self.shared.emit(CaptureEvent::Resumed);
        Ok(())
    }

    /// Flip between paused and running. Returns whether the session is now paused.
    pub fn toggle_pause(&self) -> FramesnapResult<bool> {
        match self.state() {
            CaptureState::Running => self.pause().map(|_| true),
            CaptureState::Paused => self.resume().map(|_| false),
            state => Err(FramesnapError::invalid_state(format!(
                "Cannot toggle pause on a {state:?} session"
            ))),
        }
    }

    /// Request the loop to exit. Idempotent.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        if *state == CaptureState::Stopped {
            return;
        }
        *state = CaptureState::Stopped;
        self.control.send_replace(Control::Stop);
        tracing::debug!("Capture stop requested");
    }
}

/// Drives one recording session.
pub struct CaptureScheduler {
    config: CaptureConfig,
    pacer: TickPacer,
    buffer: FrameBuffer,
    grabber: Option<Box<dyn ScreenGrabber>>,
    presenter: Option<Arc<dyn Presenter>>,
    handle: CaptureHandle,
    task: Option<JoinHandle<FramesnapResult<CaptureStats>>>,
}

impl CaptureScheduler {
    /// Create an idle session. Fails with a configuration error before any
    /// capture happens if `config` is unusable.
    pub fn new(
        config: CaptureConfig,
        grabber: Box<dyn ScreenGrabber>,
        buffer: FrameBuffer,
    ) -> FramesnapResult<Self> {
        Self::build(config, grabber, buffer, None)
    }

    /// Like [`CaptureScheduler::new`], reporting [`CaptureEvent`]s on `events`.
    pub fn with_events(
        config: CaptureConfig,
        grabber: Box<dyn ScreenGrabber>,
        buffer: FrameBuffer,
        events: mpsc::UnboundedSender<CaptureEvent>,
    ) -> FramesnapResult<Self> {
        Self::build(config, grabber, buffer, Some(events))
    }

    fn build(
        config: CaptureConfig,
        grabber: Box<dyn ScreenGrabber>,
        buffer: FrameBuffer,
        events: Option<mpsc::UnboundedSender<CaptureEvent>>,
    ) -> FramesnapResult<Self> {
        let pacer = config.validate()?;
        let (control, _) = watch::channel(Control::Run);
        Ok(Self {
            config,
            pacer,
            buffer,
            grabber: Some(grabber),
            presenter: None,
            handle: CaptureHandle {
                control: Arc::new(control),
                shared: Arc::new(Shared {
                    state: Mutex::new(CaptureState::Idle),
                    frames_captured: AtomicU64::new(0),
                    events,
                }),
            },
            task: None,
        })
    }

    /// Send every captured frame to `presenter` for live preview.
    pub fn set_presenter(&mut self, presenter: Arc<dyn Presenter>) {
        self.presenter = Some(presenter);
    }

    /// Start the acquisition loop on the current tokio runtime.
    pub fn start(&mut self) -> FramesnapResult<()> {
        let mut state = self.handle.shared.state.lock();
        if *state != CaptureState::Idle {
            return Err(FramesnapError::invalid_state(format!(
                "Session cannot start from {state:?}"
            )));
        }
        let grabber = self
            .grabber
            .take()
            .ok_or_else(|| FramesnapError::invalid_state("Session has no grabber"))?;

        tracing::info!(
            region = %self.config.region,
            fps = self.config.target_fps,
            backend = grabber.name(),
            "Starting capture session"
        );
        let worker = CaptureLoop {
            region: self.config.region,
            pacer: self.pacer,
            buffer: self.buffer.clone(),
            grabber: Arc::new(Mutex::new(grabber)),
            presenter: self.presenter.clone(),
            control: self.handle.control.subscribe(),
            shared: self.handle.shared.clone(),
        };
        *state = CaptureState::Running;
        drop(state);

        self.handle.shared.emit(CaptureEvent::Started {
            region: self.config.region,
            target_fps: self.config.target_fps,
        });
        self.task = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// A control surface that can be moved to other threads or tasks.
    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> CaptureState {
        self.handle.state()
    }

    pub fn session(&self) -> CaptureSession {
        let state = self.state();
        CaptureSession {
            region: self.config.region,
            target_fps: self.config.target_fps,
            paused: state == CaptureState::Paused,
            running: matches!(state, CaptureState::Running | CaptureState::Paused),
        }
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn frames_captured(&self) -> u64 {
        self.handle.frames_captured()
    }

    pub fn pause(&self) -> FramesnapResult<()> {
        self.handle.pause()
    }

    pub fn resume(&self) -> FramesnapResult<()> {
        self.handle.resume()
    }

    pub fn toggle_pause(&self) -> FramesnapResult<bool> {
        self.handle.toggle_pause()
    }

    /// Request the loop to exit. Idempotent and non-blocking.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Wait for the loop to exit and collect its result.
    ///
    /// Returns the terminal error if acquisition failed.
    pub async fn wait(&mut self) -> FramesnapResult<CaptureStats> {
        let task = self
            .task
            .take()
            .ok_or_else(|| FramesnapError::invalid_state("Session is not running"))?;
        task.await
            .map_err(|e| FramesnapError::Other(anyhow::anyhow!("Capture task failed: {e}")))?
    }

    /// Stop the session and wait for the loop to exit.
    pub async fn stop_and_wait(&mut self) -> FramesnapResult<CaptureStats> {
        self.stop();
        self.wait().await
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

struct CaptureLoop {
    region: Region,
    pacer: TickPacer,
    buffer: FrameBuffer,
    grabber: Arc<Mutex<Box<dyn ScreenGrabber>>>,
    presenter: Option<Arc<dyn Presenter>>,
    control: watch::Receiver<Control>,
    shared: Arc<Shared>,
}

impl CaptureLoop {
    async fn run(mut self) -> FramesnapResult<CaptureStats> {
        let clock = RecordingClock::start();
        let mut stats = CaptureStats::default();
        tracing::info!(epoch_wall = %clock.epoch_wall(), "Recording clock started");

        loop {
            let tick_start = Instant::now();
            let control = *self.control.borrow_and_update();
            match control {
                Control::Stop => break,
                Control::Pause => stats.paused_ticks += 1,
                Control::Run => {
                    if let Err(e) = self.acquire(&clock).await {
                        return Err(self.fail(e));
                    }
                    stats.frames_captured += 1;
                }
            }
            stats.ticks += 1;

            let elapsed = tick_start.elapsed();
            if self.pacer.is_overrun(elapsed) {
                stats.overrun_ticks += 1;
                tracing::debug!(
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Capture tick overran its interval"
                );
            }

            let deadline = tick_start + elapsed + self.pacer.remaining(elapsed);
            if !self.sleep_until(deadline).await {
                break;
            }
        }

        tracing::info!(
            frames = stats.frames_captured,
            ticks = stats.ticks,
            paused_ticks = stats.paused_ticks,
            overrun_ticks = stats.overrun_ticks,
            duration_secs = clock.elapsed_secs(),
            "Recording stopped"
        );
        self.shared.emit(CaptureEvent::Stopped {
            frames: stats.frames_captured,
        });
        Ok(stats)
    }

    /// Grab, convert, append, and notify. The buffer lock is held only for the append.
    async fn acquire(&self, clock: &RecordingClock) -> FramesnapResult<()> {
        let grabber = self.grabber.clone();
        let region = self.region;
        let image = tokio::task::spawn_blocking(move || {
            let raw = grabber.lock().grab(&region)?;
            convert::to_rgb(raw)
        })
        .await
        .map_err(|e| FramesnapError::acquisition(format!("Grab worker failed: {e}")))??;
        let index = self.buffer.append(image, clock.elapsed_ns())?;
        self.shared.frames_captured.fetch_add(1, Ordering::SeqCst);

        if let Some(presenter) = &self.presenter {
            let frame = self.buffer.get(index)?;
            presenter.present(&frame, index, self.buffer.len());
        }
        self.shared.emit(CaptureEvent::FrameCaptured { index });
        Ok(())
    }

    /// Sleep to the next tick. Returns `false` if a stop arrived meanwhile.
    async fn sleep_until(&mut self, deadline: Instant) -> bool {
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                changed = self.control.changed() => {
                    if changed.is_err() || *self.control.borrow() == Control::Stop {
                        return false;
                    }
                }
            }
        }
    }

    fn fail(&self, error: FramesnapError) -> FramesnapError {
        tracing::error!(error = %error, "Capture session failed");
        *self.shared.state.lock() = CaptureState::Stopped;
        self.shared.emit(CaptureEvent::Failed {
            message: error.to_string(),
        });
        error
    }
}
