//! Playback state machine.
//!
//! `{Stopped, Playing} x current_index`. Playing falls back to stopped on
//! pause, step, seek, or when the last frame is reached. Every operation is
//! a no-op on an empty buffer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use framesnap_common::config::PlaybackDefaults;
use framesnap_common::error::{FramesnapError, FramesnapResult};
use framesnap_frame_model::{FrameBuffer, Presenter};

/// Speed multipliers offered by the review UI.
pub const SPEED_PRESETS: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_index: usize,
    pub playing: bool,
    pub speed_multiplier: f64,
}

struct Core {
    state: PlaybackState,
    /// Bumped on every cancellation. A tick task only acts while its
    /// generation is current.
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

struct Shared {
    buffer: FrameBuffer,
    presenter: Arc<dyn Presenter>,
    base_fps: f64,
    min_tick: Duration,
    core: Mutex<Core>,
    updates: watch::Sender<PlaybackState>,
}

/// Presents frames from a [`FrameBuffer`] under play/pause/step/seek control.
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    pub fn new(
        buffer: FrameBuffer,
        presenter: Arc<dyn Presenter>,
        defaults: &PlaybackDefaults,
    ) -> FramesnapResult<Self> {
        if defaults.base_fps == 0 {
            return Err(FramesnapError::configuration("playback base_fps must be positive"));
        }
        if defaults.min_tick_ms == 0 {
            return Err(FramesnapError::configuration("playback min_tick_ms must be at least 1"));
        }
        check_speed(defaults.default_speed)?;

        let state = PlaybackState {
            current_index: 0,
            playing: false,
            speed_multiplier: defaults.default_speed,
        };
        let (updates, _) = watch::channel(state);
        Ok(Self {
            shared: Arc::new(Shared {
                buffer,
                presenter,
                base_fps: defaults.base_fps as f64,
                min_tick: Duration::from_millis(defaults.min_tick_ms),
                core: Mutex::new(Core {
                    state,
                    generation: 0,
                    ticker: None,
                }),
                updates,
            }),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.core.lock().state
    }

    /// Receive every state change. Sending never blocks the controller.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.updates.subscribe()
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.shared.buffer
    }

    /// Delay between presentation ticks at the current speed.
    pub fn tick_interval(&self) -> Duration {
        self.shared.tick_interval(self.state().speed_multiplier)
    }

    /// Start advancing one frame per tick. No-op on the last frame.
    ///
    /// The first advance happens one interval after the call.
    pub fn play(&self) {
        let len = self.shared.buffer.len();
        let mut core = self.shared.core.lock();
        if len == 0 || core.state.playing || core.state.current_index >= len - 1 {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "Playback needs a tokio runtime; staying paused");
                return;
            }
        };

        core.generation += 1;
        core.state.playing = true;
        let generation = core.generation;
        core.ticker = Some(runtime.spawn(run_ticks(self.shared.clone(), generation)));
        let state = core.state;
        drop(core);

        tracing::debug!(index = state.current_index, speed = state.speed_multiplier, "Playback started");
        self.shared.publish(state);
    }

    /// Stop advancing. Idempotent.
    pub fn pause(&self) {
        let mut core = self.shared.core.lock();
        if !self.shared.cancel(&mut core) {
            return;
        }
        let state = core.state;
        drop(core);
        tracing::debug!(index = state.current_index, "Playback paused");
        self.shared.publish(state);
    }

    pub fn toggle_play(&self) {
        if self.state().playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move by `delta` frames, clamped to the buffer, and present.
    pub fn step(&self, delta: i64) {
        self.jump(|current| current.saturating_add(delta));
    }

    /// Jump to `index`, clamped to the buffer, and present.
    pub fn seek(&self, index: i64) {
        self.jump(|_| index);
    }

    pub fn jump_to_start(&self) {
        self.seek(0);
    }

    pub fn jump_to_end(&self) {
        self.seek(i64::MAX);
    }

    /// Change the pace of subsequent ticks. The current index is unchanged.
    pub fn set_speed(&self, multiplier: f64) -> FramesnapResult<()> {
        check_speed(multiplier)?;
        let mut core = self.shared.core.lock();
        core.state.speed_multiplier = multiplier;
        let state = core.state;
        drop(core);
        tracing::debug!(speed = multiplier, "Playback speed changed");
        self.shared.publish(state);
        Ok(())
    }

    /// Stop playback and return to the first frame without presenting.
    /// Used after the buffer has been cleared.
    pub fn reset(&self) {
        let mut core = self.shared.core.lock();
        self.shared.cancel(&mut core);
        core.state.current_index = 0;
        let state = core.state;
        drop(core);
        self.shared.publish(state);
    }

    /// Present the frame at the current index without changing state.
    pub fn refresh(&self) {
        let index = self.state().current_index;
        self.shared.present(index);
    }

    fn jump(&self, target: impl FnOnce(i64) -> i64) {
        let len = self.shared.buffer.len();
        if len == 0 {
            return;
        }
        let mut core = self.shared.core.lock();
        self.shared.cancel(&mut core);
        let current = core.state.current_index.min(len - 1) as i64;
        let index = target(current).clamp(0, len as i64 - 1) as usize;
        core.state.current_index = index;
        let state = core.state;
        drop(core);

        self.shared.present(index);
        self.shared.publish(state);
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let mut core = self.shared.core.lock();
        self.shared.cancel(&mut core);
    }
}

impl Shared {
    fn tick_interval(&self, speed: f64) -> Duration {
        let nanos = (1e9 / (self.base_fps * speed)).round() as u64;
        Duration::from_nanos(nanos).max(self.min_tick)
    }

    /// Invalidate the running tick task. Returns whether playback was active.
    fn cancel(&self, core: &mut Core) -> bool {
        core.generation += 1;
        if let Some(ticker) = core.ticker.take() {
            ticker.abort();
        }
        std::mem::replace(&mut core.state.playing, false)
    }

    fn present(&self, index: usize) {
        let total = self.buffer.len();
        match self.buffer.get(index) {
            Ok(frame) => self.presenter.present(&frame, index, total),
            Err(e) => tracing::debug!(error = %e, "Nothing to present"),
        }
    }

    fn publish(&self, state: PlaybackState) {
        self.updates.send_replace(state);
    }
}

/// Tick task. Each pass sleeps one interval at the then-current speed,
/// advances one frame, and schedules the next pass.
async fn run_ticks(shared: Arc<Shared>, generation: u64) {
    loop {
        let interval = {
            let core = shared.core.lock();
            if core.generation != generation {
                return;
            }
            shared.tick_interval(core.state.speed_multiplier)
        };
        tokio::time::sleep(interval).await;

        let len = shared.buffer.len();
        let mut core = shared.core.lock();
        if core.generation != generation || !core.state.playing {
            return;
        }
        if len == 0 {
            shared.cancel(&mut core);
            return;
        }

        let index = (core.state.current_index + 1).min(len - 1);
        core.state.current_index = index;
        let finished = index >= len - 1;
        if finished {
            core.generation += 1;
            core.state.playing = false;
            core.ticker = None;
        }
        let state = core.state;
        drop(core);

        shared.present(index);
        shared.publish(state);
        if finished {
            tracing::debug!(index, "Playback reached the last frame");
            return;
        }
    }
}

fn check_speed(multiplier: f64) -> FramesnapResult<()> {
    if multiplier.is_finite() && multiplier > 0.0 {
        Ok(())
    } else {
        Err(FramesnapError::configuration(format!(
            "Speed multiplier must be a positive number, got {multiplier}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framesnap_frame_model::Frame;
    use image::RgbImage;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Recording {
        shown: Mutex<Vec<(usize, usize)>>,
    }

    impl Presenter for Recording {
        fn present(&self, frame: &Frame, index: usize, total: usize) {
            assert_eq!(frame.index(), index);
            self.shown.lock().push((index, total));
        }
    }

    impl Recording {
        fn indices(&self) -> Vec<usize> {
            self.shown.lock().iter().map(|(i, _)| *i).collect()
        }
    }

    fn buffer_of(len: usize) -> FrameBuffer {
        let buffer = FrameBuffer::new();
        for i in 0..len {
            buffer.append(RgbImage::new(2, 2), i as u64).unwrap();
        }
        buffer
    }

    fn controller(len: usize) -> (PlaybackController, Arc<Recording>) {
        let presenter = Arc::new(Recording::default());
        let controller =
            PlaybackController::new(buffer_of(len), presenter.clone(), &PlaybackDefaults::default())
                .unwrap();
        (controller, presenter)
    }

    #[test]
    fn stepping_forward_visits_every_index_once() {
        let (controller, presenter) = controller(6);
        for _ in 0..5 {
            controller.step(1);
        }
        assert_eq!(presenter.indices(), vec![1, 2, 3, 4, 5]);
        assert_eq!(controller.state().current_index, 5);

        controller.step(1);
        assert_eq!(controller.state().current_index, 5);
    }

    #[test]
    fn ten_frame_jumps_clamp() {
        let (controller, presenter) = controller(15);
        controller.step(10);
        controller.step(10);
        controller.step(-10);
        controller.step(-10);
        assert_eq!(presenter.indices(), vec![10, 14, 4, 0]);
    }

    #[test]
    fn seek_scenario_on_twenty_frames() {
        let (controller, _) = controller(20);
        controller.seek(-5);
        assert_eq!(controller.state().current_index, 0);
        controller.seek(999);
        assert_eq!(controller.state().current_index, 19);
        controller.jump_to_start();
        assert_eq!(controller.state().current_index, 0);
        controller.jump_to_end();
        assert_eq!(controller.state().current_index, 19);
    }

    #[test]
    fn empty_buffer_operations_are_no_ops() {
        let (controller, presenter) = controller(0);
        controller.play();
        controller.step(1);
        controller.step(-3);
        controller.seek(5);
        controller.jump_to_end();
        controller.toggle_play();
        controller.pause();
        controller.refresh();
        controller.reset();

        assert!(presenter.indices().is_empty());
        let state = controller.state();
        assert_eq!(state.current_index, 0);
        assert!(!state.playing);
    }

    #[test]
    fn speed_sets_tick_interval_with_floor() {
        let (controller, _) = controller(3);
        assert_eq!(controller.tick_interval(), Duration::from_millis(100));
        controller.set_speed(2.0).unwrap();
        assert_eq!(controller.tick_interval(), Duration::from_millis(50));
        controller.set_speed(0.25).unwrap();
        assert_eq!(controller.tick_interval(), Duration::from_millis(400));
        controller.set_speed(10.0).unwrap();
        assert_eq!(controller.tick_interval(), Duration::from_millis(16));
        assert_eq!(controller.state().current_index, 0);
    }

    #[test]
    fn invalid_speeds_are_rejected() {
        let (controller, _) = controller(3);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(controller.set_speed(bad).is_err());
        }
        assert_eq!(controller.state().speed_multiplier, 1.0);
    }

    #[test]
    fn zero_tick_floor_is_rejected() {
        let defaults = PlaybackDefaults {
            min_tick_ms: 0,
            ..PlaybackDefaults::default()
        };
        let err = PlaybackController::new(buffer_of(3), Arc::new(Recording::default()), &defaults)
            .err()
            .unwrap();
        assert!(matches!(err, FramesnapError::Configuration { .. }));
    }

    #[test]
    fn huge_speed_never_drops_below_floor() {
        let (controller, _) = controller(3);
        controller.set_speed(1e12).unwrap();
        assert_eq!(controller.tick_interval(), Duration::from_millis(16));
    }

    #[tokio::test(start_paused = true)]
    async fn play_from_second_to_last_stops_after_one_tick() {
        let (controller, presenter) = controller(8);
        controller.seek(6);
        controller.play();
        assert!(controller.state().playing);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let state = controller.state();
        assert_eq!(state.current_index, 7);
        assert!(!state.playing);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(presenter.indices(), vec![6, 7]);
    }

    #[tokio::test(start_paused = true)]
    async fn play_on_last_frame_is_a_no_op() {
        let (controller, presenter) = controller(4);
        controller.jump_to_end();
        controller.play();
        assert!(!controller.state().playing);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(presenter.indices(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_speed() {
        let (controller, presenter) = controller(50);
        controller.play();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(controller.state().current_index, 3);

        controller.set_speed(4.0).unwrap();
        // The tick already sleeping toward 400ms keeps its interval; 425ms is the next.
        tokio::time::sleep(Duration::from_millis(90)).await;
        assert_eq!(controller.state().current_index, 5);
        assert_eq!(presenter.indices(), vec![1, 2, 3, 4, 5]);
        controller.pause();
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_pending_ticks() {
        let (controller, presenter) = controller(30);
        controller.play();
        tokio::time::sleep(Duration::from_millis(250)).await;
        controller.pause();
        controller.pause();
        let shown = presenter.indices().len();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(presenter.indices().len(), shown);
        assert_eq!(controller.state().current_index, 2);
        assert!(!controller.state().playing);
    }

    #[tokio::test(start_paused = true)]
    async fn step_and_seek_stop_playback() {
        let (controller, _) = controller(30);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        controller.step(1);
        assert!(!controller.state().playing);
        assert_eq!(controller.state().current_index, 2);

        controller.toggle_play();
        assert!(controller.state().playing);
        controller.seek(10);
        assert!(!controller.state().playing);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.state().current_index, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_stops_presentation() {
        let (controller, presenter) = controller(30);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(controller);
        let shown = presenter.indices().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(presenter.indices().len(), shown);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_auto_stop() {
        let (controller, _) = controller(3);
        let mut updates = controller.subscribe();
        controller.seek(1);
        controller.play();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(updates.has_changed().unwrap());
        let state = *updates.borrow_and_update();
        assert_eq!(state.current_index, 2);
        assert!(!state.playing);
    }

    #[test]
    fn reset_returns_to_first_frame() {
        let (controller, presenter) = controller(5);
        controller.seek(3);
        controller.buffer().clear();
        controller.reset();
        assert_eq!(controller.state().current_index, 0);
        assert_eq!(presenter.indices(), vec![3]);
    }

    proptest! {
        #[test]
        fn seek_always_clamps(len in 1usize..40, target in any::<i64>()) {
            let (controller, _) = controller(len);
            controller.seek(target);
            let expected = target.clamp(0, len as i64 - 1) as usize;
            prop_assert_eq!(controller.state().current_index, expected);
        }

        #[test]
        fn steps_stay_in_bounds(len in 1usize..20, deltas in proptest::collection::vec(-25i64..25, 0..30)) {
            let (controller, _) = controller(len);
            for delta in deltas {
                controller.step(delta);
                prop_assert!(controller.state().current_index < len);
            }
        }
    }
}
