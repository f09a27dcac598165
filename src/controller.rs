//! Screen controller
//!
//! Routes the three acquisition paths into the inference worker and applies
//! completions to the [`ResultsView`]. The controller's thread is the only
//! one that touches the view; completions arrive over a channel and are
//! applied in [`ScreenController::poll`] or
//! [`ScreenController::wait_for_update`].
//!
//! Still and live modes are exclusive. A still action while the live feed
//! runs stops the feed first; a frame already being classified is not
//! cancelled and its result is still applied when it arrives.

use std::path::Path;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::acquisition::{capture_still, load_still, FrameSource, ImageSource};
use crate::config::AppConfig;
use crate::feed::{CaptureSession, CaptureSessionConfig, CaptureStats, SessionState};
use crate::inference::{Classifier, Completion, InferenceWorker};
use crate::presentation::ResultsView;
use crate::utils::error::{Result, VisionError};

/// Which acquisition path is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Still,
    Live,
}

pub struct ScreenController {
    view: ResultsView,
    worker: InferenceWorker,
    completions: Receiver<Completion>,
    session: CaptureSession,
    capture_config: CaptureSessionConfig,
    mode: Mode,
    failures: u64,
    last_error: Option<VisionError>,
}

impl ScreenController {
    /// Start the inference worker with an already loaded classifier
    pub fn new<C>(
        classifier: C,
        view: ResultsView,
        capture_config: CaptureSessionConfig,
    ) -> Result<Self>
    where
        C: Classifier + 'static,
    {
        let (worker, completions) = InferenceWorker::spawn(classifier)?;
        Ok(Self {
            view,
            worker,
            completions,
            session: CaptureSession::new(),
            capture_config,
            mode: Mode::Still,
            failures: 0,
            last_error: None,
        })
    }

    pub fn from_config<C>(classifier: C, config: &AppConfig) -> Result<Self>
    where
        C: Classifier + 'static,
    {
        let view = ResultsView::new(config.variant).with_row_policy(config.effective_row_policy());
        Self::new(classifier, view, config.capture.clone())
    }

    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Frame counters of the current or last live run
    pub fn live_stats(&self) -> CaptureStats {
        self.session.stats()
    }

    /// Whether the live source has run out of frames
    pub fn live_finished(&self) -> bool {
        self.mode == Mode::Live && self.session.is_finished()
    }

    /// Requests that failed to classify so far
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Most recent classification failure, cleared on read
    pub fn take_last_error(&mut self) -> Option<VisionError> {
        self.last_error.take()
    }

    /// Classify a picked library image
    pub fn pick_image(&mut self, path: &Path) -> Result<()> {
        let image = load_still(path)?;
        self.enter_still_mode()?;
        self.view.begin_analysis();
        self.worker.submit(image, ImageSource::Library(path.to_path_buf()))
    }

    /// Classify one frame taken from `source`
    pub fn take_picture<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let image = capture_still(source)?;
        self.enter_still_mode()?;
        self.view.begin_analysis();
        self.worker.submit(image, ImageSource::Shutter)
    }

    /// Start classifying frames from `source` continuously
    pub fn start_live<S: FrameSource + 'static>(&mut self, source: S) -> Result<()> {
        if !self.view.variant().supports_live() {
            return Err(VisionError::InvalidInput(format!(
                "the {} screen has no live feed",
                self.view.variant()
            )));
        }
        if self.session.state() == SessionState::Running {
            self.stop_live()?;
        }
        self.session.configure(self.capture_config.clone())?;
        self.session.start(source, self.worker.sender()?)?;
        self.mode = Mode::Live;
        Ok(())
    }

    /// Stop the live feed and join the capture thread
    pub fn stop_live(&mut self) -> Result<CaptureStats> {
        let stats = self.session.stop()?;
        self.mode = Mode::Still;
        Ok(stats)
    }

    /// Apply every completion that has arrived; returns how many updated the view
    pub fn poll(&mut self) -> usize {
        let pending: Vec<Completion> = self.completions.try_iter().collect();
        let mut applied = 0;
        for completion in pending {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait up to `timeout` for a completion, then apply everything pending
    ///
    /// Returns the number of completions that updated the view.
    pub fn wait_for_update(&mut self, timeout: Duration) -> Result<usize> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => {
                let first = usize::from(self.apply(completion));
                Ok(first + self.poll())
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            Err(RecvTimeoutError::Disconnected) => {
                Err(VisionError::Inference("inference worker stopped".to_string()))
            }
        }
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let fps = completion.fps();
        match completion.result {
            Ok(result) => {
                debug!(
                    "Applying result for {} ({:.2} ms)",
                    completion.source, result.inference_time_ms
                );
                self.view.apply(result, completion.source, fps);
                true
            }
            Err(err) => {
                warn!("No result for {}: {}", completion.source, err);
                self.failures += 1;
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Stop any live feed and drain finished work so the worker can accept a still
    fn enter_still_mode(&mut self) -> Result<()> {
        if self.session.state() == SessionState::Running {
            info!("Switching from live feed to still image");
            self.stop_live()?;
        }
        self.mode = Mode::Still;
        self.poll();
        Ok(())
    }
}

impl Drop for ScreenController {
    fn drop(&mut self) {
        if self.session.state() == SessionState::Running {
            let _ = self.session.stop();
        }
        // Unblocks a worker waiting for room in the completion channel
        self.completions = crossbeam_channel::never();
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use image::DynamicImage;
    use tempfile::TempDir;

    use crate::acquisition::SyntheticFrameSource;
    use crate::inference::worker::tests::SlowClassifier;
    use crate::inference::ClassificationResult;
    use crate::presentation::ScreenVariant;

    fn controller(variant: ScreenVariant, delay_ms: u64) -> ScreenController {
        ScreenController::new(
            SlowClassifier {
                delay: Duration::from_millis(delay_ms),
            },
            ResultsView::new(variant),
            CaptureSessionConfig::default(),
        )
        .unwrap()
    }

    fn wait_for_updates(controller: &mut ScreenController, want: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.view().updates() < want && Instant::now() < deadline {
            controller.wait_for_update(Duration::from_millis(50)).unwrap();
        }
    }

    #[test]
    fn test_pick_image_updates_view() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.png");
        DynamicImage::new_rgb8(10, 10).save(&path).unwrap();

        let mut controller = controller(ScreenVariant::Optimized, 20);
        controller.pick_image(&path).unwrap();
        assert_eq!(controller.view().headline(), "Analyzing Image…");

        wait_for_updates(&mut controller, 1);
        assert_eq!(controller.view().headline(), "87% it's  tabby");
        assert_eq!(controller.view().row_count(), 3);
        assert!(controller.view().fps_text().unwrap().ends_with(" fps"));
        assert_eq!(
            controller.view().source(),
            Some(&ImageSource::Library(path.clone()))
        );
    }

    #[test]
    fn test_missing_image_is_recoverable() {
        let mut controller = controller(ScreenVariant::Basic, 1);
        let err = controller.pick_image(Path::new("/no/such/photo.jpg"));
        assert!(err.is_err());
        assert_eq!(controller.view().headline(), "");

        // Still usable afterwards
        let mut source = SyntheticFrameSource::new(8, 8, Duration::ZERO);
        controller.take_picture(&mut source).unwrap();
        wait_for_updates(&mut controller, 1);
        assert_eq!(controller.view().source(), Some(&ImageSource::Shutter));
    }

    #[test]
    fn test_take_picture_without_frames() {
        let mut controller = controller(ScreenVariant::Basic, 1);
        let mut source = SyntheticFrameSource::new(8, 8, Duration::ZERO).with_limit(0);
        assert!(matches!(
            controller.take_picture(&mut source),
            Err(VisionError::Acquisition(_))
        ));
    }

    #[test]
    fn test_live_feed_and_explicit_stop() {
        let mut controller = controller(ScreenVariant::LiveCamera, 15);
        let source = SyntheticFrameSource::new(8, 8, Duration::from_millis(2));
        controller.start_live(source).unwrap();
        assert_eq!(controller.mode(), Mode::Live);

        wait_for_updates(&mut controller, 2);
        let stats = controller.stop_live().unwrap();
        assert_eq!(controller.session_state(), SessionState::Stopped);
        assert_eq!(controller.mode(), Mode::Still);
        assert_eq!(stats.accepted + stats.dropped, stats.delivered);
        assert!(stats.dropped > 0);

        assert!(matches!(
            controller.view().source(),
            Some(ImageSource::LiveFeed(_))
        ));
        assert_eq!(controller.view().fps_text(), None);
    }

    #[test]
    fn test_still_action_stops_live_feed() {
        let mut controller = controller(ScreenVariant::Optimized, 5);
        controller
            .start_live(SyntheticFrameSource::new(8, 8, Duration::from_millis(5)))
            .unwrap();

        let mut shutter = SyntheticFrameSource::new(8, 8, Duration::ZERO);
        controller.take_picture(&mut shutter).unwrap();
        assert_eq!(controller.session_state(), SessionState::Stopped);
        assert_eq!(controller.mode(), Mode::Still);
    }

    #[test]
    fn test_basic_screen_rejects_live() {
        let mut controller = controller(ScreenVariant::Basic, 1);
        let result = controller.start_live(SyntheticFrameSource::new(8, 8, Duration::ZERO));
        assert!(matches!(result, Err(VisionError::InvalidInput(_))));
        assert_eq!(controller.session_state(), SessionState::Idle);
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult> {
            Err(VisionError::Inference("unexpected result shape".to_string()))
        }
    }

    #[test]
    fn test_inference_failure_leaves_view_untouched() {
        let mut controller = ScreenController::new(
            BrokenClassifier,
            ResultsView::new(ScreenVariant::Optimized),
            CaptureSessionConfig::default(),
        )
        .unwrap();

        let mut source = SyntheticFrameSource::new(8, 8, Duration::ZERO);
        controller.take_picture(&mut source).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.failures() == 0 && Instant::now() < deadline {
            controller.wait_for_update(Duration::from_millis(50)).unwrap();
        }

        assert_eq!(controller.failures(), 1);
        assert_eq!(controller.view().updates(), 0);
        assert!(controller.view().result().is_none());
        assert!(controller.take_last_error().is_some());
    }

    #[test]
    fn test_many_stills_without_waiting_are_all_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dog.png");
        DynamicImage::new_rgb8(6, 6).save(&path).unwrap();

        let mut controller = controller(ScreenVariant::Optimized, 0);
        let picks = crate::inference::COMPLETION_CAPACITY as u64 * 2;
        for _ in 0..picks {
            controller.pick_image(&path).unwrap();
        }

        wait_for_updates(&mut controller, picks);
        assert_eq!(controller.view().updates(), picks);
        assert_eq!(controller.failures(), 0);
    }
}
