//! Capture session
//!
//! Drives a [`FrameSource`] on a background thread and offers every frame to
//! the inference worker. With `discard_late_frames` a frame that arrives
//! while the worker is busy is dropped on the spot; nothing is queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::acquisition::{FrameSource, ImageSource};
use crate::inference::{JobSender, Offer};
use crate::utils::error::Result;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configured,
    Running,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Configured => "configured",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error("failed to spawn capture thread: {0}")]
    Spawn(String),
}

/// Frame size preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePreset {
    /// Full source resolution
    #[default]
    Photo,
    /// Longest edge at most 1280 px
    High,
    /// Longest edge at most 640 px
    Medium,
    /// Longest edge at most 320 px
    Low,
}

impl CapturePreset {
    /// Longest frame edge, `None` for unlimited
    pub fn max_edge(&self) -> Option<u32> {
        match self {
            CapturePreset::Photo => None,
            CapturePreset::High => Some(1280),
            CapturePreset::Medium => Some(640),
            CapturePreset::Low => Some(320),
        }
    }
}

/// Pixel layout frames are converted to before classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit RGBA; a camera's BGRA buffers land here after channel reordering
    #[default]
    Rgba8,
    /// 8-bit three channel
    Rgb8,
}

/// Session settings, fixed for the lifetime of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSessionConfig {
    pub preset: CapturePreset,
    pub pixel_format: PixelFormat,
    /// Drop frames that arrive while the worker is busy
    pub discard_late_frames: bool,
}

impl Default for CaptureSessionConfig {
    fn default() -> Self {
        Self {
            preset: CapturePreset::Photo,
            pixel_format: PixelFormat::Rgba8,
            discard_late_frames: true,
        }
    }
}

impl CaptureSessionConfig {
    /// Apply the preset size limit and pixel format to a frame
    pub fn prepare(&self, image: DynamicImage) -> DynamicImage {
        let image = match self.preset.max_edge() {
            Some(edge) if image.width().max(image.height()) > edge => {
                image.resize(edge, edge, FilterType::Triangle)
            }
            _ => image,
        };
        match self.pixel_format {
            PixelFormat::Rgba8 => match image {
                DynamicImage::ImageRgba8(_) => image,
                other => DynamicImage::ImageRgba8(other.to_rgba8()),
            },
            PixelFormat::Rgb8 => match image {
                DynamicImage::ImageRgb8(_) => image,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        }
    }
}

/// Frame counters of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames produced by the source
    pub delivered: u64,
    /// Frames handed to the worker
    pub accepted: u64,
    /// Frames discarded because the worker was busy
    pub dropped: u64,
    /// Frames the source failed to produce
    pub source_errors: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    source_errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }
}

/// Live capture session: `Idle -> Configured -> Running -> Stopped`
///
/// A stopped session can be configured again and restarted.
pub struct CaptureSession {
    state: SessionState,
    config: Option<CaptureSessionConfig>,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            config: None,
            stop: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            handle: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&CaptureSessionConfig> {
        self.config.as_ref()
    }

    /// Frame counters of the current or last run
    pub fn stats(&self) -> CaptureStats {
        self.counters.snapshot()
    }

    /// Whether the capture thread has ended on its own (source exhausted)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub fn configure(&mut self, config: CaptureSessionConfig) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Configured | SessionState::Stopped => {
                debug!("Capture session configured: {:?}", config);
                self.config = Some(config);
                self.state = SessionState::Configured;
                Ok(())
            }
            from => Err(SessionError::InvalidTransition {
                from,
                action: "configure",
            }
            .into()),
        }
    }

    /// Start pulling frames from `source` and offering them to `sink`
    pub fn start<S>(&mut self, source: S, sink: JobSender) -> Result<()>
    where
        S: FrameSource + 'static,
    {
        let config = match (self.state, &self.config) {
            (SessionState::Configured, Some(config)) => config.clone(),
            (from, _) => {
                return Err(SessionError::InvalidTransition {
                    from,
                    action: "start",
                }
                .into())
            }
        };

        self.stop = Arc::new(AtomicBool::new(false));
        self.counters = Arc::new(Counters::default());

        let stop = self.stop.clone();
        let counters = self.counters.clone();
        info!("Starting capture from {}", source.describe());
        let handle = thread::Builder::new()
            .name("capture-session".to_string())
            .spawn(move || capture_loop(source, sink, config, stop, counters))
            .map_err(|e| SessionError::Spawn(e.to_string()))?;

        self.handle = Some(handle);
        self.state = SessionState::Running;
        Ok(())
    }

    /// Stop capturing and join the capture thread
    pub fn stop(&mut self) -> Result<CaptureStats> {
        if self.state != SessionState::Running {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "stop",
            }
            .into());
        }

        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
        self.state = SessionState::Stopped;

        let stats = self.stats();
        info!(
            "Capture stopped: {} delivered, {} classified, {} dropped",
            stats.delivered, stats.accepted, stats.dropped
        );
        Ok(stats)
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.state == SessionState::Running {
            let _ = self.stop();
        }
    }
}

fn capture_loop<S: FrameSource>(
    mut source: S,
    sink: JobSender,
    config: CaptureSessionConfig,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    while !stop.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("{} exhausted", source.describe());
                break;
            }
            Err(err) => {
                counters.source_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping frame: {}", err);
                continue;
            }
        };
        counters.delivered.fetch_add(1, Ordering::Relaxed);

        let image = config.prepare(frame.image);
        let origin = ImageSource::LiveFeed(frame.frame_number);

        let outcome = if config.discard_late_frames {
            sink.offer(image, origin)
        } else {
            sink.submit(image, origin).map(|()| Offer::Accepted)
        };

        match outcome {
            Ok(Offer::Accepted) => {
                counters.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Offer::Dropped) => {
                let dropped = counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Dropped frame #{} (worker busy, {} dropped)", frame.frame_number, dropped);
            }
            Err(err) => {
                warn!("Capture stopping: {}", err);
                break;
            }
        }
    }
}
