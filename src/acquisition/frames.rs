//! Frame sources for the live feed
//!
//! A [`FrameSource`] plays the role of the camera: it hands out frames at its
//! own pace until it runs dry. Sources never buffer ahead; whoever pulls a
//! frame decides whether it gets classified or dropped.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::still::{collect_images, load_still};
use crate::utils::error::{Result, VisionError};

/// One captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    /// Sequence number within the source, starting at 1
    pub frame_number: u64,
    pub captured_at: Instant,
}

/// A camera-like producer of frames
pub trait FrameSource: Send {
    /// Block until the next frame is due and return it
    ///
    /// `Ok(None)` means the source is exhausted. An `Err` concerns one frame
    /// only; callers may keep pulling.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Sleeps so that consecutive frames are at least `interval` apart
#[derive(Debug, Clone)]
struct Pacer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        let due = match self.next_due {
            Some(due) if due > now => {
                thread::sleep(due - now);
                due
            }
            _ => now,
        };
        self.next_due = Some(due + self.interval);
    }
}

/// Frame interval for a frame rate; zero or negative rates mean "as fast as possible"
pub fn interval_for_fps(fps: f64) -> Duration {
    if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::ZERO
    }
}

/// Replays the images of a directory as a frame stream
pub struct DirectoryFrameSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    position: usize,
    looping: bool,
    frame_number: u64,
    pacer: Pacer,
}

impl DirectoryFrameSource {
    pub fn new(dir: &Path, interval: Duration, looping: bool) -> Result<Self> {
        let paths = collect_images(dir, false)?;
        if paths.is_empty() {
            return Err(VisionError::Acquisition(format!(
                "no images found in {}",
                dir.display()
            )));
        }
        debug!("Replaying {} frames from {}", paths.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            paths,
            position: 0,
            looping,
            frame_number: 0,
            pacer: Pacer::new(interval),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = &self.paths[self.position];
        self.position += 1;
        self.frame_number += 1;

        self.pacer.wait();
        let image = load_still(path)?;

        Ok(Some(Frame {
            image,
            frame_number: self.frame_number,
            captured_at: Instant::now(),
        }))
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}

/// Generates random-noise frames of a fixed size
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    limit: Option<u64>,
    frame_number: u64,
    pacer: Pacer,
    rng: StdRng,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32, interval: Duration) -> Self {
        Self {
            width,
            height,
            limit: None,
            frame_number: 0,
            pacer: Pacer::new(interval),
            rng: StdRng::seed_from_u64(42),
        }
    }

    /// Stop after `limit` frames
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.limit.is_some_and(|limit| self.frame_number >= limit) {
            return Ok(None);
        }
        self.frame_number += 1;

        self.pacer.wait();
        let image = noise_image(self.width, self.height, &mut self.rng);

        Ok(Some(Frame {
            image,
            frame_number: self.frame_number,
            captured_at: Instant::now(),
        }))
    }

    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }
}

/// Uniform RGB noise image
pub fn noise_image<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> DynamicImage {
    let buffer = RgbImage::from_fn(width, height, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
    DynamicImage::ImageRgb8(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            DynamicImage::new_rgb8(4 + i as u32, 4)
                .save(dir.join(format!("frame_{:03}.png", i)))
                .unwrap();
        }
    }

    #[test]
    fn test_directory_source_plays_in_order() {
        let dir = TempDir::new().unwrap();
        write_frames(dir.path(), 3);

        let mut source = DirectoryFrameSource::new(dir.path(), Duration::ZERO, false).unwrap();
        assert_eq!(source.len(), 3);

        let widths: Vec<u32> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.image.width())
            .collect();
        assert_eq!(widths, vec![4, 5, 6]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_directory_source_loops() {
        let dir = TempDir::new().unwrap();
        write_frames(dir.path(), 2);

        let mut source = DirectoryFrameSource::new(dir.path(), Duration::ZERO, true).unwrap();
        for expected in 1..=5u64 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.frame_number, expected);
        }
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = DirectoryFrameSource::new(dir.path(), Duration::ZERO, false);
        assert!(matches!(result, Err(VisionError::Acquisition(_))));
    }

    #[test]
    fn test_synthetic_source_limit_and_pacing() {
        let interval = Duration::from_millis(10);
        let mut source = SyntheticFrameSource::new(16, 12, interval).with_limit(3);

        let start = Instant::now();
        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].frame_number, 3);
        assert_eq!(frames[0].image.width(), 16);
        // First frame is immediate, the next two wait one interval each
        assert!(start.elapsed() >= interval * 2);
    }

    #[test]
    fn test_interval_for_fps() {
        assert_eq!(interval_for_fps(25.0), Duration::from_millis(40));
        assert_eq!(interval_for_fps(0.0), Duration::ZERO);
    }
}
