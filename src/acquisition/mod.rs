//! Image acquisition
//!
//! Three ways to obtain an image: a picked file from the library, a shutter
//! capture (one frame taken from a frame source), or a continuous live feed.

pub mod frames;
pub mod still;

pub use frames::{
    interval_for_fps, noise_image, DirectoryFrameSource, Frame, FrameSource, SyntheticFrameSource,
};
pub use still::{capture_still, collect_images, is_image_file, load_still};

use std::path::PathBuf;

/// Where an image handed to the classifier came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Picked from the photo library
    Library(PathBuf),
    /// Single shutter capture
    Shutter,
    /// Live feed frame with its sequence number
    LiveFeed(u64),
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Library(path) => write!(f, "library:{}", path.display()),
            ImageSource::Shutter => write!(f, "shutter"),
            ImageSource::LiveFeed(n) => write!(f, "frame #{}", n),
        }
    }
}
