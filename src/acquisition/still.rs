//! Still image acquisition: library picks and shutter captures

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::debug;
use walkdir::WalkDir;

use super::frames::FrameSource;
use crate::utils::error::{Result, VisionError};

/// File extensions treated as images
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Whether a path has one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Load a picked image from disk
///
/// A missing file or one that cannot be decoded is reported to the caller;
/// the app keeps running.
pub fn load_still(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(VisionError::PathNotFound(path.to_path_buf()));
    }
    let image = image::open(path)
        .map_err(|e| VisionError::ImageLoad(path.to_path_buf(), e.to_string()))?;
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Take the next frame of a source as a still picture
///
/// An exhausted source (no camera, no more frames) is an acquisition error.
pub fn capture_still<S: FrameSource + ?Sized>(source: &mut S) -> Result<DynamicImage> {
    match source.next_frame()? {
        Some(frame) => Ok(frame.image),
        None => Err(VisionError::Acquisition(format!(
            "{} produced no frame",
            source.describe()
        ))),
    }
}

/// Image files directly inside a directory, or under it when `recursive`
///
/// Paths are sorted so replays are deterministic.
pub fn collect_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(VisionError::PathNotFound(dir.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| is_image_file(p))
        .collect();
    images.sort();

    Ok(images)
}
