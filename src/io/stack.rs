//! Frame stacks on disk: one numbered 16-bit grayscale TIFF per frame

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::SimResult;
use crate::image_proc::image::gray16_image_to_frame;
use crate::image_proc::Frame;

/// File name of the `index`-th frame (1-based) of a stack.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:05}.tif")
}

/// Write `frames` into `dir` (created if missing) as `frame_00001.tif`, ...
///
/// Pixel values are rounded and saturate at `u16::MAX`.
pub fn save_stack(frames: &[Frame], dir: &Path) -> SimResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(frames.len());
    for (idx, frame) in frames.iter().enumerate() {
        let path = dir.join(frame_file_name(idx + 1));
        frame.to_gray16_image().save(&path)?;
        paths.push(path);
    }

    info!("Saved {} frames to {}", frames.len(), dir.display());
    Ok(paths)
}

/// Read every TIFF or PNG in `dir`, ordered by file name.
pub fn load_stack(dir: &Path) -> SimResult<Vec<Frame>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tif" | "tiff" | "png"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        let img = image::open(path)?.into_luma16();
        frames.push(gray16_image_to_frame(&img));
    }

    info!("Loaded {} frames from {}", frames.len(), dir.display());
    Ok(frames)
}
