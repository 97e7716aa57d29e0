//! Directory of pre-rendered frames.

use crate::source::{FrameSelector, FrameSource};
use crate::{Error, Result};
use image::imageops::FilterType;
use panelcast_hw::FrameSurface;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const EXTENSIONS: [&str; 4] = ["png", "bmp", "jpg", "jpeg"];

/// Frames loaded from image files, ordered by file name.
///
/// Files are decoded on demand and resized to the requested panel size.
#[derive(Debug)]
pub struct ImageSequence {
    frames: Vec<PathBuf>,
    fps: u32,
    last: Option<(usize, FrameSurface)>,
}

impl ImageSequence {
    /// Collects the PNG, BMP and JPEG files in `dir`, authored at `fps`.
    pub fn open(dir: impl AsRef<Path>, fps: u32) -> Result<Self> {
        let dir = dir.as_ref();
        if fps == 0 {
            return Err(Error::InvalidFrameRate(fps));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_frame && path.is_file() {
                frames.push(path);
            }
        }
        if frames.is_empty() {
            return Err(Error::EmptySource);
        }
        frames.sort();

        info!(
            "Loaded {} frames from {} at {} fps",
            frames.len(),
            dir.display(),
            fps
        );
        Ok(Self {
            frames,
            fps,
            last: None,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.frames
    }
}

fn load(path: &Path, width: u32, height: u32) -> Result<FrameSurface> {
    let mut image = image::open(path)?;
    if image.width() != width || image.height() != height {
        debug!(
            "Resizing {} from {}x{} to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            width,
            height
        );
        image = image.resize_exact(width, height, FilterType::Triangle);
    }
    Ok(FrameSurface::from_dynamic(image))
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame_rate(&self) -> Option<u32> {
        Some(self.fps)
    }

    async fn render(
        &mut self,
        selector: FrameSelector,
        width: u32,
        height: u32,
    ) -> Result<FrameSurface> {
        let index = selector.index_for(self.frames.len(), self.fps);
        if let Some((cached, surface)) = &self.last {
            if *cached == index && surface.width() == width && surface.height() == height {
                return Ok(surface.clone());
            }
        }

        let path = self.frames[index].clone();
        let surface = tokio::task::spawn_blocking(move || load(&path, width, height))
            .await
            .map_err(|e| Error::Source(e.to_string()))??;
        self.last = Some((index, surface.clone()));
        Ok(surface)
    }
}
