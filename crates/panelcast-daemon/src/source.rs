//! Frame source selection from configuration.

use crate::config::PanelConfig;
use anyhow::{Context, Result};
use panelcast_hw::FrameSurface;
use panelcast_playback::{FrameSelector, FrameSource, ImageSequence, TestPattern};

/// Frame source configured for one panel.
pub enum PanelSource {
    Pattern(TestPattern),
    Frames(ImageSequence),
}

impl PanelSource {
    /// Builds the source named by `panel.source`, authored at `fps` unless
    /// the panel overrides it.
    pub fn from_config(panel: &PanelConfig, fps: u32) -> Result<Self> {
        let fps = panel.source_fps.unwrap_or(fps);
        if panel.source == "pattern" {
            return Ok(PanelSource::Pattern(TestPattern::new(fps as usize * 2, fps)));
        }
        let frames = ImageSequence::open(&panel.source, fps)
            .with_context(|| format!("Failed to load frames from {}", panel.source))?;
        Ok(PanelSource::Frames(frames))
    }
}

impl FrameSource for PanelSource {
    fn frame_count(&self) -> usize {
        match self {
            PanelSource::Pattern(p) => p.frame_count(),
            PanelSource::Frames(f) => f.frame_count(),
        }
    }

    fn frame_rate(&self) -> Option<u32> {
        match self {
            PanelSource::Pattern(p) => p.frame_rate(),
            PanelSource::Frames(f) => f.frame_rate(),
        }
    }

    async fn render(
        &mut self,
        selector: FrameSelector,
        width: u32,
        height: u32,
    ) -> panelcast_playback::Result<FrameSurface> {
        match self {
            PanelSource::Pattern(p) => p.render(selector, width, height).await,
            PanelSource::Frames(f) => f.render(selector, width, height).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn panel(source: &str) -> PanelConfig {
        let toml = format!(
            "[[panels]]\nname = \"p\"\nkind = \"1.3in\"\nspi = \"/dev/spidev0.0\"\nsource = {:?}\n",
            source
        );
        Config::parse(&toml).unwrap().panels.remove(0)
    }

    #[test]
    fn test_pattern_source() {
        let source = PanelSource::from_config(&panel("pattern"), 30).unwrap();
        assert!(matches!(source, PanelSource::Pattern(_)));
        assert_eq!(source.frame_count(), 60);
        assert_eq!(source.frame_rate(), Some(30));
    }

    #[tokio::test]
    async fn test_frame_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            image::RgbImage::new(10, 10)
                .save(dir.path().join(format!("{:02}.bmp", i)))
                .unwrap();
        }
        let mut config = panel(dir.path().to_str().unwrap());
        config.source_fps = Some(12);

        let mut source = PanelSource::from_config(&config, 30).unwrap();
        assert_eq!(source.frame_count(), 4);
        assert_eq!(source.frame_rate(), Some(12));

        let surface = source
            .render(FrameSelector::Index(0), 240, 240)
            .await
            .unwrap();
        assert_eq!((surface.width(), surface.height()), (240, 240));
    }

    #[test]
    fn test_missing_directory() {
        assert!(PanelSource::from_config(&panel("/nonexistent/frames"), 30).is_err());
    }
}
