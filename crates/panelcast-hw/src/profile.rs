//! Panel geometry and orientation profiles.
//!
//! Three panel modules are supported. Only the 1.47" module has a meaningful
//! orientation choice; the 2.4" module is always driven in landscape and the
//! 1.3" module is square.

use crate::{Error, Result, MAX_TRANSFER_CHUNK};
use std::str::FromStr;

/// Display orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Portrait mode, controller native scan order.
    #[default]
    Portrait,
    /// Landscape mode, row/column exchange via MADCTL.
    Landscape,
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(Error::InvalidOrientation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// Supported panel modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    /// 2.4" 320x240 module.
    Lcd2in4,
    /// 1.47" 172x320 module.
    Lcd1in47,
    /// 1.3" 240x240 module.
    Lcd1in3,
}

impl FromStr for PanelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().trim_end_matches("inch").trim_end_matches("in") {
            "2.4" => Ok(PanelKind::Lcd2in4),
            "1.47" => Ok(PanelKind::Lcd1in47),
            "1.3" => Ok(PanelKind::Lcd1in3),
            _ => Err(Error::InvalidPanel(s.to_string())),
        }
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelKind::Lcd2in4 => write!(f, "2.4in"),
            PanelKind::Lcd1in47 => write!(f, "1.47in"),
            PanelKind::Lcd1in3 => write!(f, "1.3in"),
        }
    }
}

/// Immutable geometry descriptor for one panel.
///
/// `width`/`height` are logical pixels after orientation. The RAM offsets are
/// applied when programming the address window, never folded into the
/// logical size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelProfile {
    pub kind: PanelKind,
    pub orientation: Orientation,
    pub width: u16,
    pub height: u16,
    pub x_offset: u16,
    pub y_offset: u16,
    /// MADCTL payload (scan order and RGB/BGR selection).
    pub madctl: u8,
    pub max_chunk: usize,
}

impl PanelProfile {
    /// Resolves the geometry for a panel module and orientation.
    pub fn resolve(kind: PanelKind, orientation: Orientation) -> Self {
        let (orientation, width, height, x_offset, madctl) = match (kind, orientation) {
            (PanelKind::Lcd2in4, _) => (Orientation::Landscape, 320, 240, 0, 0x70),
            (PanelKind::Lcd1in47, Orientation::Portrait) => {
                (Orientation::Portrait, 172, 320, 34, 0x00)
            }
            (PanelKind::Lcd1in47, Orientation::Landscape) => {
                (Orientation::Landscape, 320, 172, 0, 0x60)
            }
            (PanelKind::Lcd1in3, _) => (Orientation::Portrait, 240, 240, 0, 0x00),
        };

        Self {
            kind,
            orientation,
            width,
            height,
            x_offset,
            y_offset: 0,
            madctl,
            max_chunk: MAX_TRANSFER_CHUNK,
        }
    }

    /// Resolves a profile from configuration strings.
    pub fn lookup(kind: &str, orientation: &str) -> Result<Self> {
        Ok(Self::resolve(kind.parse()?, orientation.parse()?))
    }

    /// Size in bytes of a full-panel packed frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }

    /// Returns the logical dimensions.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }
}
