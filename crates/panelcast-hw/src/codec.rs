//! Colour conversion into the panel's packed RGB565 format.
//!
//! Pixels are truncated to 5-6-5 and emitted high byte first, which is the
//! order the ST7789 expects on the wire when COLMOD is set to 16 bpp.

use crate::{Error, Result};
use image::{DynamicImage, RgbImage, RgbaImage};

/// Channel layout of a source surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb888,
    Bgr888,
    /// Alpha is ignored.
    Rgba8888,
    /// Alpha is ignored.
    Bgra8888,
}

impl PixelFormat {
    /// Bytes occupied by one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb888 | PixelFormat::Bgr888 => 3,
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 => 4,
        }
    }

    /// Byte offsets of the red, green and blue channels within a pixel.
    fn channel_offsets(&self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Rgb888 | PixelFormat::Rgba8888 => (0, 1, 2),
            PixelFormat::Bgr888 | PixelFormat::Bgra8888 => (2, 1, 0),
        }
    }
}

/// A rendered frame in a source colour format.
#[derive(Debug, Clone)]
pub struct FrameSurface {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl FrameSurface {
    /// Wraps a pixel buffer, checking that its length matches the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::SurfaceSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Converts any decoded image into an RGB surface.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        image.into_rgb8().into()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl From<RgbImage> for FrameSurface {
    fn from(image: RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            format: PixelFormat::Rgb888,
            data: image.into_raw(),
        }
    }
}

impl From<RgbaImage> for FrameSurface {
    fn from(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            format: PixelFormat::Rgba8888,
            data: image.into_raw(),
        }
    }
}

/// A frame in the panel's native big-endian RGB565 format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PackedFrame {
    /// Wraps already-packed bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 2;
        if data.len() != expected {
            return Err(Error::FrameSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a frame filled with one RGB565 colour.
    pub fn solid(width: u32, height: u32, color: u16) -> Self {
        let data = color
            .to_be_bytes()
            .repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Packs a surface. Called once per frame regardless of the target panel.
    pub fn encode(surface: &FrameSurface) -> Self {
        let bpp = surface.format.bytes_per_pixel();
        let (ri, gi, bi) = surface.format.channel_offsets();
        let mut data = Vec::with_capacity(surface.data.len() / bpp * 2);

        for px in surface.data.chunks_exact(bpp) {
            let packed = rgb888_to_rgb565(px[ri], px[gi], px[bi]);
            data.extend_from_slice(&packed.to_be_bytes());
        }

        Self {
            width: surface.width,
            height: surface.height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the wire bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads back one pixel as RGB565.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x < self.width && y < self.height {
            let idx = (y as usize * self.width as usize + x as usize) * 2;
            Some(u16::from_be_bytes([self.data[idx], self.data[idx + 1]]))
        } else {
            None
        }
    }
}

/// Converts RGB888 to RGB565.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Converts RGB565 to RGB888.
#[inline]
pub fn rgb565_to_rgb888(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 11) & 0x1F) as u8;
    let g = ((pixel >> 5) & 0x3F) as u8;
    let b = (pixel & 0x1F) as u8;
    // Expand to 8-bit
    let r8 = (r << 3) | (r >> 2);
    let g8 = (g << 2) | (g >> 4);
    let b8 = (b << 3) | (b >> 2);
    (r8, g8, b8)
}

/// Parses a hex color string to RGB565.
pub fn parse_hex_color(hex: &str) -> Option<u16> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(rgb888_to_rgb565(r, g, b))
}
