//! ST7789 command set and per-panel init tables.
//!
//! The init tables are vendor configuration (porch, gate, VCOM, power and
//! gamma settings) and are replayed verbatim. The MADCTL payload is not part
//! of the tables; it comes from the resolved `PanelProfile`.

use crate::profile::PanelKind;

/// ST7789 command bytes used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    SoftwareReset = 0x01,
    SleepOut = 0x11,
    InversionOn = 0x21,
    DisplayOn = 0x29,
    /// Column address set (CASET).
    ColumnAddressSet = 0x2A,
    /// Row address set (RASET).
    RowAddressSet = 0x2B,
    /// Memory write (RAMWR).
    MemoryWrite = 0x2C,
    /// Memory data access control (MADCTL).
    MemoryAccessControl = 0x36,
    /// Interface pixel format (COLMOD).
    PixelFormat = 0x3A,
    PorchSetting = 0xB2,
    GateControl = 0xB7,
    VcomSetting = 0xBB,
    LcmControl = 0xC0,
    VdvVrhEnable = 0xC2,
    VrhSet = 0xC3,
    VdvSet = 0xC4,
    FrameRateControl = 0xC6,
    PowerControl1 = 0xD0,
    PositiveGamma = 0xE0,
    NegativeGamma = 0xE1,
}

/// COLMOD payload for 16 bits per pixel.
pub const COLMOD_RGB565: u8 = 0x05;

/// One step of an init sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Command followed by its parameter bytes.
    Cmd(Command, &'static [u8]),
    /// MADCTL with the profile's orientation byte.
    MemoryAccess,
    /// Settle time in milliseconds.
    Delay(u32),
}

use Command::*;
use InitStep::{Cmd, Delay, MemoryAccess};

const INIT_2IN4: &[InitStep] = &[
    Cmd(SoftwareReset, &[]),
    Delay(150),
    MemoryAccess,
    Cmd(PixelFormat, &[COLMOD_RGB565]),
    Cmd(InversionOn, &[]),
    Cmd(PorchSetting, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    Cmd(GateControl, &[0x35]),
    Cmd(VcomSetting, &[0x1F]),
    Cmd(LcmControl, &[0x2C]),
    Cmd(VdvVrhEnable, &[0x01]),
    Cmd(VrhSet, &[0x12]),
    Cmd(VdvSet, &[0x20]),
    Cmd(FrameRateControl, &[0x0F]),
    Cmd(PowerControl1, &[0xA4, 0xA1]),
    Cmd(
        PositiveGamma,
        &[
            0xD0, 0x08, 0x11, 0x08, 0x0C, 0x15, 0x39, 0x33, 0x50, 0x36, 0x13, 0x14, 0x29, 0x2D,
        ],
    ),
    Cmd(
        NegativeGamma,
        &[
            0xD0, 0x08, 0x10, 0x08, 0x06, 0x06, 0x39, 0x44, 0x51, 0x0B, 0x16, 0x14, 0x2F, 0x31,
        ],
    ),
    Cmd(SleepOut, &[]),
    Delay(120),
];

const INIT_1IN47: &[InitStep] = &[
    Cmd(SoftwareReset, &[]),
    Delay(150),
    Cmd(SleepOut, &[]),
    Delay(120),
    MemoryAccess,
    Cmd(PixelFormat, &[COLMOD_RGB565]),
    Cmd(PorchSetting, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    Cmd(GateControl, &[0x35]),
    Cmd(VcomSetting, &[0x35]),
    Cmd(LcmControl, &[0x2C]),
    Cmd(VdvVrhEnable, &[0x01]),
    Cmd(VrhSet, &[0x13]),
    Cmd(VdvSet, &[0x20]),
    Cmd(FrameRateControl, &[0x0F]),
    Cmd(PowerControl1, &[0xA4, 0xA1]),
    Cmd(
        PositiveGamma,
        &[
            0xF0, 0xF0, 0x00, 0x04, 0x04, 0x04, 0x05, 0x29, 0x33, 0x3E, 0x38, 0x12, 0x12, 0x28,
            0x30,
        ],
    ),
    Cmd(
        NegativeGamma,
        &[
            0xF0, 0x07, 0x0A, 0x0D, 0x0B, 0x07, 0x28, 0x33, 0x3E, 0x36, 0x14, 0x14, 0x29, 0x32,
        ],
    ),
    Cmd(InversionOn, &[]),
];

const INIT_1IN3: &[InitStep] = &[
    Cmd(SoftwareReset, &[]),
    Delay(150),
    Cmd(SleepOut, &[]),
    Delay(120),
    Cmd(PixelFormat, &[COLMOD_RGB565]),
    MemoryAccess,
    Cmd(PorchSetting, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    Cmd(GateControl, &[0x35]),
    Cmd(VcomSetting, &[0x19]),
    Cmd(LcmControl, &[0x2C]),
    Cmd(VdvVrhEnable, &[0x01]),
    Cmd(VrhSet, &[0x12]),
    Cmd(VdvSet, &[0x20]),
    Cmd(FrameRateControl, &[0x0F]),
    Cmd(PowerControl1, &[0xA4, 0xA1]),
    Cmd(
        PositiveGamma,
        &[
            0xD0, 0x04, 0x0D, 0x11, 0x13, 0x2B, 0x3F, 0x54, 0x4C, 0x18, 0x0D, 0x0B, 0x1F, 0x23,
        ],
    ),
    Cmd(
        NegativeGamma,
        &[
            0xD0, 0x04, 0x0C, 0x11, 0x13, 0x2C, 0x3F, 0x44, 0x51, 0x2F, 0x1F, 0x1F, 0x20, 0x23,
        ],
    ),
    Cmd(InversionOn, &[]),
];

/// Returns the init table for a panel module.
pub fn init_sequence(kind: PanelKind) -> &'static [InitStep] {
    match kind {
        PanelKind::Lcd2in4 => INIT_2IN4,
        PanelKind::Lcd1in47 => INIT_1IN47,
        PanelKind::Lcd1in3 => INIT_1IN3,
    }
}

/// Encodes a CASET/RASET payload: start and inclusive end, big-endian.
pub fn encode_range(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}
