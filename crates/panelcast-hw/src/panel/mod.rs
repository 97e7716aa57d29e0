//! Panel protocol driver.
//!
//! Reset, init, address-window programming and pixel streaming for
//! ST7789-family controllers.

mod driver;

pub mod protocol;

pub use driver::{Panel, PanelDriver, ResetTiming, Window};
pub use protocol::{Command, InitStep};
