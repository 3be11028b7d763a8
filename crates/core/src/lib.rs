//! sidewinderd-core: special-key support for gaming keyboards on Linux.
//!
//! Decodes the vendor reports of Microsoft SideWinder X4/X6 and Logitech
//! G105 keyboards, drives their indicator LEDs, and records and replays
//! per-profile macros through a uinput virtual keyboard.

pub mod capture;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod hid;
pub mod input;
#[cfg(test)]
mod integration_tests;
pub mod key;
pub mod led;
pub mod macros;
pub mod report;
pub mod shutdown;
pub mod store;

/// Microsoft USB Vendor ID.
pub const MICROSOFT_VID: u16 = 0x045E;

/// Logitech USB Vendor ID.
pub const LOGITECH_VID: u16 = 0x046D;

/// Supported product IDs.
pub mod pids {
    /// SideWinder X6.
    pub const SIDEWINDER_X6: u16 = 0x074B;
    /// SideWinder X4.
    pub const SIDEWINDER_X4: u16 = 0x0768;
    /// Logitech G105.
    pub const G105: u16 = 0xC248;
}
