//! Synthetic keyboard registered with the kernel through uinput.
//!
//! Macro playback injects its key events here, so they reach applications
//! exactly as if they had been typed.

use crate::error::{Error, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, InputId, Key};
use tracing::{info, trace};

/// Product name the synthetic keyboard is registered under.
pub const VIRTUAL_DEVICE_NAME: &str = "sidewinderd";

/// Destination for injected key events.
pub trait KeySink {
    /// Emit one key transition, terminated by a sync event.
    fn emit_key(&mut self, code: u16, pressed: bool) -> Result<()>;
}

/// uinput keyboard. The kernel device is removed when this is dropped.
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl UinputKeyboard {
    /// Register a keyboard advertising exactly `keys`.
    pub fn register(name: &str, keys: impl IntoIterator<Item = u16>) -> Result<Self> {
        let mut set = AttributeSet::<Key>::new();
        let mut count = 0usize;
        for code in keys {
            set.insert(Key::new(code));
            count += 1;
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| Error::DeviceCreation(format!("open /dev/uinput: {e}")))?
            .name(name)
            .input_id(InputId::new(evdev::BusType::BUS_USB, 0x0001, 0x0001, 1))
            .with_keys(&set)
            .map_err(|e| Error::DeviceCreation(format!("set key bits: {e}")))?
            .build()
            .map_err(|e| Error::DeviceCreation(format!("create device: {e}")))?;

        info!(name, keys = count, "Registered virtual keyboard");
        Ok(Self { device })
    }
}

impl KeySink for UinputKeyboard {
    fn emit_key(&mut self, code: u16, pressed: bool) -> Result<()> {
        trace!(code, pressed, "uinput TX");
        // `emit` terminates the batch with SYN_REPORT.
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, i32::from(pressed))])
            .map_err(|e| Error::Io(format!("uinput write: {e}")))
    }
}

impl Drop for UinputKeyboard {
    fn drop(&mut self) {
        info!("Unregistering virtual keyboard");
    }
}
