//! Supported keyboards and device discovery.

use crate::config::ModelSpec;
use crate::error::{Error, Result};
use crate::report::{g105, Layout};
use crate::{pids, LOGITECH_VID, MICROSOFT_VID};
use std::path::PathBuf;
use tracing::{debug, info};

/// Keyboards with built-in support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardModel {
    SideWinderX6,
    SideWinderX4,
    LogitechG105,
}

impl KeyboardModel {
    pub const ALL: &'static [KeyboardModel] = &[
        KeyboardModel::SideWinderX6,
        KeyboardModel::SideWinderX4,
        KeyboardModel::LogitechG105,
    ];

    /// Look up model from USB vendor and product ID.
    pub fn from_ids(vid: u16, pid: u16) -> Option<Self> {
        match (vid, pid) {
            (MICROSOFT_VID, pids::SIDEWINDER_X6) => Some(Self::SideWinderX6),
            (MICROSOFT_VID, pids::SIDEWINDER_X4) => Some(Self::SideWinderX4),
            (LOGITECH_VID, pids::G105) => Some(Self::LogitechG105),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SideWinderX6 => "Microsoft SideWinder X6",
            Self::SideWinderX4 => "Microsoft SideWinder X4",
            Self::LogitechG105 => "Logitech G105",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::SideWinderX6 => "sidewinder-x6",
            Self::SideWinderX4 => "sidewinder-x4",
            Self::LogitechG105 => "logitech-g105",
        }
    }

    /// Built-in capability entry.
    pub fn spec(&self) -> ModelSpec {
        let (vendor_id, product_id, layout, macro_keys) = match self {
            Self::SideWinderX6 => (MICROSOFT_VID, pids::SIDEWINDER_X6, Layout::SideWinder, 30),
            Self::SideWinderX4 => (MICROSOFT_VID, pids::SIDEWINDER_X4, Layout::SideWinder, 6),
            Self::LogitechG105 => (LOGITECH_VID, pids::G105, Layout::G105, g105::MAX_MACRO_KEYS),
        };
        ModelSpec {
            tag: self.tag().to_string(),
            vendor_id,
            product_id,
            layout,
            interface: 1,
            profiles: layout.default_profile_leds().len(),
            macro_keys,
            profile_leds: layout.default_profile_leds().to_vec(),
            record_led: layout.default_record_led(),
            macro_pad: matches!(self, Self::SideWinderX6),
        }
    }
}

/// A resolved, attached keyboard.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// hidraw node of the vendor interface.
    pub node: PathBuf,
    pub model: ModelSpec,
}

impl DeviceDescriptor {
    pub fn num_profiles(&self) -> usize {
        self.model.profiles
    }

    pub fn num_macro_keys(&self) -> u8 {
        self.model.macro_keys
    }
}

/// Find every attached keyboard matching an entry of `table`.
///
/// Enumerates HID interfaces and keeps those on the model's vendor interface.
pub fn discover_devices(table: &[ModelSpec]) -> Result<Vec<DeviceDescriptor>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        let Some(spec) = table.iter().find(|s| {
            s.vendor_id == info.vendor_id()
                && s.product_id == info.product_id()
                && s.interface == info.interface_number()
        }) else {
            continue;
        };

        let node = PathBuf::from(info.path().to_string_lossy().into_owned());
        info!(
            model = %spec.tag,
            vid = format_args!("0x{:04X}", info.vendor_id()),
            pid = format_args!("0x{:04X}", info.product_id()),
            path = %node.display(),
            "Found keyboard"
        );
        devices.push(DeviceDescriptor {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            node,
            model: spec.clone(),
        });
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

/// The first supported keyboard; none attached is fatal.
pub fn discover_first(table: &[ModelSpec]) -> Result<DeviceDescriptor> {
    discover_devices(table)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::DeviceUnavailable("no supported keyboard attached".to_string()))
}

/// evdev node of the keyboard's regular typing interface.
pub fn find_capture_node(vendor_id: u16, product_id: u16) -> Option<PathBuf> {
    evdev::enumerate()
        .find(|(_, dev)| {
            let id = dev.input_id();
            id.vendor() == vendor_id
                && id.product() == product_id
                && dev
                    .supported_keys()
                    .is_some_and(|keys| keys.contains(evdev::Key::KEY_A))
        })
        .map(|(path, _)| {
            debug!(path = %path.display(), "Found capture keyboard");
            path
        })
}
