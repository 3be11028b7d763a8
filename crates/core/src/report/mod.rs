//! Vendor report decoding.
//!
//! Every supported keyboard uses one of a small, fixed set of report
//! layouts. The layout is chosen once from the resolved model and turns raw
//! input reports into [`KeyData`] and LED masks into feature reports.

pub mod g105;
pub mod sidewinder;

use crate::error::{Error, Result};
use crate::key::KeyData;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Report layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Microsoft SideWinder X4 / X6.
    SideWinder,
    /// Logitech G105.
    G105,
}

impl Layout {
    /// Largest number of macro keys the layout can encode.
    pub fn max_macro_keys(&self) -> u8 {
        match self {
            Self::SideWinder => sidewinder::MAX_MACRO_KEYS,
            Self::G105 => g105::MAX_MACRO_KEYS,
        }
    }

    /// Whether the bank button cycles profiles (otherwise profiles are
    /// selected by dedicated keys).
    pub fn cycles_profiles(&self) -> bool {
        matches!(self, Self::SideWinder)
    }

    /// Default profile LED bits, one per profile.
    pub fn default_profile_leds(&self) -> &'static [u8] {
        match self {
            Self::SideWinder => &sidewinder::PROFILE_LEDS,
            Self::G105 => &g105::PROFILE_LEDS,
        }
    }

    /// Default record LED bit.
    pub fn default_record_led(&self) -> u8 {
        match self {
            Self::SideWinder => sidewinder::LED_RECORD,
            Self::G105 => g105::LED_RECORD,
        }
    }

    /// Auto/game-mode LED bit, if the model has one.
    pub fn auto_led(&self) -> Option<u8> {
        match self {
            Self::SideWinder => Some(sidewinder::LED_AUTO),
            Self::G105 => None,
        }
    }

    /// Macro pad mode bit, for layouts whose keypad can switch to macro keys.
    pub fn macro_pad_led(&self) -> Option<u8> {
        match self {
            Self::SideWinder => Some(sidewinder::LED_MACRO_PAD),
            Self::G105 => None,
        }
    }

    /// Feature reports sent once when the keyboard is taken over.
    pub fn startup_reports(&self) -> Vec<Vec<u8>> {
        match self {
            Self::SideWinder => Vec::new(),
            Self::G105 => vec![g105::reset_macro_keys_report()],
        }
    }

    /// Encoder turning a complete LED mask into a feature report.
    pub fn led_encoder(&self) -> fn(u8) -> Vec<u8> {
        match self {
            Self::SideWinder => sidewinder::led_report,
            Self::G105 => g105::led_report,
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SideWinder => write!(f, "sidewinder"),
            Self::G105 => write!(f, "g105"),
        }
    }
}

/// Decoder for one attached keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    layout: Layout,
    macro_keys: u8,
}

impl Decoder {
    /// `macro_keys` is clamped to what the layout can encode.
    pub fn new(layout: Layout, macro_keys: u8) -> Self {
        Self {
            layout,
            macro_keys: macro_keys.min(layout.max_macro_keys()),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn macro_keys(&self) -> u8 {
        self.macro_keys
    }

    /// Decode a raw report, failing on unexpected length or report ID.
    pub fn try_decode(&self, raw: &[u8]) -> Result<Vec<KeyData>> {
        match self.layout {
            Layout::SideWinder => sidewinder::decode(raw, self.macro_keys),
            Layout::G105 => g105::decode(raw, self.macro_keys),
        }
    }

    /// Decode a raw report; malformed reports are logged and yield nothing.
    pub fn decode(&self, raw: &[u8]) -> Vec<KeyData> {
        match self.try_decode(raw) {
            Ok(keys) => keys,
            Err(e) => {
                debug!(
                    layout = %self.layout,
                    len = raw.len(),
                    report_hex = format_args!("{:02X?}", raw),
                    error = %e,
                    "Dropping unrecognized report"
                );
                Vec::new()
            }
        }
    }
}

/// Error for a report the layout does not know.
pub(crate) fn unrecognized(raw: &[u8]) -> Error {
    match raw.first() {
        Some(id) => Error::Decode(format!(
            "unrecognized report: id 0x{id:02X}, {} bytes",
            raw.len()
        )),
        None => Error::Decode("empty report".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyIdentity;

    #[test]
    fn decoder_clamps_macro_keys() {
        assert_eq!(Decoder::new(Layout::G105, 30).macro_keys(), 6);
        assert_eq!(Decoder::new(Layout::SideWinder, 6).macro_keys(), 6);
    }

    #[test]
    fn decode_swallows_errors() {
        let dec = Decoder::new(Layout::SideWinder, 30);
        assert!(dec.try_decode(&[0x42, 0x00]).is_err());
        assert!(dec.decode(&[0x42, 0x00]).is_empty());
        assert!(dec.decode(&[]).is_empty());
    }

    #[test]
    fn wrong_length_yields_nothing_for_every_layout() {
        for layout in [Layout::SideWinder, Layout::G105] {
            let dec = Decoder::new(layout, layout.max_macro_keys());
            for len in 0..=16usize {
                if matches!((layout, len), (Layout::SideWinder, 5 | 8) | (Layout::G105, 4)) {
                    continue;
                }
                let mut raw = vec![0xFFu8; len];
                if let Some(first) = raw.first_mut() {
                    *first = match layout {
                        Layout::SideWinder => sidewinder::REPORT_ID_MACRO,
                        Layout::G105 => g105::REPORT_ID_KEYS,
                    };
                }
                assert!(dec.decode(&raw).is_empty(), "{layout} len {len}");
            }
        }
    }

    #[test]
    fn layout_parses_from_config_names() {
        #[derive(Deserialize)]
        struct Wrap {
            layout: Layout,
        }
        let w: Wrap = toml::from_str("layout = \"sidewinder\"").unwrap();
        assert_eq!(w.layout, Layout::SideWinder);
        let w: Wrap = toml::from_str("layout = \"g105\"").unwrap();
        assert_eq!(w.layout, Layout::G105);
    }

    #[test]
    fn layouts_share_decode_contract() {
        let sw = Decoder::new(Layout::SideWinder, 30);
        let g = Decoder::new(Layout::G105, 6);
        assert_eq!(
            sw.decode(&[0x08, 0x01, 0x00, 0x00, 0x00]),
            vec![KeyData::pressed(KeyIdentity::Macro(1))]
        );
        assert_eq!(
            g.decode(&[0x03, 0x01, 0x00, 0x00]),
            vec![KeyData::pressed(KeyIdentity::Macro(1))]
        );
    }
}
