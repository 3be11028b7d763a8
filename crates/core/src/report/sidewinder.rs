//! Microsoft SideWinder X4 / X6 reports.
//!
//! Input reports on the vendor interface:
//! - Macro keys: 5 bytes, report ID 0x08, bytes 1..=4 form a little-endian
//!   bitmask where bit n is S(n+1). The X6 uses 30 bits, the X4 the lowest 6.
//! - Extra keys: 8 bytes, report ID 0x01, byte 6 names the pressed button.
//!
//! LEDs are one bitmask written with feature report 0x07. On the X6 the same
//! mask carries the macro pad mode bit.

use super::unrecognized;
use crate::error::Result;
use crate::key::{KeyData, KeyIdentity};
use tracing::trace;

pub const REPORT_ID_MACRO: u8 = 0x08;
pub const REPORT_ID_EXTRA: u8 = 0x01;
pub const REPORT_ID_LED: u8 = 0x07;

pub const MACRO_REPORT_LEN: usize = 5;
pub const EXTRA_REPORT_LEN: usize = 8;

/// Offset of the button code in an extra-key report.
const EXTRA_KEY_OFFSET: usize = 6;

pub const EXTRA_GAME_CENTER: u8 = 0x10;
pub const EXTRA_RECORD: u8 = 0x11;
pub const EXTRA_MACRO_PAD: u8 = 0x13;
pub const EXTRA_PROFILE: u8 = 0x14;

pub const MAX_MACRO_KEYS: u8 = 30;

/// X6 keypad in macro mode.
pub const LED_MACRO_PAD: u8 = 0x01;
pub const LED_AUTO: u8 = 0x02;
pub const PROFILE_LEDS: [u8; 3] = [0x04, 0x08, 0x10];
pub const LED_RECORD: u8 = 0x40;

/// Decode one report. `macro_keys` bounds the bits considered.
pub fn decode(raw: &[u8], macro_keys: u8) -> Result<Vec<KeyData>> {
    match (raw.first().copied(), raw.len()) {
        (Some(REPORT_ID_MACRO), MACRO_REPORT_LEN) => {
            let mask = u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]);
            Ok(decode_mask(mask, macro_keys))
        }
        (Some(REPORT_ID_EXTRA), EXTRA_REPORT_LEN) => Ok(decode_extra(raw[EXTRA_KEY_OFFSET])
            .map(KeyData::pressed)
            .into_iter()
            .collect()),
        _ => Err(unrecognized(raw)),
    }
}

/// One pressed macro key per set bit below `macro_keys`.
fn decode_mask(mask: u32, macro_keys: u8) -> Vec<KeyData> {
    let limit = u32::from(macro_keys.min(MAX_MACRO_KEYS));
    let supported = (1u32 << limit) - 1;
    if mask & !supported != 0 {
        trace!(
            mask = format_args!("0x{mask:08X}"),
            macro_keys,
            "Ignoring macro bits outside supported range"
        );
    }
    (0..limit)
        .filter(|bit| mask & (1 << bit) != 0)
        .map(|bit| KeyData::pressed(KeyIdentity::Macro(bit as u8 + 1)))
        .collect()
}

fn decode_extra(code: u8) -> Option<KeyIdentity> {
    match code {
        EXTRA_GAME_CENTER => Some(KeyIdentity::GameCenter),
        EXTRA_RECORD => Some(KeyIdentity::Record),
        EXTRA_MACRO_PAD => Some(KeyIdentity::MacroPad),
        EXTRA_PROFILE => Some(KeyIdentity::ProfileCycle),
        _ => None,
    }
}

/// Feature report carrying the full LED mask.
pub fn led_report(mask: u8) -> Vec<u8> {
    vec![REPORT_ID_LED, mask]
}
