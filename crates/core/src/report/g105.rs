//! Logitech G105 reports.
//!
//! All special keys arrive in one 4-byte report with ID 0x03:
//! byte 1 is the G1..G6 bitmask, byte 2 holds M1..M3 (bits 0..=2) and MR
//! (bit 3). LEDs are written with feature report 0x06.

use super::unrecognized;
use crate::error::Result;
use crate::key::{KeyData, KeyIdentity};

pub const REPORT_ID_KEYS: u8 = 0x03;
pub const REPORT_LEN: usize = 4;

pub const REPORT_ID_LED: u8 = 0x06;
const LED_COMMAND: u8 = 0x87;

pub const MAX_MACRO_KEYS: u8 = 6;

const MKEY_COUNT: u8 = 3;
const MKEY_RECORD: u8 = 0x08;

pub const PROFILE_LEDS: [u8; 3] = [0x01, 0x02, 0x04];
pub const LED_RECORD: u8 = 0x08;

pub fn decode(raw: &[u8], macro_keys: u8) -> Result<Vec<KeyData>> {
    if raw.len() != REPORT_LEN || raw[0] != REPORT_ID_KEYS {
        return Err(unrecognized(raw));
    }

    let gkeys = raw[1];
    let mkeys = raw[2];
    let limit = macro_keys.min(MAX_MACRO_KEYS);

    let mut keys: Vec<KeyData> = (0..limit)
        .filter(|bit| gkeys & (1 << bit) != 0)
        .map(|bit| KeyData::pressed(KeyIdentity::Macro(bit + 1)))
        .collect();
    keys.extend(
        (0..MKEY_COUNT)
            .filter(|bit| mkeys & (1 << bit) != 0)
            .map(|bit| KeyData::pressed(KeyIdentity::ProfileSelect(bit))),
    );
    if mkeys & MKEY_RECORD != 0 {
        keys.push(KeyData::pressed(KeyIdentity::Record));
    }
    Ok(keys)
}

pub fn led_report(mask: u8) -> Vec<u8> {
    vec![REPORT_ID_LED, LED_COMMAND, mask, 0x00]
}

/// Feature report ID that maps the G-keys.
pub const REPORT_ID_GKEY_MAP: u8 = 0x09;
const GKEY_MAP_LEN: usize = 13;

/// Clears the firmware's G-key mapping. Out of the box G1..G6 type digits;
/// once cleared they only show up in the vendor report.
pub fn reset_macro_keys_report() -> Vec<u8> {
    let mut buf = vec![0u8; GKEY_MAP_LEN];
    buf[0] = REPORT_ID_GKEY_MAP;
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_report_clears_whole_map() {
        let buf = reset_macro_keys_report();
        assert_eq!(buf.len(), 13);
        assert_eq!(buf[0], REPORT_ID_GKEY_MAP);
        assert!(buf[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn gkeys_decode_by_bit() {
        assert_eq!(
            decode(&[0x03, 0x20, 0x00, 0x00], 6).unwrap(),
            vec![KeyData::pressed(KeyIdentity::Macro(6))]
        );
        let keys = decode(&[0x03, 0x05, 0x00, 0x00], 6).unwrap();
        assert_eq!(
            keys,
            vec![
                KeyData::pressed(KeyIdentity::Macro(1)),
                KeyData::pressed(KeyIdentity::Macro(3)),
            ]
        );
    }

    #[test]
    fn unused_gkey_bits_are_ignored() {
        assert!(decode(&[0x03, 0xC0, 0x00, 0x00], 6).unwrap().is_empty());
    }

    #[test]
    fn mkeys_select_profiles() {
        assert_eq!(
            decode(&[0x03, 0x00, 0x01, 0x00], 6).unwrap(),
            vec![KeyData::pressed(KeyIdentity::ProfileSelect(0))]
        );
        assert_eq!(
            decode(&[0x03, 0x00, 0x04, 0x00], 6).unwrap(),
            vec![KeyData::pressed(KeyIdentity::ProfileSelect(2))]
        );
    }

    #[test]
    fn mr_is_record() {
        assert_eq!(
            decode(&[0x03, 0x00, 0x08, 0x00], 6).unwrap(),
            vec![KeyData::pressed(KeyIdentity::Record)]
        );
    }

    #[test]
    fn release_report_is_empty() {
        assert!(decode(&[0x03, 0x00, 0x00, 0x00], 6).unwrap().is_empty());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(decode(&[0x03, 0x01, 0x00], 6).is_err());
        assert!(decode(&[0x03, 0x01, 0x00, 0x00, 0x00], 6).is_err());
        assert!(decode(&[0x08, 0x01, 0x00, 0x00], 6).is_err());
    }

    #[test]
    fn led_report_layout() {
        assert_eq!(led_report(0x09), vec![0x06, 0x87, 0x09, 0x00]);
    }
}
