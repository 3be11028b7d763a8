//! Indicator LEDs.
//!
//! Each [`Led`] writes through to the hardware as soon as it changes. A
//! [`LedGroup`] holds the profile indicators, of which at most one is lit.

use crate::error::Result;
use crate::hid::HidDevice;
use crate::report::Layout;
use tracing::{debug, warn};

/// Something that can switch a single hardware LED.
pub trait LedSink {
    fn write_led(&mut self, index: u8, on: bool) -> Result<()>;
}

/// LED state of a keyboard whose indicators live in one feature-report bitmask.
///
/// Every change rewrites the whole mask, so the last write always reflects
/// the complete indicator state.
struct LedPanel<'a> {
    hid: &'a mut dyn HidDevice,
    mask: &'a mut u8,
    encode: fn(u8) -> Vec<u8>,
}

impl LedSink for LedPanel<'_> {
    fn write_led(&mut self, index: u8, on: bool) -> Result<()> {
        if on {
            *self.mask |= index;
        } else {
            *self.mask &= !index;
        }
        // Updated before the write: the mask follows logical state, written or not.
        self.hid.send_feature(&(self.encode)(*self.mask))
    }
}

/// One indicator LED, identified by its hardware bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led {
    index: u8,
    on: bool,
}

impl Led {
    pub fn new(index: u8) -> Self {
        Self { index, on: false }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Switch the LED. A failed hardware write is logged and otherwise ignored;
    /// the LED still tracks the requested state.
    pub fn set(&mut self, sink: &mut dyn LedSink, on: bool) {
        if let Err(e) = sink.write_led(self.index, on) {
            warn!(led = format_args!("0x{:02X}", self.index), on, error = %e, "LED write failed");
        }
        self.on = on;
    }
}

/// Ordered set of LEDs with at most one lit.
#[derive(Debug, Clone)]
pub struct LedGroup {
    members: Vec<Led>,
    active: Option<usize>,
}

impl LedGroup {
    pub fn new(indices: &[u8]) -> Self {
        Self {
            members: indices.iter().copied().map(Led::new).collect(),
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Index of the lit member, if any.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn members(&self) -> &[Led] {
        &self.members
    }

    /// Light member `index`, switching the previous one off first.
    ///
    /// Out-of-range indices leave the group untouched.
    pub fn activate(&mut self, sink: &mut dyn LedSink, index: usize) {
        if index >= self.members.len() || self.active == Some(index) {
            return;
        }
        if let Some(prev) = self.active.take() {
            self.members[prev].set(sink, false);
        }
        self.members[index].set(sink, true);
        self.active = Some(index);
    }

    /// Switch every member off.
    pub fn clear(&mut self, sink: &mut dyn LedSink) {
        for led in &mut self.members {
            if led.is_on() {
                led.set(sink, false);
            }
        }
        self.active = None;
    }

    #[cfg(test)]
    fn lit_count(&self) -> usize {
        self.members.iter().filter(|l| l.is_on()).count()
    }
}

/// All indicators of one keyboard: profile group, record LED and, where
/// present, the auto LED and the macro pad bit.
pub struct Indicators {
    mask: u8,
    encode: fn(u8) -> Vec<u8>,
    profiles: LedGroup,
    record: Led,
    auto: Option<Led>,
    macro_pad: Option<Led>,
}

impl Indicators {
    pub fn new(layout: Layout, profile_leds: &[u8], record_led: u8) -> Self {
        Self {
            mask: 0,
            encode: layout.led_encoder(),
            profiles: LedGroup::new(profile_leds),
            record: Led::new(record_led),
            auto: layout.auto_led().map(Led::new),
            macro_pad: None,
        }
    }

    /// Track the macro pad mode, carried as `bit` in the LED mask.
    pub fn with_macro_pad(mut self, bit: u8) -> Self {
        self.macro_pad = Some(Led::new(bit));
        self
    }

    fn panel<'a>(
        mask: &'a mut u8,
        encode: fn(u8) -> Vec<u8>,
        hid: &'a mut dyn HidDevice,
    ) -> LedPanel<'a> {
        LedPanel { hid, mask, encode }
    }

    /// Light the LED of `profile` and only that one.
    pub fn show_profile(&mut self, hid: &mut dyn HidDevice, profile: usize) {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        self.profiles.activate(&mut panel, profile);
    }

    /// Profile LEDs off, record LED on.
    pub fn enter_recording(&mut self, hid: &mut dyn HidDevice) {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        self.profiles.clear(&mut panel);
        self.record.set(&mut panel, true);
    }

    /// Record LED off, then back to the profile LED.
    pub fn leave_recording(&mut self, hid: &mut dyn HidDevice, profile: usize) {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        self.record.set(&mut panel, false);
        self.profiles.activate(&mut panel, profile);
    }

    /// Flip the auto LED. `None` if the model has none.
    pub fn toggle_auto(&mut self, hid: &mut dyn HidDevice) -> Option<bool> {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        let led = self.auto.as_mut()?;
        let on = !led.is_on();
        led.set(&mut panel, on);
        Some(on)
    }

    /// Flip macro pad mode. `None` if the model has no macro pad.
    pub fn toggle_macro_pad(&mut self, hid: &mut dyn HidDevice) -> Option<bool> {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        let pad = self.macro_pad.as_mut()?;
        let on = !pad.is_on();
        pad.set(&mut panel, on);
        Some(on)
    }

    /// Switch every indicator off, macro pad mode included.
    pub fn all_off(&mut self, hid: &mut dyn HidDevice) {
        let mut panel = Self::panel(&mut self.mask, self.encode, hid);
        self.profiles.clear(&mut panel);
        if self.record.is_on() {
            self.record.set(&mut panel, false);
        }
        for led in [self.auto.as_mut(), self.macro_pad.as_mut()].into_iter().flatten() {
            if led.is_on() {
                led.set(&mut panel, false);
            }
        }
        debug!("Indicators off");
    }

    pub fn profiles(&self) -> &LedGroup {
        &self.profiles
    }

    pub fn record(&self) -> &Led {
        &self.record
    }

    pub fn auto(&self) -> Option<&Led> {
        self.auto.as_ref()
    }

    pub fn macro_pad(&self) -> Option<&Led> {
        self.macro_pad.as_ref()
    }

    /// Last LED mask written to the hardware.
    pub fn mask(&self) -> u8 {
        self.mask
    }
}
