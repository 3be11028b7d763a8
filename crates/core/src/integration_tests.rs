//! Integration tests: raw vendor reports through decoder, controller, macro
//! store and virtual keyboard, using simulated devices.

#[cfg(test)]
mod tests {
    use crate::capture::mock::MockCapture;
    use crate::controller::{Controller, Mode};
    use crate::device::KeyboardModel;
    use crate::error::Error;
    use crate::hid::mock::MockHid;
    use crate::input::mock::MockSink;
    use crate::macros::{Macro, MacroEngine, MacroStep};
    use crate::shutdown::ShutdownSignal;
    use crate::store::{scratch_dir, MacroStore};
    use std::time::Duration;

    const KEY_A: u16 = 30;
    const KEY_B: u16 = 48;

    const SW_RECORD: [u8; 8] = [0x01, 0, 0, 0, 0, 0, 0x11, 0];
    const SW_PROFILE: [u8; 8] = [0x01, 0, 0, 0, 0, 0, 0x14, 0];

    /// SideWinder macro-key report with the given keys (1-based) held.
    fn sw_macro(keys: &[u8]) -> [u8; 5] {
        let mask = keys.iter().fold(0u32, |m, k| m | 1u32 << (k - 1));
        let b = mask.to_le_bytes();
        [0x08, b[0], b[1], b[2], b[3]]
    }

    fn keyboard(model: KeyboardModel, tag: &str, sink: MockSink) -> Controller<MockHid, MockSink> {
        let engine = MacroEngine::new(MacroStore::new(scratch_dir(tag)), true);
        Controller::new(&model.spec(), MockHid::new(), sink, engine)
    }

    fn tap(key: u16) -> Macro {
        Macro {
            steps: vec![
                MacroStep {
                    key,
                    pressed: true,
                    delay_ms: 0,
                },
                MacroStep {
                    key,
                    pressed: false,
                    delay_ms: 0,
                },
            ],
        }
    }

    /// Record a press and, 120ms later, a release; playback keeps the gap.
    #[test]
    fn sidewinder_record_then_play() {
        let capture = MockCapture::new();
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-roundtrip", MockSink::new())
            .with_capture(Box::new(capture.clone()));

        kb.handle_report(&SW_RECORD).unwrap();
        kb.handle_report(&sw_macro(&[2])).unwrap();
        assert_eq!(kb.record_target(), Some(2));

        capture.type_key(KEY_A, true);
        std::thread::sleep(Duration::from_millis(120));
        capture.type_key(KEY_A, false);
        kb.pump_capture().unwrap();
        kb.handle_report(&SW_RECORD).unwrap();
        assert_eq!(kb.mode(), Mode::Normal);
        assert_eq!(kb.leds().profiles().active(), Some(0));

        kb.handle_report(&sw_macro(&[2])).unwrap();
        let events = &kb.sink().events;
        assert_eq!(kb.sink().transitions(), vec![(KEY_A, true), (KEY_A, false)]);
        let gap = events[1].at.duration_since(events[0].at);
        assert!(gap >= Duration::from_millis(120), "gap {gap:?}");
        assert!(gap < Duration::from_millis(400), "gap {gap:?}");
    }

    /// Two macro keys in one report each play their own macro, in key order.
    #[test]
    fn simultaneous_macro_keys_play_both() {
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-chord", MockSink::new());
        kb.engine().store().save(0, 1, &tap(KEY_A)).unwrap();
        kb.engine().store().save(0, 30, &tap(KEY_B)).unwrap();

        kb.handle_report(&sw_macro(&[1, 30])).unwrap();
        assert_eq!(
            kb.sink().transitions(),
            vec![(KEY_A, true), (KEY_A, false), (KEY_B, true), (KEY_B, false)]
        );
    }

    /// S10 does not exist on the X4; a report claiming it is harmless.
    #[test]
    fn x4_ignores_out_of_range_key() {
        let mut kb = keyboard(KeyboardModel::SideWinderX4, "it-x4range", MockSink::new());
        kb.engine().store().save(0, 10, &tap(KEY_A)).unwrap();

        kb.handle_report(&sw_macro(&[10])).unwrap();
        assert!(kb.sink().events.is_empty());
    }

    /// Leaving record mode without a commit keeps the slot's macro.
    #[test]
    fn aborted_recording_keeps_binding() {
        let capture = MockCapture::new();
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-abort", MockSink::new())
            .with_capture(Box::new(capture.clone()));
        kb.engine().store().save(0, 1, &tap(KEY_A)).unwrap();

        kb.hid_mut().push_report(&SW_RECORD);
        kb.hid_mut().push_report(&sw_macro(&[1]));
        let shutdown = ShutdownSignal::new().unwrap();

        // Both reports are handled, then the exhausted mock reports a disconnect.
        let result = kb.run(&shutdown);
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(kb.mode(), Mode::Normal);
        assert_eq!(kb.leds().mask(), 0);
        assert_eq!(kb.engine().store().load(0, 1).unwrap(), Some(tap(KEY_A)));
    }

    /// The loop processes queued reports in order until the device goes away.
    #[test]
    fn run_until_disconnect() {
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-run", MockSink::new());
        kb.engine().store().save(1, 3, &tap(KEY_B)).unwrap();

        kb.hid_mut().push_report(&SW_PROFILE);
        kb.hid_mut().push_report(&[0x08, 0x04]);
        kb.hid_mut().push_report(&sw_macro(&[3]));
        kb.hid_mut().push_report(&[]);
        let shutdown = ShutdownSignal::new().unwrap();

        let result = kb.run(&shutdown);
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(kb.profile(), 1);
        assert_eq!(kb.sink().transitions(), vec![(KEY_B, true), (KEY_B, false)]);
        assert_eq!(kb.hid().features.last(), Some(&vec![0x07, 0x00]));
    }

    /// A failing virtual keyboard ends the session after returning to normal.
    #[test]
    fn sink_failure_ends_run() {
        let sink = MockSink::failing_after(0);
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-sinkfail", sink);
        kb.engine().store().save(0, 1, &tap(KEY_A)).unwrap();
        kb.hid_mut().push_report(&sw_macro(&[1]));
        kb.hid_mut().push_report(&SW_PROFILE);
        let shutdown = ShutdownSignal::new().unwrap();

        assert!(matches!(kb.run(&shutdown), Err(Error::Io(_))));
        assert_eq!(kb.mode(), Mode::Normal);
        assert_eq!(kb.profile(), 0);
    }

    /// G105: M-keys select profiles, MR records, G-keys play per profile.
    #[test]
    fn g105_profiles_and_recording() {
        let capture = MockCapture::new();
        let mut kb = keyboard(KeyboardModel::LogitechG105, "it-g105", MockSink::new())
            .with_capture(Box::new(capture.clone()));
        let mut startup = vec![0u8; 13];
        startup[0] = 0x09;
        assert_eq!(kb.hid().features, vec![startup, vec![0x06, 0x87, 0x01, 0x00]]);

        kb.handle_report(&[0x03, 0x00, 0x04, 0x00]).unwrap();
        assert_eq!(kb.profile(), 2);
        assert_eq!(kb.hid().last_feature_byte(2), Some(0x04));

        kb.handle_report(&[0x03, 0x00, 0x08, 0x00]).unwrap();
        assert_eq!(kb.hid().last_feature_byte(2), Some(0x08));
        kb.handle_report(&[0x03, 0x01, 0x00, 0x00]).unwrap();
        capture.tap(KEY_B);
        kb.pump_capture().unwrap();
        kb.handle_report(&[0x03, 0x00, 0x08, 0x00]).unwrap();
        assert_eq!(kb.hid().last_feature_byte(2), Some(0x04));

        kb.handle_report(&[0x03, 0x00, 0x01, 0x00]).unwrap();
        kb.handle_report(&[0x03, 0x01, 0x00, 0x00]).unwrap();
        assert!(kb.sink().events.is_empty());

        kb.handle_report(&[0x03, 0x00, 0x04, 0x00]).unwrap();
        kb.handle_report(&[0x03, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(kb.sink().transitions(), vec![(KEY_B, true), (KEY_B, false)]);
    }

    /// The X6 keypad toggle rides in the same mask as the profile LEDs and is
    /// cleared on the way out.
    #[test]
    fn x6_macro_pad_through_run() {
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-macropad", MockSink::new());
        kb.hid_mut().push_report(&[0x01, 0, 0, 0, 0, 0, 0x13, 0]);
        kb.hid_mut().push_report(&SW_PROFILE);
        let shutdown = ShutdownSignal::new().unwrap();

        assert!(matches!(kb.run(&shutdown), Err(Error::Io(_))));
        let masks: Vec<u8> = kb.hid().features.iter().map(|f| f[1]).collect();
        assert_eq!(masks, vec![0x04, 0x05, 0x01, 0x09, 0x01, 0x00]);
    }

    /// Recordings are stored per profile in their own files.
    #[test]
    fn recording_lands_in_profile_slot() {
        let capture = MockCapture::new();
        let mut kb = keyboard(KeyboardModel::SideWinderX6, "it-slot", MockSink::new())
            .with_capture(Box::new(capture.clone()));

        kb.handle_report(&SW_PROFILE).unwrap();
        kb.handle_report(&SW_RECORD).unwrap();
        kb.handle_report(&sw_macro(&[5])).unwrap();
        capture.tap(KEY_A);
        kb.pump_capture().unwrap();
        kb.handle_report(&SW_RECORD).unwrap();

        let store = kb.engine().store();
        assert!(store.slot_path(1, 5).exists());
        assert!(!store.slot_path(0, 5).exists());
        assert_eq!(store.load(1, 5).unwrap().map(|m| m.steps.len()), Some(2));
    }
}
