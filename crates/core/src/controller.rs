//! Keyboard controller: the poll loop and the mode state machine.
//!
//! One controller owns one keyboard. Every vendor report is decoded and
//! dispatched on the loop thread; macro playback runs synchronously, so no
//! report is read while a macro is being typed.

use crate::capture::CaptureSource;
use crate::config::ModelSpec;
use crate::error::{Error, Result};
use crate::hid::HidDevice;
use crate::input::KeySink;
use crate::key::{KeyData, KeyIdentity};
use crate::led::Indicators;
use crate::macros::{MacroEngine, RecordSession};
use crate::report::Decoder;
use crate::shutdown::ShutdownSignal;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Observable controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Recording,
    Playing,
}

enum State {
    Normal,
    /// `None` until a macro key picks the target slot.
    Recording(Option<RecordSession>),
    Playing,
}

pub struct Controller<H: HidDevice, S: KeySink> {
    hid: H,
    sink: S,
    capture: Option<Box<dyn CaptureSource>>,
    decoder: Decoder,
    engine: MacroEngine,
    num_profiles: usize,
    profile: usize,
    state: State,
    leds: Indicators,
}

impl<H: HidDevice, S: KeySink> Controller<H, S> {
    /// Take ownership of an opened keyboard and show profile 1.
    ///
    /// Layout startup reports (the G105 G-key reset) go out before any LED.
    pub fn new(model: &ModelSpec, hid: H, sink: S, engine: MacroEngine) -> Self {
        let mut leds = Indicators::new(model.layout, &model.profile_leds, model.record_led);
        if let Some(bit) = model.layout.macro_pad_led().filter(|_| model.macro_pad) {
            leds = leds.with_macro_pad(bit);
        }
        let mut controller = Self {
            hid,
            sink,
            capture: None,
            decoder: Decoder::new(model.layout, model.macro_keys),
            engine,
            num_profiles: model.profiles.max(1),
            profile: 0,
            state: State::Normal,
            leds,
        };
        for report in model.layout.startup_reports() {
            if let Err(e) = controller.hid.send_feature(&report) {
                warn!(
                    report_hex = format_args!("{:02X?}", report),
                    error = %e,
                    "Startup report failed"
                );
            }
        }
        controller.leds.show_profile(&mut controller.hid, 0);
        info!(
            model = %model.tag,
            profiles = controller.num_profiles,
            macro_keys = controller.decoder.macro_keys(),
            "Keyboard attached"
        );
        controller
    }

    /// Record macro content from `capture`. Without one, recordings stay empty.
    pub fn with_capture(mut self, capture: Box<dyn CaptureSource>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn mode(&self) -> Mode {
        match self.state {
            State::Normal => Mode::Normal,
            State::Recording(_) => Mode::Recording,
            State::Playing => Mode::Playing,
        }
    }

    /// Active profile, 0-based.
    pub fn profile(&self) -> usize {
        self.profile
    }

    pub fn num_profiles(&self) -> usize {
        self.num_profiles
    }

    /// Macro key being recorded, once chosen.
    pub fn record_target(&self) -> Option<u8> {
        match &self.state {
            State::Recording(Some(session)) => Some(session.key()),
            _ => None,
        }
    }

    pub fn leds(&self) -> &Indicators {
        &self.leds
    }

    pub fn engine(&self) -> &MacroEngine {
        &self.engine
    }

    pub fn hid(&self) -> &H {
        &self.hid
    }

    pub fn hid_mut(&mut self) -> &mut H {
        &mut self.hid
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Run until `shutdown` fires or the device fails.
    ///
    /// On the way out an unfinished recording is dropped and every LED is
    /// switched off, whatever ended the loop.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<()> {
        let result = self.event_loop(shutdown);
        if let Err(e) = &result {
            warn!(error = %e, "Keyboard detached");
        }
        self.stop();
        result
    }

    fn event_loop(&mut self, shutdown: &ShutdownSignal) -> Result<()> {
        while !shutdown.is_triggered() {
            let (hid_ready, capture_ready) = self.wait(shutdown)?;
            if shutdown.is_triggered() {
                break;
            }
            if capture_ready {
                self.pump_capture()?;
            }
            if hid_ready {
                let raw = self.hid.read_report()?;
                self.handle_report(&raw)?;
            }
        }
        info!("Shutdown requested");
        Ok(())
    }

    /// Block until the keyboard, the wake descriptor or, while recording,
    /// the capture keyboard is readable.
    ///
    /// Devices without a descriptor count as always readable.
    fn wait(&self, shutdown: &ShutdownSignal) -> Result<(bool, bool)> {
        let capture_fd = if self.is_capturing() {
            self.capture.as_ref().map(|c| c.poll_fd())
        } else {
            None
        };
        let capture_always = matches!(capture_fd, Some(None));

        let Some(hid_fd) = self.hid.poll_fd() else {
            return Ok((true, capture_fd.is_some()));
        };

        let events = PollFlags::POLLIN;
        let mut fds = vec![
            PollFd::new(hid_fd, events),
            PollFd::new(shutdown.wake_fd(), events),
        ];
        if let Some(Some(fd)) = capture_fd {
            fds.push(PollFd::new(fd, events));
        }

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok((false, false)),
            Err(e) => return Err(Error::Io(format!("poll: {e}"))),
        }

        let ready = |fd: &PollFd| {
            fd.revents().is_some_and(|r| {
                r.intersects(PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP)
            })
        };
        Ok((ready(&fds[0]), capture_always || fds.get(2).is_some_and(ready)))
    }

    /// Decode one raw report and act on every key it carries.
    ///
    /// Empty input (nothing was pending) and malformed reports are no-ops.
    pub fn handle_report(&mut self, raw: &[u8]) -> Result<()> {
        if raw.is_empty() {
            return Ok(());
        }
        for key in self.decoder.decode(raw) {
            self.dispatch(key)?;
        }
        Ok(())
    }

    /// Act on one decoded key. Only playback can fail.
    pub fn dispatch(&mut self, key: KeyData) -> Result<()> {
        if !key.pressed {
            return Ok(());
        }
        debug!(key = %key.key, mode = ?self.mode(), "Key pressed");

        match key.key {
            KeyIdentity::Record => self.on_record(),
            KeyIdentity::Macro(n) => return self.on_macro_key(n),
            KeyIdentity::ProfileCycle if self.is_normal() => {
                self.switch_profile((self.profile + 1) % self.num_profiles);
            }
            KeyIdentity::ProfileSelect(p) if self.is_normal() => {
                self.switch_profile(usize::from(p));
            }
            KeyIdentity::GameCenter => {
                if let Some(on) = self.leds.toggle_auto(&mut self.hid) {
                    info!(auto = on, "Game center toggled");
                }
            }
            KeyIdentity::MacroPad => match self.leds.toggle_macro_pad(&mut self.hid) {
                Some(on) => info!(macro_pad = on, "Macro pad toggled"),
                None => debug!("Model has no macro pad"),
            },
            other => debug!(key = %other, "Ignored outside normal mode"),
        }
        Ok(())
    }

    /// Make `profile` active. Out-of-range values are ignored.
    pub fn switch_profile(&mut self, profile: usize) {
        if profile >= self.num_profiles {
            debug!(profile, "No such profile");
            return;
        }
        self.profile = profile;
        self.leds.show_profile(&mut self.hid, profile);
        info!(profile = profile + 1, "Profile switched");
    }

    /// Append one typed key to the running recording, if any.
    pub fn record_key(&mut self, code: u16, pressed: bool, at: Instant) {
        if let State::Recording(Some(session)) = &mut self.state {
            session.push_at(code, pressed, at);
        }
    }

    /// Move pending capture-keyboard input into the recording.
    pub fn pump_capture(&mut self) -> Result<()> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(());
        };
        for key in capture.read_keys()? {
            self.record_key(key.code, key.pressed, key.at);
        }
        Ok(())
    }

    fn is_normal(&self) -> bool {
        matches!(self.state, State::Normal)
    }

    fn is_capturing(&self) -> bool {
        matches!(self.state, State::Recording(Some(_)))
    }

    fn on_record(&mut self) {
        match std::mem::replace(&mut self.state, State::Normal) {
            State::Normal => {
                self.state = State::Recording(None);
                self.leds.enter_recording(&mut self.hid);
                info!(profile = self.profile + 1, "Record mode, press a macro key");
            }
            State::Recording(None) => {
                info!("Record mode left without a target");
                self.leds.leave_recording(&mut self.hid, self.profile);
            }
            State::Recording(Some(session)) => {
                if let Err(e) = self.engine.commit(session) {
                    error!(error = %e, "Recording not saved");
                }
                self.leds.leave_recording(&mut self.hid, self.profile);
            }
            State::Playing => self.state = State::Playing,
        }
    }

    fn on_macro_key(&mut self, key: u8) -> Result<()> {
        match self.mode() {
            Mode::Normal => self.play(key),
            Mode::Recording if self.record_target().is_none() => {
                self.discard_capture();
                let session = self.engine.record(self.profile, key);
                self.state = State::Recording(Some(session));
                Ok(())
            }
            _ => {
                debug!(key = format_args!("S{key}"), "Macro key ignored");
                Ok(())
            }
        }
    }

    fn play(&mut self, key: u8) -> Result<()> {
        let Some(m) = self.engine.lookup(self.profile, key) else {
            debug!(profile = self.profile + 1, key = format_args!("S{key}"), "No macro bound");
            return Ok(());
        };

        self.state = State::Playing;
        info!(
            profile = self.profile + 1,
            key = format_args!("S{key}"),
            steps = m.steps.len(),
            "Playing macro"
        );
        let result = self.engine.play(&m, &mut self.sink);
        self.state = State::Normal;

        match &result {
            Ok(()) => info!(key = format_args!("S{key}"), "Macro finished"),
            Err(e) => error!(key = format_args!("S{key}"), error = %e, "Macro playback failed"),
        }
        result
    }

    /// Drop capture input typed before the target was chosen.
    fn discard_capture(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            match capture.read_keys() {
                Ok(stale) if !stale.is_empty() => {
                    debug!(count = stale.len(), "Discarded stale input")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Capture keyboard read failed"),
            }
        }
    }

    fn stop(&mut self) {
        if let State::Recording(session) = std::mem::replace(&mut self.state, State::Normal) {
            match session {
                Some(session) => self.engine.abort(session),
                None => info!("Record mode left without a target"),
            }
        }
        self.leds.all_off(&mut self.hid);
    }
}
