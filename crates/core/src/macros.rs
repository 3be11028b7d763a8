//! Macro recording and playback.
//!
//! A macro is the literal key sequence captured while recording, with the
//! delay before each step. Playback replays it through the virtual keyboard
//! with the recorded timing.

use crate::error::Result;
use crate::input::KeySink;
use crate::store::MacroStore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One recorded key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroStep {
    /// Linux input key code.
    pub key: u16,
    pub pressed: bool,
    /// Wait before this step, relative to the previous one.
    pub delay_ms: u64,
}

/// A recorded key sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub steps: Vec<MacroStep>,
}

impl Macro {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all step delays.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.steps.iter().map(|s| s.delay_ms).sum())
    }
}

/// An in-progress recording for one (profile, macro key) slot.
///
/// Nothing reaches the store until [`MacroEngine::commit`].
#[derive(Debug)]
pub struct RecordSession {
    profile: usize,
    key: u8,
    started: Instant,
    last: Option<Instant>,
    capture_delays: bool,
    steps: Vec<MacroStep>,
}

impl RecordSession {
    pub fn profile(&self) -> usize {
        self.profile
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Append a key transition observed now.
    pub fn push(&mut self, key: u16, pressed: bool) {
        self.push_at(key, pressed, Instant::now());
    }

    /// Append a key transition observed at `at`.
    pub fn push_at(&mut self, key: u16, pressed: bool, at: Instant) {
        let delay_ms = match self.last {
            Some(prev) if self.capture_delays => {
                at.saturating_duration_since(prev).as_millis() as u64
            }
            _ => 0,
        };
        self.last = Some(at);
        self.steps.push(MacroStep {
            key,
            pressed,
            delay_ms,
        });
    }

    /// The recorded macro, or `None` if nothing was captured.
    pub fn into_macro(self) -> Option<Macro> {
        if self.steps.is_empty() {
            None
        } else {
            Some(Macro { steps: self.steps })
        }
    }
}

/// Records, persists and replays macros.
#[derive(Debug, Clone)]
pub struct MacroEngine {
    store: MacroStore,
    capture_delays: bool,
}

impl MacroEngine {
    pub fn new(store: MacroStore, capture_delays: bool) -> Self {
        Self {
            store,
            capture_delays,
        }
    }

    pub fn store(&self) -> &MacroStore {
        &self.store
    }

    /// Begin recording into slot (`profile`, `key`).
    pub fn record(&self, profile: usize, key: u8) -> RecordSession {
        info!(profile = profile + 1, key = format_args!("S{key}"), "Recording macro");
        RecordSession {
            profile,
            key,
            started: Instant::now(),
            last: None,
            capture_delays: self.capture_delays,
            steps: Vec::new(),
        }
    }

    /// Store the session's macro, replacing whatever the slot held.
    ///
    /// Returns `Ok(false)` for an empty session, which stores nothing.
    pub fn commit(&self, session: RecordSession) -> Result<bool> {
        let (profile, key) = (session.profile, session.key);
        let Some(m) = session.into_macro() else {
            info!(profile = profile + 1, key = format_args!("S{key}"), "Empty recording discarded");
            return Ok(false);
        };
        self.store.save(profile, key, &m)?;
        info!(
            profile = profile + 1,
            key = format_args!("S{key}"),
            steps = m.steps.len(),
            duration_ms = m.duration().as_millis() as u64,
            "Macro recorded"
        );
        Ok(true)
    }

    /// Drop a session without touching the store.
    pub fn abort(&self, session: RecordSession) {
        info!(
            profile = session.profile + 1,
            key = format_args!("S{}", session.key),
            discarded = session.len(),
            "Recording aborted"
        );
    }

    /// The macro bound to a slot. Unreadable slots are logged and treated
    /// as unbound.
    pub fn lookup(&self, profile: usize, key: u8) -> Option<Macro> {
        match self.store.load(profile, key) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    profile = profile + 1,
                    key = format_args!("S{key}"),
                    error = %e,
                    "Ignoring unreadable macro"
                );
                None
            }
        }
    }

    /// Replay `m` through `sink`, sleeping each step's delay first.
    ///
    /// Stops at the first failed write.
    pub fn play(&self, m: &Macro, sink: &mut dyn KeySink) -> Result<()> {
        play(m, sink)
    }
}

/// Replay a macro with its recorded timing.
pub fn play(m: &Macro, sink: &mut dyn KeySink) -> Result<()> {
    debug!(steps = m.steps.len(), "Playback start");
    for (i, step) in m.steps.iter().enumerate() {
        if step.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(step.delay_ms));
        }
        if let Err(e) = sink.emit_key(step.key, step.pressed) {
            warn!(
                completed = i,
                total = m.steps.len(),
                error = %e,
                "Playback aborted"
            );
            return Err(e);
        }
    }
    debug!("Playback end");
    Ok(())
}
