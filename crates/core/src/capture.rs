//! Regular keyboard input captured while a macro is being recorded.
//!
//! The vendor interface only reports the special keys, so the content of
//! a macro comes from the keyboard's ordinary evdev node.

use crate::error::{Error, Result};
use evdev::{Device, InputEventKind};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::Path;
use std::time::{Instant, SystemTime};
use tracing::{info, trace};

/// One key transition from the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedKey {
    pub code: u16,
    pub pressed: bool,
    pub at: Instant,
}

/// Map a kernel event timestamp onto the monotonic clock.
///
/// `now` and `now_sys` are read together once per batch. Stamps in the
/// future or older than the monotonic clock can express fall back to `now`.
fn event_instant(stamp: SystemTime, now: Instant, now_sys: SystemTime) -> Instant {
    let age = now_sys.duration_since(stamp).unwrap_or_default();
    now.checked_sub(age).unwrap_or(now)
}

/// Source of typed keys for recording.
pub trait CaptureSource {
    /// Key transitions pending right now. Autorepeat is not reported.
    fn read_keys(&mut self) -> Result<Vec<CapturedKey>>;

    fn poll_fd(&self) -> Option<BorrowedFd<'_>>;
}

/// evdev keyboard node, read without grabbing so typing keeps working.
pub struct EvdevCapture {
    device: Device,
}

impl EvdevCapture {
    pub fn open(path: &Path) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| Error::DeviceUnavailable(format!("open {}: {e}", path.display())))?;

        let fd = device.as_raw_fd();
        let flags = nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_GETFL)?;
        let mut flags = nix::fcntl::OFlag::from_bits_truncate(flags);
        flags.insert(nix::fcntl::OFlag::O_NONBLOCK);
        nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_SETFL(flags))?;

        info!(
            path = %path.display(),
            name = device.name().unwrap_or("unknown"),
            "Opened capture keyboard"
        );
        Ok(Self { device })
    }
}

impl CaptureSource for EvdevCapture {
    fn read_keys(&mut self) -> Result<Vec<CapturedKey>> {
        let events = match self.device.fetch_events() {
            Ok(events) => events,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(format!("capture read: {e}"))),
        };

        let (now, now_sys) = (Instant::now(), SystemTime::now());
        let keys: Vec<CapturedKey> = events
            .filter_map(|ev| match ev.kind() {
                InputEventKind::Key(key) if ev.value() == 0 || ev.value() == 1 => {
                    Some(CapturedKey {
                        code: key.code(),
                        pressed: ev.value() == 1,
                        at: event_instant(ev.timestamp(), now, now_sys),
                    })
                }
                _ => None,
            })
            .collect();
        trace!(count = keys.len(), "Captured keys");
        Ok(keys)
    }

    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        // SAFETY: the descriptor is owned by `self.device` and stays open for
        // the lifetime of the returned borrow, which is tied to `&self`.
        Some(unsafe { BorrowedFd::borrow_raw(self.device.as_raw_fd()) })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn open_missing_node_fails() {
        let result = EvdevCapture::open(Path::new("/nonexistent/event99"));
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    }

    /// Keys drained in one batch keep the spacing the kernel stamped.
    #[test]
    fn batch_keeps_kernel_spacing() {
        let (now, now_sys) = (Instant::now(), SystemTime::now());
        let press = now_sys - Duration::from_millis(80);
        let release = now_sys - Duration::from_millis(30);

        let a = event_instant(press, now, now_sys);
        let b = event_instant(release, now, now_sys);
        assert_eq!(b.duration_since(a), Duration::from_millis(50));
        assert_eq!(now.duration_since(b), Duration::from_millis(30));
    }

    #[test]
    fn future_stamp_clamps_to_now() {
        let (now, now_sys) = (Instant::now(), SystemTime::now());
        let ahead = now_sys + Duration::from_secs(2);
        assert_eq!(event_instant(ahead, now, now_sys), now);
    }

    #[test]
    fn mock_clones_share_queue() {
        let handle = mock::MockCapture::new();
        let mut source = handle.clone();
        handle.tap(30);
        assert_eq!(handle.pending(), 2);

        let keys = source.read_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].pressed && !keys[1].pressed);
        assert_eq!(handle.pending(), 0);
    }
}
