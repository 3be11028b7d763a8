//! Cooperative shutdown for the blocking event loop.

use crate::error::Result;
use nix::sys::eventfd::{EfdFlags, EventFd};
use std::os::fd::{AsFd, BorrowedFd};
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag plus eventfd. Triggering it wakes a loop blocked in `poll`.
pub struct ShutdownSignal {
    flag: AtomicBool,
    wake: EventFd,
}

impl ShutdownSignal {
    pub fn new() -> Result<Self> {
        let wake = EventFd::from_flags(EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)?;
        Ok(Self {
            flag: AtomicBool::new(false),
            wake,
        })
    }

    /// Request shutdown. Safe to call from a signal-handling thread.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // The counter only needs to become non-zero; an overflow (EAGAIN)
        // still leaves it readable.
        let _ = self.wake.write(1);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Descriptor that becomes readable once triggered.
    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.wake.as_fd()
    }
}
