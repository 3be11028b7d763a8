//! Raw HID access to the keyboard's vendor interface.
//!
//! Provides a trait-based device layer so that the hidraw node and the
//! mock device used in tests share the same interface.

use crate::error::{Error, Result};
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Read buffer size. Larger than any supported report so that oversized
/// reports are seen at their real length instead of being truncated.
pub const REPORT_BUF_LEN: usize = 64;

/// Abstraction over the vendor HID interface of one keyboard.
pub trait HidDevice {
    /// Read exactly one input report.
    ///
    /// Returns an empty buffer when no report was pending (spurious wake-up).
    fn read_report(&mut self) -> Result<Vec<u8>>;

    /// Send a feature report. `data[0]` is the report ID.
    fn send_feature(&mut self, data: &[u8]) -> Result<()>;

    /// Descriptor to wait on before calling [`HidDevice::read_report`].
    ///
    /// `None` means reports are always ready (used by the mock device).
    fn poll_fd(&self) -> Option<BorrowedFd<'_>>;
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct HidrawDevinfo {
    bustype: u32,
    vendor: i16,
    product: i16,
}

nix::ioctl_read!(hidiocgrawinfo, b'H', 0x03, HidrawDevinfo);
nix::ioctl_readwrite_buf!(hidiocsfeature, b'H', 0x06, u8);

/// A kernel hidraw node (`/dev/hidrawN`).
pub struct HidrawDevice {
    file: File,
    path: PathBuf,
}

impl HidrawDevice {
    /// Open a hidraw node for non-blocking reads and feature writes.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(nix::libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| Error::DeviceUnavailable(format!("open {}: {e}", path.display())))?;

        // Only hidraw nodes answer HIDIOCGRAWINFO; anything else cannot take
        // feature requests.
        let mut info = HidrawDevinfo::default();
        // SAFETY: `file` is an open descriptor and `info` is a repr(C) struct
        // matching `struct hidraw_devinfo`, valid for writes for the call.
        unsafe { hidiocgrawinfo(file.as_raw_fd(), &mut info) }.map_err(|e| {
            Error::DeviceUnavailable(format!(
                "{} is not a hidraw device: {}",
                path.display(),
                e.desc()
            ))
        })?;

        info!(
            path = %path.display(),
            vid = format_args!("0x{:04X}", info.vendor as u16),
            pid = format_args!("0x{:04X}", info.product as u16),
            "Opened hidraw device"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HidDevice for HidrawDevice {
    fn read_report(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; REPORT_BUF_LEN];
        match self.file.read(&mut buf) {
            Ok(0) => Err(Error::Io(format!(
                "{}: device disconnected",
                self.path.display()
            ))),
            Ok(n) => {
                trace!(report_hex = format_args!("{:02X?}", &buf[..n]), "HID RX");
                Ok(buf[..n].to_vec())
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(Error::Io(format!("{}: read: {e}", self.path.display()))),
        }
    }

    fn send_feature(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = data.to_vec();
        trace!(report_hex = format_args!("{:02X?}", buf), "HID feature TX");
        // SAFETY: `buf` is a live, exclusively borrowed buffer whose length is
        // encoded into the request number by the macro.
        let res = unsafe { hidiocsfeature(self.file.as_raw_fd(), &mut buf) };
        match res {
            Ok(_) => Ok(()),
            Err(Errno::ENODEV) => Err(Error::Io(format!(
                "{}: device disconnected",
                self.path.display()
            ))),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Feature report rejected");
                Err(Error::Io(format!(
                    "{}: set feature: {}",
                    self.path.display(),
                    e.desc()
                )))
            }
        }
    }

    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        Some(self.file.as_fd())
    }
}
