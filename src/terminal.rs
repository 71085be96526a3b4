//! Console device operations and low-level VT control.
//!
//! This module provides:
//! - The [`VtDevice`] operations a session needs from an open VT
//! - The [`Kernel`] entry points used before a VT is open (free VT query, opening a VT)
//! - [`Tty`] and [`LinuxKernel`], the implementations backed by real ioctls

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::{FileTypeExt, MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use log::info;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc::c_int;
use nix::sys::stat::{major, minor};
use nix::unistd::ttyname;

use crate::error::VtError;
use crate::ioctl;

/// Console control device used to look for a free VT.
pub const CONTROL_DEVICE: &str = "/dev/tty0";

/// Keyboard mode in which the kernel stops decoding key presses.
pub const KEYBOARD_OFF: c_int = ioctl::K_OFF;

/// Text or graphics console mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    /// Kernel draws the text console.
    Text,
    /// Something else owns the framebuffer.
    Graphics,
}

impl ConsoleMode {
    /// Raw `KD_*` value.
    #[must_use]
    pub fn raw(self) -> c_int {
        match self {
            Self::Text => ioctl::KD_TEXT,
            Self::Graphics => ioctl::KD_GRAPHICS,
        }
    }
}

/// How VT switches away from or back to this VT are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    /// The kernel switches without asking.
    Auto,
    /// The owner is signalled and must acknowledge every switch.
    Process {
        /// Signal raised when another VT is requested.
        release: c_int,
        /// Signal raised when this VT is handed back.
        acquire: c_int,
    },
}

/// Answer given to the kernel through `VT_RELDISP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAck {
    /// Let the pending release go ahead.
    Release,
    /// Confirm the VT was taken back.
    Acquire,
}

impl DisplayAck {
    fn raw(self) -> c_int {
        match self {
            Self::Release => ioctl::VT_RELEASE,
            Self::Acquire => ioctl::VT_ACKACQ,
        }
    }
}

/// Device identity of an open descriptor, as reported by `fstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// Whether the descriptor is a character device.
    pub char_device: bool,
    /// Major device number.
    pub major: u64,
    /// Minor device number; the VT number for consoles.
    pub minor: u64,
}

impl DeviceId {
    /// The VT number if this is a `/dev/ttyN` console, `None` otherwise.
    ///
    /// `/dev/tty0` (minor 0) is the current console, not a VT of its own.
    #[must_use]
    pub fn vt(&self) -> Option<u32> {
        if !self.char_device || self.major != ioctl::TTY_MAJOR {
            return None;
        }
        u32::try_from(self.minor).ok().filter(|vt| *vt != 0)
    }
}

/// Operations issued against an open VT.
///
/// Every method maps to exactly one kernel request. Dropping the device closes it.
pub trait VtDevice {
    /// Identity of the underlying device node.
    ///
    /// # Errors
    ///
    /// Returns the `fstat` error.
    fn device_id(&self) -> nix::Result<DeviceId>;

    /// Current console mode, raw `KD_*` value.
    ///
    /// # Errors
    ///
    /// Returns the `KDGETMODE` error.
    fn console_mode(&self) -> nix::Result<c_int>;

    /// Switch the console between text and graphics.
    ///
    /// # Errors
    ///
    /// Returns the `KDSETMODE` error.
    fn set_console_mode(&self, mode: ConsoleMode) -> nix::Result<()>;

    /// VT that currently has the foreground.
    ///
    /// # Errors
    ///
    /// Returns the `VT_GETSTATE` error.
    fn active_vt(&self) -> nix::Result<u32>;

    /// Request a switch to `vt`.
    ///
    /// # Errors
    ///
    /// Returns the `VT_ACTIVATE` error.
    fn activate(&self, vt: u32) -> nix::Result<()>;

    /// Block until `vt` has the foreground.
    ///
    /// # Errors
    ///
    /// Returns the `VT_WAITACTIVE` error.
    fn wait_active(&self, vt: u32) -> nix::Result<()>;

    /// Current keyboard decoding mode.
    ///
    /// # Errors
    ///
    /// Returns the `KDGKBMODE` error.
    fn keyboard_mode(&self) -> nix::Result<c_int>;

    /// Set the keyboard decoding mode.
    ///
    /// # Errors
    ///
    /// Returns the `KDSKBMODE` error.
    fn set_keyboard_mode(&self, mode: c_int) -> nix::Result<()>;

    /// Mute or unmute keyboard decoding. Older kernels do not know this request.
    ///
    /// # Errors
    ///
    /// Returns the `KDSKBMUTE` error.
    fn set_keyboard_mute(&self, mute: bool) -> nix::Result<()>;

    /// Install a VT switch mode.
    ///
    /// # Errors
    ///
    /// Returns the `VT_SETMODE` error.
    fn set_switch_mode(&self, mode: SwitchMode) -> nix::Result<()>;

    /// Answer a pending switch.
    ///
    /// # Errors
    ///
    /// Returns the `VT_RELDISP` error.
    fn release_display(&self, ack: DisplayAck) -> nix::Result<()>;
}

/// Entry points needed before any VT is open.
pub trait Kernel {
    /// Device type handed out by [`Kernel::open_vt`].
    type Device: VtDevice;

    /// Ask the kernel for a VT nobody has open.
    ///
    /// # Errors
    ///
    /// Returns [`VtError::DeviceOpen`] if the console control device cannot be
    /// opened, [`VtError::KernelQuery`] if the query fails.
    fn free_vt(&self) -> Result<u32, VtError>;

    /// Open the device of `vt`.
    ///
    /// # Errors
    ///
    /// Returns [`VtError::DeviceOpen`] if the device cannot be opened.
    fn open_vt(&self, vt: u32) -> Result<Self::Device, VtError>;
}

/// Device node of `vt`.
#[must_use]
pub fn vt_path(vt: u32) -> PathBuf {
    PathBuf::from(format!("/dev/tty{vt}"))
}

fn errno_of(err: &io::Error) -> Errno {
    err.raw_os_error().map_or(Errno::EIO, Errno::from_raw)
}

fn vt_arg(vt: u32) -> nix::Result<c_int> {
    c_int::try_from(vt).map_err(|_| Errno::EINVAL)
}

/// Opens a console device for reading and writing.
///
/// The device never becomes the controlling terminal of the process, and is
/// closed on exec.
fn open_console_device(path: &Path) -> Result<File, VtError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(path)
        .map_err(|source| VtError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Whether opening `vt` should reuse stdin, given the terminal stdin is
/// attached to.
///
/// Opening the terminal we already run on again could cost us our
/// controlling terminal.
fn reuses_stdin(stdin_name: Option<&Path>, vt: u32) -> bool {
    stdin_name.is_some_and(|name| name == vt_path(vt))
}

/// An open VT, backed by real ioctls.
#[derive(Debug)]
pub struct Tty {
    file: File,
}

impl Tty {
    /// Wrap an already open VT device.
    #[must_use]
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl AsFd for Tty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl VtDevice for Tty {
    fn device_id(&self) -> nix::Result<DeviceId> {
        let meta = self.file.metadata().map_err(|e| errno_of(&e))?;
        let rdev = meta.rdev();
        Ok(DeviceId {
            char_device: meta.file_type().is_char_device(),
            major: major(rdev),
            minor: minor(rdev),
        })
    }

    fn console_mode(&self) -> nix::Result<c_int> {
        ioctl::get_console_mode(self.as_fd())
    }

    fn set_console_mode(&self, mode: ConsoleMode) -> nix::Result<()> {
        ioctl::set_console_mode(self.as_fd(), mode.raw())
    }

    fn active_vt(&self) -> nix::Result<u32> {
        ioctl::active_vt(self.as_fd()).map(u32::from)
    }

    fn activate(&self, vt: u32) -> nix::Result<()> {
        ioctl::activate(self.as_fd(), vt_arg(vt)?)
    }

    fn wait_active(&self, vt: u32) -> nix::Result<()> {
        ioctl::wait_active(self.as_fd(), vt_arg(vt)?)
    }

    fn keyboard_mode(&self) -> nix::Result<c_int> {
        ioctl::get_keyboard_mode(self.as_fd())
    }

    fn set_keyboard_mode(&self, mode: c_int) -> nix::Result<()> {
        ioctl::set_keyboard_mode(self.as_fd(), mode)
    }

    fn set_keyboard_mute(&self, mute: bool) -> nix::Result<()> {
        ioctl::set_keyboard_mute(self.as_fd(), mute)
    }

    fn set_switch_mode(&self, mode: SwitchMode) -> nix::Result<()> {
        let raw = match mode {
            SwitchMode::Auto => ioctl::vt_mode {
                mode: ioctl::VT_AUTO,
                ..Default::default()
            },
            SwitchMode::Process { release, acquire } => ioctl::vt_mode {
                mode: ioctl::VT_PROCESS,
                relsig: release.try_into().map_err(|_| Errno::EINVAL)?,
                acqsig: acquire.try_into().map_err(|_| Errno::EINVAL)?,
                ..Default::default()
            },
        };
        ioctl::set_switch_mode(self.as_fd(), &raw)
    }

    fn release_display(&self, ack: DisplayAck) -> nix::Result<()> {
        ioctl::release_display(self.as_fd(), ack.raw())
    }
}

/// The running Linux kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxKernel;

impl Kernel for LinuxKernel {
    type Device = Tty;

    fn free_vt(&self) -> Result<u32, VtError> {
        let control = open_console_device(Path::new(CONTROL_DEVICE))?;
        let vt = ioctl::free_vt(control.as_fd())
            .map_err(|source| VtError::kernel("find free vt", source))?;
        // -1 means every VT is taken
        Ok(u32::try_from(vt).unwrap_or(0))
    }

    fn open_vt(&self, vt: u32) -> Result<Tty, VtError> {
        let path = vt_path(vt);

        let stdin = io::stdin();
        let stdin_name = ttyname(stdin.as_fd()).ok();
        if reuses_stdin(stdin_name.as_deref(), vt) {
            let fd = stdin
                .as_fd()
                .try_clone_to_owned()
                .map_err(|source| VtError::DeviceOpen {
                    path: path.clone(),
                    source,
                })?;
            return Ok(Tty::new(File::from(fd)));
        }

        let file = open_console_device(&path)?;
        info!("Running on vt {vt}");
        Ok(Tty::new(file))
    }
}
