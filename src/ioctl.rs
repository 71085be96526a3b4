//! Raw console ioctls from `linux/kd.h` and `linux/vt.h`.
//!
//! Nothing outside [`crate::terminal`] should call these directly.

#![allow(unsafe_code, non_camel_case_types)]

use nix::libc::{c_char, c_int, c_short, c_ushort};
use nix::{ioctl_read_bad, ioctl_write_int_bad, ioctl_write_ptr_bad};
use std::os::fd::{AsRawFd, BorrowedFd};

const KDSETMODE: u32 = 0x4B3A;
const KDGETMODE: u32 = 0x4B3B;
const KDGKBMODE: u32 = 0x4B44;
const KDSKBMODE: u32 = 0x4B45;
const KDSKBMUTE: u32 = 0x4B51;
const VT_OPENQRY: u32 = 0x5600;
const VT_SETMODE: u32 = 0x5602;
const VT_GETSTATE: u32 = 0x5603;
const VT_RELDISP: u32 = 0x5605;
const VT_ACTIVATE: u32 = 0x5606;
const VT_WAITACTIVE: u32 = 0x5607;

/// Major number shared by every `/dev/ttyN` console.
pub const TTY_MAJOR: u64 = 4;

/// `KD_TEXT` console mode.
pub const KD_TEXT: c_int = 0x00;
/// `KD_GRAPHICS` console mode.
pub const KD_GRAPHICS: c_int = 0x01;

/// `K_OFF` keyboard mode: the kernel stops translating key codes.
pub const K_OFF: c_int = 0x04;

/// `VT_AUTO` switch mode: the kernel switches on its own.
pub const VT_AUTO: c_char = 0x00;
/// `VT_PROCESS` switch mode: the owner is signalled and has to acknowledge.
pub const VT_PROCESS: c_char = 0x01;

/// `VT_RELDISP` argument allowing the pending release.
pub const VT_RELEASE: c_int = 1;
/// `VT_RELDISP` argument acknowledging an acquisition.
pub const VT_ACKACQ: c_int = 2;

/// `struct vt_mode`.
#[allow(dead_code, clippy::struct_field_names)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct vt_mode {
    /// `VT_AUTO` or `VT_PROCESS`.
    pub mode: c_char,
    /// Unused by the kernel.
    pub waitv: c_char,
    /// Signal raised on release requests.
    pub relsig: c_short,
    /// Signal raised when the VT is handed back.
    pub acqsig: c_short,
    /// Unused by the kernel.
    pub frsig: c_short,
}

/// `struct vt_stat`.
#[allow(dead_code, clippy::struct_field_names)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct vt_stat {
    /// Currently active VT.
    pub v_active: c_ushort,
    /// Signal to send.
    pub v_signal: c_ushort,
    /// Bitmask of open VTs.
    pub v_state: c_ushort,
}

ioctl_write_int_bad!(
    /// Set the console mode (`KDSETMODE`).
    kd_set_mode,
    KDSETMODE
);
ioctl_read_bad!(
    /// Read the console mode (`KDGETMODE`).
    kd_get_mode,
    KDGETMODE,
    c_int
);
ioctl_read_bad!(
    /// Read the keyboard mode (`KDGKBMODE`).
    kd_get_kb_mode,
    KDGKBMODE,
    c_int
);
ioctl_write_int_bad!(
    /// Set the keyboard mode (`KDSKBMODE`).
    kd_set_kb_mode,
    KDSKBMODE
);
ioctl_write_int_bad!(
    /// Mute or unmute the keyboard (`KDSKBMUTE`).
    kd_set_kb_mute,
    KDSKBMUTE
);
ioctl_read_bad!(
    /// Ask for the first free VT (`VT_OPENQRY`).
    vt_open_query,
    VT_OPENQRY,
    c_int
);
ioctl_write_ptr_bad!(
    /// Set the VT switch mode (`VT_SETMODE`).
    vt_set_mode,
    VT_SETMODE,
    vt_mode
);
ioctl_read_bad!(
    /// Read the VT state (`VT_GETSTATE`).
    vt_get_state,
    VT_GETSTATE,
    vt_stat
);
ioctl_write_int_bad!(
    /// Answer a pending switch (`VT_RELDISP`).
    vt_release_display,
    VT_RELDISP
);
ioctl_write_int_bad!(
    /// Ask the kernel to switch to a VT (`VT_ACTIVATE`).
    vt_activate,
    VT_ACTIVATE
);
ioctl_write_int_bad!(
    /// Block until a VT is active (`VT_WAITACTIVE`).
    vt_wait_active,
    VT_WAITACTIVE
);

// Safe wrappers. Every request below takes either a plain int or a pointer to
// a value owned by the caller for the duration of the call.

/// Read the console mode of `fd`.
pub fn get_console_mode(fd: BorrowedFd<'_>) -> nix::Result<c_int> {
    let mut mode: c_int = 0;
    unsafe { kd_get_mode(fd.as_raw_fd(), &raw mut mode) }?;
    Ok(mode)
}

/// Set the console mode of `fd`.
pub fn set_console_mode(fd: BorrowedFd<'_>, mode: c_int) -> nix::Result<()> {
    unsafe { kd_set_mode(fd.as_raw_fd(), mode) }.map(drop)
}

/// Read the keyboard mode of `fd`.
pub fn get_keyboard_mode(fd: BorrowedFd<'_>) -> nix::Result<c_int> {
    let mut mode: c_int = 0;
    unsafe { kd_get_kb_mode(fd.as_raw_fd(), &raw mut mode) }?;
    Ok(mode)
}

/// Set the keyboard mode of `fd`.
pub fn set_keyboard_mode(fd: BorrowedFd<'_>, mode: c_int) -> nix::Result<()> {
    unsafe { kd_set_kb_mode(fd.as_raw_fd(), mode) }.map(drop)
}

/// Mute or unmute the keyboard of `fd`.
pub fn set_keyboard_mute(fd: BorrowedFd<'_>, mute: bool) -> nix::Result<()> {
    let mute = c_int::from(mute);
    unsafe { kd_set_kb_mute(fd.as_raw_fd(), mute) }.map(drop)
}

/// First VT nobody has open, as reported through the console `fd`.
pub fn free_vt(fd: BorrowedFd<'_>) -> nix::Result<c_int> {
    let mut vt: c_int = -1;
    unsafe { vt_open_query(fd.as_raw_fd(), &raw mut vt) }?;
    Ok(vt)
}

/// Currently active VT.
pub fn active_vt(fd: BorrowedFd<'_>) -> nix::Result<c_ushort> {
    let mut state = vt_stat::default();
    unsafe { vt_get_state(fd.as_raw_fd(), &raw mut state) }?;
    Ok(state.v_active)
}

/// Install a VT switch mode.
pub fn set_switch_mode(fd: BorrowedFd<'_>, mode: &vt_mode) -> nix::Result<()> {
    let mode = std::ptr::from_ref(mode);
    unsafe { vt_set_mode(fd.as_raw_fd(), mode) }.map(drop)
}

/// Ask the kernel to make `vt` the foreground VT.
pub fn activate(fd: BorrowedFd<'_>, vt: c_int) -> nix::Result<()> {
    unsafe { vt_activate(fd.as_raw_fd(), vt) }.map(drop)
}

/// Block until `vt` is the foreground VT.
pub fn wait_active(fd: BorrowedFd<'_>, vt: c_int) -> nix::Result<()> {
    unsafe { vt_wait_active(fd.as_raw_fd(), vt) }.map(drop)
}

/// Answer a pending release or acquisition.
pub fn release_display(fd: BorrowedFd<'_>, ack: c_int) -> nix::Result<()> {
    unsafe { vt_release_display(fd.as_raw_fd(), ack) }.map(drop)
}
