//! Recording fakes for the kernel, a VT device and a display owner.
//!
//! Every fake appends to one shared call log so tests can assert the exact
//! order in which the kernel and the display owner were driven.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use nix::errno::Errno;
use nix::libc::c_int;

use crate::error::VtError;
use crate::switch::DisplayOwner;
use crate::terminal::{ConsoleMode, DeviceId, DisplayAck, Kernel, SwitchMode, VtDevice, vt_path};

/// A single observed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FreeVt,
    Open(u32),
    DeviceId,
    ConsoleMode,
    SetConsoleMode(ConsoleMode),
    ActiveVt,
    Activate(u32),
    WaitActive(u32),
    KeyboardMode,
    SetKeyboardMode(c_int),
    SetKeyboardMute(bool),
    SetSwitchMode(SwitchMode),
    ReleaseDisplay(DisplayAck),
    Close,
    OwnerSetActive(bool),
    OwnerActivate,
    OwnerDeactivate,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Kernel-side state the fakes report.
#[derive(Debug, Clone)]
pub struct Console {
    /// `None` makes the free VT query fail.
    pub free_vt: Option<u32>,
    pub console_mode: c_int,
    pub active_vt: u32,
    pub keyboard_mode: c_int,
    pub mute_supported: bool,
    pub major: u64,
    pub open_fails: bool,
    /// Device requests that fail with `ENOTTY`, by name.
    pub failing: Vec<&'static str>,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            free_vt: Some(3),
            console_mode: 0,
            active_vt: 1,
            keyboard_mode: 0x03,
            mute_supported: true,
            major: 4,
            open_fails: false,
            failing: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockKernel {
    pub console: Console,
    pub calls: CallLog,
}

impl MockKernel {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            calls: CallLog::default(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// How many times the restoration sequence ran.
    pub fn restorations(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == Call::SetSwitchMode(SwitchMode::Auto))
            .count()
    }

    pub fn device(&self, vt: u32) -> MockDevice {
        MockDevice {
            vt,
            console: self.console.clone(),
            calls: Rc::clone(&self.calls),
        }
    }

    pub fn owner(&self) -> MockOwner {
        MockOwner {
            accept: true,
            active: true,
            calls: Rc::clone(&self.calls),
        }
    }
}

impl Kernel for MockKernel {
    type Device = MockDevice;

    fn free_vt(&self) -> Result<u32, VtError> {
        self.calls.borrow_mut().push(Call::FreeVt);
        self.console
            .free_vt
            .ok_or_else(|| VtError::kernel("find free vt", Errno::ENOTTY))
    }

    fn open_vt(&self, vt: u32) -> Result<MockDevice, VtError> {
        self.calls.borrow_mut().push(Call::Open(vt));
        if self.console.open_fails {
            return Err(VtError::DeviceOpen {
                path: vt_path(vt),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(self.device(vt))
    }
}

#[derive(Debug)]
pub struct MockDevice {
    vt: u32,
    console: Console,
    calls: CallLog,
}

impl MockDevice {
    fn record(&self, call: Call, name: &str) -> nix::Result<()> {
        self.calls.borrow_mut().push(call);
        if self.console.failing.contains(&name) {
            Err(Errno::ENOTTY)
        } else {
            Ok(())
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.calls.borrow_mut().push(Call::Close);
    }
}

impl VtDevice for MockDevice {
    fn device_id(&self) -> nix::Result<DeviceId> {
        self.record(Call::DeviceId, "device_id")?;
        Ok(DeviceId {
            char_device: true,
            major: self.console.major,
            minor: u64::from(self.vt),
        })
    }

    fn console_mode(&self) -> nix::Result<c_int> {
        self.record(Call::ConsoleMode, "console_mode")?;
        Ok(self.console.console_mode)
    }

    fn set_console_mode(&self, mode: ConsoleMode) -> nix::Result<()> {
        self.record(Call::SetConsoleMode(mode), "set_console_mode")
    }

    fn active_vt(&self) -> nix::Result<u32> {
        self.record(Call::ActiveVt, "active_vt")?;
        Ok(self.console.active_vt)
    }

    fn activate(&self, vt: u32) -> nix::Result<()> {
        self.record(Call::Activate(vt), "activate")
    }

    fn wait_active(&self, vt: u32) -> nix::Result<()> {
        self.record(Call::WaitActive(vt), "wait_active")
    }

    fn keyboard_mode(&self) -> nix::Result<c_int> {
        self.record(Call::KeyboardMode, "keyboard_mode")?;
        Ok(self.console.keyboard_mode)
    }

    fn set_keyboard_mode(&self, mode: c_int) -> nix::Result<()> {
        self.record(Call::SetKeyboardMode(mode), "set_keyboard_mode")
    }

    fn set_keyboard_mute(&self, mute: bool) -> nix::Result<()> {
        self.record(Call::SetKeyboardMute(mute), "set_keyboard_mute")?;
        if self.console.mute_supported {
            Ok(())
        } else {
            Err(Errno::EINVAL)
        }
    }

    fn set_switch_mode(&self, mode: SwitchMode) -> nix::Result<()> {
        self.record(Call::SetSwitchMode(mode), "set_switch_mode")
    }

    fn release_display(&self, ack: DisplayAck) -> nix::Result<()> {
        self.record(Call::ReleaseDisplay(ack), "release_display")
    }
}

#[derive(Debug)]
pub struct MockOwner {
    /// What `activate`/`deactivate` answer.
    pub accept: bool,
    pub active: bool,
    calls: CallLog,
}

impl DisplayOwner for MockOwner {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        self.calls.borrow_mut().push(Call::OwnerSetActive(active));
    }

    fn activate(&mut self) -> bool {
        self.calls.borrow_mut().push(Call::OwnerActivate);
        self.accept
    }

    fn deactivate(&mut self) -> bool {
        self.calls.borrow_mut().push(Call::OwnerDeactivate);
        self.accept
    }
}

/// Position of the first `call` in `calls`.
pub fn position(calls: &[Call], call: Call) -> Option<usize> {
    calls.iter().position(|c| *c == call)
}
