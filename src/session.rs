//! Claiming a VT and giving it back.
//!
//! A [`Session`] owns the VT device for the lifetime of the graphical session:
//! - [`Session::init`] locates, opens and claims a VT
//! - [`Session::claim`] runs the ordered ioctl sequence taking over an open VT
//! - [`Session::restore`] undoes all of it, as far as the kernel lets it
//!
//! Once a claim got far enough to change anything on the console, every error
//! path restores before it returns.

use log::{info, warn};
use nix::libc::c_int;
use signal_hook::consts::{SIGUSR1, SIGUSR2};

use crate::error::VtError;
use crate::locate::locate;
use crate::switch::SwitchState;
use crate::terminal::{ConsoleMode, KEYBOARD_OFF, Kernel, SwitchMode, VtDevice};

/// Signal the kernel raises when another VT is requested.
pub const RELEASE_SIGNAL: c_int = SIGUSR1;
/// Signal the kernel raises when our VT is handed back.
pub const ACQUIRE_SIGNAL: c_int = SIGUSR2;

/// Console state found before the claim, put back by [`Session::restore`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    /// VT that was in the foreground.
    pub previous_vt: u32,
    /// Keyboard decoding mode.
    pub keyboard_mode: c_int,
}

/// Ownership of one VT.
///
/// Only one session should exist per process. The device is held iff
/// [`Session::owned_vt`] is non-zero. Dropping the session restores the console.
#[derive(Debug)]
pub struct Session<D: VtDevice> {
    pub(crate) device: Option<D>,
    vt: u32,
    saved: SavedState,
    pub(crate) switch_state: SwitchState,
}

impl<D: VtDevice> Default for Session<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: VtDevice> Session<D> {
    /// An empty session, holding no VT.
    #[must_use]
    pub fn new() -> Self {
        Self {
            device: None,
            vt: 0,
            saved: SavedState::default(),
            switch_state: SwitchState::Idle,
        }
    }

    /// Whether a VT is currently claimed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.device.is_some()
    }

    /// The claimed VT, `0` if none.
    ///
    /// Stays the same for the whole session, whatever VT has the foreground.
    #[must_use]
    pub fn owned_vt(&self) -> u32 {
        self.vt
    }

    /// Console state that will be put back on restore.
    #[must_use]
    pub fn saved_state(&self) -> SavedState {
        self.saved
    }

    /// Where the session stands in the VT switch protocol.
    #[must_use]
    pub fn switch_state(&self) -> SwitchState {
        self.switch_state
    }

    /// Locate, open and claim a VT.
    ///
    /// Does nothing if a VT is already claimed.
    ///
    /// # Arguments
    ///
    /// * `kernel` - Kernel to open the VT through
    /// * `vt` - VT requested on the command line; a non-zero value also allows
    ///   taking over a VT that is already in graphics mode
    /// * `session_vt` - VT supplied by the login session, e.g. `XDG_VTNR`
    ///
    /// # Errors
    ///
    /// Returns an error if no VT can be found, opened or claimed. The console
    /// is restored before the error is returned.
    pub fn init<K>(
        &mut self,
        kernel: &K,
        vt: Option<u32>,
        session_vt: Option<&str>,
    ) -> Result<(), VtError>
    where
        K: Kernel<Device = D>,
    {
        if self.is_active() {
            return Ok(());
        }

        let requested = vt.filter(|vt| *vt > 0);
        let replace_existing = requested.is_some();

        let vt = match requested {
            Some(vt) => vt,
            None => locate(kernel, session_vt)?,
        };
        if vt == 0 {
            return Err(VtError::invalid("could not find vt"));
        }

        let device = kernel.open_vt(vt)?;
        self.claim(device, replace_existing)
    }

    /// Take over an open VT.
    ///
    /// Checks the device is a VT, makes it the foreground VT, mutes the
    /// keyboard, switches to graphics mode and asks the kernel to signal
    /// [`RELEASE_SIGNAL`] and [`ACQUIRE_SIGNAL`] around every switch.
    ///
    /// # Arguments
    ///
    /// * `device` - Open VT device, owned by the session from now on
    /// * `replace_existing` - Claim the VT even if it is already in graphics mode
    ///
    /// # Errors
    ///
    /// - [`VtError::InvalidVt`] if `device` is not a VT
    /// - [`VtError::AlreadyInGraphicsMode`] if another display server holds it
    /// - [`VtError::KernelQuery`] if any request fails
    ///
    /// Failures before the keyboard is muted leave the session empty; later
    /// ones restore the console first.
    pub fn claim(&mut self, device: D, replace_existing: bool) -> Result<(), VtError> {
        if self.is_active() {
            let vt = self.vt;
            return Err(VtError::invalid(format!("vt{vt} is already claimed")));
        }

        let id = device
            .device_id()
            .map_err(|source| VtError::kernel("stat tty fd", source))?;
        let vt = id.vt().ok_or_else(|| {
            VtError::invalid(format!("device {}:{} is not a vt", id.major, id.minor))
        })?;

        if !replace_existing {
            let mode = device
                .console_mode()
                .map_err(|source| VtError::kernel(format!("get vt{vt} mode"), source))?;
            if mode != ConsoleMode::Text.raw() {
                return Err(VtError::AlreadyInGraphicsMode { vt, mode });
            }
        }

        let previous_vt = device
            .active_vt()
            .map_err(|source| VtError::kernel("get current vt", source))?;

        device
            .activate(vt)
            .map_err(|source| VtError::kernel(format!("activate vt{vt}"), source))?;
        let waiting = format!("wait for vt{vt} to become active");
        device
            .wait_active(vt)
            .map_err(|source| VtError::kernel(waiting, source))?;

        let keyboard_mode = device
            .keyboard_mode()
            .map_err(|source| VtError::kernel("get keyboard mode", source))?;

        // vt will be restored from now on
        self.device = Some(device);
        self.vt = vt;
        self.saved = SavedState {
            previous_vt,
            keyboard_mode,
        };
        self.switch_state = SwitchState::Active;

        let result = (|| -> Result<(), VtError> {
            let device = self
                .device
                .as_ref()
                .ok_or_else(|| VtError::invalid("vt lost during claim"))?;

            device
                .set_keyboard_mute(true)
                .or_else(|_| device.set_keyboard_mode(KEYBOARD_OFF))
                .map_err(|source| VtError::kernel("set keyboard mode to K_OFF", source))?;

            device
                .set_console_mode(ConsoleMode::Graphics)
                .map_err(|source| VtError::kernel("set console mode to KD_GRAPHICS", source))?;

            device
                .set_switch_mode(SwitchMode::Process {
                    release: RELEASE_SIGNAL,
                    acquire: ACQUIRE_SIGNAL,
                })
                .map_err(|source| VtError::kernel(format!("set vt{vt} mode"), source))
        })();

        if let Err(err) = result {
            return Err(self.fail(err));
        }

        Ok(())
    }

    /// Ask the kernel to switch to another VT.
    ///
    /// The switch itself happens later, through the release notification.
    ///
    /// # Returns
    ///
    /// `false` without a claimed VT, when `target` is the claimed VT, or when
    /// the kernel refuses the request.
    #[must_use]
    pub fn request_switch(&self, target: u32) -> bool {
        let Some(device) = self.device.as_ref() else {
            return false;
        };
        if target == self.vt {
            return false;
        }

        info!("Activate vt: {target}");
        device.activate(target).is_ok()
    }

    /// Put the console back the way it was found and close the VT.
    ///
    /// Safe to call at any time and any number of times. Failing steps are
    /// logged and skipped.
    pub fn restore(&mut self) {
        if let Some(device) = self.device.take() {
            let vt = self.vt;
            let saved = self.saved;
            info!(
                "Restoring vt{vt} (keyboard mode {:#x})",
                saved.keyboard_mode
            );

            // Our vt has to be in the foreground for the mode changes to land,
            // even if the switch protocol never got to finish.
            best_effort("activate vt", device.activate(vt));
            best_effort("wait for vt", device.wait_active(vt));
            best_effort("unmute keyboard", device.set_keyboard_mute(false));
            best_effort(
                "restore keyboard mode",
                device.set_keyboard_mode(saved.keyboard_mode),
            );
            best_effort(
                "restore text mode",
                device.set_console_mode(ConsoleMode::Text),
            );
            best_effort(
                "restore automatic vt switching",
                device.set_switch_mode(SwitchMode::Auto),
            );
            best_effort("activate previous vt", device.activate(saved.previous_vt));
            drop(device);
        }

        self.vt = 0;
        self.saved = SavedState::default();
        self.switch_state = SwitchState::Idle;
    }

    /// Restore the console and hand `err` back for reporting.
    pub(crate) fn fail(&mut self, err: VtError) -> VtError {
        self.restore();
        err
    }
}

impl<D: VtDevice> Drop for Session<D> {
    fn drop(&mut self) {
        self.restore();
    }
}

fn best_effort(step: &str, result: nix::Result<()>) {
    if let Err(err) = result {
        warn!("Could not {step}: {err}");
    }
}
