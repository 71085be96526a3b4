//! Virtual terminal ownership for graphical sessions.
//!
//! This crate claims a Linux VT for a compositor or any other program drawing
//! directly to the display:
//! 1. Find the VT to use ([`locate`])
//! 2. Open it ([`Kernel::open_vt`])
//! 3. Switch it to graphics mode with a muted keyboard ([`Session::claim`])
//! 4. Answer the kernel's VT switch requests ([`Session::handle_notification`])
//! 5. Put the console back as it was ([`Session::restore`])
//!
//! # Examples
//!
//! ```no_run
//! use vtsession::{LinuxKernel, Session};
//!
//! let mut session = Session::new();
//! session.init(&LinuxKernel, None, std::env::var("XDG_VTNR").ok().as_deref())?;
//! println!("running on vt{}", session.owned_vt());
//! session.restore();
//! # Ok::<(), vtsession::VtError>(())
//! ```

pub mod config;
mod error;
mod ioctl;
mod locate;
pub mod logs;
mod session;
mod switch;
mod terminal;

#[cfg(test)]
mod testing;

pub use error::{Transition, VtError};
pub use locate::locate;
pub use session::{ACQUIRE_SIGNAL, RELEASE_SIGNAL, SavedState, Session};
pub use switch::{DisplayOwner, Notification, SignalEvent, SignalListener, SwitchState};
pub use terminal::{
    CONTROL_DEVICE, ConsoleMode, DeviceId, DisplayAck, KEYBOARD_OFF, Kernel, LinuxKernel,
    SwitchMode, Tty, VtDevice, vt_path,
};
