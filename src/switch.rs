//! Cooperative VT switching.
//!
//! With `VT_PROCESS` installed the kernel no longer switches away from, or
//! back to, our VT on its own. It raises [`RELEASE_SIGNAL`] or
//! [`ACQUIRE_SIGNAL`] and waits for an answer through `VT_RELDISP`.
//!
//! Signals are caught by a [`SignalListener`] thread that only forwards them;
//! the owner of the [`Session`] handles them as ordinary code through
//! [`Session::handle_notification`].

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use nix::libc::c_int;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};

use crate::error::{Transition, VtError};
use crate::session::{ACQUIRE_SIGNAL, RELEASE_SIGNAL, Session};
use crate::terminal::{DisplayAck, VtDevice};

/// Position in the switch protocol.
///
/// `Idle → Active → ReleasePending → Released → AcquirePending → Active`,
/// and back to `Idle` once the console is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// No VT is claimed.
    Idle,
    /// Our VT has the foreground.
    Active,
    /// The kernel asked us to let go; the display owner is being told.
    ReleasePending,
    /// Another VT has the foreground.
    Released,
    /// The kernel handed our VT back; the display owner is being told.
    AcquirePending,
}

/// What the kernel asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Another VT was requested.
    Release,
    /// Our VT was handed back.
    Acquire,
}

/// The part of the process that uses the display while the VT is ours.
///
/// Implementations must not call back into the [`Session`] from these methods.
pub trait DisplayOwner {
    /// The session became active or inactive.
    fn set_active(&mut self, active: bool);

    /// Take the display resources back. `false` if they cannot be.
    fn activate(&mut self) -> bool;

    /// Let go of the display resources. `false` if they cannot be.
    fn deactivate(&mut self) -> bool;
}

impl<D: VtDevice> Session<D> {
    /// React to a notification from the kernel.
    ///
    /// The display owner is always told before the kernel gets its answer.
    ///
    /// # Errors
    ///
    /// Returns [`VtError::CollaboratorActivation`] if the display owner refuses
    /// the switch. The console is restored before the error is returned.
    pub fn handle_notification<O: DisplayOwner>(
        &mut self,
        notification: Notification,
        owner: &mut O,
    ) -> Result<(), VtError> {
        if !self.is_active() {
            debug!("Ignoring {notification:?}, no vt claimed");
            return Ok(());
        }

        match notification {
            Notification::Release => {
                info!("Release requested for vt{}", self.owned_vt());
                self.switch_state = SwitchState::ReleasePending;
                owner.set_active(false);
                self.deactivate(owner)
            }
            Notification::Acquire => {
                info!("vt{} handed back", self.owned_vt());
                self.switch_state = SwitchState::AcquirePending;
                owner.set_active(true);
                self.activate(owner)
            }
        }
    }

    /// Give the display back, then allow the pending release.
    ///
    /// # Errors
    ///
    /// Returns [`VtError::CollaboratorActivation`] if the display owner cannot
    /// let go. The console is restored before the error is returned.
    pub fn deactivate<O: DisplayOwner>(&mut self, owner: &mut O) -> Result<(), VtError> {
        if !owner.deactivate() {
            let err = VtError::CollaboratorActivation(Transition::Deactivate);
            return Err(self.fail(err));
        }

        info!("Releasing vt");
        if self.acknowledge(DisplayAck::Release) {
            self.switch_state = SwitchState::Released;
        }
        Ok(())
    }

    /// Take the display again, then confirm the acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`VtError::CollaboratorActivation`] if the display owner cannot
    /// take the display back. The console is restored before the error is
    /// returned.
    pub fn activate<O: DisplayOwner>(&mut self, owner: &mut O) -> Result<(), VtError> {
        if !owner.activate() {
            let err = VtError::CollaboratorActivation(Transition::Activate);
            return Err(self.fail(err));
        }

        info!("Activating vt");
        if self.acknowledge(DisplayAck::Acquire) {
            self.switch_state = SwitchState::Active;
        }
        Ok(())
    }

    /// Answer the kernel. `false` if no VT is claimed.
    fn acknowledge(&self, ack: DisplayAck) -> bool {
        let Some(device) = self.device.as_ref() else {
            warn!("No vt claimed, not answering {ack:?}");
            return false;
        };
        if let Err(err) = device.release_display(ack) {
            warn!("Could not answer {ack:?}: {err}");
        }
        true
    }
}

/// A signal forwarded by the [`SignalListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// VT switch request from the kernel.
    Switch(Notification),
    /// The process was asked to stop.
    Terminate(c_int),
}

impl SignalEvent {
    /// Map a caught signal to its event.
    #[must_use]
    pub fn from_signal(signal: c_int) -> Option<Self> {
        match signal {
            RELEASE_SIGNAL => Some(Self::Switch(Notification::Release)),
            ACQUIRE_SIGNAL => Some(Self::Switch(Notification::Acquire)),
            SIGINT | SIGTERM | SIGHUP => Some(Self::Terminate(signal)),
            _ => None,
        }
    }
}

/// Catches VT switch and termination signals on a dedicated thread.
///
/// Install it before claiming a VT: the default action of [`RELEASE_SIGNAL`]
/// terminates the process.
#[derive(Debug)]
pub struct SignalListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
    events: mpsc::Receiver<SignalEvent>,
}

impl SignalListener {
    /// Register the signal handlers and start forwarding.
    ///
    /// # Errors
    ///
    /// Returns an error if the handlers cannot be registered.
    pub fn install() -> io::Result<Self> {
        let caught = [RELEASE_SIGNAL, ACQUIRE_SIGNAL, SIGINT, SIGTERM, SIGHUP];
        let mut signals = Signals::new(caught).map_err(io::Error::other)?;
        let handle = signals.handle();
        let (tx, events) = mpsc::channel();

        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                let Some(event) = SignalEvent::from_signal(signal) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            handle,
            thread: Some(thread),
            events,
        })
    }

    /// Wait for the next signal. `None` once the listener thread is gone.
    pub fn recv(&self) -> Option<SignalEvent> {
        self.events.recv().ok()
    }

    /// Throw away the switch requests already queued.
    ///
    /// Call it once the VT is claimed: requests caught while claiming were
    /// meant for a console we did not own yet.
    ///
    /// # Returns
    ///
    /// The first termination signal found in the queue, if any.
    pub fn drain_switches(&self) -> Option<c_int> {
        let mut terminate = None;
        while let Ok(event) = self.events.try_recv() {
            match event {
                SignalEvent::Switch(notification) => {
                    debug!("Dropping {notification:?} caught while claiming");
                }
                SignalEvent::Terminate(signal) => {
                    terminate.get_or_insert(signal);
                }
            }
        }
        terminate
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
