//! Hold a virtual terminal in graphics mode.
//!
//! `vtsession` claims a VT the way a compositor would, then answers the
//! kernel's VT switch requests until it receives `SIGINT`, `SIGTERM` or
//! `SIGHUP`. The console is restored on exit, including after a fatal error.
//!
//! # Usage
//!
//! ```text
//! vtsession [--vt N] [--session-vt N] [--switch-to N] [-v]
//! ```
//!
//! Exit codes:
//! - 0: The VT was held and restored
//! - 1: The VT could not be claimed or a switch failed
//!
//! # Environment Variables
//!
//! - `XDG_VTNR`: VT handed over by the login session
//! - `DEBUG`: When set, enables debug output to stderr

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};

use vtsession::config::Config;
use vtsession::{DisplayOwner, LinuxKernel, SignalEvent, SignalListener, Session, logs};

/// Stand-in for the display: it has nothing to set up or tear down, so it
/// only tracks whether the session is in the foreground.
#[derive(Debug)]
struct Holder {
    active: bool,
}

impl DisplayOwner for Holder {
    fn set_active(&mut self, active: bool) {
        if self.active != active {
            let state = if active { "active" } else { "inactive" };
            info!("Session is now {state}");
        }
        self.active = active;
    }

    fn activate(&mut self) -> bool {
        true
    }

    fn deactivate(&mut self) -> bool {
        true
    }
}

fn run(config: &Config) -> Result<()> {
    // Before the claim: the kernel may signal as soon as VT_PROCESS is set.
    let listener = SignalListener::install().context("Failed to install signal handlers")?;

    let mut session = Session::new();
    session
        .init(&LinuxKernel, config.vt, config.session_vt.as_deref())
        .context("Failed to claim a vt")?;
    info!("Holding vt{}", session.owned_vt());

    if let Some(signal) = listener.drain_switches() {
        info!("Caught signal {signal}, exiting");
        session.restore();
        return Ok(());
    }

    if let Some(target) = config.switch_to
        && !session.request_switch(target)
    {
        warn!("Switch to vt{target} was not accepted");
    }

    let mut holder = Holder { active: true };
    while let Some(event) = listener.recv() {
        match event {
            SignalEvent::Switch(notification) => session
                .handle_notification(notification, &mut holder)
                .context("Failed to follow vt switch")?,
            SignalEvent::Terminate(signal) => {
                info!("Caught signal {signal}, exiting");
                break;
            }
        }
    }

    session.restore();
    Ok(())
}

/// Main entry point for the vtsession utility.
///
/// Parses the configuration, holds the VT until told to stop, and exits
/// with status 1 on any fatal error once the console has been restored.
fn main() {
    let config = Config::parse();
    logs::init(config.verbose);
    debug!("config={config:?}");

    if let Err(err) = run(&config) {
        error!("{err:#}");
        process::exit(1);
    }
}
