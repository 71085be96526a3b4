//! Error type shared by every stage of a VT session.

use std::fmt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Which way the display owner was asked to move when it refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Taking the display back after the kernel returned the VT.
    Activate,
    /// Letting go of the display before the kernel switches away.
    Deactivate,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate => f.write_str("activate"),
            Self::Deactivate => f.write_str("release"),
        }
    }
}

/// Everything that can stop a VT session from being set up or kept alive.
///
/// All of these are fatal for the session. When one is returned after the VT
/// was claimed, the console has already been restored.
#[derive(Debug, Error)]
pub enum VtError {
    /// A console device node could not be opened.
    #[error("could not open {}: {source}", .path.display())]
    DeviceOpen {
        /// Device node that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not a VT, or no VT number could be found.
    #[error("not a valid vt: {reason}")]
    InvalidVt {
        /// Human readable explanation.
        reason: String,
    },

    /// The VT is already owned by something running in graphics mode.
    #[error("vt{vt} is already in graphics mode ({mode}), is another display server running?")]
    AlreadyInGraphicsMode {
        /// VT that was about to be claimed.
        vt: u32,
        /// Console mode reported by the kernel.
        mode: i32,
    },

    /// An ioctl that has to succeed for the session to progress failed.
    #[error("could not {action}: {source}")]
    KernelQuery {
        /// What was being asked of the kernel.
        action: String,
        /// Error reported by the kernel.
        #[source]
        source: Errno,
    },

    /// The display owner refused to follow a VT switch.
    #[error("display owner failed to {0}")]
    CollaboratorActivation(Transition),
}

impl VtError {
    /// Build a [`VtError::KernelQuery`] from an ioctl error.
    pub fn kernel(action: impl Into<String>, source: Errno) -> Self {
        Self::KernelQuery {
            action: action.into(),
            source,
        }
    }

    /// Build a [`VtError::InvalidVt`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidVt {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = VtError::AlreadyInGraphicsMode { vt: 2, mode: 1 };
        assert_eq!(
            err.to_string(),
            "vt2 is already in graphics mode (1), is another display server running?"
        );

        let err = VtError::kernel("get current vt", Errno::ENOTTY);
        assert!(err.to_string().starts_with("could not get current vt: "));

        let err = VtError::CollaboratorActivation(Transition::Deactivate);
        assert_eq!(err.to_string(), "display owner failed to release");

        let err = VtError::invalid("vt0");
        assert_eq!(err.to_string(), "not a valid vt: vt0");
    }
}
