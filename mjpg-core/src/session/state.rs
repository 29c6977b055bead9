//! Stream session phases.
//!
//! Models the lifecycle of the capture handle owned by a
//! [`StreamSession`](super::StreamSession), with validated transitions
//! that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::MjpgError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a stream session.
///
/// ```text
///            open ok            read failed
///  Closed ───────────► Open ───────────────► Degraded
///    ▲                  ▲  ◄──────────────────  │
///    │                  │       read ok          │
///    └──── close / too many failed reads ◄──────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No capture handle. Initial / terminal state.
    #[default]
    Closed,

    /// Handle held and the last read produced a frame.
    Open {
        /// When the session last entered `Open` from another phase.
        since: Instant,
    },

    /// Handle held but recent reads failed or came back empty.
    Degraded {
        /// Consecutive failed reads.
        failures: u32,
    },
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open { .. } => write!(f, "Open"),
            Self::Degraded { failures } => write!(f, "Degraded ({failures} failed reads)"),
        }
    }
}

impl SessionPhase {
    /// Returns `true` while a capture handle is held.
    pub fn has_handle(&self) -> bool {
        !self.is_closed()
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the session has been delivering frames.
    ///
    /// Returns `None` for any other phase.
    pub fn open_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Open { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Open` after a successful capture open.
    ///
    /// Valid from: `Closed`.
    pub fn opened(&mut self) -> Result<(), MjpgError> {
        match self {
            Self::Closed => {
                *self = Self::Open {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(MjpgError::InvalidTransition(
                "cannot open: a handle is already held",
            )),
        }
    }

    /// Record a successful read.
    ///
    /// Valid from: `Open`, `Degraded`.
    pub fn read_ok(&mut self) -> Result<(), MjpgError> {
        match self {
            Self::Open { .. } => Ok(()),
            Self::Degraded { .. } => {
                *self = Self::Open {
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Closed => Err(MjpgError::InvalidTransition(
                "cannot read: session is closed",
            )),
        }
    }

    /// Record a failed or empty read.
    ///
    /// Valid from: `Open`, `Degraded`.
    pub fn read_failed(&mut self, failures: u32) -> Result<(), MjpgError> {
        match self {
            Self::Open { .. } | Self::Degraded { .. } => {
                *self = Self::Degraded { failures };
                Ok(())
            }
            Self::Closed => Err(MjpgError::InvalidTransition(
                "cannot degrade: session is closed",
            )),
        }
    }

    /// Force-reset to `Closed` regardless of current phase.
    pub fn force_close(&mut self) {
        *self = Self::Closed;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::default();
        assert!(phase.is_closed());

        phase.opened().unwrap();
        assert!(phase.is_open());
        assert!(phase.open_duration().is_some());

        phase.read_failed(1).unwrap();
        assert_eq!(phase, SessionPhase::Degraded { failures: 1 });

        phase.read_failed(2).unwrap();
        assert_eq!(phase, SessionPhase::Degraded { failures: 2 });

        phase.read_ok().unwrap();
        assert!(phase.is_open());

        phase.force_close();
        assert!(phase.is_closed());
    }

    #[test]
    fn cannot_open_twice() {
        let mut phase = SessionPhase::default();
        phase.opened().unwrap();
        assert!(phase.opened().is_err());

        let mut degraded = SessionPhase::Degraded { failures: 3 };
        assert!(degraded.opened().is_err());
    }

    #[test]
    fn reads_require_a_handle() {
        let mut phase = SessionPhase::Closed;
        assert!(phase.read_ok().is_err());
        assert!(phase.read_failed(1).is_err());
        assert!(phase.is_closed());
    }

    #[test]
    fn force_close_from_any_phase() {
        for mut phase in [
            SessionPhase::Closed,
            SessionPhase::Open {
                since: Instant::now(),
            },
            SessionPhase::Degraded { failures: 7 },
        ] {
            phase.force_close();
            assert!(phase.is_closed());
            assert!(!phase.has_handle());
        }
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Closed.to_string(), "Closed");
        assert_eq!(
            SessionPhase::Open {
                since: Instant::now()
            }
            .to_string(),
            "Open"
        );
        assert_eq!(
            SessionPhase::Degraded { failures: 4 }.to_string(),
            "Degraded (4 failed reads)"
        );
    }
}
