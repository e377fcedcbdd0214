//! The session lifecycle state machine.

use std::fmt;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///                ┌──(start_host)──→ HostStarting ──→ HostListening ⇄ Connected
///   Offline ─────┤
///                └──(start_client)─→ ClientConnecting ──→ ClientHandshaking ──→ Connected
///
///   any state ──(fail)──→ Error        any state ──(shutdown)──→ Disconnecting ──→ Offline
/// ```
///
/// A host bounces between `HostListening` (lobby open, nobody joined yet or
/// everyone left) and `Connected` (at least one client in). A client walks
/// the connect → handshake → connected path once per join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No networking at all; the menu state.
    #[default]
    Offline,
    /// Host sockets are being bound.
    HostStarting,
    /// Host is up and advertising, with no clients connected.
    HostListening,
    /// Client transport-level connect is in flight.
    ClientConnecting,
    /// Transport is up; waiting for the application handshake to resolve.
    ClientHandshaking,
    /// Fully joined: gameplay traffic flows.
    Connected,
    /// Orderly teardown in progress.
    Disconnecting,
    /// Something failed; the reason says what. Terminal until reset.
    Error,
}

impl SessionState {
    /// True while any socket may be open.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Offline | SessionState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Offline => "offline",
            SessionState::HostStarting => "host_starting",
            SessionState::HostListening => "host_listening",
            SessionState::ClientConnecting => "client_connecting",
            SessionState::ClientHandshaking => "client_handshaking",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionMachine
// ---------------------------------------------------------------------------

/// Holds the current [`SessionState`] plus the latest transition's
/// human-readable reason.
///
/// Only the coordinator mutates this; UI code reads it to decide what to
/// render (menu, lobby, error banner). The reason string is what lands in
/// the error banner, so transitions into failure states should say what
/// actually happened.
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    reason: String,
    is_error: bool,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The human-readable reason attached to the latest transition.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the latest transition was a failure.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Moves to `next` with a reason, clearing any error flag.
    pub fn transition(&mut self, next: SessionState, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(
            from = %self.state,
            to = %next,
            reason = %reason,
            "session state changed"
        );
        self.state = next;
        self.reason = reason;
        self.is_error = false;
    }

    /// Moves to [`SessionState::Error`] and latches the error flag.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(from = %self.state, reason = %reason, "session failed");
        self.state = SessionState::Error;
        self.reason = reason;
        self.is_error = true;
    }

    /// Back to `Offline`, wiping the reason. Also the way out of `Error`
    /// once the UI has shown the message.
    pub fn reset(&mut self) {
        if self.state != SessionState::Offline {
            tracing::debug!(from = %self.state, "session reset");
        }
        self.state = SessionState::Offline;
        self.reason.clear();
        self.is_error = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_offline_without_error() {
        let machine = SessionMachine::new();
        assert_eq!(machine.state(), SessionState::Offline);
        assert_eq!(machine.reason(), "");
        assert!(!machine.is_error());
    }

    #[test]
    fn test_transition_clears_previous_error_flag() {
        let mut machine = SessionMachine::new();
        machine.fail("bind failed");
        assert!(machine.is_error());
        machine.transition(SessionState::HostStarting, "retrying as host");
        assert!(!machine.is_error());
        assert_eq!(machine.state(), SessionState::HostStarting);
        assert_eq!(machine.reason(), "retrying as host");
    }

    #[test]
    fn test_fail_latches_state_and_reason() {
        let mut machine = SessionMachine::new();
        machine.transition(SessionState::ClientConnecting, "joining 192.168.1.10");
        machine.fail("connection refused");
        assert_eq!(machine.state(), SessionState::Error);
        assert_eq!(machine.reason(), "connection refused");
        assert!(machine.is_error());
    }

    #[test]
    fn test_reset_leaves_error_state() {
        let mut machine = SessionMachine::new();
        machine.fail("handshake timed out");
        machine.reset();
        assert_eq!(machine.state(), SessionState::Offline);
        assert_eq!(machine.reason(), "");
        assert!(!machine.is_error());
    }

    #[test]
    fn test_active_states() {
        assert!(!SessionState::Offline.is_active());
        assert!(!SessionState::Error.is_active());
        assert!(SessionState::HostListening.is_active());
        assert!(SessionState::Connected.is_active());
        assert!(SessionState::Disconnecting.is_active());
    }
}
